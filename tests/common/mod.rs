//! Shared helpers for live-backend integration tests.
//!
//! These tests exercise the SDK against a running Confab backend. They are
//! skipped unless `CONFAB_TEST_URL` points at one:
//!
//! ```bash
//! CONFAB_TEST_URL=http://127.0.0.1:3000 cargo test --test live_server -- --nocapture
//! ```

use confab_link::{AuthProvider, ConfabLinkClient, ConfabLinkTimeouts};

/// Backend URL for live tests, or `None` to skip. Also initializes test
/// logging so `RUST_LOG=confab_link=debug` shows the feed lifecycle.
pub fn server_url() -> Option<String> {
    let _ = env_logger::builder().is_test(true).try_init();
    std::env::var("CONFAB_TEST_URL").ok().filter(|url| !url.trim().is_empty())
}

/// Build a client with fast timeouts against the configured backend.
pub fn fast_client(base_url: &str) -> ConfabLinkClient {
    let mut builder = ConfabLinkClient::builder()
        .base_url(base_url)
        .timeouts(ConfabLinkTimeouts::fast());
    if let Ok(key) = std::env::var("CONFAB_TEST_API_KEY") {
        builder = builder.auth(AuthProvider::api_key(key));
    }
    builder.build().expect("client should build")
}

/// Unique parent id per test run, so runs don't see each other's rows.
pub fn unique_parent(prefix: &str) -> String {
    let micros = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_micros();
    format!("{}_{}", prefix, micros)
}
