//! Snapshot reads: the initial bulk fetch that seeds a live collection
//! before the change feed starts delivering incremental events.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::auth::ResolvedAuth;
use crate::error::{ConfabLinkError, Result};
use crate::models::{Resource, Row};
use crate::timeouts::ConfabLinkTimeouts;

/// Wire body of a snapshot read.
#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    rows: Vec<JsonValue>,
}

/// Issues ordered snapshot reads for one client.
///
/// One read per invocation: filtered by parent id, ordered ascending by the
/// resource's designated field, returning the full current row set. No
/// automatic retry; the caller decides whether a failed seed is fatal.
#[derive(Clone)]
pub struct SnapshotLoader {
    base_url: String,
    http_client: reqwest::Client,
    auth: ResolvedAuth,
    timeout: Duration,
}

impl SnapshotLoader {
    pub(crate) fn new(
        base_url: String,
        http_client: reqwest::Client,
        auth: ResolvedAuth,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url,
            http_client,
            auth,
            timeout,
        }
    }

    /// Fetch the current rows of `resource` under `parent_id`.
    ///
    /// A `None` parent id performs no network I/O and returns an empty set:
    /// the consumer simply has nothing selected yet, which is not an error.
    pub async fn load(&self, resource: Resource, parent_id: Option<&str>) -> Result<Vec<Row>> {
        let Some(parent_id) = parent_id else {
            return Ok(Vec::new());
        };

        let url = format!("{}/v1/resources/{}", self.base_url, resource.as_str());
        let auth = self.auth.resolve().await?;
        let request = auth.apply_to_request(
            self.http_client
                .get(&url)
                .query(&[("parent_id", parent_id), ("order", resource.order_field())]),
        )?;

        let fetch = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ConfabLinkError::ApiError {
                    status: status.as_u16(),
                    message: body,
                });
            }
            parse_snapshot_rows(resource, &body)
        };

        if ConfabLinkTimeouts::is_no_timeout(self.timeout) {
            fetch.await
        } else {
            tokio::time::timeout(self.timeout, fetch).await.map_err(|_| {
                ConfabLinkError::TimeoutError(format!(
                    "Snapshot read for {}:{} timed out ({:?})",
                    resource, parent_id, self.timeout
                ))
            })?
        }
    }
}

/// Parse and validate a snapshot body. Rows that fail validation are logged
/// and skipped rather than poisoning the whole read.
fn parse_snapshot_rows(resource: Resource, body: &str) -> Result<Vec<Row>> {
    let response: SnapshotResponse = serde_json::from_str(body)?;
    let mut rows = Vec::with_capacity(response.rows.len());
    for value in response.rows {
        match Row::from_value(resource, value) {
            Ok(row) => rows.push(row),
            Err(e) => {
                log::warn!("[confab-link] Dropping malformed {} snapshot row: {}", resource, e);
            },
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_snapshot() {
        let body = r#"{"rows":[
            {"id":"m1","meeting_id":"mtg_1","user_id":"u1","content":"hi","created_at":"2026-08-01T10:00:00Z"},
            {"id":"m2","meeting_id":"mtg_1","user_id":"u2","content":"hello","created_at":"2026-08-01T10:00:05Z"}
        ]}"#;
        let rows = parse_snapshot_rows(Resource::Messages, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), "m1");
        assert_eq!(rows[1].parent_id(), "mtg_1");
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() {
        let body = r#"{"rows":[
            {"id":"m1","meeting_id":"mtg_1","user_id":"u1","content":"hi","created_at":"t"},
            {"id":"broken"},
            {"id":"m2","meeting_id":"mtg_1","user_id":"u2","content":"yo","created_at":"t"}
        ]}"#;
        let rows = parse_snapshot_rows(Resource::Messages, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id(), "m2");
    }

    #[test]
    fn test_undecodable_body_is_an_error() {
        assert!(parse_snapshot_rows(Resource::Messages, "not json").is_err());
    }

    #[tokio::test]
    async fn test_null_parent_id_performs_no_io() {
        // Points at a closed port; a request would fail loudly.
        let loader = SnapshotLoader::new(
            "http://127.0.0.1:1".to_string(),
            reqwest::Client::new(),
            crate::auth::ResolvedAuth::Static(crate::auth::AuthProvider::none()),
            Duration::from_secs(1),
        );
        let rows = loader.load(Resource::Messages, None).await.unwrap();
        assert!(rows.is_empty());
    }
}
