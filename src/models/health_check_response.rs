use serde::{Deserialize, Serialize};

/// Response from the backend health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall status, e.g. "ok"
    pub status: String,
    /// Server name
    #[serde(default)]
    pub name: Option<String>,
    /// Server version
    #[serde(default)]
    pub version: Option<String>,
}
