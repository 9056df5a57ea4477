//! API response types not shared with clients

use serde::Serialize;

/// Response for `GET /v1/health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Sessions currently waiting on a reply
    pub pending_sessions: usize,
}
