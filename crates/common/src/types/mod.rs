use chrono::Utc;
use serde::Serialize;

/// Body of `GET /api/health`.
#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Health {
    pub fn now() -> Self {
        Self { status: "ok", timestamp: Utc::now().timestamp_millis() }
    }
}

/// Generic `{ "error": "..." }` body returned by failing handlers.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}
