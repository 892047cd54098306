use chrono::{DateTime, Utc};

/// Reasons a stored consent decision cannot be used.
///
/// The manager never surfaces these to callers: each one is logged and the
/// page falls back to the "no decision yet" state.
#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    #[error("consent storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("malformed consent record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
    #[error("consent record saved at {timestamp} expired after {retention_days} days")]
    ExpiredRecord {
        timestamp: DateTime<Utc>,
        retention_days: u32,
    },
}

impl ConsentError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
