use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{Category, Selections};
use crate::error::ConsentError;

pub const CONSENT_VERSION: &str = "1.0";
pub const DEFAULT_RETENTION_DAYS: u32 = 365;

/// The persisted consent decision. All four fields are required on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub comments: bool,
    pub embeds: bool,
}

impl ConsentRecord {
    pub fn new(
        version: impl Into<String>,
        timestamp: DateTime<Utc>,
        selections: Selections,
    ) -> Self {
        Self {
            version: version.into(),
            timestamp,
            comments: selections.comments,
            embeds: selections.embeds,
        }
    }

    pub fn selections(&self) -> Selections {
        Selections {
            comments: self.comments,
            embeds: self.embeds,
        }
    }

    pub fn allows(&self, category: Category) -> bool {
        self.selections().allows(category)
    }

    /// `None` when the expiry instant is past the representable range.
    pub fn expires_at(&self, retention_days: u32) -> Option<DateTime<Utc>> {
        let window = TimeDelta::days(i64::from(retention_days));
        self.timestamp.checked_add_signed(window)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, retention_days: u32) -> bool {
        match self.expires_at(retention_days) {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String, ConsentError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parses a stored payload and applies the retention window.
///
/// This is the only place expiry is decided; every read of the stored
/// record goes through it.
pub fn validate(
    raw: &str,
    now: DateTime<Utc>,
    retention_days: u32,
) -> Result<ConsentRecord, ConsentError> {
    let record: ConsentRecord = serde_json::from_str(raw)?;
    if record.is_expired(now, retention_days) {
        return Err(ConsentError::ExpiredRecord {
            timestamp: record.timestamp,
            retention_days,
        });
    }
    if record.version != CONSENT_VERSION {
        tracing::debug!(
            version = %record.version,
            "consent record has a different version tag"
        );
    }
    Ok(record)
}
