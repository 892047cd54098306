use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::record::{CONSENT_VERSION, DEFAULT_RETENTION_DAYS};

pub const DEFAULT_STORAGE_KEY: &str = "cookie-consent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsentConfig {
    /// Storage key holding the JSON-encoded record.
    pub storage_key: String,
    /// Version tag written into new records.
    pub version: String,
    /// Days after `timestamp` before a record is discarded.
    pub retention_days: u32,
    /// Embeds present on the page, keyed by element id.
    pub embeds: BTreeMap<String, EmbedSource>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            version: CONSENT_VERSION.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            embeds: BTreeMap::new(),
        }
    }
}

impl ConsentConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let config: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage_key.trim().is_empty() {
            anyhow::bail!("storage_key must not be empty");
        }
        if self.version.trim().is_empty() {
            anyhow::bail!("version must not be empty");
        }
        if self.retention_days == 0 {
            anyhow::bail!("retention_days must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSource {
    pub kind: EmbedKind,
    pub src: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    Youtube,
    Gist,
    Slideshare,
    Channel9,
    Other,
}

impl fmt::Display for EmbedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmbedKind::Youtube => "youtube",
            EmbedKind::Gist => "gist",
            EmbedKind::Slideshare => "slideshare",
            EmbedKind::Channel9 => "channel9",
            EmbedKind::Other => "other",
        })
    }
}
