use std::collections::BTreeMap;
use std::fmt;

/// Loads one embed instance. Receives the embed id it was registered under.
pub type EmbedLoader = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// The visitor's answer when an embed is activated without blanket consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedChoice {
    /// Persist embeds consent and release every pending embed.
    GrantAll,
    /// Load just this instance for the current page view.
    AllowOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedOutcome {
    AlreadyPermitted,
    GrantedAll,
    /// Blanket consent was chosen but storage rejected it.
    GrantFailed,
    LoadedOnce,
    NoLoader,
    LoaderFailed,
}

impl fmt::Display for EmbedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmbedOutcome::AlreadyPermitted => "already-permitted",
            EmbedOutcome::GrantedAll => "granted-all",
            EmbedOutcome::GrantFailed => "grant-failed",
            EmbedOutcome::LoadedOnce => "loaded-once",
            EmbedOutcome::NoLoader => "no-loader",
            EmbedOutcome::LoaderFailed => "loader-failed",
        })
    }
}

/// Static mapping from embed id to the loader for that element.
#[derive(Default)]
pub struct EmbedRegistry {
    loaders: BTreeMap<String, EmbedLoader>,
}

impl EmbedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an earlier loader for `id` was replaced.
    pub fn register<F>(&mut self, id: impl Into<String>, loader: F) -> bool
    where
        F: Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.loaders.insert(id.into(), Box::new(loader)).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.loaders.contains_key(id)
    }

    /// Runs the loader for `id`; `None` when nothing is registered under it.
    pub fn load(&self, id: &str) -> Option<anyhow::Result<()>> {
        self.loaders.get(id).map(|loader| loader(id))
    }
}

impl fmt::Debug for EmbedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbedRegistry")
            .field("ids", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}
