use std::fmt;
use std::sync::{Arc, Mutex};

use crate::category::Selections;

/// A side effect the manager asks the hosting page to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEffect {
    ShowBanner,
    HideBanner,
    /// Open the settings dialog with its checkboxes pre-filled.
    ShowCustomize(Selections),
    HideCustomize,
    /// Full reload; embeds that already loaded cannot be unloaded in place.
    ReloadPage,
}

impl fmt::Display for HostEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEffect::ShowBanner => f.write_str("show-banner"),
            HostEffect::HideBanner => f.write_str("hide-banner"),
            HostEffect::ShowCustomize(s) => {
                write!(f, "show-customize comments={} embeds={}", s.comments, s.embeds)
            }
            HostEffect::HideCustomize => f.write_str("hide-customize"),
            HostEffect::ReloadPage => f.write_str("reload-page"),
        }
    }
}

pub trait PromptHost {
    fn apply(&self, effect: HostEffect);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl PromptHost for NoopHost {
    fn apply(&self, _effect: HostEffect) {}
}

/// Prints each effect on stdout as `host <effect>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHost;

impl PromptHost for ConsoleHost {
    fn apply(&self, effect: HostEffect) {
        println!("host {effect}");
    }
}

/// Keeps every effect it is asked to perform. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    effects: Arc<Mutex<Vec<HostEffect>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> Vec<HostEffect> {
        self.effects.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take(&self) -> Vec<HostEffect> {
        std::mem::take(&mut *self.effects.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl PromptHost for RecordingHost {
    fn apply(&self, effect: HostEffect) {
        self.effects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(effect);
    }
}
