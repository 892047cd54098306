use crate::bus::{Signal, SignalBus};
use crate::category::{Category, Selections};
use crate::clock::{Clock, SystemClock};
use crate::config::ConsentConfig;
use crate::embeds::{EmbedChoice, EmbedOutcome, EmbedRegistry};
use crate::host::{HostEffect, NoopHost, PromptHost};
use crate::record::{self, ConsentRecord};
use crate::store::ConsentStore;

/// Where a page load ended up after reading the stored decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentState {
    /// No usable record (none stored, unreadable, or expired); the prompt is shown.
    Unknown,
    Decided(ConsentRecord),
}

/// Decides and records which content categories may load, and announces it.
///
/// The manager never loads content itself: widgets subscribe to the bus and
/// react to approval signals. Storage failures never escape; they are logged
/// and treated as "no consent".
pub struct ConsentManager<S> {
    config: ConsentConfig,
    store: S,
    bus: SignalBus,
    host: Box<dyn PromptHost>,
    clock: Box<dyn Clock>,
    embeds: EmbedRegistry,
}

impl<S: ConsentStore> ConsentManager<S> {
    pub fn new(config: ConsentConfig, store: S, bus: SignalBus) -> Self {
        Self {
            config,
            store,
            bus,
            host: Box::new(NoopHost),
            clock: Box::new(SystemClock),
            embeds: EmbedRegistry::new(),
        }
    }

    pub fn with_host(mut self, host: impl PromptHost + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_embeds(mut self, embeds: EmbedRegistry) -> Self {
        self.embeds = embeds;
        self
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn embeds(&self) -> &EmbedRegistry {
        &self.embeds
    }

    /// Page-load evaluation: show the prompt, or replay the stored approvals.
    ///
    /// Widgets must be subscribed before this runs; the bus does not replay.
    pub fn init(&self) -> ConsentState {
        match self.consent() {
            Some(record) => {
                tracing::debug!(
                    comments = record.comments,
                    embeds = record.embeds,
                    "resuming stored consent"
                );
                self.resume(Some(&record));
                ConsentState::Decided(record)
            }
            None => {
                self.host.apply(HostEffect::ShowBanner);
                ConsentState::Unknown
            }
        }
    }

    /// The stored record, if one exists and is still valid.
    ///
    /// Unreadable or expired records are removed from storage here.
    pub fn consent(&self) -> Option<ConsentRecord> {
        let key = self.config.storage_key.as_str();
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, key, "cannot read consent record");
                return None;
            }
        };

        match record::validate(&raw, self.clock.now(), self.config.retention_days) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, key, "discarding stored consent record");
                if let Err(err) = self.store.remove(key) {
                    tracing::warn!(error = %err, key, "cannot remove consent record");
                }
                None
            }
        }
    }

    pub fn has_consent(&self, category: Category) -> bool {
        if category == Category::Essential {
            return true;
        }
        self.consent().is_some_and(|record| record.allows(category))
    }

    /// Checkbox state for the settings dialog.
    pub fn customize_defaults(&self) -> Selections {
        self.consent()
            .map(|record| record.selections())
            .unwrap_or_default()
    }

    pub fn open_customize(&self) {
        let defaults = self.customize_defaults();
        self.host.apply(HostEffect::ShowCustomize(defaults));
    }

    pub fn close_customize(&self) {
        self.host.apply(HostEffect::HideCustomize);
    }

    /// `None` when storage rejected the record; nothing is announced then.
    pub fn accept_all(&self) -> Option<ConsentRecord> {
        let record = self.save(Selections::all());
        self.host.apply(HostEffect::HideBanner);
        self.resume(record.as_ref());
        record
    }

    pub fn reject_all(&self) -> Option<ConsentRecord> {
        let record = self.save(Selections::none());
        self.host.apply(HostEffect::HideBanner);
        record
    }

    pub fn save_custom(&self, selections: Selections) -> Option<ConsentRecord> {
        let record = self.save(selections);
        self.host.apply(HostEffect::HideCustomize);
        self.host.apply(HostEffect::HideBanner);
        self.resume(record.as_ref());
        record
    }

    /// Grants comments while leaving the embeds decision as it was.
    pub fn enable_comments(&self) -> Option<ConsentRecord> {
        let mut selections = self.customize_defaults();
        selections.comments = true;
        let record = self.save(selections)?;
        self.bus.publish(&Signal::CommentsApproved);
        Some(record)
    }

    /// Forgets the decision and reloads, so nothing loaded under it survives.
    pub fn revoke(&self) {
        let key = self.config.storage_key.as_str();
        if let Err(err) = self.store.remove(key) {
            tracing::warn!(error = %err, key, "cannot remove consent record");
        }
        tracing::info!("consent revoked");
        self.host.apply(HostEffect::ReloadPage);
    }

    /// Activation of a single embed before blanket embeds consent exists.
    ///
    /// `decide` is only consulted when embeds are not already permitted.
    pub fn enable_embed<F>(&self, embed_id: &str, decide: F) -> EmbedOutcome
    where
        F: FnOnce(&str) -> EmbedChoice,
    {
        let current = self.customize_defaults();
        if current.embeds {
            return EmbedOutcome::AlreadyPermitted;
        }

        match decide(embed_id) {
            EmbedChoice::GrantAll => {
                let granted = Selections {
                    embeds: true,
                    ..current
                };
                if self.save(granted).is_none() {
                    return EmbedOutcome::GrantFailed;
                }
                self.bus.publish(&Signal::EmbedsApproved);
                EmbedOutcome::GrantedAll
            }
            EmbedChoice::AllowOnce => match self.embeds.load(embed_id) {
                Some(Ok(())) => {
                    tracing::debug!(embed_id, "loaded embed for this page view");
                    EmbedOutcome::LoadedOnce
                }
                Some(Err(err)) => {
                    tracing::error!(error = %err, embed_id, "embed loader failed");
                    EmbedOutcome::LoaderFailed
                }
                None => {
                    tracing::warn!(embed_id, "no loader registered for embed");
                    EmbedOutcome::NoLoader
                }
            },
        }
    }

    /// Persists a fresh record and announces it. A rejected write is logged
    /// and leaves both storage and subscribers untouched.
    fn save(&self, selections: Selections) -> Option<ConsentRecord> {
        let record = ConsentRecord::new(&self.config.version, self.clock.now(), selections);
        let key = self.config.storage_key.as_str();
        let json = record.to_json();
        if let Err(err) = json.and_then(|json| self.store.set(key, &json)) {
            tracing::warn!(error = %err, key, "cannot save consent record");
            return None;
        }
        tracing::info!(
            comments = record.comments,
            embeds = record.embeds,
            "consent saved"
        );
        self.bus.publish(&Signal::ConsentChanged(record.clone()));
        Some(record)
    }

    /// Approval signals for a record that was actually persisted.
    fn resume(&self, record: Option<&ConsentRecord>) {
        let Some(record) = record else {
            return;
        };
        for category in Category::ALL {
            if !record.allows(category) {
                continue;
            }
            if let Some(signal) = Signal::approved(category) {
                self.bus.publish(&signal);
            }
        }
    }
}

impl<S> std::fmt::Debug for ConsentManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentManager")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("embeds", &self.embeds)
            .finish_non_exhaustive()
    }
}
