use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
use site_consent::{
    COMMENTS_APPROVED, CONSENT_CHANGED, Category, ConsentConfig, ConsentManager, ConsentRecord,
    ConsentState, ConsentStore, EMBEDS_APPROVED, EmbedChoice, EmbedOutcome, EmbedRegistry,
    HostEffect, ManualClock, MemoryStore, RecordingHost, Selections, Signal, SignalBus,
};

const KEY: &str = "cookie-consent";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap()
}

struct Page {
    manager: ConsentManager<MemoryStore>,
    host: RecordingHost,
    signals: Arc<Mutex<Vec<Signal>>>,
}

impl Page {
    /// A fresh page view over `store`, with a signal recorder subscribed first.
    fn load(store: &MemoryStore, clock: &ManualClock) -> Self {
        Self::load_with(store, clock, EmbedRegistry::new())
    }

    fn load_with(store: &MemoryStore, clock: &ManualClock, embeds: EmbedRegistry) -> Self {
        let bus = SignalBus::new();
        let signals = Arc::new(Mutex::new(Vec::new()));
        let sink = signals.clone();
        bus.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

        let host = RecordingHost::new();
        let manager = ConsentManager::new(ConsentConfig::default(), store.clone(), bus)
            .with_host(host.clone())
            .with_clock(clock.clone())
            .with_embeds(embeds);
        Self {
            manager,
            host,
            signals,
        }
    }

    fn approvals(&self) -> Vec<&'static str> {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .map(Signal::name)
            .filter(|name| *name != CONSENT_CHANGED)
            .collect()
    }

    fn signal_names(&self) -> Vec<&'static str> {
        self.signals.lock().unwrap().iter().map(Signal::name).collect()
    }
}

fn stored_record(store: &MemoryStore) -> ConsentRecord {
    serde_json::from_str(&store.raw(KEY).expect("record stored")).unwrap()
}

#[test]
fn custom_selections_round_trip_through_storage() {
    let clock = ManualClock::new(now());
    for comments in [false, true] {
        for embeds in [false, true] {
            let store = MemoryStore::new();
            let page = Page::load(&store, &clock);
            let selections = Selections { comments, embeds };
            page.manager.save_custom(selections);

            let reloaded = Page::load(&store, &clock);
            assert_eq!(reloaded.manager.has_consent(Category::Comments), comments);
            assert_eq!(reloaded.manager.has_consent(Category::Embeds), embeds);
            assert!(reloaded.manager.has_consent(Category::Essential));
        }
    }
}

#[test]
fn essential_is_permitted_without_any_storage() {
    let clock = ManualClock::new(now());
    let page = Page::load(&MemoryStore::new(), &clock);
    assert!(page.manager.has_consent(Category::Essential));
    assert!(!page.manager.has_consent(Category::Comments));

    let disabled = Page::load(&MemoryStore::disabled(), &clock);
    assert!(disabled.manager.has_consent(Category::Essential));
    assert!(!disabled.manager.has_consent(Category::Embeds));
}

#[test]
fn example_record_answers_per_category() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    store.insert_raw(
        KEY,
        &format!(
            r#"{{"version":"1.0","timestamp":"{}","comments":true,"embeds":false}}"#,
            now().to_rfc3339()
        ),
    );
    let page = Page::load(&store, &clock);
    assert!(page.manager.has_consent(Category::Comments));
    assert!(!page.manager.has_consent(Category::Embeds));
    assert!(page.manager.has_consent(Category::Essential));
}

#[test]
fn expired_record_is_purged_and_prompt_shown() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    Page::load(&store, &clock).manager.accept_all();

    clock.advance(TimeDelta::days(366));
    let page = Page::load(&store, &clock);
    assert!(!page.manager.has_consent(Category::Comments));
    assert!(!store.contains(KEY));

    let stale = ConsentRecord::new("1.0", now(), Selections::all());
    store.insert_raw(KEY, &serde_json::to_string(&stale).unwrap());
    assert_eq!(page.manager.init(), ConsentState::Unknown);
    assert_eq!(page.host.effects(), vec![HostEffect::ShowBanner]);
    assert!(page.approvals().is_empty());
    assert!(!store.contains(KEY));
}

#[test]
fn record_within_retention_window_survives() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    Page::load(&store, &clock).manager.reject_all();

    clock.advance(TimeDelta::days(365));
    let page = Page::load(&store, &clock);
    assert!(matches!(page.manager.init(), ConsentState::Decided(_)));
    assert!(store.contains(KEY));
}

#[test]
fn accept_all_then_reload_resumes_each_signal_once() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();

    let first = Page::load(&store, &clock);
    assert_eq!(first.manager.init(), ConsentState::Unknown);
    first.manager.accept_all();
    assert_eq!(
        first.signal_names(),
        vec![CONSENT_CHANGED, COMMENTS_APPROVED, EMBEDS_APPROVED]
    );
    assert_eq!(
        first.host.effects(),
        vec![HostEffect::ShowBanner, HostEffect::HideBanner]
    );

    let second = Page::load(&store, &clock);
    let state = second.manager.init();
    assert!(matches!(state, ConsentState::Decided(ref r) if r.comments && r.embeds));
    assert_eq!(second.approvals(), vec![COMMENTS_APPROVED, EMBEDS_APPROVED]);
    assert!(second.host.effects().is_empty());
}

#[test]
fn reject_all_persists_denial_without_approvals() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    page.manager.reject_all();

    assert!(page.approvals().is_empty());
    assert_eq!(page.signal_names(), vec![CONSENT_CHANGED]);
    assert_eq!(page.host.effects(), vec![HostEffect::HideBanner]);

    let record = stored_record(&store);
    assert!(!record.comments);
    assert!(!record.embeds);
    assert_eq!(record.version, "1.0");
    assert_eq!(record.timestamp, now());

    let reloaded = Page::load(&store, &clock);
    assert!(matches!(reloaded.manager.init(), ConsentState::Decided(_)));
    assert!(reloaded.approvals().is_empty());
}

#[test]
fn save_custom_resumes_only_granted_categories() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    page.manager.save_custom(Selections {
        comments: false,
        embeds: true,
    });

    assert_eq!(page.approvals(), vec![EMBEDS_APPROVED]);
    assert_eq!(
        page.host.effects(),
        vec![HostEffect::HideCustomize, HostEffect::HideBanner]
    );
}

#[test]
fn consent_changed_carries_the_saved_record() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    let saved = page
        .manager
        .save_custom(Selections {
            comments: true,
            embeds: false,
        })
        .expect("record saved");

    let signals = page.signals.lock().unwrap();
    assert_eq!(signals[0], Signal::ConsentChanged(saved.clone()));
    assert_eq!(stored_record(&store), saved);
}

#[test]
fn revoke_clears_storage_and_reloads() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    store.insert_raw("theme", "dark");
    let page = Page::load(&store, &clock);
    page.manager.accept_all();
    page.host.take();

    page.manager.revoke();
    assert!(!store.contains(KEY));
    assert!(store.contains("theme"));
    assert_eq!(page.host.effects(), vec![HostEffect::ReloadPage]);

    let fresh = Page::load(&store, &clock);
    assert_eq!(fresh.manager.init(), ConsentState::Unknown);
    assert_eq!(fresh.host.effects(), vec![HostEffect::ShowBanner]);
}

#[test]
fn revoke_without_record_still_reloads() {
    let clock = ManualClock::new(now());
    let page = Page::load(&MemoryStore::disabled(), &clock);
    page.manager.revoke();
    assert_eq!(page.host.effects(), vec![HostEffect::ReloadPage]);
}

#[test]
fn malformed_payload_reads_as_no_consent_and_is_discarded() {
    let clock = ManualClock::new(now());
    for payload in [
        "{not json",
        r#"{"version":"1.0","comments":true,"embeds":true}"#,
        r#"{"version":"1.0","timestamp":"yesterday","comments":true,"embeds":true}"#,
        r#"["comments"]"#,
    ] {
        let store = MemoryStore::new();
        store.insert_raw(KEY, payload);
        let page = Page::load(&store, &clock);
        assert!(!page.manager.has_consent(Category::Comments), "{payload}");
        assert!(!page.manager.has_consent(Category::Embeds), "{payload}");
        assert!(!store.contains(KEY), "{payload}");
        assert_eq!(page.manager.init(), ConsentState::Unknown);
    }
}

#[test]
fn failed_save_announces_nothing() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::disabled();
    let page = Page::load(&store, &clock);

    assert_eq!(page.manager.accept_all(), None);
    assert!(page.signal_names().is_empty());
    assert!(!page.manager.has_consent(Category::Comments));
    assert!(!store.contains(KEY));

    let record = page.manager.save_custom(Selections {
        comments: true,
        embeds: false,
    });
    assert_eq!(record, None);
    assert!(page.signal_names().is_empty());
    assert_eq!(
        page.host.effects(),
        vec![
            HostEffect::HideBanner,
            HostEffect::HideCustomize,
            HostEffect::HideBanner,
        ]
    );
}

#[test]
fn failed_comment_or_embed_grant_announces_nothing() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::disabled();
    let page = Page::load(&store, &clock);

    assert_eq!(page.manager.enable_comments(), None);
    let outcome = page
        .manager
        .enable_embed("video-1", |_| EmbedChoice::GrantAll);
    assert_eq!(outcome, EmbedOutcome::GrantFailed);
    assert!(page.signal_names().is_empty());
    assert!(!page.manager.has_consent(Category::Embeds));
}

#[test]
fn quota_exceeded_save_is_a_no_op() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::with_quota(16);
    let page = Page::load(&store, &clock);
    page.manager.accept_all();

    assert!(store.get(KEY).unwrap().is_none());
    assert!(page.signal_names().is_empty());

    let reloaded = Page::load(&store, &clock);
    assert_eq!(reloaded.manager.init(), ConsentState::Unknown);
    assert_eq!(reloaded.host.effects(), vec![HostEffect::ShowBanner]);
}

#[test]
fn widgets_subscribed_after_init_miss_the_resume() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    Page::load(&store, &clock).manager.accept_all();

    let page = Page::load(&store, &clock);
    let early = Arc::new(Mutex::new(0));
    let counter = early.clone();
    page.manager
        .bus()
        .on_approved(Category::Comments, move || *counter.lock().unwrap() += 1);

    page.manager.init();

    let late = Arc::new(Mutex::new(0));
    let counter = late.clone();
    page.manager
        .bus()
        .on_approved(Category::Comments, move || *counter.lock().unwrap() += 1);

    assert_eq!(*early.lock().unwrap(), 1);
    assert_eq!(*late.lock().unwrap(), 0);
}

#[test]
fn allow_once_runs_only_that_embed_and_persists_nothing() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let loaded = Arc::new(Mutex::new(Vec::new()));

    let mut embeds = EmbedRegistry::new();
    for id in ["video-1", "video-2"] {
        let sink = loaded.clone();
        embeds.register(id, move |id| {
            sink.lock().unwrap().push(id.to_string());
            Ok(())
        });
    }
    let page = Page::load_with(&store, &clock, embeds);

    let asked = Arc::new(Mutex::new(Vec::new()));
    let log = asked.clone();
    let outcome = page.manager.enable_embed("video-2", |id| {
        log.lock().unwrap().push(id.to_string());
        EmbedChoice::AllowOnce
    });

    assert_eq!(outcome, EmbedOutcome::LoadedOnce);
    assert_eq!(*asked.lock().unwrap(), vec!["video-2".to_string()]);
    assert_eq!(*loaded.lock().unwrap(), vec!["video-2".to_string()]);
    assert!(store.raw(KEY).is_none());
    assert!(page.signal_names().is_empty());
    assert!(!page.manager.has_consent(Category::Embeds));
}

#[test]
fn allow_once_reports_missing_or_failing_loader() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let mut embeds = EmbedRegistry::new();
    embeds.register("slides", |_| anyhow::bail!("frame refused"));
    let page = Page::load_with(&store, &clock, embeds);

    assert_eq!(
        page.manager.enable_embed("gist", |_| EmbedChoice::AllowOnce),
        EmbedOutcome::NoLoader
    );
    assert_eq!(
        page.manager.enable_embed("slides", |_| EmbedChoice::AllowOnce),
        EmbedOutcome::LoaderFailed
    );
    assert!(store.raw(KEY).is_none());
}

#[test]
fn grant_all_from_embed_persists_and_releases_pending_embeds() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    page.manager.enable_comments();
    page.signals.lock().unwrap().clear();

    let outcome = page
        .manager
        .enable_embed("video-1", |_| EmbedChoice::GrantAll);
    assert_eq!(outcome, EmbedOutcome::GrantedAll);
    assert_eq!(page.approvals(), vec![EMBEDS_APPROVED]);

    let record = stored_record(&store);
    assert!(record.embeds);
    assert!(record.comments);
}

#[test]
fn embed_with_existing_consent_skips_the_question() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    page.manager.accept_all();
    page.signals.lock().unwrap().clear();

    let outcome = page
        .manager
        .enable_embed("video-1", |_| panic!("should not ask"));
    assert_eq!(outcome, EmbedOutcome::AlreadyPermitted);
    assert!(page.signal_names().is_empty());
}

#[test]
fn enable_comments_keeps_embeds_decision() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);
    page.manager.save_custom(Selections {
        comments: false,
        embeds: true,
    });
    page.signals.lock().unwrap().clear();

    page.manager.enable_comments();
    assert_eq!(page.approvals(), vec![COMMENTS_APPROVED]);
    let record = stored_record(&store);
    assert!(record.comments);
    assert!(record.embeds);
}

#[test]
fn customize_dialog_is_prefilled_from_the_record() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let page = Page::load(&store, &clock);

    page.manager.open_customize();
    page.manager.save_custom(Selections {
        comments: true,
        embeds: false,
    });
    page.manager.open_customize();
    page.manager.close_customize();

    assert_eq!(
        page.host.effects(),
        vec![
            HostEffect::ShowCustomize(Selections::none()),
            HostEffect::HideCustomize,
            HostEffect::HideBanner,
            HostEffect::ShowCustomize(Selections {
                comments: true,
                embeds: false,
            }),
            HostEffect::HideCustomize,
        ]
    );
}
