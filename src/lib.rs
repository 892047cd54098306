mod bus;
mod category;
mod cli;
mod clock;
mod config;
mod embeds;
mod error;
mod host;
mod manager;
mod record;
mod store;

use anyhow::Context as _;

pub use bus::{
    COMMENTS_APPROVED, CONSENT_CHANGED, EMBEDS_APPROVED, Signal, SignalBus, SubscriptionId,
};
pub use category::{Category, Selections};
pub use cli::{Args as CliArgs, Command, EmbedChoiceArg};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConsentConfig, DEFAULT_STORAGE_KEY, EmbedKind, EmbedSource};
pub use embeds::{EmbedChoice, EmbedLoader, EmbedOutcome, EmbedRegistry};
pub use error::ConsentError;
pub use host::{ConsoleHost, HostEffect, NoopHost, PromptHost, RecordingHost};
pub use manager::{ConsentManager, ConsentState};
pub use record::{CONSENT_VERSION, ConsentRecord, DEFAULT_RETENTION_DAYS};
pub use store::{ConsentStore, FileStore, MemoryStore};

/// One page view of the command-line host against a file-backed store.
pub fn run(args: CliArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ConsentConfig::load(path)?,
        None => ConsentConfig::default(),
    };
    if let Some(key) = args.storage_key {
        config.storage_key = key;
        config.validate().context("--storage-key")?;
    }

    let bus = SignalBus::new();
    bus.subscribe(|signal| println!("signal {}", signal.name()));

    let embeds = embed_registry(&config);
    let store = FileStore::new(args.store);
    let manager = ConsentManager::new(config, store, bus)
        .with_host(ConsoleHost)
        .with_embeds(embeds);

    match args.command {
        Command::Load => match manager.init() {
            ConsentState::Unknown => println!("state unknown"),
            ConsentState::Decided(_) => println!("state decided"),
        },
        Command::Status => {
            match manager.consent() {
                Some(record) => println!(
                    "record {}",
                    serde_json::to_string(&record).context("encode consent record")?
                ),
                None => println!("record none"),
            }
            for category in Category::ALL {
                println!("{category} {}", manager.has_consent(category));
            }
        }
        Command::AcceptAll => {
            manager.accept_all();
        }
        Command::RejectAll => {
            manager.reject_all();
        }
        Command::Save { comments, embeds } => {
            manager.save_custom(Selections { comments, embeds });
        }
        Command::Customize => manager.open_customize(),
        Command::CloseCustomize => manager.close_customize(),
        Command::EnableComments => {
            manager.enable_comments();
        }
        Command::EnableEmbed { id, choice } => {
            if !manager.embeds().contains(&id) {
                tracing::warn!(embed_id = %id, "embed is not declared in the config");
            }
            let outcome = manager.enable_embed(&id, |_| choice.into());
            println!("embed {id} {outcome}");
        }
        Command::Revoke => manager.revoke(),
    }

    Ok(())
}

fn embed_registry(config: &ConsentConfig) -> EmbedRegistry {
    let mut registry = EmbedRegistry::new();
    for (id, source) in &config.embeds {
        let source = source.clone();
        registry.register(id.clone(), move |id| {
            println!("load {id} {} {}", source.kind, source.src);
            Ok(())
        });
    }
    registry
}
