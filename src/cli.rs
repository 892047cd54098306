use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::embeds::EmbedChoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedChoiceArg {
    /// Enable all embedded content and remember it.
    All,
    /// Load only this embed, for this page view.
    Once,
}

impl From<EmbedChoiceArg> for EmbedChoice {
    fn from(value: EmbedChoiceArg) -> Self {
        match value {
            EmbedChoiceArg::All => EmbedChoice::GrantAll,
            EmbedChoiceArg::Once => EmbedChoice::AllowOnce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Evaluate the stored decision as a page load would.
    Load,
    /// Print the stored record and the permission of each category.
    Status,
    /// Grant comments and embeds.
    AcceptAll,
    /// Deny comments and embeds.
    RejectAll,
    /// Grant exactly the listed categories; the rest are denied.
    Save {
        #[arg(long)]
        comments: bool,
        #[arg(long)]
        embeds: bool,
    },
    /// Open the settings dialog with the current choices.
    Customize,
    /// Close the settings dialog without saving.
    CloseCustomize,
    /// Grant comments, keeping the embeds decision.
    EnableComments,
    /// Activate one embed that is still blocked.
    EnableEmbed {
        /// Embed id as declared in the config file.
        id: String,
        #[arg(long, value_enum)]
        choice: EmbedChoiceArg,
    },
    /// Forget the stored decision and reload.
    Revoke,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Key/value JSON file standing in for browser local storage.
    #[arg(long, default_value = "consent-store.json")]
    pub store: PathBuf,

    /// JSON config file (storage key, version tag, retention window, embeds).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the storage key from the config file.
    #[arg(long)]
    pub storage_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}
