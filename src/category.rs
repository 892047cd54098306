use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Theme preference and similar; always permitted, never stored.
    Essential,
    /// Comment widget.
    Comments,
    /// Third-party embeds (videos, gists, slide decks).
    Embeds,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Essential, Category::Comments, Category::Embeds];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Essential => "essential",
            Category::Comments => "comments",
            Category::Embeds => "embeds",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-essential choices from a customize form. Anything not selected is denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selections {
    pub comments: bool,
    pub embeds: bool,
}

impl Selections {
    pub fn all() -> Self {
        Self {
            comments: true,
            embeds: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, category: Category) -> bool {
        match category {
            Category::Essential => true,
            Category::Comments => self.comments,
            Category::Embeds => self.embeds,
        }
    }
}
