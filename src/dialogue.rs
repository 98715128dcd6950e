use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One node of a conversation tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dialogue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Object triggered when this node is confirmed.
    #[serde(default)]
    pub target: String,
    /// Event fired on the bus when this node is confirmed.
    #[serde(default)]
    pub event: String,
    #[serde(default, rename = "eventArgs")]
    pub event_args: String,
    #[serde(default)]
    pub next: Option<Box<Dialogue>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub next: Option<Box<Dialogue>>,
}

impl Dialogue {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parse dialogue json")
    }

    /// The node that follows when `choice` is confirmed (or the plain `next`
    /// link when the node has no choices).
    pub fn advance(&self, choice: usize) -> Option<&Dialogue> {
        if self.choices.is_empty() {
            return self.next.as_deref();
        }
        self.choices
            .get(choice)
            .and_then(|c| c.next.as_deref())
    }
}
