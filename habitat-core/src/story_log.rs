//! Ordered story history used to build the next prompt.

use serde::{Deserialize, Serialize};

/// Separator placed between story entries when building prompt history.
pub const HISTORY_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLogEntry {
    /// 1-based position in arrival order.
    pub sequence: usize,
    pub text: String,
}

/// Append-only log of past scene texts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryLog {
    entries: Vec<StoryLogEntry>,
}

impl StoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text`, returning its sequence number.
    pub fn append(&mut self, text: impl Into<String>) -> usize {
        let sequence = self.entries.len() + 1;
        self.entries.push(StoryLogEntry {
            sequence,
            text: text.into(),
        });
        sequence
    }

    pub fn entries(&self) -> &[StoryLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries joined with [`HISTORY_SEPARATOR`].
    pub fn history(&self) -> String {
        self.texts().collect::<Vec<_>>().join(HISTORY_SEPARATOR)
    }

    /// The history as it will read once `next` has been appended.
    pub fn history_with(&self, next: &str) -> String {
        self.texts()
            .chain(std::iter::once(next))
            .collect::<Vec<_>>()
            .join(HISTORY_SEPARATOR)
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }
}
