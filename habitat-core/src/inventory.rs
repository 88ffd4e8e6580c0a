//! Items the player has collected.

use serde::{Deserialize, Serialize};

/// Insertion-ordered set of collected items plus the most recent addition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTracker {
    items: Vec<String>,
    last_added: Option<String>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in the order they were collected.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// The item added by the latest turn, if that turn added one.
    pub fn last_added(&self) -> Option<&str> {
        self.last_added.as_deref()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i == item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply the item a turn awarded.
    ///
    /// Returns `true` when the item was new. Any turn that does not add a new
    /// item clears the "last added" marker, including one that repeats an
    /// item already held.
    pub fn record(&mut self, new_item: Option<&str>) -> bool {
        match new_item.map(str::trim).filter(|item| !item.is_empty()) {
            Some(item) if !self.contains(item) => {
                self.items.push(item.to_string());
                self.last_added = Some(item.to_string());
                true
            }
            _ => {
                self.last_added = None;
                false
            }
        }
    }
}
