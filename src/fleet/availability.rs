//! Availability tracker: alerts for clusters that could not be reached.
//!
//! One message per failing cluster endpoint. Messages stay until an
//! operator dismisses them; a later successful poll does not clear them.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct AvailabilityTracker {
    messages: BTreeSet<String>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: an identical message is stored once.
    /// Returns `true` if the message was not already present.
    pub fn record_failure(&mut self, message: impl Into<String>) -> bool {
        self.messages.insert(message.into())
    }

    /// Removing an absent message is a no-op.
    /// Returns `true` if something was removed.
    pub fn dismiss(&mut self, message: &str) -> bool {
        self.messages.remove(message)
    }

    /// Messages in sorted order. The iterator is lazy and can be cloned
    /// to walk the list again.
    pub fn list(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.messages.iter().map(String::as_str)
    }

    pub fn contains(&self, message: &str) -> bool {
        self.messages.contains(message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
