use std::collections::HashMap;

use crate::transport::MessageId;

/// Last message posted per category.
///
/// Every configured title starts out untracked. Entries are never removed;
/// only the reconciler updates them, after a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMessageState {
    entries: HashMap<String, Option<MessageId>>,
}

impl ChannelMessageState {
    /// Creates a table with every title untracked.
    #[must_use]
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: titles.into_iter().map(|t| (t.into(), None)).collect(),
        }
    }

    /// Returns the tracked message for `title`, if any.
    #[must_use]
    pub fn tracked(&self, title: &str) -> Option<&MessageId> {
        self.entries.get(title).and_then(Option::as_ref)
    }

    /// Records `message` as the live message for `title`.
    ///
    /// Returns the previously tracked id.
    pub fn track(&mut self, title: &str, message: MessageId) -> Option<MessageId> {
        match self.entries.get_mut(title) {
            Some(slot) => slot.replace(message),
            None => {
                self.entries.insert(title.to_string(), Some(message));
                None
            }
        }
    }

    /// Returns true if `title` has an entry (tracked or not).
    #[must_use]
    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of categories with a live message.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_untracked() {
        let state = ChannelMessageState::new(["Core", "Edge"]);
        assert_eq!(state.len(), 2);
        assert!(state.contains("Core"));
        assert_eq!(state.tracked("Core"), None);
        assert_eq!(state.tracked_count(), 0);
    }

    #[test]
    fn track_replaces_previous_id() {
        let mut state = ChannelMessageState::new(["Core"]);
        assert_eq!(state.track("Core", MessageId::new("1")), None);
        assert_eq!(state.track("Core", MessageId::new("2")), Some(MessageId::new("1")));
        assert_eq!(state.tracked("Core"), Some(&MessageId::new("2")));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn tracking_unknown_title_adds_entry() {
        let mut state = ChannelMessageState::default();
        assert!(state.is_empty());
        state.track("Late", MessageId::new("9"));
        assert_eq!(state.tracked("Late"), Some(&MessageId::new("9")));
    }
}
