// Channel identifiers and the per-crawl collected set

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Normalized absolute channel URL (query string and fragment stripped)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap an already-normalized URL.
    ///
    /// Normalization is the link extractor's job; this constructor does not
    /// re-validate.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered set of identifiers, capped at a target size
///
/// Scoped to one crawl. Once `len() == capacity` further inserts are refused,
/// so the final result can never overshoot the job's target.
#[derive(Debug, Clone)]
pub struct CollectedSet {
    order: Vec<ChannelId>,
    seen: HashSet<ChannelId>,
    capacity: usize,
}

impl CollectedSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            capacity,
        }
    }

    /// Insert one identifier. Returns true only if it was new and fit.
    pub fn insert(&mut self, id: ChannelId) -> bool {
        if self.is_full() || self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Merge a batch, preserving the batch order for new entries.
    /// Returns how many were added.
    pub fn merge<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ChannelId>,
    {
        let mut added = 0;
        for id in ids {
            if self.is_full() {
                break;
            }
            if self.insert(id) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[ChannelId] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<ChannelId> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ChannelId {
        ChannelId::new(format!("https://www.youtube.com/@{s}"))
    }

    #[test]
    fn test_merge_dedups_and_keeps_first_seen_order() {
        let mut set = CollectedSet::with_capacity(10);
        assert_eq!(set.merge(vec![id("a"), id("b")]), 2);
        assert_eq!(set.merge(vec![id("b"), id("c"), id("a")]), 1);

        assert_eq!(set.as_slice(), &[id("a"), id("b"), id("c")]);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut set = CollectedSet::with_capacity(2);
        let added = set.merge(vec![id("a"), id("b"), id("c"), id("d")]);

        assert_eq!(added, 2);
        assert_eq!(set.len(), 2);
        assert!(set.is_full());
        assert!(!set.insert(id("e")));
        assert!(!set.contains(&id("c")));
    }

    #[test]
    fn test_duplicate_insert_is_refused() {
        let mut set = CollectedSet::with_capacity(5);
        assert!(set.insert(id("a")));
        assert!(!set.insert(id("a")));
        assert_eq!(set.len(), 1);
    }
}
