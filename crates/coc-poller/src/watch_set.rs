//! Ordered set of watched tags with their last snapshots
//!
//! Each entry is stamped with a monotonically increasing sequence number when
//! inserted. `KeyCursor` remembers the last sequence it yielded and re-reads
//! the live set on every step, so:
//! - a tag removed before the cursor reaches it is skipped
//! - a tag added while a sweep is in progress is visited in the same pass
//! - re-adding a removed tag puts it at the end of the order
//!
//! `clear` empties the set and raises the category's `SweepAbort`, which the
//! running sweep observes before its next fetch.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

/// Cooperative cancellation flag for one category's sweep.
///
/// Raised by `WatchSet::clear`, checked once per sweep iteration, reset by
/// the sweep once acted upon.
#[derive(Debug, Clone, Default)]
pub struct SweepAbort(Arc<AtomicBool>);

impl SweepAbort {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the flag, returning whether it was raised.
    pub fn reset(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    /// `None` until the first successful fetch is stored.
    snapshot: Option<Value>,
}

#[derive(Debug, Default)]
struct Entries {
    next_seq: u64,
    order: BTreeMap<u64, String>,
    by_tag: HashMap<String, Entry>,
}

/// Watched tags for one category, in insertion order.
#[derive(Debug, Default)]
pub struct WatchSet {
    entries: RwLock<Entries>,
    abort: SweepAbort,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `tag` with an empty snapshot. Returns false if already present;
    /// its position is left unchanged.
    pub fn add(&self, tag: &str) -> bool {
        let mut entries = self.write();
        if entries.by_tag.contains_key(tag) {
            return false;
        }
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.order.insert(seq, tag.to_string());
        entries.by_tag.insert(
            tag.to_string(),
            Entry {
                seq,
                snapshot: None,
            },
        );
        true
    }

    /// Returns false if `tag` was not present.
    pub fn remove(&self, tag: &str) -> bool {
        let mut entries = self.write();
        match entries.by_tag.remove(tag) {
            Some(entry) => {
                entries.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    /// Remove every tag and ask the running sweep (if any) to stop early.
    pub fn clear(&self) {
        self.clear_entries();
        self.abort.raise();
    }

    /// Remove every tag without touching the abort flag.
    pub(crate) fn clear_entries(&self) {
        let mut entries = self.write();
        entries.order.clear();
        entries.by_tag.clear();
    }

    pub fn has(&self, tag: &str) -> bool {
        self.read().by_tag.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.read().by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_tag.is_empty()
    }

    /// Lazy cursor over the tags in insertion order.
    pub fn keys(&self) -> KeyCursor<'_> {
        KeyCursor {
            set: self,
            last_seq: None,
        }
    }

    /// Last stored snapshot, `None` if absent or never fetched.
    pub fn snapshot(&self, tag: &str) -> Option<Value> {
        self.read()
            .by_tag
            .get(tag)
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Store `value` as the snapshot for `tag` and return the previous one.
    ///
    /// A tag that was removed while its fetch was in flight stays removed.
    pub fn replace_snapshot(&self, tag: &str, value: Value) -> Option<Value> {
        self.write()
            .by_tag
            .get_mut(tag)
            .and_then(|entry| entry.snapshot.replace(value))
    }

    pub fn abort_signal(&self) -> &SweepAbort {
        &self.abort
    }

    fn next_after(&self, last_seq: Option<u64>) -> Option<(u64, String)> {
        let from = last_seq.map_or(0, |seq| seq + 1);
        self.read()
            .order
            .range(from..)
            .next()
            .map(|(seq, tag)| (*seq, tag.clone()))
    }
}

/// Live iterator returned by `WatchSet::keys`.
#[derive(Debug)]
pub struct KeyCursor<'a> {
    set: &'a WatchSet,
    last_seq: Option<u64>,
}

impl Iterator for KeyCursor<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let (seq, tag) = self.set.next_after(self.last_seq)?;
        self.last_seq = Some(seq);
        Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(tags: &[&str]) -> WatchSet {
        let set = WatchSet::new();
        for tag in tags {
            set.add(tag);
        }
        set
    }

    #[test]
    fn keys_follow_insertion_order() {
        let set = set_of(&["#2PP", "#8QU8J9LP", "#999"]);
        let keys: Vec<String> = set.keys().collect();
        assert_eq!(keys, vec!["#2PP", "#8QU8J9LP", "#999"]);
    }

    #[test]
    fn add_is_idempotent_and_keeps_position() {
        let set = set_of(&["#2PP", "#999"]);
        assert!(!set.add("#2PP"));
        assert_eq!(set.len(), 2);
        let keys: Vec<String> = set.keys().collect();
        assert_eq!(keys, vec!["#2PP", "#999"]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let set = set_of(&["#2PP"]);
        assert!(!set.remove("#999"));
        assert!(set.remove("#2PP"));
        assert!(set.is_empty());
    }

    #[test]
    fn readded_tag_moves_to_end() {
        let set = set_of(&["#2PP", "#999"]);
        set.remove("#2PP");
        set.add("#2PP");
        let keys: Vec<String> = set.keys().collect();
        assert_eq!(keys, vec!["#999", "#2PP"]);
    }

    #[test]
    fn cursor_skips_tags_removed_mid_iteration() {
        let set = set_of(&["#2PP", "#8QU8J9LP", "#999"]);
        let mut cursor = set.keys();
        assert_eq!(cursor.next().as_deref(), Some("#2PP"));
        set.remove("#8QU8J9LP");
        assert_eq!(cursor.next().as_deref(), Some("#999"));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn cursor_survives_removal_of_visited_tag() {
        let set = set_of(&["#2PP", "#8QU8J9LP", "#999"]);
        let mut cursor = set.keys();
        assert_eq!(cursor.next().as_deref(), Some("#2PP"));
        set.remove("#2PP");
        assert_eq!(cursor.next().as_deref(), Some("#8QU8J9LP"));
        assert_eq!(cursor.next().as_deref(), Some("#999"));
    }

    #[test]
    fn cursor_visits_tags_added_mid_iteration() {
        let set = set_of(&["#2PP"]);
        let mut cursor = set.keys();
        assert_eq!(cursor.next().as_deref(), Some("#2PP"));
        set.add("#999");
        assert_eq!(cursor.next().as_deref(), Some("#999"));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn keys_is_restartable() {
        let set = set_of(&["#2PP", "#999"]);
        assert_eq!(set.keys().count(), 2);
        assert_eq!(set.keys().count(), 2);
    }

    #[test]
    fn clear_empties_and_raises_abort() {
        let set = set_of(&["#2PP", "#999"]);
        let mut cursor = set.keys();
        cursor.next();
        set.clear();
        assert!(set.is_empty());
        assert!(set.abort_signal().is_raised());
        assert_eq!(cursor.next(), None);
        assert!(set.abort_signal().reset());
        assert!(!set.abort_signal().is_raised());
    }

    #[test]
    fn snapshot_starts_empty_and_replaces() {
        let set = set_of(&["#2PP"]);
        assert_eq!(set.snapshot("#2PP"), None);

        let first = serde_json::json!({"clanLevel": 10});
        assert_eq!(set.replace_snapshot("#2PP", first.clone()), None);
        assert_eq!(set.snapshot("#2PP"), Some(first.clone()));

        let second = serde_json::json!({"clanLevel": 11});
        assert_eq!(set.replace_snapshot("#2PP", second), Some(first));
    }

    #[test]
    fn replace_snapshot_does_not_resurrect_removed_tag() {
        let set = set_of(&["#2PP"]);
        set.remove("#2PP");
        set.replace_snapshot("#2PP", serde_json::json!({}));
        assert!(!set.has("#2PP"));
    }
}
