//! Keyspace with creation-ordered scan slots
//!
//! Every key is assigned a slot number from a monotonically increasing counter
//! when it is created. Overwriting a live key keeps its slot; a key that is
//! removed and later re-created (including as a RENAME destination) gets a
//! fresh slot. SCAN cursors are slot numbers, so:
//!
//! - a key that exists for the whole duration of a scan is returned exactly once
//! - keys created or removed mid-scan may or may not be returned
//! - cursor 0 starts a scan and a returned cursor of 0 ends it

use super::Value;
use ahash::AHashMap;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub slot: u64,
    pub value: Value,
}

#[derive(Debug)]
pub struct Keyspace {
    entries: AHashMap<String, Entry>,
    slots: BTreeMap<u64, String>,
    next_slot: u64,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace {
            entries: AHashMap::new(),
            slots: BTreeMap::new(),
            // Slot 0 is reserved for the "start of scan" cursor
            next_slot: 1,
        }
    }

    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert_eq!(
            self.entries.len(),
            self.slots.len(),
            "Invariant violated: every key owns exactly one slot"
        );
        debug_assert!(
            !self.slots.contains_key(&0),
            "Invariant violated: slot 0 is reserved"
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn verify_invariants(&self) {}

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key).map(|e| &mut e.value)
    }

    pub fn slot_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.slot)
    }

    fn allocate_slot(&mut self, key: &str) -> u64 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(slot, key.to_string());
        slot
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        let previous = match self.entries.get_mut(key) {
            Some(entry) => Some(std::mem::replace(&mut entry.value, value)),
            None => {
                let slot = self.allocate_slot(key);
                self.entries.insert(key.to_string(), Entry { slot, value });
                None
            }
        };
        self.verify_invariants();
        previous
    }

    /// Get the value under `key`, creating it with `default` if absent.
    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> Value) -> &mut Value {
        let Keyspace {
            entries,
            slots,
            next_slot,
        } = self;
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            let slot = *next_slot;
            *next_slot += 1;
            slots.insert(slot, key.to_string());
            Entry {
                slot,
                value: default(),
            }
        });
        &mut entry.value
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key).map(|entry| {
            self.slots.remove(&entry.slot);
            entry.value
        });
        self.verify_invariants();
        removed
    }

    /// Move the value at `src` to `dst`, replacing anything at `dst`.
    ///
    /// Returns false (and changes nothing) when `src` does not exist.
    pub fn rename(&mut self, src: &str, dst: &str) -> bool {
        if !self.entries.contains_key(src) {
            return false;
        }
        if src == dst {
            return true;
        }
        let Some(value) = self.remove(src) else {
            return false;
        };
        self.remove(dst);
        let slot = self.allocate_slot(dst);
        self.entries.insert(dst.to_string(), Entry { slot, value });

        debug_assert!(self.contains(dst), "Postcondition: rename dst must exist");
        debug_assert!(!self.contains(src), "Postcondition: rename src must not exist");
        self.verify_invariants();
        true
    }

    /// Examine up to `count` slots starting at `cursor`.
    ///
    /// Returns the keys found and the next cursor (0 when the scan is complete).
    pub fn scan(&self, cursor: u64, count: usize) -> (Vec<&str>, u64) {
        debug_assert!(count > 0, "Precondition: scan count must be positive");

        let mut iter = self.slots.range(cursor..);
        let batch: Vec<&str> = iter
            .by_ref()
            .take(count)
            .map(|(_, key)| key.as_str())
            .collect();
        let next_cursor = iter.next().map(|(slot, _)| *slot).unwrap_or(0);

        debug_assert!(
            batch.len() <= count,
            "Postcondition violated: scan batch must not exceed count"
        );
        debug_assert!(
            next_cursor == 0 || next_cursor > cursor,
            "Postcondition violated: cursor must advance"
        );
        (batch, next_cursor)
    }

    /// Keys in slot (creation) order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.values().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.verify_invariants();
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}
