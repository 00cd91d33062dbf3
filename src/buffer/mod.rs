//! Bounded, time-keyed recency buffer backing each sampling pipeline.
mod list;


use std::collections::HashMap;
use std::num::NonZeroUsize;

use chrono::{DateTime, Timelike, Utc};

use list::RecencyList;

/// Drops the sub-second part of `timestamp`.
#[must_use]
pub fn truncate_to_second(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.with_nanosecond(0).unwrap_or(timestamp)
}

#[derive(Debug)]
struct Entry<T> {
    key: i64,
    value: T,
}

/// Holds at most `capacity` samples keyed by their one-second timestamp.
///
/// Recency is tracked by insertion/update, not by timestamp: when a new key
/// arrives at capacity the least recently touched entry is evicted. Point and
/// range lookups leave the recency order untouched.
#[derive(Debug)]
pub struct SlidingWindowBuffer<T> {
    capacity: NonZeroUsize,
    order: RecencyList<Entry<T>>,
    index: HashMap<i64, usize>,
}

impl<T> SlidingWindowBuffer<T> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            order: RecencyList::with_capacity(capacity.get()),
            index: HashMap::with_capacity(capacity.get()),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order.len() == 0
    }

    /// Stores `value` at `timestamp` truncated to the second.
    ///
    /// Returns `true` when an existing entry was overwritten.
    pub fn set(&mut self, timestamp: DateTime<Utc>, value: T) -> bool {
        let key = timestamp.timestamp();

        if let Some(&idx) = self.index.get(&key) {
            if let Some(entry) = self.order.get_mut(idx) {
                entry.value = value;
            }
            self.order.move_to_front(idx);
            return true;
        }

        if self.order.len() >= self.capacity.get()
            && let Some(evicted) = self.order.pop_back()
        {
            self.index.remove(&evicted.key);
        }

        let idx = self.order.push_front(Entry { key, value });
        self.index.insert(key, idx);
        false
    }

    #[must_use]
    pub fn get(&self, timestamp: DateTime<Utc>) -> Option<&T> {
        let idx = self.index.get(&timestamp.timestamp())?;
        self.order.get(*idx).map(|entry| &entry.value)
    }

    /// Values stored at `start`, `start + 1s`, ..., `start + (count - 1)s`, in
    /// chronological order. Missing seconds are skipped.
    #[must_use]
    pub fn range(&self, start: DateTime<Utc>, count: usize) -> Vec<T>
    where
        T: Clone,
    {
        let start = start.timestamp();
        (0..count)
            .filter_map(|offset| {
                let key = start.checked_add(i64::try_from(offset).ok()?)?;
                let idx = self.index.get(&key)?;
                self.order.get(*idx).map(|entry| entry.value.clone())
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    /// Keys from most to least recently touched.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = i64> + '_ {
        self.order.iter().map(|entry| entry.key)
    }
}
