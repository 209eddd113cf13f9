//! Mutex-guarded keyed store with auto-increment keys.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;
use crate::value::FieldValue;

use super::record::Record;

/// First value of the auto-increment counter. The first allocated key is one above it.
pub const AUTO_KEY_START: i64 = -99_999_999_999_999;

/// Key-space band that triggers a collision advisory.
///
/// A key is inside the zone when `low < key < high`. Landing there only emits a
/// `tracing` warning; the operation itself is never blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningZone {
    /// Exclusive lower bound.
    pub low: i64,
    /// Exclusive upper bound.
    pub high: i64,
}

impl WarningZone {
    /// Returns true when `key` lies strictly between the bounds.
    #[must_use]
    pub const fn contains(&self, key: i64) -> bool {
        self.low < key && key < self.high
    }
}

impl Default for WarningZone {
    fn default() -> Self {
        Self {
            low: AUTO_KEY_START,
            high: -90_000_000_000_001,
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<i64, T>,
    counter: i64,
}

/// Generic concurrent map from `i64` keys to application state.
///
/// Every operation takes the single store-wide lock for its whole duration,
/// including the scan in [`find_key_by_field`](Self::find_key_by_field). The
/// store is meant for small per-entity state (one entry per chat, per user)
/// and is shared between handlers with an `Arc`.
///
/// ```
/// use botloop::KeyedStore;
///
/// let store: KeyedStore<String> = KeyedStore::new();
/// store.set(10, "hello".to_string());
/// assert_eq!(store.get(10), "hello");
/// assert_eq!(store.get(11), "");
/// ```
#[derive(Debug)]
pub struct KeyedStore<T> {
    inner: Mutex<Inner<T>>,
    zone: WarningZone,
}

impl<T> KeyedStore<T> {
    /// Creates an empty store with the default warning zone.
    #[must_use]
    pub fn new() -> Self {
        Self::with_warning_zone(WarningZone::default())
    }

    /// Creates an empty store with a custom warning zone.
    #[must_use]
    pub fn with_warning_zone(zone: WarningZone) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                counter: AUTO_KEY_START,
            }),
            zone,
        }
    }

    // A handler that panicked while holding the lock leaves the map intact,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Zone checked by `set`, `update` and `add_auto`.
    #[must_use]
    pub const fn warning_zone(&self) -> WarningZone {
        self.zone
    }

    /// Overwrites or creates the entry at `key`.
    pub fn set(&self, key: i64, value: T) {
        if self.zone.contains(key) {
            tracing::warn!(
                target: "botloop::store",
                key,
                low = self.zone.low,
                high = self.zone.high,
                "key is inside the auto-increment warning zone"
            );
        }
        self.lock().entries.insert(key, value);
    }

    /// Stores `value` under the next auto-increment key and returns that key.
    ///
    /// The warning zone is checked against the counter before it advances.
    /// With the default zone the counter stays inside the band for the first
    /// 10^13 allocations, so every call after the first logs one warning.
    pub fn add_auto(&self, value: T) -> i64 {
        let mut inner = self.lock();
        if self.zone.contains(inner.counter) {
            tracing::warn!(
                target: "botloop::store",
                counter = inner.counter,
                low = self.zone.low,
                high = self.zone.high,
                "auto-increment counter is inside the warning zone"
            );
        }
        inner.counter += 1;
        let key = inner.counter;
        inner.entries.insert(key, value);
        key
    }

    /// Removes the entry at `key`, returning it if it was present.
    pub fn delete(&self, key: i64) -> Option<T> {
        self.lock().entries.remove(&key)
    }

    /// Returns true if `key` has an entry.
    #[must_use]
    pub fn contains_key(&self, key: i64) -> bool {
        self.lock().entries.contains_key(&key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Keys currently present, in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<i64> {
        self.lock().entries.keys().copied().collect()
    }

    /// Current value of the auto-increment counter (the last key handed out).
    #[must_use]
    pub fn counter(&self) -> i64 {
        self.lock().counter
    }
}

impl<T: Clone + Default> KeyedStore<T> {
    /// Returns a clone of the value at `key`, or `T::default()` if absent.
    #[must_use]
    pub fn get(&self, key: i64) -> T {
        self.lock().entries.get(&key).cloned().unwrap_or_default()
    }
}

impl<T: Default> KeyedStore<T> {
    /// Read-modify-write under a single lock acquisition.
    ///
    /// Missing entries start from `T::default()`. Returns whatever `f` returns.
    pub fn update<R>(&self, key: i64, f: impl FnOnce(&mut T) -> R) -> R {
        if self.zone.contains(key) {
            tracing::warn!(
                target: "botloop::store",
                key,
                low = self.zone.low,
                high = self.zone.high,
                "key is inside the auto-increment warning zone"
            );
        }
        let mut inner = self.lock();
        f(inner.entries.entry(key).or_default())
    }
}

impl<T: Record> KeyedStore<T> {
    /// Returns the key of a stored record whose `field` equals `target`.
    ///
    /// Entries that are not records (an empty `Option`) are skipped. When more
    /// than one entry matches, which key is returned is unspecified.
    ///
    /// # Errors
    ///
    /// - [`StoreError::FieldNotFound`] if a record has no field named `field`.
    /// - [`StoreError::NotARecord`] if the store is non-empty but holds no records.
    /// - [`StoreError::NoMatch`] if no record matches, including an empty store.
    pub fn find_key_by_field(&self, field: &str, target: impl Into<FieldValue>) -> Result<i64, StoreError> {
        let target = target.into();
        let inner = self.lock();

        let mut saw_record = false;
        for (key, value) in &inner.entries {
            if !value.is_record() {
                continue;
            }
            saw_record = true;

            let Some(found) = value.field(field) else {
                return Err(StoreError::FieldNotFound {
                    field: field.to_string(),
                });
            };
            if found == target {
                return Ok(*key);
            }
        }

        if !saw_record && !inner.entries.is_empty() {
            return Err(StoreError::NotARecord);
        }
        Err(StoreError::NoMatch {
            field: field.to_string(),
        })
    }
}

impl<T> Default for KeyedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
