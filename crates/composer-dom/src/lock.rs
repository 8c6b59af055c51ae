//! Named re-entrancy locks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

/// Paths a programmatic edit must not loop back through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockType {
    /// The live Markdown check.
    ContentChange,
    /// Debounced history snapshots.
    History,
}

/// A set of counted locks keyed by name. Locks nest: a key stays locked
/// until every guard taken on it is dropped.
#[derive(Debug)]
pub struct MultiLock<K> {
    counts: Rc<RefCell<HashMap<K, usize>>>,
}

impl<K> Clone for MultiLock<K> {
    fn clone(&self) -> Self {
        Self {
            counts: Rc::clone(&self.counts),
        }
    }
}

impl<K> Default for MultiLock<K> {
    fn default() -> Self {
        Self {
            counts: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<K: Copy + Eq + Hash> MultiLock<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, key: K) -> bool {
        self.counts.borrow().get(&key).is_some_and(|count| *count > 0)
    }

    /// Lock every key until the guard is dropped.
    pub fn lock(&self, keys: &[K]) -> LockGuard<K> {
        let mut counts = self.counts.borrow_mut();
        for key in keys {
            *counts.entry(*key).or_default() += 1;
        }
        LockGuard {
            counts: Rc::clone(&self.counts),
            keys: keys.to_vec(),
        }
    }
}

/// Releases its keys on drop, on every exit path.
#[must_use = "the lock is released when the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<K: Copy + Eq + Hash> {
    counts: Rc<RefCell<HashMap<K, usize>>>,
    keys: Vec<K>,
}

impl<K: Copy + Eq + Hash> Drop for LockGuard<K> {
    fn drop(&mut self) {
        let mut counts = self.counts.borrow_mut();
        for key in &self.keys {
            if let Some(count) = counts.get_mut(key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(key);
                }
            }
        }
    }
}
