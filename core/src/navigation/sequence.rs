use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Ordered items with a parallel flag per position and a bounded cursor.
///
/// Plain moves visit every item; the `*_flagged` moves skip to the nearest
/// flagged item in the given direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSequence<T> {
    items: Vec<T>,
    flags: Vec<bool>,
    current: usize,
}

impl<T> Default for IndexedSequence<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            flags: Vec::new(),
            current: 0,
        }
    }
}

impl<T> IndexedSequence<T> {
    /// Flags each item whose key is in `flagged`. Duplicate keys are allowed;
    /// flags are per position.
    pub fn new<K, F>(items: Vec<T>, flagged: &HashSet<K>, key_of: F) -> Self
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        let flags = items.iter().map(|item| flagged.contains(&key_of(item))).collect();
        Self {
            items,
            flags,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// `None` only when the sequence is empty.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.current)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn is_flagged(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag).count()
    }

    /// Moves the cursor to `index` if it is in range.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.current > 0 && !self.is_empty() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.items.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_flagged(&mut self) -> bool {
        let end = self.current.min(self.flags.len());
        match self.flags[..end].iter().rposition(|flag| *flag) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn next_flagged(&mut self) -> bool {
        let start = (self.current + 1).min(self.flags.len());
        match self.flags[start..].iter().position(|flag| *flag) {
            Some(offset) => {
                self.current = start + offset;
                true
            }
            None => false,
        }
    }
}
