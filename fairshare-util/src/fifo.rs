// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Insertion-ordered de-duplicating set.

use std::collections::{HashMap, VecDeque};

/// Items stored in keyed containers expose a stable string key.
pub trait Keyed {
    fn key(&self) -> String;
}

impl Keyed for String {
    fn key(&self) -> String {
        self.clone()
    }
}

/// An insertion-ordered set with O(1) add/contains/delete by key.
///
/// Deletion leaves a stale key in the order queue; stale keys are skipped
/// on pop/iteration and compacted once they outnumber live entries.
#[derive(Debug, Clone)]
pub struct Fifo<T: Keyed + Clone> {
    order: VecDeque<String>,
    items: HashMap<String, T>,
}

impl<T: Keyed + Clone> Default for Fifo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + Clone> Fifo<T> {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            items: HashMap::new(),
        }
    }

    /// Insert at the back. A re-add of a present key is a no-op; returns
    /// whether the item was inserted.
    pub fn add(&mut self, item: T) -> bool {
        let key = item.key();
        if self.items.contains_key(&key) {
            return false;
        }
        self.order.push_back(key.clone());
        self.items.insert(key, item);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.get(key)
    }

    /// Remove by key. O(1); the order queue is compacted lazily.
    pub fn delete(&mut self, key: &str) -> Option<T> {
        let removed = self.items.remove(key);
        if removed.is_some() && self.order.len() > 2 * self.items.len() {
            self.compact();
        }
        removed
    }

    /// Pop the oldest live item.
    pub fn pop(&mut self) -> Option<T> {
        while let Some(key) = self.order.pop_front() {
            if let Some(item) = self.items.remove(&key) {
                return Some(item);
            }
        }
        None
    }

    /// Live items, oldest first.
    pub fn list(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|key| self.items.get(key).cloned())
            .collect()
    }

    /// Append every item of `other`, preserving its order and skipping
    /// keys already present.
    pub fn append(&mut self, other: &Fifo<T>) {
        for item in other.list() {
            self.add(item);
        }
    }

    /// An independent snapshot.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn compact(&mut self) {
        self.order.retain(|key| self.items.contains_key(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, u32);

    impl Keyed for Item {
        fn key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_add_dedup_and_order() {
        let mut fifo = Fifo::new();
        assert!(fifo.add(Item("a", 1)));
        assert!(fifo.add(Item("b", 2)));
        assert!(!fifo.add(Item("a", 99)), "re-add must be a no-op");

        let listed = fifo.list();
        assert_eq!(listed, vec![Item("a", 1), Item("b", 2)]);
    }

    #[test]
    fn test_delete_then_pop_skips_stale() {
        let mut fifo = Fifo::new();
        fifo.add(Item("a", 1));
        fifo.add(Item("b", 2));
        fifo.add(Item("c", 3));

        assert_eq!(fifo.delete("b"), Some(Item("b", 2)));
        assert!(!fifo.contains("b"));
        assert_eq!(fifo.len(), 2);

        assert_eq!(fifo.pop(), Some(Item("a", 1)));
        assert_eq!(fifo.pop(), Some(Item("c", 3)));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn test_append_preserves_order_skips_duplicates() {
        let mut left = Fifo::new();
        left.add(Item("a", 1));
        left.add(Item("b", 2));

        let mut right = Fifo::new();
        right.add(Item("b", 99));
        right.add(Item("c", 3));

        left.append(&right);
        assert_eq!(
            left.list(),
            vec![Item("a", 1), Item("b", 2), Item("c", 3)]
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let mut fifo = Fifo::new();
        fifo.add(Item("a", 1));

        let mut snapshot = fifo.copy();
        snapshot.pop();

        assert!(snapshot.is_empty());
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn test_compaction_keeps_order() {
        let mut fifo = Fifo::new();
        for (i, key) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            fifo.add(Item(key, i as u32));
        }
        for key in ["a", "b", "c", "d"] {
            fifo.delete(key);
        }
        assert_eq!(fifo.list(), vec![Item("e", 4), Item("f", 5)]);
    }
}
