//! Deduplicating constant pools.

use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// An append-only pool that deduplicates entries by a canonical string key.
///
/// Each unique key is assigned the next index; inserting an equal key
/// again returns the existing index.
#[derive(Debug, Clone)]
pub struct ConstPool<T> {
    map: HashMap<String, u32>,
    items: Vec<T>,
}

impl<T> Default for ConstPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConstPool<T> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            items: Vec::new(),
        }
    }

    /// Insert `value` under `key`, returning its index.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> u32 {
        let key = key.into();
        if let Some(&index) = self.map.get(&key) {
            return index;
        }
        let index = self.items.len() as u32;
        self.map.insert(key, index);
        self.items.push(value);
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize)
    }

    /// Index of an already inserted key.
    pub fn index_of(&self, key: &str) -> Option<u32> {
        self.map.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.items.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T: Serialize> Serialize for ConstPool<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
