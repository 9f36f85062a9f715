//! Type-safe indexed vector collection.

use serde::{Serialize, Serializer};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A trait for types that can be used as indices.
pub trait Idx: Copy + Eq {
    fn new(raw: u32) -> Self;
    fn index(self) -> usize;
}

/// A Vec indexed by a newtype index for type safety.
#[derive(Debug, Clone)]
pub struct IndexVec<I: Idx, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Push a value and return its index.
    pub fn push(&mut self, value: T) -> I {
        let idx = I::new(self.raw.len() as u32);
        self.raw.push(value);
        idx
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    pub fn get_mut(&mut self, idx: I) -> Option<&mut T> {
        self.raw.get_mut(idx.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.raw.iter()
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (I::new(i as u32), v))
    }

    pub fn next_idx(&self) -> I {
        I::new(self.raw.len() as u32)
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

impl<I: Idx, T: Serialize> Serialize for IndexVec<I, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

macro_rules! impl_idx {
    ($ty:ty) => {
        impl Idx for $ty {
            fn new(raw: u32) -> Self {
                Self(raw)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

impl_idx!(crate::ids::SymbolId);
impl_idx!(crate::ids::FunIdx);
impl_idx!(crate::ids::LocalIdx);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FunIdx, SymbolId};

    #[test]
    fn test_index_vec_push() {
        let mut vec: IndexVec<SymbolId, String> = IndexVec::new();

        let id0 = vec.push("first".to_string());
        let id1 = vec.push("second".to_string());

        assert_eq!(id0, SymbolId::new(0));
        assert_eq!(id1, SymbolId::new(1));
        assert_eq!(vec.len(), 2);
        assert_eq!(vec.next_idx(), SymbolId::new(2));
    }

    #[test]
    fn test_index_vec_access() {
        let mut vec: IndexVec<FunIdx, i32> = IndexVec::new();
        let id = vec.push(42);

        assert_eq!(vec[id], 42);
        assert_eq!(vec.get(id), Some(&42));
        assert_eq!(vec.get(FunIdx::new(7)), None);

        vec[id] = 100;
        assert_eq!(vec[id], 100);
    }
}
