//! Unique identifiers for symbols and assembly entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A handle to a symbol in the [`SymbolTable`](crate::symbols::SymbolTable) arena.
///
/// SymbolId is the universal identifier for:
/// - Modules and types (including tuples, lambdas and other specializations)
/// - Type parameters and generic placeholders (`#0`, `#1`, ...)
/// - Fields, functions, function parameters and locals
///
/// Handles are stable for the life of the table; symbols are never removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const INVALID: SymbolId = SymbolId(u32::MAX);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// Index of a function body within a [`Package`](crate::assembly::Package).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct FunIdx(pub u32);

impl FunIdx {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fun#{}", self.0)
    }
}

/// Index of a local slot in a function body. Parameters occupy the first slots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LocalIdx(pub u32);

impl LocalIdx {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocalIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_id() {
        let id = SymbolId::new(42);
        assert_eq!(id.index(), 42);
        assert!(id.is_valid());
        assert!(!SymbolId::INVALID.is_valid());
        assert_eq!(id.to_string(), "sym#42");
    }

    #[test]
    fn test_fun_idx() {
        let idx = FunIdx::new(3);
        assert_eq!(idx.index(), 3);
        assert_eq!(idx.to_string(), "fun#3");
    }
}
