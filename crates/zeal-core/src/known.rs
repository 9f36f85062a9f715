//! Well-known symbols and fundamental types.
//!
//! The tuple and lambda concretes are synthesized by every table. The
//! reference, pointer and fundamental types come from the `Zeal` standard
//! module and only exist once it has been bound (see [`crate::builtins`]).

use crate::ids::SymbolId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the standard module declaring the base library types.
pub const STD_MODULE: &str = "Zeal";

/// Simple name of the canonical variadic tuple concrete.
pub const TUPLE: &str = "()";

/// Simple name of the closure concrete, `$lambda<T>`.
pub const LAMBDA: &str = "$lambda";

/// Full names of the generic base types the table constructs on demand.
pub const REF: &str = "Zeal.Ref`1";
pub const RAW_POINTER: &str = "Zeal.RawPointer`1";
pub const MAYBE: &str = "Zeal.Maybe`1";
pub const SPAN: &str = "Zeal.Span`1";
pub const LIST: &str = "Zeal.List`1";

/// Symbolic prefix used instead of `<...>` when one of the friendly
/// generics is specialized on a single argument, e.g. `^Zeal.Int`.
pub fn friendly_prefix(concrete_full_name: &str) -> Option<&'static str> {
    match concrete_full_name {
        RAW_POINTER => Some("*"),
        REF => Some("^"),
        MAYBE => Some("?"),
        SPAN => Some("[]"),
        _ => None,
    }
}

/// Built-in types referenced by a small stable id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Fundamental {
    Void = 0,
    Nil,
    Bool,
    I8,
    Byte,
    I16,
    U16,
    I32,
    U32,
    Int,
    U64,
    F32,
    F64,
    Str,
}

impl Fundamental {
    pub const COUNT: usize = 14;

    pub const ALL: [Fundamental; Fundamental::COUNT] = [
        Fundamental::Void,
        Fundamental::Nil,
        Fundamental::Bool,
        Fundamental::I8,
        Fundamental::Byte,
        Fundamental::I16,
        Fundamental::U16,
        Fundamental::I32,
        Fundamental::U32,
        Fundamental::Int,
        Fundamental::U64,
        Fundamental::F32,
        Fundamental::F64,
        Fundamental::Str,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Fundamental> {
        Self::ALL.get(id as usize).copied()
    }

    /// Simple name as declared in the standard module.
    pub fn name(self) -> &'static str {
        match self {
            Fundamental::Void => "Void",
            Fundamental::Nil => "Nil",
            Fundamental::Bool => "Bool",
            Fundamental::I8 => "I8",
            Fundamental::Byte => "Byte",
            Fundamental::I16 => "I16",
            Fundamental::U16 => "U16",
            Fundamental::I32 => "I32",
            Fundamental::U32 => "U32",
            Fundamental::Int => "Int",
            Fundamental::U64 => "U64",
            Fundamental::F32 => "F32",
            Fundamental::F64 => "F64",
            Fundamental::Str => "Str",
        }
    }

    pub fn full_name(self) -> String {
        format!("{}.{}", STD_MODULE, self.name())
    }
}

impl fmt::Display for Fundamental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbols every table knows about.
#[derive(Debug, Clone)]
pub struct KnownSymbols {
    /// The variadic `()` concrete.
    pub tuple: SymbolId,
    /// The `$lambda`1` concrete.
    pub lambda: SymbolId,
    fundamentals: [Option<SymbolId>; Fundamental::COUNT],
}

impl KnownSymbols {
    pub(crate) fn new(tuple: SymbolId, lambda: SymbolId) -> Self {
        Self {
            tuple,
            lambda,
            fundamentals: [None; Fundamental::COUNT],
        }
    }

    pub fn fundamental(&self, f: Fundamental) -> Option<SymbolId> {
        self.fundamentals[f.id() as usize]
    }

    pub(crate) fn set_fundamental(&mut self, f: Fundamental, id: SymbolId) {
        self.fundamentals[f.id() as usize] = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fundamental_ids_are_stable() {
        for (i, f) in Fundamental::ALL.iter().enumerate() {
            assert_eq!(f.id() as usize, i);
            assert_eq!(Fundamental::from_id(i as u8), Some(*f));
        }
        assert_eq!(Fundamental::from_id(Fundamental::COUNT as u8), None);
        assert_eq!(Fundamental::Int.full_name(), "Zeal.Int");
    }

    #[test]
    fn test_friendly_prefixes() {
        assert_eq!(friendly_prefix(REF), Some("^"));
        assert_eq!(friendly_prefix(RAW_POINTER), Some("*"));
        assert_eq!(friendly_prefix(SPAN), Some("[]"));
        assert_eq!(friendly_prefix(LIST), None);
    }
}
