//! The symbol node stored in the table arena.

use crate::ids::SymbolId;
use crate::source::Token;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// What a symbol declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum SymbolKind {
    Module,
    Type,
    TypeParam,
    Field,
    Fun,
    FunParam,
    Local,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Type => "type",
            SymbolKind::TypeParam => "type param",
            SymbolKind::Field => "field",
            SymbolKind::Fun => "fun",
            SymbolKind::FunParam => "fun param",
            SymbolKind::Local => "local",
        }
    }

    /// Kinds that are named by their simple name only and never indexed by full name.
    pub fn is_scoped(self) -> bool {
        matches!(
            self,
            SymbolKind::TypeParam | SymbolKind::FunParam | SymbolKind::Local
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration qualifiers as a bitset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Qualifiers(u32);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const PUBLIC: Qualifiers = Qualifiers(1 << 0);
    pub const STATIC: Qualifiers = Qualifiers(1 << 1);
    pub const CONST: Qualifiers = Qualifiers(1 << 2);
    pub const METHOD: Qualifiers = Qualifiers(1 << 3);
    pub const INTERFACE: Qualifiers = Qualifiers(1 << 4);
    pub const UNION: Qualifiers = Qualifiers(1 << 5);
    pub const ENUM: Qualifiers = Qualifiers(1 << 6);
    pub const EXTERN: Qualifiers = Qualifiers(1 << 7);
    pub const UNSAFE: Qualifiers = Qualifiers(1 << 8);
    pub const MUT: Qualifiers = Qualifiers(1 << 9);
    pub const RO: Qualifiers = Qualifiers(1 << 10);
    pub const GETTER: Qualifiers = Qualifiers(1 << 11);
    pub const SETTER: Qualifiers = Qualifiers(1 << 12);
    pub const IMPLICIT: Qualifiers = Qualifiers(1 << 13);

    const NAMES: [(Qualifiers, &'static str); 14] = [
        (Qualifiers::PUBLIC, "pub"),
        (Qualifiers::STATIC, "static"),
        (Qualifiers::CONST, "const"),
        (Qualifiers::METHOD, "method"),
        (Qualifiers::INTERFACE, "interface"),
        (Qualifiers::UNION, "union"),
        (Qualifiers::ENUM, "enum"),
        (Qualifiers::EXTERN, "extern"),
        (Qualifiers::UNSAFE, "unsafe"),
        (Qualifiers::MUT, "mut"),
        (Qualifiers::RO, "ro"),
        (Qualifiers::GETTER, "get"),
        (Qualifiers::SETTER, "set"),
        (Qualifiers::IMPLICIT, "implicit"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Qualifiers) {
        self.0 |= other.0;
    }

    /// Keyword names of the set bits, in declaration order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(q, _)| self.contains(*q))
            .map(|(_, name)| name)
    }

    /// Parse a single qualifier keyword.
    pub fn from_name(name: &str) -> Option<Qualifiers> {
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(q, _)| *q)
    }
}

impl BitOr for Qualifiers {
    type Output = Qualifiers;

    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Qualifiers {
    fn bitor_assign(&mut self, rhs: Qualifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// One declared or synthesized entity.
///
/// Symbols are only ever created through the [`SymbolTable`](super::SymbolTable),
/// which owns the arena and keeps names and indices consistent. The public
/// fields may be edited directly, but any change to `ty`, `type_args`,
/// `tuple_names`, `generic_param_names` or `receiver_type` must be followed
/// by [`SymbolTable::finalize_full_name`](super::SymbolTable::finalize_full_name).
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub qualifiers: Qualifiers,
    pub token: Option<Token>,
    /// Field, parameter and local types; the `(params, returns)` tuple of a function.
    pub ty: Option<SymbolId>,
    /// Non-empty only for specializations.
    pub type_args: Vec<SymbolId>,
    /// Parallel to `type_args` for named tuples, otherwise empty.
    pub tuple_names: Vec<String>,
    /// Declared type parameter names of a generic definition.
    pub generic_param_names: Vec<String>,
    /// Implicit `self` type of a method.
    pub receiver_type: Option<SymbolId>,
    pub(crate) simple_name: String,
    pub(crate) parent: Option<SymbolId>,
    pub(crate) order: u32,
    pub(crate) full_name: String,
    pub(crate) lookup_name: String,
    pub(crate) children: IndexMap<String, SymbolId>,
    /// `Some(n)` for the canonical placeholder `#n`.
    pub(crate) generic_param_index: Option<usize>,
}

impl Symbol {
    pub(crate) fn new(
        kind: SymbolKind,
        parent: Option<SymbolId>,
        token: Option<Token>,
        simple_name: String,
        qualifiers: Qualifiers,
    ) -> Self {
        Self {
            kind,
            qualifiers,
            token,
            ty: None,
            type_args: Vec::new(),
            tuple_names: Vec::new(),
            generic_param_names: Vec::new(),
            receiver_type: None,
            simple_name,
            parent,
            order: 0,
            full_name: String::new(),
            lookup_name: String::new(),
            children: IndexMap::new(),
            generic_param_index: None,
        }
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Key of this symbol in its parent's children map.
    pub fn lookup_name(&self) -> &str {
        &self.lookup_name
    }

    pub fn parent(&self) -> Option<SymbolId> {
        self.parent
    }

    /// Position among siblings, assigned when inserted.
    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn children(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.children.values().copied()
    }

    pub fn child(&self, lookup_name: &str) -> Option<SymbolId> {
        self.children.get(lookup_name).copied()
    }

    pub fn is_specialized(&self) -> bool {
        !self.type_args.is_empty()
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_param_names.is_empty()
    }

    pub fn is_fun(&self) -> bool {
        self.kind == SymbolKind::Fun
    }

    pub fn is_method(&self) -> bool {
        self.qualifiers.contains(Qualifiers::METHOD)
    }

    /// The placeholder index if this is `#n`.
    pub fn generic_param_index(&self) -> Option<usize> {
        self.generic_param_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_names_in_order() {
        let q = Qualifiers::STATIC | Qualifiers::PUBLIC | Qualifiers::METHOD;
        let names: Vec<_> = q.names().collect();
        assert_eq!(names, vec!["pub", "static", "method"]);
        assert!(q.contains(Qualifiers::STATIC | Qualifiers::METHOD));
        assert!(!q.contains(Qualifiers::CONST));
    }

    #[test]
    fn test_qualifier_from_name() {
        assert_eq!(Qualifiers::from_name("interface"), Some(Qualifiers::INTERFACE));
        assert_eq!(Qualifiers::from_name("get"), Some(Qualifiers::GETTER));
        assert_eq!(Qualifiers::from_name("virtual"), None);

        let mut q = Qualifiers::NONE;
        assert!(q.is_empty());
        q |= Qualifiers::RO;
        q.insert(Qualifiers::MUT);
        assert_eq!(q.bits(), (1 << 9) | (1 << 10));
    }

    #[test]
    fn test_scoped_kinds() {
        assert!(SymbolKind::Local.is_scoped());
        assert!(SymbolKind::TypeParam.is_scoped());
        assert!(!SymbolKind::Field.is_scoped());
        assert_eq!(SymbolKind::FunParam.to_string(), "fun param");
    }
}
