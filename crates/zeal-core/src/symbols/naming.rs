//! Full name and lookup name rendering.
//!
//! Rules, first match wins:
//! - type parameters, function parameters, locals and the root: simple name
//! - tuples: `(A,B)`, or `(a A,b B)` when named
//! - friendly single-argument generics: `*T`, `^T`, `?T`, `[]T`
//! - everything else: `name`, then `` `N `` for an unspecialized generic or
//!   `<A,B>` for a specialization, then for functions the receiver `[R]`
//!   and the parameter and return tuple types `(A,B)(C)`
//!
//! The full name prefixes the lookup name with the enclosing symbol's full
//! name. Specializations are named from their concrete's parent.

use std::fmt::Write;

use crate::ids::SymbolId;
use crate::known::friendly_prefix;

use super::symbol::{Symbol, SymbolKind};
use super::SymbolTable;

impl SymbolTable {
    /// Recompute the full and lookup names of `id`.
    ///
    /// Must be called after changing any of `ty`, `type_args`, `tuple_names`,
    /// `generic_param_names` or `receiver_type`. An attached symbol is re-keyed
    /// in its parent, and descendants are renamed when the full name changed.
    /// A new lookup name already taken by a sibling is reported as a duplicate
    /// and the symbol keeps its old key.
    pub fn finalize_full_name(&mut self, id: SymbolId) {
        let (full, lookup) = self.compute_names(&self.symbols[id]);

        let old_lookup = std::mem::replace(&mut self.symbols[id].lookup_name, lookup);
        let old_full = std::mem::replace(&mut self.symbols[id].full_name, full);

        if old_lookup != self.symbols[id].lookup_name {
            let attached = self.symbols[id]
                .parent
                .is_some_and(|p| self.symbols[p].children.get(&old_lookup) == Some(&id));
            if attached {
                tracing::trace!(
                    "re-keying '{}' as '{}'",
                    old_lookup,
                    self.symbols[id].lookup_name
                );
                if let Err(existing) = self.rekey_child(id, &old_lookup) {
                    self.reject_duplicate(id, existing);
                }
            }
        }

        if old_full != self.symbols[id].full_name {
            let children: Vec<_> = self.symbols[id].children().collect();
            for child in children {
                self.finalize_full_name(child);
            }
        }
    }

    /// Render `(full_name, lookup_name)` for a symbol that may not be in the arena yet.
    pub(crate) fn compute_names(&self, sym: &Symbol) -> (String, String) {
        let Some(parent) = sym.parent else {
            return (sym.simple_name.clone(), sym.simple_name.clone());
        };
        if sym.kind.is_scoped() {
            return (sym.simple_name.clone(), sym.simple_name.clone());
        }

        if sym.is_specialized() {
            if parent == self.known.tuple {
                let text = self.tuple_text(&sym.type_args, &sym.tuple_names);
                return (text.clone(), text);
            }
            if sym.type_args.len() == 1 {
                if let Some(prefix) = friendly_prefix(&self.symbols[parent].full_name) {
                    let text = format!("{}{}", prefix, self.symbols[sym.type_args[0]].full_name);
                    return (text.clone(), text);
                }
            }
        }

        let mut lookup = sym.simple_name.clone();
        if sym.is_specialized() {
            lookup.push('<');
            lookup.push_str(&self.join_names(&sym.type_args));
            lookup.push('>');
        } else if sym.is_generic() {
            let _ = write!(lookup, "`{}", sym.generic_param_names.len());
        }

        if sym.kind == SymbolKind::Fun {
            if let Some(receiver) = sym.receiver_type {
                let _ = write!(lookup, "[{}]", self.symbols[receiver].full_name);
            }
            if let Some((params, returns)) = self.fun_tuples(sym.ty) {
                lookup.push_str(&self.tuple_types_text(params));
                lookup.push_str(&self.tuple_types_text(returns));
            }
        }

        let scope = if sym.is_specialized() {
            self.symbols[parent].parent
        } else {
            Some(parent)
        };
        let full = match scope {
            Some(scope) if scope != self.root() => {
                format!("{}.{}", self.symbols[scope].full_name, lookup)
            }
            _ => lookup.clone(),
        };
        (full, lookup)
    }

    /// Split a function type into its parameter and return tuples.
    pub(crate) fn fun_tuples(&self, ty: Option<SymbolId>) -> Option<(SymbolId, SymbolId)> {
        let ty = &self.symbols[ty?];
        match ty.type_args.as_slice() {
            [params, returns] if ty.parent == Some(self.known.tuple) => Some((*params, *returns)),
            _ => None,
        }
    }

    fn join_names(&self, ids: &[SymbolId]) -> String {
        ids.iter()
            .map(|&id| self.symbols[id].full_name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn tuple_text(&self, args: &[SymbolId], names: &[String]) -> String {
        let members: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, &arg)| {
                let ty = &self.symbols[arg].full_name;
                match names.get(i).filter(|n| !n.is_empty()) {
                    Some(name) => format!("{} {}", name, ty),
                    None => ty.clone(),
                }
            })
            .collect();
        format!("({})", members.join(","))
    }

    /// Member types of a tuple without names; `()` for the empty tuple.
    fn tuple_types_text(&self, tuple: SymbolId) -> String {
        format!("({})", self.join_names(&self.symbols[tuple].type_args))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InternalError;
    use crate::source::{SourceId, Span, Token};
    use crate::symbols::{Qualifiers, SymbolKind, SymbolTable};

    fn tok(text: &str, start: usize) -> Token {
        Token::new(text, Span::new(SourceId(0), start, start + text.len()))
    }

    #[test]
    fn test_generic_suffix_and_path() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("Coll"), Qualifiers::NONE)
            .unwrap();
        let list = table
            .new_symbol(SymbolKind::Type, m, None, Some("List"), Qualifiers::NONE)
            .unwrap();
        table.get_mut(list).generic_param_names = vec!["T".into()];
        table.finalize_full_name(list);
        table.add_or_reject(list).unwrap();

        assert_eq!(table.full_name(list), "Coll.List`1");
        assert_eq!(table.get(list).lookup_name(), "List`1");
        assert_eq!(table.child(m, "List`1"), Some(list));
    }

    #[test]
    fn test_rename_rekeys_and_updates_children() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("M"), Qualifiers::NONE)
            .unwrap();
        let (map, _) = table
            .declare(SymbolKind::Type, m, None, Some("Map"), Qualifiers::NONE)
            .unwrap();
        let (count, _) = table
            .declare(SymbolKind::Field, map, None, Some("count"), Qualifiers::NONE)
            .unwrap();
        assert_eq!(table.full_name(count), "M.Map.count");

        table.get_mut(map).generic_param_names = vec!["K".into(), "V".into()];
        table.finalize_full_name(map);

        assert_eq!(table.child(m, "Map"), None);
        assert_eq!(table.child(m, "Map`2"), Some(map));
        assert_eq!(table.get(map).order(), 0);
        assert_eq!(table.full_name(count), "M.Map`2.count");
    }

    #[test]
    fn test_rename_onto_taken_key_keeps_both_children() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("M"), Qualifiers::NONE)
            .unwrap();
        let (plain, _) = table
            .declare(SymbolKind::Type, m, Some(tok("Map", 0)), None, Qualifiers::NONE)
            .unwrap();
        let generic = table
            .new_symbol(SymbolKind::Type, m, Some(tok("Map", 10)), None, Qualifiers::NONE)
            .unwrap();
        table.get_mut(generic).generic_param_names = vec!["K".into()];
        table.finalize_full_name(generic);
        table.add_or_reject(generic).unwrap();
        assert_eq!(table.get(m).children().count(), 2);

        table.get_mut(plain).generic_param_names = vec!["K".into()];
        table.finalize_full_name(plain);

        assert_eq!(table.get(m).children().count(), 2);
        assert_eq!(table.child(m, "Map"), Some(plain));
        assert_eq!(table.child(m, "Map`1"), Some(generic));
        assert_eq!(table.diagnostics().error_count(), 2);
        assert!(table.diagnostics().iter().all(|d| d.message == "duplicate symbol 'M.Map`1'"));

        // Both now render the same full name.
        assert_eq!(
            table.generate_lookup(),
            Err(InternalError::DuplicateFullName("M.Map`1".into()))
        );
    }

    #[test]
    fn test_scoped_symbols_use_simple_name() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("M"), Qualifiers::NONE)
            .unwrap();
        let (f, _) = table
            .declare(SymbolKind::Fun, m, None, Some("f"), Qualifiers::NONE)
            .unwrap();
        let (p, _) = table
            .declare(SymbolKind::FunParam, f, None, Some("count"), Qualifiers::NONE)
            .unwrap();

        assert_eq!(table.full_name(p), "count");
        assert_eq!(table.full_name(f), "M.f");
    }
}
