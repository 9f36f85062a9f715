//! The symbol table: arena, insertion, lookup and diagnostics.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::error::{InternalError, Result};
use crate::ids::SymbolId;
use crate::index_vec::IndexVec;
use crate::known::{Fundamental, KnownSymbols, LAMBDA, TUPLE};
use crate::source::Token;

use super::symbol::{Qualifiers, Symbol, SymbolKind};

/// Table configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Trusted input mode: user errors become warnings (or are dropped when
    /// the token is already flagged) and specialization arity is not checked.
    pub no_compiler_checks: bool,
}

/// Result of inserting a symbol into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Rejected; the symbol already occupying the name.
    Duplicate(SymbolId),
}

impl AddOutcome {
    pub fn is_added(self) -> bool {
        self == AddOutcome::Added
    }
}

enum ChildError {
    Duplicate(SymbolId),
    FunctionOrder,
}

/// Owns every symbol of one compilation.
///
/// Symbols live in an arena addressed by [`SymbolId`]; each one is owned by
/// its parent's children map, except synthesized specializations and generic
/// placeholders which are owned by the table's caches. Nothing is ever removed.
pub struct SymbolTable {
    pub(crate) symbols: IndexVec<SymbolId, Symbol>,
    root: SymbolId,
    pub(crate) known: KnownSymbols,
    /// Full name index, rebuilt by `generate_lookup`.
    lookup: HashMap<String, SymbolId>,
    /// Interned specializations by full name.
    pub(crate) specialized: HashMap<String, SymbolId>,
    /// Canonical placeholders `#0`, `#1`, ...
    pub(crate) generic_params: Vec<SymbolId>,
    pub(crate) generic_param_constructors: HashMap<usize, SymbolId>,
    options: TableOptions,
    diagnostics: Diagnostics,
    /// Memoized qualifier text, keyed by bitset.
    qualifier_text: RefCell<HashMap<Qualifiers, String>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::with_options(TableOptions::default())
    }

    /// Create a table holding the root, the `()` tuple concrete and the
    /// `$lambda`1` concrete.
    pub fn with_options(options: TableOptions) -> Self {
        let mut symbols = IndexVec::new();
        let root = symbols.push(Symbol::new(
            SymbolKind::Module,
            None,
            None,
            String::new(),
            Qualifiers::NONE,
        ));

        let mut table = Self {
            symbols,
            root,
            known: KnownSymbols::new(SymbolId::INVALID, SymbolId::INVALID),
            lookup: HashMap::new(),
            specialized: HashMap::new(),
            generic_params: Vec::new(),
            generic_param_constructors: HashMap::new(),
            options,
            diagnostics: Diagnostics::new(),
            qualifier_text: RefCell::new(HashMap::new()),
        };

        let tuple = table.alloc(SymbolKind::Type, root, None, TUPLE.to_string(), Qualifiers::NONE);
        let lambda = table.alloc(SymbolKind::Type, root, None, LAMBDA.to_string(), Qualifiers::NONE);
        table.symbols[lambda].generic_param_names = vec!["T".to_string()];
        let t0 = table.get_generic_param(0);
        table.symbols[lambda].ty = Some(t0);
        table.finalize_full_name(lambda);

        for id in [tuple, lambda] {
            let inserted = table.set_child(id).is_ok();
            assert!(inserted, "fresh root already has '{}'", table.symbols[id].full_name);
        }
        table.known = KnownSymbols::new(tuple, lambda);
        table
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn known(&self) -> &KnownSymbols {
        &self.known
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn full_name(&self, id: SymbolId) -> &str {
        &self.symbols[id].full_name
    }

    pub fn parent(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbols[id].parent
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    // ========================================================================
    // Construction and insertion
    // ========================================================================

    pub(crate) fn alloc(
        &mut self,
        kind: SymbolKind,
        parent: SymbolId,
        token: Option<Token>,
        name: String,
        qualifiers: Qualifiers,
    ) -> SymbolId {
        let id = self
            .symbols
            .push(Symbol::new(kind, Some(parent), token, name, qualifiers));
        self.finalize_full_name(id);
        id
    }

    /// Allocate a symbol under `parent` without inserting it.
    ///
    /// The simple name is `name`, or the token text when no name is given.
    pub fn new_symbol(
        &mut self,
        kind: SymbolKind,
        parent: SymbolId,
        token: Option<Token>,
        name: Option<&str>,
        qualifiers: Qualifiers,
    ) -> Result<SymbolId> {
        let name = match (name, &token) {
            (Some(name), _) => name.to_string(),
            (None, Some(token)) => token.text.clone(),
            (None, None) => return Err(InternalError::MissingName),
        };
        Ok(self.alloc(kind, parent, token, name, qualifiers))
    }

    /// A declaration request: allocate and [`add_or_reject`](Self::add_or_reject).
    ///
    /// The symbol is returned even when rejected so the caller can keep
    /// binding its members.
    pub fn declare(
        &mut self,
        kind: SymbolKind,
        parent: SymbolId,
        token: Option<Token>,
        name: Option<&str>,
        qualifiers: Qualifiers,
    ) -> Result<(SymbolId, AddOutcome)> {
        let id = self.new_symbol(kind, parent, token, name, qualifiers)?;
        let outcome = self.add_or_reject(id)?;
        Ok((id, outcome))
    }

    /// Insert a symbol into its parent, reporting a duplicate on both tokens.
    pub fn add_or_reject(&mut self, id: SymbolId) -> Result<AddOutcome> {
        match self.set_child(id) {
            Ok(()) => Ok(AddOutcome::Added),
            Err(ChildError::Duplicate(existing)) => {
                self.reject_duplicate(id, existing);
                Ok(AddOutcome::Duplicate(existing))
            }
            Err(ChildError::FunctionOrder) => {
                let parent = self.symbols[id].parent.unwrap_or(self.root);
                Err(InternalError::FunctionOrder {
                    parent: self.symbols[parent].full_name.clone(),
                    member: self.symbols[id].full_name.clone(),
                })
            }
        }
    }

    /// Insert into the parent's children map keyed by lookup name.
    ///
    /// Non-function members must all be inserted before the first function.
    fn set_child(&mut self, id: SymbolId) -> std::result::Result<(), ChildError> {
        let Some(parent) = self.symbols[id].parent else {
            return Err(ChildError::FunctionOrder);
        };
        let key = self.symbols[id].lookup_name.clone();
        let kind = self.symbols[id].kind;

        let siblings = &self.symbols[parent].children;
        if let Some(&existing) = siblings.get(&key) {
            return Err(ChildError::Duplicate(existing));
        }
        let after_fun = siblings
            .last()
            .map(|(_, &last)| self.symbols[last].kind == SymbolKind::Fun)
            .unwrap_or(false);
        if after_fun && kind != SymbolKind::Fun {
            return Err(ChildError::FunctionOrder);
        }

        let order = siblings.len() as u32;
        self.symbols[parent].children.insert(key, id);
        self.symbols[id].order = order;
        Ok(())
    }

    /// Report `id` and `existing` as the same symbol, on both tokens.
    pub(crate) fn reject_duplicate(&mut self, id: SymbolId, existing: SymbolId) {
        let message = format!("duplicate symbol '{}'", self.symbols[id].full_name);
        tracing::debug!("{}", message);
        let new_token = self.symbols[id].token.clone();
        let old_token = self.symbols[existing].token.clone();
        self.reject(new_token.as_ref(), message.clone());
        self.reject(old_token.as_ref(), message);
    }

    /// Re-key an attached symbol after its lookup name changed, keeping its order.
    ///
    /// If a sibling already owns the new key nothing changes and the sibling
    /// is returned; `id` stays under `old_key`.
    pub(crate) fn rekey_child(
        &mut self,
        id: SymbolId,
        old_key: &str,
    ) -> std::result::Result<(), SymbolId> {
        let Some(parent) = self.symbols[id].parent else {
            return Ok(());
        };
        let new_key = self.symbols[id].lookup_name.clone();
        if let Some(&existing) = self.symbols[parent].children.get(&new_key) {
            if existing != id {
                return Err(existing);
            }
        }
        let children = std::mem::take(&mut self.symbols[parent].children);
        self.symbols[parent].children = children
            .into_iter()
            .map(|(k, v)| if v == id && k == old_key { (new_key.clone(), v) } else { (k, v) })
            .collect();
        Ok(())
    }

    // ========================================================================
    // Traversal and lookup
    // ========================================================================

    /// Depth-first preorder traversal of every descendant of `id`.
    pub fn children_recurse(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut stack: Vec<SymbolId> = self.symbols[id].children().collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let before = stack.len();
            stack.extend(self.symbols[next].children());
            stack[before..].reverse();
        }
        out
    }

    /// Rebuild the full name index over the whole tree.
    ///
    /// Type parameters, function parameters and locals are excluded. Must be
    /// called after declarations are bound, and again if the tree changes.
    pub fn generate_lookup(&mut self) -> Result<()> {
        let mut lookup = HashMap::new();
        for id in self.children_recurse(self.root) {
            let sym = &self.symbols[id];
            if sym.kind.is_scoped() {
                continue;
            }
            if lookup.insert(sym.full_name.clone(), id).is_some() {
                return Err(InternalError::DuplicateFullName(sym.full_name.clone()));
            }
        }
        tracing::debug!("generated lookup: {} symbols", lookup.len());
        self.lookup = lookup;
        Ok(())
    }

    /// Find a symbol by full name, then among the specializations.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.lookup
            .get(name)
            .or_else(|| self.specialized.get(name))
            .copied()
    }

    /// Number of interned specializations.
    pub fn specialization_count(&self) -> usize {
        self.specialized.len()
    }

    /// Find a direct child by lookup name.
    pub fn child(&self, parent: SymbolId, lookup_name: &str) -> Option<SymbolId> {
        self.symbols[parent].child(lookup_name)
    }

    /// The generic definition of a specialization, otherwise the symbol itself.
    pub fn concrete(&self, id: SymbolId) -> SymbolId {
        let sym = &self.symbols[id];
        match sym.parent {
            Some(parent) if sym.is_specialized() => parent,
            _ => id,
        }
    }

    /// Generic parameters required to specialize `id`: its own plus those of
    /// every enclosing generic symbol.
    pub fn generic_param_total(&self, id: SymbolId) -> usize {
        let mut total = 0;
        let mut current = Some(id);
        while let Some(c) = current {
            total += self.symbols[c].generic_param_names.len();
            current = self.symbols[c].parent;
        }
        total
    }

    // ========================================================================
    // Fundamental types
    // ========================================================================

    /// Register the symbol standing for a fundamental type.
    pub fn register_fundamental(&mut self, f: Fundamental, id: SymbolId) {
        self.known.set_fundamental(f, id);
    }

    /// The registered symbol for `f`, falling back to its well-known full name.
    pub fn fundamental(&self, f: Fundamental) -> Option<SymbolId> {
        self.known
            .fundamental(f)
            .or_else(|| self.lookup(&f.full_name()))
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Report a user error against a token.
    ///
    /// With `no_compiler_checks` the error becomes a warning, or is dropped
    /// entirely if the token already has something attached.
    pub fn reject(&mut self, token: Option<&Token>, message: impl Into<String>) {
        let message = message.into();
        let span = token.map(|t| t.span);

        let diag = if self.options.no_compiler_checks {
            if span.is_some_and(|s| self.diagnostics.is_flagged(s)) {
                tracing::trace!("suppressed: {}", message);
                return;
            }
            Diagnostic::warning(message)
        } else {
            Diagnostic::error(message)
        };

        self.diagnostics.push(match span {
            Some(span) => diag.with_span(span),
            None => diag,
        });
    }

    /// Report a warning against a token.
    pub fn warn(&mut self, token: Option<&Token>, message: impl Into<String>) {
        let diag = Diagnostic::warning(message);
        self.diagnostics.push(match token {
            Some(t) => diag.with_span(t.span),
            None => diag,
        });
    }

    // ========================================================================
    // Display helpers
    // ========================================================================

    /// Qualifier keywords separated by spaces, memoized per bitset.
    pub fn qualifiers_text(&self, qualifiers: Qualifiers) -> String {
        self.qualifier_text
            .borrow_mut()
            .entry(qualifiers)
            .or_insert_with(|| qualifiers.names().collect::<Vec<_>>().join(" "))
            .clone()
    }

    /// One line summary: `full name [qualifiers] kind`.
    pub fn describe(&self, id: SymbolId) -> String {
        let sym = &self.symbols[id];
        let qualifiers = self.qualifiers_text(sym.qualifiers);
        let mut text = sym.full_name.clone();
        if !qualifiers.is_empty() {
            text.push_str(" [");
            text.push_str(&qualifiers);
            text.push(']');
        }
        text.push(' ');
        text.push_str(sym.kind.as_str());
        if let Some(ty) = sym.ty.filter(|_| sym.kind != SymbolKind::Fun) {
            text.push_str(": ");
            text.push_str(&self.symbols[ty].full_name);
        }
        text
    }
}
