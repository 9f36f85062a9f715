//! Generic specialization: tuples, lambdas, references and placeholders.

use crate::error::{InternalError, Result};
use crate::ids::SymbolId;
use crate::known::{RAW_POINTER, REF};
use crate::source::Token;

use super::symbol::{Qualifiers, Symbol, SymbolKind};
use super::SymbolTable;

impl SymbolTable {
    /// Specialize `concrete` on `type_args`, returning the canonical instance.
    ///
    /// The specialization's type is the concrete's type with every placeholder
    /// `#i` replaced by `type_args[i]`. Equal full names yield the same symbol.
    pub fn create_specialized_type(
        &mut self,
        concrete: SymbolId,
        type_args: &[SymbolId],
        tuple_names: Option<&[String]>,
    ) -> Result<SymbolId> {
        let sym = &self.symbols[concrete];
        if !matches!(
            sym.kind,
            SymbolKind::Type | SymbolKind::Fun | SymbolKind::Field
        ) {
            return Err(InternalError::NotSpecializable(sym.full_name.clone()));
        }
        if sym.is_specialized() {
            return Err(InternalError::AlreadySpecialized(sym.full_name.clone()));
        }
        if let Some(names) = tuple_names {
            if names.len() != type_args.len() {
                return Err(InternalError::TupleNamesMismatch {
                    symbol: sym.full_name.clone(),
                    names: names.len(),
                    args: type_args.len(),
                });
            }
        }
        if type_args.is_empty() {
            return Ok(concrete);
        }
        if !self.options().no_compiler_checks && concrete != self.known.tuple {
            let expected = self.generic_param_total(concrete);
            if expected != type_args.len() {
                return Err(InternalError::ArityMismatch {
                    symbol: self.symbols[concrete].full_name.clone(),
                    expected,
                    actual: type_args.len(),
                });
            }
        }

        let (ty, receiver) = (sym.ty, sym.receiver_type);
        let ty = ty.map(|t| self.replace_generic_types(t, type_args)).transpose()?;
        let receiver = receiver
            .map(|t| self.replace_generic_types(t, type_args))
            .transpose()?;

        let sym = &self.symbols[concrete];
        let mut candidate = Symbol::new(
            sym.kind,
            Some(concrete),
            sym.token.clone(),
            sym.simple_name.clone(),
            sym.qualifiers,
        );
        candidate.type_args = type_args.to_vec();
        candidate.tuple_names = tuple_names.map(|n| n.to_vec()).unwrap_or_default();
        candidate.ty = ty;
        candidate.receiver_type = receiver;
        let (full, lookup) = self.compute_names(&candidate);

        if let Some(&existing) = self.specialized.get(&full) {
            let found = &self.symbols[existing];
            if found.parent != candidate.parent
                || found.type_args != candidate.type_args
                || found.tuple_names != candidate.tuple_names
            {
                return Err(InternalError::InternCollision(full));
            }
            return Ok(existing);
        }

        candidate.full_name = full.clone();
        candidate.lookup_name = lookup;
        let id = self.symbols.push(candidate);
        tracing::trace!("specialized {}", full);
        self.specialized.insert(full, id);
        Ok(id)
    }

    /// Substitute placeholders inside `ty`, rebuilding nested specializations.
    ///
    /// Placeholders beyond `args` are left in place.
    fn replace_generic_types(&mut self, ty: SymbolId, args: &[SymbolId]) -> Result<SymbolId> {
        let sym = &self.symbols[ty];
        if let Some(n) = sym.generic_param_index {
            return Ok(args.get(n).copied().unwrap_or(ty));
        }
        if !sym.is_specialized() {
            return Ok(ty);
        }

        let Some(concrete) = sym.parent else {
            return Ok(ty);
        };
        let old_args = sym.type_args.clone();
        let names = sym.tuple_names.clone();

        let new_args = old_args
            .iter()
            .map(|&a| self.replace_generic_types(a, args))
            .collect::<Result<Vec<_>>>()?;
        if new_args == old_args {
            return Ok(ty);
        }
        let names = (!names.is_empty()).then_some(names);
        self.create_specialized_type(concrete, &new_args, names.as_deref())
    }

    /// A tuple of `types`, optionally with member names.
    ///
    /// The empty tuple is the `()` concrete itself. Duplicate non-empty names
    /// are reported on both tokens; the tuple is still created.
    pub fn create_tuple(&mut self, types: &[SymbolId], names: Option<&[Token]>) -> Result<SymbolId> {
        let tuple = self.known.tuple;
        if let Some(names) = names {
            for (i, a) in names.iter().enumerate() {
                for b in &names[i + 1..] {
                    if !a.text.is_empty() && a.text == b.text {
                        let message = format!("duplicate tuple name '{}'", a.text);
                        self.reject(Some(a), message.clone());
                        self.reject(Some(b), message);
                    }
                }
            }
        }

        let names: Option<Vec<String>> = names
            .filter(|n| n.iter().any(|t| !t.text.is_empty()))
            .map(|n| n.iter().map(|t| t.text.clone()).collect());
        self.create_specialized_type(tuple, types, names.as_deref())
    }

    /// The closure type `$lambda<(params,returns)>`.
    pub fn create_lambda(&mut self, params: SymbolId, returns: SymbolId) -> Result<SymbolId> {
        let fun_type = self.create_tuple(&[params, returns], None)?;
        self.create_specialized_type(self.known.lambda, &[fun_type], None)
    }

    /// `^T`, or `*T` for a raw pointer. The standard module must be bound.
    pub fn create_ref(&mut self, ty: SymbolId, raw_pointer: bool) -> Result<SymbolId> {
        let base_name = if raw_pointer { RAW_POINTER } else { REF };
        let base = self
            .lookup(base_name)
            .ok_or_else(|| InternalError::MissingBaseType(base_name.to_string()))?;
        self.create_specialized_type(base, &[ty], None)
    }

    /// The canonical placeholder `#n` used in generic definitions.
    pub fn get_generic_param(&mut self, n: usize) -> SymbolId {
        while self.generic_params.len() <= n {
            let index = self.generic_params.len();
            let root = self.root();
            let id = self.alloc(
                SymbolKind::TypeParam,
                root,
                None,
                format!("#{}", index),
                Qualifiers::NONE,
            );
            self.symbols[id].generic_param_index = Some(index);
            self.generic_params.push(id);
        }
        self.generic_params[n]
    }

    /// The synthetic `static new() -> #n` constructor of placeholder `#n`.
    pub fn get_generic_param_constructor(&mut self, n: usize) -> Result<SymbolId> {
        if let Some(&ctor) = self.generic_param_constructors.get(&n) {
            return Ok(ctor);
        }
        let param = self.get_generic_param(n);
        let ctor = self.alloc(
            SymbolKind::Fun,
            param,
            None,
            "new".to_string(),
            Qualifiers::STATIC,
        );
        let no_params = self.known.tuple;
        let returns = self.create_tuple(&[param], None)?;
        self.set_fun_type(ctor, no_params, returns)?;
        self.add_or_reject(ctor)?;
        self.generic_param_constructors.insert(n, ctor);
        Ok(ctor)
    }

    // ========================================================================
    // Function types
    // ========================================================================

    /// Install the `(params, returns)` type of a function and rename it.
    pub fn set_fun_type(&mut self, fun: SymbolId, params: SymbolId, returns: SymbolId) -> Result<()> {
        if self.symbols[fun].kind != SymbolKind::Fun {
            return Err(InternalError::NotAFunction(self.symbols[fun].full_name.clone()));
        }
        let fun_type = self.create_tuple(&[params, returns], None)?;
        self.symbols[fun].ty = Some(fun_type);
        self.finalize_full_name(fun);
        Ok(())
    }

    /// Declared parameter types, in order.
    pub fn fun_params(&self, fun: SymbolId) -> Result<Vec<SymbolId>> {
        let (params, _) = self.fun_signature(fun)?;
        Ok(self.symbols[params].type_args.clone())
    }

    /// Declared return types, in order.
    pub fn fun_returns(&self, fun: SymbolId) -> Result<Vec<SymbolId>> {
        let (_, returns) = self.fun_signature(fun)?;
        Ok(self.symbols[returns].type_args.clone())
    }

    fn fun_signature(&self, fun: SymbolId) -> Result<(SymbolId, SymbolId)> {
        let sym = &self.symbols[fun];
        if sym.kind != SymbolKind::Fun {
            return Err(InternalError::NotAFunction(sym.full_name.clone()));
        }
        self.fun_tuples(sym.ty)
            .ok_or_else(|| InternalError::NotAFunction(sym.full_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InternalError;
    use crate::ids::SymbolId;
    use crate::source::{SourceId, Span, Token};
    use crate::symbols::{Qualifiers, SymbolKind, SymbolTable, TableOptions};

    fn tok(text: &str, start: usize) -> Token {
        Token::new(text, Span::new(SourceId(0), start, start + text.len()))
    }

    /// A table with module `M` holding `Int`, `Str` and a generic `Box`1`.
    fn setup() -> (SymbolTable, SymbolId, SymbolId, SymbolId, SymbolId) {
        let mut table = SymbolTable::new();
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("M"), Qualifiers::NONE)
            .unwrap();
        let (int, _) = table
            .declare(SymbolKind::Type, m, None, Some("Int"), Qualifiers::NONE)
            .unwrap();
        let (str_, _) = table
            .declare(SymbolKind::Type, m, None, Some("Str"), Qualifiers::NONE)
            .unwrap();
        let boxed = table
            .new_symbol(SymbolKind::Type, m, None, Some("Box"), Qualifiers::NONE)
            .unwrap();
        table.get_mut(boxed).generic_param_names = vec!["T".into()];
        table.finalize_full_name(boxed);
        table.add_or_reject(boxed).unwrap();
        (table, m, int, str_, boxed)
    }

    #[test]
    fn test_specialization_is_interned() {
        let (mut table, _, int, _, boxed) = setup();

        let a = table.create_specialized_type(boxed, &[int], None).unwrap();
        let b = table.create_specialized_type(boxed, &[int], None).unwrap();

        assert_eq!(a, b);
        assert_eq!(table.full_name(a), "M.Box<M.Int>");
        assert_eq!(table.concrete(a), boxed);
        assert_eq!(table.concrete(boxed), boxed);
        assert!(table.get(a).generic_param_names.is_empty());
        assert_eq!(table.lookup("M.Box<M.Int>"), Some(a));
    }

    #[test]
    fn test_zero_args_returns_concrete() {
        let (mut table, _, _, _, boxed) = setup();
        assert_eq!(table.create_specialized_type(boxed, &[], None), Ok(boxed));
    }

    #[test]
    fn test_arity_mismatch_is_internal_error() {
        let (mut table, _, int, str_, boxed) = setup();

        let err = table.create_specialized_type(boxed, &[int, str_], None);
        assert!(matches!(
            err,
            Err(InternalError::ArityMismatch { expected: 1, actual: 2, .. })
        ));

        let spec = table.create_specialized_type(boxed, &[int], None).unwrap();
        let again = table.create_specialized_type(spec, &[int], None);
        assert!(matches!(again, Err(InternalError::AlreadySpecialized(_))));
    }

    #[test]
    fn test_arity_unchecked_in_trusted_mode() {
        let mut table = SymbolTable::with_options(TableOptions {
            no_compiler_checks: true,
        });
        let root = table.root();
        let (m, _) = table
            .declare(SymbolKind::Module, root, None, Some("M"), Qualifiers::NONE)
            .unwrap();
        let (int, _) = table
            .declare(SymbolKind::Type, m, None, Some("Int"), Qualifiers::NONE)
            .unwrap();

        let spec = table.create_specialized_type(int, &[int], None).unwrap();
        assert_eq!(table.full_name(spec), "M.Int<M.Int>");
    }

    #[test]
    fn test_same_named_args_from_different_scopes_collide() {
        let (mut table, _, int, str_, boxed) = setup();
        let (t_int, _) = table
            .declare(SymbolKind::TypeParam, int, None, Some("T"), Qualifiers::NONE)
            .unwrap();
        let (t_str, _) = table
            .declare(SymbolKind::TypeParam, str_, None, Some("T"), Qualifiers::NONE)
            .unwrap();

        let first = table.create_specialized_type(boxed, &[t_int], None).unwrap();
        assert_eq!(table.full_name(first), "M.Box<T>");
        assert_eq!(
            table.create_specialized_type(boxed, &[t_str], None),
            Err(InternalError::InternCollision("M.Box<T>".into()))
        );
        assert_eq!(table.create_specialized_type(boxed, &[t_int], None), Ok(first));
        assert_eq!(table.specialization_count(), 1);
    }

    #[test]
    fn test_tuple_names_must_match_args() {
        let (mut table, _, int, str_, _) = setup();
        let tuple = table.known().tuple;

        let err = table.create_specialized_type(tuple, &[int, str_], Some(&["a".to_string()]));
        assert!(matches!(
            err,
            Err(InternalError::TupleNamesMismatch { names: 1, args: 2, .. })
        ));
        assert_eq!(table.specialization_count(), 0);
    }

    #[test]
    fn test_generic_param_is_idempotent() {
        let mut table = SymbolTable::new();
        let p2 = table.get_generic_param(2);
        let p0 = table.get_generic_param(0);

        assert_eq!(table.get_generic_param(2), p2);
        assert_eq!(table.full_name(p0), "#0");
        assert_eq!(table.full_name(p2), "#2");
        assert_eq!(table.get(p2).generic_param_index(), Some(2));

        let ctor = table.get_generic_param_constructor(1).unwrap();
        assert_eq!(table.get_generic_param_constructor(1), Ok(ctor));
        assert!(table.get(ctor).qualifiers.contains(Qualifiers::STATIC));
        assert_eq!(table.full_name(ctor), "#1.new()(#1)");
        let p1 = table.get_generic_param(1);
        assert!(table.fun_params(ctor).unwrap().is_empty());
        assert_eq!(table.fun_returns(ctor).unwrap(), vec![p1]);
    }

    #[test]
    fn test_empty_tuple_is_canonical() {
        let mut table = SymbolTable::new();
        let tuple = table.known().tuple;
        assert_eq!(table.create_tuple(&[], None), Ok(tuple));
        assert_eq!(table.full_name(tuple), "()");
    }

    #[test]
    fn test_named_tuple_is_interned() {
        let (mut table, _, int, str_, _) = setup();
        let names = [tok("a", 0), tok("b", 2)];

        let first = table.create_tuple(&[int, str_], Some(&names)).unwrap();
        let second = table.create_tuple(&[int, str_], Some(&names)).unwrap();
        let unnamed = table.create_tuple(&[int, str_], None).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, unnamed);
        assert_eq!(table.full_name(first), "(a M.Int,b M.Str)");
        assert_eq!(table.full_name(unnamed), "(M.Int,M.Str)");
        assert_eq!(table.concrete(first), table.known().tuple);
    }

    #[test]
    fn test_duplicate_tuple_names_are_reported() {
        let (mut table, _, int, str_, _) = setup();
        let names = [tok("x", 0), tok("x", 4)];

        let tuple = table.create_tuple(&[int, str_], Some(&names)).unwrap();

        assert_eq!(table.full_name(tuple), "(x M.Int,x M.Str)");
        assert_eq!(table.diagnostics().error_count(), 2);
        assert!(table.diagnostics().is_flagged(names[1].span));
    }

    #[test]
    fn test_lambda_type_is_fun_tuple() {
        let (mut table, _, int, str_, _) = setup();
        let params = table.create_tuple(&[int], None).unwrap();
        let returns = table.create_tuple(&[str_], None).unwrap();

        let lambda = table.create_lambda(params, returns).unwrap();
        let fun_type = table.create_tuple(&[params, returns], None).unwrap();

        assert_eq!(table.get(lambda).ty, Some(fun_type));
        assert_eq!(table.get(lambda).type_args, vec![fun_type]);
        assert_eq!(table.full_name(lambda), "$lambda<((M.Int),(M.Str))>");
        assert_eq!(table.create_lambda(params, returns), Ok(lambda));
    }

    #[test]
    fn test_ref_requires_base_library() {
        let (mut table, _, int, _, _) = setup();
        table.generate_lookup().unwrap();
        assert_eq!(
            table.create_ref(int, false),
            Err(InternalError::MissingBaseType("Zeal.Ref`1".into()))
        );
    }

    #[test]
    fn test_generic_fun_type_is_substituted() {
        let (mut table, m, int, _, boxed) = setup();
        let t0 = table.get_generic_param(0);

        // fun wrap<T>(item T) Box<T>
        let wrap = table
            .new_symbol(SymbolKind::Fun, m, None, Some("wrap"), Qualifiers::NONE)
            .unwrap();
        table.get_mut(wrap).generic_param_names = vec!["T".into()];
        let box_t0 = table.create_specialized_type(boxed, &[t0], None).unwrap();
        let params = table.create_tuple(&[t0], Some(&[tok("item", 0)])).unwrap();
        let returns = table.create_tuple(&[box_t0], None).unwrap();
        table.set_fun_type(wrap, params, returns).unwrap();
        table.add_or_reject(wrap).unwrap();
        assert_eq!(table.full_name(wrap), "M.wrap`1(#0)(M.Box<#0>)");

        let wrap_int = table.create_specialized_type(wrap, &[int], None).unwrap();

        assert_eq!(table.full_name(wrap_int), "M.wrap<M.Int>(M.Int)(M.Box<M.Int>)");
        let box_int = table.create_specialized_type(boxed, &[int], None).unwrap();
        assert_eq!(table.fun_params(wrap_int).unwrap(), vec![int]);
        assert_eq!(table.fun_returns(wrap_int).unwrap(), vec![box_int]);

        // The named parameter tuple keeps its names through substitution.
        let (spec_params, _) = table.fun_tuples(table.get(wrap_int).ty).unwrap();
        assert_eq!(table.full_name(spec_params), "(item M.Int)");
    }

    #[test]
    fn test_field_of_generic_type_is_specialized() {
        let (mut table, _, int, _, boxed) = setup();
        let t0 = table.get_generic_param(0);
        let (item, _) = table
            .declare(SymbolKind::Field, boxed, None, Some("item"), Qualifiers::NONE)
            .unwrap();
        table.get_mut(item).ty = Some(t0);
        table.finalize_full_name(item);

        assert_eq!(table.generic_param_total(item), 1);
        let item_int = table.create_specialized_type(item, &[int], None).unwrap();
        assert_eq!(table.get(item_int).ty, Some(int));
        assert_eq!(table.full_name(item_int), "M.Box`1.item<M.Int>");
    }
}
