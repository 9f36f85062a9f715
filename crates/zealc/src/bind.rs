//! Binding a package description into a symbol table and emitting its code.

use anyhow::{anyhow, bail, Context, Result};
use zeal_core::assembly::OperandClass;
use zeal_core::known::STD_MODULE;
use zeal_core::{
    register_builtins, FunctionBody, Instruction, Opcode, Operand, Package, Qualifiers, SourceId,
    Span, SymbolId, SymbolKind, SymbolTable, TableOptions, Token,
};

use crate::input::{FunDesc, InstDesc, PackageDesc, TypeRef};

/// The result of binding and emitting one package description.
pub struct Bound {
    pub table: SymbolTable,
    pub package: Package,
}

/// Bind every declaration of `desc`, then emit the function bodies.
///
/// Declarations are bound in two passes so that field, parameter and return
/// types may refer to any type of the package.
pub fn bind_package(desc: &PackageDesc, source: SourceId, options: TableOptions) -> Result<Bound> {
    let mut table = SymbolTable::with_options(options);
    register_builtins(&mut table)?;

    let mut binder = Binder {
        table,
        source,
        modules: Vec::new(),
        types: Vec::new(),
        funs: Vec::new(),
    };
    binder.declare_types(desc)?;
    binder.table.generate_lookup()?;
    binder.declare_members(desc)?;
    binder.table.generate_lookup()?;

    let package = binder.emit()?;
    tracing::debug!(
        "bound {} symbols, {} function bodies",
        binder.table.len(),
        package.functions.len()
    );
    Ok(Bound {
        table: binder.table,
        package,
    })
}

struct PendingFun<'d> {
    fun: SymbolId,
    module: SymbolId,
    /// Type parameter names in scope, outermost first.
    generics: Vec<String>,
    desc: &'d FunDesc,
}

struct Binder<'d> {
    table: SymbolTable,
    source: SourceId,
    modules: Vec<SymbolId>,
    types: Vec<Vec<SymbolId>>,
    funs: Vec<PendingFun<'d>>,
}

impl<'d> Binder<'d> {
    fn token(&self, text: &str, span: Option<(usize, usize)>) -> Option<Token> {
        span.map(|(start, end)| Token::new(text, Span::new(self.source, start, end)))
    }

    fn qualifiers(&mut self, names: &[String], token: Option<&Token>) -> Qualifiers {
        let mut qualifiers = Qualifiers::NONE;
        for name in names {
            match Qualifiers::from_name(name) {
                Some(q) => qualifiers |= q,
                None => self.table.reject(token, format!("unknown qualifier '{}'", name)),
            }
        }
        qualifiers
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declare_types(&mut self, desc: &PackageDesc) -> Result<()> {
        let root = self.table.root();
        for m in &desc.modules {
            let token = self.token(&m.name, m.span);
            let (module, _) =
                self.table
                    .declare(SymbolKind::Module, root, token, Some(&m.name), Qualifiers::NONE)?;
            self.modules.push(module);

            let mut types = Vec::new();
            for t in &m.types {
                let token = self.token(&t.name, t.span);
                let qualifiers = self.qualifiers(&t.qualifiers, token.as_ref());
                let id = self
                    .table
                    .new_symbol(SymbolKind::Type, module, token, Some(&t.name), qualifiers)?;
                self.table.get_mut(id).generic_param_names = t.generics.clone();
                self.table.finalize_full_name(id);
                self.table.add_or_reject(id)?;
                for g in &t.generics {
                    self.table
                        .declare(SymbolKind::TypeParam, id, None, Some(g), Qualifiers::NONE)?;
                }
                types.push(id);
            }
            self.types.push(types);
        }
        Ok(())
    }

    fn declare_members(&mut self, desc: &'d PackageDesc) -> Result<()> {
        for (mi, m) in desc.modules.iter().enumerate() {
            let module = self.modules[mi];
            for (ti, t) in m.types.iter().enumerate() {
                let owner = self.types[mi][ti];
                for f in &t.fields {
                    let ty = self.resolve(module, &t.generics, &f.ty)?;
                    let token = self.token(&f.name, f.span);
                    let (field, _) = self.table.declare(
                        SymbolKind::Field,
                        owner,
                        token,
                        Some(&f.name),
                        Qualifiers::NONE,
                    )?;
                    self.table.get_mut(field).ty = Some(ty);
                    self.table.finalize_full_name(field);
                }
                for method in &t.methods {
                    self.declare_fun(module, owner, &t.generics, method, Some(owner))?;
                }
            }
            for fun in &m.functions {
                self.declare_fun(module, module, &[], fun, None)?;
            }
        }
        Ok(())
    }

    fn declare_fun(
        &mut self,
        module: SymbolId,
        parent: SymbolId,
        outer_generics: &[String],
        desc: &'d FunDesc,
        receiver: Option<SymbolId>,
    ) -> Result<()> {
        let token = self.token(&desc.name, desc.span);
        let mut qualifiers = self.qualifiers(&desc.qualifiers, token.as_ref());
        if receiver.is_some() && !qualifiers.contains(Qualifiers::STATIC) {
            qualifiers |= Qualifiers::METHOD;
        }

        let fun = self
            .table
            .new_symbol(SymbolKind::Fun, parent, token, Some(&desc.name), qualifiers)?;
        self.table.get_mut(fun).generic_param_names = desc.generics.clone();
        if qualifiers.contains(Qualifiers::METHOD) {
            self.table.get_mut(fun).receiver_type = receiver;
        }
        for g in &desc.generics {
            self.table
                .declare(SymbolKind::TypeParam, fun, None, Some(g), Qualifiers::NONE)?;
        }

        let generics: Vec<String> = outer_generics
            .iter()
            .chain(&desc.generics)
            .cloned()
            .collect();

        let mut param_types = Vec::new();
        let mut names = Vec::new();
        let mut unique = true;
        for p in &desc.params {
            let ty = self.resolve(module, &generics, &p.ty)?;
            let token = self.token(&p.name, p.span);
            let (param, outcome) = self.table.declare(
                SymbolKind::FunParam,
                fun,
                token.clone(),
                Some(&p.name),
                Qualifiers::NONE,
            )?;
            self.table.get_mut(param).ty = Some(ty);
            self.table.finalize_full_name(param);
            unique &= outcome.is_added();
            param_types.push(ty);
            names.push(token.unwrap_or_else(|| Token::new(&p.name, Span::new(self.source, 0, 0))));
        }
        // Duplicate parameters are already reported by the declarations above.
        let names = unique.then_some(names.as_slice());
        let params = self.table.create_tuple(&param_types, names)?;

        let returns = desc
            .returns
            .iter()
            .map(|r| self.resolve(module, &generics, r))
            .collect::<Result<Vec<_>>>()?;
        let returns = self.table.create_tuple(&returns, None)?;

        self.table.set_fun_type(fun, params, returns)?;
        self.table.add_or_reject(fun)?;
        self.funs.push(PendingFun {
            fun,
            module,
            generics,
            desc,
        });
        Ok(())
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    fn resolve(&mut self, module: SymbolId, generics: &[String], ty: &TypeRef) -> Result<SymbolId> {
        let id = match ty {
            TypeRef::Param { param } => self.table.get_generic_param(*param),
            TypeRef::Ref { target } => {
                let target = self.resolve(module, generics, target)?;
                self.table.create_ref(target, false)?
            }
            TypeRef::Generic { generic, args } => {
                let args = args
                    .iter()
                    .map(|a| self.resolve(module, generics, a))
                    .collect::<Result<Vec<_>>>()?;
                let concrete = self
                    .find_type(module, &format!("{}`{}", generic, args.len()))
                    .or_else(|| self.find_type(module, generic));
                match concrete {
                    Some(concrete) if self.arity_matches(concrete, args.len(), None) => {
                        self.table.create_specialized_type(concrete, &args, None)?
                    }
                    Some(_) => self.table.known().tuple,
                    None => self.unknown_type(generic),
                }
            }
            TypeRef::Tuple { tuple, names } => {
                let types = tuple
                    .iter()
                    .map(|t| self.resolve(module, generics, t))
                    .collect::<Result<Vec<_>>>()?;
                let names: Vec<Token> = names
                    .iter()
                    .map(|n| Token::new(n, Span::new(self.source, 0, 0)))
                    .collect();
                if !names.is_empty() && names.len() != types.len() {
                    self.table.reject(
                        None,
                        format!(
                            "tuple has {} member(s) but {} name(s)",
                            types.len(),
                            names.len()
                        ),
                    );
                    self.table.create_tuple(&types, None)?
                } else {
                    let names = (!names.is_empty()).then_some(names.as_slice());
                    self.table.create_tuple(&types, names)?
                }
            }
            TypeRef::Named { name } => match generics.iter().position(|g| g == name) {
                Some(index) => self.table.get_generic_param(index),
                None => match self.find_type(module, name) {
                    Some(id) => id,
                    None => self.unknown_type(name),
                },
            },
        };
        Ok(id)
    }

    /// Resolve a type name relative to `module`, then the standard module,
    /// then as a full name.
    fn find_type(&self, module: SymbolId, name: &str) -> Option<SymbolId> {
        let local = format!("{}.{}", self.table.full_name(module), name);
        let std = format!("{}.{}", STD_MODULE, name);
        self.table
            .lookup(&local)
            .or_else(|| self.table.lookup(&std))
            .or_else(|| self.table.lookup(name))
    }

    /// Check a type argument count before specializing, reporting a mismatch.
    ///
    /// Trusted input is not checked, matching the table.
    fn arity_matches(&mut self, concrete: SymbolId, actual: usize, token: Option<&Token>) -> bool {
        if self.table.options().no_compiler_checks {
            return true;
        }
        let expected = self.table.generic_param_total(concrete);
        if expected == actual {
            return true;
        }
        let message = format!(
            "wrong number of type arguments for '{}': expected {}, got {}",
            self.table.full_name(concrete),
            expected,
            actual
        );
        self.table.reject(token, message);
        false
    }

    fn unknown_type(&mut self, name: &str) -> SymbolId {
        self.table.reject(None, format!("unknown type '{}'", name));
        self.table.known().tuple
    }

    /// Resolve a called function by full name, or by `Scope.name` when only
    /// one function of that name exists in the scope.
    fn find_fun(&self, name: &str) -> Result<SymbolId> {
        if let Some(fun) = self.table.lookup(name).filter(|&f| self.table.get(f).is_fun()) {
            return Ok(fun);
        }
        let (scope, simple) = name
            .rsplit_once('.')
            .ok_or_else(|| anyhow!("unknown function '{}'", name))?;
        let scope = self
            .table
            .lookup(scope)
            .ok_or_else(|| anyhow!("unknown scope '{}' in call to '{}'", scope, name))?;

        let candidates: Vec<SymbolId> = self
            .table
            .get(scope)
            .children()
            .filter(|&c| {
                let sym = self.table.get(c);
                sym.is_fun() && sym.simple_name() == simple
            })
            .collect();
        match candidates.as_slice() {
            [fun] => Ok(*fun),
            [] => bail!("unknown function '{}'", name),
            _ => bail!("'{}' is overloaded; call it by full name", name),
        }
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit(&mut self) -> Result<Package> {
        let mut package = Package::new();
        let funs = std::mem::take(&mut self.funs);
        for pending in &funs {
            if pending.desc.body.is_empty() {
                continue;
            }
            let mut body = FunctionBody::new(pending.fun);
            for (index, inst) in pending.desc.body.iter().enumerate() {
                let instruction = self
                    .instruction(&mut package, pending, inst)
                    .with_context(|| {
                        format!(
                            "in '{}' at instruction {}",
                            self.table.full_name(pending.fun),
                            index
                        )
                    })?;
                body.emit(instruction, self.token(&inst.op, inst.span));
            }
            package.add_function(body);
        }
        Ok(package)
    }

    fn instruction(
        &mut self,
        package: &mut Package,
        pending: &PendingFun<'_>,
        inst: &InstDesc,
    ) -> Result<Instruction> {
        let op = Opcode::from_name(&inst.op).ok_or_else(|| anyhow!("unknown opcode '{}'", inst.op))?;
        let operand = match op.operand_class() {
            OperandClass::None => Operand::None,
            OperandClass::Int => Operand::Int(required(inst.int, op, "int")?),
            OperandClass::Float => Operand::float(required(inst.float, op, "float")?),
            OperandClass::StringPool => {
                Operand::Pool(package.add_string(required(inst.string.as_deref(), op, "string")?))
            }
            OperandClass::TypePool => {
                let ty = required(inst.ty.as_ref(), op, "type")?;
                let ty = self.resolve(pending.module, &pending.generics, ty)?;
                Operand::Pool(package.add_type(&self.table, ty))
            }
            OperandClass::CallPool => {
                let mut fun = self.find_fun(required(inst.call.as_deref(), op, "call")?)?;
                if !inst.args.is_empty() {
                    let args = inst
                        .args
                        .iter()
                        .map(|a| self.resolve(pending.module, &pending.generics, a))
                        .collect::<Result<Vec<_>>>()?;
                    let token = self.token(&inst.op, inst.span);
                    // On a mismatch the call stays on the generic definition.
                    if self.arity_matches(fun, args.len(), token.as_ref()) {
                        fun = self.table.create_specialized_type(fun, &args, None)?;
                    }
                }
                Operand::Pool(package.add_call(&self.table, fun))
            }
            OperandClass::Level => Operand::Level(required(inst.level, op, "level")?),
            OperandClass::Local => Operand::Local(required(inst.local, op, "local")?),
        };
        Ok(Instruction::new(op, operand))
    }
}

fn required<T>(value: Option<T>, op: Opcode, key: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("'{}' needs a '{}' operand", op, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeal_core::{verify_package, FunIdx, Fundamental, Verifier};

    fn bind(json: &str) -> Result<Bound> {
        let desc: PackageDesc = serde_json::from_str(json).unwrap();
        bind_package(&desc, SourceId(0), TableOptions::default())
    }

    #[test]
    fn test_bind_and_verify_simple_package() {
        let bound = bind(
            r#"{
                "modules": [{
                    "name": "App",
                    "functions": [
                        { "name": "double", "params": [{ "name": "x", "type": { "name": "Int" } }],
                          "returns": [{ "name": "Int" }] },
                        { "name": "main", "body": [
                            { "op": "i64", "int": 2 },
                            { "op": "call", "call": "App.double" },
                            { "op": "comment", "string": "done" }
                        ] }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let Bound { mut table, package } = bound;

        let double = table.lookup("App.double(Zeal.Int)(Zeal.Int)").unwrap();
        assert_eq!(package.calls.get(0), Some(&double));
        assert_eq!(package.functions.len(), 1);
        assert_eq!(table.fun_params(double).unwrap(), vec![table.fundamental(Fundamental::Int).unwrap()]);

        let problems = verify_package(&mut table, &package).unwrap();
        assert!(problems.is_empty(), "{:?}", problems);
        assert!(!table.has_errors());
    }

    #[test]
    fn test_generic_call_is_specialized() {
        let bound = bind(
            r#"{
                "modules": [{
                    "name": "App",
                    "types": [{ "name": "Box", "generics": ["T"],
                                "fields": [{ "name": "item", "type": { "name": "T" } }] }],
                    "functions": [
                        { "name": "wrap", "generics": ["T"],
                          "params": [{ "name": "item", "type": { "name": "T" } }],
                          "returns": [{ "generic": "Box", "args": [{ "name": "T" }] }] },
                        { "name": "main", "body": [
                            { "op": "i64", "int": 7 },
                            { "op": "call", "call": "App.wrap", "args": [{ "name": "Int" }] },
                            { "op": "loc", "type": { "generic": "Box", "args": [{ "name": "Int" }] } },
                            { "op": "ldlr", "local": 0 }
                        ] }
                    ]
                }]
            }"#,
        )
        .unwrap();
        let Bound { mut table, package } = bound;

        let wrap = table.lookup("App.wrap`1(#0)(App.Box<#0>)").unwrap();
        let call = *package.calls.get(0).unwrap();
        assert_eq!(table.concrete(call), wrap);
        assert_eq!(table.full_name(call), "App.wrap<Zeal.Int>(Zeal.Int)(App.Box<Zeal.Int>)");
        assert!(table.lookup("App.Box`1.item").is_some());

        let stack = {
            let mut verifier = Verifier::new(&mut table, &package);
            verifier.verify_function(FunIdx(0)).unwrap();
            assert!(verifier.diagnostics().is_empty(), "{:?}", verifier.diagnostics());
            verifier.stack().to_vec()
        };
        let names: Vec<_> = stack.iter().map(|&t| table.full_name(t)).collect();
        assert_eq!(names, vec!["App.Box<Zeal.Int>", "^App.Box<Zeal.Int>"]);
    }

    #[test]
    fn test_duplicate_types_flag_both_spans() {
        let bound = bind(
            r#"{
                "modules": [{
                    "name": "App",
                    "types": [
                        { "name": "Point", "span": [10, 15] },
                        { "name": "Point", "span": [40, 45] }
                    ]
                }]
            }"#,
        )
        .unwrap();

        let table = &bound.table;
        assert_eq!(table.diagnostics().error_count(), 2);
        assert!(table.diagnostics().is_flagged(Span::new(SourceId(0), 10, 15)));
        assert!(table.diagnostics().is_flagged(Span::new(SourceId(0), 40, 45)));
    }

    #[test]
    fn test_verify_errors_attach_to_instruction_spans() {
        let Bound { mut table, package } = bind(
            r#"{
                "modules": [{
                    "name": "App",
                    "functions": [{ "name": "main", "body": [
                        { "op": "end", "span": [3, 6] }
                    ] }]
                }]
            }"#,
        )
        .unwrap();

        let problems = verify_package(&mut table, &package).unwrap();
        assert_eq!(problems.len(), 1);
        let attached: Vec<_> = table
            .diagnostics()
            .at(Span::new(SourceId(0), 3, 6))
            .map(|d| d.message.clone())
            .collect();
        assert_eq!(attached, vec!["no matching begin scope"]);
    }

    #[test]
    fn test_bad_instructions_are_rejected() {
        let unknown = bind(
            r#"{ "modules": [{ "name": "App", "functions": [
                { "name": "main", "body": [{ "op": "jmp" }] }
            ] }] }"#,
        );
        assert!(unknown.is_err());

        let missing = bind(
            r#"{ "modules": [{ "name": "App", "functions": [
                { "name": "main", "body": [{ "op": "i64" }] }
            ] }] }"#,
        );
        let message = format!("{:#}", missing.err().unwrap());
        assert!(message.contains("'i64' needs a 'int' operand"), "{}", message);
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let bound = bind(
            r#"{ "modules": [{ "name": "App", "types": [
                { "name": "Line", "fields": [{ "name": "from", "type": { "name": "Pointt" } }] }
            ] }] }"#,
        )
        .unwrap();
        let messages: Vec<_> = bound.table.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages, vec!["unknown type 'Pointt'"]);
    }

    #[test]
    fn test_type_args_on_plain_type_are_reported() {
        let bound = bind(
            r#"{ "modules": [{ "name": "App", "types": [
                { "name": "Point" },
                { "name": "Line", "fields": [
                    { "name": "from", "type": { "generic": "Point", "args": [{ "name": "Int" }] } }
                ] }
            ] }] }"#,
        )
        .unwrap();

        let table = &bound.table;
        let messages: Vec<_> = table.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(
            messages,
            vec!["wrong number of type arguments for 'App.Point': expected 0, got 1"]
        );
        let from = table.lookup("App.Line.from").unwrap();
        assert_eq!(table.get(from).ty, Some(table.known().tuple));
        assert_eq!(table.specialization_count(), 0);
    }

    #[test]
    fn test_type_args_on_plain_call_are_reported() {
        let Bound { mut table, package } = bind(
            r#"{ "modules": [{ "name": "App", "functions": [
                { "name": "f" },
                { "name": "main", "body": [
                    { "op": "call", "call": "App.f", "args": [{ "name": "Int" }], "span": [5, 9] }
                ] }
            ] }] }"#,
        )
        .unwrap();

        let f = table.lookup("App.f()()").unwrap();
        assert_eq!(package.calls.get(0), Some(&f));
        let attached: Vec<_> = table
            .diagnostics()
            .at(Span::new(SourceId(0), 5, 9))
            .map(|d| d.message.clone())
            .collect();
        assert_eq!(
            attached,
            vec!["wrong number of type arguments for 'App.f()()': expected 0, got 1"]
        );

        let problems = verify_package(&mut table, &package).unwrap();
        assert!(problems.is_empty(), "{:?}", problems);
    }

    #[test]
    fn test_tuple_name_count_mismatch_is_reported() {
        let bound = bind(
            r#"{ "modules": [{ "name": "App", "types": [
                { "name": "Pair", "fields": [
                    { "name": "both", "type": {
                        "tuple": [{ "name": "Int" }, { "name": "Str" }],
                        "names": ["a"]
                    } }
                ] }
            ] }] }"#,
        )
        .unwrap();

        let table = &bound.table;
        let messages: Vec<_> = table.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(messages, vec!["tuple has 2 member(s) but 1 name(s)"]);
        let both = table.lookup("App.Pair.both").unwrap();
        let ty = table.get(both).ty.unwrap();
        assert_eq!(table.full_name(ty), "(Zeal.Int,Zeal.Str)");
    }
}
