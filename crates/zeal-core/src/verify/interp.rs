//! Abstract interpretation of one function body.

use crate::assembly::{Instruction, Opcode, Operand, Package, ScopeStack};
use crate::error::Result;
use crate::ids::{FunIdx, LocalIdx, SymbolId};
use crate::index_vec::IndexVec;
use crate::known::Fundamental;
use crate::symbols::SymbolTable;

use super::VerifyDiagnostic;

/// Walks a function's instructions tracking operand types, locals and
/// open scopes.
///
/// Errors in the verified code are collected as [`VerifyDiagnostic`]s and
/// only abort the instruction that raised them. Internal errors from the
/// symbol table are returned.
pub struct Verifier<'a> {
    table: &'a mut SymbolTable,
    package: &'a Package,
    fun: FunIdx,
    ip: usize,
    stack: Vec<SymbolId>,
    locals: IndexVec<LocalIdx, SymbolId>,
    scopes: ScopeStack,
    diagnostics: Vec<VerifyDiagnostic>,
}

impl<'a> Verifier<'a> {
    pub fn new(table: &'a mut SymbolTable, package: &'a Package) -> Self {
        Self {
            table,
            package,
            fun: FunIdx::default(),
            ip: 0,
            stack: Vec::new(),
            locals: IndexVec::new(),
            scopes: ScopeStack::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Operand types, bottom first.
    pub fn stack(&self) -> &[SymbolId] {
        &self.stack
    }

    pub fn locals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.locals.iter().copied()
    }

    /// Index of the next instruction to run.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn diagnostics(&self) -> &[VerifyDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<VerifyDiagnostic> {
        self.diagnostics
    }

    /// Reset all state for `fun` and seed the locals with its parameters.
    pub fn begin_fun(&mut self, fun: FunIdx) -> Result<()> {
        let package = self.package;
        let body = &package.functions[fun];
        self.fun = fun;
        self.ip = 0;
        self.stack.clear();
        self.locals = IndexVec::new();
        for param in self.table.fun_params(body.fun)? {
            self.locals.push(param);
        }
        self.scopes = ScopeStack::new(&body.code);
        tracing::trace!("verifying {}", self.table.full_name(body.fun));
        Ok(())
    }

    /// Run the next instruction. Returns `false` once past the end.
    pub fn step(&mut self) -> Result<bool> {
        let package = self.package;
        let Some(&inst) = package.functions[self.fun].code.get(self.ip) else {
            return Ok(false);
        };
        self.execute(inst)?;
        self.ip += 1;
        Ok(true)
    }

    /// Check that the walk ended cleanly.
    pub fn end_fun(&mut self) {
        if !self.scopes.is_empty() {
            self.error("missing scope end");
        }
        if self.ip != self.package.functions[self.fun].code.len() {
            self.error("not at end of function");
        }
    }

    /// Verify a whole function, continuing past instruction errors.
    pub fn verify_function(&mut self, fun: FunIdx) -> Result<()> {
        self.begin_fun(fun)?;
        while self.step()? {}
        self.end_fun();
        Ok(())
    }

    fn execute(&mut self, inst: Instruction) -> Result<()> {
        if !inst.operand.fits(inst.op.operand_class()) {
            self.error("invalid opcode");
            return Ok(());
        }

        match (inst.op, inst.operand) {
            (Opcode::Nop, _) => {}
            (Opcode::Comment, Operand::Pool(i)) => {
                self.string(i);
            }
            (Opcode::I64, _) => self.push_fundamental(Fundamental::Int),
            (Opcode::F64, _) => self.push_fundamental(Fundamental::F64),
            (Opcode::Str, Operand::Pool(i)) => {
                if self.string(i).is_some() {
                    self.push_fundamental(Fundamental::Str);
                }
            }
            (Opcode::Loc, Operand::Pool(i)) => match self.package.types.get(i) {
                Some(&ty) => {
                    self.locals.push(ty);
                }
                None => self.error(format!("type pool index {} out of range", i)),
            },
            (Opcode::Ldlr, Operand::Local(n)) => {
                match self.locals.get(LocalIdx::new(n)).copied() {
                    Some(ty) => {
                        let reference = self.table.create_ref(ty, false)?;
                        self.stack.push(reference);
                    }
                    None => self.error(format!("local {} out of range", n)),
                }
            }
            (Opcode::Begin, _) => self.scopes.push(self.ip, self.stack.len()),
            (Opcode::End, _) => match self.scopes.pop() {
                None => self.error("no matching begin scope"),
                Some(scope) if scope.depth != self.stack.len() => {
                    let message = format!(
                        "stack depth {} at scope end, {} at begin",
                        self.stack.len(),
                        scope.depth
                    );
                    self.error(message);
                    self.stack.truncate(scope.depth);
                }
                Some(_) => {}
            },
            (op, Operand::Level(level)) if op.is_branch() => {
                if self.scopes.resolve(level).is_none() {
                    self.error("illegal branch target");
                }
            }
            (Opcode::Call, Operand::Pool(i)) => self.call(i)?,
            (op, _) if op.is_compare() => self.compare(),
            _ => self.error("invalid opcode"),
        }
        Ok(())
    }

    fn call(&mut self, index: u32) -> Result<()> {
        let Some(&fun) = self.package.calls.get(index) else {
            self.error(format!("call pool index {} out of range", index));
            return Ok(());
        };
        let params = self.table.fun_params(fun)?;
        let returns = self.table.fun_returns(fun)?;

        for &expected in params.iter().rev() {
            let actual = self.stack.pop();
            if actual == Some(expected) {
                continue;
            }
            let found = match actual {
                Some(ty) => format!("'{}'", self.table.full_name(ty)),
                None => "no parameters".to_string(),
            };
            let message = format!(
                "call to '{}': expected '{}', found {}",
                self.table.full_name(fun),
                self.table.full_name(expected),
                found
            );
            self.error(message);
            return Ok(());
        }
        self.stack.extend(returns);
        Ok(())
    }

    /// Comparisons test a three-way compare result against zero.
    fn compare(&mut self) {
        let Some(int) = self.fundamental(Fundamental::Int) else {
            return;
        };
        match self.stack.pop() {
            Some(ty) if ty == int => self.stack.push(int),
            Some(ty) => {
                let message = format!(
                    "comparison expects '{}', found '{}'",
                    self.table.full_name(int),
                    self.table.full_name(ty)
                );
                self.error(message);
            }
            None => {
                let message = format!(
                    "comparison expects '{}', found no parameters",
                    self.table.full_name(int)
                );
                self.error(message);
            }
        }
    }

    fn push_fundamental(&mut self, f: Fundamental) {
        if let Some(ty) = self.fundamental(f) {
            self.stack.push(ty);
        }
    }

    fn fundamental(&mut self, f: Fundamental) -> Option<SymbolId> {
        let ty = self.table.fundamental(f);
        if ty.is_none() {
            self.error(format!("fundamental type '{}' is not registered", f));
        }
        ty
    }

    fn string(&mut self, index: u32) -> Option<&'a str> {
        let package = self.package;
        let s = package.strings.get(index).map(String::as_str);
        if s.is_none() {
            self.error(format!("string pool index {} out of range", index));
        }
        s
    }

    fn error(&mut self, message: impl Into<String>) {
        let diag = VerifyDiagnostic {
            fun: self.fun,
            index: self.ip,
            message: message.into(),
        };
        tracing::debug!("{}", diag);
        self.diagnostics.push(diag);
    }
}
