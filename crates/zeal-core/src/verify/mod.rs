//! Bytecode verification.
//!
//! Each function is walked once by a [`Verifier`], an abstract interpreter
//! that tracks operand types instead of values. Problems are recorded per
//! instruction and verification continues with the next one.

mod interp;

pub use interp::Verifier;

use serde::Serialize;
use std::fmt;

use crate::assembly::Package;
use crate::error::Result;
use crate::ids::FunIdx;
use crate::symbols::SymbolTable;

/// A verification failure at one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyDiagnostic {
    pub fun: FunIdx,
    /// Instruction index; the code length for end-of-function checks.
    pub index: usize,
    pub message: String,
}

impl fmt::Display for VerifyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}", self.fun, self.index, self.message)
    }
}

/// Verify every function of `package`.
///
/// Failures whose instruction has a debug token are also reported to the
/// table's diagnostics against that token.
pub fn verify_package(table: &mut SymbolTable, package: &Package) -> Result<Vec<VerifyDiagnostic>> {
    let mut verifier = Verifier::new(table, package);
    for (fun, _) in package.functions.iter_enumerated() {
        verifier.verify_function(fun)?;
    }
    let diagnostics = verifier.into_diagnostics();

    for diag in &diagnostics {
        if let Some(token) = package.functions[diag.fun].token(diag.index) {
            table.reject(Some(token), diag.message.clone());
        }
    }
    tracing::debug!(
        "verified {} function(s), {} problem(s)",
        package.functions.len(),
        diagnostics.len()
    );
    Ok(diagnostics)
}
