//! Human readable package disassembly.

use std::fmt::Write;

use crate::assembly::{BranchTarget, FunctionBody, Instruction, Opcode, Operand, Package, ScopeStack};
use crate::ids::SymbolId;
use crate::symbols::SymbolTable;

/// Render every function followed by the call, type and string pools.
///
/// Instruction lines read `{index}: {opcode} {operand}  # {annotation}`.
pub fn render_package(table: &SymbolTable, package: &Package) -> String {
    let mut out = String::new();
    for (fun, body) in package.functions.iter_enumerated() {
        let _ = writeln!(out, "{} {}", fun, table.full_name(body.fun));
        render_function(&mut out, table, package, body);
        out.push('\n');
    }

    let _ = writeln!(out, "calls:");
    for (i, &fun) in package.calls.iter() {
        let _ = writeln!(out, "  {}: {}", i, table.full_name(fun));
    }
    let _ = writeln!(out, "types:");
    for (i, &ty) in package.types.iter() {
        let _ = writeln!(out, "  {}: {}", i, table.full_name(ty));
    }
    let _ = writeln!(out, "strings:");
    for (i, s) in package.strings.iter() {
        let _ = writeln!(out, "  {}: {:?}", i, s);
    }
    out
}

fn render_function(out: &mut String, table: &SymbolTable, package: &Package, body: &FunctionBody) {
    let mut scopes = ScopeStack::new(&body.code);
    let mut locals: Vec<SymbolId> = table.fun_params(body.fun).unwrap_or_default();

    for (index, &inst) in body.code.iter().enumerate() {
        let annotation = annotate(table, package, &mut scopes, &mut locals, index, inst);

        let mut line = format!("  {}: {}", index, inst.op);
        if inst.operand != Operand::None {
            let _ = write!(line, " {}", inst.operand);
        }
        if !annotation.is_empty() {
            let _ = write!(line, "  # {}", annotation);
        }
        out.push_str(&line);
        out.push('\n');
    }
}

fn annotate(
    table: &SymbolTable,
    package: &Package,
    scopes: &mut ScopeStack,
    locals: &mut Vec<SymbolId>,
    index: usize,
    inst: Instruction,
) -> String {
    match (inst.op, inst.operand) {
        (Opcode::Str | Opcode::Comment, Operand::Pool(i)) => match package.strings.get(i) {
            Some(s) => format!("{:?}", s),
            None => String::new(),
        },
        (Opcode::F64, Operand::Float(bits)) => f64::from_bits(bits).to_string(),
        (Opcode::Call, Operand::Pool(i)) => package
            .calls
            .get(i)
            .map(|&fun| table.full_name(fun).to_string())
            .unwrap_or_default(),
        (Opcode::Loc, Operand::Pool(i)) => match package.types.get(i) {
            Some(&ty) => {
                locals.push(ty);
                format!("local {}: {}", locals.len() - 1, table.full_name(ty))
            }
            None => String::new(),
        },
        (Opcode::Ldlr, Operand::Local(n)) => locals
            .get(n as usize)
            .map(|&ty| format!("local {}: {}", n, table.full_name(ty)))
            .unwrap_or_default(),
        (Opcode::Begin, _) => {
            // The listing does not track the operand stack.
            scopes.push(index, 0);
            scopes
                .end_of(index)
                .map(|end| format!("end @{}", end))
                .unwrap_or_default()
        }
        (Opcode::End, _) => {
            scopes.pop();
            String::new()
        }
        (op, Operand::Level(level)) if op.is_branch() => match scopes.resolve(level) {
            Some(BranchTarget::Begin(i)) => format!("begin @{}", i),
            Some(BranchTarget::End(i)) => format!("end @{}", i),
            None => "illegal target".to_string(),
        },
        _ => String::new(),
    }
}
