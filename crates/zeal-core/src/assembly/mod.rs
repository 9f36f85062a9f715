//! Bytecode assembly: instructions, function bodies and constant pools.
//!
//! A [`Package`] holds one flat instruction list per function plus the
//! string, call and type pools the instructions index into. Lexical scopes
//! are bracketed by `begin`/`end` markers; branches address them by
//! relative level (see [`scope`]).

mod pool;
pub mod scope;

pub use pool::ConstPool;
pub use scope::{match_scopes, BranchTarget, Scope, ScopeStack};

use serde::Serialize;
use std::fmt;

use crate::ids::{FunIdx, SymbolId};
use crate::index_vec::IndexVec;
use crate::source::Token;
use crate::symbols::SymbolTable;

/// Instruction opcodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    Nop,
    /// Annotation carrying a string pool index.
    Comment,
    I64,
    F64,
    Str,
    /// Declare a local of the type at a type pool index.
    Loc,
    /// Load a reference to a local.
    Ldlr,
    Begin,
    End,
    Br,
    BrIf,
    BrNif,
    Call,
    Ceq,
    Cne,
    Clt,
    Cle,
    Cgt,
    Cge,
    Ret,
}

/// The operand shape an opcode expects.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandClass {
    None,
    Int,
    Float,
    StringPool,
    CallPool,
    TypePool,
    Level,
    Local,
}

impl Opcode {
    pub const ALL: [Opcode; 20] = [
        Opcode::Nop,
        Opcode::Comment,
        Opcode::I64,
        Opcode::F64,
        Opcode::Str,
        Opcode::Loc,
        Opcode::Ldlr,
        Opcode::Begin,
        Opcode::End,
        Opcode::Br,
        Opcode::BrIf,
        Opcode::BrNif,
        Opcode::Call,
        Opcode::Ceq,
        Opcode::Cne,
        Opcode::Clt,
        Opcode::Cle,
        Opcode::Cgt,
        Opcode::Cge,
        Opcode::Ret,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Comment => "comment",
            Opcode::I64 => "i64",
            Opcode::F64 => "f64",
            Opcode::Str => "str",
            Opcode::Loc => "loc",
            Opcode::Ldlr => "ldlr",
            Opcode::Begin => "begin",
            Opcode::End => "end",
            Opcode::Br => "br",
            Opcode::BrIf => "brif",
            Opcode::BrNif => "brnif",
            Opcode::Call => "call",
            Opcode::Ceq => "ceq",
            Opcode::Cne => "cne",
            Opcode::Clt => "clt",
            Opcode::Cle => "cle",
            Opcode::Cgt => "cgt",
            Opcode::Cge => "cge",
            Opcode::Ret => "ret",
        }
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn operand_class(self) -> OperandClass {
        match self {
            Opcode::Nop | Opcode::Begin | Opcode::End | Opcode::Ret => OperandClass::None,
            Opcode::Comment | Opcode::Str => OperandClass::StringPool,
            Opcode::I64 => OperandClass::Int,
            Opcode::F64 => OperandClass::Float,
            Opcode::Loc => OperandClass::TypePool,
            Opcode::Call => OperandClass::CallPool,
            Opcode::Ldlr => OperandClass::Local,
            Opcode::Br | Opcode::BrIf | Opcode::BrNif => OperandClass::Level,
            Opcode::Ceq
            | Opcode::Cne
            | Opcode::Clt
            | Opcode::Cle
            | Opcode::Cgt
            | Opcode::Cge => OperandClass::None,
        }
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Br | Opcode::BrIf | Opcode::BrNif)
    }

    pub fn is_compare(self) -> bool {
        matches!(
            self,
            Opcode::Ceq | Opcode::Cne | Opcode::Clt | Opcode::Cle | Opcode::Cgt | Opcode::Cge
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An instruction operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Operand {
    None,
    Int(i64),
    /// IEEE-754 bits of an `f64`.
    Float(u64),
    /// Index into the pool selected by the opcode.
    Pool(u32),
    /// Relative scope level of a branch.
    Level(i32),
    Local(u32),
}

impl Operand {
    pub fn float(value: f64) -> Operand {
        Operand::Float(value.to_bits())
    }

    /// Whether this operand has the shape `class` requires.
    pub fn fits(self, class: OperandClass) -> bool {
        matches!(
            (self, class),
            (Operand::None, OperandClass::None)
                | (Operand::Int(_), OperandClass::Int)
                | (Operand::Float(_), OperandClass::Float)
                | (
                    Operand::Pool(_),
                    OperandClass::StringPool | OperandClass::CallPool | OperandClass::TypePool
                )
                | (Operand::Level(_), OperandClass::Level)
                | (Operand::Local(_), OperandClass::Local)
        )
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Float(bits) => write!(f, "{:#018x}", bits),
            Operand::Pool(i) | Operand::Local(i) => write!(f, "{}", i),
            Operand::Level(l) => write!(f, "{}", l),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Instruction {
    pub op: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(op: Opcode, operand: Operand) -> Self {
        Self { op, operand }
    }

    pub fn simple(op: Opcode) -> Self {
        Self::new(op, Operand::None)
    }
}

/// The instructions of one function, with a parallel list of debug tokens.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionBody {
    pub fun: SymbolId,
    pub code: Vec<Instruction>,
    #[serde(skip)]
    pub tokens: Vec<Option<Token>>,
}

impl FunctionBody {
    pub fn new(fun: SymbolId) -> Self {
        Self {
            fun,
            code: Vec::new(),
            tokens: Vec::new(),
        }
    }

    /// Append an instruction, returning its index.
    pub fn emit(&mut self, inst: Instruction, token: Option<Token>) -> usize {
        self.code.push(inst);
        self.tokens.push(token);
        self.code.len() - 1
    }

    /// The debug token recorded for the instruction at `index`.
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index).and_then(Option::as_ref)
    }
}

/// Everything emitted for one compilation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Package {
    pub functions: IndexVec<FunIdx, FunctionBody>,
    /// String literals and comments.
    pub strings: ConstPool<String>,
    /// Called functions.
    pub calls: ConstPool<SymbolId>,
    /// Referenced types.
    pub types: ConstPool<SymbolId>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, body: FunctionBody) -> FunIdx {
        self.functions.push(body)
    }

    pub fn add_string(&mut self, value: &str) -> u32 {
        self.strings.insert(value, value.to_string())
    }

    /// Pool a called function, keyed by full name.
    pub fn add_call(&mut self, table: &SymbolTable, fun: SymbolId) -> u32 {
        self.calls.insert(table.full_name(fun), fun)
    }

    /// Pool a referenced type, keyed by full name.
    pub fn add_type(&mut self, table: &SymbolTable, ty: SymbolId) -> u32 {
        self.types.insert(table.full_name(ty), ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::known::Fundamental;

    #[test]
    fn test_opcode_names_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
        assert_eq!(Opcode::from_name("jmp"), None);
    }

    #[test]
    fn test_operand_fits_class() {
        assert!(Operand::Pool(0).fits(Opcode::Call.operand_class()));
        assert!(Operand::Level(-1).fits(Opcode::BrIf.operand_class()));
        assert!(Operand::None.fits(Opcode::Ceq.operand_class()));
        assert!(!Operand::Int(1).fits(Opcode::Str.operand_class()));
        assert!(!Operand::None.fits(Opcode::I64.operand_class()));
    }

    #[test]
    fn test_package_pools_dedupe_by_full_name() {
        let mut table = SymbolTable::new();
        register_builtins(&mut table).unwrap();
        let int = table.fundamental(Fundamental::Int).unwrap();
        let str_ = table.fundamental(Fundamental::Str).unwrap();

        let mut package = Package::new();
        assert_eq!(package.add_type(&table, int), 0);
        assert_eq!(package.add_type(&table, str_), 1);
        assert_eq!(package.add_type(&table, int), 0);
        assert_eq!(package.add_string("hi"), 0);
        assert_eq!(package.add_string("hi"), 0);
        assert_eq!(package.types.get(1), Some(&str_));
    }

    #[test]
    fn test_instruction_json_shape() {
        let inst = Instruction::new(Opcode::BrIf, Operand::Level(-1));
        let json = serde_json::to_value(inst).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "op": "brif", "operand": { "kind": "level", "value": -1 } })
        );

        let nop = serde_json::to_value(Instruction::simple(Opcode::Nop)).unwrap();
        assert_eq!(nop, serde_json::json!({ "op": "nop", "operand": { "kind": "none" } }));
    }

    #[test]
    fn test_emit_records_tokens() {
        let mut body = FunctionBody::new(SymbolId(0));
        let i = body.emit(Instruction::new(Opcode::I64, Operand::Int(7)), None);
        assert_eq!(i, 0);
        assert_eq!(body.token(0), None);
        assert_eq!(body.code[0].operand.to_string(), "7");
        assert_eq!(Operand::float(1.5).to_string(), "0x3ff8000000000000");
    }
}
