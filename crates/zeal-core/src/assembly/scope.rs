//! Begin/End scope matching and relative branch resolution.
//!
//! Branches name their target by a level relative to the open scopes:
//! a negative level `-n` jumps back to the `begin` of the scope `n` levels
//! up (`-1` is the innermost), a non-negative level `n` jumps forward to the
//! `end` of the scope `n` levels out (`0` is the innermost).

use std::collections::HashMap;

use super::{Instruction, Opcode};

/// Map every `begin` index to its matching `end` index.
///
/// Unbalanced markers are left out of the map.
pub fn match_scopes(code: &[Instruction]) -> HashMap<usize, usize> {
    let mut ends = HashMap::new();
    let mut open = Vec::new();
    for (index, inst) in code.iter().enumerate() {
        match inst.op {
            Opcode::Begin => open.push(index),
            Opcode::End => {
                if let Some(begin) = open.pop() {
                    ends.insert(begin, index);
                }
            }
            _ => {}
        }
    }
    ends
}

/// An open scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub begin: usize,
    /// Matching `end`, if the function has one.
    pub end: Option<usize>,
    /// Operand stack depth when the scope was entered; the verifier requires
    /// the same depth at the matching `end`.
    pub depth: usize,
}

/// Resolved destination of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTarget {
    Begin(usize),
    End(usize),
}

impl BranchTarget {
    pub fn index(self) -> usize {
        match self {
            BranchTarget::Begin(i) | BranchTarget::End(i) => i,
        }
    }
}

/// The stack of open scopes while walking a function.
#[derive(Debug, Default)]
pub struct ScopeStack {
    ends: HashMap<usize, usize>,
    open: Vec<Scope>,
}

impl ScopeStack {
    /// Start a walk over `code`, pre-matching its scopes.
    pub fn new(code: &[Instruction]) -> Self {
        Self {
            ends: match_scopes(code),
            open: Vec::new(),
        }
    }

    pub fn push(&mut self, begin: usize, depth: usize) {
        self.open.push(Scope {
            begin,
            end: self.ends.get(&begin).copied(),
            depth,
        });
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.open.pop()
    }

    /// Matching `end` of the `begin` at `index`.
    pub fn end_of(&self, begin: usize) -> Option<usize> {
        self.ends.get(&begin).copied()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Resolve a relative branch level against the open scopes.
    pub fn resolve(&self, level: i32) -> Option<BranchTarget> {
        let len = self.open.len() as i64;
        let level = level as i64;
        if level < 0 {
            let slot = len + level;
            if slot < 0 {
                return None;
            }
            Some(BranchTarget::Begin(self.open[slot as usize].begin))
        } else {
            let slot = len - 1 - level;
            if slot < 0 {
                return None;
            }
            self.open[slot as usize].end.map(BranchTarget::End)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Operand;

    fn code(ops: &[Opcode]) -> Vec<Instruction> {
        ops.iter().map(|&op| Instruction::new(op, Operand::None)).collect()
    }

    #[test]
    fn test_match_nested_scopes() {
        let code = code(&[
            Opcode::Begin,
            Opcode::Begin,
            Opcode::Nop,
            Opcode::End,
            Opcode::End,
            Opcode::End,
        ]);
        let ends = match_scopes(&code);

        assert_eq!(ends.get(&0), Some(&4));
        assert_eq!(ends.get(&1), Some(&3));
        assert_eq!(ends.len(), 2);
    }

    #[test]
    fn test_resolve_levels() {
        let code = code(&[Opcode::Begin, Opcode::Begin, Opcode::End, Opcode::End]);
        let mut scopes = ScopeStack::new(&code);
        scopes.push(0, 0);
        scopes.push(1, 0);

        assert_eq!(scopes.resolve(-1), Some(BranchTarget::Begin(1)));
        assert_eq!(scopes.resolve(-2), Some(BranchTarget::Begin(0)));
        assert_eq!(scopes.resolve(0), Some(BranchTarget::End(2)));
        assert_eq!(scopes.resolve(1), Some(BranchTarget::End(3)));
        assert_eq!(scopes.resolve(-3), None);
        assert_eq!(scopes.resolve(2), None);

        assert_eq!(scopes.pop().map(|s| s.begin), Some(1));
        assert_eq!(scopes.resolve(-1), Some(BranchTarget::Begin(0)));
    }
}
