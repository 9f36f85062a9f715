//! Zeal compiler core
//!
//! This crate implements the symbol table and bytecode verifier of the Zeal
//! compiler:
//! - A symbol tree stored in an arena, addressed by `SymbolId`
//! - Generic specialization with interning, including tuples and lambdas
//! - A flat bytecode assembly with deduplicated constant pools
//! - An abstract interpreter verifying each function's instructions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SymbolTable                           │
//! │  ┌───────────┐  ┌─────────────┐  ┌────────────┐  ┌────────┐  │
//! │  │  Arena    │  │   Lookup    │  │Specialized │  │ Diags  │  │
//! │  │(Id→Symbol)│  │(name→Id)    │  │(name→Id)   │  │(spans) │  │
//! │  └───────────┘  └─────────────┘  └────────────┘  └────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!         ↑                                 ↑
//!    ┌────┴────┐    ┌─────────┐    ┌────────┴─┐    ┌─────────┐
//!    │ Binder  │ →  │ Codegen │ →  │ Verifier │ →  │ Listing │
//!    │ (decls) │    │(Package)│    │ (types)  │    │ (text)  │
//!    └─────────┘    └─────────┘    └──────────┘    └─────────┘
//! ```

// Core modules
pub mod builtins;
pub mod diagnostic;
pub mod error;
pub mod ids;
pub mod index_vec;
pub mod known;
pub mod source;
pub mod symbols;

// Bytecode modules
pub mod assembly;
pub mod listing;
pub mod verify;

// Re-exports
pub use assembly::{FunctionBody, Instruction, Opcode, Operand, Package};
pub use builtins::register_builtins;
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{InternalError, Result};
pub use ids::{FunIdx, LocalIdx, SymbolId};
pub use index_vec::{Idx, IndexVec};
pub use known::{Fundamental, KnownSymbols};
pub use listing::render_package;
pub use source::{Source, SourceId, SourceMap, Span, Token};
pub use symbols::{AddOutcome, Qualifiers, Symbol, SymbolKind, SymbolTable, TableOptions};
pub use verify::{verify_package, VerifyDiagnostic, Verifier};
