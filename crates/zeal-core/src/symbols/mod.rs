//! Symbol tree and table.
//!
//! Every declared or synthesized entity is a [`Symbol`] in the arena owned
//! by the [`SymbolTable`]. The table also interns generic specializations,
//! including tuples and lambdas, and collects user diagnostics.

mod naming;
mod specialize;
mod symbol;
mod table;

pub use symbol::{Qualifiers, Symbol, SymbolKind};
pub use table::{AddOutcome, SymbolTable, TableOptions};
