//! Standard module registration.
//!
//! Binds the `Zeal` module with the fundamental types and the generic base
//! types the table specializes on demand (references, pointers, optionals,
//! spans and lists).

use crate::error::Result;
use crate::ids::SymbolId;
use crate::known::{Fundamental, STD_MODULE};
use crate::symbols::{Qualifiers, SymbolKind, SymbolTable};

/// Generic base types declared in the standard module, all of arity one.
const GENERIC_BASE_TYPES: [&str; 5] = ["RawPointer", "Ref", "Maybe", "Span", "List"];

/// Declare the standard module, register the fundamental types and
/// regenerate the lookup index.
pub fn register_builtins(table: &mut SymbolTable) -> Result<SymbolId> {
    let root = table.root();
    let (module, _) = table.declare(
        SymbolKind::Module,
        root,
        None,
        Some(STD_MODULE),
        Qualifiers::PUBLIC,
    )?;

    register_fundamentals(table, module)?;
    register_generic_base_types(table, module)?;

    table.generate_lookup()?;
    tracing::debug!("registered standard module '{}'", STD_MODULE);
    Ok(module)
}

fn register_fundamentals(table: &mut SymbolTable, module: SymbolId) -> Result<()> {
    for f in Fundamental::ALL {
        let (id, _) = table.declare(
            SymbolKind::Type,
            module,
            None,
            Some(f.name()),
            Qualifiers::PUBLIC,
        )?;
        table.register_fundamental(f, id);
    }
    Ok(())
}

fn register_generic_base_types(table: &mut SymbolTable, module: SymbolId) -> Result<()> {
    for name in GENERIC_BASE_TYPES {
        let id = table.new_symbol(SymbolKind::Type, module, None, Some(name), Qualifiers::PUBLIC)?;
        table.get_mut(id).generic_param_names = vec!["T".to_string()];
        table.finalize_full_name(id);
        table.add_or_reject(id)?;
        // Type parameters come before ordinary members.
        table.declare(SymbolKind::TypeParam, id, None, Some("T"), Qualifiers::NONE)?;
    }
    Ok(())
}
