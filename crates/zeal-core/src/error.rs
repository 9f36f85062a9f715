//! Internal compiler errors.
//!
//! These signal a defect in the compiler itself (or in a collaborator
//! driving it), never a problem in the user's source. They are returned
//! immediately instead of being collected as diagnostics, and the trusted
//! "no compiler checks" mode does not downgrade them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("'{symbol}' expects {expected} type argument(s), got {actual}")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{symbol}' got {names} tuple name(s) for {args} type argument(s)")]
    TupleNamesMismatch {
        symbol: String,
        names: usize,
        args: usize,
    },

    #[error("base library type '{0}' is not defined")]
    MissingBaseType(String),

    #[error("'{0}' is not a type, function or field and cannot be specialized")]
    NotSpecializable(String),

    #[error("'{0}' is already specialized")]
    AlreadySpecialized(String),

    #[error("a symbol needs a name or a token")]
    MissingName,

    #[error("'{member}' must be declared before the functions of '{parent}'")]
    FunctionOrder { parent: String, member: String },

    #[error("full name '{0}' is used by more than one symbol")]
    DuplicateFullName(String),

    #[error("'{0}' is not a function")]
    NotAFunction(String),

    #[error("structurally different specializations share the name '{0}'")]
    InternCollision(String),
}

pub type Result<T, E = InternalError> = std::result::Result<T, E>;
