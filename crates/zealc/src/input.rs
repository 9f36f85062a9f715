//! Package description format.
//!
//! A package description is the JSON a front end hands to `zealc`: the
//! declarations to bind and the instructions to emit for each function.
//! Spans, when present, are byte ranges into `source` (or into the
//! description itself when no source is named).

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct PackageDesc {
    #[serde(default)]
    pub source: Option<PathBuf>,
    pub modules: Vec<ModuleDesc>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleDesc {
    pub name: String,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
    #[serde(default)]
    pub types: Vec<TypeDesc>,
    #[serde(default)]
    pub functions: Vec<FunDesc>,
}

#[derive(Debug, Deserialize)]
pub struct TypeDesc {
    pub name: String,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
    #[serde(default)]
    pub qualifiers: Vec<String>,
    /// Type parameter names.
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDesc>,
    #[serde(default)]
    pub methods: Vec<FunDesc>,
}

#[derive(Debug, Deserialize)]
pub struct FieldDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
}

#[derive(Debug, Deserialize)]
pub struct FunDesc {
    pub name: String,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
    #[serde(default)]
    pub qualifiers: Vec<String>,
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub params: Vec<ParamDesc>,
    #[serde(default)]
    pub returns: Vec<TypeRef>,
    #[serde(default)]
    pub body: Vec<InstDesc>,
}

#[derive(Debug, Deserialize)]
pub struct ParamDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
}

/// A structured type reference.
///
/// Variants are tried in order; each is recognized by its distinguishing key.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    /// Generic placeholder `#n`.
    Param { param: usize },
    /// `^T`
    Ref {
        #[serde(rename = "ref")]
        target: Box<TypeRef>,
    },
    Generic { generic: String, args: Vec<TypeRef> },
    Tuple {
        tuple: Vec<TypeRef>,
        #[serde(default)]
        names: Vec<String>,
    },
    Named { name: String },
}

/// One instruction. The operand key used depends on the opcode.
#[derive(Debug, Deserialize)]
pub struct InstDesc {
    pub op: String,
    #[serde(default)]
    pub int: Option<i64>,
    #[serde(default)]
    pub float: Option<f64>,
    #[serde(default)]
    pub string: Option<String>,
    #[serde(default, rename = "type")]
    pub ty: Option<TypeRef>,
    /// Called function, by full name or by `Module.name` when unambiguous.
    #[serde(default)]
    pub call: Option<String>,
    /// Type arguments of a generic call.
    #[serde(default)]
    pub args: Vec<TypeRef>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub local: Option<u32>,
    #[serde(default)]
    pub span: Option<(usize, usize)>,
}
