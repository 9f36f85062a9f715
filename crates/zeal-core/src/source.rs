//! Source locations and tokens for diagnostics.
//!
//! Lexing is done by an external front end; the core only needs to know
//! where a declaration or instruction came from so diagnostics can be
//! attached to it and rendered with context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Unique identifier for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// A location in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Source file ID.
    pub source: SourceId,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(source: SourceId, start: usize, end: usize) -> Self {
        Self { source, start, end }
    }
}

/// A token handed over by the front end: its text and where it was found.
///
/// Symbols and instructions carry an optional token; diagnostics reported
/// against a token are attached to its span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A source file with its content and metadata.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    /// Optional file path (None for inline sources).
    pub path: Option<PathBuf>,
    pub content: String,
}

impl Source {
    /// Get a display name for this source.
    pub fn name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("<source#{}>", self.id.0))
    }

    /// Get line and column (both 1-based) for a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, ch) in self.content.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// The text of a 1-based line, if it exists.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.content.lines().nth(line.checked_sub(1)?)
    }
}

/// Manages a collection of source files.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    sources: HashMap<SourceId, Source>,
    path_to_id: HashMap<PathBuf, SourceId>,
    next_id: u32,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file with a path. Adding the same path twice returns the first ID.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> SourceId {
        let path = path.into();
        if let Some(&id) = self.path_to_id.get(&path) {
            return id;
        }

        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.path_to_id.insert(path.clone(), id);
        self.sources.insert(
            id,
            Source {
                id,
                path: Some(path),
                content: content.into(),
            },
        );
        id
    }

    /// Add an inline source (no path).
    pub fn add_inline(&mut self, content: impl Into<String>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.insert(
            id,
            Source {
                id,
                path: None,
                content: content.into(),
            },
        );
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }
}
