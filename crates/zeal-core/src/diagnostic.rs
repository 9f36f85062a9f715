//! Diagnostic types for error reporting.
//!
//! Diagnostics reported against a token carry its span; that is how errors
//! are "attached" to tokens for editor underlining. Diagnostics without a
//! span come from compiler-synthesized symbols or instructions without a
//! debug token.

use crate::source::{SourceMap, Span};
use serde::Serialize;
use std::fmt;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Render the diagnostic with source context.
    pub fn render(&self, source_map: &SourceMap) -> String {
        let mut output = format!("{}: {}\n", self.severity.as_str(), self.message);

        if let Some(span) = self.span {
            if let Some(source) = source_map.get(span.source) {
                let (line, col) = source.line_col(span.start);
                output.push_str(&format!("  --> {}:{}:{}\n", source.name(), line, col));
                if let Some(text) = source.line(line) {
                    output.push_str(&format!("{:4} | {}\n", line, text));
                }
            }
        }

        output
    }
}

/// A collection of diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::error(message).with_span(span));
    }

    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.push(Diagnostic::warning(message).with_span(span));
    }

    /// Diagnostics attached to exactly this span.
    pub fn at(&self, span: Span) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.span == Some(span))
    }

    /// Whether anything (error or warning) is already attached to this span.
    pub fn is_flagged(&self, span: Span) -> bool {
        self.at(span).next().is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Render all diagnostics.
    pub fn render(&self, source_map: &SourceMap) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.render(source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diag in &self.diagnostics {
            writeln!(f, "{}: {}", diag.severity.as_str(), diag.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
