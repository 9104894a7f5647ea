use std::fmt;

use thiserror::Error;

/// Represents a byte span within a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Classification of a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Wrong number or shape of arguments to a public entry point.
    Usage,
    InvalidArgument,
    Type,
    Range,
    /// Operation that needs an active invocation was called without one.
    Context,
    Pattern,
    Command,
    Runtime,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn usage(name: &str) -> Self {
        Self::new(DiagnosticKind::Usage, format!("Invalid call to {name}"))
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        if !self.notes.is_empty() {
            writeln!(f)?;
            for note in &self.notes {
                writeln!(f, "  note: {note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the tabula engine and shell.
#[derive(Debug, Error)]
pub enum TabulaError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TabulaError {
    pub fn kind(&self) -> Option<DiagnosticKind> {
        match self {
            TabulaError::Diagnostic(diag) => Some(diag.kind),
            TabulaError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TabulaError>;

/// Non-fatal conditions. The operation that raised one has already
/// continued with its fallback behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryKind {
    LocalOutsideFunction,
    ExclusiveIgnored,
    ExtraArgumentsIgnored,
    ClassLookupUnimplemented,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

pub(crate) fn fail<T>(kind: DiagnosticKind, message: impl Into<String>) -> Result<T> {
    Err(TabulaError::from(Diagnostic::new(kind, message)))
}

pub(crate) fn advise(queue: &mut Vec<Advisory>, kind: AdvisoryKind, message: impl Into<String>) {
    let advisory = Advisory::new(kind, message);
    tracing::warn!(kind = ?advisory.kind, "{}", advisory.message);
    queue.push(advisory);
}
