//! Symbol resolution and scope management for an Octave-style interpreter:
//! variable scopes with global markers, function tables with locking,
//! name classification for `exist`, bulk deletion through `clear`, internal
//! variables with call-scoped overrides, and a small command shell on top.

pub mod clear;
pub mod collaborators;
pub mod diagnostics;
pub mod environment;
pub mod functions;
pub mod internal;
pub mod lexer;
pub mod lock;
pub mod namegen;
pub mod pattern;
pub mod repl;
pub mod resolve;
pub mod runtime;
pub mod shell;
pub mod unwind;
pub mod value;

pub use collaborators::{ClassRegistry, FileSystem, LoadPath, SearchPath};
pub use diagnostics::{Advisory, AdvisoryKind, Diagnostic, DiagnosticKind, SourceSpan, TabulaError};
pub use functions::FunctionKind;
pub use repl::Repl;
pub use resolve::{Classification, Filter};
pub use runtime::{ExecutionContext, Interpreter, Invocation};
pub use shell::{Event, Shell};
pub use value::Value;
