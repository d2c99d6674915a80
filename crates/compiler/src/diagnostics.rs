//! Reporting of recoverable syntax errors.

use crate::error::CompileError;

/// Expression compiled in place of one that failed with a recoverable error.
/// It selects the parent of the root, which is always empty.
pub const FALLBACK_EXPRESSION: &str = "/..";

/// What the compiler does after reporting a recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Compile [`FALLBACK_EXPRESSION`] instead.
    Substitute,
    /// Return the error to the caller.
    Abort,
}

pub trait DiagnosticSink {
    fn syntax_error(&mut self, error: &CompileError) -> Recovery;
}

/// Logs every error as a warning and keeps going.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn syntax_error(&mut self, error: &CompileError) -> Recovery {
        tracing::warn!(code = %error.code(), %error, "substituting fallback expression");
        Recovery::Substitute
    }
}

/// Keeps the reported errors and answers with a fixed decision.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    pub errors: Vec<CompileError>,
    pub decision: Recovery,
}

impl CollectingSink {
    pub fn new(decision: Recovery) -> Self {
        Self { errors: Vec::new(), decision }
    }
}

impl DiagnosticSink for CollectingSink {
    fn syntax_error(&mut self, error: &CompileError) -> Recovery {
        self.errors.push(error.clone());
        self.decision
    }
}
