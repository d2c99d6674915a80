use core::fmt;
use std::sync::Arc;

use crate::consts::ERR_NS;
use crate::names::ExpandedName;

/// Where in the token queue an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Token index.
    pub token: usize,
    /// Byte offset in the source, when the queue carries spans for it.
    pub offset: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(o) => write!(f, "token {} (offset {o})", self.token),
            None => write!(f, "token {}", self.token),
        }
    }
}

/// W3C error codes raised by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    XPST0003, // grammar violation
    XPST0017, // unknown function or wrong arity
    XPST0051, // unknown type name in a sequence type
    XPST0081, // unbound namespace prefix
    XQST0059, // schema could not be located
    XPDY0130, // implementation limit exceeded
    FOER0000, // function table failures
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::XPST0003 => "XPST0003",
            ErrorCode::XPST0017 => "XPST0017",
            ErrorCode::XPST0051 => "XPST0051",
            ErrorCode::XPST0081 => "XPST0081",
            ErrorCode::XQST0059 => "XQST0059",
            ErrorCode::XPDY0130 => "XPDY0130",
            ErrorCode::FOER0000 => "FOER0000",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// The code as a name in the `err` namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS), self.as_str())
    }

    pub fn from_code(s: &str) -> Self {
        match s.strip_prefix("err:").unwrap_or(s) {
            "XPST0003" => ErrorCode::XPST0003,
            "XPST0017" => ErrorCode::XPST0017,
            "XPST0051" => ErrorCode::XPST0051,
            "XPST0081" => ErrorCode::XPST0081,
            "XQST0059" => ErrorCode::XQST0059,
            "XPDY0130" => ErrorCode::XPDY0130,
            "FOER0000" => ErrorCode::FOER0000,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "err:{}", self.as_str())
    }
}

pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("lexical error at offset {offset}: {message}")]
    Lexical { offset: usize, message: String },

    #[error("expected {expected}, found {found} at {at}")]
    UnexpectedToken { expected: String, found: String, at: Location },

    #[error("unexpected {found} after complete expression at {at}")]
    TrailingTokens { found: String, at: Location },

    #[error("illegal axis name '{name}' at {at}")]
    IllegalAxisName { name: String, at: Location },

    #[error("unknown function {name}#{arity} at {at}")]
    UnknownFunction { name: String, arity: usize, at: Location },

    #[error("function {name} takes {expected} arguments, {found} given at {at}")]
    WrongArity { name: String, expected: String, found: usize, at: Location },

    #[error("namespace prefix '{prefix}' is not bound at {at}")]
    UnboundPrefix { prefix: String, at: Location },

    #[error("unknown atomic type xs:{name} at {at}")]
    UnknownAtomicType { name: String, at: Location },

    #[error("malformed sequence type at {at}: {message}")]
    SequenceTypeSyntax { message: String, at: Location },

    #[error("schema type {name} is not declared (at {at})")]
    SchemaTypeNotFound { name: String, at: Location },

    #[error("schema type lookup for {name} failed at {at}")]
    SchemaLookup {
        name: String,
        at: Location,
        #[source]
        source: ErrorSource,
    },

    #[error("expression nesting exceeds {limit} levels at {at}")]
    RecursionLimit { limit: usize, at: Location },

    #[error("function {name} could not be constructed")]
    FunctionConstruction {
        name: String,
        #[source]
        source: ErrorSource,
    },

    #[error("custom function table is full ({capacity} entries)")]
    FunctionTableFull { capacity: usize },
}

impl CompileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Lexical { .. }
            | CompileError::UnexpectedToken { .. }
            | CompileError::TrailingTokens { .. }
            | CompileError::IllegalAxisName { .. }
            | CompileError::SequenceTypeSyntax { .. } => ErrorCode::XPST0003,
            CompileError::UnknownFunction { .. } | CompileError::WrongArity { .. } => ErrorCode::XPST0017,
            CompileError::UnknownAtomicType { .. } | CompileError::SchemaTypeNotFound { .. } => {
                ErrorCode::XPST0051
            }
            CompileError::UnboundPrefix { .. } => ErrorCode::XPST0081,
            CompileError::SchemaLookup { .. } => ErrorCode::XQST0059,
            CompileError::RecursionLimit { .. } => ErrorCode::XPDY0130,
            CompileError::FunctionConstruction { .. } | CompileError::FunctionTableFull { .. } => {
                ErrorCode::FOER0000
            }
        }
    }

    /// Syntax errors may be handed to a diagnostic sink; everything else aborts the compile.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CompileError::Lexical { .. }
                | CompileError::UnexpectedToken { .. }
                | CompileError::TrailingTokens { .. }
                | CompileError::IllegalAxisName { .. }
                | CompileError::UnknownFunction { .. }
                | CompileError::WrongArity { .. }
                | CompileError::UnboundPrefix { .. }
                | CompileError::UnknownAtomicType { .. }
                | CompileError::SequenceTypeSyntax { .. }
        )
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::UnexpectedToken { at, .. }
            | CompileError::TrailingTokens { at, .. }
            | CompileError::IllegalAxisName { at, .. }
            | CompileError::UnknownFunction { at, .. }
            | CompileError::WrongArity { at, .. }
            | CompileError::UnboundPrefix { at, .. }
            | CompileError::UnknownAtomicType { at, .. }
            | CompileError::SequenceTypeSyntax { at, .. }
            | CompileError::SchemaTypeNotFound { at, .. }
            | CompileError::SchemaLookup { at, .. }
            | CompileError::RecursionLimit { at, .. } => Some(*at),
            CompileError::Lexical { .. }
            | CompileError::FunctionConstruction { .. }
            | CompileError::FunctionTableFull { .. } => None,
        }
    }

    /// Byte offset in the source text, if known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CompileError::Lexical { offset, .. } => Some(*offset),
            _ => self.location().and_then(|l| l.offset),
        }
    }
}
