pub mod brackets;
pub mod compiler;
pub mod composite;
pub mod consts;
pub mod diagnostics;
pub mod error;
pub mod functions;
pub mod keywords;
pub mod lexer;
pub mod names;
pub mod opmap;
pub mod options;
pub mod seqtype;
pub mod tokens;

pub use brackets::is_balanced;
pub use compiler::{Compilation, CompileMode, CompiledTree, XPathCompiler};
pub use composite::{Composite, Deferred};
pub use diagnostics::{CollectingSink, DiagnosticSink, Recovery, TracingSink};
pub use error::{CompileError, ErrorCode, Location};
pub use functions::{FunctionId, FunctionTable, XPathFunction};
pub use lexer::tokenize;
pub use names::ExpandedName;
pub use opmap::{IntegrityError, OpCode, OpMap, OpObject};
pub use options::{CompileOptions, CompileOptionsBuilder, NamespaceResolver, XPathVersion};
pub use seqtype::{ItemType, SchemaTypeResolver, SequenceType};
pub use tokens::{Literal, Token, TokenQueue};

/// Compile `expr` with default options.
pub fn compile(expr: &str) -> Result<Compilation, CompileError> {
    XPathCompiler::default().compile(expr)
}
