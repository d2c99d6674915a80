//! Single-pass compiler from tokens to an [`OpMap`].
//!
//! Productions write records straight into the buffer. A binary operator is
//! discovered after its left operand, so it is inserted in front of the
//! operand once seen. Constructs whose extent is only known after scanning
//! ahead (parenthesized sequences, arrays, maps, inline functions, dynamic
//! calls and the binding expressions) are recorded as [`Composite`]
//! descriptors holding token ranges that are compiled separately.

use std::ops::Range;
use std::sync::Arc;
use string_cache::DefaultAtom as Atom;

use crate::composite::{Composite, Deferred};
use crate::diagnostics::{DiagnosticSink, FALLBACK_EXPRESSION, Recovery};
use crate::error::{CompileError, Location};
use crate::functions::FunctionTable;
use crate::lexer::tokenize;
use crate::names::{ExpandedName, LexicalName};
use crate::opmap::{IntegrityError, OpCode, OpMap, OpObject};
use crate::options::{CompileOptions, NamespaceResolver, XPathVersion};
use crate::seqtype::SchemaTypeResolver;
use crate::tokens::{CursorMark, Literal, Token, TokenCursor, TokenQueue};

mod deferred;
mod expr;
mod path;
mod pattern;
mod primary;
mod seqtype;

type CResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// A general XPath expression.
    #[default]
    Select,
    /// An XSLT match pattern.
    MatchPattern,
}

/// Compiles expressions against one set of options, functions and schema types.
pub struct XPathCompiler {
    options: CompileOptions,
    functions: FunctionTable,
    namespaces: Arc<dyn NamespaceResolver>,
    schema_types: Option<Arc<dyn SchemaTypeResolver>>,
}

impl Default for XPathCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl XPathCompiler {
    pub fn new(options: CompileOptions) -> Self {
        let namespaces = options.resolver();
        Self { options, functions: FunctionTable::new(), namespaces, schema_types: None }
    }

    pub fn with_schema_types(mut self, resolver: Arc<dyn SchemaTypeResolver>) -> Self {
        self.schema_types = Some(resolver);
        self
    }

    /// Replace the prefix bindings from the options with an external resolver.
    pub fn with_namespace_resolver(mut self, resolver: Arc<dyn NamespaceResolver>) -> Self {
        self.namespaces = resolver;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    pub fn compile(&self, expr: &str) -> CResult<Compilation> {
        let queue = Arc::new(tokenize(expr)?);
        self.compile_queue(queue, CompileMode::Select)
    }

    pub fn compile_pattern(&self, pattern: &str) -> CResult<Compilation> {
        let queue = Arc::new(tokenize(pattern)?);
        self.compile_queue(queue, CompileMode::MatchPattern)
    }

    /// Compile a queue produced by any lexer that follows the lexeme conventions of [`tokenize`].
    pub fn compile_queue(&self, queue: Arc<TokenQueue>, mode: CompileMode) -> CResult<Compilation> {
        let range = 0..queue.len();
        self.compile_range(queue, range, mode, 0)
    }

    /// Compile one deferred part of an earlier compilation.
    pub fn compile_deferred(&self, parent: &Compilation, deferred: &Deferred) -> CResult<Compilation> {
        self.compile_range(Arc::clone(&parent.queue), deferred.tokens.clone(), CompileMode::Select, 0)
    }

    /// Compile `expr` and, recursively, every deferred part beneath it.
    pub fn compile_deep(&self, expr: &str) -> CResult<CompiledTree> {
        let queue = Arc::new(tokenize(expr)?);
        let range = 0..queue.len();
        self.compile_tree(&queue, range, CompileMode::Select, 0)
    }

    fn compile_tree(
        &self,
        queue: &Arc<TokenQueue>,
        range: Range<usize>,
        mode: CompileMode,
        depth: usize,
    ) -> CResult<CompiledTree> {
        let compilation = self.compile_range(Arc::clone(queue), range, mode, depth)?;
        let children = compilation
            .deferred()
            .into_iter()
            .map(|d| self.compile_tree(queue, d.tokens.clone(), CompileMode::Select, depth + 1))
            .collect::<CResult<Vec<_>>>()?;
        Ok(CompiledTree { compilation, children })
    }

    /// Compile `expr`, handing recoverable errors to `sink`.
    ///
    /// When the sink asks for substitution the result is the compilation of
    /// [`FALLBACK_EXPRESSION`]. Fatal errors are returned without consulting the sink.
    pub fn compile_or_recover(&self, expr: &str, sink: &mut dyn DiagnosticSink) -> CResult<Compilation> {
        match self.compile(expr) {
            Err(error) if error.is_recoverable() => match sink.syntax_error(&error) {
                Recovery::Substitute => self.compile(FALLBACK_EXPRESSION),
                Recovery::Abort => Err(error),
            },
            result => result,
        }
    }

    fn compile_range(
        &self,
        queue: Arc<TokenQueue>,
        range: Range<usize>,
        mode: CompileMode,
        depth: usize,
    ) -> CResult<Compilation> {
        tracing::debug!(?mode, tokens = range.len(), depth, "compiling expression");
        let (op_map, composites) = {
            let mut session = ParseSession::new(self, &queue, range.clone(), depth);
            match mode {
                // a deferred part may be empty, as in `function() {}`
                CompileMode::Select if range.is_empty() && (depth > 0 || !queue.is_empty()) => {
                    session.empty_root();
                }
                CompileMode::Select => session.select_root()?,
                CompileMode::MatchPattern => session.pattern_root()?,
            }
            (session.ops, session.composites)
        };
        tracing::debug!(slots = op_map.len(), composites = composites.len(), "compiled expression");
        Ok(Compilation { op_map, composites, queue, range, mode })
    }
}

/// The result of one compile call.
#[derive(Debug, Clone)]
pub struct Compilation {
    op_map: OpMap,
    composites: Vec<Composite>,
    queue: Arc<TokenQueue>,
    range: Range<usize>,
    mode: CompileMode,
}

impl Compilation {
    pub fn op_map(&self) -> &OpMap {
        &self.op_map
    }

    pub fn composites(&self) -> &[Composite] {
        &self.composites
    }

    pub fn queue(&self) -> &Arc<TokenQueue> {
        &self.queue
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Source text of the compiled range.
    pub fn source(&self) -> String {
        self.queue.text(self.range.clone())
    }

    /// The composite referenced by the record at `pos`, if it is a composite record.
    pub fn composite_at(&self, pos: usize) -> Option<&Composite> {
        let op = self.op_map.op_at(pos)?;
        if !op.is_composite() {
            return None;
        }
        let index = usize::try_from(*self.op_map.header_at(pos).first()?).ok()?;
        self.composites.get(index)
    }

    /// Every deferred range, in composite order.
    pub fn deferred(&self) -> Vec<&Deferred> {
        self.composites.iter().flat_map(Composite::deferred).collect()
    }

    /// Check the buffer structure and that composite records point at matching descriptors.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        self.op_map.verify()?;
        self.verify_composites(0)
    }

    fn verify_composites(&self, pos: usize) -> Result<(), IntegrityError> {
        if let Some(op) = self.op_map.op_at(pos).filter(|op| op.is_composite()) {
            if self.composite_at(pos).map(Composite::opcode) != Some(op) {
                return Err(IntegrityError::BadOperand { pos, operand: 0 });
            }
        }
        self.op_map.children(pos).into_iter().try_for_each(|child| self.verify_composites(child))
    }

    pub fn disassemble(&self) -> String {
        let mut out = self.op_map.disassemble();
        for (i, composite) in self.composites.iter().enumerate() {
            out.push_str(&format!("  @{i}  {composite}\n"));
        }
        out
    }
}

/// A compilation together with the compilations of its deferred parts.
#[derive(Debug, Clone)]
pub struct CompiledTree {
    pub compilation: Compilation,
    /// One entry per [`Compilation::deferred`] range, in the same order.
    pub children: Vec<CompiledTree>,
}

impl CompiledTree {
    /// Number of compilations in the tree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CompiledTree::size).sum::<usize>()
    }
}

/// Restorable state of a session: cursor plus buffer and side-channel lengths.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    mark: CursorMark,
    ops_len: usize,
    objects_len: usize,
    composites_len: usize,
}

/// Mutable state of one compile call.
pub(crate) struct ParseSession<'c, 'q> {
    compiler: &'c XPathCompiler,
    cursor: TokenCursor<'q>,
    ops: OpMap,
    composites: Vec<Composite>,
    depth: usize,
}

impl<'c, 'q> ParseSession<'c, 'q> {
    fn new(compiler: &'c XPathCompiler, queue: &'q TokenQueue, range: Range<usize>, depth: usize) -> Self {
        Self { compiler, cursor: TokenCursor::new(queue, range), ops: OpMap::new(), composites: Vec::new(), depth }
    }

    fn options(&self) -> &'c CompileOptions {
        &self.compiler.options
    }

    fn functions(&self) -> &'c FunctionTable {
        &self.compiler.functions
    }

    fn location_of(&self, token: usize) -> Location {
        Location { token, offset: self.cursor.queue().offset_of(token) }
    }

    fn at(&self) -> Location {
        self.location_of(self.cursor.pos())
    }

    fn current(&self) -> Option<&'q Token> {
        self.cursor.current()
    }

    fn current_lexeme(&self) -> Option<&'q str> {
        self.cursor.current().and_then(Token::as_lexeme)
    }

    fn peek_lexeme(&self, n: usize) -> Option<&'q str> {
        self.cursor.peek(n).and_then(Token::as_lexeme)
    }

    fn is(&self, s: &str) -> bool {
        self.cursor.current().is_some_and(|t| t.is(s))
    }

    fn peek_is(&self, n: usize, s: &str) -> bool {
        self.cursor.peek(n).is_some_and(|t| t.is(s))
    }

    fn eat(&mut self, s: &str) -> bool {
        let matched = self.is(s);
        if matched {
            self.cursor.advance();
        }
        matched
    }

    fn expect(&mut self, s: &str) -> CResult<()> {
        if self.eat(s) { Ok(()) } else { Err(self.unexpected(&format!("'{s}'"))) }
    }

    fn describe_current(&self) -> String {
        match self.cursor.current() {
            Some(t) => format!("'{t}'"),
            None => "end of expression".to_string(),
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::UnexpectedToken { expected: expected.to_string(), found: self.describe_current(), at: self.at() }
    }

    fn type_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::SequenceTypeSyntax { message: message.into(), at: self.at() }
    }

    /// Run `production` one nesting level deeper, failing once the limit is passed.
    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<T> {
        let limit = self.options().max_depth;
        if self.depth >= limit {
            return Err(CompileError::RecursionLimit { limit, at: self.at() });
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn require_v31(&self, construct: &str) -> CResult<()> {
        match self.options().version {
            XPathVersion::V31 => Ok(()),
            XPathVersion::V20 => Err(CompileError::UnexpectedToken {
                expected: "an XPath 2.0 expression".to_string(),
                found: construct.to_string(),
                at: self.at(),
            }),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            mark: self.cursor.mark(),
            ops_len: self.ops.len(),
            objects_len: self.ops.objects_len(),
            composites_len: self.composites.len(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor.reset(checkpoint.mark);
        self.ops.truncate(checkpoint.ops_len, checkpoint.objects_len);
        self.composites.truncate(checkpoint.composites_len);
    }

    /// Try an alternative. `Ok(None)` from `attempt` rolls everything back.
    fn speculate<T>(
        &mut self,
        production: &'static str,
        attempt: impl FnOnce(&mut Self) -> CResult<Option<T>>,
    ) -> CResult<Option<T>> {
        let checkpoint = self.checkpoint();
        let outcome = attempt(self)?;
        if outcome.is_none() {
            tracing::trace!(production, token = self.cursor.pos(), "rolled back speculative parse");
            self.restore(checkpoint);
        }
        Ok(outcome)
    }

    /// Resolve a name lexeme. Unprefixed names take `default_ns`.
    fn resolve_name(&self, lexeme: &str, default_ns: Option<&Atom>) -> CResult<ExpandedName> {
        match LexicalName::parse(lexeme) {
            Some(LexicalName::Local(local)) => {
                Ok(ExpandedName { ns_uri: default_ns.cloned(), local: Atom::from(local) })
            }
            Some(LexicalName::Prefixed { prefix, local }) => match self.compiler.namespaces.resolve_prefix(prefix) {
                Some(ns) => Ok(ExpandedName { ns_uri: Some(ns), local: Atom::from(local) }),
                None => Err(CompileError::UnboundPrefix { prefix: prefix.to_string(), at: self.at() }),
            },
            Some(LexicalName::UriQualified { uri, local }) => {
                Ok(ExpandedName::new(if uri.is_empty() { None } else { Some(uri) }, local))
            }
            None => Err(self.unexpected("a name")),
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> CResult<Atom> {
        self.compiler
            .namespaces
            .resolve_prefix(prefix)
            .ok_or_else(|| CompileError::UnboundPrefix { prefix: prefix.to_string(), at: self.at() })
    }

    fn deferred(&self, tokens: Range<usize>) -> Deferred {
        tracing::trace!(start = tokens.start, end = tokens.end, "deferred range");
        let text = self.cursor.queue().text(tokens.clone());
        Deferred { tokens, text }
    }

    fn emit_composite(&mut self, composite: Composite) {
        let index = i32::try_from(self.composites.len()).unwrap_or(i32::MAX);
        self.ops.leaf(composite.opcode(), &[index]);
        self.composites.push(composite);
    }

    fn emit_literal(&mut self, literal: Literal) {
        let obj = self.ops.push_object(OpObject::Literal(literal));
        self.ops.leaf(OpCode::Literal, &[obj]);
    }

    /// `()` is encoded as the range `1 to 0`.
    fn emit_empty_sequence(&mut self) {
        let pos = self.ops.open(OpCode::Range, &[]);
        self.emit_literal(Literal::Integer(1));
        self.emit_literal(Literal::Integer(0));
        self.ops.close(pos);
    }

    fn empty_root(&mut self) {
        let root = self.ops.open(OpCode::XPath, &[]);
        self.emit_empty_sequence();
        self.ops.close(root);
    }

    fn select_root(&mut self) -> CResult<()> {
        let root = self.ops.open(OpCode::XPath, &[]);
        if self.cursor.at_end() {
            return Err(self.unexpected("an expression"));
        }
        self.expr()?;
        if !self.cursor.at_end() {
            return Err(CompileError::TrailingTokens { found: self.describe_current(), at: self.at() });
        }
        self.ops.close(root);
        Ok(())
    }
}
