//! Primary and postfix expressions, function calls and arrow targets.

use string_cache::DefaultAtom as Atom;

use super::{CResult, ParseSession};
use crate::consts::{FNS, XS_NS};
use crate::error::CompileError;
use crate::functions::{Arity, FunctionId, FunctionNamespace, FunctionTable};
use crate::keywords::is_reserved_function_name;
use crate::names::{ExpandedName, LexicalName};
use crate::opmap::{OpCode, OpObject};
use crate::seqtype::AtomicType;

impl ParseSession<'_, '_> {
    /// ```text
    /// PostfixExpr ::= PrimaryExpr Predicate*
    /// ```
    pub(super) fn filter_expr(&mut self) -> CResult<()> {
        let start = self.ops.len();
        self.primary_expr()?;
        if self.is("[") {
            self.ops.insert(start, OpCode::Filter, &[]);
            self.predicates()?;
            self.ops.close(start);
        }
        Ok(())
    }

    /// ```text
    /// PrimaryExpr ::= Literal | VarRef | ParenthesizedExpr | ContextItemExpr
    ///               | FunctionCall | FunctionItemExpr | MapConstructor
    ///               | ArrayConstructor
    /// ```
    fn primary_expr(&mut self) -> CResult<()> {
        let Some(token) = self.current() else {
            return Err(self.unexpected("a primary expression"));
        };
        if let Some(literal) = token.as_literal() {
            self.cursor.advance();
            self.emit_literal(literal.clone());
            return Ok(());
        }
        match token.as_lexeme().unwrap_or_default() {
            "$" if self.peek_is(2, "(") => self.dynamic_call(),
            "$" => self.variable_ref(),
            "(" => self.parenthesized(),
            "[" => self.square_array(),
            "." => {
                self.cursor.advance();
                self.ops.leaf(OpCode::ContextItem, &[]);
                Ok(())
            }
            "map" if self.peek_is(1, "{") => self.map_constructor(),
            "array" if self.peek_is(1, "{") => self.curly_array(),
            "function" if self.peek_is(1, "(") => self.inline_function(),
            _ if self.peek_is(1, "#") => self.named_function_ref(),
            _ if self.peek_is(1, "(") => self.function_call(0),
            _ => Err(self.unexpected("a primary expression")),
        }
    }

    /// `$name`, with `name` resolved without a default namespace.
    pub(super) fn variable_name(&mut self) -> CResult<ExpandedName> {
        self.expect("$")?;
        let Some(lexeme) = self.current_lexeme().filter(|l| LexicalName::parse(l).is_some()) else {
            return Err(self.unexpected("a variable name"));
        };
        let name = self.resolve_name(lexeme, None)?;
        self.cursor.advance();
        Ok(name)
    }

    fn variable_ref(&mut self) -> CResult<()> {
        let name = self.variable_name()?;
        let obj = self.ops.push_object(OpObject::Name(name));
        self.ops.leaf(OpCode::Variable, &[obj]);
        Ok(())
    }

    /// Resolve a function name lexeme against the default function namespace.
    pub(super) fn function_name(&self, lexeme: &str) -> CResult<ExpandedName> {
        match LexicalName::parse(lexeme) {
            Some(l) if l.is_unprefixed() && is_reserved_function_name(l.local_part()) => {
                Err(self.unexpected("a function name"))
            }
            Some(_) => self.resolve_name(lexeme, Some(&Atom::from(FNS))),
            None => Err(self.unexpected("a function name")),
        }
    }

    /// ```text
    /// FunctionCall ::= EQName "(" (ExprSingle ("," ExprSingle)*)? ")"
    /// ```
    ///
    /// `implicit` counts arguments supplied from outside the parentheses,
    /// as with the left operand of `=>`.
    pub(super) fn function_call(&mut self, implicit: usize) -> CResult<()> {
        let at = self.at();
        let lexeme = self.current_lexeme().unwrap_or_default();
        let name = self.function_name(lexeme)?;
        self.cursor.advance();

        let pos = if name.is_in(XS_NS) {
            let Some(atomic) = AtomicType::from_local(&name.local) else {
                return Err(CompileError::UnknownAtomicType { name: name.local.to_string(), at });
            };
            let obj = self.ops.push_object(OpObject::Name(atomic.name()));
            self.ops.open(OpCode::Constructor, &[obj])
        } else if let Some(id) = self.functions().function_id(&name.local, name.ns_uri()) {
            self.ops.open(OpCode::Function, &[id.as_operand()])
        } else if name.ns_uri().and_then(FunctionNamespace::from_uri).is_some() {
            let arity = self.count_call_arguments() + implicit;
            return Err(CompileError::UnknownFunction { name: name.to_string(), arity, at });
        } else {
            let obj = self.ops.push_object(OpObject::Name(name.clone()));
            self.ops.open(OpCode::ExtFunction, &[obj])
        };

        let given = self.arguments()? + implicit;
        let expected = match self.ops.op_at(pos) {
            Some(OpCode::Constructor) => Some(Arity::exactly(1)),
            Some(OpCode::Function) => self
                .ops
                .header_at(pos)
                .first()
                .copied()
                .and_then(FunctionId::from_operand)
                .and_then(FunctionTable::arity_of),
            _ => None,
        };
        if let Some(arity) = expected.filter(|a| !a.accepts(given)) {
            return Err(CompileError::WrongArity { name: name.to_string(), expected: arity.to_string(), found: given, at });
        }
        self.ops.close(pos);
        Ok(())
    }

    /// Compile a parenthesized argument list, returning the argument count.
    fn arguments(&mut self) -> CResult<usize> {
        self.expect("(")?;
        let mut count = 0;
        if !self.is(")") {
            loop {
                self.expr_single()?;
                count += 1;
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(count)
    }

    /// Argument count of the call whose `(` is the current token.
    fn count_call_arguments(&self) -> usize {
        let open = self.cursor.pos();
        match self.matching_close(open) {
            Some(close) if close > open + 1 => self.split_top_level(open + 1, close, ",").len(),
            _ => 0,
        }
    }

    /// ```text
    /// ArrowTarget ::= (EQName | VarRef) ArgumentList
    /// ```
    pub(super) fn arrow_target(&mut self) -> CResult<()> {
        match self.current_lexeme() {
            Some("$") if self.peek_is(2, "(") => self.dynamic_call(),
            Some(l) if LexicalName::parse(l).is_some() && self.peek_is(1, "(") => self.function_call(1),
            _ => Err(self.unexpected("a function call after '=>'")),
        }
    }
}
