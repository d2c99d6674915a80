//! Path expressions, axis steps, node tests and predicates.

use compact_str::CompactString;

use super::{CResult, ParseSession};
use crate::error::CompileError;
use crate::keywords::{Axis, NodeTestCode, lookup_axis, lookup_node_type};
use crate::names::{LexicalName, is_name_lexeme};
use crate::opmap::{NO_OPERAND, OpCode, OpObject};
use crate::seqtype::ItemType;
use crate::tokens::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StepKind {
    Axis,
    Filter,
}

impl ParseSession<'_, '_> {
    /// ```text
    /// PathExpr ::= ("/" RelativePathExpr?) | ("//" RelativePathExpr) | RelativePathExpr
    /// ```
    pub(super) fn path_expr(&mut self) -> CResult<()> {
        if self.is("/") {
            let path = self.ops.open(OpCode::LocationPath, &[]);
            self.ops.leaf(OpCode::Root, &[]);
            self.cursor.advance();
            if self.starts_relative_path() {
                self.step_expr()?;
                self.steps_tail()?;
            }
            self.ops.close(path);
            return Ok(());
        }
        if self.is("//") {
            let path = self.ops.open(OpCode::LocationPath, &[]);
            self.ops.leaf(OpCode::Root, &[]);
            self.cursor.advance();
            self.descendant_or_self_step();
            self.step_expr()?;
            self.steps_tail()?;
            self.ops.close(path);
            return Ok(());
        }

        let start = self.ops.len();
        let first = self.step_expr()?;
        if first == StepKind::Axis || self.is("/") || self.is("//") {
            self.ops.insert(start, OpCode::LocationPath, &[]);
            self.steps_tail()?;
            self.ops.close(start);
        }
        Ok(())
    }

    fn steps_tail(&mut self) -> CResult<()> {
        loop {
            if self.eat("/") {
                self.step_expr()?;
            } else if self.eat("//") {
                self.descendant_or_self_step();
                self.step_expr()?;
            } else {
                return Ok(());
            }
        }
    }

    /// Whether a `/` is followed by a relative path rather than ending the expression.
    fn starts_relative_path(&self) -> bool {
        let Some(token) = self.current() else { return false };
        if token.as_literal().is_some() {
            return true;
        }
        match self.current_lexeme() {
            Some("*" | "@" | "." | ".." | "$" | "(") => true,
            Some(l) => is_name_lexeme(l) || l.ends_with(":*") || l.starts_with("*:") || l.starts_with("Q{"),
            None => false,
        }
    }

    /// The `//` abbreviation: `descendant-or-self::node()`.
    fn descendant_or_self_step(&mut self) {
        self.ops.leaf(OpCode::Step, &[Axis::DescendantOrSelf.code(), NodeTestCode::Node.code(), NO_OPERAND]);
    }

    /// ```text
    /// StepExpr ::= PostfixExpr | AxisStep
    /// ```
    pub(super) fn step_expr(&mut self) -> CResult<StepKind> {
        self.nested(|s| {
            if s.starts_filter() {
                s.filter_expr()?;
                Ok(StepKind::Filter)
            } else {
                s.axis_step()?;
                Ok(StepKind::Axis)
            }
        })
    }

    /// True if the current token begins a primary expression rather than an axis step.
    fn starts_filter(&self) -> bool {
        let Some(token) = self.current() else { return false };
        if token.as_literal().is_some() {
            return true;
        }
        let Some(lexeme) = token.as_lexeme() else { return false };
        match self.cursor.current_char() {
            Some('$' | '(' | '[') => return true,
            Some('.') => return lexeme == ".",
            _ => {}
        }
        if !is_name_lexeme(lexeme) {
            return false;
        }
        if self.peek_is(1, "(") {
            return lookup_node_type(lexeme).is_none();
        }
        if self.peek_is(1, "{") {
            return matches!(lexeme, "map" | "array");
        }
        self.peek_is(1, "#") && self.named_ref_arity(2).is_some()
    }

    /// Arity of a named function reference when the token at `n` is a non-negative integer.
    pub(super) fn named_ref_arity(&self, n: usize) -> Option<usize> {
        match self.cursor.peek(n)?.as_literal()? {
            Literal::Integer(i) => usize::try_from(*i).ok(),
            _ => None,
        }
    }

    /// ```text
    /// AxisStep ::= (ForwardAxis | ReverseAxis | "@" | "..")? NodeTest Predicate*
    /// ```
    fn axis_step(&mut self) -> CResult<()> {
        if self.eat("..") {
            let pos = self.ops.open(OpCode::Step, &[Axis::Parent.code(), NodeTestCode::Node.code(), NO_OPERAND]);
            self.predicates()?;
            self.ops.close(pos);
            return Ok(());
        }
        let axis = self.axis(&[])?;
        let (test, arg) = self.node_test(axis)?;
        let pos = self.ops.open(OpCode::Step, &[axis.code(), test.code(), arg]);
        self.predicates()?;
        self.ops.close(pos);
        Ok(())
    }

    /// Consume an explicit or abbreviated axis. With a non-empty `allowed`
    /// list, any other axis is rejected.
    pub(super) fn axis(&mut self, allowed: &[Axis]) -> CResult<Axis> {
        let axis = if self.eat("@") {
            Axis::Attribute
        } else if self.peek_is(1, "::") {
            let name = self.current_lexeme().unwrap_or_default();
            let at = self.at();
            let axis = lookup_axis(name)
                .filter(|a| allowed.is_empty() || allowed.contains(a))
                .ok_or_else(|| CompileError::IllegalAxisName { name: name.to_string(), at })?;
            self.cursor.advance();
            self.cursor.advance();
            axis
        } else if matches!(self.current_lexeme(), Some("attribute" | "schema-attribute")) && self.peek_is(1, "(") {
            Axis::Attribute
        } else {
            Axis::Child
        };
        Ok(axis)
    }

    /// Parse a node test, returning its code and object operand.
    pub(super) fn node_test(&mut self, axis: Axis) -> CResult<(NodeTestCode, i32)> {
        let Some(lexeme) = self.current_lexeme() else {
            return Err(self.unexpected("a node test"));
        };
        if lexeme == "*" {
            self.cursor.advance();
            return Ok((NodeTestCode::Wildcard, NO_OPERAND));
        }
        if let Some(prefix) = lexeme.strip_suffix(":*") {
            let uri = CompactString::from(&*self.resolve_prefix(prefix)?);
            self.cursor.advance();
            let obj = self.ops.push_object(OpObject::Text(uri));
            return Ok((NodeTestCode::NamespaceWildcard, obj));
        }
        if let Some(braced) = lexeme.strip_prefix("Q{").and_then(|rest| rest.strip_suffix("}*")) {
            self.cursor.advance();
            let obj = self.ops.push_object(OpObject::Text(CompactString::from(braced)));
            return Ok((NodeTestCode::NamespaceWildcard, obj));
        }
        if let Some(local) = lexeme.strip_prefix("*:") {
            self.cursor.advance();
            let obj = self.ops.push_object(OpObject::Text(CompactString::from(local)));
            return Ok((NodeTestCode::LocalWildcard, obj));
        }
        if self.peek_is(1, "(") && lookup_node_type(lexeme).is_some() {
            let kind = self.item_type()?;
            return Ok(self.kind_test_operands(kind));
        }
        if LexicalName::parse(lexeme).is_none() {
            return Err(self.unexpected("a node test"));
        }
        let default_ns = if axis.principal_is_element() { self.options().default_element_namespace.as_ref() } else { None };
        let name = self.resolve_name(lexeme, default_ns)?;
        self.cursor.advance();
        let obj = self.ops.push_object(OpObject::Name(name));
        Ok((NodeTestCode::Name, obj))
    }

    fn kind_test_operands(&mut self, kind: ItemType) -> (NodeTestCode, i32) {
        match kind {
            ItemType::AnyNode => (NodeTestCode::Node, NO_OPERAND),
            ItemType::Text => (NodeTestCode::Text, NO_OPERAND),
            ItemType::Comment => (NodeTestCode::Comment, NO_OPERAND),
            ItemType::ProcessingInstruction(None) => (NodeTestCode::ProcessingInstruction, NO_OPERAND),
            ItemType::ProcessingInstruction(Some(target)) => {
                let obj = self.ops.push_object(OpObject::Text(CompactString::from(target)));
                (NodeTestCode::ProcessingInstruction, obj)
            }
            other => {
                let obj = self.ops.push_object(OpObject::ItemType(other));
                (NodeTestCode::Kind, obj)
            }
        }
    }

    /// ```text
    /// Predicate ::= "[" Expr "]"
    /// ```
    pub(super) fn predicates(&mut self) -> CResult<()> {
        while self.is("[") {
            let pos = self.ops.open(OpCode::Predicate, &[]);
            self.cursor.advance();
            self.nested(Self::expr)?;
            self.expect("]")?;
            self.ops.close(pos);
        }
        Ok(())
    }
}
