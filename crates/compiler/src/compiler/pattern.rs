//! XSLT match patterns.
//!
//! A pattern is a union of path patterns. Each path pattern is a chain of
//! child or attribute steps joined by `/` or `//`, optionally anchored at the
//! root or at an `id()`/`key()` call. Predicates use the full select grammar.

use super::{CResult, ParseSession};
use crate::error::CompileError;
use crate::keywords::Axis;
use crate::opmap::{OpCode, PatternConnector};

impl ParseSession<'_, '_> {
    /// ```text
    /// Pattern ::= PathPattern (("|" | "union") PathPattern)*
    /// ```
    pub(super) fn pattern_root(&mut self) -> CResult<()> {
        let root = self.ops.open(OpCode::MatchPattern, &[]);
        if self.cursor.at_end() {
            return Err(self.unexpected("a pattern"));
        }
        loop {
            self.path_pattern()?;
            if !(self.eat("|") || self.eat("union")) {
                break;
            }
        }
        if !self.cursor.at_end() {
            return Err(CompileError::TrailingTokens { found: self.describe_current(), at: self.at() });
        }
        self.ops.close(root);
        Ok(())
    }

    /// ```text
    /// PathPattern ::= "/" RelativePathPattern?
    ///               | "//" RelativePathPattern
    ///               | IdKeyPattern (("/" | "//") RelativePathPattern)?
    ///               | RelativePathPattern
    /// ```
    fn path_pattern(&mut self) -> CResult<()> {
        let pos = self.ops.open(OpCode::LocationPathPattern, &[]);
        let connector = if self.eat("/") {
            self.ops.leaf(OpCode::Root, &[]);
            if self.cursor.at_end() || self.is("|") {
                self.ops.close(pos);
                return Ok(());
            }
            PatternConnector::Parent
        } else if self.eat("//") {
            self.ops.leaf(OpCode::Root, &[]);
            PatternConnector::Ancestor
        } else if matches!(self.current_lexeme(), Some("id" | "key")) && self.peek_is(1, "(") {
            self.function_call(0)?;
            match self.step_connector() {
                Some(connector) => connector,
                None => {
                    self.ops.close(pos);
                    return Ok(());
                }
            }
        } else {
            PatternConnector::Start
        };
        self.step_pattern(connector)?;
        while let Some(connector) = self.step_connector() {
            self.step_pattern(connector)?;
        }
        self.ops.close(pos);
        Ok(())
    }

    fn step_connector(&mut self) -> Option<PatternConnector> {
        if self.eat("/") {
            Some(PatternConnector::Parent)
        } else if self.eat("//") {
            Some(PatternConnector::Ancestor)
        } else {
            None
        }
    }

    /// ```text
    /// StepPattern ::= (("child" | "attribute") "::" | "@")? NodeTest Predicate*
    /// ```
    fn step_pattern(&mut self, connector: PatternConnector) -> CResult<()> {
        self.nested(|s| {
            let axis = s.axis(&[Axis::Child, Axis::Attribute])?;
            let (test, arg) = s.node_test(axis)?;
            let pos = s.ops.open(OpCode::PatternStep, &[axis.code(), connector.code(), test.code(), arg]);
            s.predicates()?;
            s.ops.close(pos);
            Ok(())
        })
    }
}
