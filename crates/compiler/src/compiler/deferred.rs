//! Constructs compiled as [`Composite`] records.
//!
//! Each production here scans ahead to find the token ranges of its parts,
//! checks that every part is bracket-balanced and records the ranges for a
//! later compile. Parenthesized sequences and the binding expressions are
//! speculative: if the scan does not produce acceptable parts the session is
//! rolled back and the input is compiled by the ordinary productions.

use smallvec::SmallVec;
use std::ops::Range;

use super::seqtype::TypeContext;
use super::{CResult, ParseSession};
use crate::brackets::{bracket_char, tokens_balanced};
use crate::composite::{ArrayKind, Binding, Bindings, Composite, Deferred, Items, MapEntry, Param, QuantifierKind};
use crate::consts::XS_NS;
use crate::error::CompileError;
use crate::functions::{FunctionNamespace, FunctionTable};
use crate::opmap::OpCode;

impl ParseSession<'_, '_> {
    /// Index of the bracket closing the one at `open`, within the cursor window.
    pub(super) fn matching_close(&self, open: usize) -> Option<usize> {
        let queue = self.cursor.queue();
        let mut expected: SmallVec<[char; 8]> = SmallVec::new();
        for i in open..self.cursor.end() {
            let Some(bracket) = queue.get(i).and_then(bracket_char) else { continue };
            match bracket {
                '(' => expected.push(')'),
                '[' => expected.push(']'),
                '{' => expected.push('}'),
                close => {
                    if expected.pop() != Some(close) {
                        return None;
                    }
                    if expected.is_empty() {
                        return Some(i);
                    }
                }
            }
        }
        None
    }

    /// Split `from..to` at `sep` tokens outside any brackets.
    ///
    /// A `sep` inside the binding list of a `for`, `let`, `some` or `every`
    /// belongs to that expression and does not split.
    pub(super) fn split_top_level(&self, from: usize, to: usize, sep: &str) -> Vec<Range<usize>> {
        let queue = self.cursor.queue();
        let next_is = |i: usize, s: &str| i + 1 < to && queue.get(i + 1).is_some_and(|t| t.is(s));
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut binders = 0usize;
        let mut after_name_marker = false;
        let mut start = from;
        for i in from..to {
            let Some(token) = queue.get(i) else { break };
            let is_name = after_name_marker;
            after_name_marker = matches!(token.as_lexeme(), Some("$" | "/" | "//" | "::" | "@"));
            match bracket_char(token) {
                Some('(' | '[' | '{') => depth += 1,
                Some(_) => depth = depth.saturating_sub(1),
                None if depth > 0 || is_name => {}
                None => match token.as_lexeme().unwrap_or_default() {
                    "for" | "let" | "some" | "every" if next_is(i, "$") => binders += 1,
                    "return" | "satisfies" if binders > 0 => binders -= 1,
                    lexeme if binders == 0 && lexeme == sep => {
                        parts.push(start..i);
                        start = i + 1;
                    }
                    _ => {}
                },
            }
        }
        parts.push(start..to);
        parts
    }

    fn token_is(&self, index: usize, s: &str) -> bool {
        index < self.cursor.end() && self.cursor.queue().get(index).is_some_and(|t| t.is(s))
    }

    /// A part is acceptable when it is non-empty and balanced.
    fn accept(&self, range: Range<usize>) -> Option<Deferred> {
        let tokens = self.cursor.queue().tokens().get(range.clone())?;
        (!tokens.is_empty() && tokens_balanced(tokens)).then(|| self.deferred(range))
    }

    /// Comma-separated parts strictly between `open` and `close`. An empty
    /// interior yields no parts; an empty part rejects the whole list.
    fn items(&self, open: usize, close: usize) -> Option<Items> {
        if open + 1 == close {
            return Some(Items::new());
        }
        self.split_top_level(open + 1, close, ",").into_iter().map(|r| self.accept(r)).collect()
    }

    fn unbalanced(&self) -> CompileError {
        self.unexpected("a matching closing bracket")
    }

    /// Parts of the bracketed list at the cursor; moves past the closing bracket.
    fn bracketed_items(&mut self, what: &str) -> CResult<Items> {
        let open = self.cursor.pos();
        let Some(close) = self.matching_close(open) else { return Err(self.unbalanced()) };
        let Some(items) = self.items(open, close) else { return Err(self.unexpected(what)) };
        self.cursor.skip_to(close + 1);
        Ok(items)
    }

    /// ```text
    /// ParenthesizedExpr ::= "(" Expr? ")"
    /// ```
    ///
    /// `()` is the empty sequence and more than one top-level item makes a
    /// sequence constructor. A `to` two or three tokens in marks a range,
    /// which is always compiled as a group.
    pub(super) fn parenthesized(&mut self) -> CResult<()> {
        if self.peek_is(1, ")") {
            self.cursor.advance();
            self.cursor.advance();
            self.emit_empty_sequence();
            return Ok(());
        }
        let ranged = self.peek_is(2, "to") || self.peek_is(3, "to");
        if !ranged && self.speculate("sequence constructor", Self::sequence_constructor)?.is_some() {
            return Ok(());
        }
        self.group()
    }

    fn sequence_constructor(&mut self) -> CResult<Option<()>> {
        let open = self.cursor.pos();
        let Some(close) = self.matching_close(open) else { return Ok(None) };
        let parts = self.split_top_level(open + 1, close, ",");
        if parts.len() < 2 {
            return Ok(None);
        }
        let Some(items) = parts.into_iter().map(|r| self.accept(r)).collect::<Option<Items>>() else {
            return Ok(None);
        };
        self.cursor.skip_to(close + 1);
        self.emit_composite(Composite::Sequence { items });
        Ok(Some(()))
    }

    fn group(&mut self) -> CResult<()> {
        let pos = self.ops.open(OpCode::Group, &[]);
        self.expect("(")?;
        self.expr()?;
        self.expect(")")?;
        self.ops.close(pos);
        Ok(())
    }

    /// ```text
    /// SquareArrayConstructor ::= "[" (ExprSingle ("," ExprSingle)*)? "]"
    /// ```
    pub(super) fn square_array(&mut self) -> CResult<()> {
        self.require_v31("'['")?;
        let members = self.bracketed_items("an array member")?;
        self.emit_composite(Composite::Array { kind: ArrayKind::Square, members });
        Ok(())
    }

    /// ```text
    /// CurlyArrayConstructor ::= "array" "{" Expr? "}"
    /// ```
    pub(super) fn curly_array(&mut self) -> CResult<()> {
        self.require_v31("'array {'")?;
        self.cursor.advance();
        let open = self.cursor.pos();
        let Some(close) = self.matching_close(open) else { return Err(self.unbalanced()) };
        let mut members = Items::new();
        if close > open + 1 {
            let Some(content) = self.accept(open + 1..close) else { return Err(self.unexpected("an expression")) };
            members.push(content);
        }
        self.cursor.skip_to(close + 1);
        self.emit_composite(Composite::Array { kind: ArrayKind::Curly, members });
        Ok(())
    }

    /// ```text
    /// MapConstructor ::= "map" "{" (ExprSingle ":" ExprSingle ("," ExprSingle ":" ExprSingle)*)? "}"
    /// ```
    ///
    /// Keys end at the first `:` outside brackets, so nested maps and arrays
    /// in values are skipped as a whole.
    pub(super) fn map_constructor(&mut self) -> CResult<()> {
        self.require_v31("'map {'")?;
        self.cursor.advance();
        let open = self.cursor.pos();
        let Some(close) = self.matching_close(open) else { return Err(self.unbalanced()) };
        let mut entries = Vec::new();
        if close > open + 1 {
            for part in self.split_top_level(open + 1, close, ",") {
                let Some(entry) = self.map_entry(part.clone()) else {
                    return Err(CompileError::UnexpectedToken {
                        expected: "a map entry 'key: value'".to_string(),
                        found: format!("'{}'", self.cursor.queue().text(part.clone())),
                        at: self.location_of(part.start),
                    });
                };
                entries.push(entry);
            }
        }
        self.cursor.skip_to(close + 1);
        self.emit_composite(Composite::Map { entries });
        Ok(())
    }

    fn map_entry(&self, part: Range<usize>) -> Option<MapEntry> {
        let key_end = self.split_top_level(part.start, part.end, ":").first()?.end;
        if key_end >= part.end {
            return None;
        }
        Some(MapEntry { key: self.accept(part.start..key_end)?, value: self.accept(key_end + 1..part.end)? })
    }

    /// ```text
    /// DynamicFunctionCall ::= VarRef ArgumentList
    /// ```
    pub(super) fn dynamic_call(&mut self) -> CResult<()> {
        self.require_v31("a dynamic function call")?;
        let variable = self.variable_name()?;
        let args = self.bracketed_items("an argument")?;
        self.emit_composite(Composite::DynamicCall { variable, args });
        Ok(())
    }

    /// ```text
    /// NamedFunctionRef ::= EQName "#" IntegerLiteral
    /// ```
    pub(super) fn named_function_ref(&mut self) -> CResult<()> {
        self.require_v31("a named function reference")?;
        let at = self.at();
        let name = self.function_name(self.current_lexeme().unwrap_or_default())?;
        self.cursor.advance();
        self.expect("#")?;
        let Some(arity) = self.named_ref_arity(0) else {
            return Err(self.unexpected("a non-negative arity"));
        };
        self.cursor.advance();

        let function = self.functions().function_id(&name.local, name.ns_uri());
        let known_ns = name.ns_uri().and_then(FunctionNamespace::from_uri).is_some();
        let resolvable = match function {
            Some(id) => FunctionTable::arity_of(id).is_none_or(|a| a.accepts(arity)),
            None if name.is_in(XS_NS) => arity == 1,
            None => !known_ns,
        };
        if !resolvable {
            return Err(CompileError::UnknownFunction { name: name.to_string(), arity, at });
        }
        self.emit_composite(Composite::NamedFunctionRef { name, arity, function });
        Ok(())
    }

    /// ```text
    /// InlineFunctionExpr ::= "function" "(" ParamList? ")" ("as" SequenceType)? "{" Expr? "}"
    /// ```
    pub(super) fn inline_function(&mut self) -> CResult<()> {
        self.require_v31("an inline function")?;
        self.cursor.advance();
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.is(")") {
            loop {
                let name = self.variable_name()?;
                let declared_type =
                    if self.eat("as") { Some(self.sequence_type(TypeContext::InlineParam)?) } else { None };
                params.push(Param { name, declared_type });
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        let return_type = if self.eat("as") { Some(self.sequence_type(TypeContext::General)?) } else { None };
        if !self.is("{") {
            return Err(self.unexpected("'{'"));
        }
        let open = self.cursor.pos();
        let Some(close) = self.matching_close(open) else { return Err(self.unbalanced()) };
        let body = self.deferred(open + 1..close);
        self.cursor.skip_to(close + 1);
        self.emit_composite(Composite::InlineFunction { params, return_type, body });
        Ok(())
    }

    /// Find where the part starting at `from` ends.
    ///
    /// Scanning stops at a token from `stops`, at a closing bracket or a
    /// `then`/`else`/`return`/`satisfies` that belongs to no enclosing
    /// construct inside the part, or at the end of the window. Binding and
    /// conditional expressions nested in the part are skipped along with
    /// their own keywords and commas.
    fn scan_boundary(&self, from: usize, stops: &[&str]) -> usize {
        let queue = self.cursor.queue();
        let end = self.cursor.end();
        let next_is = |i: usize, s: &str| i + 1 < end && queue.get(i + 1).is_some_and(|t| t.is(s));
        let mut depth = 0usize;
        let mut binders = 0usize;
        let mut conditionals = 0usize;
        let mut after_name_marker = false;
        for i in from..end {
            let Some(token) = queue.get(i) else { return end };
            // a keyword spelling right after `$`, `/`, `::` or `@` is a name
            let is_name = after_name_marker;
            after_name_marker = matches!(token.as_lexeme(), Some("$" | "/" | "//" | "::" | "@"));
            match bracket_char(token) {
                Some('(' | '[' | '{') => depth += 1,
                Some(_) if depth == 0 => return i,
                Some(_) => depth -= 1,
                None if depth > 0 || is_name => {}
                None => match token.as_lexeme().unwrap_or_default() {
                    "for" | "let" | "some" | "every" if next_is(i, "$") => binders += 1,
                    "if" if next_is(i, "(") => conditionals += 1,
                    "return" | "satisfies" if binders > 0 => binders -= 1,
                    "then" if conditionals > 0 => {}
                    "else" if conditionals > 0 => conditionals -= 1,
                    "return" | "satisfies" | "then" | "else" => return i,
                    lexeme if binders == 0 && conditionals == 0 && stops.contains(&lexeme) => return i,
                    _ => {}
                },
            }
        }
        end
    }

    /// An `ExprSingle` body running to the next boundary.
    fn body(&mut self) -> Option<Deferred> {
        let start = self.cursor.pos();
        let stop = self.scan_boundary(start, &[","]);
        let body = self.accept(start..stop)?;
        self.cursor.skip_to(stop);
        Some(body)
    }

    /// `$name <sep> source ("," $name <sep> source)* <terminator>`
    fn bindings(&mut self, sep: &str, terminator: &str) -> CResult<Option<Bindings>> {
        let mut bindings = Bindings::new();
        loop {
            if !self.is("$") {
                return Ok(None);
            }
            let variable = self.variable_name()?;
            if !self.eat(sep) {
                return Ok(None);
            }
            let start = self.cursor.pos();
            let stop = self.scan_boundary(start, &[",", terminator]);
            if !(self.token_is(stop, ",") || self.token_is(stop, terminator)) {
                return Ok(None);
            }
            let Some(source) = self.accept(start..stop) else { return Ok(None) };
            bindings.push(Binding { variable, source });
            self.cursor.skip_to(stop);
            if !self.eat(",") {
                self.cursor.advance();
                return Ok(Some(bindings));
            }
        }
    }

    fn binding_expr(
        &mut self,
        production: &'static str,
        scan: impl FnOnce(&mut Self) -> CResult<Option<Composite>>,
    ) -> CResult<bool> {
        match self.speculate(production, scan)? {
            Some(composite) => {
                self.emit_composite(composite);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// ```text
    /// ForExpr ::= "for" "$" VarName "in" ExprSingle ("," "$" VarName "in" ExprSingle)* "return" ExprSingle
    /// ```
    pub(super) fn for_expr(&mut self) -> CResult<bool> {
        self.binding_expr("for expression", |s| {
            s.cursor.advance();
            let Some(bindings) = s.bindings("in", "return")? else { return Ok(None) };
            Ok(s.body().map(|body| Composite::For { bindings, body }))
        })
    }

    /// ```text
    /// LetExpr ::= "let" "$" VarName ":=" ExprSingle ("," "$" VarName ":=" ExprSingle)* "return" ExprSingle
    /// ```
    pub(super) fn let_expr(&mut self) -> CResult<bool> {
        self.binding_expr("let expression", |s| {
            s.cursor.advance();
            let Some(bindings) = s.bindings(":=", "return")? else { return Ok(None) };
            Ok(s.body().map(|body| Composite::Let { bindings, body }))
        })
    }

    pub(super) fn quantified_expr(&mut self) -> CResult<bool> {
        let kind = if self.is("every") { QuantifierKind::Every } else { QuantifierKind::Some };
        self.binding_expr("quantified expression", |s| {
            s.cursor.advance();
            let Some(bindings) = s.bindings("in", "satisfies")? else { return Ok(None) };
            Ok(s.body().map(|satisfies| Composite::Quantified { kind, bindings, satisfies }))
        })
    }

    /// ```text
    /// IfExpr ::= "if" "(" Expr ")" "then" ExprSingle "else" ExprSingle
    /// ```
    pub(super) fn if_expr(&mut self) -> CResult<bool> {
        self.binding_expr("if expression", |s| {
            s.cursor.advance();
            let open = s.cursor.pos();
            let Some(close) = s.matching_close(open) else { return Ok(None) };
            let Some(condition) = s.accept(open + 1..close) else { return Ok(None) };
            s.cursor.skip_to(close + 1);
            if !s.eat("then") {
                return Ok(None);
            }
            let start = s.cursor.pos();
            let stop = s.scan_boundary(start, &[",", "else"]);
            if !s.token_is(stop, "else") {
                return Ok(None);
            }
            let Some(then_branch) = s.accept(start..stop) else { return Ok(None) };
            s.cursor.skip_to(stop + 1);
            Ok(s.body().map(|else_branch| Composite::If { condition, then_branch, else_branch }))
        })
    }
}
