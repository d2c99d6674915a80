//! Expression layers from `Expr` down to the union operators.

use super::seqtype::TypeContext;
use super::{CResult, ParseSession};
use crate::opmap::{OpCode, OpObject};

fn equality_op(lexeme: &str) -> Option<OpCode> {
    Some(match lexeme {
        "=" => OpCode::Equals,
        "!=" => OpCode::NotEquals,
        "eq" => OpCode::ValueEq,
        "ne" => OpCode::ValueNe,
        "!" => OpCode::SimpleMap,
        _ => return None,
    })
}

fn relational_op(lexeme: &str) -> Option<OpCode> {
    Some(match lexeme {
        "<" => OpCode::Lt,
        ">" => OpCode::Gt,
        "<=" => OpCode::Lte,
        ">=" => OpCode::Gte,
        "lt" => OpCode::ValueLt,
        "gt" => OpCode::ValueGt,
        "le" => OpCode::ValueLe,
        "ge" => OpCode::ValueGe,
        "is" => OpCode::NodeIs,
        "<<" => OpCode::NodePrecedes,
        ">>" => OpCode::NodeFollows,
        "to" => OpCode::Range,
        "||" => OpCode::StringConcat,
        "=>" => OpCode::Arrow,
        _ => return None,
    })
}

fn additive_op(lexeme: &str) -> Option<OpCode> {
    match lexeme {
        "+" => Some(OpCode::Plus),
        "-" => Some(OpCode::Minus),
        _ => None,
    }
}

fn multiplicative_op(lexeme: &str) -> Option<OpCode> {
    Some(match lexeme {
        "*" => OpCode::Mult,
        "div" => OpCode::Div,
        "idiv" => OpCode::IDiv,
        "mod" => OpCode::Mod,
        "quo" => OpCode::Quo,
        _ => return None,
    })
}

fn union_op(lexeme: &str) -> Option<OpCode> {
    matches!(lexeme, "|" | "union").then_some(OpCode::Union)
}

fn intersect_op(lexeme: &str) -> Option<OpCode> {
    match lexeme {
        "intersect" => Some(OpCode::Intersect),
        "except" => Some(OpCode::Except),
        _ => None,
    }
}

/// Operators introduced after XPath 2.0.
fn needs_v31(op: OpCode) -> bool {
    matches!(op, OpCode::SimpleMap | OpCode::StringConcat | OpCode::Arrow)
}

impl ParseSession<'_, '_> {
    /// ```text
    /// Expr ::= ExprSingle ("," ExprSingle)*
    /// ```
    pub(super) fn expr(&mut self) -> CResult<()> {
        let start = self.ops.len();
        self.expr_single()?;
        if self.is(",") {
            self.ops.insert(start, OpCode::ExprList, &[]);
            while self.eat(",") {
                self.expr_single()?;
            }
            self.ops.close(start);
        }
        Ok(())
    }

    /// ```text
    /// ExprSingle ::= ForExpr | LetExpr | QuantifiedExpr | IfExpr | OrExpr
    /// ```
    ///
    /// A binding or conditional form whose boundaries cannot be found is
    /// compiled as an `OrExpr` instead, which then reports the error.
    pub(super) fn expr_single(&mut self) -> CResult<()> {
        self.nested(|s| {
            if s.peek_is(1, "$") {
                let handled = match s.current_lexeme() {
                    Some("for") => s.for_expr()?,
                    Some("let") => {
                        s.require_v31("'let'")?;
                        s.let_expr()?
                    }
                    Some("some" | "every") => s.quantified_expr()?,
                    _ => false,
                };
                if handled {
                    return Ok(());
                }
            }
            if s.is("if") && s.peek_is(1, "(") && s.if_expr()? {
                return Ok(());
            }
            s.or_expr()
        })
    }

    /// Parse `operand (op operand)*` for one precedence layer.
    ///
    /// Each operator is inserted in front of everything compiled since
    /// `start`, so chains of one layer associate to the left.
    fn binary_layer(
        &mut self,
        operand: fn(&mut Self) -> CResult<()>,
        operator: fn(&str) -> Option<OpCode>,
    ) -> CResult<()> {
        let start = self.ops.len();
        operand(self)?;
        while let Some(op) = self.current_lexeme().and_then(operator) {
            if needs_v31(op) {
                self.require_v31(&self.describe_current())?;
            }
            self.cursor.advance();
            self.ops.insert(start, op, &[]);
            operand(self)?;
            self.ops.close(start);
        }
        Ok(())
    }

    fn or_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::and_expr, |l| (l == "or").then_some(OpCode::Or))
    }

    fn and_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::equality_expr, |l| (l == "and").then_some(OpCode::And))
    }

    fn equality_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::relational_expr, equality_op)
    }

    /// Comparisons, ranges, string concatenation, arrows and the type operators.
    fn relational_expr(&mut self) -> CResult<()> {
        let start = self.ops.len();
        self.additive_expr()?;
        loop {
            if let Some((op, context)) = self.type_operator() {
                self.cursor.advance();
                self.cursor.advance();
                let declared = self.sequence_type(context)?;
                let obj = self.ops.push_object(OpObject::SequenceType(declared));
                self.ops.insert(start, op, &[obj]);
                self.ops.close(start);
                continue;
            }
            let Some(op) = self.current_lexeme().and_then(relational_op) else { break };
            if needs_v31(op) {
                self.require_v31(&self.describe_current())?;
            }
            self.cursor.advance();
            self.ops.insert(start, op, &[]);
            if op == OpCode::Arrow {
                self.arrow_target()?;
            } else {
                self.additive_expr()?;
            }
            self.ops.close(start);
        }
        Ok(())
    }

    fn type_operator(&self) -> Option<(OpCode, TypeContext)> {
        let second = self.peek_lexeme(1)?;
        match (self.current_lexeme()?, second) {
            ("instance", "of") => Some((OpCode::InstanceOf, TypeContext::General)),
            ("treat", "as") => Some((OpCode::TreatAs, TypeContext::General)),
            ("cast", "as") => Some((OpCode::CastAs, TypeContext::SingleType)),
            ("castable", "as") => Some((OpCode::CastableAs, TypeContext::SingleType)),
            _ => None,
        }
    }

    fn additive_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::multiplicative_expr, additive_op)
    }

    fn multiplicative_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::unary_expr, multiplicative_op)
    }

    /// Leading signs. `-` opens a `Neg` record, `+` is dropped.
    fn unary_expr(&mut self) -> CResult<()> {
        let mut negations = Vec::new();
        loop {
            if self.eat("-") {
                negations.push(self.ops.open(OpCode::Neg, &[]));
            } else if !self.eat("+") {
                break;
            }
        }
        self.union_expr()?;
        for pos in negations.into_iter().rev() {
            self.ops.close(pos);
        }
        Ok(())
    }

    fn union_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::intersect_except_expr, union_op)
    }

    fn intersect_except_expr(&mut self) -> CResult<()> {
        self.binary_layer(Self::path_expr, intersect_op)
    }
}
