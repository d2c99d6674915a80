//! Descriptors for sub-expressions whose compilation is deferred.
//!
//! The compiler finds where these constructs start and end, records the
//! token ranges of their parts and leaves each part to a separate compile
//! over the same token queue.

use core::fmt;
use smallvec::SmallVec;
use std::ops::Range;

use crate::functions::FunctionId;
use crate::names::ExpandedName;
use crate::opmap::OpCode;
use crate::seqtype::SequenceType;

/// A token range awaiting its own compile, with the source text it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub tokens: Range<usize>,
    pub text: String,
}

impl Deferred {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.text)
    }
}

/// `$name in expr` or `$name := expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub variable: ExpandedName,
    pub source: Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// `[a, b]`: one member per comma-separated item.
    Square,
    /// `array { expr }`: one member per item of the enclosed sequence.
    Curly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Some,
    Every,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub key: Deferred,
    pub value: Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: ExpandedName,
    pub declared_type: Option<SequenceType>,
}

pub type Items = SmallVec<[Deferred; 4]>;
pub type Bindings = SmallVec<[Binding; 2]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composite {
    Sequence { items: Items },
    Array { kind: ArrayKind, members: Items },
    Map { entries: Vec<MapEntry> },
    DynamicCall { variable: ExpandedName, args: Items },
    NamedFunctionRef { name: ExpandedName, arity: usize, function: Option<FunctionId> },
    InlineFunction { params: Vec<Param>, return_type: Option<SequenceType>, body: Deferred },
    For { bindings: Bindings, body: Deferred },
    Let { bindings: Bindings, body: Deferred },
    Quantified { kind: QuantifierKind, bindings: Bindings, satisfies: Deferred },
    If { condition: Deferred, then_branch: Deferred, else_branch: Deferred },
}

impl Composite {
    pub fn opcode(&self) -> OpCode {
        match self {
            Composite::Sequence { .. } => OpCode::SequenceConstructor,
            Composite::Array { .. } => OpCode::ArrayConstructor,
            Composite::Map { .. } => OpCode::MapConstructor,
            Composite::DynamicCall { .. } => OpCode::DynamicCall,
            Composite::NamedFunctionRef { .. } => OpCode::NamedFunctionRef,
            Composite::InlineFunction { .. } => OpCode::InlineFunction,
            Composite::For { .. } => OpCode::ForExpr,
            Composite::Let { .. } => OpCode::LetExpr,
            Composite::Quantified { .. } => OpCode::QuantifiedExpr,
            Composite::If { .. } => OpCode::IfExpr,
        }
    }

    /// Every deferred range in source order.
    pub fn deferred(&self) -> Vec<&Deferred> {
        match self {
            Composite::Sequence { items } | Composite::Array { members: items, .. } => items.iter().collect(),
            Composite::DynamicCall { args, .. } => args.iter().collect(),
            Composite::Map { entries } => entries.iter().flat_map(|e| [&e.key, &e.value]).collect(),
            Composite::NamedFunctionRef { .. } => Vec::new(),
            Composite::InlineFunction { body, .. } => vec![body],
            Composite::For { bindings, body } | Composite::Let { bindings, body } => {
                bindings.iter().map(|b| &b.source).chain([body]).collect()
            }
            Composite::Quantified { bindings, satisfies, .. } => {
                bindings.iter().map(|b| &b.source).chain([satisfies]).collect()
            }
            Composite::If { condition, then_branch, else_branch } => vec![condition, then_branch, else_branch],
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: impl IntoIterator<Item = T>) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt(f)?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter<'_>, bindings: &Bindings, sep: &str) -> fmt::Result {
    for (i, b) in bindings.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "${} {sep} {}", b.variable, b.source)?;
    }
    Ok(())
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Composite::Sequence { items } => {
                f.write_str("sequence(")?;
                join(f, items)?;
                f.write_str(")")
            }
            Composite::Array { kind: ArrayKind::Square, members } => {
                f.write_str("array[")?;
                join(f, members)?;
                f.write_str("]")
            }
            Composite::Array { kind: ArrayKind::Curly, members } => {
                f.write_str("array{")?;
                join(f, members)?;
                f.write_str("}")
            }
            Composite::Map { entries } => {
                f.write_str("map{")?;
                join(f, entries.iter().map(|e| format!("{}: {}", e.key, e.value)))?;
                f.write_str("}")
            }
            Composite::DynamicCall { variable, args } => {
                write!(f, "${variable}(")?;
                join(f, args)?;
                f.write_str(")")
            }
            Composite::NamedFunctionRef { name, arity, function } => match function {
                Some(id) => write!(f, "{name}#{arity} ({id})"),
                None => write!(f, "{name}#{arity}"),
            },
            Composite::InlineFunction { params, return_type, body } => {
                f.write_str("function(")?;
                join(
                    f,
                    params.iter().map(|p| match &p.declared_type {
                        Some(t) => format!("${} as {t}", p.name),
                        None => format!("${}", p.name),
                    }),
                )?;
                f.write_str(")")?;
                if let Some(t) = return_type {
                    write!(f, " as {t}")?;
                }
                write!(f, " {body}")
            }
            Composite::For { bindings, body } => {
                f.write_str("for ")?;
                write_bindings(f, bindings, "in")?;
                write!(f, " return {body}")
            }
            Composite::Let { bindings, body } => {
                f.write_str("let ")?;
                write_bindings(f, bindings, ":=")?;
                write!(f, " return {body}")
            }
            Composite::Quantified { kind, bindings, satisfies } => {
                f.write_str(if *kind == QuantifierKind::Some { "some " } else { "every " })?;
                write_bindings(f, bindings, "in")?;
                write!(f, " satisfies {satisfies}")
            }
            Composite::If { condition, then_branch, else_branch } => {
                write!(f, "if ({condition}) then {then_branch} else {else_branch}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn d(tokens: Range<usize>, text: &str) -> Deferred {
        Deferred { tokens, text: text.to_string() }
    }

    #[test]
    fn for_lists_bindings_before_body() {
        let c = Composite::For {
            bindings: smallvec![Binding { variable: ExpandedName::local("x"), source: d(4..9, "(1,2)") }],
            body: d(10..13, "$x * 2"),
        };
        let texts: Vec<_> = c.deferred().iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["(1,2)", "$x * 2"]);
        assert_eq!(c.to_string(), "for $x in {(1,2)} return {$x * 2}");
        assert_eq!(c.opcode(), OpCode::ForExpr);
    }
}
