//! The flat, prefix-encoded operation buffer.
//!
//! Every record is laid out as `[opcode, length, header…, children…]`, where
//! `length` counts every slot of the record including nested children.
//! Header widths are fixed per opcode and every child is itself a record, so
//! a single walker can check and print any buffer.

use compact_str::CompactString;
use core::fmt;
use core::fmt::Write as _;

use crate::functions::{FunctionId, FunctionTable};
use crate::keywords::{Axis, NodeTestCode};
use crate::names::ExpandedName;
use crate::seqtype::{ItemType, SequenceType};
use crate::tokens::Literal;

/// Written into a length slot until the record is closed.
pub const PLACEHOLDER: i32 = i32::MIN;

/// Header operand value meaning "no object".
pub const NO_OPERAND: i32 = -1;

/// Offset of the first header operand within a record.
pub const HEADER_START: usize = 2;

/// Kinds of header operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Axis,
    Connector,
    NodeTest,
    Object,
    OptionalObject,
    Function,
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Children {
    Exactly(usize),
    AtLeast(usize),
}

macro_rules! opcodes {
    ($($variant:ident = $value:literal,)*) => {
        #[repr(i32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant = $value,)*
        }

        impl OpCode {
            pub fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($value => Some(OpCode::$variant),)*
                    _ => None,
                }
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(OpCode::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

opcodes! {
    XPath = 1,
    MatchPattern = 2,
    LocationPathPattern = 3,
    PatternStep = 4,
    Or = 10,
    And = 11,
    Equals = 12,
    NotEquals = 13,
    ValueEq = 14,
    ValueNe = 15,
    SimpleMap = 16,
    Lt = 17,
    Gt = 18,
    Lte = 19,
    Gte = 20,
    ValueLt = 21,
    ValueGt = 22,
    ValueLe = 23,
    ValueGe = 24,
    Range = 25,
    StringConcat = 26,
    NodeIs = 27,
    NodePrecedes = 28,
    NodeFollows = 29,
    Plus = 30,
    Minus = 31,
    Mult = 32,
    Div = 33,
    IDiv = 34,
    Mod = 35,
    Quo = 36,
    Union = 37,
    Intersect = 38,
    Except = 39,
    Arrow = 40,
    InstanceOf = 50,
    CastAs = 51,
    CastableAs = 52,
    TreatAs = 53,
    Neg = 60,
    Group = 61,
    Literal = 62,
    Variable = 63,
    ContextItem = 64,
    Function = 65,
    ExtFunction = 66,
    Constructor = 67,
    LocationPath = 68,
    Root = 69,
    Step = 70,
    Filter = 71,
    Predicate = 72,
    ExprList = 73,
    SequenceConstructor = 80,
    ArrayConstructor = 81,
    MapConstructor = 82,
    DynamicCall = 83,
    NamedFunctionRef = 84,
    InlineFunction = 85,
    ForExpr = 86,
    LetExpr = 87,
    QuantifiedExpr = 88,
    IfExpr = 89,
}

impl OpCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn header(self) -> &'static [Operand] {
        use Operand as O;
        match self {
            OpCode::PatternStep => &[O::Axis, O::Connector, O::NodeTest, O::OptionalObject],
            OpCode::Step => &[O::Axis, O::NodeTest, O::OptionalObject],
            OpCode::InstanceOf
            | OpCode::CastAs
            | OpCode::CastableAs
            | OpCode::TreatAs
            | OpCode::Literal
            | OpCode::Variable
            | OpCode::ExtFunction
            | OpCode::Constructor => &[O::Object],
            OpCode::Function => &[O::Function],
            op if op.is_composite() => &[O::Composite],
            _ => &[],
        }
    }

    pub fn header_width(self) -> usize {
        self.header().len()
    }

    pub fn is_binary(self) -> bool {
        (OpCode::Or.code()..=OpCode::Arrow.code()).contains(&self.code())
    }

    pub fn is_composite(self) -> bool {
        self.code() >= OpCode::SequenceConstructor.code()
    }

    fn children(self) -> Children {
        use Children::{AtLeast, Exactly};
        match self {
            op if op.is_binary() => Exactly(2),
            op if op.is_composite() => Exactly(0),
            OpCode::XPath
            | OpCode::Neg
            | OpCode::Group
            | OpCode::Predicate
            | OpCode::Constructor
            | OpCode::InstanceOf
            | OpCode::CastAs
            | OpCode::CastableAs
            | OpCode::TreatAs => Exactly(1),
            OpCode::Literal | OpCode::Variable | OpCode::ContextItem | OpCode::Root => Exactly(0),
            OpCode::MatchPattern | OpCode::LocationPathPattern | OpCode::LocationPath | OpCode::Filter => {
                AtLeast(1)
            }
            OpCode::ExprList => AtLeast(2),
            _ => AtLeast(0),
        }
    }
}

/// How a pattern step relates to the step before it.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternConnector {
    /// First step with no leading `/`.
    Start = 0,
    /// Preceded by `/`.
    Parent = 1,
    /// Preceded by `//`.
    Ancestor = 2,
}

impl PatternConnector {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PatternConnector::Start),
            1 => Some(PatternConnector::Parent),
            2 => Some(PatternConnector::Ancestor),
            _ => None,
        }
    }
}

/// Values referenced from header operands by index.
#[derive(Debug, Clone, PartialEq)]
pub enum OpObject {
    Literal(Literal),
    Name(ExpandedName),
    SequenceType(SequenceType),
    ItemType(ItemType),
    Text(CompactString),
}

impl fmt::Display for OpObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpObject::Literal(l) => l.fmt(f),
            OpObject::Name(n) => n.fmt(f),
            OpObject::SequenceType(t) => t.fmt(f),
            OpObject::ItemType(t) => t.fmt(f),
            OpObject::Text(s) => write!(f, "'{s}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("buffer is empty")]
    Empty,
    #[error("unknown opcode {value} at {pos}")]
    UnknownOpcode { pos: usize, value: i32 },
    #[error("record at {pos} is cut off")]
    Truncated { pos: usize },
    #[error("record at {pos} was never closed")]
    Unclosed { pos: usize },
    #[error("record at {pos} has length {length} which does not fit before {limit}")]
    Overhang { pos: usize, length: i32, limit: usize },
    #[error("operand {operand} of record at {pos} is out of range")]
    BadOperand { pos: usize, operand: usize },
    #[error("{op} at {pos} has {found} children")]
    ChildCount { pos: usize, op: &'static str, found: usize },
    #[error("unexpected data after the root record at {pos}")]
    TrailingData { pos: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpMap {
    ops: Vec<i32>,
    objects: Vec<OpObject>,
}

impl OpMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[i32] {
        &self.ops
    }

    pub fn objects(&self) -> &[OpObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append a record with a placeholder length. Returns its position.
    pub fn open(&mut self, op: OpCode, header: &[i32]) -> usize {
        debug_assert_eq!(header.len(), op.header_width());
        let pos = self.ops.len();
        self.ops.push(op.code());
        self.ops.push(PLACEHOLDER);
        self.ops.extend_from_slice(header);
        pos
    }

    /// Open a record at `pos`, shifting the records already written there
    /// so that they become its children.
    pub fn insert(&mut self, pos: usize, op: OpCode, header: &[i32]) -> usize {
        debug_assert_eq!(header.len(), op.header_width());
        let record = [op.code(), PLACEHOLDER].into_iter().chain(header.iter().copied());
        self.ops.splice(pos..pos, record);
        pos
    }

    /// Backpatch the length slot of the record at `pos`.
    pub fn close(&mut self, pos: usize) {
        let length = i32::try_from(self.ops.len() - pos).unwrap_or(i32::MAX);
        self.ops[pos + 1] = length;
    }

    /// Append a record with no children and close it.
    pub fn leaf(&mut self, op: OpCode, header: &[i32]) -> usize {
        let pos = self.open(op, header);
        self.close(pos);
        pos
    }

    pub fn push_object(&mut self, object: OpObject) -> i32 {
        self.objects.push(object);
        i32::try_from(self.objects.len() - 1).unwrap_or(i32::MAX)
    }

    pub fn object(&self, index: i32) -> Option<&OpObject> {
        usize::try_from(index).ok().and_then(|i| self.objects.get(i))
    }

    /// Roll back to an earlier `(ops, objects)` length pair.
    pub fn truncate(&mut self, ops_len: usize, objects_len: usize) {
        self.ops.truncate(ops_len);
        self.objects.truncate(objects_len);
    }

    pub fn objects_len(&self) -> usize {
        self.objects.len()
    }

    pub fn op_at(&self, pos: usize) -> Option<OpCode> {
        self.ops.get(pos).copied().and_then(OpCode::from_i32)
    }

    pub fn length_at(&self, pos: usize) -> Option<usize> {
        self.ops.get(pos + 1).and_then(|l| usize::try_from(*l).ok())
    }

    pub fn header_at(&self, pos: usize) -> &[i32] {
        let width = self.op_at(pos).map_or(0, OpCode::header_width);
        self.ops.get(pos + HEADER_START..pos + HEADER_START + width).unwrap_or(&[])
    }

    /// Positions of the direct children of the record at `pos`.
    pub fn children(&self, pos: usize) -> Vec<usize> {
        let (Some(op), Some(length)) = (self.op_at(pos), self.length_at(pos)) else {
            return Vec::new();
        };
        let end = pos + length;
        let mut cursor = pos + HEADER_START + op.header_width();
        let mut out = Vec::new();
        while cursor < end {
            out.push(cursor);
            match self.length_at(cursor) {
                Some(l) if l > 0 => cursor += l,
                _ => break,
            }
        }
        out
    }

    /// Check that the buffer is a single well-formed record tree.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        if self.ops.is_empty() {
            return Err(IntegrityError::Empty);
        }
        let end = self.verify_record(0, self.ops.len())?;
        if end != self.ops.len() {
            return Err(IntegrityError::TrailingData { pos: end });
        }
        Ok(())
    }

    fn verify_record(&self, pos: usize, limit: usize) -> Result<usize, IntegrityError> {
        let value = self.ops[pos];
        let op = OpCode::from_i32(value).ok_or(IntegrityError::UnknownOpcode { pos, value })?;
        let body = pos + HEADER_START + op.header_width();
        if body > limit {
            return Err(IntegrityError::Truncated { pos });
        }
        let length = self.ops[pos + 1];
        if length == PLACEHOLDER {
            return Err(IntegrityError::Unclosed { pos });
        }
        let end = usize::try_from(length)
            .ok()
            .map(|l| pos + l)
            .filter(|e| *e >= body && *e <= limit)
            .ok_or(IntegrityError::Overhang { pos, length, limit })?;

        for (i, kind) in op.header().iter().enumerate() {
            let v = self.ops[pos + HEADER_START + i];
            let ok = match kind {
                Operand::Axis => Axis::from_code(v).is_some(),
                Operand::Connector => PatternConnector::from_code(v).is_some(),
                Operand::NodeTest => NodeTestCode::from_code(v).is_some(),
                Operand::Object => self.object(v).is_some(),
                Operand::OptionalObject => v == NO_OPERAND || self.object(v).is_some(),
                Operand::Function | Operand::Composite => v >= 0,
            };
            if !ok {
                return Err(IntegrityError::BadOperand { pos, operand: i });
            }
        }

        let mut cursor = body;
        let mut found = 0;
        while cursor < end {
            cursor = self.verify_record(cursor, end)?;
            found += 1;
        }
        let expected = match op.children() {
            Children::Exactly(n) => found == n,
            Children::AtLeast(n) => found >= n,
        };
        if !expected {
            return Err(IntegrityError::ChildCount { pos, op: op.mnemonic(), found });
        }
        Ok(end)
    }

    /// Indented listing of the record tree, one record per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        if !self.ops.is_empty() {
            self.disassemble_record(&mut out, 0, 0);
        }
        out
    }

    /// Opcode tree without operands, e.g. `XPath(Plus(Literal Literal))`.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        if !self.ops.is_empty() {
            self.outline_record(&mut out, 0);
        }
        out
    }

    fn outline_record(&self, out: &mut String, pos: usize) {
        out.push_str(self.op_at(pos).map_or("??", OpCode::mnemonic));
        let children = self.children(pos);
        if children.is_empty() {
            return;
        }
        out.push('(');
        for (i, child) in children.into_iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.outline_record(out, child);
        }
        out.push(')');
    }

    fn disassemble_record(&self, out: &mut String, pos: usize, depth: usize) {
        let Some(op) = self.op_at(pos) else {
            let _ = writeln!(out, "{pos:>4}  {:indent$}?? {}", "", self.ops[pos], indent = depth * 2);
            return;
        };
        let _ = write!(out, "{pos:>4}  {:indent$}{}", "", op.mnemonic(), indent = depth * 2);
        for (i, kind) in op.header().iter().enumerate() {
            let v = self.ops.get(pos + HEADER_START + i).copied().unwrap_or(NO_OPERAND);
            out.push(' ');
            self.write_operand(out, *kind, v);
        }
        out.push('\n');
        for child in self.children(pos) {
            self.disassemble_record(out, child, depth + 1);
        }
    }

    fn write_operand(&self, out: &mut String, kind: Operand, v: i32) {
        let _ = match kind {
            Operand::Axis => match Axis::from_code(v) {
                Some(a) => write!(out, "{}::", a.name()),
                None => write!(out, "axis?{v}"),
            },
            Operand::Connector => match PatternConnector::from_code(v) {
                Some(PatternConnector::Start) => write!(out, "start"),
                Some(PatternConnector::Parent) => write!(out, "/"),
                Some(PatternConnector::Ancestor) => write!(out, "//"),
                None => write!(out, "connector?{v}"),
            },
            Operand::NodeTest => match NodeTestCode::from_code(v) {
                Some(t) => write!(out, "{}", t.mnemonic()),
                None => write!(out, "test?{v}"),
            },
            Operand::Object | Operand::OptionalObject => match self.object(v) {
                Some(o) => write!(out, "{o}"),
                None if v == NO_OPERAND => write!(out, "-"),
                None => write!(out, "obj?{v}"),
            },
            Operand::Function => {
                let id = FunctionId::from_operand(v);
                match id.and_then(FunctionTable::builtin) {
                    Some(spec) => write!(out, "{}:{}", spec.ns.prefix(), spec.local),
                    None => write!(out, "custom#{v}"),
                }
            }
            Operand::Composite => write!(out, "@{v}"),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(map: &mut OpMap, i: i64) {
        let obj = map.push_object(OpObject::Literal(Literal::Integer(i)));
        map.leaf(OpCode::Literal, &[obj]);
    }

    #[test]
    fn insert_wraps_emitted_operand() {
        let mut map = OpMap::new();
        let root = map.open(OpCode::XPath, &[]);
        let start = map.len();
        literal(&mut map, 1);
        map.insert(start, OpCode::Plus, &[]);
        literal(&mut map, 2);
        map.close(start);
        map.close(root);
        assert_eq!(map.verify(), Ok(()));
        assert_eq!(map.length_at(start), Some(8));
        assert_eq!(map.length_at(root), Some(10));
        assert_eq!(map.children(start).len(), 2);
    }

    #[test]
    fn verify_rejects_unclosed_records() {
        let mut map = OpMap::new();
        let root = map.open(OpCode::XPath, &[]);
        map.open(OpCode::Group, &[]);
        literal(&mut map, 1);
        map.close(root);
        assert_eq!(map.verify(), Err(IntegrityError::Unclosed { pos: 2 }));
    }

    #[test]
    fn verify_rejects_dangling_objects() {
        let mut map = OpMap::new();
        let root = map.open(OpCode::XPath, &[]);
        map.leaf(OpCode::Literal, &[7]);
        map.close(root);
        assert_eq!(map.verify(), Err(IntegrityError::BadOperand { pos: 2, operand: 0 }));
    }

    #[test]
    fn verify_checks_child_counts() {
        let mut map = OpMap::new();
        let root = map.open(OpCode::XPath, &[]);
        let plus = map.open(OpCode::Plus, &[]);
        literal(&mut map, 1);
        map.close(plus);
        map.close(root);
        assert!(matches!(map.verify(), Err(IntegrityError::ChildCount { op: "Plus", found: 1, .. })));
    }

    #[test]
    fn disassembles_nested_records() {
        let mut map = OpMap::new();
        let root = map.open(OpCode::XPath, &[]);
        let neg = map.open(OpCode::Neg, &[]);
        literal(&mut map, 4);
        map.close(neg);
        map.close(root);
        assert_eq!(map.disassemble(), "   0  XPath\n   2    Neg\n   4      Literal 4\n");
    }
}
