//! Fixed lookup tables for reserved words and symbols.
//!
//! All tables are built once on first use and never change afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor = 0,
    AncestorOrSelf = 1,
    Attribute = 2,
    Child = 3,
    Descendant = 4,
    DescendantOrSelf = 5,
    Following = 6,
    FollowingSibling = 7,
    Namespace = 8,
    Parent = 9,
    Preceding = 10,
    PrecedingSibling = 11,
    SelfAxis = 12,
}

impl Axis {
    pub const ALL: [Axis; 13] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i)).copied()
    }

    /// Axes whose principal node kind is not element.
    pub fn principal_is_element(self) -> bool {
        !matches!(self, Axis::Attribute | Axis::Namespace)
    }
}

/// How a step selects nodes. Stored as the node-test operand of step records.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTestCode {
    Name = 0,
    Wildcard = 1,
    NamespaceWildcard = 2,
    LocalWildcard = 3,
    Node = 4,
    Text = 5,
    Comment = 6,
    ProcessingInstruction = 7,
    Kind = 8,
}

impl NodeTestCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => NodeTestCode::Name,
            1 => NodeTestCode::Wildcard,
            2 => NodeTestCode::NamespaceWildcard,
            3 => NodeTestCode::LocalWildcard,
            4 => NodeTestCode::Node,
            5 => NodeTestCode::Text,
            6 => NodeTestCode::Comment,
            7 => NodeTestCode::ProcessingInstruction,
            8 => NodeTestCode::Kind,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            NodeTestCode::Name => "name",
            NodeTestCode::Wildcard => "*",
            NodeTestCode::NamespaceWildcard => "ns:*",
            NodeTestCode::LocalWildcard => "*:local",
            NodeTestCode::Node => "node()",
            NodeTestCode::Text => "text()",
            NodeTestCode::Comment => "comment()",
            NodeTestCode::ProcessingInstruction => "processing-instruction()",
            NodeTestCode::Kind => "kind",
        }
    }
}

/// Names that open a kind test when followed by `(`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Node,
    Text,
    Comment,
    ProcessingInstruction,
    Element,
    Attribute,
    DocumentNode,
    SchemaElement,
    SchemaAttribute,
    NamespaceNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // abbreviated steps
    Dot,
    DotDot,
    At,
    Slash,
    DoubleSlash,
    // operator words
    Or,
    And,
    Div,
    IDiv,
    Mod,
    Quo,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    To,
    Union,
    Intersect,
    Except,
    Instance,
    Treat,
    Cast,
    Castable,
    Of,
    As,
    // binding expressions
    For,
    Let,
    In,
    Return,
    Some,
    Every,
    Satisfies,
    If,
    Then,
    Else,
}

impl Keyword {
    pub fn code(self) -> i32 {
        self as i32
    }
}

static AXES: LazyLock<HashMap<&'static str, Axis>> =
    LazyLock::new(|| Axis::ALL.iter().map(|a| (a.name(), *a)).collect());

static NODE_TESTS: LazyLock<HashMap<&'static str, NodeTestCode>> = LazyLock::new(|| {
    HashMap::from([
        ("comment", NodeTestCode::Comment),
        ("text", NodeTestCode::Text),
        ("processing-instruction", NodeTestCode::ProcessingInstruction),
        ("node", NodeTestCode::Node),
        ("*", NodeTestCode::Wildcard),
    ])
});

static NODE_TYPES: LazyLock<HashMap<&'static str, NodeType>> = LazyLock::new(|| {
    HashMap::from([
        ("node", NodeType::Node),
        ("text", NodeType::Text),
        ("comment", NodeType::Comment),
        ("processing-instruction", NodeType::ProcessingInstruction),
        ("element", NodeType::Element),
        ("attribute", NodeType::Attribute),
        ("document-node", NodeType::DocumentNode),
        ("schema-element", NodeType::SchemaElement),
        ("schema-attribute", NodeType::SchemaAttribute),
        ("namespace-node", NodeType::NamespaceNode),
    ])
});

static KEYWORDS: LazyLock<HashMap<&'static str, Keyword>> = LazyLock::new(|| {
    use Keyword as K;
    HashMap::from([
        (".", K::Dot),
        ("..", K::DotDot),
        ("@", K::At),
        ("/", K::Slash),
        ("//", K::DoubleSlash),
        ("or", K::Or),
        ("and", K::And),
        ("div", K::Div),
        ("idiv", K::IDiv),
        ("mod", K::Mod),
        ("quo", K::Quo),
        ("eq", K::Eq),
        ("ne", K::Ne),
        ("lt", K::Lt),
        ("le", K::Le),
        ("gt", K::Gt),
        ("ge", K::Ge),
        ("is", K::Is),
        ("to", K::To),
        ("union", K::Union),
        ("intersect", K::Intersect),
        ("except", K::Except),
        ("instance", K::Instance),
        ("treat", K::Treat),
        ("cast", K::Cast),
        ("castable", K::Castable),
        ("of", K::Of),
        ("as", K::As),
        ("for", K::For),
        ("let", K::Let),
        ("in", K::In),
        ("return", K::Return),
        ("some", K::Some),
        ("every", K::Every),
        ("satisfies", K::Satisfies),
        ("if", K::If),
        ("then", K::Then),
        ("else", K::Else),
    ])
});

/// Names that can never be the name of a function call.
const RESERVED_FUNCTION_NAMES: [&str; 18] = [
    "array",
    "attribute",
    "comment",
    "document-node",
    "element",
    "empty-sequence",
    "function",
    "if",
    "item",
    "map",
    "namespace-node",
    "node",
    "processing-instruction",
    "schema-attribute",
    "schema-element",
    "switch",
    "text",
    "typeswitch",
];

pub fn lookup_axis(name: &str) -> Option<Axis> {
    AXES.get(name).copied()
}

pub fn lookup_node_test(name: &str) -> Option<NodeTestCode> {
    NODE_TESTS.get(name).copied()
}

pub fn lookup_keyword(name: &str) -> Option<Keyword> {
    KEYWORDS.get(name).copied()
}

pub fn lookup_node_type(name: &str) -> Option<NodeType> {
    NODE_TYPES.get(name).copied()
}

pub fn is_reserved_function_name(name: &str) -> bool {
    RESERVED_FUNCTION_NAMES.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_are_sorted() {
        assert!(RESERVED_FUNCTION_NAMES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn axis_codes_roundtrip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_code(axis.code()), Some(axis));
            assert_eq!(lookup_axis(axis.name()), Some(axis));
        }
        assert_eq!(Axis::from_code(13), None);
    }
}
