//! Sequence types as they appear after `instance of`, `cast as`, `treat as`
//! and in function signatures.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use crate::consts::XS_NS;
use crate::error::ErrorSource;
use crate::names::ExpandedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Occurrence {
    pub fn from_indicator(s: &str) -> Option<Self> {
        match s {
            "?" => Some(Occurrence::ZeroOrOne),
            "*" => Some(Occurrence::ZeroOrMore),
            "+" => Some(Occurrence::OneOrMore),
            _ => None,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Occurrence::One => "",
            Occurrence::ZeroOrOne => "?",
            Occurrence::ZeroOrMore => "*",
            Occurrence::OneOrMore => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SequenceType {
    EmptySequence,
    Typed { item: ItemType, occurrence: Occurrence },
}

impl SequenceType {
    pub fn one(item: ItemType) -> Self {
        SequenceType::Typed { item, occurrence: Occurrence::One }
    }
}

/// Element or attribute name test inside a kind test.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameTest {
    Name(ExpandedName),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
    AnyItem,
    AnyNode,
    Text,
    Comment,
    NamespaceNode,
    ProcessingInstruction(Option<String>),
    Document(Option<Box<ItemType>>),
    Element { name: Option<NameTest>, type_name: Option<ExpandedName>, nillable: bool },
    Attribute { name: Option<NameTest>, type_name: Option<ExpandedName> },
    SchemaElement(ExpandedName),
    SchemaAttribute(ExpandedName),
    Atomic(AtomicType),
    /// A user-defined type resolved through a [`SchemaTypeResolver`].
    SchemaType(SchemaTypeDescriptor),
    AnyFunction,
    Function { params: Vec<SequenceType>, result: Box<SequenceType> },
    AnyMap,
    Map { key: AtomicType, value: Box<SequenceType> },
    AnyArray,
    Array(Box<SequenceType>),
}

impl ItemType {
    pub fn is_atomic_or_schema_type(&self) -> bool {
        matches!(self, ItemType::Atomic(_) | ItemType::SchemaType(_))
    }
}

macro_rules! atomic_types {
    ($($variant:ident => $local:literal,)*) => {
        /// Built-in XML Schema atomic types.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AtomicType {
            $($variant,)*
        }

        impl AtomicType {
            pub const ALL: &'static [AtomicType] = &[$(AtomicType::$variant,)*];

            pub fn local_name(self) -> &'static str {
                match self {
                    $(AtomicType::$variant => $local,)*
                }
            }

            pub fn from_local(local: &str) -> Option<Self> {
                match local {
                    $($local => Some(AtomicType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

atomic_types! {
    AnyAtomicType => "anyAtomicType",
    UntypedAtomic => "untypedAtomic",
    String => "string",
    NormalizedString => "normalizedString",
    Token => "token",
    Language => "language",
    NmToken => "NMTOKEN",
    Name => "Name",
    NcName => "NCName",
    Id => "ID",
    IdRef => "IDREF",
    Entity => "ENTITY",
    Boolean => "boolean",
    Decimal => "decimal",
    Integer => "integer",
    NonPositiveInteger => "nonPositiveInteger",
    NegativeInteger => "negativeInteger",
    Long => "long",
    Int => "int",
    Short => "short",
    Byte => "byte",
    NonNegativeInteger => "nonNegativeInteger",
    UnsignedLong => "unsignedLong",
    UnsignedInt => "unsignedInt",
    UnsignedShort => "unsignedShort",
    UnsignedByte => "unsignedByte",
    PositiveInteger => "positiveInteger",
    Float => "float",
    Double => "double",
    Duration => "duration",
    DayTimeDuration => "dayTimeDuration",
    YearMonthDuration => "yearMonthDuration",
    DateTime => "dateTime",
    DateTimeStamp => "dateTimeStamp",
    Date => "date",
    Time => "time",
    GYearMonth => "gYearMonth",
    GYear => "gYear",
    GMonthDay => "gMonthDay",
    GDay => "gDay",
    GMonth => "gMonth",
    HexBinary => "hexBinary",
    Base64Binary => "base64Binary",
    AnyUri => "anyURI",
    QName => "QName",
    Notation => "NOTATION",
}

impl AtomicType {
    pub fn name(self) -> ExpandedName {
        ExpandedName::new(Some(XS_NS), self.local_name())
    }
}

/// What a schema lookup reports about a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaTypeDescriptor {
    pub name: ExpandedName,
    /// The built-in type this type is ultimately derived from, when atomic.
    pub base: Option<AtomicType>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaLookupError {
    #[error("type {0} is not declared")]
    NotFound(ExpandedName),
    #[error("schema unavailable")]
    Unavailable(#[source] ErrorSource),
}

/// Resolves user-defined type names imported from a schema.
///
/// Implementations may block; the compiler calls them synchronously.
pub trait SchemaTypeResolver: Send + Sync {
    fn lookup(&self, name: &ExpandedName) -> Result<SchemaTypeDescriptor, SchemaLookupError>;
}

/// A resolver over a fixed set of declared types.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaTypes {
    types: HashMap<ExpandedName, SchemaTypeDescriptor>,
}

impl InMemorySchemaTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: ExpandedName, base: Option<AtomicType>) -> Self {
        self.insert(name, base);
        self
    }

    pub fn insert(&mut self, name: ExpandedName, base: Option<AtomicType>) {
        self.types.insert(name.clone(), SchemaTypeDescriptor { name, base });
    }

    pub fn into_resolver(self) -> Arc<dyn SchemaTypeResolver> {
        Arc::new(self)
    }
}

impl SchemaTypeResolver for InMemorySchemaTypes {
    fn lookup(&self, name: &ExpandedName) -> Result<SchemaTypeDescriptor, SchemaLookupError> {
        self.types.get(name).cloned().ok_or_else(|| SchemaLookupError::NotFound(name.clone()))
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::EmptySequence => f.write_str("empty-sequence()"),
            SequenceType::Typed { item, occurrence } => {
                // function types need parentheses before an indicator
                if matches!(item, ItemType::Function { .. }) && *occurrence != Occurrence::One {
                    write!(f, "({item}){}", occurrence.indicator())
                } else {
                    write!(f, "{item}{}", occurrence.indicator())
                }
            }
        }
    }
}

impl fmt::Display for NameTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTest::Name(n) => n.fmt(f),
            NameTest::Wildcard => f.write_str("*"),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::AnyItem => f.write_str("item()"),
            ItemType::AnyNode => f.write_str("node()"),
            ItemType::Text => f.write_str("text()"),
            ItemType::Comment => f.write_str("comment()"),
            ItemType::NamespaceNode => f.write_str("namespace-node()"),
            ItemType::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            ItemType::ProcessingInstruction(Some(t)) => write!(f, "processing-instruction({t})"),
            ItemType::Document(None) => f.write_str("document-node()"),
            ItemType::Document(Some(inner)) => write!(f, "document-node({inner})"),
            ItemType::Element { name, type_name, nillable } => {
                f.write_str("element(")?;
                write_name_and_type(f, name.as_ref(), type_name.as_ref())?;
                if *nillable {
                    f.write_str("?")?;
                }
                f.write_str(")")
            }
            ItemType::Attribute { name, type_name } => {
                f.write_str("attribute(")?;
                write_name_and_type(f, name.as_ref(), type_name.as_ref())?;
                f.write_str(")")
            }
            ItemType::SchemaElement(n) => write!(f, "schema-element({n})"),
            ItemType::SchemaAttribute(n) => write!(f, "schema-attribute({n})"),
            ItemType::Atomic(t) => write!(f, "xs:{}", t.local_name()),
            ItemType::SchemaType(d) => d.name.fmt(f),
            ItemType::AnyFunction => f.write_str("function(*)"),
            ItemType::Function { params, result } => {
                f.write_str("function(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    p.fmt(f)?;
                }
                write!(f, ") as {result}")
            }
            ItemType::AnyMap => f.write_str("map(*)"),
            ItemType::Map { key, value } => write!(f, "map(xs:{}, {value})", key.local_name()),
            ItemType::AnyArray => f.write_str("array(*)"),
            ItemType::Array(member) => write!(f, "array({member})"),
        }
    }
}

fn write_name_and_type(
    f: &mut fmt::Formatter<'_>,
    name: Option<&NameTest>,
    type_name: Option<&ExpandedName>,
) -> fmt::Result {
    if let Some(n) = name {
        write!(f, "{n}")?;
    }
    if let Some(t) = type_name {
        write!(f, ", {t}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_names_roundtrip() {
        for t in AtomicType::ALL {
            assert_eq!(AtomicType::from_local(t.local_name()), Some(*t));
        }
    }

    #[test]
    fn displays_in_xpath_syntax() {
        let t = SequenceType::Typed {
            item: ItemType::Map {
                key: AtomicType::String,
                value: Box::new(SequenceType::Typed {
                    item: ItemType::Atomic(AtomicType::Integer),
                    occurrence: Occurrence::ZeroOrMore,
                }),
            },
            occurrence: Occurrence::ZeroOrOne,
        };
        assert_eq!(t.to_string(), "map(xs:string, xs:integer*)?");
    }

    #[test]
    fn in_memory_lookup_reports_missing() {
        let types = InMemorySchemaTypes::new()
            .with_type(ExpandedName::new(Some("urn:t"), "price"), Some(AtomicType::Decimal));
        assert!(types.lookup(&ExpandedName::new(Some("urn:t"), "price")).is_ok());
        assert!(matches!(
            types.lookup(&ExpandedName::new(Some("urn:t"), "cost")),
            Err(SchemaLookupError::NotFound(_))
        ));
    }
}
