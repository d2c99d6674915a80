//! Sequence types, item types and kind tests.

use string_cache::DefaultAtom as Atom;

use super::{CResult, ParseSession};
use crate::consts::XS_NS;
use crate::error::CompileError;
use crate::names::{ExpandedName, LexicalName, is_ncname};
use crate::seqtype::{AtomicType, ItemType, NameTest, Occurrence, SchemaLookupError, SequenceType};
use crate::tokens::Literal;

/// Where a sequence type appears, which decides what may follow the item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TypeContext {
    /// `instance of`, `treat as`, return types and nested types.
    General,
    /// `cast as` and `castable as`: an atomic or schema type and an optional `?`.
    SingleType,
    /// A parameter declaration of an inline function; `,` or `)` must follow.
    InlineParam,
}

impl ParseSession<'_, '_> {
    /// ```text
    /// SequenceType ::= ("empty-sequence" "(" ")") | (ItemType OccurrenceIndicator?)
    /// SingleType   ::= SimpleTypeName "?"?
    /// ```
    pub(super) fn sequence_type(&mut self, context: TypeContext) -> CResult<SequenceType> {
        let declared = if self.is("empty-sequence") && self.peek_is(1, "(") {
            if context == TypeContext::SingleType {
                return Err(self.type_error("empty-sequence() cannot be the target of a cast"));
            }
            self.cursor.advance();
            self.cursor.advance();
            self.expect(")")?;
            SequenceType::EmptySequence
        } else {
            let item = self.item_type()?;
            let occurrence = if context == TypeContext::SingleType {
                if !item.is_atomic_or_schema_type() {
                    return Err(self.type_error(format!("{item} is not an atomic type")));
                }
                if self.eat("?") { Occurrence::ZeroOrOne } else { Occurrence::One }
            } else {
                match self.current_lexeme().and_then(Occurrence::from_indicator) {
                    Some(occurrence) => {
                        self.cursor.advance();
                        occurrence
                    }
                    None => Occurrence::One,
                }
            };
            SequenceType::Typed { item, occurrence }
        };
        if context == TypeContext::InlineParam && !(self.is(",") || self.is(")")) {
            return Err(self.unexpected("',' or ')' after a parameter type"));
        }
        Ok(declared)
    }

    /// ```text
    /// ItemType ::= KindTest | ("item" "(" ")") | FunctionTest | MapTest
    ///            | ArrayTest | AtomicOrUnionType | ParenthesizedItemType
    /// ```
    pub(super) fn item_type(&mut self) -> CResult<ItemType> {
        self.nested(|s| {
            if s.is("(") {
                s.require_v31("a parenthesized item type")?;
                s.cursor.advance();
                let inner = s.item_type()?;
                s.expect(")")?;
                return Ok(inner);
            }
            match s.current_lexeme() {
                Some(keyword) if s.peek_is(1, "(") => s.keyword_type(keyword),
                Some(_) => s.named_type(),
                None => Err(s.type_error(format!("expected an item type, found {}", s.describe_current()))),
            }
        })
    }

    /// An item type spelled `keyword(...)`.
    fn keyword_type(&mut self, keyword: &str) -> CResult<ItemType> {
        let simple = match keyword {
            "item" => Some(ItemType::AnyItem),
            "node" => Some(ItemType::AnyNode),
            "text" => Some(ItemType::Text),
            "comment" => Some(ItemType::Comment),
            "namespace-node" => Some(ItemType::NamespaceNode),
            _ => None,
        };
        if let Some(item) = simple {
            self.cursor.advance();
            self.cursor.advance();
            self.expect(")")?;
            return Ok(item);
        }
        match keyword {
            "processing-instruction" => self.pi_test(),
            "document-node" => self.document_test(),
            "element" => self.element_test(),
            "attribute" => self.attribute_test(),
            "schema-element" | "schema-attribute" => {
                self.cursor.advance();
                self.cursor.advance();
                let name = self.type_name(self.options().default_element_namespace.as_ref())?;
                self.expect(")")?;
                Ok(if keyword == "schema-element" {
                    ItemType::SchemaElement(name)
                } else {
                    ItemType::SchemaAttribute(name)
                })
            }
            "function" => self.function_test(),
            "map" => self.map_test(),
            "array" => self.array_test(),
            "empty-sequence" => Err(self.type_error("empty-sequence() is not an item type")),
            other => Err(self.type_error(format!("unknown item type {other}()"))),
        }
    }

    /// ```text
    /// PITest ::= "processing-instruction" "(" (NCName | StringLiteral)? ")"
    /// ```
    fn pi_test(&mut self) -> CResult<ItemType> {
        self.cursor.advance();
        self.cursor.advance();
        let target = match self.current() {
            Some(t) if t.is(")") => None,
            Some(t) => {
                let target = match (t.as_lexeme(), t.as_literal()) {
                    (Some(name), _) => name.to_string(),
                    (None, Some(Literal::String(s))) => s.trim().to_string(),
                    _ => String::new(),
                };
                if !is_ncname(&target) {
                    return Err(self.type_error(format!("invalid processing-instruction target {}", self.describe_current())));
                }
                self.cursor.advance();
                Some(target)
            }
            None => return Err(self.unexpected("')'")),
        };
        self.expect(")")?;
        Ok(ItemType::ProcessingInstruction(target))
    }

    /// ```text
    /// DocumentTest ::= "document-node" "(" (ElementTest | SchemaElementTest)? ")"
    /// ```
    fn document_test(&mut self) -> CResult<ItemType> {
        self.cursor.advance();
        self.cursor.advance();
        if self.eat(")") {
            return Ok(ItemType::Document(None));
        }
        if !(matches!(self.current_lexeme(), Some("element" | "schema-element")) && self.peek_is(1, "(")) {
            return Err(self.type_error(format!("expected an element test, found {}", self.describe_current())));
        }
        let inner = self.item_type()?;
        self.expect(")")?;
        Ok(ItemType::Document(Some(Box::new(inner))))
    }

    /// ```text
    /// ElementTest ::= "element" "(" (ElementNameOrWildcard ("," TypeName "?"?)?)? ")"
    /// ```
    fn element_test(&mut self) -> CResult<ItemType> {
        self.cursor.advance();
        self.cursor.advance();
        let default_ns = self.options().default_element_namespace.as_ref();
        let mut test = ItemType::Element { name: None, type_name: None, nillable: false };
        if !self.is(")") {
            let name = self.name_or_wildcard(default_ns)?;
            let (type_name, nillable) = if self.eat(",") {
                let type_name = self.type_name(default_ns)?;
                (Some(type_name), self.eat("?"))
            } else {
                (None, false)
            };
            test = ItemType::Element { name: Some(name), type_name, nillable };
        }
        self.expect(")")?;
        Ok(test)
    }

    /// ```text
    /// AttributeTest ::= "attribute" "(" (AttribNameOrWildcard ("," TypeName)?)? ")"
    /// ```
    fn attribute_test(&mut self) -> CResult<ItemType> {
        self.cursor.advance();
        self.cursor.advance();
        let mut test = ItemType::Attribute { name: None, type_name: None };
        if !self.is(")") {
            let name = self.name_or_wildcard(None)?;
            let type_name =
                if self.eat(",") { Some(self.type_name(self.options().default_element_namespace.as_ref())?) } else { None };
            test = ItemType::Attribute { name: Some(name), type_name };
        }
        self.expect(")")?;
        Ok(test)
    }

    fn name_or_wildcard(&mut self, default_ns: Option<&Atom>) -> CResult<NameTest> {
        if self.eat("*") {
            return Ok(NameTest::Wildcard);
        }
        self.type_name(default_ns).map(NameTest::Name)
    }

    fn type_name(&mut self, default_ns: Option<&Atom>) -> CResult<ExpandedName> {
        let Some(lexeme) = self.current_lexeme().filter(|l| LexicalName::parse(l).is_some()) else {
            return Err(self.type_error(format!("expected a name, found {}", self.describe_current())));
        };
        let name = self.resolve_name(lexeme, default_ns)?;
        self.cursor.advance();
        Ok(name)
    }

    /// ```text
    /// FunctionTest ::= "function" "(" "*" ")"
    ///                | "function" "(" (SequenceType ("," SequenceType)*)? ")" "as" SequenceType
    /// ```
    fn function_test(&mut self) -> CResult<ItemType> {
        self.require_v31("a function test")?;
        self.cursor.advance();
        self.cursor.advance();
        if self.eat("*") {
            self.expect(")")?;
            return Ok(ItemType::AnyFunction);
        }
        let mut params = Vec::new();
        if !self.is(")") {
            loop {
                params.push(self.sequence_type(TypeContext::General)?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        if !self.eat("as") {
            return Err(self.type_error("a typed function test needs 'as' and a result type"));
        }
        let result = Box::new(self.sequence_type(TypeContext::General)?);
        Ok(ItemType::Function { params, result })
    }

    /// ```text
    /// MapTest ::= "map" "(" "*" ")" | "map" "(" AtomicOrUnionType "," SequenceType ")"
    /// ```
    fn map_test(&mut self) -> CResult<ItemType> {
        self.require_v31("a map test")?;
        self.cursor.advance();
        self.cursor.advance();
        if self.eat("*") {
            self.expect(")")?;
            return Ok(ItemType::AnyMap);
        }
        let key = match self.item_type()? {
            ItemType::Atomic(key) => key,
            other => return Err(self.type_error(format!("map keys must be atomic, found {other}"))),
        };
        self.expect(",")?;
        let value = Box::new(self.sequence_type(TypeContext::General)?);
        self.expect(")")?;
        Ok(ItemType::Map { key, value })
    }

    /// ```text
    /// ArrayTest ::= "array" "(" "*" ")" | "array" "(" SequenceType ")"
    /// ```
    fn array_test(&mut self) -> CResult<ItemType> {
        self.require_v31("an array test")?;
        self.cursor.advance();
        self.cursor.advance();
        if self.eat("*") {
            self.expect(")")?;
            return Ok(ItemType::AnyArray);
        }
        let member = Box::new(self.sequence_type(TypeContext::General)?);
        self.expect(")")?;
        Ok(ItemType::Array(member))
    }

    /// A built-in atomic type or a type looked up through the schema resolver.
    fn named_type(&mut self) -> CResult<ItemType> {
        let at = self.at();
        let name = self.type_name(self.options().default_element_namespace.as_ref())?;
        if name.is_in(XS_NS) {
            return AtomicType::from_local(&name.local)
                .map(ItemType::Atomic)
                .ok_or_else(|| CompileError::UnknownAtomicType { name: name.local.to_string(), at });
        }
        let Some(resolver) = self.compiler.schema_types.as_ref() else {
            return Err(CompileError::SchemaTypeNotFound { name: name.to_string(), at });
        };
        tracing::debug!(%name, "looking up schema type");
        match resolver.lookup(&name) {
            Ok(descriptor) => Ok(ItemType::SchemaType(descriptor)),
            Err(SchemaLookupError::NotFound(_)) => Err(CompileError::SchemaTypeNotFound { name: name.to_string(), at }),
            Err(SchemaLookupError::Unavailable(source)) => {
                Err(CompileError::SchemaLookup { name: name.to_string(), at, source })
            }
        }
    }
}
