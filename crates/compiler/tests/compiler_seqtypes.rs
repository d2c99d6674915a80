use std::error::Error as _;
use std::sync::Arc;

use opxpath::seqtype::{
    AtomicType, InMemorySchemaTypes, NameTest, SchemaLookupError, SchemaTypeDescriptor, SchemaTypeResolver,
};
use opxpath::{CompileError, CompileOptions, ExpandedName, ItemType, OpObject, SequenceType, XPathCompiler, compile};
use rstest::{fixture, rstest};

fn declared_with(compiler: &XPathCompiler, ty: &str) -> Result<SequenceType, CompileError> {
    let c = compiler.compile(&format!("$x instance of {ty}"))?;
    match c.op_map().object(c.op_map().header_at(2)[0]) {
        Some(OpObject::SequenceType(t)) => Ok(t.clone()),
        other => panic!("expected a sequence type, got {other:?}"),
    }
}

fn declared(ty: &str) -> SequenceType {
    declared_with(&XPathCompiler::default(), ty).unwrap_or_else(|e| panic!("{ty}: {e}"))
}

#[rstest]
#[case("item()")]
#[case("node()*")]
#[case("text()+")]
#[case("comment()?")]
#[case("namespace-node()")]
#[case("element()")]
#[case("element(a)")]
#[case("element(*)")]
#[case("attribute()")]
#[case("attribute(id)")]
#[case("document-node()")]
#[case("document-node(element(a))")]
#[case("schema-element(a)")]
#[case("schema-attribute(a)")]
#[case("processing-instruction()")]
#[case("processing-instruction(x)")]
#[case("function(*)")]
#[case("function(xs:string) as xs:integer")]
#[case("function(xs:string, item()*) as empty-sequence()")]
#[case("map(*)")]
#[case("map(xs:string, item()*)")]
#[case("array(*)")]
#[case("array(xs:integer+)")]
#[case("empty-sequence()")]
#[case("xs:integer?")]
#[case("(function() as item())?")]
fn sequence_types_round_trip_through_display(#[case] ty: &str) {
    assert_eq!(declared(ty).to_string(), ty);
}

#[rstest]
fn element_test_with_type_and_nillable() {
    let SequenceType::Typed { item: ItemType::Element { name, type_name, nillable }, .. } =
        declared("element(*, xs:string?)")
    else {
        panic!("not an element test")
    };
    assert_eq!(name, Some(NameTest::Wildcard));
    assert_eq!(type_name, Some(AtomicType::String.name()));
    assert!(nillable);
}

#[rstest]
fn processing_instruction_string_target_is_trimmed() {
    assert_eq!(declared("processing-instruction(' x ')").to_string(), "processing-instruction(x)");
}

#[rstest]
fn element_names_take_the_default_element_namespace() {
    let compiler = XPathCompiler::new(CompileOptions::builder().with_default_element_namespace("urn:d").build());
    let t = declared_with(&compiler, "element(a)").unwrap();
    assert_eq!(t.to_string(), "element(Q{urn:d}a)");
    let t = declared_with(&compiler, "attribute(a)").unwrap();
    assert_eq!(t.to_string(), "attribute(a)");
}

#[rstest]
#[case("foo()")]
#[case("map(element(), item())")]
#[case("function(xs:string)")]
#[case("processing-instruction('not a name')")]
#[case("document-node(text())")]
#[case("item(")]
fn malformed_types(#[case] ty: &str) {
    let err = declared_with(&XPathCompiler::default(), ty).unwrap_err();
    assert!(err.is_recoverable(), "{ty}: {err}");
    assert_eq!(err.code().as_str(), "XPST0003", "{ty}: {err}");
}

#[rstest]
fn unknown_xs_type() {
    let err = declared_with(&XPathCompiler::default(), "xs:nope").unwrap_err();
    assert!(matches!(&err, CompileError::UnknownAtomicType { name, .. } if name == "nope"), "{err}");
    assert_eq!(err.code().as_str(), "XPST0051");
}

#[fixture]
fn t_options() -> CompileOptions {
    CompileOptions::builder().with_namespace("t", "urn:t").build()
}

#[rstest]
fn schema_types_are_looked_up(t_options: CompileOptions) {
    let types = InMemorySchemaTypes::new().with_type(ExpandedName::new(Some("urn:t"), "price"), Some(AtomicType::Decimal));
    let compiler = XPathCompiler::new(t_options)
        .with_schema_types(types.into_resolver());
    let t = declared_with(&compiler, "t:price").unwrap();
    assert!(matches!(
        t,
        SequenceType::Typed { item: ItemType::SchemaType(SchemaTypeDescriptor { base: Some(AtomicType::Decimal), .. }), .. }
    ));
    let c = compiler.compile("$x cast as t:price").unwrap();
    assert_eq!(c.op_map().outline(), "XPath(CastAs(Variable))");

    let err = declared_with(&compiler, "t:cost").unwrap_err();
    assert!(matches!(err, CompileError::SchemaTypeNotFound { .. }), "{err}");
    assert!(!err.is_recoverable());
}

#[rstest]
fn schema_type_without_resolver_is_not_found(t_options: CompileOptions) {
    let compiler = XPathCompiler::new(t_options);
    let err = declared_with(&compiler, "t:price").unwrap_err();
    assert!(matches!(err, CompileError::SchemaTypeNotFound { .. }), "{err}");
}

struct Offline;

impl SchemaTypeResolver for Offline {
    fn lookup(&self, _name: &ExpandedName) -> Result<SchemaTypeDescriptor, SchemaLookupError> {
        Err(SchemaLookupError::Unavailable(Arc::new(std::io::Error::other("schema host unreachable"))))
    }
}

#[rstest]
fn failed_schema_lookup_keeps_its_cause(t_options: CompileOptions) {
    let compiler = XPathCompiler::new(t_options)
        .with_schema_types(Arc::new(Offline));
    let err = declared_with(&compiler, "t:price").unwrap_err();
    assert!(matches!(err, CompileError::SchemaLookup { .. }), "{err}");
    assert_eq!(err.code().as_str(), "XQST0059");
    assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("schema host unreachable"));
}

#[rstest]
fn empty_sequence_cannot_be_cast_to() {
    let err = compile("$x cast as empty-sequence()").unwrap_err();
    assert!(matches!(err, CompileError::SequenceTypeSyntax { .. }), "{err}");
}
