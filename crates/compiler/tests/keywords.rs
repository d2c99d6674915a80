use opxpath::keywords::{
    Axis, Keyword, NodeTestCode, NodeType, is_reserved_function_name, lookup_axis, lookup_keyword, lookup_node_test,
    lookup_node_type,
};
use rstest::rstest;

#[rstest]
#[case("ancestor", Axis::Ancestor)]
#[case("ancestor-or-self", Axis::AncestorOrSelf)]
#[case("attribute", Axis::Attribute)]
#[case("child", Axis::Child)]
#[case("descendant", Axis::Descendant)]
#[case("descendant-or-self", Axis::DescendantOrSelf)]
#[case("following", Axis::Following)]
#[case("following-sibling", Axis::FollowingSibling)]
#[case("namespace", Axis::Namespace)]
#[case("parent", Axis::Parent)]
#[case("preceding", Axis::Preceding)]
#[case("preceding-sibling", Axis::PrecedingSibling)]
#[case("self", Axis::SelfAxis)]
fn axis_names(#[case] name: &str, #[case] axis: Axis) {
    assert_eq!(lookup_axis(name), Some(axis));
    assert_eq!(axis.name(), name);
}

#[rstest]
#[case("sideways")]
#[case("Child")]
#[case("")]
fn unknown_axes(#[case] name: &str) {
    assert_eq!(lookup_axis(name), None);
}

#[rstest]
#[case("comment", Some(NodeTestCode::Comment))]
#[case("text", Some(NodeTestCode::Text))]
#[case("processing-instruction", Some(NodeTestCode::ProcessingInstruction))]
#[case("node", Some(NodeTestCode::Node))]
#[case("*", Some(NodeTestCode::Wildcard))]
#[case("element", None)]
fn node_test_keywords(#[case] name: &str, #[case] expected: Option<NodeTestCode>) {
    assert_eq!(lookup_node_test(name), expected);
}

#[rstest]
fn node_test_codes_round_trip() {
    for code in 0..9 {
        let test = NodeTestCode::from_code(code).expect("code");
        assert_eq!(test.code(), code);
    }
    assert_eq!(NodeTestCode::from_code(9), None);
}

#[rstest]
#[case("document-node", Some(NodeType::DocumentNode))]
#[case("schema-attribute", Some(NodeType::SchemaAttribute))]
#[case("namespace-node", Some(NodeType::NamespaceNode))]
#[case("item", None)]
fn node_types(#[case] name: &str, #[case] expected: Option<NodeType>) {
    assert_eq!(lookup_node_type(name), expected);
}

#[rstest]
#[case("return", Some(Keyword::Return))]
#[case("satisfies", Some(Keyword::Satisfies))]
#[case("idiv", Some(Keyword::IDiv))]
#[case("//", Some(Keyword::DoubleSlash))]
#[case("returns", None)]
fn operator_keywords(#[case] name: &str, #[case] expected: Option<Keyword>) {
    assert_eq!(lookup_keyword(name), expected);
}

#[rstest]
#[case("if", true)]
#[case("typeswitch", true)]
#[case("node", true)]
#[case("count", false)]
#[case("for", false)]
fn reserved_function_names(#[case] name: &str, #[case] reserved: bool) {
    assert_eq!(is_reserved_function_name(name), reserved);
}

#[rstest]
fn principal_node_kind() {
    assert!(Axis::Child.principal_is_element());
    assert!(Axis::Descendant.principal_is_element());
    assert!(!Axis::Attribute.principal_is_element());
    assert!(!Axis::Namespace.principal_is_element());
}
