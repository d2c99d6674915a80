use opxpath::composite::{Composite, QuantifierKind};
use opxpath::{Compilation, CompileError, XPathCompiler, compile};
use rstest::rstest;

fn compiled(src: &str) -> Compilation {
    compile(src).unwrap_or_else(|e| panic!("{src}: {e}"))
}

fn first_composite(c: &Compilation) -> &Composite {
    c.composites().first().expect("a composite")
}

fn binding_texts(c: &Compilation) -> Vec<(String, String)> {
    match first_composite(c) {
        Composite::For { bindings, .. } | Composite::Let { bindings, .. } | Composite::Quantified { bindings, .. } => {
            bindings.iter().map(|b| (b.variable.to_string(), b.source.text.clone())).collect()
        }
        other => panic!("no bindings in {other}"),
    }
}

#[rstest]
fn for_with_one_binding() {
    let c = compiled("for $x in (1, 2) return $x * 2");
    assert_eq!(c.op_map().outline(), "XPath(ForExpr)");
    assert_eq!(binding_texts(&c), [("x".to_string(), "(1, 2)".to_string())]);
    assert_eq!(first_composite(&c).to_string(), "for $x in {(1, 2)} return {$x * 2}");
}

#[rstest]
fn for_with_several_bindings() {
    let c = compiled("for $x in 1 to 3, $y in $x return $x + $y");
    assert_eq!(
        binding_texts(&c),
        [("x".to_string(), "1 to 3".to_string()), ("y".to_string(), "$x".to_string())]
    );
    let Composite::For { body, .. } = first_composite(&c) else { panic!("not a for") };
    assert_eq!(body.text, "$x + $y");
}

#[rstest]
fn nested_for_stays_in_its_binding() {
    let c = compiled("for $x in for $y in $s return $y return $x");
    assert_eq!(binding_texts(&c), [("x".to_string(), "for $y in $s return $y".to_string())]);
    let Composite::For { body, .. } = first_composite(&c) else { panic!("not a for") };
    assert_eq!(body.text, "$x");
}

#[rstest]
fn body_ends_at_a_top_level_comma() {
    let c = compiled("for $x in $s return $x, 3");
    assert_eq!(c.op_map().outline(), "XPath(ExprList(ForExpr Literal))");
}

#[rstest]
fn keyword_spellings_after_dollar_or_slash_are_names() {
    let c = compiled("for $return in $s return $return/return");
    let Composite::For { body, .. } = first_composite(&c) else { panic!("not a for") };
    assert_eq!(body.text, "$return/return");
}

#[rstest]
fn let_bindings() {
    let c = compiled("let $x := 1, $y := $x + 1 return $y");
    assert_eq!(c.op_map().outline(), "XPath(LetExpr)");
    assert_eq!(
        binding_texts(&c),
        [("x".to_string(), "1".to_string()), ("y".to_string(), "$x + 1".to_string())]
    );
}

#[rstest]
#[case("some $x in $s satisfies $x > 1", QuantifierKind::Some)]
#[case("every $x in $s, $y in $t satisfies $x = $y", QuantifierKind::Every)]
fn quantifiers(#[case] src: &str, #[case] expected: QuantifierKind) {
    let c = compiled(src);
    assert_eq!(c.op_map().outline(), "XPath(QuantifiedExpr)");
    let Composite::Quantified { kind, .. } = first_composite(&c) else { panic!("not quantified") };
    assert_eq!(*kind, expected);
}

#[rstest]
fn if_branches() {
    let c = compiled("if ($a) then 1 else 2");
    let Composite::If { condition, then_branch, else_branch } = first_composite(&c) else { panic!("not an if") };
    assert_eq!(condition.text, "$a");
    assert_eq!(then_branch.text, "1");
    assert_eq!(else_branch.text, "2");
}

#[rstest]
#[case("if ($a) then if ($b) then 1 else 2 else 3", "if ($b) then 1 else 2", "3")]
#[case("if ($a) then 1 else if ($b) then 2 else 3", "1", "if ($b) then 2 else 3")]
#[case("if ($a) then for $x in $s return $x else 0", "for $x in $s return $x", "0")]
fn nested_conditionals(#[case] src: &str, #[case] then_text: &str, #[case] else_text: &str) {
    let c = compiled(src);
    let Composite::If { then_branch, else_branch, .. } = first_composite(&c) else { panic!("not an if") };
    assert_eq!(then_branch.text, then_text);
    assert_eq!(else_branch.text, else_text);
}

#[rstest]
fn conditional_in_for_body() {
    let c = compiled("for $x in $s return if ($x) then 1 else 2");
    let Composite::For { body, .. } = first_composite(&c) else { panic!("not a for") };
    assert_eq!(body.text, "if ($x) then 1 else 2");
    let body = XPathCompiler::default().compile_deferred(&c, body).unwrap();
    assert_eq!(body.op_map().outline(), "XPath(IfExpr)");
}

#[rstest]
fn binding_expression_inside_sequence() {
    let c = compiled("(for $x in $s return $x, 3)");
    let Composite::Sequence { items } = first_composite(&c) else { panic!("not a sequence") };
    assert_eq!(items[0].text, "for $x in $s return $x");
    assert_eq!(items[1].text, "3");
}

#[rstest]
#[case("for $x in 1")]
#[case("for $x in return $x")]
#[case("let $x := 1")]
#[case("some $x in $s")]
fn incomplete_bindings_are_syntax_errors(#[case] src: &str) {
    let err = compile(src).unwrap_err();
    assert!(err.is_recoverable(), "{src}: {err}");
    assert_eq!(err.code().as_str(), "XPST0003", "{src}: {err}");
}

#[rstest]
fn if_without_else_is_not_a_function_call() {
    let err = compile("if ($a) then 1").unwrap_err();
    assert!(matches!(err, CompileError::UnexpectedToken { .. }), "{err}");
}

#[rstest]
fn names_that_look_like_keywords_are_steps() {
    assert_eq!(compiled("for").op_map().outline(), "XPath(LocationPath(Step))");
    assert_eq!(compiled("if/then").op_map().outline(), "XPath(LocationPath(Step Step))");
}
