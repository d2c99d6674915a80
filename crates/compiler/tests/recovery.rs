use opxpath::diagnostics::FALLBACK_EXPRESSION;
use opxpath::{CollectingSink, CompileError, CompileOptions, Recovery, TracingSink, XPathCompiler};
use rstest::rstest;

#[rstest]
fn substitution_compiles_the_fallback() {
    let mut sink = CollectingSink::new(Recovery::Substitute);
    let c = XPathCompiler::default().compile_or_recover("1 +", &mut sink).unwrap();
    assert_eq!(c.source(), FALLBACK_EXPRESSION);
    assert_eq!(c.op_map().outline(), "XPath(LocationPath(Root Step))");
    assert_eq!(sink.errors.len(), 1);
    assert!(matches!(sink.errors[0], CompileError::UnexpectedToken { .. }));
}

#[rstest]
#[case("a ~ b")]
#[case("1 2")]
#[case("foo(1)")]
#[case("p:a")]
fn every_recoverable_error_reaches_the_sink(#[case] src: &str) {
    let mut sink = CollectingSink::new(Recovery::Abort);
    let err = XPathCompiler::default().compile_or_recover(src, &mut sink).unwrap_err();
    assert_eq!(sink.errors.len(), 1, "{src}");
    assert_eq!(sink.errors[0].to_string(), err.to_string());
}

#[rstest]
fn valid_expressions_do_not_touch_the_sink() {
    let mut sink = CollectingSink::new(Recovery::Abort);
    let c = XPathCompiler::default().compile_or_recover("a/b", &mut sink).unwrap();
    assert_eq!(c.source(), "a/b");
    assert!(sink.errors.is_empty());
}

#[rstest]
fn fatal_errors_bypass_the_sink() {
    let compiler = XPathCompiler::new(CompileOptions::builder().with_max_depth(2).build());
    let mut sink = CollectingSink::new(Recovery::Substitute);
    let err = compiler.compile_or_recover("a[b[c]]", &mut sink).unwrap_err();
    assert!(matches!(err, CompileError::RecursionLimit { .. }), "{err}");
    assert!(sink.errors.is_empty());
}

#[rstest]
fn tracing_sink_substitutes() {
    let c = XPathCompiler::default().compile_or_recover("(", &mut TracingSink).unwrap();
    assert_eq!(c.source(), FALLBACK_EXPRESSION);
}
