use std::sync::Arc;

use opxpath::consts::{FNS, MAP_NS};
use opxpath::error::ErrorSource;
use opxpath::functions::{Arity, CUSTOM_CAPACITY, FunctionConstructor, FunctionId};
use opxpath::{CompileError, ErrorCode, ExpandedName, FunctionTable, OpCode, XPathCompiler, XPathFunction};
use rstest::rstest;

struct Echo {
    name: ExpandedName,
}

impl XPathFunction for Echo {
    fn name(&self) -> &ExpandedName {
        &self.name
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }
}

fn echo(ns: &str, local: &str) -> (ExpandedName, FunctionConstructor) {
    let name = ExpandedName::new(Some(ns), local);
    let captured = name.clone();
    let ctor: FunctionConstructor = Arc::new(move || -> Result<Arc<dyn XPathFunction>, ErrorSource> {
        Ok(Arc::new(Echo { name: captured.clone() }))
    });
    (name, ctor)
}

#[rstest]
fn builtins_resolve_per_namespace() {
    let t = FunctionTable::new();
    let core = t.function_id("size", None);
    let map = t.function_id("size", Some(MAP_NS));
    assert_eq!(core, None);
    assert!(map.is_some());
    let count = t.function_id("count", Some(FNS)).expect("count");
    assert_eq!(t.function_id("count", None), Some(count));
    assert!(count.is_builtin());
    assert_eq!(t.name_of(count).map(|n| n.to_string()), Some(format!("Q{{{FNS}}}count")));

    let core_contains = t.function_id("contains", Some(FNS)).expect("fn:contains");
    let map_contains = t.function_id("contains", Some(MAP_NS)).expect("map:contains");
    assert_ne!(core_contains, map_contains);
    assert_eq!(t.function_id("contains", None), Some(core_contains));
}

#[rstest]
#[case("node")]
#[case("text")]
#[case("comment")]
#[case("processing-instruction")]
fn node_test_names_are_never_functions(#[case] local: &str) {
    assert_eq!(FunctionTable::new().function_id(local, None), None);
}

#[rstest]
fn custom_functions_get_ids_after_the_builtins() {
    let mut t = FunctionTable::new();
    let (name, ctor) = echo("urn:ext", "echo");
    let id = t.install_custom_function(name.clone(), ctor).unwrap();
    assert_eq!(id.index(), FunctionTable::builtin_count());
    assert!(!id.is_builtin());
    assert_eq!(t.function_id("echo", Some("urn:ext")), Some(id));
    let f = t.instantiate(id).unwrap();
    assert_eq!(f.name(), &name);
    assert_eq!(f.arity(), Arity::exactly(1));
    assert!(t.is_available("echo"));
}

#[rstest]
fn reinstalling_keeps_the_id() {
    let mut t = FunctionTable::new();
    let (name, first) = echo("urn:ext", "echo");
    let (_, second) = echo("urn:other", "replaced");
    let id = t.install_custom_function(name.clone(), first).unwrap();
    assert_eq!(t.install_custom_function(name, second).unwrap(), id);
    assert_eq!(t.custom_len(), 1);
    assert_eq!(t.instantiate(id).unwrap().name().to_string(), "Q{urn:other}replaced");
}

#[rstest]
fn custom_functions_shadow_builtins() {
    let mut compiler = XPathCompiler::default();
    assert!(matches!(compiler.compile("count(1, 2)"), Err(CompileError::WrongArity { .. })));

    let builtin = compiler.functions().function_id("count", None).unwrap();
    let (name, ctor) = echo(FNS, "count");
    let id = compiler.functions_mut().install_custom_function(name, ctor).unwrap();
    assert_ne!(id, builtin);
    assert_eq!(compiler.functions().function_id("count", None), Some(id));

    let c = compiler.compile("count(1, 2)").unwrap();
    assert_eq!(c.op_map().op_at(2), Some(OpCode::Function));
    assert_eq!(FunctionId::from_operand(c.op_map().header_at(2)[0]), Some(id));
}

#[rstest]
fn custom_functions_compile_in_their_namespace() {
    let mut compiler = XPathCompiler::default();
    let (name, ctor) = echo("urn:ext", "echo");
    let id = compiler.functions_mut().install_custom_function(name, ctor).unwrap();
    let c = compiler.compile("Q{urn:ext}echo('a', 'b')").unwrap();
    assert_eq!(c.op_map().outline(), "XPath(Function(Literal Literal))");
    assert_eq!(FunctionId::from_operand(c.op_map().header_at(2)[0]), Some(id));
}

#[rstest]
fn table_capacity_is_bounded() {
    let mut t = FunctionTable::new();
    for i in 0..CUSTOM_CAPACITY {
        let (name, ctor) = echo("urn:ext", &format!("f{i}"));
        t.install_custom_function(name, ctor).unwrap();
    }
    let (name, ctor) = echo("urn:ext", "overflow");
    let err = t.install_custom_function(name, ctor).unwrap_err();
    assert!(matches!(err, CompileError::FunctionTableFull { capacity } if capacity == CUSTOM_CAPACITY));
    assert_eq!(err.code(), ErrorCode::FOER0000);

    // an existing name can still be replaced
    let (name, ctor) = echo("urn:ext", "f0");
    assert!(t.install_custom_function(name, ctor).is_ok());
}

#[rstest]
fn construction_failures_are_reported() {
    let mut t = FunctionTable::new();
    let ctor: FunctionConstructor = Arc::new(|| -> Result<Arc<dyn XPathFunction>, ErrorSource> {
        Err(Arc::new(std::io::Error::other("no backend")))
    });
    let id = t.install_custom_function(ExpandedName::new(Some("urn:ext"), "broken"), ctor).unwrap();
    let Err(err) = t.instantiate(id) else { panic!("constructed") };
    assert!(matches!(&err, CompileError::FunctionConstruction { name, .. } if name == "Q{urn:ext}broken"));

    let Err(err) = t.instantiate(FunctionId(9999)) else { panic!("constructed") };
    assert!(matches!(err, CompileError::FunctionConstruction { .. }));
}

#[rstest]
fn builtins_instantiate_with_their_declared_arity() {
    let t = FunctionTable::new();
    let id = t.function_id("concat", None).unwrap();
    let f = t.instantiate(id).unwrap();
    assert_eq!(f.arity(), Arity { min: 2, max: None });
    assert_eq!(FunctionTable::arity_of(id), Some(f.arity()));
}

#[rstest]
#[case("count", true)]
#[case("upper-case", true)]
#[case("size", true)]
#[case("pi", true)]
#[case("merge", true)]
#[case("no-such-function", false)]
fn availability_checks_every_builtin_namespace(#[case] local: &str, #[case] available: bool) {
    assert_eq!(FunctionTable::new().is_available(local), available);
}
