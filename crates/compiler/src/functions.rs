use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::consts::{ARRAY_NS, FNS, MAP_NS, MATH_NS};
use crate::error::{CompileError, ErrorSource};
use crate::names::ExpandedName;

/// The namespaces whose functions are known without registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionNamespace {
    Core,
    Math,
    Map,
    Array,
}

impl FunctionNamespace {
    pub const ALL: [FunctionNamespace; 4] =
        [FunctionNamespace::Core, FunctionNamespace::Math, FunctionNamespace::Map, FunctionNamespace::Array];

    pub fn uri(self) -> &'static str {
        match self {
            FunctionNamespace::Core => FNS,
            FunctionNamespace::Math => MATH_NS,
            FunctionNamespace::Map => MAP_NS,
            FunctionNamespace::Array => ARRAY_NS,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.uri() == uri)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            FunctionNamespace::Core => "fn",
            FunctionNamespace::Math => "math",
            FunctionNamespace::Map => "map",
            FunctionNamespace::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic functions such as `concat`.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|m| n <= m)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "{} or more", self.min),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSpec {
    pub ns: FunctionNamespace,
    pub local: &'static str,
    pub arity: Arity,
}

const fn b(ns: FunctionNamespace, local: &'static str, min: usize, max: usize) -> BuiltinSpec {
    BuiltinSpec { ns, local, arity: Arity { min, max: Some(max) } }
}

const fn variadic(ns: FunctionNamespace, local: &'static str, min: usize) -> BuiltinSpec {
    BuiltinSpec { ns, local, arity: Arity { min, max: None } }
}

use FunctionNamespace::{Array as A, Core as C, Map as M, Math as X};

/// Built-in functions. A function's id is its index in this table.
static BUILTINS: &[BuiltinSpec] = &[
    // context and node functions
    b(C, "current", 0, 0),
    b(C, "last", 0, 0),
    b(C, "position", 0, 0),
    b(C, "count", 1, 1),
    b(C, "id", 1, 2),
    b(C, "key", 2, 3),
    b(C, "local-name", 0, 1),
    b(C, "namespace-uri", 0, 1),
    b(C, "name", 0, 1),
    b(C, "root", 0, 1),
    b(C, "generate-id", 0, 1),
    b(C, "has-children", 0, 1),
    b(C, "innermost", 1, 1),
    b(C, "outermost", 1, 1),
    b(C, "path", 0, 1),
    b(C, "lang", 1, 2),
    b(C, "base-uri", 0, 1),
    b(C, "data", 0, 1),
    // strings
    b(C, "string", 0, 1),
    variadic(C, "concat", 2),
    b(C, "string-join", 1, 2),
    b(C, "starts-with", 2, 3),
    b(C, "ends-with", 2, 3),
    b(C, "contains", 2, 3),
    b(C, "contains-token", 2, 3),
    b(C, "substring-before", 2, 3),
    b(C, "substring-after", 2, 3),
    b(C, "substring", 2, 3),
    b(C, "string-length", 0, 1),
    b(C, "normalize-space", 0, 1),
    b(C, "normalize-unicode", 1, 2),
    b(C, "translate", 3, 3),
    b(C, "upper-case", 1, 1),
    b(C, "lower-case", 1, 1),
    b(C, "matches", 2, 3),
    b(C, "replace", 3, 4),
    b(C, "tokenize", 1, 3),
    b(C, "analyze-string", 2, 3),
    b(C, "codepoints-to-string", 1, 1),
    b(C, "string-to-codepoints", 1, 1),
    b(C, "compare", 2, 3),
    b(C, "codepoint-equal", 2, 2),
    b(C, "encode-for-uri", 1, 1),
    b(C, "iri-to-uri", 1, 1),
    b(C, "escape-html-uri", 1, 1),
    b(C, "resolve-uri", 1, 2),
    // booleans and numbers
    b(C, "boolean", 1, 1),
    b(C, "not", 1, 1),
    b(C, "true", 0, 0),
    b(C, "false", 0, 0),
    b(C, "number", 0, 1),
    b(C, "sum", 1, 2),
    b(C, "avg", 1, 1),
    b(C, "max", 1, 2),
    b(C, "min", 1, 2),
    b(C, "floor", 1, 1),
    b(C, "ceiling", 1, 1),
    b(C, "round", 1, 2),
    b(C, "round-half-to-even", 1, 2),
    b(C, "abs", 1, 1),
    b(C, "format-number", 2, 3),
    b(C, "format-integer", 2, 3),
    // sequences
    b(C, "empty", 1, 1),
    b(C, "exists", 1, 1),
    b(C, "head", 1, 1),
    b(C, "tail", 1, 1),
    b(C, "distinct-values", 1, 2),
    b(C, "index-of", 2, 3),
    b(C, "insert-before", 3, 3),
    b(C, "remove", 2, 2),
    b(C, "reverse", 1, 1),
    b(C, "subsequence", 2, 3),
    b(C, "unordered", 1, 1),
    b(C, "zero-or-one", 1, 1),
    b(C, "one-or-more", 1, 1),
    b(C, "exactly-one", 1, 1),
    b(C, "deep-equal", 2, 3),
    // higher-order functions
    b(C, "for-each", 2, 2),
    b(C, "filter", 2, 2),
    b(C, "fold-left", 3, 3),
    b(C, "fold-right", 3, 3),
    b(C, "for-each-pair", 3, 3),
    b(C, "sort", 1, 3),
    b(C, "apply", 2, 2),
    b(C, "function-lookup", 2, 2),
    b(C, "function-name", 1, 1),
    b(C, "function-arity", 1, 1),
    // documents, environment and diagnostics
    b(C, "doc", 1, 1),
    b(C, "doc-available", 1, 1),
    b(C, "document", 1, 2),
    b(C, "collection", 0, 1),
    b(C, "unparsed-text", 1, 2),
    b(C, "unparsed-text-available", 1, 2),
    b(C, "unparsed-entity-uri", 1, 1),
    b(C, "parse-xml", 1, 1),
    b(C, "parse-json", 1, 2),
    b(C, "json-doc", 1, 2),
    b(C, "json-to-xml", 1, 2),
    b(C, "xml-to-json", 1, 2),
    b(C, "serialize", 1, 2),
    b(C, "system-property", 1, 1),
    b(C, "element-available", 1, 1),
    b(C, "function-available", 1, 2),
    b(C, "environment-variable", 1, 1),
    b(C, "available-environment-variables", 0, 0),
    b(C, "static-base-uri", 0, 0),
    b(C, "default-collation", 0, 0),
    b(C, "current-date", 0, 0),
    b(C, "current-time", 0, 0),
    b(C, "current-dateTime", 0, 0),
    b(C, "implicit-timezone", 0, 0),
    b(C, "format-date", 2, 5),
    b(C, "format-time", 2, 5),
    b(C, "format-dateTime", 2, 5),
    b(C, "random-number-generator", 0, 1),
    b(C, "error", 0, 3),
    b(C, "trace", 1, 2),
    // qualified names
    b(C, "QName", 2, 2),
    b(C, "resolve-QName", 2, 2),
    b(C, "local-name-from-QName", 1, 1),
    b(C, "prefix-from-QName", 1, 1),
    b(C, "namespace-uri-from-QName", 1, 1),
    b(C, "in-scope-prefixes", 1, 1),
    b(C, "namespace-uri-for-prefix", 2, 2),
    // math:
    b(X, "pi", 0, 0),
    b(X, "exp", 1, 1),
    b(X, "exp10", 1, 1),
    b(X, "log", 1, 1),
    b(X, "log10", 1, 1),
    b(X, "pow", 2, 2),
    b(X, "sqrt", 1, 1),
    b(X, "sin", 1, 1),
    b(X, "cos", 1, 1),
    b(X, "tan", 1, 1),
    b(X, "asin", 1, 1),
    b(X, "acos", 1, 1),
    b(X, "atan", 1, 1),
    b(X, "atan2", 2, 2),
    // map:
    b(M, "merge", 1, 2),
    b(M, "size", 1, 1),
    b(M, "keys", 1, 1),
    b(M, "contains", 2, 2),
    b(M, "get", 2, 2),
    b(M, "find", 2, 2),
    b(M, "put", 3, 3),
    b(M, "entry", 2, 2),
    b(M, "remove", 2, 2),
    b(M, "for-each", 2, 2),
    // array:
    b(A, "size", 1, 1),
    b(A, "get", 2, 2),
    b(A, "put", 3, 3),
    b(A, "append", 2, 2),
    b(A, "subarray", 2, 3),
    b(A, "remove", 2, 2),
    b(A, "insert-before", 3, 3),
    b(A, "head", 1, 1),
    b(A, "tail", 1, 1),
    b(A, "reverse", 1, 1),
    b(A, "join", 1, 1),
    b(A, "for-each", 2, 2),
    b(A, "filter", 2, 2),
    b(A, "fold-left", 3, 3),
    b(A, "fold-right", 3, 3),
    b(A, "for-each-pair", 3, 3),
    b(A, "sort", 1, 3),
    b(A, "flatten", 1, 1),
];

static BUILTIN_INDEX: LazyLock<HashMap<(FunctionNamespace, &'static str), FunctionId>> = LazyLock::new(|| {
    BUILTINS
        .iter()
        .enumerate()
        .map(|(i, spec)| ((spec.ns, spec.local), FunctionId(i as u32)))
        .collect()
});

/// Node-test names that look like calls but are never functions.
const NODE_TEST_NAMES: [&str; 4] = ["comment", "text", "processing-instruction", "node"];

/// Maximum number of custom functions per table.
pub const CUSTOM_CAPACITY: usize = 30;

/// Identifier embedded in `Function` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.index() < BUILTINS.len()
    }

    pub fn from_operand(op: i32) -> Option<Self> {
        u32::try_from(op).ok().map(FunctionId)
    }

    pub fn as_operand(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A function implementation the evaluator can call.
pub trait XPathFunction: Send + Sync {
    fn name(&self) -> &ExpandedName;
    fn arity(&self) -> Arity;
}

/// The implementation handle for a built-in entry.
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    name: ExpandedName,
    arity: Arity,
}

impl XPathFunction for BuiltinFunction {
    fn name(&self) -> &ExpandedName {
        &self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }
}

pub type FunctionConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn XPathFunction>, ErrorSource> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[error("no function is registered under id {0}")]
pub struct UnregisteredFunction(pub FunctionId);

struct CustomEntry {
    name: ExpandedName,
    constructor: FunctionConstructor,
}

/// Name to id resolution for built-in and registered functions.
///
/// Custom registrations take precedence over built-ins of the same name.
#[derive(Default)]
pub struct FunctionTable {
    custom: Vec<CustomEntry>,
    custom_index: HashMap<ExpandedName, FunctionId>,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("builtins", &BUILTINS.len())
            .field("custom", &self.custom.iter().map(|c| c.name.to_string()).collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(ns_uri: Option<&str>) -> &str {
    ns_uri.unwrap_or(FNS)
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtins() -> &'static [BuiltinSpec] {
        BUILTINS
    }

    pub fn builtin_count() -> usize {
        BUILTINS.len()
    }

    pub fn builtin(id: FunctionId) -> Option<&'static BuiltinSpec> {
        BUILTINS.get(id.index())
    }

    /// Resolve a function name. An absent namespace means the core namespace.
    pub fn function_id(&self, local: &str, ns_uri: Option<&str>) -> Option<FunctionId> {
        let ns_uri = normalize(ns_uri);
        if ns_uri == FNS && NODE_TEST_NAMES.contains(&local) {
            return None;
        }
        let name = ExpandedName::new(Some(ns_uri), local);
        if let Some(id) = self.custom_index.get(&name) {
            return Some(*id);
        }
        let ns = FunctionNamespace::from_uri(ns_uri)?;
        BUILTIN_INDEX.get(&(ns, local)).copied()
    }

    /// Register a function. A name that already resolves to a built-in gets
    /// a fresh custom id which shadows the built-in from then on.
    pub fn install_custom_function(
        &mut self,
        name: ExpandedName,
        constructor: FunctionConstructor,
    ) -> Result<FunctionId, CompileError> {
        let name = ExpandedName::new(Some(normalize(name.ns_uri())), &name.local);
        if let Some(id) = self.custom_index.get(&name).copied() {
            let slot = id.index() - BUILTINS.len();
            if let Some(entry) = self.custom.get_mut(slot) {
                entry.constructor = constructor;
            }
            return Ok(id);
        }
        if self.custom.len() >= CUSTOM_CAPACITY {
            return Err(CompileError::FunctionTableFull { capacity: CUSTOM_CAPACITY });
        }
        let id = FunctionId(u32::try_from(BUILTINS.len() + self.custom.len()).unwrap_or(u32::MAX));
        tracing::debug!(%name, %id, "installed custom function");
        self.custom_index.insert(name.clone(), id);
        self.custom.push(CustomEntry { name, constructor });
        Ok(id)
    }

    pub fn instantiate(&self, id: FunctionId) -> Result<Arc<dyn XPathFunction>, CompileError> {
        if let Some(spec) = Self::builtin(id) {
            return Ok(Arc::new(BuiltinFunction {
                name: ExpandedName::new(Some(spec.ns.uri()), spec.local),
                arity: spec.arity,
            }));
        }
        let Some(entry) = self.custom.get(id.index() - BUILTINS.len()) else {
            return Err(CompileError::FunctionConstruction {
                name: id.to_string(),
                source: Arc::new(UnregisteredFunction(id)),
            });
        };
        (entry.constructor)()
            .map_err(|source| CompileError::FunctionConstruction { name: entry.name.to_string(), source })
    }

    /// True if a built-in in any of the four namespaces or a custom function has this local name.
    pub fn is_available(&self, local: &str) -> bool {
        BUILTINS.iter().any(|b| b.local == local) || self.custom.iter().any(|c| &*c.name.local == local)
    }

    pub fn name_of(&self, id: FunctionId) -> Option<ExpandedName> {
        match Self::builtin(id) {
            Some(spec) => Some(ExpandedName::new(Some(spec.ns.uri()), spec.local)),
            None => self.custom.get(id.index() - BUILTINS.len()).map(|c| c.name.clone()),
        }
    }

    /// Declared arity; unknown for custom functions until they are instantiated.
    pub fn arity_of(id: FunctionId) -> Option<Arity> {
        Self::builtin(id).map(|s| s.arity)
    }

    pub fn custom_len(&self) -> usize {
        self.custom.len()
    }
}
