use std::collections::HashMap;
use std::sync::Arc;
use string_cache::DefaultAtom as Atom;

use crate::consts::DEFAULT_PREFIXES;

/// Which grammar the compiler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XPathVersion {
    /// Rejects the constructs introduced in 3.0 and 3.1.
    V20,
    #[default]
    V31,
}

/// Maps namespace prefixes to URIs during name resolution.
pub trait NamespaceResolver: Send + Sync {
    fn resolve_prefix(&self, prefix: &str) -> Option<Atom>;
}

#[derive(Debug, Clone)]
pub struct NamespaceBindings {
    by_prefix: HashMap<String, Atom>,
}

impl Default for NamespaceBindings {
    fn default() -> Self {
        Self {
            by_prefix: DEFAULT_PREFIXES.iter().map(|(p, u)| ((*p).to_string(), Atom::from(*u))).collect(),
        }
    }
}

impl NamespaceBindings {
    /// Bind `prefix`. Returns false for the reserved `xml` prefix, which stays bound.
    pub fn bind(&mut self, prefix: impl Into<String>, uri: &str) -> bool {
        let prefix = prefix.into();
        if prefix == "xml" {
            return false;
        }
        self.by_prefix.insert(prefix, Atom::from(uri));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_prefix.iter().map(|(p, u)| (p.as_str(), &**u))
    }
}

impl NamespaceResolver for NamespaceBindings {
    fn resolve_prefix(&self, prefix: &str) -> Option<Atom> {
        self.by_prefix.get(prefix).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub namespaces: NamespaceBindings,
    pub default_element_namespace: Option<Atom>,
    /// Maximum nesting depth of productions before the compile is aborted.
    pub max_depth: usize,
    pub version: XPathVersion,
}

pub const DEFAULT_MAX_DEPTH: usize = 64;

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            namespaces: NamespaceBindings::default(),
            default_element_namespace: None,
            max_depth: DEFAULT_MAX_DEPTH,
            version: XPathVersion::V31,
        }
    }
}

impl CompileOptions {
    pub fn builder() -> CompileOptionsBuilder {
        CompileOptionsBuilder::new()
    }

    pub(crate) fn resolver(&self) -> Arc<dyn NamespaceResolver> {
        Arc::new(self.namespaces.clone())
    }
}

/// Builder for [`CompileOptions`]. Starts from the defaults, with the
/// standard prefixes bound and a nesting limit of 64.
#[derive(Debug, Default)]
pub struct CompileOptionsBuilder {
    options: CompileOptions,
}

impl CompileOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace prefix. Attempts to rebind `xml` are ignored.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: &str) -> Self {
        self.options.namespaces.bind(prefix, uri);
        self
    }

    pub fn with_default_element_namespace(mut self, uri: &str) -> Self {
        self.options.default_element_namespace = Some(Atom::from(uri));
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn with_version(mut self, version: XPathVersion) -> Self {
        self.options.version = version;
        self
    }

    pub fn build(self) -> CompileOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{XML_URI, XS_NS};

    #[test]
    fn xml_prefix_cannot_be_rebound() {
        let options = CompileOptions::builder().with_namespace("xml", "urn:other").build();
        assert_eq!(options.namespaces.resolve_prefix("xml").as_deref(), Some(XML_URI));
    }

    #[test]
    fn defaults_bind_standard_prefixes() {
        let options = CompileOptions::default();
        assert_eq!(options.namespaces.resolve_prefix("xs").as_deref(), Some(XS_NS));
        assert_eq!(options.max_depth, 64);
        assert_eq!(options.version, XPathVersion::V31);
    }
}
