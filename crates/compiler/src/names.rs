use core::fmt;
use string_cache::DefaultAtom as Atom;

/// A namespace-qualified name after prefix resolution. Both parts are interned atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<Atom>,
    pub local: Atom,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self { ns_uri: ns_uri.map(Atom::from), local: Atom::from(local) }
    }

    /// Name without a namespace.
    pub fn local(local: &str) -> Self {
        Self::new(None, local)
    }

    pub fn ns_uri(&self) -> Option<&str> {
        self.ns_uri.as_deref()
    }

    pub fn is_in(&self, ns_uri: &str) -> bool {
        self.ns_uri.as_deref() == Some(ns_uri)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Lexical shape of a name lexeme before the prefix is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexicalName<'a> {
    Local(&'a str),
    Prefixed { prefix: &'a str, local: &'a str },
    UriQualified { uri: &'a str, local: &'a str },
}

impl<'a> LexicalName<'a> {
    /// Split a lexeme such as `p:l`, `Q{uri}l` or `l`. Wildcard forms are not names.
    pub(crate) fn parse(lexeme: &'a str) -> Option<Self> {
        if let Some(rest) = lexeme.strip_prefix("Q{") {
            let (uri, local) = rest.split_once('}')?;
            return is_ncname(local).then_some(Self::UriQualified { uri, local });
        }
        match lexeme.split_once(':') {
            Some((prefix, local)) if is_ncname(prefix) && is_ncname(local) => {
                Some(Self::Prefixed { prefix, local })
            }
            Some(_) => None,
            None => is_ncname(lexeme).then_some(Self::Local(lexeme)),
        }
    }

    pub(crate) fn local_part(&self) -> &'a str {
        match self {
            Self::Local(local)
            | Self::Prefixed { local, .. }
            | Self::UriQualified { local, .. } => local,
        }
    }

    pub(crate) fn is_unprefixed(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

pub(crate) fn is_name_start_char(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || matches!(c, '-' | '.' | '\u{B7}') || c.is_alphanumeric()
}

pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => chars.all(is_name_char),
        _ => false,
    }
}

/// True for lexemes that can only be a (possibly qualified) name.
pub(crate) fn is_name_lexeme(s: &str) -> bool {
    LexicalName::parse(s).is_some()
}
