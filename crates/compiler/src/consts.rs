//! Well-known namespace URIs.

pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
pub const MATH_NS: &str = "http://www.w3.org/2005/xpath-functions/math";
pub const MAP_NS: &str = "http://www.w3.org/2005/xpath-functions/map";
pub const ARRAY_NS: &str = "http://www.w3.org/2005/xpath-functions/array";
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace URI used for W3C-defined XPath/XQuery error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";

/// Prefixes every compiler starts with; `xml` can never be rebound.
pub const DEFAULT_PREFIXES: [(&str, &str); 7] = [
    ("xml", XML_URI),
    ("xs", XS_NS),
    ("fn", FNS),
    ("math", MATH_NS),
    ("map", MAP_NS),
    ("array", ARRAY_NS),
    ("err", ERR_NS),
];
