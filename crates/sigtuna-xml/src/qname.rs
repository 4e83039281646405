#![forbid(unsafe_code)]

//! Qualified names: the (namespace URI, local name, prefix) triple used
//! to identify elements, attributes, and schema types.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A namespace-qualified name.
///
/// Equality and hashing consider only the namespace URI and local name;
/// the prefix is presentational and never participates in dispatch.
#[derive(Debug, Clone)]
pub struct QName {
    namespace_uri: String,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// Create a qualified name without a prefix.
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    /// Create a qualified name with a conventional prefix.
    pub fn with_prefix(
        namespace_uri: impl Into<String>,
        local_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// Create an unqualified name (attributes without a namespace).
    pub fn unqualified(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Replace the presentational prefix.
    pub fn set_prefix(&mut self, prefix: Option<String>) {
        self.prefix = prefix;
    }

    /// Whether this name can identify an element or schema type: both
    /// the namespace URI and the local name must be non-empty.
    pub fn is_valid_identity(&self) -> bool {
        !self.namespace_uri.is_empty() && !self.local_name.is_empty()
    }

    /// The name as it appears in a start tag: `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) if !p.is_empty() => format!("{}:{}", p, self.local_name),
            _ => self.local_name.clone(),
        }
    }

    /// Whether this name matches the given namespace URI and local name.
    pub fn matches(&self, namespace_uri: &str, local_name: &str) -> bool {
        self.namespace_uri == namespace_uri && self.local_name == local_name
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace_uri, self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn prefix_does_not_affect_equality() {
        let a = QName::new("urn:example", "Widget");
        let b = QName::with_prefix("urn:example", "Widget", "ex");
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn differing_namespace_is_unequal() {
        let a = QName::new("urn:example", "Widget");
        let b = QName::new("urn:other", "Widget");
        assert_ne!(a, b);
    }

    #[test]
    fn qualified_form() {
        assert_eq!(QName::new("urn:x", "A").qualified(), "A");
        assert_eq!(QName::with_prefix("urn:x", "A", "p").qualified(), "p:A");
    }

    #[test]
    fn identity_requires_namespace_and_name() {
        assert!(QName::new("urn:x", "A").is_valid_identity());
        assert!(!QName::new("", "A").is_valid_identity());
        assert!(!QName::new("urn:x", "").is_valid_identity());
    }
}
