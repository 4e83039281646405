#![forbid(unsafe_code)]

//! The owned serialized element tree.
//!
//! Marshalling produces `Element` values, signing inserts into them, and
//! `Element::from_node` adopts a parsed `roxmltree` subtree so inbound
//! wire documents can be canonicalized and verified. Rendering is
//! deterministic: attributes and namespace declarations keep insertion
//! order, and a declaration is emitted only where it differs from the
//! binding inherited from the ancestors.

use crate::escape;
use crate::qname::QName;
use sigtuna_core::{ns, Error, Result};
use std::collections::BTreeMap;

/// An attribute on a serialized element.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A child of a serialized element, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

/// An owned, namespace-aware XML element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: QName,
    /// Namespace declarations made on this element: (prefix, URI),
    /// empty prefix for the default namespace.
    namespaces: Vec<(String, String)>,
    attributes: Vec<Attribute>,
    children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Declare a namespace binding on this element. A later declaration
    /// for the same prefix replaces the earlier one.
    pub fn declare_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();
        if let Some(slot) = self.namespaces.iter_mut().find(|(p, _)| *p == prefix) {
            slot.1 = uri;
        } else {
            self.namespaces.push((prefix, uri));
        }
    }

    pub fn namespaces(&self) -> &[(String, String)] {
        &self.namespaces
    }

    /// Set an attribute, replacing any existing attribute with the same
    /// qualified name.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attributes.iter_mut().find(|a| a.name == name) {
            attr.value = value;
        } else {
            self.attributes.push(Attribute { name, value });
        }
    }

    /// Look up an attribute value by namespace URI and local name.
    pub fn attribute(&self, namespace_uri: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(namespace_uri, local_name))
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn append_element(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Insert a child element at the given element index (counting only
    /// element children), clamped to the number of elements present.
    pub fn insert_element(&mut self, element_index: usize, child: Element) {
        let mut seen = 0usize;
        let mut at = self.children.len();
        for (i, node) in self.children.iter().enumerate() {
            if matches!(node, XmlNode::Element(_)) {
                if seen == element_index {
                    at = i;
                    break;
                }
                seen += 1;
            }
        }
        self.children.insert(at, XmlNode::Element(child));
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Iterator over child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Find the first child element with the given namespace and local name.
    pub fn find_child(&self, namespace_uri: &str, local_name: &str) -> Option<&Element> {
        self.child_elements()
            .find(|e| e.name.matches(namespace_uri, local_name))
    }

    /// Concatenated direct text content of this element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Render to XML text with no inherited namespace context.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, &BTreeMap::new());
        out
    }

    /// Render with the namespace bindings already in scope at this
    /// element's position.
    pub fn render_into(&self, out: &mut String, inherited: &BTreeMap<String, String>) {
        out.push('<');
        out.push_str(&self.name.qualified());

        let mut scope = inherited.clone();
        for (prefix, uri) in &self.namespaces {
            if scope.get(prefix) == Some(uri) {
                continue;
            }
            if prefix.is_empty() {
                out.push_str(&format!(" xmlns=\"{}\"", escape::escape_attr(uri)));
            } else {
                out.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape::escape_attr(uri)));
            }
            scope.insert(prefix.clone(), uri.clone());
        }

        for attr in &self.attributes {
            out.push_str(&format!(
                " {}=\"{}\"",
                attr.name.qualified(),
                escape::escape_attr(&attr.value)
            ));
        }
        out.push('>');

        for node in &self.children {
            match node {
                XmlNode::Element(e) => e.render_into(out, &scope),
                XmlNode::Text(t) => out.push_str(&escape::escape_text(t)),
            }
        }

        out.push_str("</");
        out.push_str(&self.name.qualified());
        out.push('>');
    }

    /// Adopt a parsed element subtree into an owned tree.
    ///
    /// Namespace declarations are recomputed per element (bindings in
    /// scope on the element that are not inherited from its parent), so
    /// the adopted tree canonicalizes identically to the source.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Element> {
        if !node.is_element() {
            return Err(Error::XmlParse("expected an element node".into()));
        }

        let parent_scope = node
            .parent()
            .filter(|p| p.is_element())
            .map(|p| inscope_namespaces(p))
            .unwrap_or_default();
        Self::adopt(node, &parent_scope)
    }

    fn adopt(node: roxmltree::Node<'_, '_>, parent_scope: &BTreeMap<String, String>) -> Result<Element> {
        let tag = node.tag_name();
        let ns_uri = tag.namespace().unwrap_or("");
        let scope = inscope_namespaces(node);

        let mut name = QName::new(ns_uri, tag.name());
        name.set_prefix(prefix_for(&scope, ns_uri));

        let mut element = Element::new(name);
        for (prefix, uri) in &scope {
            if prefix == "xml" {
                continue;
            }
            if parent_scope.get(prefix) != Some(uri) {
                element.declare_namespace(prefix.clone(), uri.clone());
            }
        }

        for attr in node.attributes() {
            let attr_ns = attr.namespace().unwrap_or("");
            let mut attr_name = QName::new(attr_ns, attr.name());
            if attr_ns == ns::XML {
                attr_name.set_prefix(Some("xml".into()));
            } else if !attr_ns.is_empty() {
                attr_name.set_prefix(prefix_for(&scope, attr_ns));
            }
            element.attributes.push(Attribute {
                name: attr_name,
                value: attr.value().to_string(),
            });
        }

        for child in node.children() {
            if child.is_element() {
                element
                    .children
                    .push(XmlNode::Element(Self::adopt(child, &scope)?));
            } else if child.is_text() {
                if let Some(t) = child.text() {
                    element.children.push(XmlNode::Text(t.to_string()));
                }
            }
            // Comments and processing instructions are not significant
            // to this protocol and are dropped.
        }

        Ok(element)
    }
}

/// All namespace bindings in scope on a parsed element, keyed by prefix
/// (empty string for the default namespace). Closer declarations
/// override more distant ones.
pub fn inscope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut ns_stack: Vec<BTreeMap<String, String>> = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        if n.is_element() {
            let mut level = BTreeMap::new();
            for ns in n.namespaces() {
                level.insert(ns.name().unwrap_or("").to_owned(), ns.uri().to_owned());
            }
            ns_stack.push(level);
        }
        current = n.parent();
    }

    let mut result = BTreeMap::new();
    for level in ns_stack.into_iter().rev() {
        for (prefix, uri) in level {
            if uri.is_empty() {
                result.remove(&prefix);
            } else {
                result.insert(prefix, uri);
            }
        }
    }
    result
}

/// The namespace declarations made on a parsed element itself: its
/// in-scope bindings that are absent from (or differ from) its parent's.
pub fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let parent_scope = node
        .parent()
        .filter(|p| p.is_element())
        .map(|p| inscope_namespaces(p))
        .unwrap_or_default();
    let scope = inscope_namespaces(node);
    scope
        .into_iter()
        .filter(|(prefix, _)| prefix != "xml")
        .filter(|(prefix, uri)| parent_scope.get(prefix) != Some(uri))
        .collect()
}

/// Find a named prefix bound to the given URI in a scope map.
pub fn prefix_for(scope: &BTreeMap<String, String>, uri: &str) -> Option<String> {
    if uri.is_empty() {
        return None;
    }
    // Prefer a named prefix; an element covered only by the default
    // namespace renders unprefixed.
    scope
        .iter()
        .find(|(p, u)| !p.is_empty() && u.as_str() == uri)
        .map(|(p, _)| p.clone())
}

/// A destination document a marshalled tree is rooted in.
#[derive(Debug, Clone, Default)]
pub struct Document {
    root: Option<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Plant an element as the document root, replacing any existing
    /// root element.
    pub fn plant_root(&mut self, root: Element) {
        self.root = Some(root);
    }

    pub fn render(&self) -> String {
        self.root.as_ref().map(Element::render).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(prefix: &str) -> QName {
        QName::with_prefix("urn:example", "Widget", prefix)
    }

    #[test]
    fn render_is_deterministic() {
        let mut e = Element::new(widget("ex"));
        e.declare_namespace("ex", "urn:example");
        e.set_attribute(QName::unqualified("a"), "1");
        e.set_attribute(QName::unqualified("b"), "2");
        e.append_text("hi");
        assert_eq!(
            e.render(),
            r#"<ex:Widget xmlns:ex="urn:example" a="1" b="2">hi</ex:Widget>"#
        );
        assert_eq!(e.render(), e.clone().render());
    }

    #[test]
    fn nested_namespace_declarations_are_deduplicated() {
        let mut child = Element::new(widget("ex"));
        child.declare_namespace("ex", "urn:example");
        let mut parent = Element::new(widget("ex"));
        parent.declare_namespace("ex", "urn:example");
        parent.append_element(child);
        assert_eq!(
            parent.render(),
            r#"<ex:Widget xmlns:ex="urn:example"><ex:Widget></ex:Widget></ex:Widget>"#
        );
    }

    #[test]
    fn attribute_replacement() {
        let mut e = Element::new(widget("ex"));
        e.set_attribute(QName::unqualified("a"), "1");
        e.set_attribute(QName::unqualified("a"), "2");
        assert_eq!(e.attributes().len(), 1);
        assert_eq!(e.attribute("", "a"), Some("2"));
    }

    #[test]
    fn insert_element_by_element_index() {
        let mut e = Element::new(widget("ex"));
        e.append_text("lead");
        e.append_element(Element::new(QName::new("urn:example", "A")));
        e.append_element(Element::new(QName::new("urn:example", "C")));
        e.insert_element(1, Element::new(QName::new("urn:example", "B")));
        let names: Vec<_> = e.child_elements().map(|c| c.name().local_name().to_string()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn adopt_round_trips_through_render() {
        let xml = r#"<ex:Widget xmlns:ex="urn:example" a="1"><ex:Part>v&amp;w</ex:Part></ex:Widget>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let adopted = Element::from_node(doc.root_element()).unwrap();
        assert_eq!(adopted.render(), xml);

        let rendered = adopted.render();
        let reparsed = roxmltree::Document::parse(&rendered).unwrap();
        let again = Element::from_node(reparsed.root_element()).unwrap();
        assert_eq!(adopted, again);
    }

    #[test]
    fn adopt_computes_declarations_per_element() {
        let xml = r#"<a xmlns="urn:a"><b xmlns:c="urn:c"><c:d/></b></a>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let a = Element::from_node(doc.root_element()).unwrap();
        assert_eq!(a.namespaces(), [("".to_string(), "urn:a".to_string())]);
        let b = a.find_child("urn:a", "b").unwrap();
        assert_eq!(b.namespaces(), [("c".to_string(), "urn:c".to_string())]);
        assert!(b.find_child("urn:c", "d").unwrap().namespaces().is_empty());
    }

    #[test]
    fn document_root_replacement() {
        let mut doc = Document::new();
        doc.plant_root(Element::new(QName::new("urn:a", "First")));
        doc.plant_root(Element::new(QName::new("urn:a", "Second")));
        assert_eq!(doc.root().unwrap().name().local_name(), "Second");
    }
}
