#![forbid(unsafe_code)]

//! The unmarshalling engine: parsed wire elements to typed element
//! nodes.
//!
//! The dispatch key is the element's resolved `xsi:type` when present,
//! else its qualified name; the same key selects the builder and the
//! unmarshaller. The engine copies namespace declarations, routes
//! attributes and content through the kind's [`ElementUnmarshaller`]
//! hooks, recurses over child elements in document order, and preserves
//! `ds:Signature` subtrees opaquely for later verification or
//! re-marshalling.

use crate::marshal::UnknownElementPolicy;
use crate::registry::{BuilderRegistry, UnmarshallerRegistry};
use crate::tree::{NodeId, ObjectTree};
use sigtuna_core::{ns, Error, Result};
use sigtuna_xml::{declared_namespaces, inscope_namespaces, prefix_for, Element, QName};
use std::sync::Arc;
use tracing::debug;

/// Per-element-kind unmarshalling hooks.
///
/// Defaults store wire data generically; kinds with stricter schemas
/// override to validate formats before storing.
pub trait ElementUnmarshaller: Send + Sync {
    /// The element identity or schema type this unmarshaller operates on.
    fn target(&self) -> &QName;

    /// Decode one attribute. The default stores it on the node as-is.
    fn unmarshal_attribute(
        &self,
        tree: &mut ObjectTree,
        node: NodeId,
        name: &QName,
        value: &str,
    ) -> Result<()> {
        tree.set_attribute(node, name.clone(), value);
        Ok(())
    }

    /// Attach an unmarshalled child. The default appends in document
    /// order.
    fn unmarshal_child(&self, tree: &mut ObjectTree, parent: NodeId, child: NodeId) -> Result<()> {
        tree.append_child(parent, child)
    }

    /// Decode element text content. Invoked only when the element has
    /// text and no element children; the default ignores it.
    fn unmarshal_content(&self, tree: &mut ObjectTree, node: NodeId, content: &str) -> Result<()> {
        let _ = (tree, node, content);
        Ok(())
    }
}

/// The engine converting parsed wire elements into typed element trees.
pub struct UnmarshallingEngine {
    builders: Arc<BuilderRegistry>,
    unmarshallers: Arc<UnmarshallerRegistry>,
    policy: UnknownElementPolicy,
}

impl UnmarshallingEngine {
    pub fn new(
        builders: Arc<BuilderRegistry>,
        unmarshallers: Arc<UnmarshallerRegistry>,
        policy: UnknownElementPolicy,
    ) -> Self {
        Self {
            builders,
            unmarshallers,
            policy,
        }
    }

    /// Unmarshal a parsed element into the tree, returning the new
    /// node's handle.
    ///
    /// The root of a conversion always fails hard on a missing handler;
    /// the unknown-element policy applies to children, whose siblings
    /// keep converting under [`UnknownElementPolicy::Ignore`].
    pub fn unmarshal(&self, tree: &mut ObjectTree, source: roxmltree::Node<'_, '_>) -> Result<NodeId> {
        if !source.is_element() {
            return Err(Error::XmlParse("expected an element node".into()));
        }

        let scope = inscope_namespaces(source);
        let tag = source.tag_name();
        let mut element_qname = QName::new(tag.namespace().unwrap_or(""), tag.name());
        element_qname.set_prefix(prefix_for(&scope, tag.namespace().unwrap_or("")));
        if !element_qname.is_valid_identity() {
            return Err(Error::InvalidIdentity(element_qname.to_string()));
        }

        let xsi_type = resolve_xsi_type(source, &scope)?;
        let dispatch = xsi_type.clone().unwrap_or_else(|| element_qname.clone());
        debug!(element = %element_qname, key = %dispatch, "unmarshalling element");

        let node = self.builders.build(tree, &dispatch)?;
        let unmarshaller = self
            .unmarshallers
            .lookup(&dispatch)
            .ok_or_else(|| Error::UnknownElement(dispatch.to_string()))?;
        if unmarshaller.target() != &dispatch {
            return Err(Error::TargetMismatch {
                expected: unmarshaller.target().to_string(),
                actual: dispatch.to_string(),
            });
        }

        // The wire form wins over builder defaults: its qualified name
        // (prefix included) and exactly its namespace declarations.
        tree.set_qname(node, element_qname);
        tree.set_namespaces(node, declared_namespaces(source));
        if let Some(schema_type) = xsi_type {
            tree.set_schema_type(node, Some(schema_type));
        }

        for attr in source.attributes() {
            let attr_ns = attr.namespace().unwrap_or("");
            if attr_ns == ns::XSI && attr.name() == ns::attr::TYPE {
                continue;
            }
            let mut name = QName::new(attr_ns, attr.name());
            if attr_ns == ns::XML {
                name.set_prefix(Some("xml".into()));
            } else if !attr_ns.is_empty() {
                name.set_prefix(prefix_for(&scope, attr_ns));
            }
            unmarshaller.unmarshal_attribute(tree, node, &name, attr.value())?;
        }

        let mut has_element_children = false;
        let mut appended = 0usize;
        for child in source.children() {
            if !child.is_element() {
                continue;
            }
            has_element_children = true;

            let child_tag = child.tag_name();
            if child_tag.namespace() == Some(ns::DSIG) && child_tag.name() == ns::node::SIGNATURE {
                let signature = Element::from_node(child)?;
                tree.set_attached_signature(node, Some((appended, signature)));
                continue;
            }

            match self.unmarshal(tree, child) {
                Ok(child_node) => {
                    unmarshaller.unmarshal_child(tree, node, child_node)?;
                    appended += 1;
                }
                Err(Error::UnknownElement(name)) if self.policy == UnknownElementPolicy::Ignore => {
                    debug!(element = %name, "no handler registered, skipping child element");
                }
                Err(e) => return Err(e),
            }
        }

        if !has_element_children {
            let content = collect_text(source);
            if !content.trim().is_empty() {
                unmarshaller.unmarshal_content(tree, node, &content)?;
            }
        }

        Ok(node)
    }
}

/// Resolve an `xsi:type` attribute value against the in-scope
/// namespace bindings.
fn resolve_xsi_type(
    source: roxmltree::Node<'_, '_>,
    scope: &std::collections::BTreeMap<String, String>,
) -> Result<Option<QName>> {
    let Some(value) = source
        .attributes()
        .find(|a| a.namespace() == Some(ns::XSI) && a.name() == ns::attr::TYPE)
        .map(|a| a.value())
    else {
        return Ok(None);
    };

    let (prefix, local) = match value.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, value),
    };
    let uri = scope.get(prefix.unwrap_or("")).ok_or_else(|| {
        Error::AttributeFormat(format!(
            "xsi:type '{value}' uses a prefix with no in-scope binding"
        ))
    })?;

    Ok(Some(match prefix {
        Some(p) => QName::with_prefix(uri, local, p),
        None => QName::new(uri, local),
    }))
}

fn collect_text(source: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in source.children() {
        if child.is_text() {
            if let Some(t) = child.text() {
                out.push_str(t);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::test_kinds::*;
    use crate::marshal::MarshallingEngine;
    use crate::registry::ElementBuilder;
    use crate::tree::ObjectTree;

    fn engines(policy: UnknownElementPolicy) -> (UnmarshallingEngine, MarshallingEngine) {
        let (builders, marshallers, unmarshallers) = registries();
        (
            UnmarshallingEngine::new(builders, unmarshallers, policy),
            MarshallingEngine::new(marshallers, policy),
        )
    }

    fn unmarshal_str(
        engine: &UnmarshallingEngine,
        tree: &mut ObjectTree,
        xml: &str,
    ) -> Result<NodeId> {
        let doc = roxmltree::Document::parse(xml).unwrap();
        engine.unmarshal(tree, doc.root_element())
    }

    #[test]
    fn child_order_is_preserved() {
        let (engine, _) = engines(UnknownElementPolicy::Fail);
        let xml = r#"<t:Box xmlns:t="urn:test"><t:Item>A</t:Item><t:Item>B</t:Item><t:Item>C</t:Item></t:Box>"#;
        let mut tree = ObjectTree::new();
        let root = unmarshal_str(&engine, &mut tree, xml).unwrap();

        let children = tree.ordered_children(root).unwrap().to_vec();
        let texts: Vec<_> = children
            .iter()
            .map(|&c| tree.text(c).unwrap().to_string())
            .collect();
        assert_eq!(texts, ["A", "B", "C"]);
    }

    #[test]
    fn round_trip_reconstructs_the_tree() {
        let (unmarshaller, marshaller) = engines(UnknownElementPolicy::Fail);
        let mut original = ObjectTree::new();
        let root = {
            let mut n = crate::tree::ObjectNode::new(qn("Box"));
            n.declare_namespace("t", TEST_NS);
            original.insert(n)
        };
        original.set_attribute(root, QName::unqualified("label"), "l1");
        let item = original.insert(crate::tree::ObjectNode::new(qn("Item")));
        original.append_child(root, item).unwrap();
        original.set_text(item, "urn:example:audience");

        let wire = marshaller.marshal(&mut original, root).unwrap().render();

        let doc = roxmltree::Document::parse(&wire).unwrap();
        let mut rebuilt = ObjectTree::new();
        let rebuilt_root = unmarshaller.unmarshal(&mut rebuilt, doc.root_element()).unwrap();

        assert!(ObjectTree::subtree_eq(&original, root, &rebuilt, rebuilt_root));
    }

    #[test]
    fn text_only_element_round_trips_exactly() {
        let (unmarshaller, marshaller) = engines(UnknownElementPolicy::Fail);
        let xml = r#"<t:Item xmlns:t="urn:test">urn:example:audience</t:Item>"#;
        let mut tree = ObjectTree::new();
        let node = unmarshal_str(&unmarshaller, &mut tree, xml).unwrap();
        assert_eq!(tree.text(node), Some("urn:example:audience"));
        assert!(tree.attributes(node).is_empty());

        let out = marshaller.marshal(&mut tree, node).unwrap().render();
        assert_eq!(out, xml);
    }

    #[test]
    fn unknown_child_respects_policy() {
        let xml = r#"<t:Box xmlns:t="urn:test"><t:Mystery/><t:Item>A</t:Item></t:Box>"#;

        let (strict, _) = engines(UnknownElementPolicy::Fail);
        let mut tree = ObjectTree::new();
        assert!(matches!(
            unmarshal_str(&strict, &mut tree, xml),
            Err(Error::UnknownElement(_))
        ));

        let (permissive, _) = engines(UnknownElementPolicy::Ignore);
        let mut tree = ObjectTree::new();
        let root = unmarshal_str(&permissive, &mut tree, xml).unwrap();
        let children = tree.ordered_children(root).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.text(children[0]), Some("A"));
    }

    #[test]
    fn unknown_root_fails_even_in_permissive_mode() {
        let (permissive, _) = engines(UnknownElementPolicy::Ignore);
        let mut tree = ObjectTree::new();
        assert!(matches!(
            unmarshal_str(&permissive, &mut tree, r#"<t:Mystery xmlns:t="urn:test"/>"#),
            Err(Error::UnknownElement(_))
        ));
    }

    #[test]
    fn xsi_type_overrides_dispatch() {
        let (builders, marshallers, unmarshallers) = registries();
        let type_qname = QName::with_prefix(TEST_NS, "ItemType", "t");
        builders.register(type_qname.clone(), Arc::new(ElementBuilder::new(qn("Item"))));
        unmarshallers.register(type_qname.clone(), Arc::new(TextUnmarshaller::new("ItemType")));
        let engine = UnmarshallingEngine::new(builders, unmarshallers, UnknownElementPolicy::Fail);
        let _ = marshallers;

        // "Thing" has no handlers of its own; the xsi:type dispatches it.
        let xml = r#"<t:Thing xmlns:t="urn:test" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="t:ItemType">v</t:Thing>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let mut tree = ObjectTree::new();
        let node = engine.unmarshal(&mut tree, doc.root_element()).unwrap();

        assert_eq!(tree.qname(node).local_name(), "Thing");
        assert_eq!(tree.schema_type(node), Some(&type_qname));
        assert_eq!(tree.text(node), Some("v"));
    }

    #[test]
    fn unresolvable_xsi_type_prefix_is_malformed() {
        let (engine, _) = engines(UnknownElementPolicy::Fail);
        let xml = r#"<t:Item xmlns:t="urn:test" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="nope:ItemType">v</t:Item>"#;
        let mut tree = ObjectTree::new();
        assert!(matches!(
            unmarshal_str(&engine, &mut tree, xml),
            Err(Error::AttributeFormat(_))
        ));
    }

    #[test]
    fn signature_child_is_preserved_and_remarshalled() {
        let (unmarshaller, marshaller) = engines(UnknownElementPolicy::Fail);
        let xml = concat!(
            r#"<t:Box xmlns:t="urn:test" ID="_b1">"#,
            r#"<t:Item>A</t:Item>"#,
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">opaque</ds:Signature>"#,
            r#"<t:Item>B</t:Item>"#,
            r#"</t:Box>"#
        );
        let mut tree = ObjectTree::new();
        let root = unmarshal_str(&unmarshaller, &mut tree, xml).unwrap();

        // The signature is not dispatched through the registries.
        assert_eq!(tree.ordered_children(root).unwrap().len(), 2);
        let (position, signature) = tree.attached_signature(root).unwrap();
        assert_eq!(*position, 1);
        assert_eq!(signature.name().local_name(), "Signature");

        let out = marshaller.marshal(&mut tree, root).unwrap().render();
        assert_eq!(out, xml);
    }
}
