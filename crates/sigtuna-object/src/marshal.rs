#![forbid(unsafe_code)]

//! The marshalling engine: typed element nodes to serialized elements.
//!
//! The engine walks the tree and handles the boilerplate every element
//! kind shares — cache reuse, element creation from the qualified
//! identity, namespace emission, child recursion, `xsi:type`
//! substitution, signing, cache write-back — and delegates
//! attribute/content encoding to the kind's [`ElementMarshaller`] hooks.

use crate::registry::MarshallerRegistry;
use crate::tree::{NodeId, ObjectTree};
use sigtuna_core::{ns, Error, Result};
use sigtuna_xml::{Document, Element, QName};
use std::sync::Arc;
use tracing::debug;

/// What to do with an element that has no registered handler.
///
/// Supplied by the caller when constructing an engine; deliberately not
/// ambient process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownElementPolicy {
    /// Fail the conversion with [`Error::UnknownElement`].
    Fail,
    /// Skip the element; siblings still convert.
    Ignore,
}

/// Per-element-kind marshalling hooks.
///
/// The engine guarantees the node passed to the hooks matches
/// [`ElementMarshaller::target`] by identity or schema type.
pub trait ElementMarshaller: Send + Sync {
    /// The element identity or schema type this marshaller operates on.
    fn target(&self) -> &QName;

    /// Encode the node's attributes onto the serialized element.
    ///
    /// The default copies the node's stored attributes in insertion
    /// order; kinds with richer encodings override.
    fn marshal_attributes(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        for (name, value) in tree.attributes(node) {
            element.set_attribute(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Encode the node's content onto the serialized element. Most
    /// elements carry no text content, so the default does nothing.
    fn marshal_content(
        &self,
        tree: &ObjectTree,
        node: NodeId,
        element: &mut Element,
    ) -> Result<()> {
        let _ = (tree, node, element);
        Ok(())
    }
}

/// The engine converting typed element trees into serialized elements.
pub struct MarshallingEngine {
    marshallers: Arc<MarshallerRegistry>,
    policy: UnknownElementPolicy,
}

impl MarshallingEngine {
    pub fn new(marshallers: Arc<MarshallerRegistry>, policy: UnknownElementPolicy) -> Self {
        Self {
            marshallers,
            policy,
        }
    }

    /// Marshal a node into its serialized form.
    ///
    /// An unmodified, previously-marshalled node returns its cached
    /// form unchanged; callers must not assume a freshly-built value.
    pub fn marshal(&self, tree: &mut ObjectTree, node: NodeId) -> Result<Element> {
        if let Some(cached) = tree.cached(node) {
            debug!(element = %tree.qname(node), "reusing cached serialized form");
            return Ok(cached.clone());
        }

        let qname = tree.qname(node).clone();
        if !qname.is_valid_identity() {
            return Err(Error::InvalidIdentity(qname.to_string()));
        }

        let marshaller = self
            .resolve(tree, node)
            .ok_or_else(|| Error::UnknownElement(qname.to_string()))?;
        self.check_target(marshaller.as_ref(), tree, node)?;

        let mut element = Element::new(qname);
        for (prefix, uri) in tree.namespaces(node) {
            element.declare_namespace(prefix.clone(), uri.clone());
        }

        marshaller.marshal_attributes(tree, node, &mut element)?;

        let children: Vec<NodeId> = tree
            .ordered_children(node)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();
        for child in children {
            if let Some(cached) = tree.cached(child) {
                debug!(element = %tree.qname(child), "child has a cached form, appending it");
                element.append_element(cached.clone());
                continue;
            }
            if self.resolve(tree, child).is_none() {
                match self.policy {
                    UnknownElementPolicy::Fail => {
                        return Err(Error::UnknownElement(tree.qname(child).to_string()))
                    }
                    UnknownElementPolicy::Ignore => {
                        debug!(element = %tree.qname(child), "no marshaller registered, skipping child");
                        continue;
                    }
                }
            }
            let child_element = self.marshal(tree, child)?;
            element.append_element(child_element);
        }

        marshaller.marshal_content(tree, node, &mut element)?;

        if let Some(schema_type) = tree.schema_type(node).cloned() {
            let prefix = schema_type.prefix().ok_or_else(|| {
                Error::InvalidIdentity(format!("schema type {schema_type} has no prefix"))
            })?;
            element.set_attribute(
                QName::with_prefix(ns::XSI, ns::attr::TYPE, ns::prefix::XSI),
                format!("{}:{}", prefix, schema_type.local_name()),
            );
            element.declare_namespace(ns::prefix::XSI, ns::XSI);
            tree.add_namespace(node, ns::prefix::XSI, ns::XSI);
        }

        if tree.signing_context(node).is_none() {
            if let Some((position, signature)) = tree.attached_signature(node).cloned() {
                element.insert_element(position, signature);
            }
        }

        if let Some(context) = tree.signing_context(node).cloned() {
            // Prefixes declared on the node are protected alongside the
            // context's own inclusive set.
            let mut context = context;
            for (prefix, _) in tree.namespaces(node) {
                if !prefix.is_empty() && !context.inclusive_prefixes.contains(prefix) {
                    context.inclusive_prefixes.push(prefix.clone());
                }
            }
            sigtuna_dsig::sign(&mut element, &context)?;
        }

        tree.set_cached(node, element.clone());
        Ok(element)
    }

    /// Marshal a node and, if it is a tree root, plant the result as
    /// the destination document's root, replacing any existing one.
    pub fn marshal_into(
        &self,
        tree: &mut ObjectTree,
        node: NodeId,
        document: &mut Document,
    ) -> Result<Element> {
        let element = self.marshal(tree, node)?;
        if tree.parent(node).is_none() {
            document.plant_root(element.clone());
        }
        Ok(element)
    }

    /// Identity lookup first, schema type as the fallback.
    fn resolve(
        &self,
        tree: &ObjectTree,
        node: NodeId,
    ) -> Option<Arc<dyn ElementMarshaller>> {
        self.marshallers.lookup(tree.qname(node)).or_else(|| {
            tree.schema_type(node)
                .and_then(|schema_type| self.marshallers.lookup(schema_type))
        })
    }

    /// A marshaller invoked on a node it was not constructed for fails
    /// before any output is produced.
    fn check_target(
        &self,
        marshaller: &dyn ElementMarshaller,
        tree: &ObjectTree,
        node: NodeId,
    ) -> Result<()> {
        let target = marshaller.target();
        let matches_type = tree.schema_type(node).is_some_and(|t| t == target);
        if matches_type || tree.qname(node) == target {
            Ok(())
        } else {
            Err(Error::TargetMismatch {
                expected: target.to_string(),
                actual: tree.qname(node).to_string(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod test_kinds {
    //! A minimal element vocabulary for engine tests: a container kind
    //! and a text-carrying kind under `urn:test`.

    use super::*;
    use crate::registry::{
        BuilderRegistry, ElementBuilder, MarshallerRegistry, UnmarshallerRegistry,
    };
    use crate::unmarshal::ElementUnmarshaller;

    pub const TEST_NS: &str = "urn:test";

    pub fn qn(local: &str) -> QName {
        QName::with_prefix(TEST_NS, local, "t")
    }

    pub struct ContainerMarshaller {
        target: QName,
    }

    impl ContainerMarshaller {
        pub fn new(local: &str) -> Self {
            Self { target: qn(local) }
        }
    }

    impl ElementMarshaller for ContainerMarshaller {
        fn target(&self) -> &QName {
            &self.target
        }
    }

    pub struct TextMarshaller {
        target: QName,
    }

    impl TextMarshaller {
        pub fn new(local: &str) -> Self {
            Self { target: qn(local) }
        }
    }

    impl ElementMarshaller for TextMarshaller {
        fn target(&self) -> &QName {
            &self.target
        }

        fn marshal_content(
            &self,
            tree: &ObjectTree,
            node: NodeId,
            element: &mut Element,
        ) -> Result<()> {
            if let Some(text) = tree.text(node) {
                element.append_text(text);
            }
            Ok(())
        }
    }

    pub struct ContainerUnmarshaller {
        target: QName,
    }

    impl ContainerUnmarshaller {
        pub fn new(local: &str) -> Self {
            Self { target: qn(local) }
        }
    }

    impl ElementUnmarshaller for ContainerUnmarshaller {
        fn target(&self) -> &QName {
            &self.target
        }
    }

    pub struct TextUnmarshaller {
        target: QName,
    }

    impl TextUnmarshaller {
        pub fn new(local: &str) -> Self {
            Self { target: qn(local) }
        }
    }

    impl ElementUnmarshaller for TextUnmarshaller {
        fn target(&self) -> &QName {
            &self.target
        }

        fn unmarshal_content(
            &self,
            tree: &mut ObjectTree,
            node: NodeId,
            content: &str,
        ) -> Result<()> {
            tree.set_text(node, content);
            Ok(())
        }
    }

    /// Registries for the test vocabulary: `Box` contains `Item`s.
    pub fn registries() -> (
        Arc<BuilderRegistry>,
        Arc<MarshallerRegistry>,
        Arc<UnmarshallerRegistry>,
    ) {
        let builders = Arc::new(BuilderRegistry::new());
        let marshallers = Arc::new(MarshallerRegistry::new());
        let unmarshallers = Arc::new(UnmarshallerRegistry::new());

        for local in ["Box", "Item"] {
            builders.register(qn(local), Arc::new(ElementBuilder::new(qn(local))));
        }
        marshallers.register(qn("Box"), Arc::new(ContainerMarshaller::new("Box")));
        marshallers.register(qn("Item"), Arc::new(TextMarshaller::new("Item")));
        unmarshallers.register(qn("Box"), Arc::new(ContainerUnmarshaller::new("Box")));
        unmarshallers.register(qn("Item"), Arc::new(TextUnmarshaller::new("Item")));

        (builders, marshallers, unmarshallers)
    }
}

#[cfg(test)]
mod tests {
    use super::test_kinds::*;
    use super::*;
    use crate::tree::ObjectNode;

    fn node(tree: &mut ObjectTree, local: &str) -> NodeId {
        let mut n = ObjectNode::new(qn(local));
        n.declare_namespace("t", TEST_NS);
        tree.insert(n)
    }

    fn engine(policy: UnknownElementPolicy) -> MarshallingEngine {
        let (_, marshallers, _) = registries();
        MarshallingEngine::new(marshallers, policy)
    }

    #[test]
    fn marshal_is_idempotent_on_unmodified_trees() {
        let engine = engine(UnknownElementPolicy::Fail);
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");
        let item = node(&mut tree, "Item");
        tree.append_child(root, item).unwrap();
        tree.set_text(item, "v");

        let first = engine.marshal(&mut tree, root).unwrap();
        let second = engine.marshal(&mut tree, root).unwrap();
        assert_eq!(first.render(), second.render());
        assert_eq!(first, second);
    }

    #[test]
    fn mutation_invalidates_the_cache_up_to_the_root() {
        let engine = engine(UnknownElementPolicy::Fail);
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");
        let item = node(&mut tree, "Item");
        tree.append_child(root, item).unwrap();
        tree.set_text(item, "before");

        let stale = engine.marshal(&mut tree, root).unwrap();
        tree.set_text(item, "after");
        let fresh = engine.marshal(&mut tree, root).unwrap();

        assert!(stale.render().contains("before"));
        assert!(fresh.render().contains("after"));
        assert!(!fresh.render().contains("before"));
    }

    #[test]
    fn target_mismatch_fails_before_output() {
        let marshallers = Arc::new(MarshallerRegistry::new());
        // An Item marshaller registered under Box's identity.
        marshallers.register(qn("Box"), Arc::new(TextMarshaller::new("Item")));
        let engine = MarshallingEngine::new(marshallers, UnknownElementPolicy::Fail);

        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");
        let err = engine.marshal(&mut tree, root).unwrap_err();
        assert!(matches!(err, Error::TargetMismatch { .. }));
        assert!(tree.cached(root).is_none());
    }

    #[test]
    fn unknown_child_respects_policy() {
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");
        let known = node(&mut tree, "Item");
        let unknown = node(&mut tree, "Mystery");
        tree.append_child(root, unknown).unwrap();
        tree.append_child(root, known).unwrap();
        tree.set_text(known, "v");

        let err = engine(UnknownElementPolicy::Fail)
            .marshal(&mut tree, root)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownElement(_)));

        let element = engine(UnknownElementPolicy::Ignore)
            .marshal(&mut tree, root)
            .unwrap();
        assert_eq!(element.child_elements().count(), 1);
        assert_eq!(
            element.child_elements().next().unwrap().name().local_name(),
            "Item"
        );
    }

    #[test]
    fn unknown_root_always_fails() {
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Mystery");
        let err = engine(UnknownElementPolicy::Ignore)
            .marshal(&mut tree, root)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownElement(_)));
    }

    #[test]
    fn schema_type_fallback_dispatch_and_xsi_emission() {
        let (_, marshallers, _) = registries();
        // Register the Box marshaller under a schema type as well.
        marshallers.register(
            QName::with_prefix(TEST_NS, "BoxType", "t"),
            Arc::new(ContainerMarshaller::new("BoxType")),
        );
        let engine = MarshallingEngine::new(marshallers, UnknownElementPolicy::Fail);

        let mut tree = ObjectTree::new();
        // An element identity with no marshaller of its own, carrying
        // an explicit schema type that has one.
        let mut n = ObjectNode::new(qn("Crate"));
        n.declare_namespace("t", TEST_NS);
        let root = tree.insert(n);
        tree.set_schema_type(root, Some(QName::with_prefix(TEST_NS, "BoxType", "t")));

        let element = engine.marshal(&mut tree, root).unwrap();
        assert_eq!(element.attribute(ns::XSI, ns::attr::TYPE), Some("t:BoxType"));
        assert!(element
            .namespaces()
            .contains(&(ns::prefix::XSI.to_string(), ns::XSI.to_string())));
        assert!(tree
            .namespaces(root)
            .contains(&(ns::prefix::XSI.to_string(), ns::XSI.to_string())));
    }

    #[test]
    fn cached_child_is_reused_without_recursion() {
        let engine = engine(UnknownElementPolicy::Fail);
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");
        let item = node(&mut tree, "Item");
        tree.append_child(root, item).unwrap();

        // Pre-cache the child with a distinctive form the marshaller
        // would never produce.
        let mut canned = Element::new(qn("Item"));
        canned.set_attribute(QName::unqualified("canned"), "yes");
        tree.set_cached(item, canned);

        let element = engine.marshal(&mut tree, root).unwrap();
        let child = element.child_elements().next().unwrap();
        assert_eq!(child.attribute("", "canned"), Some("yes"));
    }

    #[test]
    fn root_is_planted_into_the_document() {
        let engine = engine(UnknownElementPolicy::Fail);
        let mut tree = ObjectTree::new();
        let root = node(&mut tree, "Box");

        let mut document = Document::new();
        document.plant_root(Element::new(qn("Old")));
        engine.marshal_into(&mut tree, root, &mut document).unwrap();
        assert_eq!(document.root().unwrap().name().local_name(), "Box");
    }
}
