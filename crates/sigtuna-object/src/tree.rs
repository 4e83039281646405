#![forbid(unsafe_code)]

//! The arena of typed element nodes.
//!
//! Nodes are referenced by stable [`NodeId`] handles; the parent link is
//! an index, never an owning edge. Every mutating accessor clears the
//! node's cached serialized form and, transitively, the cached form of
//! every ancestor, since an ancestor's serialized form embeds its
//! descendants'.

use sigtuna_dsig::SigningContext;
use sigtuna_xml::{Element, QName};
use sigtuna_core::{Error, Result};

/// Handle to a node inside one [`ObjectTree`].
///
/// Ids are only meaningful within the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One typed element node.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    qname: QName,
    schema_type: Option<QName>,
    parent: Option<NodeId>,
    /// `None` = never had children; `Some(vec![])` = children removed.
    children: Option<Vec<NodeId>>,
    /// Namespace declarations on this node: (prefix, URI).
    namespaces: Vec<(String, String)>,
    /// Generic attribute storage, in insertion order.
    attributes: Vec<(QName, String)>,
    text: Option<String>,
    cached: Option<Element>,
    signing: Option<SigningContext>,
    /// A signature subtree preserved from unmarshalling, with the
    /// element-child index it occupied.
    attached_signature: Option<(usize, Element)>,
}

impl ObjectNode {
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            schema_type: None,
            parent: None,
            children: None,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            text: None,
            cached: None,
            signing: None,
            attached_signature: None,
        }
    }

    /// Declare a namespace on the node before it is inserted into a
    /// tree (builders seed their kind's namespace this way).
    pub fn declare_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();
        if let Some(slot) = self.namespaces.iter_mut().find(|(p, _)| *p == prefix) {
            slot.1 = uri;
        } else {
            self.namespaces.push((prefix, uri));
        }
    }
}

/// The arena holding one message's typed element nodes.
///
/// A tree is owned by exactly one logical conversion at a time; all
/// mutation flows through `&mut self`, so concurrent mutation is
/// unrepresentable. Marshalling an already-cached node performs no
/// mutation.
#[derive(Debug, Default)]
pub struct ObjectTree {
    nodes: Vec<ObjectNode>,
}

impl ObjectTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning its handle.
    pub fn insert(&mut self, node: ObjectNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &ObjectNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ObjectNode {
        &mut self.nodes[id.0]
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn qname(&self, id: NodeId) -> &QName {
        &self.node(id).qname
    }

    pub fn set_qname(&mut self, id: NodeId, qname: QName) {
        self.node_mut(id).qname = qname;
        self.invalidate(id);
    }

    pub fn schema_type(&self, id: NodeId) -> Option<&QName> {
        self.node(id).schema_type.as_ref()
    }

    pub fn set_schema_type(&mut self, id: NodeId, schema_type: Option<QName>) {
        self.node_mut(id).schema_type = schema_type;
        self.invalidate(id);
    }

    // ── Structure ───────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Ordered children, in document order. `None` means the node never
    /// had children, as opposed to having had them removed.
    pub fn ordered_children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.node(id).children.as_deref()
    }

    /// Append a child in document order. The child must not already
    /// have a parent, and must not be an ancestor of the parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if parent == child {
            return Err(Error::Tree("a node cannot be its own child".into()));
        }
        if self.node(child).parent.is_some() {
            return Err(Error::Tree(format!(
                "node {} already has a parent",
                self.qname(child)
            )));
        }
        let mut cursor = self.node(parent).parent;
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(Error::Tree("appending an ancestor would form a cycle".into()));
            }
            cursor = self.node(ancestor).parent;
        }

        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent)
            .children
            .get_or_insert_with(Vec::new)
            .push(child);
        self.invalidate(parent);
        Ok(())
    }

    /// Remove all children, leaving the node in the "children removed"
    /// state. Removed children become parentless roots.
    pub fn clear_children(&mut self, id: NodeId) {
        if let Some(children) = self.node_mut(id).children.replace(Vec::new()) {
            for child in children {
                self.node_mut(child).parent = None;
            }
        }
        self.invalidate(id);
    }

    // ── Namespaces, attributes, content ─────────────────────────────

    pub fn namespaces(&self, id: NodeId) -> &[(String, String)] {
        &self.node(id).namespaces
    }

    pub fn add_namespace(&mut self, id: NodeId, prefix: impl Into<String>, uri: impl Into<String>) {
        self.node_mut(id).declare_namespace(prefix, uri);
        self.invalidate(id);
    }

    /// Replace the node's namespace declarations wholesale (the
    /// unmarshalling engine records exactly the wire's declarations).
    pub fn set_namespaces(&mut self, id: NodeId, namespaces: Vec<(String, String)>) {
        self.node_mut(id).namespaces = namespaces;
        self.invalidate(id);
    }

    pub fn attributes(&self, id: NodeId) -> &[(QName, String)] {
        &self.node(id).attributes
    }

    pub fn attribute(&self, id: NodeId, namespace_uri: &str, local_name: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(name, _)| name.matches(namespace_uri, local_name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing attribute with the same
    /// qualified name.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: impl Into<String>) {
        let value = value.into();
        let node = self.node_mut(id);
        if let Some(slot) = node.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            node.attributes.push((name, value));
        }
        self.invalidate(id);
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).text = Some(text.into());
        self.invalidate(id);
    }

    // ── Cached serialized form ──────────────────────────────────────

    pub fn cached(&self, id: NodeId) -> Option<&Element> {
        self.node(id).cached.as_ref()
    }

    /// Record the serialized form produced by marshalling. Unlike the
    /// mutating accessors this does not invalidate ancestors.
    pub fn set_cached(&mut self, id: NodeId, element: Element) {
        self.node_mut(id).cached = Some(element);
    }

    /// Drop the cached form of this node and of every ancestor.
    pub fn invalidate(&mut self, id: NodeId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            self.node_mut(current).cached = None;
            cursor = self.node(current).parent;
        }
    }

    // ── Signing state ───────────────────────────────────────────────

    pub fn signing_context(&self, id: NodeId) -> Option<&SigningContext> {
        self.node(id).signing.as_ref()
    }

    /// Attach or clear the signing context. Presence signals "must be
    /// signed on next marshal".
    pub fn set_signing_context(&mut self, id: NodeId, context: Option<SigningContext>) {
        self.node_mut(id).signing = context;
        self.invalidate(id);
    }

    pub fn attached_signature(&self, id: NodeId) -> Option<&(usize, Element)> {
        self.node(id).attached_signature.as_ref()
    }

    pub fn set_attached_signature(&mut self, id: NodeId, signature: Option<(usize, Element)>) {
        self.node_mut(id).attached_signature = signature;
        self.invalidate(id);
    }

    // ── Comparison ──────────────────────────────────────────────────

    /// Structural equality of two subtrees: identity, schema type,
    /// attributes, namespace declarations, text, and ordered children.
    pub fn subtree_eq(a: &ObjectTree, a_id: NodeId, b: &ObjectTree, b_id: NodeId) -> bool {
        let an = a.node(a_id);
        let bn = b.node(b_id);
        // Namespace declarations are a set of bindings; declaration
        // order carries no meaning.
        let a_ns: std::collections::BTreeSet<_> = an.namespaces.iter().collect();
        let b_ns: std::collections::BTreeSet<_> = bn.namespaces.iter().collect();
        if an.qname != bn.qname
            || an.schema_type != bn.schema_type
            || an.attributes != bn.attributes
            || a_ns != b_ns
            || an.text != bn.text
        {
            return false;
        }
        match (&an.children, &bn.children) {
            (None, None) => true,
            (Some(ac), Some(bc)) => {
                ac.len() == bc.len()
                    && ac
                        .iter()
                        .zip(bc.iter())
                        .all(|(&ai, &bi)| Self::subtree_eq(a, ai, b, bi))
            }
            _ => false,
        }
    }
}
