#![forbid(unsafe_code)]

//! Process-wide handler registries keyed by qualified identity.
//!
//! Registration happens at startup / extension-load time and takes the
//! write lock; lookups run continuously from in-flight conversions and
//! take only the read lock, cloning the handler's `Arc`, so a lookup
//! can never observe a partially-registered entry. The registries hold
//! no policy: a miss is reported to the engine, which applies the
//! caller-supplied unknown-element policy.

use crate::marshal::ElementMarshaller;
use crate::tree::{NodeId, ObjectNode, ObjectTree};
use crate::unmarshal::ElementUnmarshaller;
use parking_lot::RwLock;
use sigtuna_core::{Error, Result};
use sigtuna_xml::QName;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Factory producing an empty typed element node of one concrete kind.
pub trait ObjectBuilder: Send + Sync {
    fn build(&self) -> ObjectNode;
}

/// The generic builder: an empty node carrying the kind's qualified
/// identity, with its namespace declared under the conventional prefix.
pub struct ElementBuilder {
    qname: QName,
}

impl ElementBuilder {
    pub fn new(qname: QName) -> Self {
        Self { qname }
    }
}

impl ObjectBuilder for ElementBuilder {
    fn build(&self) -> ObjectNode {
        let mut node = ObjectNode::new(self.qname.clone());
        if let Some(prefix) = self.qname.prefix() {
            node.declare_namespace(prefix, self.qname.namespace_uri());
        }
        node
    }
}

macro_rules! handler_registry {
    ($name:ident, $handler:path, $what:literal) => {
        #[doc = concat!("Registry of ", $what, " handlers keyed by qualified identity.")]
        #[derive(Default)]
        pub struct $name {
            inner: RwLock<HashMap<QName, Arc<dyn $handler>>>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Register a handler for an identity, replacing any
            /// previous registration.
            pub fn register(&self, identity: QName, handler: Arc<dyn $handler>) {
                debug!(identity = %identity, concat!("registering ", $what));
                self.inner.write().insert(identity, handler);
            }

            /// Look up the handler for an identity.
            pub fn lookup(&self, identity: &QName) -> Option<Arc<dyn $handler>> {
                self.inner.read().get(identity).cloned()
            }

            pub fn contains(&self, identity: &QName) -> bool {
                self.inner.read().contains_key(identity)
            }

            pub fn len(&self) -> usize {
                self.inner.read().len()
            }

            pub fn is_empty(&self) -> bool {
                self.inner.read().is_empty()
            }
        }
    };
}

handler_registry!(BuilderRegistry, ObjectBuilder, "builder");
handler_registry!(MarshallerRegistry, ElementMarshaller, "marshaller");
handler_registry!(UnmarshallerRegistry, ElementUnmarshaller, "unmarshaller");

impl BuilderRegistry {
    /// Build an empty node for the identity and insert it into the
    /// tree. Fails with [`Error::UnknownElement`] when no factory is
    /// registered.
    pub fn build(&self, tree: &mut ObjectTree, identity: &QName) -> Result<NodeId> {
        let builder = self
            .lookup(identity)
            .ok_or_else(|| Error::UnknownElement(identity.to_string()))?;
        Ok(tree.insert(builder.build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qn(local: &str) -> QName {
        QName::with_prefix("urn:test", local, "t")
    }

    #[test]
    fn build_unregistered_identity_fails() {
        let registry = BuilderRegistry::new();
        let mut tree = ObjectTree::new();
        assert!(matches!(
            registry.build(&mut tree, &qn("Nope")),
            Err(Error::UnknownElement(_))
        ));
    }

    #[test]
    fn built_node_carries_identity_and_namespace() {
        let registry = BuilderRegistry::new();
        registry.register(qn("Widget"), Arc::new(ElementBuilder::new(qn("Widget"))));

        let mut tree = ObjectTree::new();
        let id = registry.build(&mut tree, &qn("Widget")).unwrap();
        assert_eq!(tree.qname(id), &qn("Widget"));
        assert_eq!(
            tree.namespaces(id),
            [("t".to_string(), "urn:test".to_string())]
        );
        assert!(tree.ordered_children(id).is_none());
    }

    #[test]
    fn lookup_ignores_prefix() {
        let registry = BuilderRegistry::new();
        registry.register(qn("Widget"), Arc::new(ElementBuilder::new(qn("Widget"))));
        let unprefixed = QName::new("urn:test", "Widget");
        assert!(registry.lookup(&unprefixed).is_some());
    }

    #[test]
    fn registration_is_visible_across_threads() {
        let registry = Arc::new(BuilderRegistry::new());
        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.register(qn("Widget"), Arc::new(ElementBuilder::new(qn("Widget"))));
            })
        };
        writer.join().unwrap();
        assert!(registry.contains(&qn("Widget")));
    }
}
