#![forbid(unsafe_code)]

//! Per-message security policy evaluation state.
//!
//! A context is created once per inbound message, mutated incrementally
//! by an ordered chain of policy rules, and discarded after the message
//! is fully evaluated. The rule chain itself is application territory;
//! this module defines its boundary.

use crate::tree::{NodeId, ObjectTree};
use chrono::{DateTime, Utc};
use sigtuna_core::Result;
use std::sync::Weak;

/// Metadata describing a message issuer in the role it is operating in.
pub trait IssuerMetadata: Send + Sync {
    /// The issuer's entity identifier.
    fn entity_id(&self) -> &str;
}

/// Mutable trust-evaluation state threaded through the policy rules for
/// one inbound message.
#[derive(Default)]
pub struct SecurityPolicyContext {
    /// Metadata for the message issuer, as determined by earlier rules.
    /// Held weakly: looked up in a metadata store, never owned here.
    pub issuer_metadata: Option<Weak<dyn IssuerMetadata>>,
    /// Date and time of message issuance.
    pub issue_instant: Option<DateTime<Utc>>,
    /// Message identifier.
    pub message_id: Option<String>,
}

impl SecurityPolicyContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for SecurityPolicyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityPolicyContext")
            .field("has_issuer_metadata", &self.issuer_metadata.is_some())
            .field("issue_instant", &self.issue_instant)
            .field("message_id", &self.message_id)
            .finish()
    }
}

/// One rule in the ordered evaluation chain.
pub trait SecurityPolicyRule: Send + Sync {
    /// Evaluate the rule against an unmarshalled message, updating the
    /// context. An error rejects the entire message.
    fn evaluate(
        &self,
        tree: &ObjectTree,
        message: NodeId,
        context: &mut SecurityPolicyContext,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticMetadata(String);

    impl IssuerMetadata for StaticMetadata {
        fn entity_id(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn metadata_reference_does_not_keep_the_store_alive() {
        let mut context = SecurityPolicyContext::new();
        let stored: Arc<dyn IssuerMetadata> =
            Arc::new(StaticMetadata("https://idp.example.org".into()));
        context.issuer_metadata = Some(Arc::downgrade(&stored));

        let resolved = context.issuer_metadata.as_ref().unwrap().upgrade().unwrap();
        assert_eq!(resolved.entity_id(), "https://idp.example.org");

        drop(stored);
        drop(resolved);
        assert!(context.issuer_metadata.as_ref().unwrap().upgrade().is_none());
    }
}
