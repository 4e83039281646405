#![forbid(unsafe_code)]

//! Schema validators for the element kinds this crate registers.
//!
//! Applications compose these into a [`ValidatorChain`] and run them
//! after unmarshalling or before marshalling; the engines never invoke
//! them on their own.

use crate::assertion;
use chrono::DateTime;
use sigtuna_core::ns;
use sigtuna_object::{NodeId, ObjectTree, ValidationError, Validator};

/// An Audience must carry a URI as text content.
pub struct AudienceSchemaValidator;

impl Validator for AudienceSchemaValidator {
    fn validate(&self, tree: &ObjectTree, node: NodeId) -> Result<(), ValidationError> {
        if tree.text(node).is_some_and(|t| !t.trim().is_empty()) {
            Ok(())
        } else {
            Err(ValidationError::new("Audience requires a URI"))
        }
    }
}

/// An Assertion must carry ID, Version, IssueInstant, and an Issuer
/// child.
pub struct AssertionSchemaValidator;

impl Validator for AssertionSchemaValidator {
    fn validate(&self, tree: &ObjectTree, node: NodeId) -> Result<(), ValidationError> {
        for required in [ns::attr::ID, ns::attr::VERSION, ns::attr::ISSUE_INSTANT] {
            if tree.attribute(node, "", required).is_none() {
                return Err(ValidationError::new(format!(
                    "Assertion requires the {required} attribute"
                )));
            }
        }
        let has_issuer = tree
            .ordered_children(node)
            .unwrap_or_default()
            .iter()
            .any(|&child| tree.qname(child) == &assertion::issuer());
        if has_issuer {
            Ok(())
        } else {
            Err(ValidationError::new("Assertion requires an Issuer child"))
        }
    }
}

/// A Conditions validity window must be ordered when both ends are
/// present.
pub struct ConditionsSchemaValidator;

impl Validator for ConditionsSchemaValidator {
    fn validate(&self, tree: &ObjectTree, node: NodeId) -> Result<(), ValidationError> {
        let parse = |name: &str| -> Result<Option<DateTime<chrono::FixedOffset>>, ValidationError> {
            tree.attribute(node, "", name)
                .map(|value| {
                    DateTime::parse_from_rfc3339(value).map_err(|e| {
                        ValidationError::new(format!("{name} is not a valid dateTime: {e}"))
                    })
                })
                .transpose()
        };

        let not_before = parse(ns::attr::NOT_BEFORE)?;
        let not_on_or_after = parse(ns::attr::NOT_ON_OR_AFTER)?;
        if let (Some(start), Some(end)) = (not_before, not_on_or_after) {
            if start >= end {
                return Err(ValidationError::new(
                    "Conditions window is empty: NotBefore is not before NotOnOrAfter",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigtuna_object::ObjectNode;
    use sigtuna_xml::QName;

    #[test]
    fn audience_requires_a_uri() {
        let mut tree = ObjectTree::new();
        let node = tree.insert(ObjectNode::new(assertion::audience()));
        assert!(AudienceSchemaValidator.validate(&tree, node).is_err());

        tree.set_text(node, "https://sp.example.org");
        assert!(AudienceSchemaValidator.validate(&tree, node).is_ok());
    }

    #[test]
    fn assertion_requires_attributes_and_issuer() {
        let mut tree = ObjectTree::new();
        let node = tree.insert(ObjectNode::new(assertion::assertion()));
        assert!(AssertionSchemaValidator.validate(&tree, node).is_err());

        tree.set_attribute(node, QName::unqualified(ns::attr::ID), "_a1");
        tree.set_attribute(node, QName::unqualified(ns::attr::VERSION), "2.0");
        tree.set_attribute(
            node,
            QName::unqualified(ns::attr::ISSUE_INSTANT),
            "2026-08-06T12:00:00Z",
        );
        assert!(AssertionSchemaValidator.validate(&tree, node).is_err());

        let issuer = tree.insert(ObjectNode::new(assertion::issuer()));
        tree.set_text(issuer, "https://idp.example.org");
        tree.append_child(node, issuer).unwrap();
        assert!(AssertionSchemaValidator.validate(&tree, node).is_ok());
    }

    #[test]
    fn conditions_window_must_be_ordered() {
        let mut tree = ObjectTree::new();
        let node = tree.insert(ObjectNode::new(assertion::conditions()));
        assert!(ConditionsSchemaValidator.validate(&tree, node).is_ok());

        tree.set_attribute(
            node,
            QName::unqualified(ns::attr::NOT_BEFORE),
            "2026-08-06T12:05:00Z",
        );
        tree.set_attribute(
            node,
            QName::unqualified(ns::attr::NOT_ON_OR_AFTER),
            "2026-08-06T12:00:00Z",
        );
        assert!(ConditionsSchemaValidator.validate(&tree, node).is_err());

        tree.set_attribute(
            node,
            QName::unqualified(ns::attr::NOT_BEFORE),
            "2026-08-06T11:55:00Z",
        );
        assert!(ConditionsSchemaValidator.validate(&tree, node).is_ok());
    }

    #[test]
    fn validation_does_not_mutate_the_tree() {
        let mut tree = ObjectTree::new();
        let node = tree.insert(ObjectNode::new(assertion::audience()));
        tree.set_text(node, "https://sp.example.org");
        tree.set_cached(node, sigtuna_xml::Element::new(assertion::audience()));

        AudienceSchemaValidator.validate(&tree, node).unwrap();
        assert!(tree.cached(node).is_some());
    }
}
