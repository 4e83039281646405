#![forbid(unsafe_code)]

//! The validation framework.
//!
//! Validators are pure checks over a typed element node, invoked by the
//! application after unmarshalling and/or before marshalling — never
//! automatically by the engines. A container's validator may recurse
//! into child validators but is not required to.

use crate::tree::{NodeId, ObjectTree};

/// A schema-shape or business-rule violation, reported to the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A pluggable, pure check over one typed element node.
pub trait Validator: Send + Sync {
    fn validate(&self, tree: &ObjectTree, node: NodeId) -> Result<(), ValidationError>;
}

/// An ordered list of validators, applied until the first failure.
#[derive(Default)]
pub struct ValidatorChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Validator for ValidatorChain {
    fn validate(&self, tree: &ObjectTree, node: NodeId) -> Result<(), ValidationError> {
        for validator in &self.validators {
            validator.validate(tree, node)?;
        }
        Ok(())
    }
}
