#![forbid(unsafe_code)]

//! The typed object model and marshalling engines.
//!
//! An [`ObjectTree`] holds the in-memory representation of one protocol
//! message as an arena of typed element nodes. Conversion to and from
//! the wire form is driven by the [`MarshallingEngine`] and
//! [`UnmarshallingEngine`], which dispatch to per-element-kind handlers
//! looked up in the builder/marshaller/unmarshaller registries by
//! qualified identity (or schema type, when `xsi:type` substitutes one).

pub mod marshal;
pub mod policy;
pub mod registry;
pub mod tree;
pub mod unmarshal;
pub mod validate;

pub use marshal::{ElementMarshaller, MarshallingEngine, UnknownElementPolicy};
pub use registry::{
    BuilderRegistry, ElementBuilder, MarshallerRegistry, ObjectBuilder, UnmarshallerRegistry,
};
pub use tree::{NodeId, ObjectNode, ObjectTree};
pub use unmarshal::{ElementUnmarshaller, UnmarshallingEngine};
pub use validate::{ValidationError, Validator, ValidatorChain};
pub use policy::{IssuerMetadata, SecurityPolicyContext, SecurityPolicyRule};
