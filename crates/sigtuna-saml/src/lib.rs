#![forbid(unsafe_code)]

//! SAML 2.0 element kinds for the Sigtuna object model.
//!
//! Wires builders, marshallers, and unmarshallers for a working subset
//! of the assertion and protocol vocabularies into the engine
//! registries, plus the schema validators that go with them.

pub mod assertion;
pub mod handlers;
pub mod protocol;
pub mod validators;

use sigtuna_core::ns;
use sigtuna_object::{BuilderRegistry, MarshallerRegistry, UnmarshallerRegistry};
use sigtuna_xml::QName;
use std::sync::Arc;

/// A qualified name in the SAML 2.0 assertion namespace.
pub fn saml_qname(local: &str) -> QName {
    QName::with_prefix(ns::SAML20, local, ns::prefix::SAML20)
}

/// A qualified name in the SAML 2.0 protocol namespace.
pub fn samlp_qname(local: &str) -> QName {
    QName::with_prefix(ns::SAML20P, local, ns::prefix::SAML20P)
}

/// Build registries with every element kind this crate knows wired in.
///
/// This is the element-bundle initialization the engines expect at
/// startup; applications extend the returned registries with their own
/// kinds before constructing engines.
pub fn default_registries() -> (
    Arc<BuilderRegistry>,
    Arc<MarshallerRegistry>,
    Arc<UnmarshallerRegistry>,
) {
    let builders = Arc::new(BuilderRegistry::new());
    let marshallers = Arc::new(MarshallerRegistry::new());
    let unmarshallers = Arc::new(UnmarshallerRegistry::new());
    assertion::register(&builders, &marshallers, &unmarshallers);
    protocol::register(&builders, &marshallers, &unmarshallers);
    (builders, marshallers, unmarshallers)
}

/// Generate a protocol identifier: an underscore followed by 32 hex
/// characters, suitable for `ID` attributes.
pub fn generate_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut id = String::with_capacity(33);
    id.push('_');
    for b in bytes {
        id.push_str(&format!("{b:02x}"));
    }
    id
}
