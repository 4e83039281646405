#![forbid(unsafe_code)]

//! XML building blocks for the Sigtuna SAML library.
//!
//! Provides the qualified-name type used as the dispatch key everywhere,
//! an owned, mutable element tree that marshalling produces and signing
//! operates on, and a parse-side wrapper over `roxmltree`.

pub mod document;
pub mod element;
pub mod escape;
pub mod qname;

pub use document::XmlDocument;
pub use element::{
    declared_namespaces, inscope_namespaces, prefix_for, Attribute, Document, Element, XmlNode,
};
pub use qname::QName;

/// Return the roxmltree parsing options used throughout the library.
///
/// DTDs are rejected: the five predefined entities are all a federation
/// protocol message may use, and accepting DTDs from peers invites
/// entity-expansion mischief.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
