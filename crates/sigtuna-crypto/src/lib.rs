#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for SAML signatures, keyed
//! by their XML-DSig algorithm URIs.

pub mod digest;
pub mod sign;

pub use sign::{SignatureAlgorithm, SigningKey};
