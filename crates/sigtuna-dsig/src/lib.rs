#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) integration for SAML elements.
//!
//! Produces enveloped signatures over serialized elements and verifies
//! them against a caller-supplied trust set.

pub mod context;
pub mod sign;
pub mod verify;

pub use context::SigningContext;
pub use sign::sign;
pub use verify::{verify, VerifyResult};
