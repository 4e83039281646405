#![forbid(unsafe_code)]

//! Signing context — the information needed to produce a signature over
//! a serialized element.

use sigtuna_core::algorithm;
use sigtuna_keys::Key;
use std::sync::Arc;

/// Context for signature creation.
///
/// Attached to a typed element node by the application before
/// marshalling and consumed read-only by the signing integration; the
/// engine never mutates it.
#[derive(Clone)]
pub struct SigningContext {
    /// Digest algorithm URI for the reference digest.
    pub digest_algorithm: String,
    /// Signature algorithm URI.
    pub signature_algorithm: String,
    /// The signing key.
    pub key: Arc<Key>,
    /// Optional key name, emitted as `ds:KeyName` so verifiers can look
    /// the key up in their trust set.
    pub key_name: Option<String>,
    /// Namespace prefixes protected by the signature even if not
    /// textually referenced within the signed content.
    pub inclusive_prefixes: Vec<String>,
    /// Child element index at which the `ds:Signature` element is
    /// inserted into the signed element.
    pub signature_position: usize,
}

impl SigningContext {
    /// Create a signing context with the given key and signature
    /// algorithm, digesting with SHA-256.
    pub fn new(key: Arc<Key>, signature_algorithm: impl Into<String>) -> Self {
        Self {
            digest_algorithm: algorithm::SHA256.to_string(),
            signature_algorithm: signature_algorithm.into(),
            key,
            key_name: None,
            inclusive_prefixes: Vec::new(),
            signature_position: 0,
        }
    }

    /// Set the digest algorithm URI.
    pub fn with_digest_algorithm(mut self, uri: impl Into<String>) -> Self {
        self.digest_algorithm = uri.into();
        self
    }

    /// Set the key name emitted with the signature.
    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_name = Some(name.into());
        self
    }

    /// Add a protected namespace prefix.
    pub fn with_inclusive_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.inclusive_prefixes.contains(&prefix) {
            self.inclusive_prefixes.push(prefix);
        }
        self
    }

    /// Set the child index the signature element is inserted at.
    pub fn with_signature_position(mut self, position: usize) -> Self {
        self.signature_position = position;
        self
    }
}

impl std::fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("digest_algorithm", &self.digest_algorithm)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("key", &self.key)
            .field("key_name", &self.key_name)
            .field("inclusive_prefixes", &self.inclusive_prefixes)
            .field("signature_position", &self.signature_position)
            .finish()
    }
}
