#![forbid(unsafe_code)]

//! Key types and data structures.

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Any,
}

/// The underlying key data.
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    EcP384 {
        private: Option<p384::ecdsa::SigningKey>,
        public: p384::ecdsa::VerifyingKey,
    },
    Hmac(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
            Self::EcP256 { private, .. } => {
                if private.is_some() {
                    write!(f, "EC P-256 private+public key")
                } else {
                    write!(f, "EC P-256 public key")
                }
            }
            Self::EcP384 { private, .. } => {
                if private.is_some() {
                    write!(f, "EC P-384 private+public key")
                } else {
                    write!(f, "EC P-384 public key")
                }
            }
            Self::Hmac(k) => write!(f, "HMAC key ({} bytes)", k.len()),
        }
    }
}

/// A named key with associated data.
#[derive(Debug)]
pub struct Key {
    /// Optional name for key lookup (matched against `ds:KeyName`).
    pub name: Option<String>,
    /// The key data.
    pub data: KeyData,
    /// The intended usage.
    pub usage: KeyUsage,
    /// Optional X.509 certificate chain (DER-encoded), carried opaquely
    /// for `ds:X509Certificate` emission.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    /// Create a new key.
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a DER-encoded X.509 certificate.
    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.x509_chain.push(der);
        self
    }

    /// Whether this key can be used for the given purpose.
    pub fn allows(&self, usage: KeyUsage) -> bool {
        self.usage == usage || self.usage == KeyUsage::Any
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    pub fn to_signing_key(&self) -> Option<sigtuna_crypto::SigningKey> {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => {
                Some(sigtuna_crypto::SigningKey::Rsa(pk.clone()))
            }
            KeyData::Rsa { public, .. } => {
                Some(sigtuna_crypto::SigningKey::RsaPublic(public.clone()))
            }
            KeyData::EcP256 { private: Some(sk), .. } => {
                Some(sigtuna_crypto::SigningKey::EcP256(sk.clone()))
            }
            KeyData::EcP256 { public, .. } => {
                Some(sigtuna_crypto::SigningKey::EcP256Public(*public))
            }
            KeyData::EcP384 { private: Some(sk), .. } => {
                Some(sigtuna_crypto::SigningKey::EcP384(sk.clone()))
            }
            KeyData::EcP384 { public, .. } => {
                Some(sigtuna_crypto::SigningKey::EcP384Public(*public))
            }
            KeyData::Hmac(k) => Some(sigtuna_crypto::SigningKey::Hmac(k.clone())),
        }
    }
}
