#![forbid(unsafe_code)]

/// Errors produced by the Sigtuna SAML library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid qualified identity: {0}")]
    InvalidIdentity(String),

    #[error("no registered handler for element: {0}")]
    UnknownElement(String),

    #[error("handler for {expected} invoked on {actual}")]
    TargetMismatch { expected: String, actual: String },

    #[error("malformed attribute value: {0}")]
    AttributeFormat(String),

    #[error("malformed element content: {0}")]
    ContentFormat(String),

    #[error("invalid tree operation: {0}")]
    Tree(String),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("base64 decode error: {0}")]
    Base64(String),
}

pub type Result<T> = std::result::Result<T, Error>;
