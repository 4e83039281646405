#![forbid(unsafe_code)]

//! Key material and the trust store consumed by signature verification.

pub mod key;
pub mod manager;

pub use key::{Key, KeyData, KeyUsage};
pub use manager::KeysManager;
