#![forbid(unsafe_code)]

//! Core types shared across the Sigtuna SAML library.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
