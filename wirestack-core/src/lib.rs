//! Wirestack Core Library
//!
//! This crate provides the error types and the reusable TLV (option list)
//! machinery shared by the wirestack packet crates.

pub mod error;
pub mod options;

// Re-export commonly used types
pub use error::{Error, Result};
pub use options::{ListSyntax, Tlv, TlvList};
