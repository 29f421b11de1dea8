//! Error types for wirestack
//!
//! Every fallible operation in the packet crates reports one of these
//! variants. An unrecognized next-protocol hint is deliberately not an
//! error: the demultiplexer downgrades it to a raw payload instead.

use thiserror::Error;

/// Result type alias for wirestack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wirestack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor's buffer is smaller than the protocol's minimum header
    #[error("buffer too short: need {needed} bytes, got {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// An option's value is inconsistent with its expected encoding
    #[error("malformed option {code}: {reason}")]
    MalformedOption { code: u8, reason: &'static str },

    /// An option's declared length exceeds the remaining buffer
    #[error("truncated option {code}: declared length {declared} exceeds {remaining} remaining bytes")]
    TruncatedOption {
        code: u8,
        declared: usize,
        remaining: usize,
    },

    /// A setter received a value that does not fit the field's encoded width
    #[error("value {value} does not fit {field} (maximum {max})")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// Adding an option would exceed the protocol's declared maximum
    #[error("option {code} would push the option area past {limit} bytes")]
    OptionTooLarge { code: u8, limit: usize },
}

impl Error {
    /// Create a buffer-too-short error
    pub fn too_short(needed: usize, available: usize) -> Self {
        Error::BufferTooShort { needed, available }
    }

    /// Create a field-overflow error
    pub fn overflow(field: &'static str, value: u64, max: u64) -> Self {
        Error::FieldOverflow { field, value, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::too_short(14, 9);
        assert_eq!(err.to_string(), "buffer too short: need 14 bytes, got 9");

        let err = Error::overflow("fragment offset", 0x2000, 0x1FFF);
        assert_eq!(
            err.to_string(),
            "value 8192 does not fit fragment offset (maximum 8191)"
        );
    }
}
