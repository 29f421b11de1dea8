//! Raw payload leaf
//!
//! The catch-all body: an opaque byte sequence terminating a chain when
//! no further layer is recognized.

use crate::pdu::Pdu;

/// Opaque payload bytes.
#[derive(Debug, Clone, Default)]
pub struct Raw {
    pub payload: Vec<u8>,
    pub(crate) inner: Option<Box<Pdu>>,
}

impl Raw {
    pub fn new(payload: &[u8]) -> Self {
        Raw {
            payload: payload.to_vec(),
            inner: None,
        }
    }

    pub(crate) fn header_size(&self) -> usize {
        self.payload.len()
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        buf[..self.payload.len()].copy_from_slice(&self.payload);
    }
}
