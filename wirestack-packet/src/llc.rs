//! LLC (Logical Link Control) headers
//!
//! The three-byte DSAP/SSAP/control header reached through loopback
//! frames with the LLC protocol family. The information field is kept as
//! a raw payload.

use bytes::BufMut;
use wirestack_core::{Error, Result};

use crate::pdu::Pdu;
use crate::raw::Raw;

/// SNAP service access point (0xAA)
pub const SAP_SNAP: u8 = 0xAA;

/// STP/BPDU service access point (0x42)
pub const SAP_STP: u8 = 0x42;

/// Unnumbered Information control value (0x03)
pub const CONTROL_UI: u8 = 0x03;

/// LLC header
#[derive(Debug, Clone)]
pub struct Llc {
    /// Destination service access point
    pub dsap: u8,
    /// Source service access point
    pub ssap: u8,
    /// Control field
    pub control: u8,
    pub(crate) inner: Option<Box<Pdu>>,
}

impl Llc {
    pub const HEADER_SIZE: usize = 3;

    pub fn new(dsap: u8, ssap: u8, control: u8) -> Self {
        Llc {
            dsap,
            ssap,
            control,
            inner: None,
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        let rest = &buf[Self::HEADER_SIZE..];
        Ok(Llc {
            dsap: buf[0],
            ssap: buf[1],
            control: buf[2],
            inner: (!rest.is_empty()).then(|| Box::new(Pdu::Raw(Raw::new(rest)))),
        })
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let mut w = &mut buf[..];
        w.put_u8(self.dsap);
        w.put_u8(self.ssap);
        w.put_u8(self.control);
    }
}
