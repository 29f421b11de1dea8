//! Loopback (DLT_NULL) encapsulation
//!
//! A four-byte address family in host byte order, the libpcap convention
//! for the loopback data-link type. Captures taken on a machine of the
//! opposite endianness will demux to a raw payload.

use wirestack_core::{Error, Result};

use crate::demux::{self, Selector};
use crate::pdu::{Pdu, PduKind};

/// IPv4 protocol family
pub const PF_INET: u32 = 2;

/// LLC protocol family
pub const PF_LLC: u32 = 26;

/// Loopback frame header
#[derive(Debug, Clone)]
pub struct Loopback {
    /// Address family of the payload, host byte order on the wire
    pub family: u32,
    pub(crate) inner: Option<Box<Pdu>>,
    pub(crate) leftover: Vec<u8>,
}

impl Loopback {
    pub const HEADER_SIZE: usize = 4;

    pub fn new(family: u32) -> Self {
        Loopback {
            family,
            inner: None,
            leftover: Vec::new(),
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        let family = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);

        let rest = &buf[Self::HEADER_SIZE..];
        let (inner, leftover) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            demux::link_payload(
                demux::dissect_payload(PduKind::Loopback, Selector::Family(family), rest),
                rest,
            )
        };

        Ok(Loopback {
            family,
            inner,
            leftover,
        })
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.family.to_ne_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        let err = Loopback::from_buffer(&[0x02, 0x00, 0x00]).unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooShort {
                needed: 4,
                available: 3
            }
        );
    }

    #[test]
    fn test_unknown_family_keeps_payload_raw() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x02, 0x03];
        let loopback = Loopback::from_buffer(&buf).unwrap();
        assert_eq!(loopback.family, 0xFFFF_FFFF);
        let inner = loopback.inner.as_deref().unwrap();
        assert_eq!(inner.as_raw().unwrap().payload, [1, 2, 3]);
    }

    #[test]
    fn test_header_only_frame() {
        let loopback = Loopback::from_buffer(&PF_LLC.to_ne_bytes()).unwrap();
        assert_eq!(loopback.family, PF_LLC);
        assert!(loopback.inner.is_none());
    }

    #[test]
    fn test_llc_family_dissects_llc() {
        let mut buf = PF_LLC.to_ne_bytes().to_vec();
        buf.extend_from_slice(&[0xAA, 0xAA, 0x03]);
        let loopback = Loopback::from_buffer(&buf).unwrap();
        let inner = loopback.inner.as_deref().unwrap();
        assert_eq!(inner.kind(), PduKind::Llc);
    }

    #[test]
    fn test_roundtrip() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x02, 0x03];
        let pdu = Pdu::Loopback(Loopback::from_buffer(&buf).unwrap());
        assert_eq!(pdu.serialize(), buf);
    }
}
