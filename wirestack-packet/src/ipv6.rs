//! IPv6 packets
//!
//! The fixed 40-byte header of RFC 8200. Extension headers are not
//! dissected; an unrecognized next header keeps the payload raw.

use bytes::BufMut;
use std::net::Ipv6Addr;
use wirestack_core::{Error, Result};

use crate::demux::{self, Selector};
use crate::ip::IpProtocol;
use crate::pdu::{Pdu, PduKind};

/// IPv6 header
#[derive(Debug, Clone)]
pub struct Ipv6 {
    /// Traffic class
    pub traffic_class: u8,
    flow_label: u32,
    next_header: u8,
    /// Hop limit
    pub hop_limit: u8,
    payload_length: u16,
    /// Source address
    pub source: Ipv6Addr,
    /// Destination address
    pub destination: Ipv6Addr,
    pub(crate) inner: Option<Box<Pdu>>,
    pub(crate) leftover: Vec<u8>,
}

impl Ipv6 {
    pub const HEADER_SIZE: usize = 40;

    pub fn new(source: Ipv6Addr, destination: Ipv6Addr) -> Self {
        Ipv6 {
            traffic_class: 0,
            flow_label: 0,
            next_header: 0,
            hop_limit: 64,
            payload_length: 0,
            source,
            destination,
            inner: None,
            leftover: Vec::new(),
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        let first = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let next_header = buf[6];

        let rest = &buf[Self::HEADER_SIZE..];
        let (inner, leftover) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            demux::link_payload(
                demux::dissect_payload(PduKind::Ipv6, Selector::IpProtocol(next_header), rest),
                rest,
            )
        };

        Ok(Ipv6 {
            traffic_class: ((first >> 20) & 0xFF) as u8,
            flow_label: first & 0x000F_FFFF,
            next_header,
            hop_limit: buf[7],
            payload_length: u16::from_be_bytes([buf[4], buf[5]]),
            source: Ipv6Addr::from(<[u8; 16]>::try_from(&buf[8..24]).unwrap()),
            destination: Ipv6Addr::from(<[u8; 16]>::try_from(&buf[24..40]).unwrap()),
            inner,
            leftover,
        })
    }

    pub fn flow_label(&self) -> u32 {
        self.flow_label
    }

    /// Set the flow label. The field is 20 bits wide.
    pub fn set_flow_label(&mut self, label: u32) -> Result<()> {
        if label > 0x000F_FFFF {
            return Err(Error::overflow("flow label", label as u64, 0x000F_FFFF));
        }
        self.flow_label = label;
        Ok(())
    }

    pub fn next_header(&self) -> IpProtocol {
        IpProtocol::from_u8(self.next_header)
    }

    /// Set the next-header number. Serialization overrides it when the
    /// attached inner PDU maps to a known number.
    pub fn set_next_header(&mut self, protocol: IpProtocol) {
        self.next_header = protocol.to_u8();
    }

    /// Payload length as seen on parse; recomputed on serialize.
    pub fn payload_length(&self) -> u16 {
        self.payload_length
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let payload_len = (buf.len() - Self::HEADER_SIZE) as u16;
        let next_header = self
            .inner
            .as_deref()
            .and_then(|p| demux::ip_protocol_for_kind(p.kind()))
            .unwrap_or(self.next_header);

        let mut w = &mut buf[..];
        w.put_u32((6u32 << 28) | ((self.traffic_class as u32) << 20) | self.flow_label);
        w.put_u16(payload_len);
        w.put_u8(next_header);
        w.put_u8(self.hop_limit);
        w.put_slice(&self.source.octets());
        w.put_slice(&self.destination.octets());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_label_overflow() {
        let mut ip = Ipv6::new(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST);
        assert!(ip.set_flow_label(0x000F_FFFF).is_ok());
        assert!(ip.set_flow_label(0x0010_0000).is_err());
    }

    #[test]
    fn test_roundtrip_with_raw_payload() {
        let mut pdu = Pdu::Ipv6(Ipv6::new(
            "2001:db8::1".parse().unwrap(),
            "2001:db8::2".parse().unwrap(),
        ));
        pdu.set_inner_pdu(Pdu::Raw(crate::raw::Raw::new(&[9, 9, 9])));
        let bytes = pdu.serialize();
        assert_eq!(bytes.len(), 43);
        assert_eq!(bytes[0] >> 4, 6);
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 3);

        let parsed = Ipv6::from_buffer(&bytes).unwrap();
        assert_eq!(parsed.payload_length(), 3);
        assert_eq!(parsed.source, "2001:db8::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(Pdu::Ipv6(parsed).serialize(), bytes);
    }

    #[test]
    fn test_too_short() {
        assert!(Ipv6::from_buffer(&[0u8; 39]).is_err());
    }
}
