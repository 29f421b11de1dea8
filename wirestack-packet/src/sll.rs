//! Linux cooked capture (SLL) frames
//!
//! The 16-byte pseudo-header libpcap synthesizes for the "any" device:
//! packet type, ARPHRD link type, link-layer address, and a protocol
//! field that demuxes like an EtherType.

use bytes::BufMut;
use wirestack_core::{Error, Result};

use crate::demux::{self, Selector};
use crate::ethernet::EtherType;
use crate::pdu::{Pdu, PduKind};

/// Packet addressed to this host
pub const PACKET_HOST: u16 = 0;

/// Broadcast packet
pub const PACKET_BROADCAST: u16 = 1;

/// Packet sent by this host
pub const PACKET_OUTGOING: u16 = 4;

/// ARPHRD_ETHER link type
pub const ARPHRD_ETHER: u16 = 1;

/// Linux cooked capture header
#[derive(Debug, Clone)]
pub struct Sll {
    /// Where the packet was going (PACKET_* value)
    pub packet_type: u16,
    /// ARPHRD link-layer device type
    pub link_layer_type: u16,
    /// Meaningful length of the link-layer address
    pub link_layer_address_length: u16,
    /// Link-layer address, zero padded
    pub link_layer_address: [u8; 8],
    protocol: u16,
    pub(crate) inner: Option<Box<Pdu>>,
    pub(crate) leftover: Vec<u8>,
}

impl Sll {
    pub const HEADER_SIZE: usize = 16;

    pub fn new() -> Self {
        Sll {
            packet_type: PACKET_HOST,
            link_layer_type: ARPHRD_ETHER,
            link_layer_address_length: 6,
            link_layer_address: [0; 8],
            protocol: 0,
            inner: None,
            leftover: Vec::new(),
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        let protocol = u16::from_be_bytes([buf[14], buf[15]]);

        let rest = &buf[Self::HEADER_SIZE..];
        let (inner, leftover) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            demux::link_payload(
                demux::dissect_payload(PduKind::Sll, Selector::EtherType(protocol), rest),
                rest,
            )
        };

        Ok(Sll {
            packet_type: u16::from_be_bytes([buf[0], buf[1]]),
            link_layer_type: u16::from_be_bytes([buf[2], buf[3]]),
            link_layer_address_length: u16::from_be_bytes([buf[4], buf[5]]),
            link_layer_address: buf[6..14].try_into().unwrap(),
            protocol,
            inner,
            leftover,
        })
    }

    pub fn protocol(&self) -> EtherType {
        EtherType::from_u16(self.protocol)
    }

    pub fn set_protocol(&mut self, protocol: EtherType) {
        self.protocol = protocol.to_u16();
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let protocol = self
            .inner
            .as_deref()
            .and_then(|p| demux::ethertype_for_kind(p.kind()))
            .unwrap_or(self.protocol);
        let mut w = &mut buf[..];
        w.put_u16(self.packet_type);
        w.put_u16(self.link_layer_type);
        w.put_u16(self.link_layer_address_length);
        w.put_slice(&self.link_layer_address);
        w.put_u16(protocol);
    }
}

impl Default for Sll {
    fn default() -> Self {
        Self::new()
    }
}
