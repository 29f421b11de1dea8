//! ARP packets
//!
//! The fixed 28-byte Ethernet/IPv4 form of ARP (RFC 826), as reached
//! through EtherType 0x0806.

use bytes::BufMut;
use std::net::Ipv4Addr;
use wirestack_core::{Error, Result};

use crate::ethernet::MacAddress;
use crate::pdu::Pdu;

/// Ethernet hardware type
pub const HTYPE_ETHERNET: u16 = 1;

/// IPv4 protocol type
pub const PTYPE_IPV4: u16 = 0x0800;

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    Request = 1,
    Reply = 2,
    RarpRequest = 3,
    RarpReply = 4,
}

impl ArpOpcode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            3 => Some(Self::RarpRequest),
            4 => Some(Self::RarpReply),
            _ => None,
        }
    }
}

/// ARP packet (Ethernet/IPv4 form)
#[derive(Debug, Clone)]
pub struct Arp {
    /// Hardware type (1 for Ethernet)
    pub htype: u16,
    /// Protocol type (0x0800 for IPv4)
    pub ptype: u16,
    /// Hardware address length
    pub hlen: u8,
    /// Protocol address length
    pub plen: u8,
    /// Operation, kept raw so unknown codes survive a round-trip
    pub operation: u16,
    /// Sender hardware address
    pub sender_hw_addr: MacAddress,
    /// Sender protocol address
    pub sender_proto_addr: Ipv4Addr,
    /// Target hardware address
    pub target_hw_addr: MacAddress,
    /// Target protocol address
    pub target_proto_addr: Ipv4Addr,
    pub(crate) inner: Option<Box<Pdu>>,
}

impl Arp {
    pub const HEADER_SIZE: usize = 28;

    /// Create an ARP request; the target hardware address is the unknown
    /// being asked for.
    pub fn new_request(sender_mac: MacAddress, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Arp {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: 6,
            plen: 4,
            operation: ArpOpcode::Request as u16,
            sender_hw_addr: sender_mac,
            sender_proto_addr: sender_ip,
            target_hw_addr: MacAddress::ZERO,
            target_proto_addr: target_ip,
            inner: None,
        }
    }

    /// Create an ARP reply.
    pub fn new_reply(
        sender_mac: MacAddress,
        sender_ip: Ipv4Addr,
        target_mac: MacAddress,
        target_ip: Ipv4Addr,
    ) -> Self {
        Arp {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: 6,
            plen: 4,
            operation: ArpOpcode::Reply as u16,
            sender_hw_addr: sender_mac,
            sender_proto_addr: sender_ip,
            target_hw_addr: target_mac,
            target_proto_addr: target_ip,
            inner: None,
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        Ok(Arp {
            htype: u16::from_be_bytes([buf[0], buf[1]]),
            ptype: u16::from_be_bytes([buf[2], buf[3]]),
            hlen: buf[4],
            plen: buf[5],
            operation: u16::from_be_bytes([buf[6], buf[7]]),
            sender_hw_addr: MacAddress::from_slice(&buf[8..14]).unwrap(),
            sender_proto_addr: Ipv4Addr::new(buf[14], buf[15], buf[16], buf[17]),
            target_hw_addr: MacAddress::from_slice(&buf[18..24]).unwrap(),
            target_proto_addr: Ipv4Addr::new(buf[24], buf[25], buf[26], buf[27]),
            inner: None,
        })
    }

    pub fn opcode(&self) -> Option<ArpOpcode> {
        ArpOpcode::from_u16(self.operation)
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let mut w = &mut buf[..];
        w.put_u16(self.htype);
        w.put_u16(self.ptype);
        w.put_u8(self.hlen);
        w.put_u8(self.plen);
        w.put_u16(self.operation);
        w.put_slice(self.sender_hw_addr.as_bytes());
        w.put_slice(&self.sender_proto_addr.octets());
        w.put_slice(self.target_hw_addr.as_bytes());
        w.put_slice(&self.target_proto_addr.octets());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let arp = Arp::new_request(
            MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
        );
        let bytes = Pdu::Arp(arp).serialize();
        assert_eq!(bytes.len(), Arp::HEADER_SIZE);

        let parsed = Arp::from_buffer(&bytes).unwrap();
        assert_eq!(parsed.opcode(), Some(ArpOpcode::Request));
        assert_eq!(parsed.target_hw_addr, MacAddress::ZERO);
        assert_eq!(parsed.target_proto_addr, Ipv4Addr::new(192, 168, 1, 2));
    }

    #[test]
    fn test_unknown_opcode_preserved() {
        let mut arp = Arp::new_reply(
            MacAddress::ZERO,
            Ipv4Addr::UNSPECIFIED,
            MacAddress::ZERO,
            Ipv4Addr::UNSPECIFIED,
        );
        arp.operation = 9;
        let bytes = Pdu::Arp(arp).serialize();
        let parsed = Arp::from_buffer(&bytes).unwrap();
        assert_eq!(parsed.operation, 9);
        assert_eq!(parsed.opcode(), None);
    }

    #[test]
    fn test_too_short() {
        assert!(Arp::from_buffer(&[0u8; 27]).is_err());
    }
}
