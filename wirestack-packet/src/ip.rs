//! IPv4 packets
//!
//! RFC 791 header with the options area kept as raw padded bytes. The
//! total length, the nested protocol number and the header checksum are
//! stamped during the write pass, so the header is written after the
//! payload (post-order).

use bytes::BufMut;
use std::net::Ipv4Addr;
use wirestack_core::{Error, Result};

use crate::checksum::internet_checksum;
use crate::demux::{self, Selector};
use crate::pdu::{Pdu, PduKind};

/// IP protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    Icmp,
    /// IGMP (2)
    Igmp,
    /// TCP (6)
    Tcp,
    /// UDP (17)
    Udp,
    /// Any other protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::Icmp => 1,
            IpProtocol::Igmp => 2,
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
            IpProtocol::Custom(value) => value,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::Icmp,
            2 => IpProtocol::Igmp,
            6 => IpProtocol::Tcp,
            17 => IpProtocol::Udp,
            value => IpProtocol::Custom(value),
        }
    }
}

/// The three-bit IP flags field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IpFlags {
    /// Reserved bit, must be zero
    pub reserved: bool,
    /// Don't Fragment
    pub dont_fragment: bool,
    /// More Fragments
    pub more_fragments: bool,
}

impl IpFlags {
    pub const NONE: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: false,
        more_fragments: false,
    };

    pub const DONT_FRAGMENT: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: true,
        more_fragments: false,
    };

    pub fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.reserved {
            flags |= 0b100;
        }
        if self.dont_fragment {
            flags |= 0b010;
        }
        if self.more_fragments {
            flags |= 0b001;
        }
        flags
    }

    pub fn from_u8(value: u8) -> Self {
        IpFlags {
            reserved: (value & 0b100) != 0,
            dont_fragment: (value & 0b010) != 0,
            more_fragments: (value & 0b001) != 0,
        }
    }
}

/// IPv4 header
#[derive(Debug, Clone)]
pub struct Ipv4 {
    /// Type of Service / DSCP
    pub tos: u8,
    /// Identification
    pub identification: u16,
    /// Flags
    pub flags: IpFlags,
    fragment_offset: u16,
    /// Time to Live
    pub ttl: u8,
    protocol: u8,
    checksum: u16,
    total_length: u16,
    /// Source address
    pub source: Ipv4Addr,
    /// Destination address
    pub destination: Ipv4Addr,
    options: Vec<u8>,
    pub(crate) inner: Option<Box<Pdu>>,
    pub(crate) leftover: Vec<u8>,
}

impl Ipv4 {
    /// Header size without options
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Largest options area the 4-bit IHL can describe
    pub const MAX_OPTIONS_SIZE: usize = 40;

    /// Create a detached packet with common defaults (TTL 64, DF set).
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr) -> Self {
        Ipv4 {
            tos: 0,
            identification: 0,
            flags: IpFlags::DONT_FRAGMENT,
            fragment_offset: 0,
            ttl: 64,
            protocol: 0,
            checksum: 0,
            total_length: 0,
            source,
            destination,
            options: Vec::new(),
            inner: None,
            leftover: Vec::new(),
        }
    }

    /// Parse a packet and dissect its payload.
    ///
    /// The residual buffer, not the stored total-length field, decides
    /// how many payload bytes are handed to the nested dissector, so
    /// captures with inconsistent length fields still parse.
    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::MIN_HEADER_SIZE {
            return Err(Error::too_short(Self::MIN_HEADER_SIZE, buf.len()));
        }
        let header_len = ((buf[0] & 0x0F) as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(Error::too_short(Self::MIN_HEADER_SIZE, header_len));
        }
        if buf.len() < header_len {
            return Err(Error::too_short(header_len, buf.len()));
        }

        let flags_and_offset = u16::from_be_bytes([buf[6], buf[7]]);
        let protocol = buf[9];

        let rest = &buf[header_len..];
        let (inner, leftover) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            demux::link_payload(
                demux::dissect_payload(PduKind::Ipv4, Selector::IpProtocol(protocol), rest),
                rest,
            )
        };

        Ok(Ipv4 {
            tos: buf[1],
            identification: u16::from_be_bytes([buf[4], buf[5]]),
            flags: IpFlags::from_u8((flags_and_offset >> 13) as u8),
            fragment_offset: flags_and_offset & 0x1FFF,
            ttl: buf[8],
            protocol,
            checksum: u16::from_be_bytes([buf[10], buf[11]]),
            total_length: u16::from_be_bytes([buf[2], buf[3]]),
            source: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            destination: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
            options: buf[Self::MIN_HEADER_SIZE..header_len].to_vec(),
            inner,
            leftover,
        })
    }

    /// Fragment offset in 8-byte blocks.
    pub fn fragment_offset(&self) -> u16 {
        self.fragment_offset
    }

    /// Set the fragment offset. The field is 13 bits wide.
    pub fn set_fragment_offset(&mut self, offset: u16) -> Result<()> {
        if offset > 0x1FFF {
            return Err(Error::overflow("fragment offset", offset as u64, 0x1FFF));
        }
        self.fragment_offset = offset;
        Ok(())
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from_u8(self.protocol)
    }

    /// Set the nested protocol number. Serialization overrides it when
    /// the attached inner PDU maps to a known number.
    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.protocol = protocol.to_u8();
    }

    /// Header checksum as seen on parse; recomputed on serialize.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Total length as seen on parse; recomputed on serialize.
    pub fn total_length(&self) -> u16 {
        self.total_length
    }

    pub fn options(&self) -> &[u8] {
        &self.options
    }

    /// Set the options area, padding it to a 32-bit boundary.
    pub fn set_options(&mut self, options: Vec<u8>) -> Result<()> {
        let padded = (options.len() + 3) & !3;
        if padded > Self::MAX_OPTIONS_SIZE {
            return Err(Error::overflow(
                "IPv4 options length",
                padded as u64,
                Self::MAX_OPTIONS_SIZE as u64,
            ));
        }
        self.options = options;
        self.options.resize(padded, 0);
        Ok(())
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::MIN_HEADER_SIZE + self.options.len()
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let total = buf.len();
        let header_len = self.header_size();
        let protocol = self
            .inner
            .as_deref()
            .and_then(|p| demux::ip_protocol_for_kind(p.kind()))
            .unwrap_or(self.protocol);

        let mut w = &mut buf[..];
        w.put_u8(0x40 | (header_len / 4) as u8);
        w.put_u8(self.tos);
        w.put_u16(total as u16);
        w.put_u16(self.identification);
        w.put_u16(((self.flags.to_u8() as u16) << 13) | self.fragment_offset);
        w.put_u8(self.ttl);
        w.put_u8(protocol);
        w.put_u16(0);
        w.put_slice(&self.source.octets());
        w.put_slice(&self.destination.octets());
        w.put_slice(&self.options);

        let checksum = internet_checksum(&buf[..header_len]);
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ipv4 {
        Ipv4::new(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
    }

    #[test]
    fn test_ip_protocol_conversion() {
        assert_eq!(IpProtocol::Tcp.to_u8(), 6);
        assert_eq!(IpProtocol::from_u8(17), IpProtocol::Udp);
        assert_eq!(IpProtocol::from_u8(89), IpProtocol::Custom(89));
    }

    #[test]
    fn test_ip_flags_bits() {
        assert_eq!(IpFlags::DONT_FRAGMENT.to_u8(), 0b010);
        let flags = IpFlags::from_u8(0b011);
        assert!(flags.dont_fragment);
        assert!(flags.more_fragments);
    }

    #[test]
    fn test_fragment_offset_overflow() {
        let mut ip = sample();
        assert!(ip.set_fragment_offset(0x1FFF).is_ok());
        let err = ip.set_fragment_offset(0x2000).unwrap_err();
        assert!(matches!(err, Error::FieldOverflow { .. }));
    }

    #[test]
    fn test_options_padded_and_bounded() {
        let mut ip = sample();
        ip.set_options(vec![0x94, 0x04, 0x00]).unwrap();
        assert_eq!(ip.options(), &[0x94, 0x04, 0x00, 0x00]);
        assert_eq!(ip.header_size(), 24);
        assert!(ip.set_options(vec![0; 41]).is_err());
    }

    #[test]
    fn test_serialize_stamps_length_and_checksum() {
        let mut pdu = Pdu::Ipv4(sample());
        pdu.set_inner_pdu(Pdu::Raw(crate::raw::Raw::new(&[1, 2, 3, 4])));
        let bytes = pdu.serialize();
        assert_eq!(bytes.len(), 24);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 24);
        // A valid header checksums to zero
        assert_eq!(internet_checksum(&bytes[..20]), 0);
    }

    #[test]
    fn test_parse_serialize_roundtrip() {
        let mut pdu = Pdu::Ipv4(sample());
        pdu.set_inner_pdu(Pdu::Raw(crate::raw::Raw::new(&[0xAB; 9])));
        let bytes = pdu.serialize();

        let parsed = Ipv4::from_buffer(&bytes).unwrap();
        assert_eq!(parsed.ttl, 64);
        assert_eq!(parsed.total_length(), 29);
        assert_ne!(parsed.checksum(), 0);
        assert_eq!(Pdu::Ipv4(parsed).serialize(), bytes);
    }

    #[test]
    fn test_bad_ihl_rejected() {
        let mut buf = vec![0u8; 20];
        buf[0] = 0x43; // IHL of 3 words
        assert!(Ipv4::from_buffer(&buf).is_err());
    }

    #[test]
    fn test_protocol_stamped_from_inner() {
        let mut pdu = Pdu::Ipv4(sample());
        pdu.set_inner_pdu(Pdu::Udp(crate::udp::Udp::new(68, 67)));
        let bytes = pdu.serialize();
        assert_eq!(bytes[9], 17);
    }
}
