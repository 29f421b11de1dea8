//! UDP datagrams
//!
//! The eight-byte RFC 768 header. Length and checksum are stamped during
//! the write pass; the pseudo-header checksum needs the enclosing IPv4
//! addresses, which the serialization driver passes down. Without an
//! IPv4 parent the stored checksum is written unchanged.

use bytes::BufMut;
use wirestack_core::{Error, Result};

use crate::checksum::transport_checksum;
use crate::demux::{self, Selector};
use crate::ip::IpProtocol;
use crate::pdu::{Pdu, PduKind};

/// UDP header
#[derive(Debug, Clone)]
pub struct Udp {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    length: u16,
    checksum: u16,
    pub(crate) inner: Option<Box<Pdu>>,
    pub(crate) leftover: Vec<u8>,
}

impl Udp {
    pub const HEADER_SIZE: usize = 8;

    pub fn new(source_port: u16, destination_port: u16) -> Self {
        Udp {
            source_port,
            destination_port,
            length: 0,
            checksum: 0,
            inner: None,
            leftover: Vec::new(),
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::too_short(Self::HEADER_SIZE, buf.len()));
        }
        let source_port = u16::from_be_bytes([buf[0], buf[1]]);
        let destination_port = u16::from_be_bytes([buf[2], buf[3]]);

        let rest = &buf[Self::HEADER_SIZE..];
        let (inner, leftover) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            demux::link_payload(
                demux::dissect_payload(
                    PduKind::Udp,
                    Selector::Ports {
                        src: source_port,
                        dst: destination_port,
                    },
                    rest,
                ),
                rest,
            )
        };

        Ok(Udp {
            source_port,
            destination_port,
            length: u16::from_be_bytes([buf[4], buf[5]]),
            checksum: u16::from_be_bytes([buf[6], buf[7]]),
            inner,
            leftover,
        })
    }

    /// Length as seen on parse; recomputed on serialize.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Checksum as seen on parse; recomputed on serialize when the
    /// datagram sits inside an IPv4 packet.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub(crate) fn header_size(&self) -> usize {
        Self::HEADER_SIZE
    }

    pub(crate) fn write_header(&self, buf: &mut [u8], parent: Option<&Pdu>) {
        let total = buf.len() as u16;
        let mut w = &mut buf[..];
        w.put_u16(self.source_port);
        w.put_u16(self.destination_port);
        w.put_u16(total);
        w.put_u16(0);

        let checksum = match parent.and_then(Pdu::as_ipv4) {
            Some(ip) => {
                let sum = transport_checksum(
                    &ip.source.octets(),
                    &ip.destination.octets(),
                    IpProtocol::Udp.to_u8(),
                    buf,
                );
                // An all-zero result is transmitted as 0xFFFF; zero means
                // "no checksum" on the wire
                if sum == 0 {
                    0xFFFF
                } else {
                    sum
                }
            }
            None => self.checksum,
        };
        buf[6..8].copy_from_slice(&checksum.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Ipv4;
    use crate::raw::Raw;
    use std::net::Ipv4Addr;

    #[test]
    fn test_too_short() {
        assert!(Udp::from_buffer(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_length_stamped() {
        let mut pdu = Pdu::Udp(Udp::new(12345, 53));
        pdu.set_inner_pdu(Pdu::Raw(Raw::new(&[1, 2, 3, 4])));
        let bytes = pdu.serialize();
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 12);
    }

    #[test]
    fn test_standalone_serialize_keeps_stored_checksum() {
        let buf = [0x30, 0x39, 0x00, 0x35, 0x00, 0x0C, 0x12, 0x34, 1, 2, 3, 4];
        let udp = Udp::from_buffer(&buf).unwrap();
        assert_eq!(udp.checksum(), 0x1234);
        assert_eq!(Pdu::Udp(udp).serialize(), buf);
    }

    #[test]
    fn test_checksum_computed_under_ipv4() {
        let mut ip = Pdu::Ipv4(Ipv4::new(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
        ));
        let mut udp = Pdu::Udp(Udp::new(12345, 53));
        udp.set_inner_pdu(Pdu::Raw(Raw::new(&[1, 2, 3, 4])));
        ip.set_inner_pdu(udp);

        let bytes = ip.serialize();
        let udp_bytes = &bytes[20..];
        let checksum = u16::from_be_bytes([udp_bytes[6], udp_bytes[7]]);
        assert_ne!(checksum, 0);

        // Recomputing over the datagram with the checksum zeroed must
        // reproduce the stamped value
        let mut zeroed = udp_bytes.to_vec();
        zeroed[6] = 0;
        zeroed[7] = 0;
        let expected = transport_checksum(&[192, 168, 1, 1], &[192, 168, 1, 2], 17, &zeroed);
        assert_eq!(checksum, expected);
    }
}
