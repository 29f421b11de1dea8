//! TCP segments
//!
//! RFC 793 header with the options area kept as raw padded bytes. The
//! pseudo-header checksum is computed during the write pass from the
//! enclosing IPv4 addresses; without an IPv4 parent the stored checksum
//! is written unchanged. Segment payloads are kept raw.

use bytes::BufMut;
use wirestack_core::{Error, Result};

use crate::checksum::transport_checksum;
use crate::ip::IpProtocol;
use crate::pdu::Pdu;
use crate::raw::Raw;

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    /// FIN - no more data from sender
    pub fin: bool,
    /// SYN - synchronize sequence numbers
    pub syn: bool,
    /// RST - reset the connection
    pub rst: bool,
    /// PSH - push function
    pub psh: bool,
    /// ACK - acknowledgment field is significant
    pub ack: bool,
    /// URG - urgent pointer field is significant
    pub urg: bool,
    /// ECE - ECN echo
    pub ece: bool,
    /// CWR - congestion window reduced
    pub cwr: bool,
}

impl TcpFlags {
    pub const NONE: TcpFlags = TcpFlags {
        fin: false,
        syn: false,
        rst: false,
        psh: false,
        ack: false,
        urg: false,
        ece: false,
        cwr: false,
    };

    pub const SYN: TcpFlags = TcpFlags {
        fin: false,
        syn: true,
        rst: false,
        psh: false,
        ack: false,
        urg: false,
        ece: false,
        cwr: false,
    };

    pub const SYN_ACK: TcpFlags = TcpFlags {
        fin: false,
        syn: true,
        rst: false,
        psh: false,
        ack: true,
        urg: false,
        ece: false,
        cwr: false,
    };

    pub const ACK: TcpFlags = TcpFlags {
        fin: false,
        syn: false,
        rst: false,
        psh: false,
        ack: true,
        urg: false,
        ece: false,
        cwr: false,
    };

    pub const RST: TcpFlags = TcpFlags {
        fin: false,
        syn: false,
        rst: true,
        psh: false,
        ack: false,
        urg: false,
        ece: false,
        cwr: false,
    };

    pub fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.fin {
            flags |= 0b0000_0001;
        }
        if self.syn {
            flags |= 0b0000_0010;
        }
        if self.rst {
            flags |= 0b0000_0100;
        }
        if self.psh {
            flags |= 0b0000_1000;
        }
        if self.ack {
            flags |= 0b0001_0000;
        }
        if self.urg {
            flags |= 0b0010_0000;
        }
        if self.ece {
            flags |= 0b0100_0000;
        }
        if self.cwr {
            flags |= 0b1000_0000;
        }
        flags
    }

    pub fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: (value & 0b0000_0001) != 0,
            syn: (value & 0b0000_0010) != 0,
            rst: (value & 0b0000_0100) != 0,
            psh: (value & 0b0000_1000) != 0,
            ack: (value & 0b0001_0000) != 0,
            urg: (value & 0b0010_0000) != 0,
            ece: (value & 0b0100_0000) != 0,
            cwr: (value & 0b1000_0000) != 0,
        }
    }
}

/// TCP header
#[derive(Debug, Clone)]
pub struct Tcp {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Sequence number
    pub sequence_number: u32,
    /// Acknowledgment number
    pub acknowledgment_number: u32,
    /// Low nibble of the offset byte, preserved for round-trips
    pub reserved: u8,
    /// Flags
    pub flags: TcpFlags,
    /// Window size
    pub window_size: u16,
    checksum: u16,
    /// Urgent pointer
    pub urgent_pointer: u16,
    options: Vec<u8>,
    pub(crate) inner: Option<Box<Pdu>>,
}

impl Tcp {
    /// Header size without options
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Largest options area the 4-bit data offset can describe
    pub const MAX_OPTIONS_SIZE: usize = 40;

    pub fn new(source_port: u16, destination_port: u16) -> Self {
        Tcp {
            source_port,
            destination_port,
            sequence_number: 0,
            acknowledgment_number: 0,
            reserved: 0,
            flags: TcpFlags::NONE,
            window_size: 65535,
            checksum: 0,
            urgent_pointer: 0,
            options: Vec::new(),
            inner: None,
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::MIN_HEADER_SIZE {
            return Err(Error::too_short(Self::MIN_HEADER_SIZE, buf.len()));
        }
        let header_len = ((buf[12] >> 4) as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE {
            return Err(Error::too_short(Self::MIN_HEADER_SIZE, header_len));
        }
        if buf.len() < header_len {
            return Err(Error::too_short(header_len, buf.len()));
        }

        let rest = &buf[header_len..];
        Ok(Tcp {
            source_port: u16::from_be_bytes([buf[0], buf[1]]),
            destination_port: u16::from_be_bytes([buf[2], buf[3]]),
            sequence_number: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            acknowledgment_number: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            reserved: buf[12] & 0x0F,
            flags: TcpFlags::from_u8(buf[13]),
            window_size: u16::from_be_bytes([buf[14], buf[15]]),
            checksum: u16::from_be_bytes([buf[16], buf[17]]),
            urgent_pointer: u16::from_be_bytes([buf[18], buf[19]]),
            options: buf[Self::MIN_HEADER_SIZE..header_len].to_vec(),
            inner: (!rest.is_empty()).then(|| Box::new(Pdu::Raw(Raw::new(rest)))),
        })
    }

    /// Checksum as seen on parse; recomputed on serialize when the
    /// segment sits inside an IPv4 packet.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn options(&self) -> &[u8] {
        &self.options
    }

    /// Set the options area, padding it to a 32-bit boundary.
    pub fn set_options(&mut self, options: Vec<u8>) -> Result<()> {
        let padded = (options.len() + 3) & !3;
        if padded > Self::MAX_OPTIONS_SIZE {
            return Err(Error::overflow(
                "TCP options length",
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

    pub(crate) fn write_header(&self, buf: &mut [u8], parent: Option<&Pdu>) {
        let header_len = self.header_size();
        let mut w = &mut buf[..];
        w.put_u16(self.source_port);
        w.put_u16(self.destination_port);
        w.put_u32(self.sequence_number);
        w.put_u32(self.acknowledgment_number);
        w.put_u8((((header_len / 4) as u8) << 4) | (self.reserved & 0x0F));
        w.put_u8(self.flags.to_u8());
        w.put_u16(self.window_size);
        w.put_u16(0);
        w.put_u16(self.urgent_pointer);
        w.put_slice(&self.options);

        let checksum = match parent.and_then(Pdu::as_ipv4) {
            Some(ip) => transport_checksum(
                &ip.source.octets(),
                &ip.destination.octets(),
                IpProtocol::Tcp.to_u8(),
                buf,
            ),
            None => self.checksum,
        };
        buf[16..18].copy_from_slice(&checksum.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Ipv4;
    use std::net::Ipv4Addr;

    #[test]
    fn test_flags_bits() {
        assert_eq!(TcpFlags::SYN.to_u8(), 0b10);
        assert_eq!(TcpFlags::SYN_ACK.to_u8(), 0b1_0010);
        let flags = TcpFlags::from_u8(0b1_0100);
        assert!(flags.rst);
        assert!(flags.ack);
    }

    #[test]
    fn test_parse_roundtrip_with_options() {
        let mut tcp = Tcp::new(54321, 80);
        tcp.sequence_number = 1000;
        tcp.flags = TcpFlags::SYN;
        tcp.set_options(vec![0x02, 0x04, 0x05, 0xB4]).unwrap();
        let bytes = Pdu::Tcp(tcp).serialize();
        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes[12] >> 4, 6);

        let parsed = Tcp::from_buffer(&bytes).unwrap();
        assert_eq!(parsed.source_port, 54321);
        assert!(parsed.flags.syn);
        assert_eq!(parsed.options(), &[0x02, 0x04, 0x05, 0xB4]);
        assert_eq!(Pdu::Tcp(parsed).serialize(), bytes);
    }

    #[test]
    fn test_payload_kept_raw() {
        let mut bytes = Pdu::Tcp(Tcp::new(1, 2)).serialize();
        bytes.extend_from_slice(b"GET /");
        let parsed = Tcp::from_buffer(&bytes).unwrap();
        let inner = parsed.inner.as_deref().unwrap();
        assert_eq!(inner.as_raw().unwrap().payload, b"GET /");
    }

    #[test]
    fn test_checksum_computed_under_ipv4() {
        let mut ip = Pdu::Ipv4(Ipv4::new(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        ));
        let mut tcp = Tcp::new(54321, 80);
        tcp.flags = TcpFlags::SYN;
        ip.set_inner_pdu(Pdu::Tcp(tcp));
        let bytes = ip.serialize();

        let mut zeroed = bytes[20..].to_vec();
        zeroed[16] = 0;
        zeroed[17] = 0;
        let expected = transport_checksum(&[10, 0, 0, 1], &[10, 0, 0, 2], 6, &zeroed);
        assert_eq!(u16::from_be_bytes([bytes[36], bytes[37]]), expected);
    }

    #[test]
    fn test_bad_data_offset_rejected() {
        let mut buf = vec![0u8; 20];
        buf[12] = 0x30; // offset of 3 words
        assert!(Tcp::from_buffer(&buf).is_err());
    }
}
