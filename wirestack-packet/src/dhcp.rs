//! DHCP packets
//!
//! DHCP extends BOOTP (RFC 951): the fixed header record is serialized
//! first, then the magic cookie, then the option list of RFC 2131/2132.
//! The END option is appended automatically on serialize, exactly once.
//!
//! A DHCP body reports the UDP kind, so a kind-based find treats it as
//! interchangeable with its transport; see [`Dhcp`].

use bytes::BufMut;
use std::fmt;
use std::net::Ipv4Addr;
use wirestack_core::{Error, ListSyntax, Result, Tlv, TlvList};

use crate::pdu::Pdu;

/// DHCP server port
pub const DHCP_SERVER_PORT: u16 = 67;

/// DHCP client port
pub const DHCP_CLIENT_PORT: u16 = 68;

/// DHCP magic cookie value
pub const DHCP_MAGIC_COOKIE: u32 = 0x63825363;

/// Broadcast flag bit
pub const DHCP_BROADCAST_FLAG: u16 = 0x8000;

/// BOOTREQUEST opcode
pub const BOOTREQUEST: u8 = 1;

/// BOOTREPLY opcode
pub const BOOTREPLY: u8 = 2;

/// Ethernet hardware type
pub const HTYPE_ETHERNET: u8 = 1;

/// Fixed BOOTP header size
pub const BOOTP_HEADER_SIZE: usize = 236;

/// Budget for the cookie, options and end sentinel: what fits in a
/// 576-byte minimum-reassembly datagram under the IP and UDP headers and
/// the BOOTP fixed header.
pub const MAX_OPTIONS_SIZE: usize = 312;

const OPTION_SYNTAX: ListSyntax = ListSyntax {
    end: Some(DhcpOptionCode::End as u8),
    pad: Some(DhcpOptionCode::Pad as u8),
};

/// DHCP message types (RFC 2132, option 53)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

impl DhcpMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DhcpMessageType::Discover => "DISCOVER",
            DhcpMessageType::Offer => "OFFER",
            DhcpMessageType::Request => "REQUEST",
            DhcpMessageType::Decline => "DECLINE",
            DhcpMessageType::Ack => "ACK",
            DhcpMessageType::Nak => "NAK",
            DhcpMessageType::Release => "RELEASE",
            DhcpMessageType::Inform => "INFORM",
        }
    }
}

impl fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DHCP option codes used by the typed adapters (RFC 2132)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DhcpOptionCode {
    Pad = 0,
    SubnetMask = 1,
    Routers = 3,
    DomainNameServers = 6,
    HostName = 12,
    DomainName = 15,
    BroadcastAddress = 28,
    RequestedAddress = 50,
    LeaseTime = 51,
    MessageType = 53,
    ServerIdentifier = 54,
    ParameterRequestList = 55,
    RenewalTime = 58,
    RebindingTime = 59,
    ClientIdentifier = 61,
    End = 255,
}

/// The fixed BOOTP header record (RFC 951)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootpHeader {
    /// Message opcode
    pub op: u8,
    /// Hardware address type
    pub htype: u8,
    /// Hardware address length
    pub hlen: u8,
    /// Relay hop count
    pub hops: u8,
    /// Transaction ID
    pub xid: u32,
    /// Seconds since the client began acquisition
    pub secs: u16,
    /// Flags (broadcast bit)
    pub flags: u16,
    /// Client IP address
    pub ciaddr: Ipv4Addr,
    /// "Your" (assigned) IP address
    pub yiaddr: Ipv4Addr,
    /// Next-server IP address
    pub siaddr: Ipv4Addr,
    /// Relay agent IP address
    pub giaddr: Ipv4Addr,
    /// Client hardware address, zero padded
    pub chaddr: [u8; 16],
    /// Server host name
    pub sname: [u8; 64],
    /// Boot file name
    pub file: [u8; 128],
}

impl Default for BootpHeader {
    fn default() -> Self {
        BootpHeader {
            op: BOOTREQUEST,
            htype: HTYPE_ETHERNET,
            hlen: 6,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
        }
    }
}

impl BootpHeader {
    fn parse(buf: &[u8]) -> Self {
        BootpHeader {
            op: buf[0],
            htype: buf[1],
            hlen: buf[2],
            hops: buf[3],
            xid: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            secs: u16::from_be_bytes([buf[8], buf[9]]),
            flags: u16::from_be_bytes([buf[10], buf[11]]),
            ciaddr: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            yiaddr: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
            siaddr: Ipv4Addr::new(buf[20], buf[21], buf[22], buf[23]),
            giaddr: Ipv4Addr::new(buf[24], buf[25], buf[26], buf[27]),
            chaddr: buf[28..44].try_into().unwrap(),
            sname: buf[44..108].try_into().unwrap(),
            file: buf[108..236].try_into().unwrap(),
        }
    }

    fn write(&self, w: &mut impl BufMut) {
        w.put_u8(self.op);
        w.put_u8(self.htype);
        w.put_u8(self.hlen);
        w.put_u8(self.hops);
        w.put_u32(self.xid);
        w.put_u16(self.secs);
        w.put_u16(self.flags);
        w.put_slice(&self.ciaddr.octets());
        w.put_slice(&self.yiaddr.octets());
        w.put_slice(&self.siaddr.octets());
        w.put_slice(&self.giaddr.octets());
        w.put_slice(&self.chaddr);
        w.put_slice(&self.sname);
        w.put_slice(&self.file);
    }

    /// Client hardware address, truncated to the meaningful length.
    pub fn client_mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        mac
    }
}

/// DHCP body.
///
/// Library convention: `kind()` reports `PduKind::Udp` rather than a
/// distinct DHCP tag. DHCP is carried in UDP, and this lets a kind-based
/// find locate a DHCP body in a chain assembled by hand without an
/// intervening UDP layer. Use [`Pdu::as_dhcp`] to downcast.
#[derive(Debug, Clone)]
pub struct Dhcp {
    /// The inherited BOOTP fixed header
    pub bootp: BootpHeader,
    magic_cookie: u32,
    options: TlvList,
    pub(crate) inner: Option<Box<Pdu>>,
}

impl Dhcp {
    /// Create an empty request with the Ethernet hardware type and
    /// length already set.
    pub fn new() -> Self {
        Dhcp {
            bootp: BootpHeader::default(),
            magic_cookie: DHCP_MAGIC_COOKIE,
            options: TlvList::new(),
            inner: None,
        }
    }

    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        if buf.len() < BOOTP_HEADER_SIZE + 4 {
            return Err(Error::too_short(BOOTP_HEADER_SIZE + 4, buf.len()));
        }
        let bootp = BootpHeader::parse(buf);
        let magic_cookie = u32::from_be_bytes([buf[236], buf[237], buf[238], buf[239]]);
        let (options, _) = TlvList::parse(&buf[240..], OPTION_SYNTAX)?;
        Ok(Dhcp {
            bootp,
            magic_cookie,
            options,
            inner: None,
        })
    }

    pub fn magic_cookie(&self) -> u32 {
        self.magic_cookie
    }

    pub fn options(&self) -> &TlvList {
        &self.options
    }

    /// Append an option. Fails when the cookie, options and end sentinel
    /// would no longer fit the option-area budget.
    pub fn add_option(&mut self, option: Tlv) -> Result<()> {
        let projected = 4 + self.options.encoded_len() + option.encoded_len() + 1;
        if projected > MAX_OPTIONS_SIZE {
            return Err(Error::OptionTooLarge {
                code: option.code(),
                limit: MAX_OPTIONS_SIZE,
            });
        }
        self.options.push(option);
        Ok(())
    }

    /// First option with the given code.
    pub fn search_option(&self, code: DhcpOptionCode) -> Option<&Tlv> {
        self.options.find(code as u8)
    }

    /// Add a message-type option (code 53).
    pub fn add_type_option(&mut self, message_type: DhcpMessageType) -> Result<()> {
        self.add_option(Tlv::new(
            DhcpOptionCode::MessageType as u8,
            vec![message_type as u8],
        )?)
    }

    pub fn search_type_option(&self) -> Option<DhcpMessageType> {
        DhcpMessageType::from_u8(self.search_option(DhcpOptionCode::MessageType)?.as_u8()?)
    }

    /// Add a server-identifier option (code 54).
    pub fn add_server_identifier(&mut self, ip: Ipv4Addr) -> Result<()> {
        self.add_address_option(DhcpOptionCode::ServerIdentifier, ip)
    }

    pub fn search_server_identifier(&self) -> Option<Ipv4Addr> {
        self.search_address_option(DhcpOptionCode::ServerIdentifier)
    }

    /// Add a requested-address option (code 50).
    pub fn add_requested_address(&mut self, ip: Ipv4Addr) -> Result<()> {
        self.add_address_option(DhcpOptionCode::RequestedAddress, ip)
    }

    pub fn search_requested_address(&self) -> Option<Ipv4Addr> {
        self.search_address_option(DhcpOptionCode::RequestedAddress)
    }

    /// Add a lease-time option (code 51).
    pub fn add_lease_time(&mut self, seconds: u32) -> Result<()> {
        self.add_option(Tlv::new(
            DhcpOptionCode::LeaseTime as u8,
            seconds.to_be_bytes().to_vec(),
        )?)
    }

    pub fn search_lease_time(&self) -> Option<u32> {
        self.search_option(DhcpOptionCode::LeaseTime)?.as_u32_be()
    }

    /// Add a subnet-mask option (code 1).
    pub fn add_subnet_mask(&mut self, mask: Ipv4Addr) -> Result<()> {
        self.add_address_option(DhcpOptionCode::SubnetMask, mask)
    }

    pub fn search_subnet_mask(&self) -> Option<Ipv4Addr> {
        self.search_address_option(DhcpOptionCode::SubnetMask)
    }

    /// Add a routers option (code 3).
    pub fn add_routers_option(&mut self, routers: &[Ipv4Addr]) -> Result<()> {
        self.add_address_list_option(DhcpOptionCode::Routers, routers)
    }

    pub fn search_routers_option(&self) -> Option<Vec<Ipv4Addr>> {
        self.search_address_list_option(DhcpOptionCode::Routers)
    }

    /// Add a domain-name-servers option (code 6).
    pub fn add_dns_option(&mut self, servers: &[Ipv4Addr]) -> Result<()> {
        self.add_address_list_option(DhcpOptionCode::DomainNameServers, servers)
    }

    pub fn search_dns_option(&self) -> Option<Vec<Ipv4Addr>> {
        self.search_address_list_option(DhcpOptionCode::DomainNameServers)
    }

    /// Add a broadcast-address option (code 28).
    pub fn add_broadcast_option(&mut self, address: Ipv4Addr) -> Result<()> {
        self.add_address_option(DhcpOptionCode::BroadcastAddress, address)
    }

    pub fn search_broadcast_option(&self) -> Option<Ipv4Addr> {
        self.search_address_option(DhcpOptionCode::BroadcastAddress)
    }

    /// Add a domain-name option (code 15).
    pub fn add_domain_name(&mut self, name: &str) -> Result<()> {
        self.add_option(Tlv::new(
            DhcpOptionCode::DomainName as u8,
            name.as_bytes().to_vec(),
        )?)
    }

    pub fn search_domain_name(&self) -> Option<String> {
        Some(self.search_option(DhcpOptionCode::DomainName)?.text())
    }

    fn add_address_option(&mut self, code: DhcpOptionCode, address: Ipv4Addr) -> Result<()> {
        self.add_option(Tlv::new(code as u8, address.octets().to_vec())?)
    }

    fn search_address_option(&self, code: DhcpOptionCode) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::from(self.search_option(code)?.as_u32_be()?))
    }

    fn add_address_list_option(
        &mut self,
        code: DhcpOptionCode,
        addresses: &[Ipv4Addr],
    ) -> Result<()> {
        let mut value = Vec::with_capacity(addresses.len() * 4);
        for address in addresses {
            value.extend_from_slice(&address.octets());
        }
        self.add_option(Tlv::new(code as u8, value)?)
    }

    fn search_address_list_option(&self, code: DhcpOptionCode) -> Option<Vec<Ipv4Addr>> {
        let words = self.search_option(code)?.u32_list_be().ok()?;
        Some(words.into_iter().map(Ipv4Addr::from).collect())
    }

    pub(crate) fn header_size(&self) -> usize {
        // Fixed header, cookie, options, END
        BOOTP_HEADER_SIZE + 4 + self.options.encoded_len() + 1
    }

    pub(crate) fn write_header(&self, buf: &mut [u8]) {
        let mut w = &mut buf[..];
        self.bootp.write(&mut w);
        w.put_u32(self.magic_cookie);
        self.options.write(&mut w, OPTION_SYNTAX);
    }
}

impl Default for Dhcp {
    fn default() -> Self {
        Self::new()
    }
}
