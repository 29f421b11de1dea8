//! Packet dissection and crafting library for wirestack
//!
//! This crate turns captured byte buffers into typed, introspectable
//! chains of protocol data units, and serializes composed chains back
//! into bit-exact wire bytes. It covers:
//!
//! - **Link layers**: Ethernet II, Linux cooked capture (SLL), the BSD
//!   loopback encapsulation, LLC, and IEEE 802.11 management frames
//! - **Network layers**: IPv4 (with header checksum stamping), IPv6, ARP
//! - **Transports**: TCP and UDP with pseudo-header checksums
//! - **Applications**: DHCP with its BOOTP header and option list
//!
//! The engine is pure computation: it performs no I/O, keeps no global
//! state, and completes every operation synchronously. Capture sources
//! and raw-socket senders are external collaborators.
//!
//! # Quick start
//!
//! Compose a DHCP discover stack, serialize it, and parse it back:
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use wirestack_packet::dhcp::{Dhcp, DhcpMessageType};
//! use wirestack_packet::ip::Ipv4;
//! use wirestack_packet::loopback::{Loopback, PF_INET};
//! use wirestack_packet::udp::Udp;
//! use wirestack_packet::{LinkType, Pdu};
//!
//! let mut dhcp = Dhcp::new();
//! dhcp.add_type_option(DhcpMessageType::Discover).unwrap();
//!
//! let mut udp = Pdu::Udp(Udp::new(68, 67));
//! udp.set_inner_pdu(Pdu::Dhcp(dhcp));
//! let mut ip = Pdu::Ipv4(Ipv4::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST));
//! ip.set_inner_pdu(udp);
//! let mut packet = Pdu::Loopback(Loopback::new(PF_INET));
//! packet.set_inner_pdu(ip);
//!
//! let bytes = packet.serialize();
//! let parsed = Pdu::from_bytes(LinkType::Null, &bytes).unwrap();
//! assert!(parsed.iter().find_map(Pdu::as_dhcp).is_some());
//! assert_eq!(parsed.serialize(), bytes);
//! ```

pub mod arp;
pub mod checksum;
mod demux;
pub mod dhcp;
pub mod dot11;
pub mod ethernet;
pub mod ip;
pub mod ipv6;
pub mod llc;
pub mod loopback;
pub mod pdu;
pub mod raw;
pub mod sll;
pub mod tcp;
pub mod udp;


// Re-export commonly used types
pub use pdu::{LinkType, Pdu, PduChain, PduKind};
pub use wirestack_core::{Error, ListSyntax, Result, Tlv, TlvList};
