//! Next-protocol demultiplexing
//!
//! Maps a parent layer's next-protocol hint to the constructor for the
//! nested payload. The table is a constant match, keyed by the parent
//! kind and the selector value; nothing registers into it at runtime.
//! A miss is not an error: the residual bytes become a raw leaf.

use tracing::{debug, trace};
use wirestack_core::Result;

use crate::arp::Arp;
use crate::dhcp::{Dhcp, DHCP_CLIENT_PORT, DHCP_SERVER_PORT};
use crate::ethernet::EtherType;
use crate::ip::{IpProtocol, Ipv4};
use crate::ipv6::Ipv6;
use crate::llc::Llc;
use crate::loopback::{PF_INET, PF_LLC};
use crate::pdu::{Pdu, PduKind};
use crate::raw::Raw;
use crate::tcp::Tcp;
use crate::udp::Udp;

/// Next-protocol hint read from a parent header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selector {
    EtherType(u16),
    IpProtocol(u8),
    Ports { src: u16, dst: u16 },
    Family(u32),
}

/// Construct the nested PDU for a payload.
///
/// Unrecognized selectors downgrade to [`Raw`]. A recognized constructor
/// that fails is not retried as raw; the error propagates so the caller
/// can record the partial parse.
pub(crate) fn dissect_payload(parent: PduKind, selector: Selector, buf: &[u8]) -> Result<Pdu> {
    match (parent, selector) {
        (PduKind::Ethernet | PduKind::Sll, Selector::EtherType(value)) => {
            match EtherType::from_u16(value) {
                EtherType::Ipv4 => Ipv4::from_buffer(buf).map(Pdu::Ipv4),
                EtherType::Arp => Arp::from_buffer(buf).map(Pdu::Arp),
                EtherType::Ipv6 => Ipv6::from_buffer(buf).map(Pdu::Ipv6),
                _ => miss(parent, selector, buf),
            }
        }
        (PduKind::Ipv4 | PduKind::Ipv6, Selector::IpProtocol(value)) => {
            match IpProtocol::from_u8(value) {
                IpProtocol::Tcp => Tcp::from_buffer(buf).map(Pdu::Tcp),
                IpProtocol::Udp => Udp::from_buffer(buf).map(Pdu::Udp),
                _ => miss(parent, selector, buf),
            }
        }
        (PduKind::Udp, Selector::Ports { src, dst })
            if [src, dst]
                .iter()
                .any(|&p| p == DHCP_SERVER_PORT || p == DHCP_CLIENT_PORT) =>
        {
            Dhcp::from_buffer(buf).map(Pdu::Dhcp)
        }
        (PduKind::Loopback, Selector::Family(PF_INET)) => Ipv4::from_buffer(buf).map(Pdu::Ipv4),
        (PduKind::Loopback, Selector::Family(PF_LLC)) => Llc::from_buffer(buf).map(Pdu::Llc),
        _ => miss(parent, selector, buf),
    }
}

fn miss(parent: PduKind, selector: Selector, buf: &[u8]) -> Result<Pdu> {
    trace!(?parent, ?selector, len = buf.len(), "no dissector for payload, keeping it raw");
    Ok(Pdu::Raw(Raw::new(buf)))
}

/// Attach a dissected payload, or stash the bytes when the nested
/// constructor failed (fail-soft on a bad inner layer).
pub(crate) fn link_payload(parsed: Result<Pdu>, bytes: &[u8]) -> (Option<Box<Pdu>>, Vec<u8>) {
    match parsed {
        Ok(pdu) => (Some(Box::new(pdu)), Vec::new()),
        Err(err) => {
            debug!(%err, len = bytes.len(), "inner dissection failed, keeping payload unparsed");
            (None, bytes.to_vec())
        }
    }
}

/// EtherType a parent stamps for a nested layer, where one is defined.
pub(crate) fn ethertype_for_kind(kind: PduKind) -> Option<u16> {
    match kind {
        PduKind::Ipv4 => Some(EtherType::Ipv4.to_u16()),
        PduKind::Arp => Some(EtherType::Arp.to_u16()),
        PduKind::Ipv6 => Some(EtherType::Ipv6.to_u16()),
        _ => None,
    }
}

/// IP protocol number a network layer stamps for a nested transport.
pub(crate) fn ip_protocol_for_kind(kind: PduKind) -> Option<u8> {
    match kind {
        PduKind::Tcp => Some(IpProtocol::Tcp.to_u8()),
        // The Udp kind also covers DHCP bodies attached without an
        // explicit transport layer.
        PduKind::Udp => Some(IpProtocol::Udp.to_u8()),
        _ => None,
    }
}
