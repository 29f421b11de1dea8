//! The PDU contract and chain
//!
//! A packet is a chain of protocol data units: each layer owns the next
//! one through its `inner` slot, so dropping the outermost PDU releases
//! the whole stack. The [`Pdu`] sum type is the closed set of bodies the
//! engine knows; dispatch is a match on the discriminator, not virtual
//! calls.
//!
//! Serialization is the two-pass algorithm: one recursive sum computes
//! the total size, then headers are written into a single pre-allocated
//! buffer. Layers whose header depends on the finished payload (checksum
//! bearers) write after their inner PDU; everything else writes before.

use wirestack_core::Result;

use crate::arp::Arp;
use crate::dhcp::Dhcp;
use crate::dot11::{self, Dot11Beacon, Dot11ProbeResponse};
use crate::ethernet::Ethernet;
use crate::ip::Ipv4;
use crate::ipv6::Ipv6;
use crate::llc::Llc;
use crate::loopback::Loopback;
use crate::raw::Raw;
use crate::sll::Sll;
use crate::tcp::Tcp;
use crate::udp::Udp;

/// Runtime discriminator for the closed set of PDU bodies.
///
/// Note that a DHCP body reports [`PduKind::Udp`] (see [`Dhcp`]); the
/// `Dhcp` discriminant exists so the set stays closed and callers can
/// still name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduKind {
    Ethernet,
    Sll,
    Llc,
    Arp,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Dhcp,
    Dot11Beacon,
    Dot11ProbeResponse,
    Loopback,
    Raw,
}

/// Data-link type of a captured buffer, from the libpcap DLT set.
///
/// The link type selects the outermost constructor in
/// [`Pdu::from_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// BSD loopback encapsulation (DLT_NULL)
    Null,
    /// Ethernet II (DLT_EN10MB)
    En10Mb,
    /// Raw IP, no link framing (DLT_RAW)
    Raw,
    /// IEEE 802.11 MAC frames (DLT_IEEE802_11)
    Ieee80211,
    /// Linux cooked capture (DLT_LINUX_SLL)
    LinuxSll,
}

impl LinkType {
    /// The libpcap DLT number.
    pub fn dlt(self) -> u32 {
        match self {
            LinkType::Null => 0,
            LinkType::En10Mb => 1,
            LinkType::Raw => 101,
            LinkType::Ieee80211 => 105,
            LinkType::LinuxSll => 113,
        }
    }

    pub fn from_dlt(value: u32) -> Option<Self> {
        match value {
            0 => Some(LinkType::Null),
            1 => Some(LinkType::En10Mb),
            101 => Some(LinkType::Raw),
            105 => Some(LinkType::Ieee80211),
            113 => Some(LinkType::LinuxSll),
            _ => None,
        }
    }
}

/// One protocol layer, owning the rest of the stack through its inner
/// slot.
#[derive(Debug, Clone)]
pub enum Pdu {
    Ethernet(Ethernet),
    Sll(Sll),
    Llc(Llc),
    Arp(Arp),
    Ipv4(Ipv4),
    Ipv6(Ipv6),
    Tcp(Tcp),
    Udp(Udp),
    Dhcp(Dhcp),
    Dot11Beacon(Dot11Beacon),
    Dot11ProbeResponse(Dot11ProbeResponse),
    Loopback(Loopback),
    Raw(Raw),
}

/// Layers whose header covers the finished payload write after it.
enum WriteOrder {
    Pre,
    Post,
}

fn write_order(kind: PduKind) -> WriteOrder {
    match kind {
        PduKind::Ipv4 | PduKind::Tcp | PduKind::Udp => WriteOrder::Post,
        _ => WriteOrder::Pre,
    }
}

impl Pdu {
    /// Parse a captured buffer, selecting the outermost codec from the
    /// data-link type. Nested layers are recognized through the
    /// demultiplexer and attached as the chain of inner PDUs.
    pub fn from_bytes(link: LinkType, buf: &[u8]) -> Result<Pdu> {
        match link {
            LinkType::Null => Loopback::from_buffer(buf).map(Pdu::Loopback),
            LinkType::En10Mb => Ethernet::from_buffer(buf).map(Pdu::Ethernet),
            LinkType::Raw => Ipv4::from_buffer(buf).map(Pdu::Ipv4),
            LinkType::Ieee80211 => dot11::from_buffer(buf),
            LinkType::LinuxSll => Sll::from_buffer(buf).map(Pdu::Sll),
        }
    }

    /// Runtime discriminator for this layer.
    pub fn kind(&self) -> PduKind {
        match self {
            Pdu::Ethernet(_) => PduKind::Ethernet,
            Pdu::Sll(_) => PduKind::Sll,
            Pdu::Llc(_) => PduKind::Llc,
            Pdu::Arp(_) => PduKind::Arp,
            Pdu::Ipv4(_) => PduKind::Ipv4,
            Pdu::Ipv6(_) => PduKind::Ipv6,
            Pdu::Tcp(_) => PduKind::Tcp,
            // DHCP advertises its transport kind; see the Dhcp docs.
            Pdu::Udp(_) | Pdu::Dhcp(_) => PduKind::Udp,
            Pdu::Dot11Beacon(_) => PduKind::Dot11Beacon,
            Pdu::Dot11ProbeResponse(_) => PduKind::Dot11ProbeResponse,
            Pdu::Loopback(_) => PduKind::Loopback,
            Pdu::Raw(_) => PduKind::Raw,
        }
    }

    /// Bytes this layer contributes, excluding inner PDUs. Protocols with
    /// an option or element area fold it into this figure.
    pub fn header_size(&self) -> usize {
        match self {
            Pdu::Ethernet(p) => p.header_size(),
            Pdu::Sll(p) => p.header_size(),
            Pdu::Llc(p) => p.header_size(),
            Pdu::Arp(p) => p.header_size(),
            Pdu::Ipv4(p) => p.header_size(),
            Pdu::Ipv6(p) => p.header_size(),
            Pdu::Tcp(p) => p.header_size(),
            Pdu::Udp(p) => p.header_size(),
            Pdu::Dhcp(p) => p.header_size(),
            Pdu::Dot11Beacon(p) => p.header_size(),
            Pdu::Dot11ProbeResponse(p) => p.header_size(),
            Pdu::Loopback(p) => p.header_size(),
            Pdu::Raw(p) => p.header_size(),
        }
    }

    /// Total on-wire size of this layer and everything inside it.
    pub fn size(&self) -> usize {
        self.header_size() + self.inner_pdu().map_or(0, Pdu::size)
    }

    fn inner_slot(&self) -> &Option<Box<Pdu>> {
        match self {
            Pdu::Ethernet(p) => &p.inner,
            Pdu::Sll(p) => &p.inner,
            Pdu::Llc(p) => &p.inner,
            Pdu::Arp(p) => &p.inner,
            Pdu::Ipv4(p) => &p.inner,
            Pdu::Ipv6(p) => &p.inner,
            Pdu::Tcp(p) => &p.inner,
            Pdu::Udp(p) => &p.inner,
            Pdu::Dhcp(p) => &p.inner,
            Pdu::Dot11Beacon(p) => &p.inner,
            Pdu::Dot11ProbeResponse(p) => &p.inner,
            Pdu::Loopback(p) => &p.inner,
            Pdu::Raw(p) => &p.inner,
        }
    }

    fn inner_slot_mut(&mut self) -> &mut Option<Box<Pdu>> {
        match self {
            Pdu::Ethernet(p) => &mut p.inner,
            Pdu::Sll(p) => &mut p.inner,
            Pdu::Llc(p) => &mut p.inner,
            Pdu::Arp(p) => &mut p.inner,
            Pdu::Ipv4(p) => &mut p.inner,
            Pdu::Ipv6(p) => &mut p.inner,
            Pdu::Tcp(p) => &mut p.inner,
            Pdu::Udp(p) => &mut p.inner,
            Pdu::Dhcp(p) => &mut p.inner,
            Pdu::Dot11Beacon(p) => &mut p.inner,
            Pdu::Dot11ProbeResponse(p) => &mut p.inner,
            Pdu::Loopback(p) => &mut p.inner,
            Pdu::Raw(p) => &mut p.inner,
        }
    }

    /// The next PDU in the stack, if any.
    pub fn inner_pdu(&self) -> Option<&Pdu> {
        self.inner_slot().as_deref()
    }

    pub fn inner_pdu_mut(&mut self) -> Option<&mut Pdu> {
        self.inner_slot_mut().as_deref_mut()
    }

    /// Attach a new inner PDU, dropping any previous one.
    ///
    /// Attaching is a move: to re-parent a child, detach it first with
    /// [`Pdu::take_inner_pdu`]. A PDU can therefore never appear inside
    /// two parents at once.
    pub fn set_inner_pdu(&mut self, pdu: Pdu) {
        *self.inner_slot_mut() = Some(Box::new(pdu));
    }

    /// Detach and return the inner PDU, leaving the slot empty.
    pub fn take_inner_pdu(&mut self) -> Option<Pdu> {
        self.inner_slot_mut().take().map(|boxed| *boxed)
    }

    /// Residual payload bytes kept aside when an inner constructor
    /// failed. Empty on a fully parsed chain.
    pub fn unparsed_payload(&self) -> &[u8] {
        match self {
            Pdu::Ethernet(p) => &p.leftover,
            Pdu::Sll(p) => &p.leftover,
            Pdu::Ipv4(p) => &p.leftover,
            Pdu::Ipv6(p) => &p.leftover,
            Pdu::Udp(p) => &p.leftover,
            Pdu::Loopback(p) => &p.leftover,
            _ => &[],
        }
    }

    /// Iterate over the chain from this layer inward.
    pub fn iter(&self) -> PduChain<'_> {
        PduChain { next: Some(self) }
    }

    /// Outermost PDU in the chain with the given kind, or `None`.
    pub fn find(&self, kind: PduKind) -> Option<&Pdu> {
        self.iter().find(|p| p.kind() == kind)
    }

    /// Serialize this layer and everything inside it.
    ///
    /// Called on the outermost PDU this yields the full packet; called on
    /// a nested layer it yields the suffix from that layer inward.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size()];
        self.write(&mut buf, None);
        buf
    }

    /// Write pass. `buf` spans this layer's header plus its payload;
    /// `parent` is the enclosing layer, threaded down so checksum bearers
    /// can reach the addresses of their network layer.
    pub(crate) fn write(&self, buf: &mut [u8], parent: Option<&Pdu>) {
        let header = self.header_size();
        match write_order(self.kind()) {
            WriteOrder::Pre => {
                self.write_header(buf, parent);
                if let Some(inner) = self.inner_pdu() {
                    inner.write(&mut buf[header..], Some(self));
                }
            }
            WriteOrder::Post => {
                if let Some(inner) = self.inner_pdu() {
                    inner.write(&mut buf[header..], Some(self));
                }
                self.write_header(buf, parent);
            }
        }
    }

    fn write_header(&self, buf: &mut [u8], parent: Option<&Pdu>) {
        match self {
            Pdu::Ethernet(p) => p.write_header(buf),
            Pdu::Sll(p) => p.write_header(buf),
            Pdu::Llc(p) => p.write_header(buf),
            Pdu::Arp(p) => p.write_header(buf),
            Pdu::Ipv4(p) => p.write_header(buf),
            Pdu::Ipv6(p) => p.write_header(buf),
            Pdu::Tcp(p) => p.write_header(buf, parent),
            Pdu::Udp(p) => p.write_header(buf, parent),
            Pdu::Dhcp(p) => p.write_header(buf),
            Pdu::Dot11Beacon(p) => p.write_header(buf),
            Pdu::Dot11ProbeResponse(p) => p.write_header(buf),
            Pdu::Loopback(p) => p.write_header(buf),
            Pdu::Raw(p) => p.write_header(buf),
        }
    }
}

macro_rules! downcasts {
    ($(($as:ident, $as_mut:ident, $variant:ident, $ty:ty)),* $(,)?) => {
        impl Pdu {
            $(
                /// Borrow this layer as its concrete body, or `None` if
                /// it is a different variant.
                pub fn $as(&self) -> Option<&$ty> {
                    match self {
                        Pdu::$variant(p) => Some(p),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Pdu::$variant(p) => Some(p),
                        _ => None,
                    }
                }
            )*
        }
    };
}

downcasts!(
    (as_ethernet, as_ethernet_mut, Ethernet, Ethernet),
    (as_sll, as_sll_mut, Sll, Sll),
    (as_llc, as_llc_mut, Llc, Llc),
    (as_arp, as_arp_mut, Arp, Arp),
    (as_ipv4, as_ipv4_mut, Ipv4, Ipv4),
    (as_ipv6, as_ipv6_mut, Ipv6, Ipv6),
    (as_tcp, as_tcp_mut, Tcp, Tcp),
    (as_udp, as_udp_mut, Udp, Udp),
    (as_dhcp, as_dhcp_mut, Dhcp, Dhcp),
    (as_dot11_beacon, as_dot11_beacon_mut, Dot11Beacon, Dot11Beacon),
    (
        as_dot11_probe_response,
        as_dot11_probe_response_mut,
        Dot11ProbeResponse,
        Dot11ProbeResponse
    ),
    (as_loopback, as_loopback_mut, Loopback, Loopback),
    (as_raw, as_raw_mut, Raw, Raw),
);

/// Iterator over a PDU chain, outermost layer first.
pub struct PduChain<'a> {
    next: Option<&'a Pdu>,
}

impl<'a> Iterator for PduChain<'a> {
    type Item = &'a Pdu;

    fn next(&mut self) -> Option<&'a Pdu> {
        let current = self.next?;
        self.next = current.inner_pdu();
        Some(current)
    }
}
