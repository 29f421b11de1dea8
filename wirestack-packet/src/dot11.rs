//! IEEE 802.11 management frames
//!
//! Multi-byte fields are little-endian on the wire, per the standard.
//! The frame-control byte selects the body variant: beacons and probe
//! responses share the same fixed parameters (timestamp, beacon
//! interval, capability information) followed by a trailer of tagged
//! elements. Tagged elements have no end sentinel; the list runs to the
//! frame boundary.

use bytes::BufMut;
use tracing::trace;
use wirestack_core::{Error, ListSyntax, Result, Tlv, TlvList};

use crate::ethernet::MacAddress;
use crate::pdu::Pdu;
use crate::raw::Raw;

/// Management frame type
pub const TYPE_MANAGEMENT: u8 = 0;

/// Control frame type
pub const TYPE_CONTROL: u8 = 1;

/// Data frame type
pub const TYPE_DATA: u8 = 2;

/// Probe-response management subtype
pub const SUBTYPE_PROBE_RESPONSE: u8 = 5;

/// Beacon management subtype
pub const SUBTYPE_BEACON: u8 = 8;

/// Fixed management header: frame control, duration, three addresses,
/// sequence control
pub const MANAGEMENT_HEADER_SIZE: usize = 24;

const FIXED_PARAMETERS_SIZE: usize = 12;

/// Select the frame-body variant for a raw 802.11 buffer.
///
/// Unrecognized type/subtype combinations keep the whole frame raw.
pub(crate) fn from_buffer(buf: &[u8]) -> Result<Pdu> {
    if buf.len() < 2 {
        return Err(Error::too_short(2, buf.len()));
    }
    let frame_type = (buf[0] >> 2) & 0b11;
    let subtype = buf[0] >> 4;
    match (frame_type, subtype) {
        (TYPE_MANAGEMENT, SUBTYPE_BEACON) => Dot11Beacon::from_buffer(buf).map(Pdu::Dot11Beacon),
        (TYPE_MANAGEMENT, SUBTYPE_PROBE_RESPONSE) => {
            Dot11ProbeResponse::from_buffer(buf).map(Pdu::Dot11ProbeResponse)
        }
        _ => {
            trace!(frame_type, subtype, "unrecognized 802.11 frame, keeping it raw");
            Ok(Pdu::Raw(Raw::new(buf)))
        }
    }
}

/// The flag half of the frame-control field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    pub to_ds: bool,
    pub from_ds: bool,
    pub more_fragments: bool,
    pub retry: bool,
    pub power_management: bool,
    pub more_data: bool,
    pub protected: bool,
    pub order: bool,
}

impl FrameFlags {
    pub fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.to_ds {
            flags |= 0b0000_0001;
        }
        if self.from_ds {
            flags |= 0b0000_0010;
        }
        if self.more_fragments {
            flags |= 0b0000_0100;
        }
        if self.retry {
            flags |= 0b0000_1000;
        }
        if self.power_management {
            flags |= 0b0001_0000;
        }
        if self.more_data {
            flags |= 0b0010_0000;
        }
        if self.protected {
            flags |= 0b0100_0000;
        }
        if self.order {
            flags |= 0b1000_0000;
        }
        flags
    }

    pub fn from_u8(value: u8) -> Self {
        FrameFlags {
            to_ds: (value & 0b0000_0001) != 0,
            from_ds: (value & 0b0000_0010) != 0,
            more_fragments: (value & 0b0000_0100) != 0,
            retry: (value & 0b0000_1000) != 0,
            power_management: (value & 0b0001_0000) != 0,
            more_data: (value & 0b0010_0000) != 0,
            protected: (value & 0b0100_0000) != 0,
            order: (value & 0b1000_0000) != 0,
        }
    }
}

/// The 16-bit capability information field of beacon and probe-response
/// frames, bit assignments per IEEE 802.11-2012.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityInformation {
    pub ess: bool,
    pub ibss: bool,
    pub cf_poll: bool,
    pub cf_poll_req: bool,
    pub privacy: bool,
    pub short_preamble: bool,
    pub pbcc: bool,
    pub channel_agility: bool,
    pub spectrum_management: bool,
    pub qos: bool,
    pub short_slot_time: bool,
    pub apsd: bool,
    pub reserved: bool,
    pub dsss_ofdm: bool,
    pub delayed_block_ack: bool,
    pub immediate_block_ack: bool,
}

impl CapabilityInformation {
    pub fn to_u16(self) -> u16 {
        let bits = [
            self.ess,
            self.ibss,
            self.cf_poll,
            self.cf_poll_req,
            self.privacy,
            self.short_preamble,
            self.pbcc,
            self.channel_agility,
            self.spectrum_management,
            self.qos,
            self.short_slot_time,
            self.apsd,
            self.reserved,
            self.dsss_ofdm,
            self.delayed_block_ack,
            self.immediate_block_ack,
        ];
        bits.iter()
            .enumerate()
            .fold(0, |acc, (i, &b)| acc | ((b as u16) << i))
    }

    pub fn from_u16(value: u16) -> Self {
        let bit = |i: u16| value & (1 << i) != 0;
        CapabilityInformation {
            ess: bit(0),
            ibss: bit(1),
            cf_poll: bit(2),
            cf_poll_req: bit(3),
            privacy: bit(4),
            short_preamble: bit(5),
            pbcc: bit(6),
            channel_agility: bit(7),
            spectrum_management: bit(8),
            qos: bit(9),
            short_slot_time: bit(10),
            apsd: bit(11),
            reserved: bit(12),
            dsss_ofdm: bit(13),
            delayed_block_ack: bit(14),
            immediate_block_ack: bit(15),
        }
    }
}

/// Fixed header shared by all management frames
#[derive(Debug, Clone, Default)]
pub struct ManagementHeader {
    protocol_version: u8,
    /// Frame-control flags
    pub flags: FrameFlags,
    /// Duration / association ID
    pub duration_id: u16,
    /// Receiver address
    pub addr1: MacAddress,
    /// Transmitter address
    pub addr2: MacAddress,
    /// BSSID / filtering address
    pub addr3: MacAddress,
    fragment_number: u8,
    sequence_number: u16,
}

impl ManagementHeader {
    fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < MANAGEMENT_HEADER_SIZE {
            return Err(Error::too_short(MANAGEMENT_HEADER_SIZE, buf.len()));
        }
        let sequence_control = u16::from_le_bytes([buf[22], buf[23]]);
        Ok(ManagementHeader {
            protocol_version: buf[0] & 0b11,
            flags: FrameFlags::from_u8(buf[1]),
            duration_id: u16::from_le_bytes([buf[2], buf[3]]),
            addr1: MacAddress::from_slice(&buf[4..10]).unwrap(),
            addr2: MacAddress::from_slice(&buf[10..16]).unwrap(),
            addr3: MacAddress::from_slice(&buf[16..22]).unwrap(),
            fragment_number: (sequence_control & 0x000F) as u8,
            sequence_number: sequence_control >> 4,
        })
    }

    fn write(&self, w: &mut impl BufMut, subtype: u8) {
        w.put_u8((subtype << 4) | (TYPE_MANAGEMENT << 2) | self.protocol_version);
        w.put_u8(self.flags.to_u8());
        w.put_u16_le(self.duration_id);
        w.put_slice(self.addr1.as_bytes());
        w.put_slice(self.addr2.as_bytes());
        w.put_slice(self.addr3.as_bytes());
        w.put_u16_le((self.sequence_number << 4) | self.fragment_number as u16);
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Set the protocol version. The field is 2 bits wide.
    pub fn set_protocol_version(&mut self, version: u8) -> Result<()> {
        if version > 0b11 {
            return Err(Error::overflow("protocol version", version as u64, 0b11));
        }
        self.protocol_version = version;
        Ok(())
    }

    pub fn fragment_number(&self) -> u8 {
        self.fragment_number
    }

    /// Set the fragment number. The field is 4 bits wide.
    pub fn set_fragment_number(&mut self, fragment: u8) -> Result<()> {
        if fragment > 0x0F {
            return Err(Error::overflow("fragment number", fragment as u64, 0x0F));
        }
        self.fragment_number = fragment;
        Ok(())
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Set the sequence number. The field is 12 bits wide.
    pub fn set_sequence_number(&mut self, sequence: u16) -> Result<()> {
        if sequence > 0x0FFF {
            return Err(Error::overflow("sequence number", sequence as u64, 0x0FFF));
        }
        self.sequence_number = sequence;
        Ok(())
    }
}

/// Tagged element identifiers with typed views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementId {
    Ssid = 0,
    SupportedRates = 1,
    FhParameterSet = 2,
    DsParameterSet = 3,
    CfParameterSet = 4,
    Tim = 5,
    IbssParameterSet = 6,
    Country = 7,
    BssLoad = 11,
    ChallengeText = 16,
    PowerConstraint = 32,
    ChannelSwitch = 37,
    Quiet = 40,
    ErpInformation = 42,
    Rsn = 48,
    ExtendedSupportedRates = 50,
}

impl ElementId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ElementId::Ssid),
            1 => Some(ElementId::SupportedRates),
            2 => Some(ElementId::FhParameterSet),
            3 => Some(ElementId::DsParameterSet),
            4 => Some(ElementId::CfParameterSet),
            5 => Some(ElementId::Tim),
            6 => Some(ElementId::IbssParameterSet),
            7 => Some(ElementId::Country),
            11 => Some(ElementId::BssLoad),
            16 => Some(ElementId::ChallengeText),
            32 => Some(ElementId::PowerConstraint),
            37 => Some(ElementId::ChannelSwitch),
            40 => Some(ElementId::Quiet),
            42 => Some(ElementId::ErpInformation),
            48 => Some(ElementId::Rsn),
            50 => Some(ElementId::ExtendedSupportedRates),
            _ => None,
        }
    }
}

/// Traffic indication map element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tim {
    pub dtim_count: u8,
    pub dtim_period: u8,
    pub bitmap_control: u8,
    pub partial_virtual_bitmap: Vec<u8>,
}

/// Country element: a 3-byte country string plus parallel triples of
/// first channel, channel count and maximum transmit power.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountryParams {
    pub country: String,
    pub first_channel: Vec<u8>,
    pub number_channels: Vec<u8>,
    pub max_transmit_power: Vec<u8>,
}

/// Channel switch announcement element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSwitch {
    pub switch_mode: u8,
    pub new_channel: u8,
    pub switch_count: u8,
}

/// Quiet element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quiet {
    pub quiet_count: u8,
    pub quiet_period: u8,
    pub quiet_duration: u16,
    pub quiet_offset: u16,
}

/// BSS load element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BssLoad {
    pub station_count: u16,
    pub channel_utilization: u8,
    pub available_capacity: u16,
}

/// Cipher suites of the RSN element (OUI 00-0F-AC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CipherSuite {
    UseGroup = 0,
    Wep40 = 1,
    Tkip = 2,
    Ccmp = 4,
    Wep104 = 5,
}

impl CipherSuite {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CipherSuite::UseGroup),
            1 => Some(CipherSuite::Wep40),
            2 => Some(CipherSuite::Tkip),
            4 => Some(CipherSuite::Ccmp),
            5 => Some(CipherSuite::Wep104),
            _ => None,
        }
    }
}

/// Authentication and key management suites of the RSN element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AkmSuite {
    Ieee8021x = 1,
    Psk = 2,
}

impl AkmSuite {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AkmSuite::Ieee8021x),
            2 => Some(AkmSuite::Psk),
            _ => None,
        }
    }
}

const SUITE_OUI: [u8; 3] = [0x00, 0x0F, 0xAC];

/// Robust security network element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsnInformation {
    pub version: u16,
    pub group_suite: CipherSuite,
    pairwise_suites: Vec<CipherSuite>,
    akm_suites: Vec<AkmSuite>,
    pub capabilities: u16,
}

impl RsnInformation {
    pub fn new() -> Self {
        RsnInformation {
            version: 1,
            group_suite: CipherSuite::Ccmp,
            pairwise_suites: Vec::new(),
            akm_suites: Vec::new(),
            capabilities: 0,
        }
    }

    pub fn add_pairwise_suite(&mut self, suite: CipherSuite) {
        self.pairwise_suites.push(suite);
    }

    pub fn add_akm_suite(&mut self, suite: AkmSuite) {
        self.akm_suites.push(suite);
    }

    pub fn pairwise_suites(&self) -> &[CipherSuite] {
        &self.pairwise_suites
    }

    pub fn akm_suites(&self) -> &[AkmSuite] {
        &self.akm_suites
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 4 * (self.pairwise_suites.len() + self.akm_suites.len()) + 4);
        out.put_u16_le(self.version);
        out.put_slice(&SUITE_OUI);
        out.put_u8(self.group_suite as u8);
        out.put_u16_le(self.pairwise_suites.len() as u16);
        for suite in &self.pairwise_suites {
            out.put_slice(&SUITE_OUI);
            out.put_u8(*suite as u8);
        }
        out.put_u16_le(self.akm_suites.len() as u16);
        for suite in &self.akm_suites {
            out.put_slice(&SUITE_OUI);
            out.put_u8(*suite as u8);
        }
        out.put_u16_le(self.capabilities);
        out
    }

    fn parse(value: &[u8]) -> Option<Self> {
        fn suite_type(buf: &[u8]) -> Option<u8> {
            (buf[..3] == SUITE_OUI).then(|| buf[3])
        }

        if value.len() < 8 {
            return None;
        }
        let version = u16::from_le_bytes([value[0], value[1]]);
        let group_suite = CipherSuite::from_u8(suite_type(&value[2..6])?)?;
        let pairwise_count = u16::from_le_bytes([value[6], value[7]]) as usize;
        let mut offset = 8;

        if value.len() < offset + pairwise_count * 4 + 2 {
            return None;
        }
        let mut pairwise_suites = Vec::with_capacity(pairwise_count);
        for _ in 0..pairwise_count {
            pairwise_suites.push(CipherSuite::from_u8(suite_type(&value[offset..offset + 4])?)?);
            offset += 4;
        }

        let akm_count = u16::from_le_bytes([value[offset], value[offset + 1]]) as usize;
        offset += 2;
        if value.len() < offset + akm_count * 4 + 2 {
            return None;
        }
        let mut akm_suites = Vec::with_capacity(akm_count);
        for _ in 0..akm_count {
            akm_suites.push(AkmSuite::from_u8(suite_type(&value[offset..offset + 4])?)?);
            offset += 4;
        }

        let capabilities = u16::from_le_bytes([value[offset], value[offset + 1]]);
        Some(RsnInformation {
            version,
            group_suite,
            pairwise_suites,
            akm_suites,
            capabilities,
        })
    }
}

impl Default for RsnInformation {
    fn default() -> Self {
        Self::new()
    }
}

/// The tagged-element trailer of a management frame.
///
/// The parser tolerates any element order. Typed setters insert in
/// tag-ascending position as long as every present tag is recognized;
/// once an unrecognized tag is present (parsed vendor elements, or one
/// injected through [`TaggedElements::insert`]), insertion order is
/// preserved so the frame round-trips byte-exactly.
#[derive(Debug, Clone, Default)]
pub struct TaggedElements {
    list: TlvList,
}

impl TaggedElements {
    pub fn new() -> Self {
        TaggedElements::default()
    }

    fn parse(buf: &[u8]) -> Result<Self> {
        let (list, _) = TlvList::parse(buf, ListSyntax::PLAIN)?;
        Ok(TaggedElements { list })
    }

    /// First element with the given identifier.
    pub fn get(&self, id: ElementId) -> Option<&Tlv> {
        self.list.find(id as u8)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tlv> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Add an element, keeping canonical tag order while every present
    /// tag is recognized; otherwise append.
    pub fn insert(&mut self, element: Tlv) {
        let all_recognized = ElementId::from_u8(element.code()).is_some()
            && self.list.iter().all(|t| ElementId::from_u8(t.code()).is_some());
        if all_recognized {
            let position = self
                .list
                .iter()
                .position(|t| t.code() > element.code())
                .unwrap_or(self.list.len());
            self.list.insert(position, element);
        } else {
            self.list.push(element);
        }
    }

    /// Replace the first element with this tag, or insert it.
    fn set(&mut self, element: Tlv) {
        self.list.remove_first(element.code());
        self.insert(element);
    }

    pub(crate) fn encoded_len(&self) -> usize {
        self.list.encoded_len()
    }

    pub(crate) fn write(&self, w: &mut impl BufMut) {
        self.list.write(w, ListSyntax::PLAIN);
    }

    pub fn ssid(&self) -> Option<String> {
        Some(self.get(ElementId::Ssid)?.text())
    }

    pub fn set_ssid(&mut self, ssid: &str) -> Result<()> {
        self.set(Tlv::new(ElementId::Ssid as u8, ssid.as_bytes().to_vec())?);
        Ok(())
    }

    /// Rates in Mb/s. The high bit of each encoded byte flags a
    /// basic rate; the low seven bits count 0.5 Mb/s units.
    pub fn supported_rates(&self) -> Option<Vec<f32>> {
        Some(decode_rates(self.get(ElementId::SupportedRates)?))
    }

    pub fn set_supported_rates(&mut self, rates: &[f32]) -> Result<()> {
        self.set(Tlv::new(ElementId::SupportedRates as u8, encode_rates(rates))?);
        Ok(())
    }

    pub fn extended_supported_rates(&self) -> Option<Vec<f32>> {
        Some(decode_rates(self.get(ElementId::ExtendedSupportedRates)?))
    }

    pub fn set_extended_supported_rates(&mut self, rates: &[f32]) -> Result<()> {
        self.set(Tlv::new(
            ElementId::ExtendedSupportedRates as u8,
            encode_rates(rates),
        )?);
        Ok(())
    }

    /// Current channel, from the DS parameter set.
    pub fn ds_parameter_set(&self) -> Option<u8> {
        self.get(ElementId::DsParameterSet)?.as_u8()
    }

    pub fn set_ds_parameter_set(&mut self, channel: u8) -> Result<()> {
        self.set(Tlv::new(ElementId::DsParameterSet as u8, vec![channel])?);
        Ok(())
    }

    /// ATIM window, from the IBSS parameter set.
    pub fn ibss_parameter_set(&self) -> Option<u16> {
        let value = self.get(ElementId::IbssParameterSet)?.value();
        Some(u16::from_le_bytes(value.try_into().ok()?))
    }

    pub fn set_ibss_parameter_set(&mut self, atim_window: u16) -> Result<()> {
        self.set(Tlv::new(
            ElementId::IbssParameterSet as u8,
            atim_window.to_le_bytes().to_vec(),
        )?);
        Ok(())
    }

    pub fn erp_information(&self) -> Option<u8> {
        self.get(ElementId::ErpInformation)?.as_u8()
    }

    pub fn set_erp_information(&mut self, erp: u8) -> Result<()> {
        self.set(Tlv::new(ElementId::ErpInformation as u8, vec![erp])?);
        Ok(())
    }

    pub fn power_constraint(&self) -> Option<u8> {
        self.get(ElementId::PowerConstraint)?.as_u8()
    }

    pub fn set_power_constraint(&mut self, constraint: u8) -> Result<()> {
        self.set(Tlv::new(ElementId::PowerConstraint as u8, vec![constraint])?);
        Ok(())
    }

    pub fn challenge_text(&self) -> Option<String> {
        Some(self.get(ElementId::ChallengeText)?.text())
    }

    pub fn set_challenge_text(&mut self, text: &str) -> Result<()> {
        self.set(Tlv::new(
            ElementId::ChallengeText as u8,
            text.as_bytes().to_vec(),
        )?);
        Ok(())
    }

    pub fn tim(&self) -> Option<Tim> {
        let value = self.get(ElementId::Tim)?.value();
        if value.len() < 3 {
            return None;
        }
        Some(Tim {
            dtim_count: value[0],
            dtim_period: value[1],
            bitmap_control: value[2],
            partial_virtual_bitmap: value[3..].to_vec(),
        })
    }

    pub fn set_tim(&mut self, tim: &Tim) -> Result<()> {
        let mut value = vec![tim.dtim_count, tim.dtim_period, tim.bitmap_control];
        value.extend_from_slice(&tim.partial_virtual_bitmap);
        self.set(Tlv::new(ElementId::Tim as u8, value)?);
        Ok(())
    }

    pub fn country(&self) -> Option<CountryParams> {
        let value = self.get(ElementId::Country)?.value();
        if value.len() < 3 || (value.len() - 3) % 3 != 0 {
            return None;
        }
        let mut params = CountryParams {
            country: String::from_utf8_lossy(&value[..3]).into_owned(),
            ..CountryParams::default()
        };
        for triple in value[3..].chunks_exact(3) {
            params.first_channel.push(triple[0]);
            params.number_channels.push(triple[1]);
            params.max_transmit_power.push(triple[2]);
        }
        Some(params)
    }

    pub fn set_country(&mut self, params: &CountryParams) -> Result<()> {
        if params.first_channel.len() != params.number_channels.len()
            || params.first_channel.len() != params.max_transmit_power.len()
        {
            return Err(Error::MalformedOption {
                code: ElementId::Country as u8,
                reason: "channel triples must have equal lengths",
            });
        }
        let mut value = Vec::with_capacity(3 + params.first_channel.len() * 3);
        value.extend_from_slice(params.country.as_bytes());
        for i in 0..params.first_channel.len() {
            value.push(params.first_channel[i]);
            value.push(params.number_channels[i]);
            value.push(params.max_transmit_power[i]);
        }
        self.set(Tlv::new(ElementId::Country as u8, value)?);
        Ok(())
    }

    pub fn channel_switch(&self) -> Option<ChannelSwitch> {
        let value = self.get(ElementId::ChannelSwitch)?.value();
        match *value {
            [switch_mode, new_channel, switch_count] => Some(ChannelSwitch {
                switch_mode,
                new_channel,
                switch_count,
            }),
            _ => None,
        }
    }

    pub fn set_channel_switch(&mut self, cs: ChannelSwitch) -> Result<()> {
        self.set(Tlv::new(
            ElementId::ChannelSwitch as u8,
            vec![cs.switch_mode, cs.new_channel, cs.switch_count],
        )?);
        Ok(())
    }

    pub fn quiet(&self) -> Option<Quiet> {
        let value = self.get(ElementId::Quiet)?.value();
        if value.len() != 6 {
            return None;
        }
        Some(Quiet {
            quiet_count: value[0],
            quiet_period: value[1],
            quiet_duration: u16::from_le_bytes([value[2], value[3]]),
            quiet_offset: u16::from_le_bytes([value[4], value[5]]),
        })
    }

    pub fn set_quiet(&mut self, quiet: Quiet) -> Result<()> {
        let mut value = vec![quiet.quiet_count, quiet.quiet_period];
        value.extend_from_slice(&quiet.quiet_duration.to_le_bytes());
        value.extend_from_slice(&quiet.quiet_offset.to_le_bytes());
        self.set(Tlv::new(ElementId::Quiet as u8, value)?);
        Ok(())
    }

    pub fn bss_load(&self) -> Option<BssLoad> {
        let value = self.get(ElementId::BssLoad)?.value();
        if value.len() != 5 {
            return None;
        }
        Some(BssLoad {
            station_count: u16::from_le_bytes([value[0], value[1]]),
            channel_utilization: value[2],
            available_capacity: u16::from_le_bytes([value[3], value[4]]),
        })
    }

    pub fn set_bss_load(&mut self, load: BssLoad) -> Result<()> {
        let mut value = Vec::with_capacity(5);
        value.extend_from_slice(&load.station_count.to_le_bytes());
        value.push(load.channel_utilization);
        value.extend_from_slice(&load.available_capacity.to_le_bytes());
        self.set(Tlv::new(ElementId::BssLoad as u8, value)?);
        Ok(())
    }

    pub fn rsn_information(&self) -> Option<RsnInformation> {
        RsnInformation::parse(self.get(ElementId::Rsn)?.value())
    }

    pub fn set_rsn_information(&mut self, rsn: &RsnInformation) -> Result<()> {
        self.set(Tlv::new(ElementId::Rsn as u8, rsn.to_bytes())?);
        Ok(())
    }
}

fn decode_rates(tlv: &Tlv) -> Vec<f32> {
    tlv.value().iter().map(|b| (b & 0x7F) as f32 / 2.0).collect()
}

fn encode_rates(rates: &[f32]) -> Vec<u8> {
    rates
        .iter()
        .map(|rate| {
            let encoded = (rate * 2.0) as u8;
            // 1, 2, 5.5 and 11 Mb/s are flagged as basic rates
            if matches!(encoded, 2 | 4 | 11 | 22) {
                encoded | 0x80
            } else {
                encoded
            }
        })
        .collect()
}

fn parse_management_body(
    buf: &[u8],
) -> Result<(ManagementHeader, u64, u16, CapabilityInformation, TaggedElements)> {
    let minimum = MANAGEMENT_HEADER_SIZE + FIXED_PARAMETERS_SIZE;
    if buf.len() < minimum {
        return Err(Error::too_short(minimum, buf.len()));
    }
    let header = ManagementHeader::parse(buf)?;
    let timestamp = u64::from_le_bytes(buf[24..32].try_into().unwrap());
    let interval = u16::from_le_bytes([buf[32], buf[33]]);
    let capabilities = CapabilityInformation::from_u16(u16::from_le_bytes([buf[34], buf[35]]));
    let elements = TaggedElements::parse(&buf[36..])?;
    Ok((header, timestamp, interval, capabilities, elements))
}

macro_rules! beacon_like {
    ($name:ident, $subtype:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            /// Fixed management header
            pub header: ManagementHeader,
            /// TSF timestamp
            pub timestamp: u64,
            /// Beacon interval in time units
            pub interval: u16,
            /// Capability information
            pub capabilities: CapabilityInformation,
            elements: TaggedElements,
            pub(crate) inner: Option<Box<Pdu>>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn from_buffer(buf: &[u8]) -> Result<Self> {
                let (header, timestamp, interval, capabilities, elements) =
                    parse_management_body(buf)?;
                Ok($name {
                    header,
                    timestamp,
                    interval,
                    capabilities,
                    elements,
                    inner: None,
                })
            }

            /// Management subtype carried in the frame control field.
            pub fn subtype(&self) -> u8 {
                $subtype
            }

            /// The tagged-element trailer.
            pub fn elements(&self) -> &TaggedElements {
                &self.elements
            }

            pub fn elements_mut(&mut self) -> &mut TaggedElements {
                &mut self.elements
            }

            pub(crate) fn header_size(&self) -> usize {
                MANAGEMENT_HEADER_SIZE + FIXED_PARAMETERS_SIZE + self.elements.encoded_len()
            }

            pub(crate) fn write_header(&self, buf: &mut [u8]) {
                let mut w = &mut buf[..];
                self.header.write(&mut w, $subtype);
                w.put_u64_le(self.timestamp);
                w.put_u16_le(self.interval);
                w.put_u16_le(self.capabilities.to_u16());
                self.elements.write(&mut w);
            }
        }
    };
}

beacon_like!(Dot11Beacon, SUBTYPE_BEACON, "802.11 beacon frame");
beacon_like!(
    Dot11ProbeResponse,
    SUBTYPE_PROBE_RESPONSE,
    "802.11 probe-response frame; shares the beacon body layout"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_bits_roundtrip() {
        let info = CapabilityInformation::from_u16(0x2095);
        assert!(info.ess);
        assert!(info.cf_poll);
        assert!(info.privacy);
        assert!(info.channel_agility);
        assert!(info.dsss_ofdm);
        assert!(!info.ibss);
        assert!(!info.qos);
        assert_eq!(info.to_u16(), 0x2095);
    }

    #[test]
    fn test_frame_flags_roundtrip() {
        let flags = FrameFlags::from_u8(0b0100_1001);
        assert!(flags.to_ds);
        assert!(flags.retry);
        assert!(flags.protected);
        assert_eq!(flags.to_u8(), 0b0100_1001);
    }

    #[test]
    fn test_narrow_field_setters() {
        let mut header = ManagementHeader::default();
        header.set_fragment_number(15).unwrap();
        assert!(header.set_fragment_number(16).is_err());
        header.set_sequence_number(0x0FFF).unwrap();
        assert!(header.set_sequence_number(0x1000).is_err());
        assert!(header.set_protocol_version(4).is_err());
    }

    #[test]
    fn test_rates_encoding() {
        let encoded = encode_rates(&[1.0, 2.0, 5.5, 11.0, 6.0]);
        assert_eq!(encoded, vec![0x82, 0x84, 0x8B, 0x96, 0x0C]);
        let tlv = Tlv::new(1, encoded).unwrap();
        assert_eq!(decode_rates(&tlv), vec![1.0, 2.0, 5.5, 11.0, 6.0]);
    }

    #[test]
    fn test_beacon_default() {
        let beacon = Dot11Beacon::new();
        assert_eq!(beacon.subtype(), SUBTYPE_BEACON);
        assert_eq!(beacon.timestamp, 0);
        assert_eq!(beacon.interval, 0);
        assert_eq!(beacon.capabilities, CapabilityInformation::default());
        assert!(beacon.elements().is_empty());
        assert_eq!(beacon.header_size(), 36);
    }

    #[test]
    fn test_beacon_element_views() {
        let mut beacon = Dot11Beacon::new();
        let elements = beacon.elements_mut();
        elements.set_ssid("wirestack").unwrap();
        elements
            .set_tim(&Tim {
                dtim_count: 42,
                dtim_period: 59,
                bitmap_control: 191,
                partial_virtual_bitmap: vec![92, 182, 212],
            })
            .unwrap();
        elements
            .set_country(&CountryParams {
                country: "US ".into(),
                first_channel: vec![1],
                number_channels: vec![13],
                max_transmit_power: vec![20],
            })
            .unwrap();
        elements.set_ds_parameter_set(0x1E).unwrap();
        elements.set_ibss_parameter_set(0x1EF3).unwrap();
        elements
            .set_quiet(Quiet {
                quiet_count: 13,
                quiet_period: 42,
                quiet_duration: 0x928F,
                quiet_offset: 0xF1AD,
            })
            .unwrap();
        elements
            .set_bss_load(BssLoad {
                station_count: 0x129F,
                channel_utilization: 42,
                available_capacity: 0xF5A2,
            })
            .unwrap();
        elements
            .set_channel_switch(ChannelSwitch {
                switch_mode: 13,
                new_channel: 42,
                switch_count: 98,
            })
            .unwrap();

        let bytes = Pdu::Dot11Beacon(beacon).serialize();
        let reparsed = Dot11Beacon::from_buffer(&bytes).unwrap();
        let elements = reparsed.elements();
        assert_eq!(elements.ssid().as_deref(), Some("wirestack"));
        let tim = elements.tim().unwrap();
        assert_eq!(tim.dtim_count, 42);
        assert_eq!(tim.partial_virtual_bitmap, vec![92, 182, 212]);
        let country = elements.country().unwrap();
        assert_eq!(country.country, "US ");
        assert_eq!(country.first_channel, vec![1]);
        assert_eq!(elements.ds_parameter_set(), Some(0x1E));
        assert_eq!(elements.ibss_parameter_set(), Some(0x1EF3));
        assert_eq!(elements.quiet().unwrap().quiet_offset, 0xF1AD);
        assert_eq!(elements.bss_load().unwrap().available_capacity, 0xF5A2);
        assert_eq!(elements.channel_switch().unwrap().switch_count, 98);
    }

    #[test]
    fn test_rsn_roundtrip() {
        let mut rsn = RsnInformation::new();
        rsn.version = 0x7283;
        rsn.capabilities = 0x18AD;
        rsn.add_pairwise_suite(CipherSuite::Wep40);
        rsn.add_akm_suite(AkmSuite::Psk);

        let mut beacon = Dot11Beacon::new();
        beacon.elements_mut().set_rsn_information(&rsn).unwrap();
        let bytes = Pdu::Dot11Beacon(beacon).serialize();

        let found = Dot11Beacon::from_buffer(&bytes)
            .unwrap()
            .elements()
            .rsn_information()
            .unwrap();
        assert_eq!(found, rsn);
    }

    #[test]
    fn test_canonical_order_for_recognized_tags() {
        let mut elements = TaggedElements::new();
        elements.set_erp_information(0).unwrap();
        elements.set_ssid("net").unwrap();
        elements.set_ds_parameter_set(6).unwrap();
        let codes: Vec<u8> = elements.iter().map(Tlv::code).collect();
        assert_eq!(codes, vec![0, 3, 42]);
    }

    #[test]
    fn test_unknown_tag_switches_to_insertion_order() {
        let mut elements = TaggedElements::new();
        elements.set_erp_information(0).unwrap();
        elements.insert(Tlv::new(221, vec![0x00, 0x50, 0xF2]).unwrap());
        elements.set_ssid("net").unwrap();
        let codes: Vec<u8> = elements.iter().map(Tlv::code).collect();
        assert_eq!(codes, vec![42, 221, 0]);
    }

    #[test]
    fn test_country_with_residue_is_rejected() {
        let mut elements = TaggedElements::new();
        elements.insert(Tlv::new(7, vec![b'U', b'S', b' ', 1, 13]).unwrap());
        assert!(elements.country().is_none());
    }

    #[test]
    fn test_probe_response_dispatch() {
        let mut probe = Dot11ProbeResponse::new();
        probe.interval = 0x6400;
        probe.elements_mut().set_ssid("net").unwrap();
        let bytes = Pdu::Dot11ProbeResponse(probe).serialize();
        assert_eq!(bytes[0], SUBTYPE_PROBE_RESPONSE << 4);

        let parsed = from_buffer(&bytes).unwrap();
        let probe = parsed.as_dot11_probe_response().unwrap();
        assert_eq!(probe.subtype(), SUBTYPE_PROBE_RESPONSE);
        assert_eq!(probe.interval, 0x6400);
        assert_eq!(probe.elements().ssid().as_deref(), Some("net"));
    }

    #[test]
    fn test_truncated_element_fails_parse() {
        // Valid 36-byte body followed by an element declaring more bytes
        // than remain
        let mut buf = Pdu::Dot11Beacon(Dot11Beacon::new()).serialize();
        buf.extend_from_slice(&[0x00, 0x07, b'a', b'b']);
        assert!(Dot11Beacon::from_buffer(&buf).is_err());
    }
}
