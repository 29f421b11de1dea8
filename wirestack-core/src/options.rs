//! TLV option lists
//!
//! Several protocols carry a variable sequence of `(code, length, value)`
//! triples after their fixed header: DHCP options, 802.11 tagged elements,
//! and similar families. This module provides the shared container and
//! codec. Families differ only in their sentinels, captured by
//! [`ListSyntax`]: DHCP terminates at an END code and skips PAD codes,
//! 802.11 tagged elements run to the end of the buffer.

use bytes::BufMut;

use crate::error::{Error, Result};

/// Largest value an option can carry; the length field is a single byte.
pub const MAX_VALUE_LEN: usize = 255;

/// Sentinel configuration for parsing and serializing a [`TlvList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSyntax {
    /// Code that terminates the list, written exactly once on serialize
    pub end: Option<u8>,
    /// Single-byte filler code, skipped on parse and never re-emitted
    pub pad: Option<u8>,
}

impl ListSyntax {
    /// No sentinels: the list terminates at the buffer boundary.
    pub const PLAIN: ListSyntax = ListSyntax {
        end: None,
        pad: None,
    };
}

/// A single option: one code byte, one length byte, `length` value bytes.
///
/// The value is owned by the option; copying an option duplicates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    code: u8,
    value: Vec<u8>,
}

impl Tlv {
    /// Create an option, rejecting values longer than a length byte can
    /// describe.
    pub fn new(code: u8, value: impl Into<Vec<u8>>) -> Result<Self> {
        let value = value.into();
        if value.len() > MAX_VALUE_LEN {
            return Err(Error::OptionTooLarge {
                code,
                limit: MAX_VALUE_LEN,
            });
        }
        Ok(Tlv { code, value })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Value length in bytes. Zero-length options are legal.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Encoded size: code byte, length byte, value.
    pub fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }

    /// Read the value as a single byte. `None` unless the length is
    /// exactly one.
    pub fn as_u8(&self) -> Option<u8> {
        match *self.value {
            [b] => Some(b),
            _ => None,
        }
    }

    /// Read the value as a big-endian u16. `None` on width mismatch.
    pub fn as_u16_be(&self) -> Option<u16> {
        Some(u16::from_be_bytes(self.value.as_slice().try_into().ok()?))
    }

    /// Read the value as a big-endian u32. `None` on width mismatch.
    pub fn as_u32_be(&self) -> Option<u32> {
        Some(u32::from_be_bytes(self.value.as_slice().try_into().ok()?))
    }

    /// Read the value as a list of big-endian u32 words.
    ///
    /// The length must be an exact multiple of four; residue is rejected.
    pub fn u32_list_be(&self) -> Result<Vec<u32>> {
        if self.value.len() % 4 != 0 {
            return Err(Error::MalformedOption {
                code: self.code,
                reason: "length is not a multiple of 4",
            });
        }
        Ok(self
            .value
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read the value as text. The value carries no terminator; invalid
    /// UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// An ordered list of options.
///
/// Insertion order is preserved and lookups return the first match, which
/// matters for protocols that permit duplicate codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvList {
    entries: Vec<Tlv>,
}

impl TlvList {
    pub fn new() -> Self {
        TlvList::default()
    }

    /// Parse a list from `buf` under the given syntax.
    ///
    /// Returns the list and the number of bytes consumed (including the
    /// end sentinel when one was found). Pad codes are skipped. Unknown
    /// codes are kept verbatim so an untouched list re-serializes
    /// faithfully.
    pub fn parse(buf: &[u8], syntax: ListSyntax) -> Result<(Self, usize)> {
        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < buf.len() {
            let code = buf[offset];
            if syntax.pad == Some(code) {
                offset += 1;
                continue;
            }
            if syntax.end == Some(code) {
                offset += 1;
                return Ok((TlvList { entries }, offset));
            }
            if offset + 1 >= buf.len() {
                return Err(Error::MalformedOption {
                    code,
                    reason: "missing length byte",
                });
            }
            let declared = buf[offset + 1] as usize;
            let remaining = buf.len() - offset - 2;
            if declared > remaining {
                return Err(Error::TruncatedOption {
                    code,
                    declared,
                    remaining,
                });
            }
            entries.push(Tlv {
                code,
                value: buf[offset + 2..offset + 2 + declared].to_vec(),
            });
            offset += 2 + declared;
        }
        Ok((TlvList { entries }, offset))
    }

    /// First option with the given code, or `None`.
    pub fn find(&self, code: u8) -> Option<&Tlv> {
        self.entries.iter().find(|t| t.code == code)
    }

    /// Append an option. Duplicates are not collapsed.
    pub fn push(&mut self, tlv: Tlv) {
        self.entries.push(tlv);
    }

    /// Insert an option at a position, shifting later entries.
    pub fn insert(&mut self, index: usize, tlv: Tlv) {
        self.entries.insert(index, tlv);
    }

    /// Remove and return the first option with the given code.
    pub fn remove_first(&mut self, code: u8) -> Option<Tlv> {
        let index = self.entries.iter().position(|t| t.code == code)?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tlv> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoded size of the entries alone, without any end sentinel.
    pub fn encoded_len(&self) -> usize {
        self.entries.iter().map(Tlv::encoded_len).sum()
    }

    /// Write the list in insertion order, then the end sentinel if the
    /// syntax has one.
    pub fn write(&self, buf: &mut impl BufMut, syntax: ListSyntax) {
        for tlv in &self.entries {
            buf.put_u8(tlv.code);
            buf.put_u8(tlv.value.len() as u8);
            buf.put_slice(&tlv.value);
        }
        if let Some(end) = syntax.end {
            buf.put_u8(end);
        }
    }
}

impl<'a> IntoIterator for &'a TlvList {
    type Item = &'a Tlv;
    type IntoIter = std::slice::Iter<'a, Tlv>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DHCP_LIKE: ListSyntax = ListSyntax {
        end: Some(255),
        pad: Some(0),
    };

    #[test]
    fn test_tlv_rejects_oversized_value() {
        assert!(Tlv::new(12, vec![0u8; 255]).is_ok());
        let err = Tlv::new(12, vec![0u8; 256]).unwrap_err();
        assert_eq!(err, Error::OptionTooLarge { code: 12, limit: 255 });
    }

    #[test]
    fn test_parse_plain_until_buffer_end() {
        let buf = [1, 2, 0xAA, 0xBB, 7, 0, 3, 1, 0x2A];
        let (list, consumed) = TlvList::parse(&buf, ListSyntax::PLAIN).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(list.len(), 3);
        assert_eq!(list.find(1).unwrap().value(), &[0xAA, 0xBB]);
        assert!(list.find(7).unwrap().is_empty());
        assert_eq!(list.find(3).unwrap().as_u8(), Some(0x2A));
    }

    #[test]
    fn test_parse_stops_at_end_sentinel() {
        let buf = [53, 1, 1, 255, 9, 9, 9];
        let (list, consumed) = TlvList::parse(&buf, DHCP_LIKE).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(list.len(), 1);
        assert!(list.find(9).is_none());
    }

    #[test]
    fn test_parse_skips_pads() {
        let buf = [0, 0, 53, 1, 2, 0, 255];
        let (list, consumed) = TlvList::parse(&buf, DHCP_LIKE).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(list.len(), 1);
        assert_eq!(list.find(53).unwrap().as_u8(), Some(2));
    }

    #[test]
    fn test_parse_truncated_option() {
        let buf = [61, 7, 1, 2];
        let err = TlvList::parse(&buf, DHCP_LIKE).unwrap_err();
        assert_eq!(
            err,
            Error::TruncatedOption {
                code: 61,
                declared: 7,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_parse_missing_length_byte() {
        let buf = [61];
        let err = TlvList::parse(&buf, ListSyntax::PLAIN).unwrap_err();
        assert!(matches!(err, Error::MalformedOption { code: 61, .. }));
    }

    #[test]
    fn test_first_match_lookup() {
        let mut list = TlvList::new();
        list.push(Tlv::new(3, vec![1]).unwrap());
        list.push(Tlv::new(3, vec![2]).unwrap());
        assert_eq!(list.find(3).unwrap().as_u8(), Some(1));
        let removed = list.remove_first(3).unwrap();
        assert_eq!(removed.as_u8(), Some(1));
        assert_eq!(list.find(3).unwrap().as_u8(), Some(2));
    }

    #[test]
    fn test_write_appends_end_once() {
        let mut list = TlvList::new();
        list.push(Tlv::new(53, vec![1]).unwrap());
        let mut out = Vec::new();
        list.write(&mut out, DHCP_LIKE);
        assert_eq!(out, vec![53, 1, 1, 255]);
    }

    #[test]
    fn test_order_preserved_over_roundtrip() {
        let mut list = TlvList::new();
        list.push(Tlv::new(54, vec![192, 0, 2, 1]).unwrap());
        list.push(Tlv::new(51, vec![0, 1, 0x51, 0x80]).unwrap());
        list.push(Tlv::new(12, b"host".to_vec()).unwrap());
        let mut out = Vec::new();
        list.write(&mut out, ListSyntax::PLAIN);
        let (reparsed, _) = TlvList::parse(&out, ListSyntax::PLAIN).unwrap();
        let codes: Vec<u8> = reparsed.iter().map(Tlv::code).collect();
        assert_eq!(codes, vec![54, 51, 12]);
    }

    #[test]
    fn test_typed_readers() {
        let tlv = Tlv::new(51, vec![0, 1, 0x51, 0x80]).unwrap();
        assert_eq!(tlv.as_u32_be(), Some(86400));
        assert_eq!(tlv.as_u16_be(), None);
        assert_eq!(tlv.as_u8(), None);

        let list = Tlv::new(3, vec![192, 0, 2, 1, 192, 0, 2, 2]).unwrap();
        assert_eq!(list.u32_list_be().unwrap(), vec![0xC0000201, 0xC0000202]);

        let residue = Tlv::new(3, vec![192, 0, 2]).unwrap();
        assert!(residue.u32_list_be().is_err());

        let text = Tlv::new(12, b"wirestack".to_vec()).unwrap();
        assert_eq!(text.text(), "wirestack");
    }
}
