//! Decoded tag identifiers and their URI forms.

use std::fmt::Write as _;

use crate::types::bytes_to_hex;

/// Contents of the TID memory bank
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tid {
    /// Mask designer id, 12 bits as stored (including the XTID flag bit)
    pub mdid: u16,
    /// Tag model number, 12 bits
    pub tmn: u16,
    /// Factory unique serial, when the chip exposes one
    pub serial: Option<Vec<u8>>,
    pub stid_uri: Option<String>,
}

impl Tid {
    pub fn is_serialized(&self) -> bool {
        self.serial.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// EPC bank protocol control word and its CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpcPc {
    pub crc: u16,
    /// EPC length in bytes, from the PC word count
    pub epc_length: usize,
    /// User memory present
    pub umi: bool,
    /// Extended PC present
    pub xi: bool,
    /// Set: byte 3 holds an ISO AFI. Clear: byte 3 holds attribute bits.
    pub toggle: bool,
    pub attribs: u8,
    /// Extended PC word; not read from tags, 0 unless filled in by the caller
    pub xpc: u32,
}

impl EpcPc {
    /// Qualifier part of a raw EPC URI, e.g. `[att=x01][umi=1]`.
    pub fn uri_qualifiers(&self) -> String {
        let mut out = String::new();
        if !self.toggle && self.attribs > 0 {
            let _ = write!(out, "[att=x{:02X}]", self.attribs);
        }
        if self.umi {
            out.push_str("[umi=1]");
        }
        if self.xi && self.xpc > 0 {
            let _ = write!(out, "[xpc=x{:04X}]", self.xpc);
        }
        out
    }
}

/// SGTIN pure identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SgtinIdentity {
    pub company_prefix: u64,
    pub item_ref: u64,
    pub company_prefix_digits: u8,
    pub item_ref_digits: u8,
    pub serial: u64,
}

impl SgtinIdentity {
    /// `urn:epc:id:sgtin:` URI with the prefix and item reference zero padded
    /// to their digit counts.
    pub fn uri(&self) -> String {
        format!(
            "urn:epc:id:sgtin:{:0cw$}.{:0iw$}.{}",
            self.company_prefix,
            self.item_ref,
            self.serial,
            cw = self.company_prefix_digits as usize,
            iw = self.item_ref_digits as usize,
        )
    }

    pub fn with_serial(&self, serial: u64) -> Self {
        Self { serial, ..*self }
    }
}

/// SGTIN-96 as stored in the EPC bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagEpcSgtin {
    pub filter: u8,
    pub attribs: u8,
    pub identity: SgtinIdentity,
}

impl TagEpcSgtin {
    /// `urn:epc:tag:sgtin-96:` URI, which keeps the filter value.
    pub fn tag_uri(&self) -> String {
        let id = &self.identity;
        format!(
            "urn:epc:tag:sgtin-96:{}.{:0cw$}.{:0iw$}.{}",
            self.filter,
            id.company_prefix,
            id.item_ref,
            id.serial,
            cw = id.company_prefix_digits as usize,
            iw = id.item_ref_digits as usize,
        )
    }
}

/// EPC bank contents that are not decoded further
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagRaw {
    pub pc: EpcPc,
    pub data: Vec<u8>,
}

impl TagRaw {
    /// `urn:epc:raw:` URI
    pub fn uri(&self) -> String {
        let mut out = String::from("urn:epc:raw:");
        out.push_str(&self.pc.uri_qualifiers());
        let _ = write!(out, "{}.", self.pc.epc_length * 8);
        if self.pc.toggle && self.pc.attribs > 0 {
            let _ = write!(out, "x{:02X}.", self.pc.attribs);
        }
        out.push('x');
        out.push_str(&bytes_to_hex(&self.data));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(c: u64, l: u8, d: u64, k: u8, s: u64) -> SgtinIdentity {
        SgtinIdentity {
            company_prefix: c,
            item_ref: d,
            company_prefix_digits: l,
            item_ref_digits: k,
            serial: s,
        }
    }

    #[test]
    fn test_identity_uri_pads_digits() {
        assert_eq!(
            identity(614141, 7, 12345, 6, 6789).uri(),
            "urn:epc:id:sgtin:0614141.012345.6789"
        );
        assert_eq!(
            identity(4012345, 12, 5, 1, 0).uri(),
            "urn:epc:id:sgtin:000004012345.5.0"
        );
    }

    #[test]
    fn test_with_serial_keeps_other_fields() {
        let id = identity(614141, 7, 12345, 6, 1).with_serial(42);
        assert_eq!(id, identity(614141, 7, 12345, 6, 42));
    }

    #[test]
    fn test_tag_uri_includes_filter() {
        let tag = TagEpcSgtin {
            filter: 3,
            attribs: 0,
            identity: identity(614141, 7, 812345, 6, 6789),
        };
        assert_eq!(tag.tag_uri(), "urn:epc:tag:sgtin-96:3.0614141.812345.6789");
    }

    #[test]
    fn test_tid_is_serialized() {
        let mut tid = Tid::default();
        assert!(!tid.is_serialized());
        tid.serial = Some(vec![]);
        assert!(!tid.is_serialized());
        tid.serial = Some(vec![1]);
        assert!(tid.is_serialized());
    }

    #[test]
    fn test_raw_uri_plain() {
        let raw = TagRaw {
            pc: EpcPc {
                epc_length: 4,
                ..EpcPc::default()
            },
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        assert_eq!(raw.uri(), "urn:epc:raw:32.xDEADBEEF");
    }

    #[test]
    fn test_raw_uri_qualifiers() {
        let raw = TagRaw {
            pc: EpcPc {
                epc_length: 2,
                umi: true,
                attribs: 0x01,
                xi: true,
                xpc: 0x1234,
                ..EpcPc::default()
            },
            data: vec![0x12, 0x34],
        };
        assert_eq!(raw.uri(), "urn:epc:raw:[att=x01][umi=1][xpc=x1234]16.x1234");
    }

    #[test]
    fn test_raw_uri_toggle_puts_afi_in_body() {
        let raw = TagRaw {
            pc: EpcPc {
                epc_length: 2,
                toggle: true,
                attribs: 0xA2,
                ..EpcPc::default()
            },
            data: vec![0x00, 0x01],
        };
        assert_eq!(raw.uri(), "urn:epc:raw:16.xA2.x0001");
    }

    #[test]
    fn test_xi_without_xpc_has_no_qualifier() {
        let pc = EpcPc {
            xi: true,
            ..EpcPc::default()
        };
        assert_eq!(pc.uri_qualifiers(), "");
    }
}
