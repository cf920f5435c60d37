//! Types shared by the protocol engine and the tag-data codec

use crate::constants::{CurrentSystem, ReaderState};
use std::fmt;

/// Gen2 memory banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryBank {
    Reserved = 0x00,
    Epc = 0x01,
    Tid = 0x02,
    User = 0x03,
}

/// Handle to a singulated tag.
///
/// Produced by a [`ReaderLowLevel`](crate::ReaderLowLevel) backend and only
/// ever handed back to the same backend. The codec never looks inside.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TagToken(Vec<u8>);

impl TagToken {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagToken({})", bytes_to_hex(&self.0))
    }
}

/// Attenuation limits and setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attenuation {
    pub max: u16,
    pub current: u16,
}

/// Frequency hopping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    pub mode: u8,
    pub max_count: u8,
    /// Channel frequencies in kHz (24-bit on the wire)
    pub frequencies: Vec<u32>,
}

/// Receiver sensitivity range and setting, in dBm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sensitivity {
    pub max: i16,
    pub min: i16,
    pub current: i16,
}

/// Listen-before-talk parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbtParams {
    pub listen_time: u16,
    pub idle_time: u16,
    pub max_alloc_time: u16,
    pub rssi_threshold: i16,
}

impl LbtParams {
    pub(crate) fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..2].copy_from_slice(&self.listen_time.to_be_bytes());
        out[2..4].copy_from_slice(&self.idle_time.to_be_bytes());
        out[4..6].copy_from_slice(&self.max_alloc_time.to_be_bytes());
        out[6..8].copy_from_slice(&self.rssi_threshold.to_be_bytes());
        out
    }
}

/// GPIO capability masks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioCaps {
    pub mask: u32,
    pub output: u32,
    pub input: u32,
}

/// One step of the antenna multiplexing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaSlot {
    pub index: u8,
    /// Dwell time in milliseconds
    pub time: u32,
}

/// Identification registers read at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderInfo {
    pub reader_id: u32,
    pub reader_type: u32,
    pub hardware_revision: u32,
    pub software_revision: u32,
    pub bootloader_revision: u32,
    pub current_system: CurrentSystem,
    pub current_state: ReaderState,
    pub status_register: u64,
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Parse a hex string, ignoring `-` separators. Returns `None` on odd length
/// or non-hex characters.
#[cfg(test)]
pub(crate) fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|&b| b != b'-').collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(text, 16).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!(bytes_to_hex(&[0xE2, 0x00, 0x34, 0x12]), "E2003412");
        assert_eq!(bytes_to_hex(&[]), "");
    }

    #[test]
    fn test_hex_to_bytes_with_separators() {
        assert_eq!(hex_to_bytes("E2-80-11-05"), Some(vec![0xE2, 0x80, 0x11, 0x05]));
        assert_eq!(hex_to_bytes("abcd"), Some(vec![0xAB, 0xCD]));
    }

    #[test]
    fn test_hex_to_bytes_rejects_garbage() {
        assert_eq!(hex_to_bytes("ABC"), None);
        assert_eq!(hex_to_bytes("ZZ"), None);
    }

    #[test]
    fn test_lbt_params_to_bytes() {
        let params = LbtParams {
            listen_time: 0x0102,
            idle_time: 0x0304,
            max_alloc_time: 0x0506,
            rssi_threshold: -70,
        };
        assert_eq!(params.to_bytes(), [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF, 0xBA]);
    }

    #[test]
    fn test_tag_token_debug_is_hex() {
        let token = TagToken::new(vec![0x30, 0x08]);
        assert_eq!(format!("{:?}", token), "TagToken(3008)");
        assert_eq!(token.as_bytes(), &[0x30, 0x08]);
    }
}
