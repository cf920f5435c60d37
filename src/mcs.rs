//! Serial numbers derived from chip serials.
//!
//! Every serialized chip carries a factory serial that is unique per vendor.
//! Taking 35 bits of it and tagging them with a 3-bit vendor code gives a
//! 38-bit SGTIN serial that is unique across vendors, so tags can be
//! commissioned without a central serial allocator.

use log::debug;

use crate::error::McsError;
use crate::tag_data::{TagEpcSgtin, Tid};

const XTID_FLAG: u16 = 0x800;
const MDID_IMPINJ: u16 = 0x001;
const MDID_ALIEN: u16 = 0x003;
const MDID_NXP: u16 = 0x006;
const TMN_HIGGS3: u16 = 0x412;
/// Impinj models whose serial window starts at the first byte on XTID
/// chips
const IMPINJ_MONZA_TMNS: [u16; 3] = [0x100, 0x10C, 0x105];

const WINDOW_LEN: usize = 5;
const VENDOR_SHIFT: u32 = 35;

fn window_start(tid: &Tid, serial_len: usize) -> Result<usize, McsError> {
    let unsupported = || McsError::UnsupportedChip {
        mdid: tid.mdid,
        tmn: tid.tmn,
        serial_len,
    };
    match serial_len {
        8 if tid.tmn == TMN_HIGGS3 && tid.mdid == MDID_ALIEN => Ok(3),
        8 => Err(unsupported()),
        6 if IMPINJ_MONZA_TMNS.contains(&tid.tmn) => {
            Ok(if tid.mdid == XTID_FLAG | MDID_IMPINJ { 0 } else { 1 })
        }
        6 => Ok(1),
        5 => Ok(0),
        _ => Err(unsupported()),
    }
}

fn vendor_code(mdid: u16) -> Result<u64, McsError> {
    match mdid & !XTID_FLAG {
        MDID_ALIEN => Ok(6),
        MDID_IMPINJ => Ok(5),
        MDID_NXP => Ok(7),
        other => Err(McsError::UnknownVendor(other)),
    }
}

/// 38-bit serial derived from the chip serial in `tid`.
pub fn derive_serial(tid: &Tid) -> Result<u64, McsError> {
    let serial = tid
        .serial
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(McsError::NoSerial)?;
    let start = window_start(tid, serial.len())?;
    let window = &serial[start..start + WINDOW_LEN];
    let low = window[1..]
        .iter()
        .fold((window[0] & 0x07) as u64, |acc, &b| (acc << 8) | b as u64);
    let derived = (vendor_code(tid.mdid)? << VENDOR_SHIFT) | low;
    debug!(
        "MDID {:03X} TMN {:03X}: serial window at {}, derived {}",
        tid.mdid, tid.tmn, start, derived
    );
    Ok(derived)
}

/// Copy of `template` whose serial is derived from the chip serial in `tid`.
pub fn generate_epc(tid: &Tid, template: &TagEpcSgtin) -> Result<TagEpcSgtin, McsError> {
    let serial = derive_serial(tid)?;
    Ok(TagEpcSgtin {
        identity: template.identity.with_serial(serial),
        ..*template
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag_data::SgtinIdentity;
    use std::collections::HashSet;

    fn tid(mdid: u16, tmn: u16, serial: &[u8]) -> Tid {
        Tid {
            mdid,
            tmn,
            serial: Some(serial.to_vec()),
            stid_uri: None,
        }
    }

    fn template() -> TagEpcSgtin {
        TagEpcSgtin {
            filter: 1,
            attribs: 0x05,
            identity: SgtinIdentity {
                company_prefix: 614141,
                item_ref: 812345,
                company_prefix_digits: 7,
                item_ref_digits: 6,
                serial: 0,
            },
        }
    }

    #[test]
    fn test_impinj_xtid() {
        let tid = tid(0x801, 0x105, &[0x55, 0x01, 0x21, 0x28, 0x08, 0x98]);
        // vendor 5, low bits of 0x55 then 01 21 28 08
        assert_eq!(derive_serial(&tid).unwrap(), (5 << 35) | (5 << 32) | 0x0121_2808);
        assert_eq!(derive_serial(&tid).unwrap(), 193_292_478_472);
    }

    #[test]
    fn test_impinj_without_xtid_flag_skips_first_byte() {
        let tid = tid(0x001, 0x105, &[0xFF, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(derive_serial(&tid).unwrap(), (5 << 35) | (1 << 32) | 0x0203_0405);
    }

    #[test]
    fn test_six_byte_other_model_skips_first_byte() {
        let tid = tid(0x801, 0x190, &[0xFF, 0x02, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(derive_serial(&tid).unwrap(), (5 << 35) | (2 << 32) | 0x0203_0405);
    }

    #[test]
    fn test_alien_higgs3() {
        let tid = tid(0x003, 0x412, &[0x01, 0x3B, 0xF0, 0x00, 0x0A, 0x1B, 0x2C, 0x3D]);
        assert_eq!(derive_serial(&tid).unwrap(), 206_327_983_165);
    }

    #[test]
    fn test_nxp_five_byte_serial() {
        let tid = tid(0x006, 0x893, &[0x03, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(derive_serial(&tid).unwrap(), (7 << 35) | (3 << 32) | 0x1234_5678);
    }

    #[test]
    fn test_eight_byte_serial_from_other_chip() {
        let tid = tid(0x801, 0x412, &[0; 8]);
        assert!(matches!(
            derive_serial(&tid),
            Err(McsError::UnsupportedChip { serial_len: 8, .. })
        ));
    }

    #[test]
    fn test_unsupported_serial_length() {
        let tid = tid(0x801, 0x105, &[0; 7]);
        assert!(matches!(
            derive_serial(&tid),
            Err(McsError::UnsupportedChip { serial_len: 7, .. })
        ));
    }

    #[test]
    fn test_unknown_vendor() {
        let tid = tid(0x80B, 0x001, &[0; 6]);
        assert!(matches!(derive_serial(&tid), Err(McsError::UnknownVendor(0x00B))));
    }

    #[test]
    fn test_no_serial() {
        let mut t = tid(0x801, 0x105, &[]);
        assert!(matches!(derive_serial(&t), Err(McsError::NoSerial)));
        t.serial = None;
        assert!(matches!(generate_epc(&t, &template()), Err(McsError::NoSerial)));
    }

    #[test]
    fn test_generate_epc_keeps_template() {
        let tid = tid(0x801, 0x105, &[0x55, 0x01, 0x21, 0x28, 0x08, 0x98]);
        let epc = generate_epc(&tid, &template()).unwrap();
        assert_eq!(epc.filter, 1);
        assert_eq!(epc.attribs, 0x05);
        assert_eq!(epc.identity, template().identity.with_serial(193_292_478_472));
        assert_eq!(generate_epc(&tid, &template()).unwrap(), epc);
    }

    #[test]
    fn test_serials_fit_sgtin96() {
        let tid = tid(0x006, 0x893, &[0xFF; 5]);
        let serial = derive_serial(&tid).unwrap();
        assert!(serial < 1 << 38);
    }

    #[test]
    fn test_distinct_chips_get_distinct_serials() {
        let mut seen = HashSet::new();
        for n in 0u32..500 {
            let b = n.to_be_bytes();
            let chips = [
                tid(0x801, 0x105, &[0x00, b[0], b[1], b[2], b[3], 0x00]),
                tid(0x003, 0x412, &[0x01, 0x3B, 0xF0, 0x00, b[0], b[1], b[2], b[3]]),
                tid(0x006, 0x893, &[0x03, b[0], b[1], b[2], b[3]]),
            ];
            for chip in &chips {
                assert!(seen.insert(derive_serial(chip).unwrap()));
            }
        }
    }
}
