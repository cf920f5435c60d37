//! SGTIN-96 binary layout.
//!
//! ```text
//! bit  0       8      11         14            14+M         58         96
//!      | header | filter | partition | company prefix | item ref | serial |
//!      |  0x30  |   3    |     3     |       M        |    N     |   38   |
//! ```

use crate::error::CodecError;
use crate::tag_data::{SgtinIdentity, TagEpcSgtin};

pub const SGTIN96_HEADER: u8 = 0x30;
pub const SGTIN96_LEN: usize = 12;

const COMPANY_PREFIX_START: u32 = 14;
const SERIAL_START: u32 = 58;
const SERIAL_BITS: u32 = 38;

/// Bit widths and digit counts of one partition value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub value: u8,
    pub company_prefix_bits: u32,
    pub company_prefix_digits: u8,
    pub item_ref_bits: u32,
    pub item_ref_digits: u8,
}

/// Partitions this codec handles
pub const PARTITIONS: [Partition; 3] = [
    Partition {
        value: 0,
        company_prefix_bits: 40,
        company_prefix_digits: 12,
        item_ref_bits: 4,
        item_ref_digits: 1,
    },
    Partition {
        value: 2,
        company_prefix_bits: 34,
        company_prefix_digits: 10,
        item_ref_bits: 10,
        item_ref_digits: 3,
    },
    Partition {
        value: 5,
        company_prefix_bits: 24,
        company_prefix_digits: 7,
        item_ref_bits: 20,
        item_ref_digits: 6,
    },
];

impl Partition {
    pub fn from_value(value: u8) -> Option<&'static Partition> {
        PARTITIONS.iter().find(|p| p.value == value)
    }

    pub fn from_digits(
        company_prefix_digits: u8,
        item_ref_digits: u8,
    ) -> Option<&'static Partition> {
        PARTITIONS.iter().find(|p| {
            p.company_prefix_digits == company_prefix_digits && p.item_ref_digits == item_ref_digits
        })
    }

    fn item_ref_start(&self) -> u32 {
        COMPANY_PREFIX_START + self.company_prefix_bits
    }
}

/// Read `width` bits starting at bit `start`, counted from the MSB of byte 0.
fn get_bits(bytes: &[u8], start: u32, width: u32) -> u64 {
    (start..start + width).fold(0u64, |acc, bit| {
        let byte = bytes[(bit / 8) as usize];
        let set = (byte >> (7 - bit % 8)) & 1;
        (acc << 1) | set as u64
    })
}

fn put_bits(bytes: &mut [u8], start: u32, width: u32, value: u64) {
    for i in 0..width {
        let bit = start + i;
        if (value >> (width - 1 - i)) & 1 == 1 {
            bytes[(bit / 8) as usize] |= 0x80 >> (bit % 8);
        }
    }
}

fn check_digits(what: &str, value: u64, digits: u8) -> Result<(), CodecError> {
    let limit = 10u64.pow(digits as u32);
    if value >= limit {
        return Err(CodecError::Invalid(format!(
            "{} {} has more than {} digits",
            what, value, digits
        )));
    }
    Ok(())
}

/// Decode a 12-byte SGTIN-96 EPC. The attribute byte is left at 0.
pub fn decode(epc: &[u8]) -> Result<TagEpcSgtin, CodecError> {
    if epc.len() < SGTIN96_LEN {
        return Err(CodecError::Invalid(format!("EPC of {} bytes", epc.len())));
    }
    if epc[0] != SGTIN96_HEADER {
        return Err(CodecError::Invalid(format!("header 0x{:02X} is not SGTIN-96", epc[0])));
    }

    let filter = (epc[1] >> 5) & 0x07;
    let partition_value = (epc[1] >> 2) & 0x07;
    let partition = Partition::from_value(partition_value)
        .ok_or_else(|| CodecError::Invalid(format!("unsupported partition {}", partition_value)))?;

    let company_prefix = get_bits(epc, COMPANY_PREFIX_START, partition.company_prefix_bits);
    check_digits("company prefix", company_prefix, partition.company_prefix_digits)?;
    let item_ref = get_bits(epc, partition.item_ref_start(), partition.item_ref_bits);
    check_digits("item reference", item_ref, partition.item_ref_digits)?;
    let serial = get_bits(epc, SERIAL_START, SERIAL_BITS);

    Ok(TagEpcSgtin {
        filter,
        attribs: 0,
        identity: SgtinIdentity {
            company_prefix,
            item_ref,
            company_prefix_digits: partition.company_prefix_digits,
            item_ref_digits: partition.item_ref_digits,
            serial,
        },
    })
}

pub fn encode(epc: &TagEpcSgtin) -> Result<[u8; SGTIN96_LEN], CodecError> {
    let id = &epc.identity;
    let partition = Partition::from_digits(id.company_prefix_digits, id.item_ref_digits)
        .ok_or_else(|| {
            CodecError::Invalid(format!(
                "no partition for {} + {} digits",
                id.company_prefix_digits, id.item_ref_digits
            ))
        })?;
    if epc.filter > 0x07 {
        return Err(CodecError::Invalid(format!("filter {} exceeds 3 bits", epc.filter)));
    }
    check_digits("company prefix", id.company_prefix, partition.company_prefix_digits)?;
    check_digits("item reference", id.item_ref, partition.item_ref_digits)?;
    if id.serial >> SERIAL_BITS != 0 {
        return Err(CodecError::Invalid(format!("serial {} exceeds 38 bits", id.serial)));
    }

    let mut out = [0u8; SGTIN96_LEN];
    out[0] = SGTIN96_HEADER;
    out[1] = (epc.filter << 5) | (partition.value << 2);
    put_bits(&mut out, COMPANY_PREFIX_START, partition.company_prefix_bits, id.company_prefix);
    put_bits(&mut out, partition.item_ref_start(), partition.item_ref_bits, id.item_ref);
    put_bits(&mut out, SERIAL_START, SERIAL_BITS, id.serial);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hex_to_bytes;
    use proptest::prelude::*;

    #[test]
    fn test_decode_partition_5() {
        // urn:epc:tag:sgtin-96:3.0614141.812345.6789
        let epc = hex_to_bytes("3074257BF7194E4000001A85").unwrap();
        let tag = decode(&epc).unwrap();
        assert_eq!(tag.filter, 3);
        assert_eq!(tag.identity.company_prefix, 614141);
        assert_eq!(tag.identity.item_ref, 812345);
        assert_eq!(tag.identity.serial, 6789);
        assert_eq!(tag.identity.uri(), "urn:epc:id:sgtin:0614141.812345.6789");
    }

    #[test]
    fn test_encode_partition_5() {
        let tag = TagEpcSgtin {
            filter: 3,
            attribs: 0,
            identity: SgtinIdentity {
                company_prefix: 614141,
                item_ref: 812345,
                company_prefix_digits: 7,
                item_ref_digits: 6,
                serial: 6789,
            },
        };
        assert_eq!(
            encode(&tag).unwrap().to_vec(),
            hex_to_bytes("3074257BF7194E4000001A85").unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_other_header() {
        let epc = hex_to_bytes("3574257BF7194E4000001A85").unwrap();
        assert!(matches!(decode(&epc), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_unsupported_partition() {
        // partition 1
        let epc = hex_to_bytes("3064257BF7194E4000001A85").unwrap();
        assert!(matches!(decode(&epc), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_out_of_range_item_ref() {
        // partition 0, item reference nibble 0xF
        let mut epc = [0u8; 12];
        epc[0] = SGTIN96_HEADER;
        put_bits(&mut epc, 54, 4, 0xF);
        assert!(matches!(decode(&epc), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_out_of_range_company_prefix() {
        // partition 5, company prefix 0xFFFFFF > 9_999_999
        let mut epc = [0u8; 12];
        epc[0] = SGTIN96_HEADER;
        epc[1] = 5 << 2;
        put_bits(&mut epc, 14, 24, 0xFF_FFFF);
        assert!(matches!(decode(&epc), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_encode_rejects_unknown_digit_split() {
        let tag = TagEpcSgtin {
            identity: SgtinIdentity {
                company_prefix_digits: 9,
                item_ref_digits: 4,
                ..SgtinIdentity::default()
            },
            ..TagEpcSgtin::default()
        };
        assert!(matches!(encode(&tag), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_encode_rejects_wide_serial() {
        let tag = TagEpcSgtin {
            identity: SgtinIdentity {
                company_prefix_digits: 7,
                item_ref_digits: 6,
                serial: 1 << 38,
                ..SgtinIdentity::default()
            },
            ..TagEpcSgtin::default()
        };
        assert!(matches!(encode(&tag), Err(CodecError::Invalid(_))));
    }

    #[test]
    fn test_bit_helpers_span_bytes() {
        let mut bytes = [0u8; 3];
        put_bits(&mut bytes, 6, 6, 0b101101);
        assert_eq!(bytes, [0b0000_0010, 0b1101_0000, 0]);
        assert_eq!(get_bits(&bytes, 6, 6), 0b101101);
    }

    fn sgtin_strategy() -> impl Strategy<Value = TagEpcSgtin> {
        (0usize..PARTITIONS.len(), 0u8..8, any::<u64>(), any::<u64>(), 0u64..(1 << 38)).prop_map(
            |(index, filter, c, d, serial)| {
                let p = &PARTITIONS[index];
                TagEpcSgtin {
                    filter,
                    attribs: 0,
                    identity: SgtinIdentity {
                        company_prefix: c % 10u64.pow(p.company_prefix_digits as u32),
                        item_ref: d % 10u64.pow(p.item_ref_digits as u32),
                        company_prefix_digits: p.company_prefix_digits,
                        item_ref_digits: p.item_ref_digits,
                        serial,
                    },
                }
            },
        )
    }

    proptest! {
        #[test]
        fn prop_partition_round_trip(tag in sgtin_strategy()) {
            let bytes = encode(&tag).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), tag);
        }
    }
}
