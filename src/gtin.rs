//! GTIN-14 parsing into an SGTIN identity.

use crate::error::CodecError;
use crate::tag_data::SgtinIdentity;

pub const GTIN14_LEN: usize = 14;
const COMPANY_PREFIX_DIGITS: std::ops::RangeInclusive<u8> = 6..=12;

/// Check digit over the first 13 digits of a GTIN-14.
pub fn check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .take(GTIN14_LEN - 1)
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Split a GTIN-14 into company prefix and item reference.
///
/// The first `company_prefix_digits` digits form the company prefix and the
/// rest, up to the check digit, the item reference. The serial is 0.
pub fn parse_gtin14(gtin: &str, company_prefix_digits: u8) -> Result<SgtinIdentity, CodecError> {
    if !COMPANY_PREFIX_DIGITS.contains(&company_prefix_digits) {
        return Err(CodecError::Invalid(format!(
            "company prefix of {} digits",
            company_prefix_digits
        )));
    }
    let digits: Vec<u8> = gtin
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => Ok(b - b'0'),
            _ => Err(CodecError::Invalid(format!("non-digit in GTIN {:?}", gtin))),
        })
        .collect::<Result<_, _>>()?;
    if digits.len() != GTIN14_LEN {
        return Err(CodecError::Invalid(format!("GTIN of {} digits", digits.len())));
    }
    let expected = check_digit(&digits);
    if digits[GTIN14_LEN - 1] != expected {
        return Err(CodecError::Invalid(format!(
            "GTIN check digit {} should be {}",
            digits[GTIN14_LEN - 1],
            expected
        )));
    }

    let split = company_prefix_digits as usize;
    let number = |range: &[u8]| range.iter().fold(0u64, |acc, &d| acc * 10 + d as u64);
    Ok(SgtinIdentity {
        company_prefix: number(&digits[..split]),
        item_ref: number(&digits[split..GTIN14_LEN - 1]),
        company_prefix_digits,
        item_ref_digits: (GTIN14_LEN - 1 - split) as u8,
        serial: 0,
    })
}
