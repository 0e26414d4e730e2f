//! Amount encoding.
//!
//! Two shapes share the 8-byte amount slot:
//!
//! - **XRP**: bit 63 clear, bit 62 set for non-negative, low 62 bits are
//!   drops.
//! - **Issued currency**: bit 63 set, bit 62 the sign, 8 bits of
//!   `exponent + 97`, 54 bits of mantissa normalized into
//!   `[10^15, 10^16)`. Followed by a 20-byte currency code and a 20-byte
//!   issuer account ID. Zero is the bare `0x8000...` pattern.

use serde_json::{json, Map, Value};

use super::CodecError;
use crate::crypto::{decode_classic_address, encode_classic_address};

const NOT_XRP_BIT: u64 = 0x8000_0000_0000_0000;
const POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;
const MAX_DROPS: u64 = 100_000_000_000_000_000;
const MIN_MANTISSA: u64 = 1_000_000_000_000_000;
const MAX_MANTISSA: u64 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const EXPONENT_BIAS: i32 = 97;
const MAX_PRECISION: usize = 16;

/// Serialize a JSON amount (drops string or `{currency, value, issuer}`).
pub fn encode_amount(value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    match value {
        Value::String(drops) => {
            out.extend_from_slice(&encode_drops(drops)?.to_be_bytes());
            Ok(())
        }
        Value::Number(n) => {
            out.extend_from_slice(&encode_drops(&n.to_string())?.to_be_bytes());
            Ok(())
        }
        Value::Object(obj) => encode_issued(obj, out),
        other => Err(CodecError::InvalidAmount(format!(
            "expected string or object, got {}",
            other
        ))),
    }
}

fn encode_drops(drops: &str) -> Result<u64, CodecError> {
    let (negative, digits) = match drops.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, drops),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidAmount(format!(
            "XRP amount must be an integer number of drops: {}",
            drops
        )));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| CodecError::InvalidAmount(format!("XRP amount out of range: {}", drops)))?;
    if value > MAX_DROPS {
        return Err(CodecError::InvalidAmount(format!(
            "XRP amount out of range: {}",
            drops
        )));
    }
    Ok(if negative { value } else { value | POSITIVE_BIT })
}

fn encode_issued(obj: &Map<String, Value>, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let value = match obj.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(CodecError::InvalidAmount("issued amount missing value".into())),
    };
    let currency = obj
        .get("currency")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidAmount("issued amount missing currency".into()))?;
    let issuer = obj
        .get("issuer")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidAmount("issued amount missing issuer".into()))?;

    out.extend_from_slice(&encode_issued_value(&value)?.to_be_bytes());
    out.extend_from_slice(&encode_currency(currency)?);
    let issuer = decode_classic_address(issuer)
        .map_err(|e| CodecError::InvalidAccount(format!("{}: {}", issuer, e)))?;
    out.extend_from_slice(&issuer);
    Ok(())
}

/// The 8-byte value part of an issued amount.
pub fn encode_issued_value(value: &str) -> Result<u64, CodecError> {
    let (negative, mut mantissa, mut exponent) = parse_decimal(value)?;
    if mantissa == 0 {
        return Ok(NOT_XRP_BIT);
    }
    while mantissa < MIN_MANTISSA {
        mantissa *= 10;
        exponent -= 1;
    }
    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(CodecError::InvalidAmount(format!(
            "issued amount exponent out of range: {}",
            value
        )));
    }

    let mut bits = NOT_XRP_BIT | mantissa;
    if !negative {
        bits |= POSITIVE_BIT;
    }
    bits |= ((exponent + EXPONENT_BIAS) as u64) << 54;
    Ok(bits)
}

/// Parse a decimal string into `(negative, mantissa, exponent)` with at
/// most sixteen significant digits.
fn parse_decimal(value: &str) -> Result<(bool, u64, i32), CodecError> {
    let invalid = || CodecError::InvalidAmount(format!("invalid issued amount value: {}", value));

    let (negative, rest) = match value.trim().as_bytes().first() {
        Some(b'-') => (true, &value.trim()[1..]),
        Some(b'+') => (false, &value.trim()[1..]),
        _ => (false, value.trim()),
    };
    let (number, exp_part) = match rest.find(['e', 'E']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };
    let mut exponent: i32 = match exp_part {
        Some(e) => e.parse().map_err(|_| invalid())?,
        None => 0,
    };
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    exponent -= frac_part.len() as i32;
    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok((negative, 0, 0));
    }
    digits = significant.to_string();
    while digits.ends_with('0') {
        digits.pop();
        exponent += 1;
    }
    if digits.len() > MAX_PRECISION {
        return Err(CodecError::InvalidAmount(format!(
            "issued amount has more than {} significant digits: {}",
            MAX_PRECISION, value
        )));
    }
    let mantissa: u64 = digits.parse().map_err(|_| invalid())?;
    Ok((negative, mantissa, exponent))
}

/// 20-byte currency code: `XRP` is all zeros, three-letter codes sit at
/// bytes 12..15, anything else must be 40 hex characters.
pub fn encode_currency(code: &str) -> Result<[u8; 20], CodecError> {
    let mut out = [0u8; 20];
    if code == "XRP" {
        return Ok(out);
    }
    if code.len() == 3 && code.is_ascii() {
        out[12..15].copy_from_slice(code.as_bytes());
        return Ok(out);
    }
    if code.len() == 40 {
        let bytes = hex::decode(code).map_err(|_| CodecError::InvalidCurrency(code.into()))?;
        out.copy_from_slice(&bytes);
        return Ok(out);
    }
    Err(CodecError::InvalidCurrency(code.into()))
}

/// Inverse of [`encode_currency`].
pub fn decode_currency(bytes: &[u8; 20]) -> String {
    if bytes.iter().all(|b| *b == 0) {
        return "XRP".into();
    }
    let standard = bytes[..12].iter().all(|b| *b == 0)
        && bytes[15..].iter().all(|b| *b == 0)
        && bytes[12..15].iter().all(|b| b.is_ascii_alphanumeric());
    if standard {
        return String::from_utf8_lossy(&bytes[12..15]).into_owned();
    }
    hex::encode_upper(bytes)
}

/// Decode an amount starting at `input[0]`. Returns the JSON value and how
/// many bytes it used.
pub fn decode_amount(input: &[u8]) -> Result<(Value, usize), CodecError> {
    let head: [u8; 8] = input
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or(CodecError::UnexpectedEnd)?;
    let bits = u64::from_be_bytes(head);

    if bits & NOT_XRP_BIT == 0 {
        let drops = bits & !POSITIVE_BIT;
        let text = if bits & POSITIVE_BIT != 0 {
            drops.to_string()
        } else {
            format!("-{}", drops)
        };
        return Ok((Value::String(text), 8));
    }

    let currency: [u8; 20] = input
        .get(8..28)
        .and_then(|s| s.try_into().ok())
        .ok_or(CodecError::UnexpectedEnd)?;
    let issuer: [u8; 20] = input
        .get(28..48)
        .and_then(|s| s.try_into().ok())
        .ok_or(CodecError::UnexpectedEnd)?;

    let value = decode_issued_value(bits);
    Ok((
        json!({
            "currency": decode_currency(&currency),
            "value": value,
            "issuer": encode_classic_address(&issuer),
        }),
        48,
    ))
}

fn decode_issued_value(bits: u64) -> String {
    let mantissa = bits & 0x003F_FFFF_FFFF_FFFF;
    if mantissa == 0 {
        return "0".into();
    }
    let negative = bits & POSITIVE_BIT == 0;
    let exponent = ((bits >> 54) & 0xFF) as i32 - EXPONENT_BIAS;
    debug_assert!(mantissa <= MAX_MANTISSA);
    format_decimal(negative, mantissa, exponent)
}

/// Plain decimal rendering of `mantissa * 10^exponent`, without trailing
/// zeros or exponent notation.
fn format_decimal(negative: bool, mut mantissa: u64, mut exponent: i32) -> String {
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    let digits = mantissa.to_string();
    let body = if exponent >= 0 {
        format!("{}{}", digits, "0".repeat(exponent as usize))
    } else {
        let shift = (-exponent) as usize;
        if digits.len() > shift {
            let (int, frac) = digits.split_at(digits.len() - shift);
            format!("{}.{}", int, frac)
        } else {
            format!("0.{}{}", "0".repeat(shift - digits.len()), digits)
        }
    };
    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_hex(value: Value) -> String {
        let mut out = Vec::new();
        encode_amount(&value, &mut out).unwrap();
        hex::encode_upper(out)
    }

    #[test]
    fn one_drop() {
        assert_eq!(encode_hex(json!("1")), "4000000000000001");
    }

    #[test]
    fn zero_drops() {
        assert_eq!(encode_hex(json!("0")), "4000000000000000");
    }

    #[test]
    fn issued_value_one() {
        assert_eq!(format!("{:016X}", encode_issued_value("1").unwrap()), "D4838D7EA4C68000");
    }

    #[test]
    fn issued_zero() {
        assert_eq!(encode_issued_value("0").unwrap(), NOT_XRP_BIT);
        assert_eq!(encode_issued_value("0.000").unwrap(), NOT_XRP_BIT);
    }

    #[test]
    fn issued_negative_clears_sign_bit() {
        let positive = encode_issued_value("1.5").unwrap();
        let negative = encode_issued_value("-1.5").unwrap();
        assert_eq!(positive & !POSITIVE_BIT, negative);
    }

    #[test]
    fn equivalent_spellings_encode_identically() {
        let a = encode_issued_value("100").unwrap();
        assert_eq!(a, encode_issued_value("1e2").unwrap());
        assert_eq!(a, encode_issued_value("100.000").unwrap());
    }

    #[test]
    fn fractional_drops_rejected() {
        let mut out = Vec::new();
        assert!(encode_amount(&json!("1.5"), &mut out).is_err());
        assert!(encode_amount(&json!("abc"), &mut out).is_err());
    }

    #[test]
    fn too_much_precision_rejected() {
        assert!(encode_issued_value("1.2345678901234567").is_err());
    }

    #[test]
    fn currency_codes() {
        assert_eq!(encode_currency("XRP").unwrap(), [0u8; 20]);
        let usd = encode_currency("USD").unwrap();
        assert_eq!(&usd[12..15], b"USD");
        assert_eq!(decode_currency(&usd), "USD");
        assert!(encode_currency("TOOLONG").is_err());
    }

    #[test]
    fn issued_amount_round_trip() {
        let amount = json!({
            "currency": "USD",
            "value": "12.34",
            "issuer": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
        });
        let mut out = Vec::new();
        encode_amount(&amount, &mut out).unwrap();
        assert_eq!(out.len(), 48);
        let (decoded, used) = decode_amount(&out).unwrap();
        assert_eq!(used, 48);
        assert_eq!(decoded, amount);
    }

    #[test]
    fn small_values_render_without_exponent() {
        let bits = encode_issued_value("0.0001").unwrap();
        assert_eq!(decode_issued_value(bits), "0.0001");
    }

    #[test]
    fn drops_round_trip() {
        let mut out = Vec::new();
        encode_amount(&json!("1000000"), &mut out).unwrap();
        assert_eq!(decode_amount(&out).unwrap(), (json!("1000000"), 8));
    }
}
