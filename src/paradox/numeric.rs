//! Paradox numeric decoding.
//!
//! Paradox stores signed numerics big-endian with an inverted sign bit so
//! that unsigned byte comparison sorts values correctly. The inversion
//! transform is factored once here; every scalar decoder (Short, Long,
//! AutoInc, Date, Time, Timestamp, Number, BCD) is expressed in terms of it.

use bigdecimal::BigDecimal;
use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use std::str::FromStr;

/// Outcome of undoing the sign-bit inversion on a stored numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignState {
    NonNegative,
    Negative,
    /// All bytes zero: the field holds no value.
    Null,
}

/// Undo the sign-bit inversion in place.
///
/// A set MSB marks a non-negative value (clear it); a clear MSB with any
/// non-zero byte marks a negative value (restore the two's-complement sign
/// bit); all-zero bytes are the stored null.
fn normalize_sign(bytes: &mut [u8]) -> SignState {
    match bytes.first() {
        None => SignState::Null,
        Some(&first) if first & 0x80 != 0 => {
            bytes[0] = first & 0x7F;
            SignState::NonNegative
        }
        _ if bytes.iter().any(|&b| b != 0) => {
            bytes[0] |= 0x80;
            SignState::Negative
        }
        _ => SignState::Null,
    }
}

/// Decode a sign-biased big-endian signed integer (2 bytes for Short,
/// 4 for Long/AutoInc), sign-extended to 64 bits. `None` is the stored
/// null; widths outside 1..=8 are malformed and also null.
pub fn decode_signed(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    let width = bytes.len();
    buf[..width].copy_from_slice(bytes);
    if normalize_sign(&mut buf[..width]) == SignState::Null {
        return None;
    }
    let mut value: u64 = 0;
    for &b in &buf[..width] {
        value = (value << 8) | u64::from(b);
    }
    let shift = 64 - width * 8;
    Some(((value << shift) as i64) >> shift)
}

/// Decode a sign-biased IEEE-754 double. Negative values are stored with
/// every byte complemented; all-zero bytes are the stored null.
pub fn decode_double(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    if buf[0] & 0x80 != 0 {
        buf[0] &= 0x7F;
    } else if buf.iter().any(|&b| b != 0) {
        for b in &mut buf {
            *b = !*b;
        }
    } else {
        return None;
    }
    Some(BigEndian::read_f64(&buf))
}

/// Decode a Logical byte: zero is null, otherwise the high bit is toggled
/// and any remaining set bit means true (0x80 = false, 0x81 = true).
pub fn decode_logical(byte: u8) -> Option<bool> {
    if byte == 0 {
        None
    } else {
        Some(byte ^ 0x80 != 0)
    }
}

/// Days since 0001-01-01, day 1 inclusive, UTC calendar. Non-positive
/// day numbers are null.
pub fn decode_date(bytes: &[u8]) -> Option<NaiveDate> {
    let days = decode_signed(bytes)?;
    if days <= 0 {
        return None;
    }
    paradox_epoch().checked_add_days(Days::new(days as u64 - 1))
}

/// Milliseconds since midnight, emitted as floating seconds.
pub fn decode_time(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 4 {
        return None;
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    if normalize_sign(&mut buf) == SignState::Null {
        return None;
    }
    let millis = BigEndian::read_u32(&buf);
    Some(f64::from(millis) / 1000.0)
}

/// A double whose integer part is days (Date epoch) and whose fraction,
/// times 86 400, is seconds-within-day. Rounded to the nearest millisecond.
pub fn decode_timestamp(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let value = decode_double(bytes)?;
    if value <= 0.0 {
        return None;
    }
    let days = value.trunc() as i64;
    if days <= 0 {
        return None;
    }
    let millis = (value.fract() * 86_400_000.0).round() as i64;
    let date = paradox_epoch().checked_add_days(Days::new(days as u64 - 1))?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    midnight.checked_add_signed(Duration::milliseconds(millis))
}

/// Decode a 17-byte BCD field into a fixed-point decimal.
///
/// Byte 0: low 6 bits are the stored scale (the descriptor's declared
/// decimal count overrides when positive); a set high bit marks a positive
/// value, otherwise every digit nibble is complemented (XOR 0x0F) and the
/// result negated. The 32 digit nibbles follow from nibble index 2; the
/// trailing `scale` nibbles form the fraction.
pub fn decode_bcd(bytes: &[u8], declared_decimals: usize) -> Option<BigDecimal> {
    const DIGIT_NIBBLES: usize = 32;

    if bytes.len() < 17 || bytes[0] == 0 {
        return None;
    }
    let positive = bytes[0] & 0x80 != 0;
    let stored_scale = (bytes[0] & 0x3F) as usize;
    let scale = if declared_decimals > 0 {
        declared_decimals
    } else {
        stored_scale
    }
    .min(DIGIT_NIBBLES);

    let mut digits = [0u8; DIGIT_NIBBLES];
    for (i, digit) in digits.iter_mut().enumerate() {
        let nibble_index = i + 2;
        let byte = bytes[nibble_index / 2];
        let mut nibble = if nibble_index % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        };
        if !positive {
            nibble ^= 0x0F;
        }
        if nibble > 9 {
            return None;
        }
        *digit = nibble;
    }

    let (int_digits, frac_digits) = digits.split_at(DIGIT_NIBBLES - scale);
    let mut text = String::with_capacity(DIGIT_NIBBLES + 2);
    if !positive {
        text.push('-');
    }
    let int_start = int_digits
        .iter()
        .position(|&d| d != 0)
        .unwrap_or(int_digits.len().saturating_sub(1));
    for &d in &int_digits[int_start..] {
        text.push(char::from(b'0' + d));
    }
    if text.ends_with('-') || text.is_empty() {
        text.push('0');
    }
    if scale > 0 {
        text.push('.');
        for &d in frac_digits {
            text.push(char::from(b'0' + d));
        }
    }
    BigDecimal::from_str(&text).ok()
}

fn paradox_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).expect("0001-01-01 is a valid date")
}
