//! Numeric token decoding.
//!
//! Kernel pseudo-files print numbers in three ways: plain integers, values
//! "humanized" by bcache's `bch_hprint()` (`542k`, `1.1M`), and fixed-point
//! values whose fractional digits are not decimal. These are pure functions
//! over a single token.

use super::error::{DecodeError, DecodeErrorKind};

/// Magnitude suffixes printed by `bch_hprint()`, in ascending order.
/// Each step multiplies by 2^10.
const SUFFIXES: [char; 8] = ['k', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

/// 2^64 as f64; anything at or above cannot be represented as u64.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a plain unsigned decimal integer.
pub fn parse_u64(token: &str) -> Result<u64, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::new(token, DecodeErrorKind::Empty));
    }
    if !is_digits(token) {
        return Err(DecodeError::new(token, DecodeErrorKind::NotNumeric));
    }
    token
        .parse()
        .map_err(|_| DecodeError::new(token, DecodeErrorKind::OutOfRange))
}

/// Parses every token as a plain unsigned integer.
pub fn parse_u64s(tokens: &[&str]) -> Result<Vec<u64>, DecodeError> {
    tokens.iter().map(|t| parse_u64(t)).collect()
}

/// Parses a kernel pseudo-float of the shape `<int>[.<frac>]`.
///
/// `bch_hprint()` prints the remainder of a division by 1024 as
/// `rem * 10 / 1024`, so the digits after the dot count hundredths of 1024
/// rather than a decimal fraction: `"1.1"` is `1 + 1 * 100 / 1024`, and
/// `"1.10"` sorts above `"1.9"`.
pub fn parse_pseudo_float(token: &str) -> Result<f64, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::new(token, DecodeErrorKind::Empty));
    }
    let (int_part, frac_part) = match token.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (token, None),
    };

    let whole = |part: &str| -> Result<u64, DecodeError> {
        parse_u64(part).map_err(|e| DecodeError::new(token, e.kind))
    };
    // An empty fraction ("1.") is a malformed print, not a shorthand for ".0".
    let int = whole(int_part).map_err(|e| match e.kind {
        DecodeErrorKind::Empty => DecodeError::new(token, DecodeErrorKind::NotNumeric),
        _ => e,
    })?;

    match frac_part {
        None => Ok(int as f64),
        Some(frac_part) => {
            let frac = whole(frac_part).map_err(|e| match e.kind {
                DecodeErrorKind::Empty => DecodeError::new(token, DecodeErrorKind::NotNumeric),
                _ => e,
            })?;
            Ok(int as f64 + (frac as f64 * 100.0) / 1024.0)
        }
    }
}

/// Decodes a value printed by `bch_hprint()`.
///
/// A trailing letter selects a power-of-two scale and the mantissa is a
/// pseudo-float. Without a suffix the token is an ordinary count.
pub fn dehumanize(token: &str) -> Result<u64, DecodeError> {
    let Some(last) = token.chars().last() else {
        return Err(DecodeError::new(token, DecodeErrorKind::Empty));
    };

    if last.is_ascii_digit() {
        if is_digits(token) {
            return parse_u64(token);
        }
        // Decimal count such as "0.5"; only digits and a single dot allowed.
        let valid = token.split_once('.').is_some_and(|(i, f)| is_digits(i) && is_digits(f));
        if !valid {
            return Err(DecodeError::new(token, DecodeErrorKind::NotNumeric));
        }
        let value: f64 = token
            .parse()
            .map_err(|_| DecodeError::new(token, DecodeErrorKind::NotNumeric))?;
        return to_u64(token, value);
    }

    let Some(power) = SUFFIXES.iter().position(|&s| s == last) else {
        return Err(DecodeError::new(
            token,
            if last.is_ascii_alphabetic() {
                DecodeErrorKind::UnknownSuffix(last)
            } else {
                DecodeErrorKind::NotNumeric
            },
        ));
    };

    let mantissa = &token[..token.len() - last.len_utf8()];
    let mantissa = parse_pseudo_float(mantissa).map_err(|e| {
        let kind = match e.kind {
            DecodeErrorKind::Empty => DecodeErrorKind::NotNumeric,
            kind => kind,
        };
        DecodeError::new(token, kind)
    })?;
    let scale = 2f64.powi(10 * (power as i32 + 1));
    to_u64(token, mantissa * scale)
}

/// Like [`dehumanize`], but accepts a leading minus sign.
pub fn dehumanize_signed(token: &str) -> Result<i64, DecodeError> {
    let (negative, magnitude) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = dehumanize(magnitude).map_err(|e| DecodeError::new(token, e.kind))?;
    let out_of_range = || DecodeError::new(token, DecodeErrorKind::OutOfRange);
    if negative {
        if value > i64::MAX as u64 + 1 {
            return Err(out_of_range());
        }
        Ok(-(value as i128) as i64)
    } else {
        i64::try_from(value).map_err(|_| out_of_range())
    }
}

fn to_u64(token: &str, value: f64) -> Result<u64, DecodeError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < 0.0 || rounded >= U64_LIMIT {
        return Err(DecodeError::new(token, DecodeErrorKind::OutOfRange));
    }
    Ok(rounded as u64)
}
