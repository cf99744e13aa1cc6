// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Scalar literal translation.
//!
//! Integer literals follow Go's base-prefixed syntax (`0x`, `0o`, `0b`, a
//! leading `0` for octal, `_` digit separators) and must fit in an `int64`.
//! Float literals are read at `float64` precision, including hexadecimal
//! mantissas with a binary exponent. Failures carry the same diagnostics as
//! Go's `strconv` package.

use goslang_ir::Node;
use goslang_syntax::ast::BasicLit;
use goslang_syntax::token::LitKind;
use log::trace;

pub struct LiteralTranslator;

impl LiteralTranslator {
    pub fn translate(&self, lit: &BasicLit) -> Node {
        trace!("literal {} {}", lit.kind, lit.value);
        match lit.kind {
            LitKind::Int => match parse_int(&lit.value) {
                Ok(value) => Node::int(value),
                Err(err) => Node::error(err),
            },
            LitKind::Float => match parse_float(&lit.value) {
                Ok(value) => Node::float(value),
                Err(err) => Node::error(err),
            },
            LitKind::String | LitKind::Char | LitKind::Imag => {
                Node::error(format!("Unsupported literal type {}", lit.kind))
            }
        }
    }
}

fn syntax_error(func: &str, text: &str) -> String {
    format!("strconv.{}: parsing {:?}: invalid syntax", func, text)
}

fn range_error(func: &str, text: &str) -> String {
    format!("strconv.{}: parsing {:?}: value out of range", func, text)
}

/// Whether the underscores in a numeral only separate digits, or a base
/// prefix from a digit.
fn underscores_ok(text: &str) -> bool {
    #[derive(PartialEq)]
    enum Saw {
        Start,
        Digit,
        Underscore,
        Other,
    }

    let bytes = text.as_bytes();
    let mut saw = Saw::Start;
    let mut i = 0;
    let mut hex = false;
    if bytes.len() >= 2 && bytes[0] == b'0' && matches!(bytes[1].to_ascii_lowercase(), b'b' | b'o' | b'x') {
        i = 2;
        saw = Saw::Digit;
        hex = bytes[1].to_ascii_lowercase() == b'x';
    }
    for &c in &bytes[i..] {
        if c.is_ascii_digit() || (hex && c.is_ascii_hexdigit()) {
            saw = Saw::Digit;
            continue;
        }
        if c == b'_' {
            if saw != Saw::Digit {
                return false;
            }
            saw = Saw::Underscore;
            continue;
        }
        if saw == Saw::Underscore {
            return false;
        }
        saw = Saw::Other;
    }
    saw != Saw::Underscore
}

/// Parses an integer literal the way `strconv.ParseInt(text, 0, 64)` does.
pub fn parse_int(text: &str) -> Result<i64, String> {
    const FUNC: &str = "ParseInt";
    if text.is_empty() {
        return Err(syntax_error(FUNC, text));
    }

    let bytes = text.as_bytes();
    let (base, digits): (u64, &[u8]) = match bytes {
        [b'0', prefix, _, ..] if prefix.eq_ignore_ascii_case(&b'b') => (2, &bytes[2..]),
        [b'0', prefix, _, ..] if prefix.eq_ignore_ascii_case(&b'o') => (8, &bytes[2..]),
        [b'0', prefix, _, ..] if prefix.eq_ignore_ascii_case(&b'x') => (16, &bytes[2..]),
        [b'0', ..] => (8, &bytes[1..]),
        _ => (10, bytes),
    };

    let mut value: u64 = 0;
    let mut underscores = false;
    for &c in digits {
        let digit = match c {
            b'_' => {
                underscores = true;
                continue;
            }
            b'0'..=b'9' => c - b'0',
            c if c.is_ascii_alphabetic() => c.to_ascii_lowercase() - b'a' + 10,
            _ => return Err(syntax_error(FUNC, text)),
        };
        if u64::from(digit) >= base {
            return Err(syntax_error(FUNC, text));
        }
        value = value
            .checked_mul(base)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or_else(|| range_error(FUNC, text))?;
    }
    if underscores && !underscores_ok(text) {
        return Err(syntax_error(FUNC, text));
    }
    i64::try_from(value).map_err(|_| range_error(FUNC, text))
}

/// Parses a float literal the way `strconv.ParseFloat(text, 64)` does.
pub fn parse_float(text: &str) -> Result<f64, String> {
    const FUNC: &str = "ParseFloat";
    let bytes = text.as_bytes();
    let is_hex = bytes.len() >= 2 && bytes[0] == b'0' && bytes[1].eq_ignore_ascii_case(&b'x');

    if text.contains('_') && !underscores_ok(text) {
        return Err(syntax_error(FUNC, text));
    }
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();

    let value = if is_hex {
        parse_hex_float(&cleaned[2..]).ok_or_else(|| syntax_error(FUNC, text))?
    } else {
        let well_formed = cleaned
            .bytes()
            .all(|c| c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-'));
        if !well_formed || !cleaned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Err(syntax_error(FUNC, text));
        }
        cleaned.parse::<f64>().map_err(|_| syntax_error(FUNC, text))?
    };

    if !value.is_finite() {
        return Err(range_error(FUNC, text));
    }
    Ok(value)
}

/// Hexadecimal mantissa (after `0x`) with a mandatory `p` exponent.
fn parse_hex_float(text: &str) -> Option<f64> {
    let (mantissa, exponent) = text.split_once(['p', 'P'])?;
    let mut exponent = parse_exponent(exponent)?;

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    // Digits beyond the 64-bit accumulator only matter as a sticky bit.
    let mut bits: u64 = 0;
    let mut sticky = false;
    let digits = int_part
        .chars()
        .map(|c| (c, false))
        .chain(frac_part.chars().map(|c| (c, true)));
    for (c, fractional) in digits {
        let digit = u64::from(c.to_digit(16)?);
        if bits >> 60 == 0 {
            bits = bits * 16 + digit;
            if fractional {
                exponent -= 4;
            }
        } else {
            sticky |= digit != 0;
            if !fractional {
                exponent += 4;
            }
        }
    }
    Some(round_to_f64(bits, sticky, exponent))
}

/// Decimal exponent with optional sign, saturated far beyond the `f64` range.
fn parse_exponent(text: &str) -> Option<i64> {
    const LIMIT: i64 = 100_000;
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'+') => (false, &text[1..]),
        Some(b'-') => (true, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for c in digits.chars() {
        value = (value * 10 + i64::from(c.to_digit(10)?)).min(LIMIT);
    }
    Some(if negative { -value } else { value })
}

/// Rounds `(bits + sticky) * 2^exponent` to the nearest `f64`, ties to even.
/// `sticky` marks nonzero bits below the lowest bit of `bits`.
fn round_to_f64(bits: u64, sticky: bool, exponent: i64) -> f64 {
    const SIGNIFICAND: u64 = 1 << 52;
    if bits == 0 {
        return 0.0;
    }
    let top = exponent + i64::from(64 - bits.leading_zeros()) - 1;
    // Weight of the last kept bit: 53 significant bits, fewer once subnormal.
    let mut lsb = (top - 52).max(-1074);
    let shift = lsb - exponent;

    let mut kept = if shift <= 0 {
        bits << -shift
    } else if shift >= 128 {
        0
    } else {
        let wide = u128::from(bits);
        let shift = shift as u32;
        let kept = wide >> shift;
        let rest = wide & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        let round_up = rest > half || (rest == half && (sticky || kept & 1 == 1));
        (kept + u128::from(round_up)) as u64
    };
    if kept == SIGNIFICAND << 1 {
        kept >>= 1;
        lsb += 1;
    }

    if kept < SIGNIFICAND {
        return f64::from_bits(kept);
    }
    let biased = lsb + 52 + 1023;
    if biased >= 2047 {
        return f64::INFINITY;
    }
    f64::from_bits(((biased as u64) << 52) | (kept & (SIGNIFICAND - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use goslang_ir::Literal;
    use goslang_syntax::token::Span;

    fn lit(kind: LitKind, value: &str) -> BasicLit {
        BasicLit {
            kind,
            value: value.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_integer_bases() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("0"), Ok(0));
        assert_eq!(parse_int("0x2A"), Ok(42));
        assert_eq!(parse_int("0X2a"), Ok(42));
        assert_eq!(parse_int("052"), Ok(42));
        assert_eq!(parse_int("0o52"), Ok(42));
        assert_eq!(parse_int("0b101010"), Ok(42));
        assert_eq!(parse_int("1_000_000"), Ok(1_000_000));
        assert_eq!(parse_int("0x_FF"), Ok(255));
        assert_eq!(parse_int("9223372036854775807"), Ok(i64::MAX));
    }

    #[test]
    fn test_integer_errors() {
        assert_eq!(
            parse_int("08"),
            Err(r#"strconv.ParseInt: parsing "08": invalid syntax"#.to_string())
        );
        assert_eq!(
            parse_int("0b102"),
            Err(r#"strconv.ParseInt: parsing "0b102": invalid syntax"#.to_string())
        );
        assert_eq!(
            parse_int("1__0"),
            Err(r#"strconv.ParseInt: parsing "1__0": invalid syntax"#.to_string())
        );
        assert_eq!(
            parse_int("9223372036854775808"),
            Err(r#"strconv.ParseInt: parsing "9223372036854775808": value out of range"#.to_string())
        );
        assert_eq!(
            parse_int("0xFFFFFFFFFFFFFFFFFF"),
            Err(r#"strconv.ParseInt: parsing "0xFFFFFFFFFFFFFFFFFF": value out of range"#.to_string())
        );
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(parse_float("2.75"), Ok(2.75));
        assert_eq!(parse_float("1e3"), Ok(1000.0));
        assert_eq!(parse_float("1E-2"), Ok(0.01));
        assert_eq!(parse_float(".5"), Ok(0.5));
        assert_eq!(parse_float("2."), Ok(2.0));
        assert_eq!(parse_float("09.5"), Ok(9.5));
        assert_eq!(parse_float("1_000.25"), Ok(1000.25));
        assert_eq!(parse_float("0x1p-2"), Ok(0.25));
        assert_eq!(parse_float("0x1.8p1"), Ok(3.0));
        assert_eq!(parse_float("0X.8P+0"), Ok(0.5));
        assert_eq!(parse_float("0.1"), Ok(0.1));
    }

    #[test]
    fn test_float_errors() {
        assert_eq!(
            parse_float("1e400"),
            Err(r#"strconv.ParseFloat: parsing "1e400": value out of range"#.to_string())
        );
        assert_eq!(
            parse_float("1._5"),
            Err(r#"strconv.ParseFloat: parsing "1._5": invalid syntax"#.to_string())
        );
        assert!(parse_float("0x1.8").is_err());
    }

    #[test]
    fn test_hex_float_rounds_once() {
        // 2^53 + 1.5 lies closer to 2^53 + 2 than to 2^53.
        assert_eq!(parse_float("0x20000000000001.8p0"), Ok(9007199254740994.0));
        assert_eq!(parse_float("0x20000000000001p0"), Ok(9007199254740992.0));
        assert_eq!(parse_float("0x20000000000003p0"), Ok(9007199254740996.0));
        assert_eq!(parse_float("0x1.fffffffffffff8p0"), Ok(2.0));
        assert_eq!(parse_float("0x1.0000000000000800000000001p0"), Ok(1.0 + f64::EPSILON));
    }

    #[test]
    fn test_hex_float_extremes() {
        assert_eq!(parse_float("0x1p-1074"), Ok(f64::from_bits(1)));
        assert_eq!(parse_float("0x1p-1075"), Ok(0.0));
        assert_eq!(parse_float("0x1.8p-1075"), Ok(f64::from_bits(1)));
        assert_eq!(parse_float("0x1p-1022"), Ok(f64::MIN_POSITIVE));
        assert_eq!(parse_float("0x1.fffffffffffffp1023"), Ok(f64::MAX));
        assert_eq!(parse_float("0x1p-99999999999"), Ok(0.0));
        assert_eq!(
            parse_float("0x1p99999999999"),
            Err(r#"strconv.ParseFloat: parsing "0x1p99999999999": value out of range"#.to_string())
        );
        assert_eq!(
            parse_float("0x1p1024"),
            Err(r#"strconv.ParseFloat: parsing "0x1p1024": value out of range"#.to_string())
        );
    }

    #[test]
    fn test_literal_nodes() {
        let translator = LiteralTranslator;
        assert_eq!(translator.translate(&lit(LitKind::Int, "7")), Node::Lit(Literal::Int(7)));
        assert_eq!(
            translator.translate(&lit(LitKind::Float, "2.5")),
            Node::Lit(Literal::Float(2.5))
        );
        assert_eq!(
            translator.translate(&lit(LitKind::Int, "08")),
            Node::error(r#"strconv.ParseInt: parsing "08": invalid syntax"#)
        );
        assert_eq!(
            translator.translate(&lit(LitKind::String, "\"hi\"")),
            Node::error("Unsupported literal type STRING")
        );
        assert_eq!(
            translator.translate(&lit(LitKind::Char, "'a'")),
            Node::error("Unsupported literal type CHAR")
        );
        assert_eq!(
            translator.translate(&lit(LitKind::Imag, "2i")),
            Node::error("Unsupported literal type IMAG")
        );
    }
}
