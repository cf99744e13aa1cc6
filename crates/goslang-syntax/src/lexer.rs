// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Lexer for Go source text.
//!
//! Produces a flat token stream with semicolons inserted at line ends the way
//! Go does. Numerals are validated digit by digit, so only values that do not
//! fit their eventual type survive past this point.

use crate::error::SyntaxError;
use crate::token::{LitKind, Span, Spanned, Token};

pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Spanned<Token>>,
    /// Set when a newline at this point must become a semicolon.
    insert_semi: bool,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        // A leading byte order mark is not part of the program.
        let pos = if source.starts_with('\u{FEFF}') { '\u{FEFF}'.len_utf8() } else { 0 };
        Self {
            source,
            bytes: source.as_bytes(),
            pos,
            tokens: Vec::new(),
            insert_semi: false,
        }
    }

    fn run(mut self) -> Result<Vec<Spanned<Token>>, SyntaxError> {
        loop {
            self.skip_blanks();
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                if self.insert_semi {
                    self.push(Token::Semicolon { inserted: true }, start, start);
                }
                self.push(Token::Eof, start, start);
                return Ok(self.tokens);
            };

            match c {
                '\n' => {
                    self.pos += 1;
                    if self.insert_semi {
                        self.push(Token::Semicolon { inserted: true }, start, start + 1);
                    }
                }
                '/' if self.peek_byte(1) == Some(b'/') => self.skip_line_comment(),
                '/' if self.peek_byte(1) == Some(b'*') => self.skip_block_comment()?,
                c if c.is_alphabetic() || c == '_' => self.scan_identifier(),
                c if c.is_ascii_digit() => self.scan_number()?,
                '.' if self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) => self.scan_number()?,
                '\u{FEFF}' => {
                    self.pos += c.len_utf8();
                    return Err(self.error(start, "invalid BOM in the middle of the file"));
                }
                '"' => self.scan_string()?,
                '`' => self.scan_raw_string()?,
                '\'' => self.scan_rune()?,
                _ => self.scan_operator(c)?,
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, token: Token, start: usize, end: usize) {
        self.insert_semi = token.ends_statement();
        self.tokens.push(Spanned {
            node: token,
            span: Span::new(start, end),
        });
    }

    fn error(&self, start: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.source, Span::new(start, self.pos.max(start + 1)), message)
    }

    fn skip_blanks(&mut self) {
        while let Some(b) = self.peek_byte(0) {
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek_byte(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 2;
        let mut saw_newline = false;
        loop {
            match self.peek_byte(0) {
                None => return Err(self.error(start, "comment not terminated")),
                Some(b'*') if self.peek_byte(1) == Some(b'/') => {
                    self.pos += 2;
                    break;
                }
                Some(b) => {
                    saw_newline |= b == b'\n';
                    self.pos += 1;
                }
            }
        }
        // A multi-line comment acts like a newline.
        if saw_newline && self.insert_semi {
            self.push(Token::Semicolon { inserted: true }, start, start);
        }
        Ok(())
    }

    fn scan_identifier(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        let token = Token::keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()));
        self.push(token, start, self.pos);
    }

    /// Consumes digits and separators of `base`, recording the first digit
    /// that is not valid in that base. Returns whether a digit and whether a
    /// separator was seen.
    fn eat_digits(&mut self, base: u32, invalid: &mut Option<usize>) -> (bool, bool) {
        let (mut digit, mut separator) = (false, false);
        while let Some(b) = self.peek_byte(0) {
            if b == b'_' {
                separator = true;
            } else if b.is_ascii_digit() || (base == 16 && b.is_ascii_hexdigit()) {
                digit = true;
                if base < 16 && u32::from(b - b'0') >= base && invalid.is_none() {
                    *invalid = Some(self.pos);
                }
            } else {
                break;
            }
            self.pos += 1;
        }
        (digit, separator)
    }

    fn scan_number(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut kind = LitKind::Int;
        let mut base = 10;
        let mut prefix = Prefix::Decimal;
        let mut digits = false;
        let mut separators = false;
        let mut invalid = None;
        // Every problem found, by offset; the leftmost is reported.
        let mut problems: Vec<(usize, String)> = Vec::new();

        if self.peek_byte(0) != Some(b'.') {
            if self.peek_byte(0) == Some(b'0') {
                self.pos += 1;
                (base, prefix) = match self.peek_byte(0).map(|b| b.to_ascii_lowercase()) {
                    Some(b'x') => (16, Prefix::Hex),
                    Some(b'o') => (8, Prefix::Octal),
                    Some(b'b') => (2, Prefix::Binary),
                    _ => {
                        digits = true;
                        (8, Prefix::LegacyOctal)
                    }
                };
                if prefix != Prefix::LegacyOctal {
                    self.pos += 1;
                }
            }
            let (d, s) = self.eat_digits(base, &mut invalid);
            digits |= d;
            separators |= s;
        }

        if self.peek_byte(0) == Some(b'.') {
            kind = LitKind::Float;
            if matches!(prefix, Prefix::Octal | Prefix::Binary) {
                problems.push((self.pos, format!("invalid radix point in {}", prefix.name())));
            }
            self.pos += 1;
            let (d, s) = self.eat_digits(base, &mut invalid);
            digits |= d;
            separators |= s;
        }
        if !digits {
            problems.push((self.pos, format!("{} has no digits", prefix.name())));
        }

        match self.peek_byte(0) {
            Some(e @ (b'e' | b'E' | b'p' | b'P')) => {
                let hex_exponent = e.eq_ignore_ascii_case(&b'p');
                if !hex_exponent && !matches!(prefix, Prefix::Decimal | Prefix::LegacyOctal) {
                    problems.push((self.pos, format!("'{}' exponent requires decimal mantissa", e as char)));
                } else if hex_exponent && prefix != Prefix::Hex {
                    problems.push((self.pos, format!("'{}' exponent requires hexadecimal mantissa", e as char)));
                }
                kind = LitKind::Float;
                self.pos += 1;
                if matches!(self.peek_byte(0), Some(b'+' | b'-')) {
                    self.pos += 1;
                }
                let (d, s) = self.eat_digits(10, &mut None);
                separators |= s;
                if !d {
                    problems.push((self.pos, "exponent has no digits".to_string()));
                }
            }
            _ if prefix == Prefix::Hex && kind == LitKind::Float => {
                problems.push((self.pos, "hexadecimal mantissa requires a 'p' exponent".to_string()));
            }
            _ => {}
        }

        if self.peek_byte(0) == Some(b'i') {
            kind = LitKind::Imag;
            self.pos += 1;
        }

        let text = &self.source[start..self.pos];
        if let (LitKind::Int, Some(at)) = (kind, invalid) {
            problems.push((
                at,
                format!("invalid digit '{}' in {}", self.bytes[at] as char, prefix.name()),
            ));
        }
        if separators {
            if let Some(at) = misplaced_separator(text) {
                problems.push((start + at, "'_' must separate successive digits".to_string()));
            }
        }
        if let Some((at, message)) = problems.into_iter().min_by_key(|(at, _)| *at) {
            return Err(SyntaxError::new(self.source, Span::new(at, at + 1), message));
        }

        self.push(Token::Literal(kind, text.to_string()), start, self.pos);
        Ok(())
    }

    /// Scans a quoted literal ending at `quote`, honouring backslash escapes.
    fn scan_quoted(&mut self, quote: u8, unterminated: &str) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_byte(0) {
                None | Some(b'\n') => return Err(self.error(start, unterminated)),
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek_char() {
                        None | Some('\n') => return Err(self.error(start, unterminated)),
                        Some(c) => self.pos += c.len_utf8(),
                    }
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {
                    let c = self.peek_char().unwrap_or_default();
                    self.pos += c.len_utf8().max(1);
                }
            }
        }
    }

    fn scan_string(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.scan_quoted(b'"', "string literal not terminated")?;
        let text = self.source[start..self.pos].to_string();
        self.push(Token::Literal(LitKind::String, text), start, self.pos);
        Ok(())
    }

    fn scan_rune(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.scan_quoted(b'\'', "rune literal not terminated")?;
        if self.pos - start == 2 {
            return Err(self.error(start, "empty rune literal or unescaped ' in rune literal"));
        }
        let text = self.source[start..self.pos].to_string();
        self.push(Token::Literal(LitKind::Char, text), start, self.pos);
        Ok(())
    }

    fn scan_raw_string(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        match self.source[self.pos..].find('`') {
            Some(len) => self.pos += len + 1,
            None => {
                self.pos = self.source.len();
                return Err(self.error(start, "raw string literal not terminated"));
            }
        }
        let text = self.source[start..self.pos].to_string();
        self.push(Token::Literal(LitKind::String, text), start, self.pos);
        Ok(())
    }

    fn scan_operator(&mut self, c: char) -> Result<(), SyntaxError> {
        const OPERATORS: &[(&str, Token)] = &[
            ("<<=", Token::ShlAssign),
            (">>=", Token::ShrAssign),
            ("&^=", Token::AndNotAssign),
            ("...", Token::Ellipsis),
            ("+=", Token::AddAssign),
            ("-=", Token::SubAssign),
            ("*=", Token::MulAssign),
            ("/=", Token::QuoAssign),
            ("%=", Token::RemAssign),
            ("&=", Token::AndAssign),
            ("|=", Token::OrAssign),
            ("^=", Token::XorAssign),
            ("<<", Token::Shl),
            (">>", Token::Shr),
            ("&^", Token::AndNot),
            ("&&", Token::LAnd),
            ("||", Token::LOr),
            ("<-", Token::Arrow),
            ("++", Token::Inc),
            ("--", Token::Dec),
            ("==", Token::Eql),
            ("!=", Token::Neq),
            ("<=", Token::Leq),
            (">=", Token::Geq),
            (":=", Token::Define),
            ("+", Token::Add),
            ("-", Token::Sub),
            ("*", Token::Mul),
            ("/", Token::Quo),
            ("%", Token::Rem),
            ("&", Token::And),
            ("|", Token::Or),
            ("^", Token::Xor),
            ("<", Token::Lss),
            (">", Token::Gtr),
            ("=", Token::Assign),
            ("!", Token::Not),
            ("~", Token::Tilde),
            ("(", Token::LParen),
            ("[", Token::LBrack),
            ("{", Token::LBrace),
            (",", Token::Comma),
            (".", Token::Period),
            (")", Token::RParen),
            ("]", Token::RBrack),
            ("}", Token::RBrace),
            (";", Token::Semicolon { inserted: false }),
            (":", Token::Colon),
        ];

        let start = self.pos;
        let rest = &self.source[start..];
        for (spelling, token) in OPERATORS {
            if rest.starts_with(spelling) {
                self.pos += spelling.len();
                self.push(token.clone(), start, self.pos);
                return Ok(());
            }
        }
        self.pos += c.len_utf8();
        Err(self.error(
            start,
            format!("invalid character U+{:04X} '{}'", c as u32, c),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Decimal,
    /// A bare leading `0`.
    LegacyOctal,
    Octal,
    Hex,
    Binary,
}

impl Prefix {
    fn name(self) -> &'static str {
        match self {
            Prefix::Decimal => "decimal literal",
            Prefix::LegacyOctal | Prefix::Octal => "octal literal",
            Prefix::Hex => "hexadecimal literal",
            Prefix::Binary => "binary literal",
        }
    }
}

/// Offset of the first `_` in a numeral that does not sit between two
/// digits (a base prefix counts as a digit).
fn misplaced_separator(text: &str) -> Option<usize> {
    #[derive(PartialEq)]
    enum Prev {
        Digit,
        Separator,
        Other,
    }

    let bytes = text.as_bytes();
    let hex = bytes.len() >= 2 && bytes[0] == b'0' && bytes[1].eq_ignore_ascii_case(&b'x');
    let (mut i, mut prev) = match bytes {
        [b'0', p, ..] if matches!(p.to_ascii_lowercase(), b'x' | b'o' | b'b') => (2, Prev::Digit),
        _ => (0, Prev::Other),
    };
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'_' {
            if prev != Prev::Digit {
                return Some(i);
            }
            prev = Prev::Separator;
        } else if b.is_ascii_digit() || (hex && b.is_ascii_hexdigit()) {
            prev = Prev::Digit;
        } else {
            if prev == Prev::Separator {
                return Some(i - 1);
            }
            prev = Prev::Other;
        }
        i += 1;
    }
    (prev == Prev::Separator).then(|| bytes.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.node)
            .collect()
    }

    #[test]
    fn test_semicolons_inserted_after_statement_enders() {
        let tokens = kinds("x := 1\nreturn\n}\n");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".to_string()),
                Token::Define,
                Token::Literal(LitKind::Int, "1".to_string()),
                Token::Semicolon { inserted: true },
                Token::Return,
                Token::Semicolon { inserted: true },
                Token::RBrace,
                Token::Semicolon { inserted: true },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_no_semicolon_after_operator_at_line_end() {
        let tokens = kinds("a +\nb");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".to_string()),
                Token::Add,
                Token::Ident("b".to_string()),
                Token::Semicolon { inserted: true },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_by_kind() {
        let tokens = kinds("0x1F 017 09.5 1.5e3 .25 0x1p-2 3i 1_000 0b_1 0x_f");
        let literals: Vec<_> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Literal(kind, text) => Some((kind, text)),
                _ => None,
            })
            .collect();
        assert_eq!(
            literals,
            vec![
                (LitKind::Int, "0x1F".to_string()),
                (LitKind::Int, "017".to_string()),
                (LitKind::Float, "09.5".to_string()),
                (LitKind::Float, "1.5e3".to_string()),
                (LitKind::Float, ".25".to_string()),
                (LitKind::Float, "0x1p-2".to_string()),
                (LitKind::Imag, "3i".to_string()),
                (LitKind::Int, "1_000".to_string()),
                (LitKind::Int, "0b_1".to_string()),
                (LitKind::Int, "0x_f".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_numerals() {
        let cases = [
            ("x := 08", "1:7: invalid digit '8' in octal literal"),
            ("x := 0b102", "1:10: invalid digit '2' in binary literal"),
            ("x := 0o19", "1:9: invalid digit '9' in octal literal"),
            ("x := 0x", "1:8: hexadecimal literal has no digits"),
            ("x := 0b", "1:8: binary literal has no digits"),
            ("x := 1_", "1:7: '_' must separate successive digits"),
            ("x := 1__0", "1:8: '_' must separate successive digits"),
            ("x := 1._5", "1:8: '_' must separate successive digits"),
            ("x := 1e", "1:8: exponent has no digits"),
            ("x := 1e+", "1:9: exponent has no digits"),
            ("x := 0x1.8", "1:11: hexadecimal mantissa requires a 'p' exponent"),
            ("x := 1p4", "1:7: 'p' exponent requires hexadecimal mantissa"),
            ("x := 0b1e3", "1:9: 'e' exponent requires decimal mantissa"),
            ("x := 0o1.2", "1:9: invalid radix point in octal literal"),
        ];
        for (source, expected) in cases {
            let err = tokenize(source).unwrap_err();
            assert_eq!(err.to_string(), expected, "{}", source);
        }
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        assert_eq!(
            kinds("\u{FEFF}package p\n"),
            vec![
                Token::Package,
                Token::Ident("p".to_string()),
                Token::Semicolon { inserted: true },
                Token::Eof,
            ]
        );
        let err = tokenize("x \u{FEFF}").unwrap_err();
        assert_eq!(err.to_string(), "1:3: invalid BOM in the middle of the file");
    }

    #[test]
    fn test_comments_and_strings() {
        let tokens = kinds("s := \"a\\\"b\" // trailing\n/* multi\nline */ r := 'x'");
        assert!(tokens.contains(&Token::Literal(LitKind::String, "\"a\\\"b\"".to_string())));
        assert!(tokens.contains(&Token::Literal(LitKind::Char, "'x'".to_string())));
        assert_eq!(
            tokens.iter().filter(|t| matches!(t, Token::Semicolon { .. })).count(),
            2
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a &^= b"),
            vec![
                Token::Ident("a".to_string()),
                Token::AndNotAssign,
                Token::Ident("b".to_string()),
                Token::Semicolon { inserted: true },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexical_errors() {
        let err = tokenize("x := \"open\n").unwrap_err();
        assert_eq!(err.to_string(), "1:6: string literal not terminated");
        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.to_string(), "1:3: invalid character U+0040 '@'");
        let err = tokenize("/* never closed").unwrap_err();
        assert_eq!(err.message, "comment not terminated");
    }
}
