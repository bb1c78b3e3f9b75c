//! Safe parser for Python-style literals.
//!
//! Annotation tools and users hand us dictionaries written as Python source
//! (`{'name': 'Tumor', 'color': [255, 0, 0]}`, `{"s1": "C3", ...}`). This
//! parser accepts the literal subset only (dicts, lists, tuples, strings,
//! numbers, `True`, `False`, `None`) and never evaluates anything. Results
//! are returned as [`serde_json::Value`] so they share one in-memory
//! representation with structured GeoJSON properties.

use serde_json::{Map, Number, Value};

use crate::error::{LmdError, Result};

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> Result<Value> {
    let mut parser = Parser::new(input);
    parser.skip_trivia();
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        // tolerate a UTF-8 BOM from files saved on Windows
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> LmdError {
        LmdError::LiteralSyntax {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_trivia();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => self.parse_dict(),
            Some(b'[') => self.parse_sequence(b'[', b']'),
            Some(b'(') => self.parse_sequence(b'(', b')'),
            Some(b'\'') | Some(b'"') => self.parse_strings().map(Value::String),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => {
                self.parse_number()
            }
            Some(b) if b.is_ascii_alphabetic() => self.parse_keyword(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn parse_dict(&mut self) -> Result<Value> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.parse_value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => (if b { "True" } else { "False" }).to_string(),
                _ => return Err(self.error("dictionary keys must be strings or numbers")),
            };
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}' in dictionary")),
            }
        }
    }

    fn parse_sequence(&mut self, open: u8, close: u8) -> Result<Value> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => {
                    return Err(self.error(&format!(
                        "expected ',' or '{}' in sequence",
                        close as char
                    )))
                }
            }
        }
    }

    /// Adjacent string literals concatenate, as in Python source.
    fn parse_strings(&mut self) -> Result<String> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_trivia();
            match self.peek() {
                Some(b'\'') | Some(b'"') => out.push_str(&self.parse_string()?),
                _ => {
                    self.pos = save;
                    return Ok(out);
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.error("expected string")),
        };
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let mut chars = rest.chars();
            let c = match chars.next() {
                Some(c) => c,
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
            };
            self.pos += c.len_utf8();
            match c {
                c if c as u32 == quote as u32 => return Ok(out),
                '\n' => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                '\\' => out.push(self.parse_escape()?),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char> {
        let b = self.peek().ok_or_else(|| self.error("dangling escape"))?;
        self.pos += 1;
        let c = match b {
            b'\\' => '\\',
            b'\'' => '\'',
            b'"' => '"',
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'0' => '\0',
            b'x' => self.parse_hex_escape(2)?,
            b'u' => self.parse_hex_escape(4)?,
            b'U' => self.parse_hex_escape(8)?,
            _ => return Err(self.error("unsupported escape sequence")),
        };
        Ok(c)
    }

    fn parse_hex_escape(&mut self, len: usize) -> Result<char> {
        let end = self.pos + len;
        let digits = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'-') | Some(b'+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Number(Number::from(i)));
            }
        }
        let f: f64 = text.parse().map_err(|_| {
            self.pos = start;
            self.error("invalid number")
        })?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| self.error("number is not finite"))
    }

    fn parse_keyword(&mut self) -> Result<Value> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match &self.input[start..self.pos] {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error("only literal values are allowed"))
            }
        }
    }
}
