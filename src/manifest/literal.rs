//! Strict parser for the literal subset used by module descriptors
//!
//! Descriptors are written as a single literal mapping, e.g.
//!
//! ```text
//! # -*- coding: utf-8 -*-
//! {
//!     'name': "Sales",
//!     'version': '16.0.1.0.0',
//!     'depends': ['base', 'mail'],
//!     'application': True,
//! }
//! ```
//!
//! Only data is accepted: mappings, sets, lists, tuples, strings, numbers,
//! `True`, `False` and `None`. Names, calls, operators and any other expression are
//! rejected, so a descriptor can never cause code to run.

use std::fmt;
use thiserror::Error;

/// Nesting limit for containers; keeps hostile input from exhausting the stack.
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    /// An integer outside the `i64` range, kept as its source text.
    BigInt(String),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Map(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::None => "None",
            Literal::Bool(_) => "bool",
            Literal::Int(_) | Literal::BigInt(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
            Literal::Set(_) => "set",
            Literal::Map(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list, tuple or set, in source order.
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Truth value with the usual literal semantics: `None`, `False`, zero and
    /// empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Literal::None => false,
            Literal::Bool(b) => *b,
            Literal::Int(i) => *i != 0,
            Literal::BigInt(_) => true,
            Literal::Float(f) => *f != 0.0,
            Literal::Str(s) => !s.is_empty(),
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => {
                !items.is_empty()
            }
            Literal::Map(entries) => !entries.is_empty(),
        }
    }

    /// Looks up a string key in a mapping. Repeated keys resolve to the last
    /// occurrence.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Map(entries) => entries
                .iter()
                .rev()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    fn is_hashable(&self) -> bool {
        match self {
            Literal::List(_) | Literal::Set(_) | Literal::Map(_) => false,
            Literal::Tuple(items) => items.iter().all(Literal::is_hashable),
            _ => true,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => write!(f, "None"),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::BigInt(text) => write!(f, "{}", text),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Literal::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Literal::Set(items) => {
                write!(f, "{{")?;
                write_items(f, items)?;
                write!(f, "}}")
            }
            Literal::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Literal]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct LiteralError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Parses `source` as exactly one literal, surrounded only by whitespace and
/// comments.
pub fn parse(source: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser::new(source);
    parser.skip_trivia();
    if parser.at_end() {
        return Err(parser.error("expected a literal, found end of input"));
    }
    let value = parser.parse_value(0)?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected content after literal"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        // A leading byte-order mark is not part of the literal
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> LiteralError {
        let mut line = 1;
        let mut column = 1;
        for &c in self.chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        LiteralError {
            message: message.into(),
            line,
            column,
        }
    }

    /// Skips whitespace, `#` comments and backslash line continuations.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.pos += 1;
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 3;
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        if depth > MAX_NESTING {
            return Err(self.error("literal nested too deeply"));
        }

        match self.peek() {
            None => Err(self.error("expected a literal, found end of input")),
            Some('{') => self.parse_map(depth),
            Some('[') => self.parse_list(depth),
            Some('(') => self.parse_parenthesized(depth),
            Some('\'') | Some('"') => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_name(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    /// `{` opens a mapping, or a set when the first item is not followed by `:`.
    fn parse_map(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.expect('{')?;
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Literal::Map(Vec::new()));
        }

        let first = self.parse_hashable(depth)?;
        self.skip_trivia();
        if self.peek() != Some(':') {
            return self.parse_set_rest(first, depth);
        }

        let mut entries = Vec::new();
        let mut key = first;
        loop {
            self.skip_trivia();
            self.expect(':')?;
            self.skip_trivia();
            let value = self.parse_value(depth + 1)?;
            entries.push((key, value));

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Literal::Map(entries));
                }
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '}}', found '{}'", c)));
                }
                None => return Err(self.error("unterminated mapping")),
            }

            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Literal::Map(entries));
            }
            key = self.parse_hashable(depth)?;
        }
    }

    fn parse_set_rest(&mut self, first: Literal, depth: usize) -> Result<Literal, LiteralError> {
        let mut items = vec![first];
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Literal::Set(items));
                }
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '}}', found '{}'", c)));
                }
                None => return Err(self.error("unterminated set")),
            }

            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Literal::Set(items));
            }
            let item = self.parse_hashable(depth)?;
            if !items.contains(&item) {
                items.push(item);
            }
        }
    }

    /// A mapping key or set item.
    fn parse_hashable(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let value = self.parse_value(depth + 1)?;
        if !value.is_hashable() {
            return Err(self.error_at(start, format!("unhashable type {}", value.type_name())));
        }
        Ok(value)
    }

    fn parse_list(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.expect('[')?;
        let items = self.parse_items(']', depth)?;
        Ok(Literal::List(items))
    }

    /// A parenthesized expression is a tuple when it is empty or contains a
    /// comma; otherwise it is just the inner literal.
    fn parse_parenthesized(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.expect('(')?;
        self.skip_trivia();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Literal::Tuple(Vec::new()));
        }

        let first = self.parse_value(depth + 1)?;
        self.skip_trivia();
        match self.peek() {
            Some(')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(',') => {
                self.pos += 1;
                let mut items = vec![first];
                items.extend(self.parse_items(')', depth)?);
                Ok(Literal::Tuple(items))
            }
            Some(c) => Err(self.error(format!("expected ',' or ')', found '{}'", c))),
            None => Err(self.error("unterminated tuple")),
        }
    }

    /// Comma-separated items up to `close`, trailing comma allowed.
    fn parse_items(&mut self, close: char, depth: usize) -> Result<Vec<Literal>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }

            items.push(self.parse_value(depth + 1)?);

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)));
                }
                None => return Err(self.error(format!("expected '{}', found end of input", close))),
            }
        }
    }

    fn parse_name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(), Some('\'') | Some('"')) && is_string_prefix(&name) {
            self.pos = start;
            return self.parse_strings();
        }

        match name.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => Err(self.error_at(start, format!("names are not allowed in literals: '{}'", name))),
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<Literal, LiteralError> {
        let mut value = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_trivia();
            if self.starts_string() {
                value.push_str(&self.parse_string()?);
            } else {
                self.pos = save;
                return Ok(Literal::Str(value));
            }
        }
    }

    fn starts_string(&self) -> bool {
        let mut offset = 0;
        while let Some(c) = self.peek_at(offset) {
            if c == '\'' || c == '"' {
                let prefix: String = self.chars[self.pos..self.pos + offset].iter().collect();
                return offset == 0 || is_string_prefix(&prefix);
            }
            if !c.is_ascii_alphabetic() || offset >= 2 {
                return false;
            }
            offset += 1;
        }
        false
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let start = self.pos;
        let mut raw = false;
        while let Some(c) = self.peek() {
            if c == '\'' || c == '"' {
                break;
            }
            if c == 'r' || c == 'R' {
                raw = true;
            }
            self.pos += 1;
        }

        let quote = self
            .bump()
            .ok_or_else(|| self.error_at(start, "expected string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(self.error_at(start, "unterminated string")),
            };

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            match c {
                '\n' if !triple => {
                    return Err(self.error_at(start, "unterminated string"));
                }
                '\\' if raw => {
                    // Raw strings keep the backslash, but it still protects the quote
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.parse_escape(&mut out)?,
                _ => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let escape_pos = self.pos - 1;
        let c = match self.bump() {
            Some(c) => c,
            None => return Err(self.error_at(escape_pos, "unterminated string")),
        };

        match c {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.parse_hex_escape(2, escape_pos)?),
            'u' => out.push(self.parse_hex_escape(4, escape_pos)?),
            'U' => out.push(self.parse_hex_escape(8, escape_pos)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn parse_hex_escape(&mut self, digits: usize, escape_pos: usize) -> Result<char, LiteralError> {
        let mut code: u32 = 0;
        for _ in 0..digits {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error_at(escape_pos, "truncated hex escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error_at(escape_pos, "invalid unicode escape"))
    }

    fn parse_number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let mut text = String::new();

        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            if sign == '-' {
                text.push('-');
            }
            self.skip_trivia();
        }

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                return self.parse_prefixed_integer(start, text, radix);
            }
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    if let Some(sign @ ('-' | '+')) = self.peek_at(1) {
                        self.pos += 1;
                        text.push(sign);
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        if !text.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.error_at(start, "expected a number"));
        }

        if is_float {
            text.parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error_at(start, format!("invalid number '{}'", text)))
        } else {
            Ok(text
                .parse::<i64>()
                .map(Literal::Int)
                .unwrap_or(Literal::BigInt(text)))
        }
    }

    /// `0x`, `0o` and `0b` integers; `sign` is the already consumed `-` or empty.
    fn parse_prefixed_integer(
        &mut self,
        start: usize,
        sign: String,
        radix: u32,
    ) -> Result<Literal, LiteralError> {
        let prefix: String = self.chars[self.pos..self.pos + 2].iter().collect();
        self.pos += 2;

        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.pos += 1;
            } else if c.is_ascii_alphanumeric() {
                if !c.is_digit(radix) {
                    return Err(self.error(format!("invalid digit '{}' in {} literal", c, prefix)));
                }
                digits.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error_at(start, format!("missing digits after '{}'", prefix)));
        }

        let signed = format!("{}{}", sign, digits);
        Ok(i64::from_str_radix(&signed, radix)
            .map(Literal::Int)
            .unwrap_or_else(|_| Literal::BigInt(format!("{}{}{}", sign, prefix, digits))))
    }
}

fn is_string_prefix(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "br" | "rb"
    )
}
