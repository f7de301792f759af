//! # Literal Expressions
//!
//! Domains and method arguments are typed on the command line as literals in
//! the familiar bracket syntax: `[('email', '!=', None)]`, `{'limit': 5}`.
//!
//! The parser here accepts **literals only**:
//!
//! - lists `[a, b]` and tuples `(a, b)`, `(a,)`, `()` (both become arrays)
//! - dicts `{'key': value}` with string keys
//! - strings in single or double quotes, with the usual backslash escapes
//!   (`\n`, `\t`, octal `\012`, hex `\x41`, `\u00e9`, ...); unknown
//!   escapes such as `\d` are kept verbatim
//! - integers and floats (`-3`, `1_000`, `2.5`, `1e-3`)
//! - `True`/`False`/`None` and their lowercase JSON spellings
//!
//! Names, calls, attribute access and operators are rejected with a
//! [`LiteralError`] pointing at the offending offset. Nothing is ever evaluated.
//!
//! The module also prints values back in the same syntax ([`to_literal`],
//! [`pretty`]), so a result can be pasted into the next command.

use crate::value::Value;
use std::collections::BTreeMap;
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (at offset {offset})")]
pub struct LiteralError {
    pub offset: usize,
    pub reason: String,
}

impl LiteralError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

/// Parse a complete literal expression.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    parse_outer(input).map(|(value, _)| value)
}

/// Positional arguments for a remote method. A top-level list is the
/// argument list itself; any other value, tuples included, is one argument.
pub fn parse_arguments(input: &str) -> Result<Vec<Value>, LiteralError> {
    match parse_outer(input)? {
        (Value::Array(items), true) => Ok(items),
        (other, _) => Ok(vec![other]),
    }
}

/// The value, and whether its outermost form was a `[...]` list.
fn parse_outer(input: &str) -> Result<(Value, bool), LiteralError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
        list: false,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(LiteralError::new(0, "empty expression"));
    }
    let value = parser.value()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok((value, parser.list))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    /// Set when the value just parsed was written as `[...]`.
    list: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, reason: impl Into<String>) -> LiteralError {
        LiteralError::new(self.pos, reason)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        self.list = false;
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => {
                let items = self.nested(|p| p.sequence(']'))?;
                self.list = true;
                Ok(Value::Array(items))
            }
            Some('(') => self.nested(Parser::paren),
            Some('{') => self.nested(Parser::dict),
            Some(q @ ('\'' | '"')) => self.string(q).map(Value::String),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn nested<T, F>(&mut self, f: F) -> Result<T, LiteralError>
    where
        F: FnOnce(&mut Self) -> Result<T, LiteralError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Comma-separated values up to `close`; the opening bracket is consumed here.
    fn sequence(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)))
                }
                None => return Err(self.error(format!("missing closing '{}'", close))),
            }
        }
    }

    /// `()` and `(a, ...)` are tuples; `(a)` is just a parenthesized value.
    fn paren(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(first)
            }
            Some(',') => {
                // Re-enter the sequence loop with the comma as the "opening" token.
                let mut rest = self.sequence(')')?;
                rest.insert(0, first);
                self.list = false;
                Ok(Value::Array(rest))
            }
            Some(c) => Err(self.error(format!("expected ',' or ')', found '{}'", c))),
            None => Err(self.error("missing closing ')'")),
        }
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut members = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Struct(members));
            }
            let key_at = self.pos;
            let key = match self.value()? {
                Value::String(s) => s,
                other => {
                    return Err(LiteralError::new(
                        key_at,
                        format!("dict keys must be strings, found {}", other.kind()),
                    ))
                }
            };
            self.skip_ws();
            if self.bump() != Some(':') {
                return Err(LiteralError::new(self.pos.saturating_sub(1), "expected ':'"));
            }
            let value = self.value()?;
            members.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Struct(members));
                }
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("missing closing '}'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(LiteralError::new(start, "unterminated string"));
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let at = self.pos.saturating_sub(1);
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('\n') => {}
            Some(first @ '0'..='7') => out.push(self.octal_escape(first)),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => out.push(self.hex_escape(2, at)?),
            Some('u') => out.push(self.hex_escape(4, at)?),
            Some('U') => out.push(self.hex_escape(8, at)?),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(LiteralError::new(at, "unterminated string")),
        }
        Ok(())
    }

    /// Up to three octal digits, the first already consumed.
    fn octal_escape(&mut self, first: char) -> char {
        let mut code = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(digit) => {
                    code = code * 8 + digit;
                    self.bump();
                }
                None => break,
            }
        }
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn hex_escape(&mut self, digits: usize, at: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| LiteralError::new(at, "truncated escape sequence"))?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| LiteralError::new(at, format!("invalid escape '\\{}'", hex)))?;
        let c = char::from_u32(code)
            .ok_or_else(|| LiteralError::new(at, format!("invalid code point {:#x}", code)))?;
        self.pos = end;
        Ok(c)
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        let mut is_float = false;

        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.bump();
            self.skip_ws();
            if sign == '-' {
                text.push('-');
            }
        }

        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' if !is_float => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push('e');
                    self.bump();
                    if let Some(sign @ ('-' | '+')) = self.peek() {
                        text.push(sign);
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        if !text.chars().any(|c| c.is_ascii_digit()) {
            return Err(LiteralError::new(start, "expected a number"));
        }
        if let Some(c) = self.peek() {
            if c.is_alphanumeric() {
                return Err(self.error(format!("unexpected character '{}' in number", c)));
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(Value::Double)
                .map_err(|_| LiteralError::new(start, format!("invalid number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| LiteralError::new(start, format!("integer out of range '{}'", text)))
        }
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        match word {
            "True" | "true" => return Ok(Value::Bool(true)),
            "False" | "false" => return Ok(Value::Bool(false)),
            "None" | "null" => return Ok(Value::Nil),
            _ => {}
        }
        self.skip_ws();
        let reason = match self.peek() {
            Some('(') => format!("function calls are not allowed: '{}(...)'", word),
            Some('.') => format!("attribute access is not allowed: '{}.'", word),
            _ => format!("names are not allowed: '{}'", word),
        };
        Err(LiteralError::new(start, reason))
    }
}

/// Render a value on one line in literal syntax.
pub fn to_literal(value: &Value) -> String {
    let mut out = String::new();
    write_compact(&mut out, value);
    out
}

fn write_compact(out: &mut String, value: &Value) {
    match value {
        Value::Nil => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Double(d) => out.push_str(&format_double(*d)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_compact(out, item);
            }
            out.push(']');
        }
        Value::Struct(members) => {
            out.push('{');
            for (i, (key, item)) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&quote(key));
                out.push_str(": ");
                write_compact(out, item);
            }
            out.push('}');
        }
    }
}

/// Render a value wrapped to `width` columns, one element per line when a
/// container does not fit.
pub fn pretty(value: &Value, width: usize) -> String {
    let mut out = String::new();
    write_pretty(&mut out, value, 0, width, 0);
    out
}

fn write_pretty(out: &mut String, value: &Value, indent: usize, width: usize, trailing: usize) {
    let compact = to_literal(value);
    if indent + compact.chars().count() + trailing <= width {
        out.push_str(&compact);
        return;
    }
    match value {
        Value::Array(items) if !items.is_empty() => {
            out.push('[');
            let last = items.len() - 1;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(indent + 1));
                }
                let tail = if i == last { trailing + 1 } else { 1 };
                write_pretty(out, item, indent + 1, width, tail);
            }
            out.push(']');
        }
        Value::Struct(members) if !members.is_empty() => {
            out.push('{');
            let last = members.len() - 1;
            for (i, (key, item)) in members.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(indent + 1));
                }
                let key = format!("{}: ", quote(key));
                out.push_str(&key);
                let tail = if i == last { trailing + 1 } else { 1 };
                write_pretty(out, item, indent + 1 + key.chars().count(), width, tail);
            }
            out.push('}');
        }
        _ => out.push_str(&compact),
    }
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "nan".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        // Debug keeps a fractional part ("1.0") so the value reads back as a float.
        format!("{:?}", d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(field: &str, op: &str, value: Value) -> Value {
        Value::Array(vec![field.into(), op.into(), value])
    }

    #[test]
    fn parses_a_domain_of_tuples() {
        let parsed = parse("[('email', '!=', None), ('id', '>', 10)]").unwrap();
        assert_eq!(
            parsed,
            Value::Array(vec![
                clause("email", "!=", Value::Nil),
                clause("id", ">", Value::Int(10)),
            ])
        );
    }

    #[test]
    fn parses_tuple_forms() {
        assert_eq!(parse("()").unwrap(), Value::Array(vec![]));
        assert_eq!(parse("(1,)").unwrap(), Value::Array(vec![Value::Int(1)]));
        assert_eq!(parse("(1)").unwrap(), Value::Int(1));
        assert_eq!(
            parse("(1, 'a', )").unwrap(),
            Value::Array(vec![Value::Int(1), "a".into()])
        );
    }

    #[test]
    fn parses_dicts_and_keywords() {
        let parsed = parse("{'active': True, \"limit\": 5, 'x': null, 'y': false}").unwrap();
        let members = parsed.as_struct().unwrap();
        assert_eq!(members["active"], Value::Bool(true));
        assert_eq!(members["limit"], Value::Int(5));
        assert_eq!(members["x"], Value::Nil);
        assert_eq!(members["y"], Value::Bool(false));
    }

    #[test]
    fn parses_numbers() {
        assert_eq!(parse("-3").unwrap(), Value::Int(-3));
        assert_eq!(parse("1_000").unwrap(), Value::Int(1000));
        assert_eq!(parse("2.5").unwrap(), Value::Double(2.5));
        assert_eq!(parse("1e3").unwrap(), Value::Double(1000.0));
        assert_eq!(parse("-.5").unwrap(), Value::Double(-0.5));
        assert!(parse("99999999999999999999").is_err());
    }

    #[test]
    fn parses_string_escapes() {
        assert_eq!(parse(r#"'it\'s'"#).unwrap(), Value::from("it's"));
        assert_eq!(parse(r#""a\tb\n""#).unwrap(), Value::from("a\tb\n"));
        assert_eq!(parse(r#"'\x41é'"#).unwrap(), Value::from("Aé"));
        assert_eq!(parse(r#"'%\d'"#).unwrap(), Value::from("%\\d"));
    }

    #[test]
    fn parses_octal_and_control_escapes() {
        assert_eq!(parse(r#"'\012'"#).unwrap(), Value::from("\n"));
        assert_eq!(parse(r#"'\0'"#).unwrap(), Value::from("\0"));
        assert_eq!(parse(r#"'\1019'"#).unwrap(), Value::from("A9"));
        assert_eq!(parse(r#"'\a\b\f\v'"#).unwrap(), Value::from("\u{07}\u{08}\u{0c}\u{0b}"));
        assert_eq!(parse("'line\\\ncontinued'").unwrap(), Value::from("linecontinued"));
    }

    #[test]
    fn argument_lists_keep_tuples_whole() {
        assert_eq!(parse_arguments("['ada', 5]").unwrap(), vec![Value::from("ada"), Value::Int(5)]);
        assert_eq!(parse_arguments("(1, 2)").unwrap(), vec![Value::from(vec![1i64, 2])]);
        assert_eq!(parse_arguments("([1], (2, 3))").unwrap(), vec![Value::from(vec![
            Value::from(vec![1i64]),
            Value::from(vec![2i64, 3]),
        ])]);
        assert_eq!(parse_arguments("7").unwrap(), vec![Value::Int(7)]);
        assert_eq!(parse_arguments("[]").unwrap(), Vec::<Value>::new());
        assert_eq!(parse_arguments("()").unwrap(), vec![Value::Array(vec![])]);
    }

    #[test]
    fn rejects_function_calls() {
        let err = parse("__import__('os').system('ls')").unwrap_err();
        assert!(err.reason.contains("function calls are not allowed"));
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn rejects_attribute_access_and_names() {
        let err = parse("[os.environ]").unwrap_err();
        assert!(err.reason.contains("attribute access"));
        assert_eq!(err.offset, 1);

        let err = parse("[('id', '=', uid)]").unwrap_err();
        assert!(err.reason.contains("names are not allowed"));
    }

    #[test]
    fn rejects_operators_and_trailing_input() {
        assert!(parse("1 + 2").is_err());
        assert!(parse("[1] [2]").is_err());
        assert!(parse("").is_err());
        assert!(parse("[x for x in y]").is_err());
    }

    #[test]
    fn rejects_malformed_containers() {
        assert!(parse("[1, 2").is_err());
        assert!(parse("{'a' 1}").is_err());
        assert!(parse("{1: 'a'}").is_err());
        assert!(parse("'open").is_err());
    }

    #[test]
    fn limits_nesting_depth() {
        let deep = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let err = parse(&deep).unwrap_err();
        assert!(err.reason.contains("nesting too deep"));
    }

    #[test]
    fn prints_compact_literals_that_parse_back() {
        let value = parse("[{'name': \"O'Brien\", 'ok': True, 'n': None, 'r': 1.0}, -2]").unwrap();
        let printed = to_literal(&value);
        assert_eq!(
            printed,
            "[{'n': None, 'name': \"O'Brien\", 'ok': True, 'r': 1.0}, -2]"
        );
        assert_eq!(parse(&printed).unwrap(), value);
    }

    #[test]
    fn pretty_wraps_long_containers() {
        let value = parse("[(1, 'Administrator'), (2, 'Public user')]").unwrap();
        assert_eq!(pretty(&value, 80), "[[1, 'Administrator'], [2, 'Public user']]");
        assert_eq!(
            pretty(&value, 24),
            "[[1, 'Administrator'],\n [2, 'Public user']]"
        );
    }
}
