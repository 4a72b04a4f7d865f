//! Multi-value cell decoder.
//!
//! Multi-select columns arrive as a single string of comma separated fields:
//! - Fields may be bare, `'single quoted'` or `"double quoted"`
//! - Quoted fields may contain commas; a backslash escapes the next character,
//!   and `\'` / `\"` unescape to the bare quote inside their own quote kind
//! - Whitespace around a field is ignored
//! - A trailing comma yields an empty trailing field

use crate::error::{Error, Result};
use crate::protocol::is_blank;

/// Decode a multi-value cell string into its fields.
///
/// Whitespace-only input decodes to an empty list.
pub fn decode_multi_value(text: &str) -> Result<Vec<String>> {
    if is_blank(text) {
        return Ok(Vec::new());
    }

    let mut parser = Parser {
        text,
        chars: text.chars().peekable(),
    };
    let mut fields = Vec::new();

    loop {
        parser.skip_whitespace();
        let field = match parser.chars.peek().copied() {
            Some(q) if q == '\'' || q == '"' => parser.quoted(q)?,
            _ => parser.bare()?,
        };
        parser.skip_whitespace();
        fields.push(field);

        match parser.chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return Err(parser.invalid()),
        }
    }

    Ok(fields)
}

struct Parser<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl Parser<'_> {
    fn invalid(&self) -> Error {
        Error::InvalidMultiValue {
            text: self.text.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    /// Read a quoted field, opening quote not yet consumed.
    fn quoted(&mut self, quote: char) -> Result<String> {
        self.chars.next();
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.invalid()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = self.chars.next().ok_or_else(|| self.invalid())?;
                    if escaped != quote {
                        out.push('\\');
                    }
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Read a bare field up to the next comma or end of input.
    fn bare(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                ',' => break,
                '\'' | '"' | '\\' => return Err(self.invalid()),
                _ => {
                    out.push(c);
                    self.chars.next();
                }
            }
        }
        // leading whitespace was skipped by the caller
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        Ok(out)
    }
}
