/// Decoder for the PHP serialized response format (`wt=phps`)
///
/// The stats handler only emits its full payload in this format. Values are
/// decoded into [`serde_json::Value`] so the rest of the crate handles a
/// single tree type. Arrays whose keys are exactly `0..n` in order become
/// JSON arrays; every other array becomes an object with stringified keys.

use serde_json::{Map, Number, Value};
use std::str;

/// Deepest container nesting accepted by [`decode`]
pub const MAX_DEPTH: usize = 128;

/// Decode errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PhpsError {
    #[error("Unexpected end of input at byte {0}")]
    Incomplete(usize),
    #[error("Invalid serialized format at byte {pos}: {message}")]
    InvalidFormat { pos: usize, message: String },
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] str::Utf8Error),
    #[error("Invalid integer at byte {0}")]
    InvalidInteger(usize),
    #[error("Trailing data after value at byte {0}")]
    TrailingData(usize),
}

/// Decode a complete serialized value
pub fn decode(input: &[u8]) -> Result<Value, PhpsError> {
    let mut parser = PhpsParser { input, pos: 0, depth: 0 };
    let value = parser.parse_value()?;

    // Some servers end the body with a newline
    while parser.pos < input.len() && input[parser.pos].is_ascii_whitespace() {
        parser.pos += 1;
    }
    if parser.pos != input.len() {
        return Err(PhpsError::TrailingData(parser.pos));
    }

    Ok(value)
}

struct PhpsParser<'a> {
    input: &'a [u8],
    pos: usize,
    /// Containers currently open
    depth: usize,
}

/// Array key, kept typed until the container kind is known
enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    fn into_string(self) -> String {
        match self {
            Key::Int(i) => i.to_string(),
            Key::Str(s) => s,
        }
    }
}

impl<'a> PhpsParser<'a> {
    fn parse_value(&mut self) -> Result<Value, PhpsError> {
        let tag = self.next_byte()?;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let flag = self.read_int(b';')?;
                match flag {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    _ => Err(self.invalid(format!("boolean flag {}", flag))),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::from(self.read_int(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                self.parse_double()
            }
            b's' => {
                self.expect(b':')?;
                let s = self.read_string()?;
                self.expect(b';')?;
                Ok(Value::String(s))
            }
            b'a' => {
                self.expect(b':')?;
                self.parse_array()
            }
            b'O' => {
                self.expect(b':')?;
                // Class name is dropped; properties decode like an array
                self.read_string()?;
                self.expect(b':')?;
                self.parse_array()
            }
            other => Err(PhpsError::InvalidFormat {
                pos: self.pos - 1,
                message: format!("unknown type tag '{}'", other as char),
            }),
        }
    }

    fn parse_double(&mut self) -> Result<Value, PhpsError> {
        let raw = self.read_until(b';')?;
        let text = str::from_utf8(raw)?;
        let number = match text {
            "INF" | "-INF" | "NAN" => None,
            _ => {
                let parsed: f64 = text
                    .parse()
                    .map_err(|_| self.invalid(format!("double '{}'", text)))?;
                Number::from_f64(parsed)
            }
        };

        // JSON has no representation for non-finite numbers
        Ok(number.map(Value::Number).unwrap_or(Value::Null))
    }

    fn parse_array(&mut self) -> Result<Value, PhpsError> {
        let len = self.read_int(b':')?;
        if len < 0 {
            return Err(self.invalid("negative array length"));
        }
        self.expect(b'{')?;

        if self.depth >= MAX_DEPTH {
            return Err(self.invalid("nesting too deep"));
        }
        self.depth += 1;

        // Every entry takes at least four bytes, so the declared length can't
        // be trusted for allocation beyond what the input could hold
        let remaining = self.input.len() - self.pos;
        let mut entries = Vec::with_capacity((len as usize).min(remaining / 4));
        for _ in 0..len {
            let key = match self.next_byte()? {
                b'i' => {
                    self.expect(b':')?;
                    Key::Int(self.read_int(b';')?)
                }
                b's' => {
                    self.expect(b':')?;
                    let s = self.read_string()?;
                    self.expect(b';')?;
                    Key::Str(s)
                }
                _ => return Err(PhpsError::InvalidFormat {
                    pos: self.pos - 1,
                    message: "array key must be an integer or a string".to_string(),
                }),
            };
            let value = self.parse_value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        self.depth -= 1;

        let sequential = entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| matches!(key, Key::Int(k) if *k == i as i64));

        if sequential {
            Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.into_string(), value);
            }
            Ok(Value::Object(map))
        }
    }

    /// Read `<len>:"<bytes>"`; the length counts bytes, not characters
    fn read_string(&mut self) -> Result<String, PhpsError> {
        let len = self.read_int(b':')?;
        if len < 0 {
            return Err(self.invalid("negative string length"));
        }
        let len = len as usize;

        self.expect(b'"')?;
        let end = self.pos + len;
        if end > self.input.len() {
            return Err(PhpsError::Incomplete(self.input.len()));
        }
        let content = str::from_utf8(&self.input[self.pos..end])?.to_string();
        self.pos = end;
        self.expect(b'"')?;

        Ok(content)
    }

    fn read_int(&mut self, terminator: u8) -> Result<i64, PhpsError> {
        let start = self.pos;
        let raw = self.read_until(terminator)?;
        btoi::btoi(raw).map_err(|_| PhpsError::InvalidInteger(start))
    }

    /// Bytes up to `terminator`, consuming the terminator
    fn read_until(&mut self, terminator: u8) -> Result<&'a [u8], PhpsError> {
        let input = self.input;
        let rest = &input[self.pos..];
        let offset = rest
            .iter()
            .position(|&b| b == terminator)
            .ok_or(PhpsError::Incomplete(self.input.len()))?;

        let raw = &rest[..offset];
        self.pos += offset + 1;
        Ok(raw)
    }

    fn next_byte(&mut self) -> Result<u8, PhpsError> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or(PhpsError::Incomplete(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), PhpsError> {
        let pos = self.pos;
        let byte = self.next_byte()?;
        if byte != expected {
            return Err(PhpsError::InvalidFormat {
                pos,
                message: format!("expected '{}', found '{}'", expected as char, byte as char),
            });
        }
        Ok(())
    }

    fn invalid<S: Into<String>>(&self, message: S) -> PhpsError {
        PhpsError::InvalidFormat {
            pos: self.pos,
            message: message.into(),
        }
    }
}
