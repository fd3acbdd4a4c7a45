//! Header collection and the line-at-a-time header parser.
//!
//! Request headers are stored under lowercase names. Response headers keep
//! whatever case the caller used, and every lookup is case-insensitive.

use std::collections::HashMap;
use thiserror::Error;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Errors produced while parsing a single header line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("invalid header: missing colon")]
    MissingColon,

    #[error("invalid header: space before colon")]
    WhitespaceBeforeColon,

    #[error("invalid header: empty key")]
    EmptyName,

    #[error("invalid header: invalid character in key")]
    InvalidNameCharacter,
}

/// A case-insensitive mapping from header name to a single value.
///
/// Values are kept as the raw bytes received. Repeated names are folded into
/// one entry, values joined by `,` in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, Vec<u8>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a header up by name, ignoring case.
    ///
    /// Returns `None` if the header is absent or its value is not UTF-8;
    /// use [`Headers::get_bytes`] for the raw value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_bytes(name)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Raw value of a header, ignoring case in the name.
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.find_key(name)
            .and_then(|key| self.entries.get(key))
            .map(|v| v.as_slice())
    }

    /// Returns true if a header with this name (any case) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.find_key(name).is_some()
    }

    /// Sets a header, replacing any existing value stored under the same name
    /// in any case. The name is stored exactly as given.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        self.remove(&name);
        self.entries.insert(name, value.into());
    }

    /// Adds a header value. If the name is already present the value is
    /// appended to the existing one, separated by a comma.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        let value = value.into();

        match self.find_key(&name).map(str::to_owned) {
            Some(existing) => {
                if let Some(current) = self.entries.get_mut(&existing) {
                    current.push(b',');
                    current.extend_from_slice(&value);
                }
            }
            None => {
                self.entries.insert(name, value);
            }
        }
    }

    /// Removes a header by name, ignoring case.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let key = self.find_key(name)?.to_owned();
        self.entries.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns `(consumed, done)`:
    /// - `(0, false)` when no complete line is buffered yet; nothing is recorded.
    /// - `(2, true)` when the next line is empty, ending the header block.
    /// - `(line_len + 2, false)` after storing one `Name: Value` pair.
    pub fn parse_line(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(idx) = find_crlf(data) else {
            return Ok((0, false));
        };

        if idx == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..idx];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(HeaderError::MissingColon)?;

        if colon > 0 && matches!(line[colon - 1], b' ' | b'\t') {
            return Err(HeaderError::WhitespaceBeforeColon);
        }

        let name = line[..colon].trim_ascii();
        let value = line[colon + 1..].trim_ascii();

        if name.is_empty() {
            return Err(HeaderError::EmptyName);
        }

        if !name.iter().copied().all(is_name_byte) {
            return Err(HeaderError::InvalidNameCharacter);
        }

        // Names are ASCII from here on.
        let name: String = name.iter().map(|&b| b.to_ascii_lowercase() as char).collect();
        self.insert(name, value);

        Ok((idx + CRLF.len(), false))
    }

    fn find_key(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.entries.get_key_value(name) {
            return Some(key.as_str());
        }

        self.entries
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(|k| k.as_str())
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

/// Position of the first CRLF in `data`, if any.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == CRLF)
}
