//! `application/x-www-form-urlencoded` query-string decoding.
//!
//! Values land in fixed-capacity strings.  A value that does not fit is
//! rejected outright rather than truncated, so a long credential can never
//! be shortened into a match.

use heapless::String;

use crate::app::commands::RequestError;

/// Longest accepted parameter value, in bytes after decoding.
pub const MAX_PARAM_LEN: usize = 64;

pub type Param = String<MAX_PARAM_LEN>;

/// Split a request target into `(path, query)`.
pub fn split_uri(uri: &str) -> (&str, &str) {
    match uri.split_once('?') {
        Some((path, query)) => (path, query),
        None => (uri, ""),
    }
}

/// Look up `key` in `query` and return its decoded value.
///
/// The first occurrence wins.  A key with no `=` decodes to an empty value.
pub fn query_param(query: &str, key: &str) -> Result<Option<Param>, RequestError> {
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name: Param = decode(raw_key)?;
        if name.as_str() == key {
            return decode(raw_value).map(Some);
        }
    }
    Ok(None)
}

fn decode(raw: &str) -> Result<Param, RequestError> {
    let mut bytes: heapless::Vec<u8, MAX_PARAM_LEN> = heapless::Vec::new();
    let mut input = raw.bytes();
    while let Some(b) = input.next() {
        let decoded = match b {
            b'+' => b' ',
            b'%' => {
                let hi = input.next().and_then(hex_value);
                let lo = input.next().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => (hi << 4) | lo,
                    _ => return Err(RequestError::MalformedQuery),
                }
            }
            other => other,
        };
        bytes
            .push(decoded)
            .map_err(|_| RequestError::MalformedQuery)?;
    }
    String::from_utf8(bytes).map_err(|_| RequestError::MalformedQuery)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
