//! Attribute values and records.
//!
//! An [`AttributeValue`] is a tagged union over strings, decimal numbers,
//! binary blobs, and nested sequences/mappings. Values carry a canonical
//! byte encoding used both for encrypting typed values (the type tag
//! survives the round trip) and for the deterministic signing form.
//!
//! Encoding:
//! ```text
//! [tag:1][len:4 BE][payload]                    Str / Num / Bin
//! [tag:1][count:4 BE][element]...               List
//! [tag:1][count:4 BE]([key_len:4 BE][key][element])...   Map
//! ```
//! Map entries are emitted in key order, so the encoding is independent
//! of how the map was built.

use crate::error::Error;
use std::collections::BTreeMap;
use std::fmt;

/// A record is an order-irrelevant mapping from attribute name to value.
/// Attribute names are unique by construction.
pub type Record = BTreeMap<String, AttributeValue>;

/// Maximum nesting depth accepted when parsing encoded values.
const MAX_DEPTH: usize = 32;

const TAG_STR: u8 = 0x01;
const TAG_NUM: u8 = 0x02;
const TAG_BIN: u8 = 0x03;
const TAG_LIST: u8 = 0x04;
const TAG_MAP: u8 = 0x05;

/// A typed attribute value. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// UTF-8 string
    Str(String),
    /// Number stored as decimal text, so no precision is lost in transit
    Num(String),
    /// Opaque binary
    Bin(Vec<u8>),
    /// Sequence of values
    List(Vec<AttributeValue>),
    /// Mapping from string keys to values
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Creates a string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Creates a number value from anything with a decimal text form.
    #[must_use]
    pub fn number(value: impl fmt::Display) -> Self {
        Self::Num(value.to_string())
    }

    /// Creates a binary value.
    #[must_use]
    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self::Bin(value.into())
    }

    /// Returns the string content, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the binary content, if this is a `Bin`.
    #[must_use]
    pub fn as_bin(&self) -> Option<&[u8]> {
        match self {
            Self::Bin(b) => Some(b),
            _ => None,
        }
    }

    /// Serializes the value to its canonical byte encoding.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if any payload exceeds `u32::MAX`
    /// bytes or a collection exceeds `u32::MAX` entries.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Parses a value from its canonical byte encoding.
    ///
    /// The entire input must be consumed; trailing bytes are rejected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the input is truncated,
    /// malformed, nested too deeply, or has trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut pos = 0;
        let value = Self::decode_from(data, &mut pos, 0)?;
        if pos != data.len() {
            return Err(Error::Serialization(format!(
                "trailing bytes after encoded value: {} of {}",
                data.len() - pos,
                data.len()
            )));
        }
        Ok(value)
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), Error> {
        match self {
            Self::Str(s) => {
                buf.push(TAG_STR);
                encode_len_prefixed(buf, s.as_bytes())?;
            }
            Self::Num(n) => {
                buf.push(TAG_NUM);
                encode_len_prefixed(buf, n.as_bytes())?;
            }
            Self::Bin(b) => {
                buf.push(TAG_BIN);
                encode_len_prefixed(buf, b)?;
            }
            Self::List(items) => {
                buf.push(TAG_LIST);
                buf.extend_from_slice(&count_u32(items.len())?.to_be_bytes());
                for item in items {
                    item.encode_into(buf)?;
                }
            }
            Self::Map(entries) => {
                buf.push(TAG_MAP);
                buf.extend_from_slice(&count_u32(entries.len())?.to_be_bytes());
                // BTreeMap iterates in key order, keeping the encoding canonical
                for (key, value) in entries {
                    encode_len_prefixed(buf, key.as_bytes())?;
                    value.encode_into(buf)?;
                }
            }
        }
        Ok(())
    }

    fn decode_from(data: &[u8], pos: &mut usize, depth: usize) -> Result<Self, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::Serialization(format!(
                "value nested deeper than {MAX_DEPTH} levels"
            )));
        }

        let tag = *data
            .get(*pos)
            .ok_or_else(|| Error::Serialization("missing value tag".to_string()))?;
        *pos += 1;

        match tag {
            TAG_STR => {
                let bytes = decode_len_prefixed(data, pos)?;
                let s = String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::Serialization(format!("invalid UTF-8 string: {e}")))?;
                Ok(Self::Str(s))
            }
            TAG_NUM => {
                let bytes = decode_len_prefixed(data, pos)?;
                let n = String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::Serialization(format!("invalid UTF-8 number: {e}")))?;
                Ok(Self::Num(n))
            }
            TAG_BIN => {
                let bytes = decode_len_prefixed(data, pos)?;
                Ok(Self::Bin(bytes.to_vec()))
            }
            TAG_LIST => {
                let count = decode_count(data, pos)?;
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(Self::decode_from(data, pos, depth + 1)?);
                }
                Ok(Self::List(items))
            }
            TAG_MAP => {
                let count = decode_count(data, pos)?;
                let mut entries = BTreeMap::new();
                for _ in 0..count {
                    let key_bytes = decode_len_prefixed(data, pos)?;
                    let key = String::from_utf8(key_bytes.to_vec())
                        .map_err(|e| Error::Serialization(format!("invalid UTF-8 key: {e}")))?;
                    let value = Self::decode_from(data, pos, depth + 1)?;
                    if entries.insert(key.clone(), value).is_some() {
                        return Err(Error::Serialization(format!("duplicate map key: {key}")));
                    }
                }
                Ok(Self::Map(entries))
            }
            other => Err(Error::Serialization(format!("unknown value tag: {other:#04x}"))),
        }
    }
}

fn count_u32(len: usize) -> Result<u32, Error> {
    u32::try_from(len)
        .map_err(|_| Error::Serialization(format!("length exceeds u32 range: {len}")))
}

fn encode_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(&count_u32(bytes.len())?.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn decode_count(data: &[u8], pos: &mut usize) -> Result<usize, Error> {
    let end = pos
        .checked_add(4)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::Serialization("truncated length prefix".to_string()))?;
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[*pos..end]);
    *pos = end;
    Ok(u32::from_be_bytes(len_bytes) as usize)
}

fn decode_len_prefixed<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], Error> {
    let len = decode_count(data, pos)?;
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::Serialization("truncated payload".to_string()))?;
    let bytes = &data[*pos..end];
    *pos = end;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: &AttributeValue) {
        let bytes = value.to_bytes().expect("encode failed");
        let parsed = AttributeValue::from_bytes(&bytes).expect("decode failed");
        assert_eq!(&parsed, value);
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(&AttributeValue::string("is this"));
        round_trip(&AttributeValue::number(55));
        round_trip(&AttributeValue::number("-12.5"));
        round_trip(&AttributeValue::binary(vec![0x00, 0x01, 0x02]));
        round_trip(&AttributeValue::string(""));
        round_trip(&AttributeValue::binary(Vec::new()));
    }

    #[test]
    fn test_nested_round_trip() {
        let mut inner = BTreeMap::new();
        inner.insert("a".to_string(), AttributeValue::number(1));
        inner.insert("b".to_string(), AttributeValue::string("two"));

        let value = AttributeValue::List(vec![
            AttributeValue::Map(inner),
            AttributeValue::binary(vec![9, 9, 9]),
            AttributeValue::List(vec![AttributeValue::string("deep")]),
        ]);
        round_trip(&value);
    }

    #[test]
    fn test_map_encoding_is_order_independent() {
        let mut forward = BTreeMap::new();
        forward.insert("alpha".to_string(), AttributeValue::number(1));
        forward.insert("beta".to_string(), AttributeValue::number(2));

        let mut reverse = BTreeMap::new();
        reverse.insert("beta".to_string(), AttributeValue::number(2));
        reverse.insert("alpha".to_string(), AttributeValue::number(1));

        let a = AttributeValue::Map(forward).to_bytes().unwrap();
        let b = AttributeValue::Map(reverse).to_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_str_and_bin_encode_differently() {
        let s = AttributeValue::string("abc").to_bytes().unwrap();
        let b = AttributeValue::binary(b"abc".to_vec()).to_bytes().unwrap();
        assert_ne!(s, b);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let result = AttributeValue::from_bytes(&[0x7f, 0, 0, 0, 0]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = AttributeValue::string("hello").to_bytes().unwrap();
        bytes.truncate(bytes.len() - 2);
        let result = AttributeValue::from_bytes(&bytes);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = AttributeValue::number(42).to_bytes().unwrap();
        bytes.push(0x00);
        let result = AttributeValue::from_bytes(&bytes);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = AttributeValue::from_bytes(&[]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut bytes = Vec::new();
        for _ in 0..(MAX_DEPTH + 2) {
            bytes.push(TAG_LIST);
            bytes.extend_from_slice(&1u32.to_be_bytes());
        }
        bytes.push(TAG_NUM);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(b'1');

        let result = AttributeValue::from_bytes(&bytes);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
