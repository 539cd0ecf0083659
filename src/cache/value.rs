//! Stored value type and byte conversions

use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::string::FromUtf8Error;

use thiserror::Error;

/// A value accepted by `Cache::store`
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Float(f64),
}

impl StoredValue {
    /// Serializes the value into the bytes written to the store
    ///
    /// Numbers are written as ASCII decimal text so the store can operate on
    /// them (INCR) and they read back through `get_int`/`get_float`.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            StoredValue::Text(s) => s.as_bytes().to_vec(),
            StoredValue::Bytes(b) => b.clone(),
            StoredValue::Integer(i) => i.to_string().into_bytes(),
            StoredValue::Float(f) => format_float(*f).into_bytes(),
        }
    }
}

fn format_float(f: f64) -> String {
    let s = f.to_string();
    if f.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::Text(s.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::Text(s)
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(b: Vec<u8>) -> Self {
        StoredValue::Bytes(b)
    }
}

impl From<&[u8]> for StoredValue {
    fn from(b: &[u8]) -> Self {
        StoredValue::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for StoredValue {
    fn from(b: &[u8; N]) -> Self {
        StoredValue::Bytes(b.to_vec())
    }
}

impl From<i64> for StoredValue {
    fn from(i: i64) -> Self {
        StoredValue::Integer(i)
    }
}

impl From<i32> for StoredValue {
    fn from(i: i32) -> Self {
        StoredValue::Integer(i64::from(i))
    }
}

impl From<f64> for StoredValue {
    fn from(f: f64) -> Self {
        StoredValue::Float(f)
    }
}

/// Renders the value as it appears in call history: quoted text, `b"..."` bytes, plain numbers
impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Text(s) => write!(f, "{s:?}"),
            StoredValue::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
            StoredValue::Integer(i) => write!(f, "{i}"),
            StoredValue::Float(x) => write!(f, "{}", format_float(*x)),
        }
    }
}

/// Errors raised while converting raw stored bytes into a typed value
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Stored bytes are not valid UTF-8
    #[error("Stored value is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// Stored text is not an integer
    #[error("Stored value is not an integer: {0}")]
    ParseInt(#[from] ParseIntError),

    /// Stored text is not a floating-point number
    #[error("Stored value is not a number: {0}")]
    ParseFloat(#[from] ParseFloatError),
}

/// Decodes raw bytes as UTF-8 text
pub fn to_text(bytes: Vec<u8>) -> Result<String, ConversionError> {
    Ok(String::from_utf8(bytes)?)
}

/// Decodes raw bytes as UTF-8 and parses a signed integer
pub fn to_int(bytes: Vec<u8>) -> Result<i64, ConversionError> {
    Ok(to_text(bytes)?.parse()?)
}

/// Decodes raw bytes as UTF-8 and parses a floating-point number
pub fn to_float(bytes: Vec<u8>) -> Result<f64, ConversionError> {
    Ok(to_text(bytes)?.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_serializes_as_utf8() {
        assert_eq!(StoredValue::from("héllo").to_bytes(), "héllo".as_bytes());
    }

    #[test]
    fn test_bytes_serialize_unchanged() {
        let raw = vec![0u8, 159, 146, 150];
        assert_eq!(StoredValue::from(raw.clone()).to_bytes(), raw);
    }

    #[test]
    fn test_integer_serializes_as_decimal() {
        assert_eq!(StoredValue::from(42).to_bytes(), b"42");
        assert_eq!(StoredValue::from(-7i64).to_bytes(), b"-7");
    }

    #[test]
    fn test_float_keeps_fraction_marker() {
        assert_eq!(StoredValue::from(3.0).to_bytes(), b"3.0");
        assert_eq!(StoredValue::from(2.5).to_bytes(), b"2.5");
        assert_eq!(StoredValue::from(-0.125).to_bytes(), b"-0.125");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(StoredValue::from(f64::INFINITY).to_bytes(), b"inf");
        assert_eq!(StoredValue::from(f64::NAN).to_bytes(), b"NaN");
    }

    #[test]
    fn test_display_renders_history_form() {
        assert_eq!(StoredValue::from("foo").to_string(), "\"foo\"");
        assert_eq!(StoredValue::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(StoredValue::from(b"hi\n").to_string(), "b\"hi\\n\"");
        assert_eq!(StoredValue::from(42).to_string(), "42");
        assert_eq!(StoredValue::from(1.0).to_string(), "1.0");
    }

    #[test]
    fn test_to_int_parses_decimal() {
        assert_eq!(to_int(b"42".to_vec()).unwrap(), 42);
        assert_eq!(to_int(b"-3".to_vec()).unwrap(), -3);
    }

    #[test]
    fn test_to_int_rejects_text() {
        let err = to_int(b"forty-two".to_vec()).unwrap_err();
        assert!(matches!(err, ConversionError::ParseInt(_)));
    }

    #[test]
    fn test_to_int_rejects_float_text() {
        assert!(to_int(b"3.0".to_vec()).is_err());
    }

    #[test]
    fn test_to_text_rejects_invalid_utf8() {
        let err = to_text(vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConversionError::Utf8(_)));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_to_float_parses_serialized_float() {
        let bytes = StoredValue::from(3.25).to_bytes();
        assert!((to_float(bytes).unwrap() - 3.25).abs() < f64::EPSILON);
    }
}
