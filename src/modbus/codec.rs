//! Conversion between register words and application values.
//!
//! Multi-register values are stored high word first, each word big-endian,
//! so `[0x4248, 0xF5C3]` is the byte sequence `42 48 F5 C3`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::{CodecError, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Int16,
    UInt32,
    Int32,
    Float32,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Int16 => "Int16",
            Encoding::UInt32 => "UInt32",
            Encoding::Int32 => "Int32",
            Encoding::Float32 => "Float32",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, finite, non-zero scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divisor(f64);

impl Divisor {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value == 0.0 || !value.is_finite() {
            return Err(ConfigError::InvalidDivisor {
                field: "divisor".to_string(),
                value,
            });
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

pub fn register_count(encoding: Encoding) -> u16 {
    match encoding {
        Encoding::Int16 => 1,
        Encoding::UInt32 | Encoding::Int32 | Encoding::Float32 => 2,
    }
}

/// Decodes `words` according to `encoding`.
///
/// `Int16` yields the raw word without sign extension. Extra trailing words
/// are ignored; callers decide whether that deserves a warning.
pub fn decode(words: &[u16], encoding: Encoding) -> Result<f64, CodecError> {
    let expected = register_count(encoding) as usize;
    if words.len() < expected {
        return Err(CodecError::InsufficientWords {
            encoding: encoding.as_str(),
            expected,
            actual: words.len(),
        });
    }

    let value = match encoding {
        Encoding::Int16 => f64::from(words[0]),
        Encoding::UInt32 => f64::from(u32::from_be_bytes(assemble(words[0], words[1]))),
        Encoding::Int32 => f64::from(i32::from_be_bytes(assemble(words[0], words[1]))),
        Encoding::Float32 => f64::from(f32::from_be_bytes(assemble(words[0], words[1]))),
    };

    Ok(value)
}

fn assemble(high: u16, low: u16) -> [u8; 4] {
    [
        (high >> 8) as u8,
        (high & 0xFF) as u8,
        (low >> 8) as u8,
        (low & 0xFF) as u8,
    ]
}

pub fn scale(decoded: f64, divisor: Option<Divisor>) -> f64 {
    match divisor {
        Some(divisor) => decoded / divisor.get(),
        None => decoded,
    }
}

/// Value type announced to the host for a register of this encoding.
pub fn property_type(encoding: Encoding) -> &'static str {
    match encoding {
        Encoding::Int16 | Encoding::UInt32 | Encoding::Int32 => "integer",
        Encoding::Float32 => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_count() {
        assert_eq!(register_count(Encoding::Int16), 1);
        assert_eq!(register_count(Encoding::Float32), 2);
        assert_eq!(register_count(Encoding::UInt32), 2);
        assert_eq!(register_count(Encoding::Int32), 2);
    }

    #[test]
    fn test_decode_float32_matches_big_endian_reference() {
        let (h, l) = (0x4248u16, 0xF5C3u16);
        let reference = f32::from_be_bytes([(h >> 8) as u8, (h & 0xFF) as u8, (l >> 8) as u8, (l & 0xFF) as u8]);

        let value = decode(&[h, l], Encoding::Float32).unwrap();

        assert_eq!(value, f64::from(reference));
        assert!((value - 50.24).abs() < 1e-4);
    }

    #[test]
    fn test_decode_int16_is_not_sign_extended() {
        assert_eq!(decode(&[0x00FF], Encoding::Int16).unwrap(), 255.0);
        assert_eq!(decode(&[0xFFFF], Encoding::Int16).unwrap(), 65535.0);
    }

    #[test]
    fn test_decode_32_bit_integers() {
        assert_eq!(decode(&[0x0001, 0x0000], Encoding::UInt32).unwrap(), 65536.0);
        assert_eq!(decode(&[0xFFFF, 0xFFFF], Encoding::UInt32).unwrap(), 4294967295.0);
        assert_eq!(decode(&[0xFFFF, 0xFFFE], Encoding::Int32).unwrap(), -2.0);
    }

    #[test]
    fn test_decode_rejects_missing_low_word() {
        let err = decode(&[0x0001], Encoding::UInt32).unwrap_err();
        assert_eq!(
            err,
            CodecError::InsufficientWords {
                encoding: "UInt32",
                expected: 2,
                actual: 1
            }
        );
        assert!(decode(&[], Encoding::Int16).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_words() {
        assert_eq!(decode(&[7, 8, 9], Encoding::Int16).unwrap(), 7.0);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(100.0, Some(Divisor::new(10.0).unwrap())), 10.0);
        assert_eq!(scale(100.0, None), 100.0);
    }

    #[test]
    fn test_zero_divisor_is_rejected() {
        assert!(Divisor::new(0.0).is_err());
        assert!(Divisor::new(f64::NAN).is_err());
        assert!(Divisor::new(-2.0).is_ok());
    }

    #[test]
    fn test_property_type() {
        assert_eq!(property_type(Encoding::Int16), "integer");
        assert_eq!(property_type(Encoding::Int32), "integer");
        assert_eq!(property_type(Encoding::Float32), "number");
    }
}
