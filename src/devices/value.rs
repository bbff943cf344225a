use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::modbus::codec::{property_type, Encoding};

/// Typed application value of a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
}

impl PointValue {
    /// Integer encodings stay integers unless the divisor produced a fraction.
    pub fn from_register(encoding: Encoding, scaled: f64) -> Self {
        let integral = scaled.fract() == 0.0 && scaled.abs() <= i64::MAX as f64;
        if property_type(encoding) == "integer" && integral {
            PointValue::Integer(scaled as i64)
        } else {
            PointValue::Number(scaled)
        }
    }

    /// Parses operator input: `true/false/on/off`, integers, then decimals.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.to_ascii_lowercase().as_str() {
            "true" | "on" => return Some(PointValue::Boolean(true)),
            "false" | "off" => return Some(PointValue::Boolean(false)),
            _ => {}
        }
        if let Ok(n) = text.parse::<i64>() {
            return Some(PointValue::Integer(n));
        }
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(PointValue::Number)
    }

    /// Booleans as-is; `0` and `1` are accepted for coils.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PointValue::Boolean(b) => Some(b),
            PointValue::Integer(0) => Some(false),
            PointValue::Integer(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PointValue::Boolean(_) => None,
            PointValue::Integer(n) => Some(n as f64),
            PointValue::Number(n) => Some(n),
        }
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Boolean(b) => write!(f, "{}", b),
            PointValue::Integer(n) => write!(f, "{}", n),
            PointValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Last successfully polled value of a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CachedValue {
    pub value: PointValue,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_register() {
        assert_eq!(PointValue::from_register(Encoding::Int16, 42.0), PointValue::Integer(42));
        assert_eq!(PointValue::from_register(Encoding::Int16, 4.2), PointValue::Number(4.2));
        assert_eq!(PointValue::from_register(Encoding::Float32, 50.0), PointValue::Number(50.0));
    }

    #[test]
    fn test_parse_operator_input() {
        assert_eq!(PointValue::parse("ON"), Some(PointValue::Boolean(true)));
        assert_eq!(PointValue::parse("false"), Some(PointValue::Boolean(false)));
        assert_eq!(PointValue::parse("-12"), Some(PointValue::Integer(-12)));
        assert_eq!(PointValue::parse("2.5"), Some(PointValue::Number(2.5)));
        assert_eq!(PointValue::parse("inf"), None);
        assert_eq!(PointValue::parse("pump"), None);
    }

    #[test]
    fn test_coil_conversions() {
        assert_eq!(PointValue::Integer(1).as_bool(), Some(true));
        assert_eq!(PointValue::Integer(2).as_bool(), None);
        assert_eq!(PointValue::Number(1.0).as_bool(), None);
    }

    #[test]
    fn test_untagged_json() {
        assert_eq!(serde_json::to_string(&PointValue::Boolean(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&PointValue::Integer(42)).unwrap(), "42");
        let parsed: PointValue = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, PointValue::Integer(42));
    }
}
