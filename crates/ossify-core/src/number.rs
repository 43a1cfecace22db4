//! Output number formatting: three decimals, no trailing `.0`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Round to three decimal places, normalizing negative zero.
pub fn round3(value: f64) -> f64 {
    let r = (value * 1000.0).round() / 1000.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// A number as it appears in the exported document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Num(pub f64);

impl Num {
    pub fn value(&self) -> f64 {
        round3(self.0)
    }

    /// Whether the rounded number equals an identity default such as `0` or `1`.
    pub fn is(&self, default: f64) -> bool {
        self.value() == default
    }

    /// `Some` unless the rounded number equals `default`.
    pub fn unless(value: f64, default: f64) -> Option<Num> {
        let num = Num(value);
        (!num.is(default)).then_some(num)
    }
}

impl From<f64> for Num {
    fn from(value: f64) -> Self {
        Num(value)
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.value();
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0001), 0.0);
        assert!(round3(-0.0001).is_sign_positive());
    }

    #[test]
    fn test_display_has_no_trailing_zero() {
        assert_eq!(Num(1.0).to_string(), "1");
        assert_eq!(Num(-2.5).to_string(), "-2.5");
        assert_eq!(Num(0.33333).to_string(), "0.333");
    }

    #[test]
    fn test_serialize() {
        assert_eq!(serde_json::to_string(&Num(100.0)).unwrap(), "100");
        assert_eq!(serde_json::to_string(&Num(0.1234)).unwrap(), "0.123");
        assert_eq!(serde_json::to_string(&Num(-0.0004)).unwrap(), "0");
    }

    #[test]
    fn test_unless_default() {
        assert!(Num::unless(0.0004, 0.0).is_none());
        assert!(Num::unless(1.0002, 1.0).is_none());
        assert_eq!(Num::unless(0.5, 0.0), Some(Num(0.5)));
    }
}
