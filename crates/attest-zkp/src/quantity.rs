//! Non-negative fixed-point quantities with six decimal places.
//!
//! Values are carried as integer micro-units so they can enter canonical
//! bytes (integers only) and be blinded with exact integer arithmetic.
//! The textual form is a plain decimal string (`"0.8"`, `"5"`), parsed
//! exactly without passing through `f64`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::QuantityError;

const SCALE: u64 = 1_000_000;

/// A non-negative decimal with micro-unit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Quantity(u64);

impl Quantity {
    pub const DECIMALS: u32 = 6;
    /// Largest representable value: 2^53 − 1 micro-units, so every
    /// quantity stays exactly representable wherever JSON numbers are
    /// read as doubles.
    pub const MAX: Quantity = Quantity((1 << 53) - 1);
    pub const ZERO: Quantity = Quantity(0);

    pub fn from_micros(micros: u64) -> Result<Self, QuantityError> {
        if micros > Self::MAX.0 {
            return Err(QuantityError::TooLarge {
                value: micros.to_string(),
                max: Self::MAX.to_string(),
            });
        }
        Ok(Self(micros))
    }

    /// Convert from a float, rounding to the nearest micro-unit.
    pub fn from_f64(value: f64) -> Result<Self, QuantityError> {
        if !value.is_finite() {
            return Err(QuantityError::NotFinite(value));
        }
        if value < 0.0 {
            return Err(QuantityError::Negative(value.to_string()));
        }
        let micros = (value * SCALE as f64).round();
        if micros > Self::MAX.0 as f64 {
            return Err(QuantityError::TooLarge {
                value: value.to_string(),
                max: Self::MAX.to_string(),
            });
        }
        Ok(Self(micros as u64))
    }

    pub fn micros(&self) -> u64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let malformed = |reason: &str| QuantityError::Malformed {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        if input.starts_with('-') {
            return Err(QuantityError::Negative(input.to_string()));
        }
        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(malformed("empty"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("expected digits with an optional decimal point"));
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(malformed("more than 6 decimal places"));
        }
        let too_large = || QuantityError::TooLarge {
            value: input.to_string(),
            max: Self::MAX.to_string(),
        };
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| too_large())?
        };
        let frac_micros: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<6}").parse().map_err(|_| malformed("bad fraction"))?
        };
        let micros = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac_micros))
            .ok_or_else(too_large)?;
        Self::from_micros(micros)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f64_rounds_to_micros() {
        assert_eq!(Quantity::from_f64(0.8).unwrap().micros(), 800_000);
        assert_eq!(Quantity::from_f64(5.0).unwrap().micros(), 5_000_000);
        assert_eq!(Quantity::from_f64(0.1 + 0.2).unwrap().micros(), 300_000);
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(matches!(Quantity::from_f64(-0.5), Err(QuantityError::Negative(_))));
        assert!(matches!(Quantity::from_f64(f64::NAN), Err(QuantityError::NotFinite(_))));
        assert!(matches!(Quantity::from_f64(f64::INFINITY), Err(QuantityError::NotFinite(_))));
        assert!(matches!(Quantity::from_f64(1e12), Err(QuantityError::TooLarge { .. })));
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Quantity::from_micros(800_000).unwrap().to_string(), "0.8");
        assert_eq!(Quantity::from_micros(5_000_000).unwrap().to_string(), "5");
        assert_eq!(Quantity::from_micros(1).unwrap().to_string(), "0.000001");
        assert_eq!(Quantity::ZERO.to_string(), "0");
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!("0.8".parse::<Quantity>().unwrap().micros(), 800_000);
        assert_eq!(".5".parse::<Quantity>().unwrap().micros(), 500_000);
        assert_eq!("12".parse::<Quantity>().unwrap().micros(), 12_000_000);
        assert_eq!("3.".parse::<Quantity>().unwrap().micros(), 3_000_000);
    }

    #[test]
    fn parse_rejects_bad_input() {
        for bad in ["", ".", "-1", "1.2345678", "1e3", "abc", "1.2.3"] {
            assert!(bad.parse::<Quantity>().is_err(), "{bad:?} should be rejected");
        }
        assert!("99999999999999999999".parse::<Quantity>().is_err());
    }

    #[test]
    fn serde_is_decimal_string() {
        let q = Quantity::from_f64(0.25).unwrap();
        assert_eq!(serde_json::to_string(&q).unwrap(), "\"0.25\"");
        let back: Quantity = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(back, q);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_parse_roundtrip(micros in 0u64..=Quantity::MAX.micros()) {
            let q = Quantity::from_micros(micros).unwrap();
            prop_assert_eq!(q.to_string().parse::<Quantity>().unwrap(), q);
        }

        #[test]
        fn order_matches_micros(a in 0u64..1_000_000_000, b in 0u64..1_000_000_000) {
            let qa = Quantity::from_micros(a).unwrap();
            let qb = Quantity::from_micros(b).unwrap();
            prop_assert_eq!(qa <= qb, a <= b);
        }
    }
}
