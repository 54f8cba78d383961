//! Parsers for the numeric encodings backends use for ledger quantities.

use std::{fmt::Display, str::FromStr};

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A non-negative rational, kept in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u64,
    pub denominator: u64,
}

impl Default for Rational {
    fn default() -> Self {
        Self {
            numerator: 0,
            denominator: 1,
        }
    }
}

impl Rational {
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, Error> {
        if denominator == 0 {
            return Err(Error::DecodeFailed(format!(
                "rational {numerator}/0 has a zero denominator"
            )));
        }

        let ratio = Ratio::new(numerator, denominator);

        Ok(Self {
            numerator: *ratio.numer(),
            denominator: *ratio.denom(),
        })
    }

    /// Goes through the shortest decimal rendering of the float so that
    /// `0.05` becomes `1/20` rather than its binary expansion.
    pub fn from_f64(value: f64) -> Result<Self, Error> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::DecodeFailed(format!(
                "{value} is not a non-negative finite number"
            )));
        }

        parse_decimal(&value.to_string())
    }

    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Rational {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rational(s)
    }
}

fn parse_decimal(input: &str) -> Result<Rational, Error> {
    let invalid = || Error::DecodeFailed(format!("invalid decimal `{input}`"));

    let (int_part, frac_part) = input.split_once('.').unwrap_or((input, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }

    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let frac_part = frac_part.trim_end_matches('0');

    let denominator = 10u64
        .checked_pow(frac_part.len() as u32)
        .ok_or_else(invalid)?;

    let digits = format!("{int_part}{frac_part}");
    let numerator = if digits.is_empty() {
        0
    } else {
        digits.parse::<u64>().map_err(|_| invalid())?
    };

    Rational::new(numerator, denominator)
}

/// Accepts `"n/d"` or a plain decimal string such as `"0.0577"`.
pub fn parse_rational(input: &str) -> Result<Rational, Error> {
    let input = input.trim();

    match input.split_once('/') {
        Some((n, d)) => {
            let n = parse_u64(n)?;
            let d = parse_u64(d)?;
            Rational::new(n, d)
        }
        None => parse_decimal(input),
    }
}

/// Parses a big-integer string that must fit in 64 bits.
pub fn parse_u64(input: &str) -> Result<u64, Error> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|e| Error::DecodeFailed(format!("invalid integer `{input}`: {e}")))
}

/// A JSON quantity that a backend may send as a number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Numeric {
    pub fn as_u64(&self) -> Result<u64, Error> {
        match self {
            Numeric::Int(x) => Ok(*x),
            Numeric::Float(x) if x.fract() == 0.0 && *x >= 0.0 && *x < u64::MAX as f64 => {
                Ok(*x as u64)
            }
            Numeric::Float(x) => Err(Error::DecodeFailed(format!("{x} is not a u64"))),
            Numeric::Text(x) => parse_u64(x),
        }
    }

    pub fn as_rational(&self) -> Result<Rational, Error> {
        match self {
            Numeric::Int(x) => Rational::new(*x, 1),
            Numeric::Float(x) => Rational::from_f64(*x),
            Numeric::Text(x) => parse_rational(x),
        }
    }
}

impl From<u64> for Numeric {
    fn from(value: u64) -> Self {
        Numeric::Int(value)
    }
}

/// Applies [`Numeric::as_u64`] to an optional field, absent meaning zero.
pub fn opt_u64(value: &Option<Numeric>) -> Result<u64, Error> {
    value.as_ref().map(Numeric::as_u64).transpose().map(Option::unwrap_or_default)
}

/// Applies [`Numeric::as_rational`] to an optional field, absent meaning zero.
pub fn opt_rational(value: &Option<Numeric>) -> Result<Rational, Error> {
    value
        .as_ref()
        .map(Numeric::as_rational)
        .transpose()
        .map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_fraction() {
        let r = parse_rational("49/50").unwrap();
        assert_eq!(r, Rational { numerator: 49, denominator: 50 });

        let r = parse_rational("2/4").unwrap();
        assert_eq!(r, Rational { numerator: 1, denominator: 2 });
    }

    #[test]
    fn parses_decimals() {
        assert_eq!(parse_rational("0.3").unwrap(), Rational::new(3, 10).unwrap());
        assert_eq!(parse_rational("0.0577").unwrap(), Rational::new(577, 10000).unwrap());
        assert_eq!(parse_rational("5").unwrap(), Rational::new(5, 1).unwrap());
        assert_eq!(parse_rational("1.500").unwrap(), Rational::new(3, 2).unwrap());
        assert_eq!(parse_rational("0").unwrap(), Rational::default());
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", ".", "abc", "1/0", "-1/2", "1.2.3", "1e5"] {
            assert!(parse_rational(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn float_goes_through_decimal() {
        assert_eq!(Rational::from_f64(0.05).unwrap(), Rational::new(1, 20).unwrap());
        assert_eq!(Rational::from_f64(0.3).unwrap(), Rational::new(3, 10).unwrap());
        assert!(Rational::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn numeric_accepts_numbers_and_strings() {
        let x: Numeric = serde_json::from_str("44").unwrap();
        assert_eq!(x.as_u64().unwrap(), 44);

        let x: Numeric = serde_json::from_str("\"45000000000000000\"").unwrap();
        assert_eq!(x.as_u64().unwrap(), 45_000_000_000_000_000);

        let x: Numeric = serde_json::from_str("0.0577").unwrap();
        assert_eq!(x.as_rational().unwrap(), Rational::new(577, 10000).unwrap());
        assert!(x.as_u64().is_err());

        let x: Numeric = serde_json::from_str("\"3/10\"").unwrap();
        assert_eq!(x.as_rational().unwrap(), Rational::new(3, 10).unwrap());

        assert_eq!(opt_u64(&None).unwrap(), 0);
        assert_eq!(opt_rational(&None).unwrap(), Rational::default());
    }

    #[test]
    fn float_beyond_u64_is_rejected() {
        // 2^64, the nearest f64 to u64::MAX
        let x = Numeric::Float(18446744073709551616.0);
        assert_eq!(x.as_u64().unwrap_err().kind(), crate::ErrorKind::DecodeFailed);

        let x = Numeric::Float(-1.0);
        assert!(x.as_u64().is_err());

        let x = Numeric::Float(9007199254740992.0);
        assert_eq!(x.as_u64().unwrap(), 1 << 53);
    }

    proptest! {
        #[test]
        fn fraction_is_reduced(n in 0u64..1_000_000, d in 1u64..1_000_000) {
            let r = parse_rational(&format!("{n}/{d}")).unwrap();
            prop_assert_eq!(r.numerator as u128 * d as u128, n as u128 * r.denominator as u128);

            let again = Rational::new(r.numerator, r.denominator).unwrap();
            prop_assert_eq!(again, r);
        }
    }
}
