//! Kubernetes resource quantities.
//!
//! Parses the `<sign><number><suffix>` notation used by resource requests,
//! limits and invocation limits (`128Mi`, `1.5Gi`, `500m`, `1e3`) into an
//! exact magnitude that can be ordered, and renders it back canonically.
//!
//! Magnitudes are stored in nano units. Anything finer than `1n` is rounded
//! up, away from zero, which matches how the API server treats such values.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of nano units in one whole unit.
const NANOS_PER_UNIT: u128 = 1_000_000_000;

/// Longest mantissa (significant digits) accepted before rejecting as out of range.
const MAX_MANTISSA_DIGITS: usize = 30;

/// Binary SI suffixes, largest first, with their power-of-two exponent.
const BINARY_SUFFIXES: [(&str, u32); 6] = [
    ("Ei", 60),
    ("Pi", 50),
    ("Ti", 40),
    ("Gi", 30),
    ("Mi", 20),
    ("Ki", 10),
];

/// Decimal SI suffixes, largest first, with their power-of-ten exponent.
const DECIMAL_SUFFIXES: [(&str, i32); 10] = [
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("", 0),
    ("m", -3),
    ("u", -6),
    ("n", -9),
];

/// Notation a quantity was written in; canonical rendering keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFormat {
    /// Power-of-two suffixes (`Ki`, `Mi`, `Gi`, ...).
    BinarySi,
    /// Power-of-ten suffixes (`m`, `k`, `M`, `G`, ...) or none.
    DecimalSi,
    /// Scientific notation (`1e3`, `5E-3`).
    DecimalExponent,
}

/// Error returned when a string is not a valid quantity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input was empty.
    #[error("quantity is empty")]
    Empty,

    /// No digits were found where the number should be.
    #[error("quantity {0:?} does not start with a number")]
    MissingNumber(String),

    /// The suffix after the number is not a known unit.
    #[error("quantity {input:?} has unknown suffix {suffix:?}")]
    UnknownSuffix { input: String, suffix: String },

    /// The magnitude cannot be represented.
    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

/// A parsed resource quantity.
///
/// Equality and ordering compare magnitudes, so `1Gi == 1024Mi`.
#[derive(Debug, Clone, Copy)]
pub struct Quantity {
    nanos: i128,
    format: QuantityFormat,
}

impl Quantity {
    /// Quantity of `value` whole units, rendered without a suffix.
    pub fn from_units(value: i64) -> Self {
        Self {
            nanos: i128::from(value) * NANOS_PER_UNIT as i128,
            format: QuantityFormat::DecimalSi,
        }
    }

    /// Notation used when rendering this quantity.
    pub fn format(&self) -> QuantityFormat {
        self.format
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(QuantityError::Empty);
        }

        let (negative, unsigned) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };

        let number_len = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(number_len);

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(QuantityError::MissingNumber(input.to_string()));
        }

        let out_of_range = || QuantityError::OutOfRange(input.to_string());

        let digits = format!("{whole}{fraction}");
        let significant = digits.trim_start_matches('0');
        if significant.len() > MAX_MANTISSA_DIGITS {
            return Err(out_of_range());
        }
        let mantissa: u128 = if significant.is_empty() {
            0
        } else {
            significant.parse().map_err(|_| out_of_range())?
        };
        let fraction_digits = i64::try_from(fraction.len()).map_err(|_| out_of_range())?;

        let (format, magnitude) = parse_suffix(suffix).ok_or_else(|| {
            QuantityError::UnknownSuffix {
                input: input.to_string(),
                suffix: suffix.to_string(),
            }
        })?;

        let nanos = match magnitude {
            Magnitude::PowerOfTwo(exp) => {
                let numerator = mantissa
                    .checked_mul(1u128 << exp)
                    .and_then(|n| n.checked_mul(NANOS_PER_UNIT))
                    .ok_or_else(out_of_range)?;
                div_ceil_pow10(numerator, fraction_digits)
            }
            Magnitude::PowerOfTen(_) if mantissa == 0 => 0,
            Magnitude::PowerOfTen(exp) => {
                // i32 exponent and fraction length cannot overflow i64
                let scale = i64::from(exp) + 9 - fraction_digits;
                if scale >= 0 {
                    let factor = pow10(scale).ok_or_else(out_of_range)?;
                    mantissa.checked_mul(factor).ok_or_else(out_of_range)?
                } else {
                    div_ceil_pow10(mantissa, -scale)
                }
            }
        };

        let nanos = i128::try_from(nanos).map_err(|_| out_of_range())?;
        Ok(Self {
            nanos: if negative { -nanos } else { nanos },
            format,
        })
    }
}

enum Magnitude {
    PowerOfTwo(u32),
    PowerOfTen(i32),
}

fn parse_suffix(suffix: &str) -> Option<(QuantityFormat, Magnitude)> {
    if let Some((_, exp)) = BINARY_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Some((QuantityFormat::BinarySi, Magnitude::PowerOfTwo(*exp)));
    }
    if let Some((_, exp)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
        return Some((QuantityFormat::DecimalSi, Magnitude::PowerOfTen(*exp)));
    }
    let exponent = suffix.strip_prefix(['e', 'E'])?;
    let unsigned = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let exp: i32 = exponent.parse().ok()?;
    Some((QuantityFormat::DecimalExponent, Magnitude::PowerOfTen(exp)))
}

fn pow10(exp: i64) -> Option<u128> {
    10u128.checked_pow(u32::try_from(exp).ok()?)
}

/// `value / 10^exp`, rounded up. Divisors too large to represent round any
/// non-zero value up to the smallest unit.
fn div_ceil_pow10(value: u128, exp: i64) -> u128 {
    match pow10(exp) {
        Some(divisor) => value.div_ceil(divisor),
        None if value == 0 => 0,
        None => 1,
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return write!(f, "0");
        }
        if self.nanos < 0 {
            write!(f, "-")?;
        }
        let abs = self.nanos.unsigned_abs();

        if self.format == QuantityFormat::BinarySi && abs % NANOS_PER_UNIT == 0 {
            let whole = abs / NANOS_PER_UNIT;
            if whole >= 1024 {
                let suffix = BINARY_SUFFIXES
                    .iter()
                    .find(|(_, exp)| whole % (1u128 << exp) == 0);
                return match suffix {
                    Some((suffix, exp)) => write!(f, "{}{}", whole >> exp, suffix),
                    None => write!(f, "{}", whole),
                };
            }
        }

        // Every magnitude is a whole number of nano units, so the smallest
        // suffix always matches.
        for (suffix, exp) in DECIMAL_SUFFIXES {
            let Some(unit) = pow10(i64::from(exp) + 9) else {
                continue;
            };
            if abs % unit == 0 {
                let value = abs / unit;
                return if self.format == QuantityFormat::DecimalExponent {
                    match exp {
                        0 => write!(f, "{}", value),
                        _ => write!(f, "{}e{}", value, exp),
                    }
                } else {
                    write!(f, "{}{}", value, suffix)
                };
            }
        }
        write!(f, "{}n", abs)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a quantity string such as \"128Mi\" or a number")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Quantity, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Quantity, E> {
                Ok(Quantity::from_units(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Quantity, E> {
                let value = i64::try_from(value).map_err(E::custom)?;
                Ok(Quantity::from_units(value))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Quantity, E> {
                value.to_string().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}
