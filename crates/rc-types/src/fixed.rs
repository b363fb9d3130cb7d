//! 18-decimal fixed-point amounts.
//!
//! Every USD value and every KPI ratio is an unsigned integer mantissa scaled
//! by `10^18`. All conversions round toward zero.

use std::{fmt, iter::Sum, str::FromStr};

use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits of every fixed-point value.
pub const FIXED_DECIMALS: u32 = 18;

/// `10^18`.
pub const FIXED_ONE: u128 = 1_000_000_000_000_000_000;

/// Largest token precision we accept; `10^36` still fits in a `u128`.
pub const MAX_TOKEN_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fixed-point value '{0}'")]
pub struct ParseFixedError(pub String);

/// `10^exp` for `exp <= 38`.
pub fn pow10(exp: u32) -> Option<u128> {
    10_u128.checked_pow(exp)
}

/// `floor(Π numerators / Π denominators)` computed without intermediate overflow.
///
/// Returns `None` when a denominator is zero or the result does not fit in a `u128`.
pub fn mul_div_floor(numerators: &[u128], denominators: &[u128]) -> Option<u128> {
    if denominators.contains(&0) {
        return None;
    }
    let num = numerators
        .iter()
        .fold(BigUint::from(1_u8), |acc, n| acc * BigUint::from(*n));
    let den = denominators
        .iter()
        .fold(BigUint::from(1_u8), |acc, d| acc * BigUint::from(*d));
    u128::try_from(num / den).ok()
}

fn format_fixed(mantissa: u128, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let int_part = mantissa / FIXED_ONE;
    let frac_part = mantissa % FIXED_ONE;
    let frac = format!("{frac_part:018}");
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        write!(f, "{int_part}.0")
    } else {
        write!(f, "{int_part}.{frac}")
    }
}

fn parse_fixed(s: &str) -> Result<u128, ParseFixedError> {
    let err = || ParseFixedError(s.to_string());
    let (int_str, frac_str) = s.trim().split_once('.').unwrap_or((s.trim(), ""));
    if int_str.is_empty() && frac_str.is_empty() {
        return Err(err());
    }
    if frac_str.len() > FIXED_DECIMALS as usize {
        return Err(err());
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_str) || !all_digits(frac_str) {
        return Err(err());
    }

    let int_part: u128 = if int_str.is_empty() {
        0
    } else {
        int_str.parse().map_err(|_| err())?
    };
    let frac_part: u128 = if frac_str.is_empty() {
        0
    } else {
        let padded = format!("{frac_str:0<18}");
        padded.parse().map_err(|_| err())?
    };

    int_part
        .checked_mul(FIXED_ONE)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(err)
}

fn decimal_to_mantissa(value: Decimal) -> Option<u128> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scale = value.scale();
    let raw = value.mantissa().unsigned_abs();
    if scale <= FIXED_DECIMALS {
        raw.checked_mul(pow10(FIXED_DECIMALS - scale)?)
    } else {
        Some(raw / pow10(scale - FIXED_DECIMALS)?)
    }
}

fn mantissa_to_decimal(mantissa: u128) -> Option<Decimal> {
    let signed = i128::try_from(mantissa).ok()?;
    Decimal::try_from_i128_with_scale(signed, FIXED_DECIMALS)
        .ok()
        .map(|d| d.normalize())
}

macro_rules! fixed_point {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(0);
            pub const ONE: Self = Self(FIXED_ONE);

            pub const fn from_mantissa(mantissa: u128) -> Self {
                Self(mantissa)
            }

            pub const fn mantissa(self) -> u128 {
                self.0
            }

            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Converts a non-negative decimal, truncating digits past the 18th.
            pub fn try_from_decimal(value: Decimal) -> Option<Self> {
                decimal_to_mantissa(value).map(Self)
            }

            pub fn to_decimal(self) -> Option<Decimal> {
                mantissa_to_decimal(self.0)
            }

            pub const fn checked_add(self, other: Self) -> Option<Self> {
                match self.0.checked_add(other.0) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }

            pub const fn saturating_add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                format_fixed(self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseFixedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::ZERO, Self::saturating_add)
            }
        }
    };
}

/// A USD amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(u128);

/// A dimensionless ratio, e.g. a vault KPI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ratio(u128);

fixed_point!(Usd);
fixed_point!(Ratio);

impl Usd {
    /// Values `amount` raw units of a token with `decimals` precision at `price` USD per
    /// whole token: `floor(amount * price / 10^decimals)`.
    pub fn of_token_amount(amount: u128, decimals: u8, price: Self) -> Option<Self> {
        if decimals > MAX_TOKEN_DECIMALS {
            return None;
        }
        let unit = pow10(u32::from(decimals))?;
        mul_div_floor(&[amount, price.0], &[unit]).map(Self)
    }
}

impl Ratio {
    /// `numerator / denominator`, defined as zero when the denominator is zero.
    ///
    /// `None` when the quotient does not fit the fixed-point range.
    pub fn of(numerator: Usd, denominator: Usd) -> Option<Self> {
        if denominator.is_zero() {
            return Some(Self::ZERO);
        }
        mul_div_floor(&[numerator.0, FIXED_ONE], &[denominator.0]).map(Self)
    }
}
