//! Exact decimal numbers
//!
//! Gas prices and gas adjustments are fractional, fees are not. `Dec` keeps a
//! big-integer mantissa and a base-10 scale so a fee can be computed as
//! `ceil(gas_price * gas_wanted)` without floating-point rounding.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scale used when a division result is materialized (Cosmos `sdk.Dec`)
pub const DEC_PRECISION: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecimalError {
    #[error("Invalid decimal: {0}")]
    Invalid(String),
    #[error("Division by zero")]
    DivisionByZero,
}

/// Non-negative decimal `mantissa * 10^-scale`
#[derive(Debug, Clone)]
pub struct Dec {
    mantissa: BigUint,
    scale: u32,
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

impl Dec {
    pub fn zero() -> Self {
        Self {
            mantissa: BigUint::zero(),
            scale: 0,
        }
    }

    pub fn one() -> Self {
        Self::from_integer(BigUint::one())
    }

    pub fn from_integer(value: impl Into<BigUint>) -> Self {
        Self {
            mantissa: value.into(),
            scale: 0,
        }
    }

    /// Convert a finite, non-negative float through its shortest decimal form
    pub fn from_f64(value: f64) -> Result<Self, DecimalError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DecimalError::Invalid(value.to_string()));
        }
        // Display for f64 never uses exponent notation
        Self::from_str(&value.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    fn aligned(&self, other: &Dec) -> (BigUint, BigUint) {
        let scale = self.scale.max(other.scale);
        (
            &self.mantissa * pow10(scale - self.scale),
            &other.mantissa * pow10(scale - other.scale),
        )
    }

    pub fn mul(&self, other: &Dec) -> Dec {
        Dec {
            mantissa: &self.mantissa * &other.mantissa,
            scale: self.scale + other.scale,
        }
    }

    /// `ceil(self * n)`
    pub fn mul_int_ceil(&self, n: u64) -> BigUint {
        let product = &self.mantissa * BigUint::from(n);
        num_integer::Integer::div_ceil(&product, &pow10(self.scale))
    }

    pub fn ceil(&self) -> BigUint {
        self.mul_int_ceil(1)
    }

    /// `floor(numerator / denominator)` to `DEC_PRECISION` places
    pub fn quotient(numerator: &BigUint, denominator: u64) -> Result<Dec, DecimalError> {
        if denominator == 0 {
            return Err(DecimalError::DivisionByZero);
        }
        let dec = Dec {
            mantissa: numerator * pow10(DEC_PRECISION) / BigUint::from(denominator),
            scale: DEC_PRECISION,
        };
        Ok(dec.normalized())
    }

    fn normalized(mut self) -> Dec {
        let ten = BigUint::from(10u32);
        while self.scale > 0 && (&self.mantissa % &ten).is_zero() {
            self.mantissa /= &ten;
            self.scale -= 1;
        }
        if self.mantissa.is_zero() {
            self.scale = 0;
        }
        self
    }
}

impl PartialEq for Dec {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.aligned(other);
        a == b
    }
}

impl Eq for Dec {}

impl PartialOrd for Dec {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dec {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (a, b) = self.aligned(other);
        a.cmp(&b)
    }
}

impl FromStr for Dec {
    type Err = DecimalError;

    /// Accepts `"12"`, `"0.05"`, `"1."` is rejected, as are signs and exponents
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecimalError::Invalid(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (s, ""),
        };
        if int_part.is_empty()
            || (s.contains('.') && frac_part.is_empty())
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let digits = format!("{}{}", int_part, frac_part);
        let mantissa = BigUint::from_str(&digits).map_err(|_| invalid())?;
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        Ok(Dec { mantissa, scale }.normalized())
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}", digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", int, frac)
    }
}
