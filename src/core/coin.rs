//! Coins and coin sets
//!
//! Amounts are unsigned arbitrary-precision integers. A `CoinSet` holds at
//! most one entry per denomination and never stores a zero amount, so two sets
//! compare equal exactly when they hold the same balances.

use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Coin arithmetic and parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoinError {
    #[error("Invalid coin: {0}")]
    InvalidCoin(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Negative result for {denom}")]
    Negative { denom: String },
}

/// A single denomination and amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    #[serde(with = "amount_string")]
    pub amount: BigUint,
    pub denom: String,
}

impl Coin {
    pub fn new(denom: &str, amount: impl Into<BigUint>) -> Self {
        Self {
            amount: amount.into(),
            denom: denom.to_string(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::InvalidCoin(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() || !is_valid_denom(denom) {
            return Err(CoinError::InvalidCoin(s.to_string()));
        }
        let amount = parse_amount(amount)?;
        Ok(Self {
            amount,
            denom: denom.to_string(),
        })
    }
}

/// Cosmos denom rule: a letter followed by 2..=127 of [a-zA-Z0-9/:._-]
fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    (3..=128).contains(&denom.len())
        && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
}

/// Parse a base-10 unsigned integer with no sign, spaces or leading '+'
pub fn parse_amount(value: &str) -> Result<BigUint, CoinError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoinError::InvalidAmount(value.to_string()));
    }
    BigUint::from_str(value).map_err(|_| CoinError::InvalidAmount(value.to_string()))
}

/// A set of coins keyed by denomination, iterated in denom order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinSet {
    coins: BTreeMap<String, BigUint>,
}

impl CoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one coin (empty if the amount is zero)
    pub fn single(denom: &str, amount: impl Into<BigUint>) -> Self {
        let mut set = Self::new();
        set.insert(denom, amount.into());
        set
    }

    /// Build a set, merging duplicate denominations
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Self {
        let mut set = Self::new();
        for coin in coins {
            set.insert(&coin.denom, coin.amount);
        }
        set
    }

    fn insert(&mut self, denom: &str, amount: BigUint) {
        if amount.is_zero() {
            return;
        }
        *self.coins.entry(denom.to_string()).or_default() += amount;
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn amount_of(&self, denom: &str) -> BigUint {
        self.coins.get(denom).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BigUint)> {
        self.coins.iter().map(|(denom, amount)| (denom.as_str(), amount))
    }

    pub fn to_coins(&self) -> Vec<Coin> {
        self.iter()
            .map(|(denom, amount)| Coin::new(denom, amount.clone()))
            .collect()
    }

    /// Restrict the set to a single denomination
    pub fn only(&self, denom: &str) -> Self {
        Self::single(denom, self.amount_of(denom))
    }

    pub fn add(&self, other: &CoinSet) -> Self {
        let mut sum = self.clone();
        for (denom, amount) in other.iter() {
            sum.insert(denom, amount.clone());
        }
        sum
    }

    /// Subtract, failing if any denomination would go negative
    pub fn checked_sub(&self, other: &CoinSet) -> Result<Self, CoinError> {
        let mut diff = self.clone();
        for (denom, amount) in other.iter() {
            let current = diff.amount_of(denom);
            let rest = current
                .checked_sub(amount)
                .ok_or_else(|| CoinError::Negative {
                    denom: denom.to_string(),
                })?;
            diff.coins.remove(denom);
            diff.insert(denom, rest);
        }
        Ok(diff)
    }

    /// Subtract, clamping each denomination at zero
    pub fn saturating_sub(&self, other: &CoinSet) -> Self {
        let mut diff = self.clone();
        for (denom, amount) in other.iter() {
            let rest = diff
                .amount_of(denom)
                .checked_sub(amount)
                .unwrap_or_default();
            diff.coins.remove(denom);
            diff.insert(denom, rest);
        }
        diff
    }

    /// Per-denomination minimum; denoms missing from either side are zero
    pub fn min(&self, other: &CoinSet) -> Self {
        let mut result = Self::new();
        for (denom, amount) in self.iter() {
            let theirs = other.amount_of(denom);
            result.insert(denom, std::cmp::min(amount, &theirs).clone());
        }
        result
    }
}

impl fmt::Display for CoinSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(denom, amount)| format!("{}{}", amount, denom))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for CoinSet {
    type Err = CoinError;

    /// Parses the Cosmos string form, e.g. `"100ukava,5hard"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::new());
        }
        let coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_coins(coins))
    }
}

impl Serialize for CoinSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_coins().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CoinSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coins = Option::<Vec<Coin>>::deserialize(deserializer)?;
        Ok(Self::from_coins(coins.unwrap_or_default()))
    }
}

/// Serde adapter writing a `BigUint` as a decimal string
pub mod amount_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_amount(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(s: &str) -> CoinSet {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let set = coins("100ukava,5hard,7ukava");
        assert_eq!(set.amount_of("ukava"), BigUint::from(107u32));
        assert_eq!(set.to_string(), "5hard,107ukava");
        assert!(coins("").is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("ukava".parse::<CoinSet>().is_err());
        assert!("-5ukava".parse::<CoinSet>().is_err());
        assert!("10".parse::<CoinSet>().is_err());
        assert!("10u".parse::<CoinSet>().is_err());
    }

    #[test]
    fn test_zero_amounts_are_dropped() {
        let set = CoinSet::single("ukava", 0u32);
        assert!(set.is_empty());
        assert_eq!(coins("0ukava,1hard").len(), 1);
    }

    #[test]
    fn test_checked_sub() {
        let a = coins("100ukava,5hard");
        let b = coins("40ukava,5hard");
        assert_eq!(a.checked_sub(&b).unwrap(), coins("60ukava"));
        assert_eq!(
            b.checked_sub(&a),
            Err(CoinError::Negative {
                denom: "ukava".to_string()
            })
        );
    }

    #[test]
    fn test_saturating_sub_and_min() {
        let a = coins("100ukava,5hard");
        let b = coins("400ukava,1usdx");
        assert_eq!(a.saturating_sub(&b), coins("5hard"));
        assert_eq!(a.min(&b), coins("100ukava"));
    }

    #[test]
    fn test_add() {
        let sum = coins("1ukava").add(&coins("2ukava,3hard"));
        assert_eq!(sum, coins("3ukava,3hard"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&coins("5ukava")).unwrap();
        assert_eq!(json, r#"[{"amount":"5","denom":"ukava"}]"#);
        let back: CoinSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coins("5ukava"));
        let null: CoinSet = serde_json::from_str("null").unwrap();
        assert!(null.is_empty());
    }

    #[test]
    fn test_large_amounts() {
        let set = coins("340282366920938463463374607431768211457ukava");
        assert_eq!(
            set.amount_of("ukava").to_string(),
            "340282366920938463463374607431768211457"
        );
    }
}
