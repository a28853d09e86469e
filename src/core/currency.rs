//! Currency registry
//!
//! Static, bidirectional mapping between on-chain denominations and the
//! Rosetta currency (symbol + decimals) they are reported as.

use serde::{Deserialize, Serialize};

/// Native staking and fee denomination
pub const STAKING_DENOM: &str = "ukava";

/// A Rosetta currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
}

impl Currency {
    pub fn new(symbol: &str, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

/// (denom, symbol, decimals)
const CURRENCIES: [(&str, &str, u32); 4] = [
    ("ukava", "KAVA", 6),
    ("hard", "HARD", 6),
    ("usdx", "USDX", 6),
    ("swp", "SWP", 6),
];

/// Lookup table for every recognized asset
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyRegistry;

impl CurrencyRegistry {
    /// Currency reported for a denom, if the denom is recognized
    pub fn currency(&self, denom: &str) -> Option<Currency> {
        CURRENCIES
            .iter()
            .find(|(d, _, _)| *d == denom)
            .map(|(_, symbol, decimals)| Currency::new(symbol, *decimals))
    }

    /// Denom for a currency; both symbol and decimals must match
    pub fn denom(&self, currency: &Currency) -> Option<&'static str> {
        CURRENCIES
            .iter()
            .find(|(_, symbol, decimals)| {
                *symbol == currency.symbol && *decimals == currency.decimals
            })
            .map(|(denom, _, _)| *denom)
    }

    pub fn is_recognized(&self, denom: &str) -> bool {
        CURRENCIES.iter().any(|(d, _, _)| *d == denom)
    }

    /// All recognized currencies, in registry order
    pub fn currencies(&self) -> Vec<Currency> {
        CURRENCIES
            .iter()
            .map(|(_, symbol, decimals)| Currency::new(symbol, *decimals))
            .collect()
    }

    /// All recognized denoms, in registry order
    pub fn denoms(&self) -> Vec<&'static str> {
        CURRENCIES.iter().map(|(denom, _, _)| *denom).collect()
    }
}
