//! Account snapshots
//!
//! Accounts are read from the chain at a pinned height and never mutated
//! locally. A vesting account carries its schedule; everything else is a base
//! account.

use crate::core::coin::{amount_string, Coin, CoinSet};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("Vesting periods sum to {periods}, original vesting is {original}")]
    PeriodMismatch { periods: String, original: String },
    #[error("Vesting end time {end} precedes start time {start}")]
    InvalidTimes { start: i64, end: i64 },
}

/// One unlock step of a periodic vesting schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingPeriod {
    pub length_seconds: i64,
    pub amount: CoinSet,
}

/// Periodic vesting schedule, times in unix seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub original_vesting: CoinSet,
    pub delegated_vesting: CoinSet,
    pub delegated_free: CoinSet,
    pub periods: Vec<VestingPeriod>,
    pub start_time: i64,
    pub end_time: i64,
}

impl VestingSchedule {
    /// Check that the periods add up to the original vesting amount
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.end_time < self.start_time {
            return Err(AccountError::InvalidTimes {
                start: self.start_time,
                end: self.end_time,
            });
        }
        let total = self
            .periods
            .iter()
            .fold(CoinSet::new(), |acc, period| acc.add(&period.amount));
        if total != self.original_vesting {
            return Err(AccountError::PeriodMismatch {
                periods: total.to_string(),
                original: self.original_vesting.to_string(),
            });
        }
        Ok(())
    }

    /// Coins unlocked at `time`: every period whose cumulative end is <= time
    pub fn vested_coins(&self, time: DateTime<Utc>) -> CoinSet {
        let now = time.timestamp();
        if now <= self.start_time {
            return CoinSet::new();
        }
        if now >= self.end_time {
            return self.original_vesting.clone();
        }

        let mut vested = CoinSet::new();
        let mut period_start = self.start_time;
        for period in &self.periods {
            if now - period_start < period.length_seconds {
                break;
            }
            vested = vested.add(&period.amount);
            period_start += period.length_seconds;
        }
        vested
    }

    /// Coins still locked at `time`
    pub fn vesting_coins(&self, time: DateTime<Utc>) -> CoinSet {
        self.original_vesting
            .saturating_sub(&self.vested_coins(time))
    }

    /// Locked coins that are still held in the account balance
    pub fn locked_coins(&self, time: DateTime<Utc>) -> CoinSet {
        self.vesting_coins(time)
            .saturating_sub(&self.delegated_vesting)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "schedule", rename_all = "snake_case")]
pub enum AccountKind {
    Base,
    Vesting(VestingSchedule),
}

/// Account state at a specific height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
    pub coins: CoinSet,
    pub kind: AccountKind,
}

impl Account {
    /// A base account with no vesting schedule
    pub fn base(address: &str, account_number: u64, sequence: u64, coins: CoinSet) -> Self {
        Self {
            address: address.to_string(),
            account_number,
            sequence,
            coins,
            kind: AccountKind::Base,
        }
    }

    /// An account that has never received funds
    pub fn empty(address: &str) -> Self {
        Self::base(address, 0, 0, CoinSet::new())
    }

    pub fn vesting_schedule(&self) -> Option<&VestingSchedule> {
        match &self.kind {
            AccountKind::Base => None,
            AccountKind::Vesting(schedule) => Some(schedule),
        }
    }
}

/// Stake bonded to one validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub validator_address: String,
    pub balance: Coin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbondingEntry {
    pub creation_height: u64,
    pub completion_time: DateTime<Utc>,
    #[serde(with = "amount_string")]
    pub balance: BigUint,
}

/// Stake being released from one validator, always in the staking denom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub validator_address: String,
    pub entries: Vec<UnbondingEntry>,
}
