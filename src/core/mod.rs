//! Chain model and the pure engines built on it
//!
//! - Currencies, coins and exact decimals
//! - Accounts (base and vesting), delegations, blocks and events
//! - Balance decomposition into sub-accounts
//! - Operation mapping for transfers, fees and events

pub mod account;
pub mod balance;
pub mod block;
pub mod coin;
pub mod currency;
pub mod decimal;
pub mod operations;

pub use account::{
    Account, AccountError, AccountKind, Delegation, UnbondingDelegation, UnbondingEntry,
    VestingPeriod, VestingSchedule,
};
pub use balance::{split_staked, spendable_coins, BalanceCategory, BalanceDecomposer, StakingTotals};
pub use block::{Block, BlockHeader, BlockResults, Event, EventAttribute, TxResult};
pub use coin::{Coin, CoinError, CoinSet};
pub use currency::{Currency, CurrencyRegistry, STAKING_DENOM};
pub use decimal::{Dec, DecimalError};
pub use operations::{verify_balanced, OperationError, OperationMapper};
