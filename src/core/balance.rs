//! Balance decomposition
//!
//! Splits an account's holdings into the sub-account categories reported by
//! `/account/balance`:
//!
//! - `liquid` (also the default, with no sub-account): spendable coins
//! - `vesting`: coins still locked by a vesting schedule
//! - `liquid_delegated` / `vesting_delegated`: bonded stake
//! - `liquid_unbonding` / `vesting_unbonding`: stake being released
//!
//! The staking categories read delegations and unbonding delegations at the
//! header's height and only ever report the staking denomination.

use crate::client::{ChainClient, ClientError, Height};
use crate::config::ChainParameters;
use crate::core::account::{Account, AccountKind};
use crate::core::block::BlockHeader;
use crate::core::coin::CoinSet;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::Zero;
use std::cmp::min;

/// Sub-account categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceCategory {
    /// No sub-account
    Total,
    Liquid,
    LiquidDelegated,
    LiquidUnbonding,
    Vesting,
    VestingDelegated,
    VestingUnbonding,
    Unrecognized(String),
}

impl BalanceCategory {
    pub const NAMED: [BalanceCategory; 6] = [
        BalanceCategory::Liquid,
        BalanceCategory::LiquidDelegated,
        BalanceCategory::LiquidUnbonding,
        BalanceCategory::Vesting,
        BalanceCategory::VestingDelegated,
        BalanceCategory::VestingUnbonding,
    ];

    pub fn from_sub_account(sub_account: Option<&str>) -> Self {
        match sub_account {
            None => BalanceCategory::Total,
            Some("liquid") => BalanceCategory::Liquid,
            Some("liquid_delegated") => BalanceCategory::LiquidDelegated,
            Some("liquid_unbonding") => BalanceCategory::LiquidUnbonding,
            Some("vesting") => BalanceCategory::Vesting,
            Some("vesting_delegated") => BalanceCategory::VestingDelegated,
            Some("vesting_unbonding") => BalanceCategory::VestingUnbonding,
            Some(other) => BalanceCategory::Unrecognized(other.to_string()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            BalanceCategory::Total => None,
            BalanceCategory::Liquid => Some("liquid"),
            BalanceCategory::LiquidDelegated => Some("liquid_delegated"),
            BalanceCategory::LiquidUnbonding => Some("liquid_unbonding"),
            BalanceCategory::Vesting => Some("vesting"),
            BalanceCategory::VestingDelegated => Some("vesting_delegated"),
            BalanceCategory::VestingUnbonding => Some("vesting_unbonding"),
            BalanceCategory::Unrecognized(name) => Some(name.as_str()),
        }
    }

    fn is_staking(&self) -> bool {
        matches!(
            self,
            BalanceCategory::LiquidDelegated
                | BalanceCategory::LiquidUnbonding
                | BalanceCategory::VestingDelegated
                | BalanceCategory::VestingUnbonding
        )
    }
}

/// Bonded and unbonding stake, staking denom only
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StakingTotals {
    pub delegated: BigUint,
    pub unbonding: BigUint,
}

/// Attribution of staked coins to the liquid and vesting pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakedSplit {
    pub liquid_delegated: BigUint,
    pub vesting_delegated: BigUint,
    pub liquid_unbonding: BigUint,
    pub vesting_unbonding: BigUint,
}

/// Split staked coins given the account's `delegated_free` amount.
///
/// Free capacity is attributed greedily; the vesting share of bonded stake is
/// capped at what is actually delegated.
pub fn split_staked(totals: &StakingTotals, delegated_free: &BigUint) -> StakedSplit {
    let delegated = &totals.delegated;
    let unbonding = &totals.unbonding;

    let total_staked = delegated + unbonding;
    let total_free = min(&total_staked, delegated_free).clone();
    let staked_vesting = min(&total_staked - &total_free, delegated.clone());
    let staked_free = delegated - &staked_vesting;
    let unbonding_free = min(delegated_free, unbonding).clone();
    let unbonding_vesting = unbonding - &unbonding_free;

    StakedSplit {
        liquid_delegated: staked_free,
        vesting_delegated: staked_vesting,
        liquid_unbonding: unbonding_free,
        vesting_unbonding: unbonding_vesting,
    }
}

/// Coins the account can transfer at `time`
pub fn spendable_coins(account: &Account, time: DateTime<Utc>) -> CoinSet {
    match &account.kind {
        AccountKind::Base => account.coins.clone(),
        AccountKind::Vesting(schedule) => {
            account.coins.saturating_sub(&schedule.locked_coins(time))
        }
    }
}

/// Computes sub-account balances against a chain snapshot
pub struct BalanceDecomposer<'a, C> {
    client: &'a C,
    params: &'a ChainParameters,
}

impl<'a, C: ChainClient> BalanceDecomposer<'a, C> {
    pub fn new(client: &'a C, params: &'a ChainParameters) -> Self {
        Self { client, params }
    }

    /// Balance of `category` for `account` as of `header`.
    ///
    /// Staking categories fail if either staking read fails; unrecognized
    /// categories yield an empty set.
    pub async fn decompose(
        &self,
        account: &Account,
        header: &BlockHeader,
        category: &BalanceCategory,
    ) -> Result<CoinSet, ClientError> {
        if category.is_staking() {
            let totals = self.staking_totals(&account.address, header.height).await?;
            return Ok(self.staked_balance(account, &totals, category));
        }

        let spendable = spendable_coins(account, header.time);
        let balance = match category {
            BalanceCategory::Total | BalanceCategory::Liquid => spendable,
            BalanceCategory::Vesting => account.coins.saturating_sub(&spendable),
            _ => CoinSet::new(),
        };
        Ok(balance)
    }

    /// Pure part of the staking categories
    pub fn staked_balance(
        &self,
        account: &Account,
        totals: &StakingTotals,
        category: &BalanceCategory,
    ) -> CoinSet {
        let split = match &account.kind {
            AccountKind::Base => StakedSplit {
                liquid_delegated: totals.delegated.clone(),
                vesting_delegated: BigUint::zero(),
                liquid_unbonding: totals.unbonding.clone(),
                vesting_unbonding: BigUint::zero(),
            },
            AccountKind::Vesting(schedule) => split_staked(
                totals,
                &schedule.delegated_free.amount_of(&self.params.staking_denom),
            ),
        };

        let amount = match category {
            BalanceCategory::LiquidDelegated => split.liquid_delegated,
            BalanceCategory::VestingDelegated => split.vesting_delegated,
            BalanceCategory::LiquidUnbonding => split.liquid_unbonding,
            BalanceCategory::VestingUnbonding => split.vesting_unbonding,
            _ => BigUint::zero(),
        };
        CoinSet::single(&self.params.staking_denom, amount)
    }

    /// Bonded and unbonding totals at `height`, read concurrently
    pub async fn staking_totals(
        &self,
        address: &str,
        height: u64,
    ) -> Result<StakingTotals, ClientError> {
        let (delegations, unbondings) = futures::try_join!(
            self.client.delegations(address, Height::At(height)),
            self.client.unbonding_delegations(address, Height::At(height)),
        )?;

        let denom = &self.params.staking_denom;
        let delegated = delegations
            .iter()
            .filter(|d| &d.balance.denom == denom)
            .fold(BigUint::zero(), |acc, d| acc + &d.balance.amount);
        let unbonding = unbondings
            .iter()
            .flat_map(|u| u.entries.iter())
            .fold(BigUint::zero(), |acc, e| acc + &e.balance);

        log::debug!(
            "staking totals for {} at {}: delegated={} unbonding={}",
            address,
            height,
            delegated,
            unbonding
        );

        Ok(StakingTotals {
            delegated,
            unbonding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;
    use crate::core::account::{
        Delegation, UnbondingDelegation, UnbondingEntry, VestingPeriod, VestingSchedule,
    };
    use crate::core::coin::Coin;
    use chrono::TimeZone;

    const ADDR: &str = "kava1qqqsyqcyq5rqwzqfpg9scrgwpugpzysnvdq4yl";

    fn coins(s: &str) -> CoinSet {
        s.parse().unwrap()
    }

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn header(secs: i64) -> BlockHeader {
        BlockHeader {
            height: 100,
            hash: "AB".repeat(32),
            parent_hash: "CD".repeat(32),
            time: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn vesting_account(delegated_free: &str, delegated_vesting: &str) -> Account {
        Account {
            address: ADDR.to_string(),
            account_number: 7,
            sequence: 1,
            coins: coins("1000000ukava,10hard"),
            kind: AccountKind::Vesting(VestingSchedule {
                original_vesting: coins("800000ukava"),
                delegated_vesting: coins(delegated_vesting),
                delegated_free: coins(delegated_free),
                periods: vec![
                    VestingPeriod {
                        length_seconds: 100,
                        amount: coins("300000ukava"),
                    },
                    VestingPeriod {
                        length_seconds: 100,
                        amount: coins("500000ukava"),
                    },
                ],
                start_time: 1_000,
                end_time: 1_200,
            }),
        }
    }

    fn staked_client(delegated: u64, unbonding: u64) -> MemoryClient {
        MemoryClient::new("kava-test")
            .with_delegations(
                ADDR,
                vec![
                    Delegation {
                        validator_address: "kavavaloper1a".to_string(),
                        balance: Coin::new("ukava", delegated),
                    },
                    Delegation {
                        validator_address: "kavavaloper1b".to_string(),
                        balance: Coin::new("hard", 99u32),
                    },
                ],
            )
            .with_unbonding_delegations(
                ADDR,
                vec![UnbondingDelegation {
                    validator_address: "kavavaloper1a".to_string(),
                    entries: vec![UnbondingEntry {
                        creation_height: 90,
                        completion_time: Utc.timestamp_opt(5_000, 0).unwrap(),
                        balance: big(unbonding),
                    }],
                }],
            )
    }

    #[test]
    fn test_category_names() {
        for category in BalanceCategory::NAMED.iter() {
            let parsed = BalanceCategory::from_sub_account(category.name());
            assert_eq!(&parsed, category);
        }
        assert_eq!(BalanceCategory::from_sub_account(None), BalanceCategory::Total);
        assert_eq!(
            BalanceCategory::from_sub_account(Some("rewards")),
            BalanceCategory::Unrecognized("rewards".to_string())
        );
    }

    #[test]
    fn test_split_reference_scenario() {
        let totals = StakingTotals {
            delegated: big(750_000),
            unbonding: big(500_000),
        };
        let split = split_staked(&totals, &big(1_000_000));
        assert_eq!(split.liquid_delegated, big(500_000));
        assert_eq!(split.vesting_delegated, big(250_000));
        assert_eq!(split.liquid_unbonding, big(500_000));
        assert_eq!(split.vesting_unbonding, big(0));
    }

    #[test]
    fn test_split_preserves_totals() {
        let values = [0u64, 1, 7, 250_000, 500_000, 1_000_000];
        for delegated in values {
            for unbonding in values {
                for free in values {
                    let totals = StakingTotals {
                        delegated: big(delegated),
                        unbonding: big(unbonding),
                    };
                    let split = split_staked(&totals, &big(free));
                    assert_eq!(
                        &split.liquid_delegated + &split.vesting_delegated,
                        big(delegated)
                    );
                    assert_eq!(
                        &split.liquid_unbonding + &split.vesting_unbonding,
                        big(unbonding)
                    );
                    assert!(split.vesting_delegated <= big(delegated));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_base_account_scenario() {
        let client = MemoryClient::new("kava-test");
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = Account::base(ADDR, 1, 0, coins("1000000ukava"));
        let h = header(10_000);

        let total = decomposer
            .decompose(&account, &h, &BalanceCategory::Total)
            .await
            .unwrap();
        assert_eq!(total, coins("1000000ukava"));

        let vesting = decomposer
            .decompose(&account, &h, &BalanceCategory::Vesting)
            .await
            .unwrap();
        assert!(vesting.is_empty());

        let delegated = decomposer
            .decompose(&account, &h, &BalanceCategory::VestingDelegated)
            .await
            .unwrap();
        assert!(delegated.is_empty());
    }

    #[tokio::test]
    async fn test_liquid_plus_vesting_is_owned() {
        let client = MemoryClient::new("kava-test");
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = vesting_account("", "100000ukava");

        for secs in [0, 1_000, 1_050, 1_100, 1_150, 1_200, 9_999] {
            let h = header(secs);
            let liquid = decomposer
                .decompose(&account, &h, &BalanceCategory::Liquid)
                .await
                .unwrap();
            let vesting = decomposer
                .decompose(&account, &h, &BalanceCategory::Vesting)
                .await
                .unwrap();
            assert_eq!(liquid.add(&vesting), account.coins, "at {}", secs);
        }

        // Before any unlock: 800k vesting, 100k of it delegated
        let vesting = decomposer
            .decompose(&account, &header(1_000), &BalanceCategory::Vesting)
            .await
            .unwrap();
        assert_eq!(vesting, coins("700000ukava"));
    }

    #[tokio::test]
    async fn test_vesting_account_staking_categories() {
        let client = staked_client(750_000, 500_000);
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = vesting_account("1000000ukava", "");
        let h = header(1_050);

        let mut results = Vec::new();
        for category in [
            BalanceCategory::LiquidDelegated,
            BalanceCategory::VestingDelegated,
            BalanceCategory::LiquidUnbonding,
            BalanceCategory::VestingUnbonding,
        ] {
            results.push(decomposer.decompose(&account, &h, &category).await.unwrap());
        }
        assert_eq!(results[0], coins("500000ukava"));
        assert_eq!(results[1], coins("250000ukava"));
        assert_eq!(results[2], coins("500000ukava"));
        assert!(results[3].is_empty());
    }

    #[tokio::test]
    async fn test_base_account_staking_is_liquid() {
        let client = staked_client(40, 2);
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = Account::base(ADDR, 1, 0, coins("5ukava"));
        let h = header(1);

        let delegated = decomposer
            .decompose(&account, &h, &BalanceCategory::LiquidDelegated)
            .await
            .unwrap();
        let unbonding = decomposer
            .decompose(&account, &h, &BalanceCategory::LiquidUnbonding)
            .await
            .unwrap();
        assert_eq!(delegated, coins("40ukava"));
        assert_eq!(unbonding, coins("2ukava"));
    }

    #[tokio::test]
    async fn test_staking_read_errors_propagate() {
        let client = staked_client(1, 1)
            .failing_with(ClientError::Request("connection refused".to_string()));
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = Account::base(ADDR, 1, 0, coins("5ukava"));

        let result = decomposer
            .decompose(&account, &header(1), &BalanceCategory::LiquidUnbonding)
            .await;
        assert_eq!(
            result,
            Err(ClientError::Request("connection refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unrecognized_category_is_empty() {
        let client = MemoryClient::new("kava-test")
            .failing_with(ClientError::Request("unreachable".to_string()));
        let params = ChainParameters::kava("kava-test");
        let decomposer = BalanceDecomposer::new(&client, &params);
        let account = Account::base(ADDR, 1, 0, coins("5ukava"));

        let balance = decomposer
            .decompose(
                &account,
                &header(1),
                &BalanceCategory::Unrecognized("rewards".to_string()),
            )
            .await
            .unwrap();
        assert!(balance.is_empty());
    }
}
