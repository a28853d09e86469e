//! Operation mapping
//!
//! Converts messages, fees and execution events into Rosetta operations.
//!
//! Every coin moved between two accounts becomes a debit at index `i`
//! attributed to the sender and a credit at `i + 1` attributed to the
//! recipient, with the credit relating back to the debit. Denominations the
//! registry does not recognize are dropped.

use crate::core::block::Event;
use crate::core::coin::CoinSet;
use crate::core::currency::{Currency, CurrencyRegistry};
use crate::types::{
    AccountIdentifier, Amount, Operation, OperationIdentifier, OperationStatus, OperationType,
};
use num_bigint::{BigInt, BigUint, Sign};
use std::collections::BTreeMap;
use thiserror::Error;

/// Violations of the operation-list invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Operation at position {position} has index {index}")]
    NonDenseIndex { position: usize, index: i64 },
    #[error("Operation {0} has no amount")]
    MissingAmount(i64),
    #[error("Operation {0} has a malformed amount")]
    InvalidAmount(i64),
    #[error("Operation {index} relates to {related}, which is not an earlier debit")]
    InvalidRelation { index: i64, related: i64 },
    #[error("Operation {0} is not the exact negation of its debit")]
    UnmatchedCredit(i64),
    #[error("Operations for {0} do not sum to zero")]
    Unbalanced(String),
}

/// Maps chain activity onto operations
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationMapper {
    registry: CurrencyRegistry,
}

impl OperationMapper {
    pub fn new(registry: CurrencyRegistry) -> Self {
        Self { registry }
    }

    /// Debit/credit pairs moving `coins` from `from` to `to`
    pub fn map_transfer(
        &self,
        from: &str,
        to: &str,
        coins: &CoinSet,
        status: OperationStatus,
        start: i64,
    ) -> Vec<Operation> {
        self.pairs(OperationType::Transfer, from, to, coins, status, start)
    }

    /// Fee pairs; fees are charged whatever the transaction outcome
    pub fn map_fee(
        &self,
        payer: &str,
        fee_collector: &str,
        coins: &CoinSet,
        start: i64,
    ) -> Vec<Operation> {
        self.pairs(
            OperationType::Fee,
            payer,
            fee_collector,
            coins,
            OperationStatus::Success,
            start,
        )
    }

    /// Operations for `transfer`, `coinbase` and `burn` events
    pub fn map_events(&self, events: &[Event], start: i64) -> Vec<Operation> {
        let mut ops = Vec::new();
        for event in events {
            let next = start + ops.len() as i64;
            let mapped = match event.kind.as_str() {
                "transfer" => self.map_transfer_event(event, next),
                "coinbase" => self.map_single(event, "minter", OperationType::Mint, next),
                "burn" => self.map_single(event, "burner", OperationType::Burn, next),
                _ => Vec::new(),
            };
            ops.extend(mapped);
        }
        ops
    }

    fn map_transfer_event(&self, event: &Event, start: i64) -> Vec<Operation> {
        let (Some(sender), Some(recipient)) =
            (event.attribute("sender"), event.attribute("recipient"))
        else {
            log::warn!("skipping transfer event without sender or recipient");
            return Vec::new();
        };
        match event_coins(event) {
            Some(coins) => self.map_transfer(
                sender,
                recipient,
                &coins,
                OperationStatus::Success,
                start,
            ),
            None => Vec::new(),
        }
    }

    fn map_single(
        &self,
        event: &Event,
        account_key: &str,
        kind: OperationType,
        start: i64,
    ) -> Vec<Operation> {
        let Some(account) = event.attribute(account_key) else {
            log::warn!("skipping {} event without {}", event.kind, account_key);
            return Vec::new();
        };
        let Some(coins) = event_coins(event) else {
            return Vec::new();
        };
        let negative = kind == OperationType::Burn;

        self.recognized(&coins)
            .enumerate()
            .map(|(i, (currency, amount))| {
                operation(
                    start + i as i64,
                    kind,
                    OperationStatus::Success,
                    account,
                    signed_amount(amount, negative),
                    currency,
                    None,
                )
            })
            .collect()
    }

    fn pairs(
        &self,
        kind: OperationType,
        from: &str,
        to: &str,
        coins: &CoinSet,
        status: OperationStatus,
        start: i64,
    ) -> Vec<Operation> {
        let mut ops = Vec::new();
        for (currency, amount) in self.recognized(coins) {
            let debit = start + ops.len() as i64;
            ops.push(operation(
                debit,
                kind,
                status,
                from,
                signed_amount(amount, true),
                currency.clone(),
                None,
            ));
            ops.push(operation(
                debit + 1,
                kind,
                status,
                to,
                signed_amount(amount, false),
                currency,
                Some(debit),
            ));
        }
        ops
    }

    fn recognized<'c>(
        &'c self,
        coins: &'c CoinSet,
    ) -> impl Iterator<Item = (Currency, &'c BigUint)> + 'c {
        coins.iter().filter_map(move |(denom, amount)| {
            self.registry
                .currency(denom)
                .map(|currency| (currency, amount))
        })
    }
}

fn event_coins(event: &Event) -> Option<CoinSet> {
    let raw = event.attribute("amount")?;
    match raw.parse::<CoinSet>() {
        Ok(coins) => Some(coins),
        Err(e) => {
            log::warn!("skipping {} event with amount {:?}: {}", event.kind, raw, e);
            None
        }
    }
}

fn signed_amount(amount: &BigUint, negative: bool) -> String {
    if negative {
        format!("-{}", amount)
    } else {
        amount.to_string()
    }
}

fn operation(
    index: i64,
    kind: OperationType,
    status: OperationStatus,
    address: &str,
    value: String,
    currency: Currency,
    related: Option<i64>,
) -> Operation {
    Operation {
        operation_identifier: OperationIdentifier { index },
        related_operations: related.map(|index| vec![OperationIdentifier { index }]),
        kind: kind.as_str().to_string(),
        status: status.as_wire(),
        account: Some(AccountIdentifier::new(address)),
        amount: Some(Amount { value, currency }),
    }
}

/// Parse a signed integer amount, rejecting signs other than a leading '-'
pub fn parse_signed(value: &str) -> Option<BigInt> {
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (Sign::Minus, rest),
        None => (Sign::Plus, value),
    };
    let magnitude = crate::core::coin::parse_amount(digits).ok()?;
    Some(BigInt::from_biguint(sign, magnitude))
}

fn amount_of(op: &Operation) -> Result<(BigInt, &Currency), OperationError> {
    let amount = op
        .amount
        .as_ref()
        .ok_or(OperationError::MissingAmount(op.index()))?;
    let value = parse_signed(&amount.value).ok_or(OperationError::InvalidAmount(op.index()))?;
    Ok((value, &amount.currency))
}

/// Check the invariants of an operation list:
///
/// - indices are dense and start at zero
/// - a credit relates to exactly one earlier debit with the negated amount
/// - a debit relates to nothing
/// - fee and transfer amounts sum to zero per currency
pub fn verify_balanced(ops: &[Operation]) -> Result<(), OperationError> {
    let mut sums: BTreeMap<String, BigInt> = BTreeMap::new();

    for (position, op) in ops.iter().enumerate() {
        if op.index() != position as i64 {
            return Err(OperationError::NonDenseIndex {
                position,
                index: op.index(),
            });
        }
        let paired = matches!(
            OperationType::parse(&op.kind),
            Some(OperationType::Fee) | Some(OperationType::Transfer)
        );
        let (value, currency) = amount_of(op)?;

        let related = op.related_indices();
        match related.as_slice() {
            [] => {}
            [debit_index] => {
                let debit = usize::try_from(*debit_index)
                    .ok()
                    .filter(|i| *i < position)
                    .map(|i| &ops[i])
                    .filter(|d| d.related_indices().is_empty())
                    .ok_or(OperationError::InvalidRelation {
                        index: op.index(),
                        related: *debit_index,
                    })?;
                let (debit_value, debit_currency) = amount_of(debit)?;
                if debit_currency != currency || debit_value != -value.clone() {
                    return Err(OperationError::UnmatchedCredit(op.index()));
                }
            }
            [_, extra, ..] => {
                return Err(OperationError::InvalidRelation {
                    index: op.index(),
                    related: *extra,
                })
            }
        }

        if paired {
            *sums.entry(currency.symbol.clone()).or_default() += value;
        }
    }

    match sums.into_iter().find(|(_, sum)| sum.sign() != Sign::NoSign) {
        Some((symbol, _)) => Err(OperationError::Unbalanced(symbol)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "kava1alice";
    const BOB: &str = "kava1bob";
    const COLLECTOR: &str = "kava1collector";

    fn coins(s: &str) -> CoinSet {
        s.parse().unwrap()
    }

    fn mapper() -> OperationMapper {
        OperationMapper::new(CurrencyRegistry)
    }

    fn address(op: &Operation) -> &str {
        &op.account.as_ref().unwrap().address
    }

    fn value(op: &Operation) -> &str {
        &op.amount.as_ref().unwrap().value
    }

    #[test]
    fn test_transfer_pairs() {
        let ops = mapper().map_transfer(
            ALICE,
            BOB,
            &coins("5hard,100ukava"),
            OperationStatus::Success,
            0,
        );
        assert_eq!(ops.len(), 4);
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(op.index(), i as i64);
            assert_eq!(op.kind, "transfer");
            assert_eq!(op.status.as_deref(), Some("success"));
        }
        assert_eq!(value(&ops[0]), "-5");
        assert_eq!(value(&ops[1]), "5");
        assert_eq!(ops[1].related_indices(), vec![0]);
        assert_eq!(ops[3].amount.as_ref().unwrap().currency.symbol, "KAVA");
        assert!(verify_balanced(&ops).is_ok());
    }

    #[test]
    fn debit_is_attributed_to_sender() {
        let ops = mapper().map_transfer(ALICE, BOB, &coins("1ukava"), OperationStatus::Success, 0);
        assert_eq!(address(&ops[0]), ALICE);
        assert!(value(&ops[0]).starts_with('-'));
        assert_eq!(address(&ops[1]), BOB);
        assert!(!value(&ops[1]).starts_with('-'));
    }

    #[test]
    fn test_unrecognized_denoms_are_dropped() {
        let ops = mapper().map_transfer(
            ALICE,
            BOB,
            &coins("7ibc/ABCDEF,3ukava"),
            OperationStatus::Failure,
            4,
        );
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].index(), 4);
        assert_eq!(ops[1].related_indices(), vec![4]);
        assert_eq!(ops[1].status.as_deref(), Some("failure"));
    }

    #[test]
    fn test_fee_is_always_success() {
        let ops = mapper().map_fee(ALICE, COLLECTOR, &coins("500ukava"), 0);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.status.as_deref() == Some("success")));
        assert!(ops.iter().all(|op| op.kind == "fee"));
        assert_eq!(address(&ops[1]), COLLECTOR);
    }

    #[test]
    fn test_fee_then_failed_transfer_is_balanced() {
        let m = mapper();
        let mut ops = m.map_fee(ALICE, COLLECTOR, &coins("500ukava"), 0);
        let next = ops.len() as i64;
        ops.extend(m.map_transfer(ALICE, BOB, &coins("9usdx,1swp"), OperationStatus::Failure, next));
        assert_eq!(ops.len(), 6);
        assert!(verify_balanced(&ops).is_ok());
    }

    #[test]
    fn test_map_events() {
        let events = vec![
            Event::new("coinbase", &[("minter", "kava1mint"), ("amount", "1000ukava")]),
            Event::new("message", &[("action", "send")]),
            Event::new(
                "transfer",
                &[("recipient", BOB), ("sender", ALICE), ("amount", "2ukava,4hard")],
            ),
            Event::new("burn", &[("burner", "kava1burn"), ("amount", "3usdx")]),
            Event::new("transfer", &[("recipient", BOB), ("amount", "2ukava")]),
            Event::new("transfer", &[("recipient", BOB), ("sender", ALICE), ("amount", "bogus")]),
        ];
        let ops = mapper().map_events(&events, 0);

        let kinds: Vec<&str> = ops.iter().map(|op| op.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["mint", "transfer", "transfer", "transfer", "transfer", "burn"]
        );
        assert_eq!(value(&ops[0]), "1000");
        assert_eq!(value(&ops[5]), "-3");
        assert_eq!(address(&ops[1]), ALICE);
        assert_eq!(ops[2].related_indices(), vec![1]);
        assert_eq!(ops[4].related_indices(), vec![3]);
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(op.index(), i as i64);
        }
        assert!(verify_balanced(&ops).is_ok());
    }

    #[test]
    fn test_verify_rejects_broken_lists() {
        let ops = mapper().map_transfer(ALICE, BOB, &coins("10ukava"), OperationStatus::Success, 0);

        let mut wrong_amount = ops.clone();
        wrong_amount[1].amount.as_mut().unwrap().value = "9".to_string();
        assert_eq!(
            verify_balanced(&wrong_amount),
            Err(OperationError::UnmatchedCredit(1))
        );

        let mut forward = ops.clone();
        forward[0].related_operations = Some(vec![OperationIdentifier { index: 1 }]);
        assert!(matches!(
            verify_balanced(&forward),
            Err(OperationError::InvalidRelation { index: 0, .. })
        ));

        let mut unrelated = ops.clone();
        unrelated[1].related_operations = None;
        unrelated[1].amount.as_mut().unwrap().value = "11".to_string();
        assert_eq!(
            verify_balanced(&unrelated),
            Err(OperationError::Unbalanced("KAVA".to_string()))
        );

        assert!(matches!(
            verify_balanced(&ops[1..]),
            Err(OperationError::NonDenseIndex { .. })
        ));
    }

    #[test]
    fn test_parse_signed() {
        assert_eq!(parse_signed("-15"), Some(BigInt::from(-15)));
        assert_eq!(parse_signed("15"), Some(BigInt::from(15)));
        assert_eq!(parse_signed("+15"), None);
        assert_eq!(parse_signed("--1"), None);
        assert_eq!(parse_signed("1.5"), None);
    }
}
