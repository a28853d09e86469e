//! Transfer intent
//!
//! Recovers bank sends from an operation list and plans the gas and fee of
//! the transaction that carries them. Operation lists must consist of
//! transfer pairs, a debit followed by the matching credit; adjacent pairs
//! between the same two accounts form one multi-coin send.

use crate::codec::{CodecError, MsgSend, StdFee, StdTx};
use crate::config::ChainParameters;
use crate::core::operations::parse_signed;
use crate::core::{verify_balanced, CoinSet, CurrencyRegistry, Dec, DecimalError};
use crate::crypto::validate_address;
use crate::error::ApiError;
use crate::types::{Operation, OperationType};
use num_bigint::{BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

/// Everything needed to build the unsigned transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionIntent {
    pub msgs: Vec<MsgSend>,
    pub memo: String,
    pub gas_wanted: u64,
    pub gas_price: Dec,
    pub max_fee: Option<CoinSet>,
    pub required_signers: Vec<String>,
}

impl ConstructionIntent {
    /// Fee charged: `ceil(gas_price * gas_wanted)` in the fee denom
    pub fn fee(&self, fee_denom: &str) -> CoinSet {
        CoinSet::single(fee_denom, self.gas_price.mul_int_ceil(self.gas_wanted))
    }

    pub fn unsigned_tx(&self, fee_denom: &str) -> Result<StdTx, CodecError> {
        let msgs = self
            .msgs
            .iter()
            .map(MsgSend::to_msg)
            .collect::<Result<Vec<_>, _>>()?;
        let fee = StdFee {
            amount: self.fee(fee_denom),
            gas: self.gas_wanted,
        };
        Ok(StdTx::new(msgs, fee, &self.memo))
    }
}

fn unclear(reason: impl Into<String>) -> ApiError {
    ApiError::UnclearIntent(reason.into())
}

/// Sends described by `ops`
pub fn parse_operations(
    ops: &[Operation],
    registry: &CurrencyRegistry,
    params: &ChainParameters,
) -> Result<Vec<MsgSend>, ApiError> {
    if ops.is_empty() {
        return Err(ApiError::NoOperations);
    }
    if ops.len() % 2 != 0 {
        return Err(unclear(format!("odd number of operations: {}", ops.len())));
    }
    if let Some(op) = ops
        .iter()
        .find(|op| OperationType::parse(&op.kind) != Some(OperationType::Transfer))
    {
        return Err(unclear(format!("unsupported operation type {}", op.kind)));
    }
    verify_balanced(ops).map_err(|e| unclear(e.to_string()))?;

    let mut sends: Vec<MsgSend> = Vec::new();
    for (pair, chunk) in ops.chunks(2).enumerate() {
        let (debit, credit) = (&chunk[0], &chunk[1]);
        let (from, denom, amount) = leg(debit, 2 * pair, Sign::Minus, registry, params)?;
        let (to, credit_denom, credit_amount) =
            leg(credit, 2 * pair + 1, Sign::Plus, registry, params)?;
        if credit_denom != denom || credit_amount != amount {
            return Err(unclear(format!(
                "operation {} does not negate operation {}",
                2 * pair + 1,
                2 * pair
            )));
        }
        let related = credit.related_indices();
        if !related.is_empty() && related != [debit.index()] {
            return Err(unclear(format!(
                "operation {} must relate to operation {}",
                credit.index(),
                debit.index()
            )));
        }

        let coins = CoinSet::single(denom, amount);
        match sends.last_mut() {
            Some(last) if last.from_address == from && last.to_address == to => {
                if !last.amount.amount_of(denom).is_zero() {
                    return Err(unclear(format!("currency repeated in transfer {}", pair)));
                }
                last.amount = last.amount.add(&coins);
            }
            _ => sends.push(MsgSend::new(&from, &to, coins)),
        }
    }
    Ok(sends)
}

/// Account, denom and magnitude of one leg of a transfer
fn leg(
    op: &Operation,
    position: usize,
    expected: Sign,
    registry: &CurrencyRegistry,
    params: &ChainParameters,
) -> Result<(String, &'static str, BigUint), ApiError> {
    let account = op
        .account
        .as_ref()
        .ok_or_else(|| unclear(format!("operation {} has no account", position)))?;
    if account.sub_account.is_some() {
        return Err(unclear(format!("operation {} uses a sub-account", position)));
    }
    validate_address(&account.address, &params.account_prefix).map_err(|e| {
        ApiError::InvalidAddress {
            field: format!("operations[{}].account.address", position),
            reason: e.to_string(),
        }
    })?;

    let amount = op
        .amount
        .as_ref()
        .ok_or_else(|| unclear(format!("operation {} has no amount", position)))?;
    let denom = registry
        .denom(&amount.currency)
        .ok_or_else(|| unclear(format!("unrecognized currency {}", amount.currency.symbol)))?;
    let value = parse_signed(&amount.value).ok_or_else(|| ApiError::InvalidCurrencyAmount {
        field: format!("operations[{}].amount.value", position),
        reason: format!("not an integer: {:?}", amount.value),
    })?;
    if value.sign() != expected {
        let side = if expected == Sign::Minus { "debit" } else { "credit" };
        return Err(unclear(format!(
            "operation {} must be a non-zero {}",
            position, side
        )));
    }

    Ok((account.address.clone(), denom, value.magnitude().clone()))
}

/// Signers in order of first appearance
pub fn required_signers(sends: &[MsgSend]) -> Vec<String> {
    let mut signers: Vec<String> = Vec::new();
    for send in sends {
        if !signers.contains(&send.from_address) {
            signers.push(send.from_address.clone());
        }
    }
    signers
}

/// `ceil(sum of per-message gas * adjustment)`
pub fn estimate_gas(msg_types: &[&str], params: &ChainParameters, adjustment: &Dec) -> u64 {
    let total: u64 = msg_types.iter().map(|kind| params.gas_for(kind)).sum();
    let adjusted = adjustment.mul_int_ceil(total);
    adjusted.to_u64().unwrap_or(u64::MAX)
}

/// Gas price from the minimum price and the multiplier, lowered when the
/// resulting fee would exceed `max_fee`
pub fn gas_price(
    params: &ChainParameters,
    multiplier: &Dec,
    max_fee: Option<&CoinSet>,
    gas_wanted: u64,
) -> Result<Dec, DecimalError> {
    let price = params.min_gas_price.mul(multiplier);
    let Some(max_fee) = max_fee else {
        return Ok(price);
    };
    let cap = max_fee.amount_of(&params.fee_denom);
    if price.mul_int_ceil(gas_wanted) <= cap {
        return Ok(price);
    }
    Dec::quotient(&cap, gas_wanted)
}
