//! Account balances
//!
//! The block is resolved once per request; the account and every staking
//! read are then issued at that block's height.

use super::fetch_block;
use crate::client::{ChainClient, Height};
use crate::config::ChainParameters;
use crate::core::{BalanceCategory, BalanceDecomposer, CurrencyRegistry};
use crate::crypto::validate_address;
use crate::error::ApiError;
use crate::types::{
    AccountBalanceRequest, AccountBalanceResponse, Amount, BlockIdentifier,
    PartialBlockIdentifier,
};
use serde_json::{json, Map};

pub struct BalanceService<'a, C> {
    client: &'a C,
    params: &'a ChainParameters,
    registry: CurrencyRegistry,
}

impl<'a, C: ChainClient> BalanceService<'a, C> {
    pub fn new(client: &'a C, params: &'a ChainParameters) -> Self {
        Self {
            client,
            params,
            registry: CurrencyRegistry,
        }
    }

    pub async fn account_balance(
        &self,
        request: &AccountBalanceRequest,
    ) -> Result<AccountBalanceResponse, ApiError> {
        let account_id = &request.account_identifier;
        validate_address(&account_id.address, &self.params.account_prefix).map_err(|e| {
            ApiError::InvalidAddress {
                field: "account_identifier.address".to_string(),
                reason: e.to_string(),
            }
        })?;

        let denoms = self.requested_denoms(request)?;
        let category = BalanceCategory::from_sub_account(
            account_id.sub_account.as_ref().map(|s| s.address.as_str()),
        );

        let partial = request.block_identifier.clone().unwrap_or_default();
        let header = self.pin(&partial).await?;
        log::debug!(
            "balance of {} ({:?}) pinned at {}",
            account_id.address,
            category,
            header.height
        );

        let account = self
            .client
            .account(&account_id.address, Height::At(header.height))
            .await?;
        let coins = BalanceDecomposer::new(self.client, self.params)
            .decompose(&account, &header, &category)
            .await?;

        let balances = denoms
            .iter()
            .filter_map(|denom| {
                self.registry.currency(denom).map(|currency| Amount {
                    value: coins.amount_of(denom).to_string(),
                    currency,
                })
            })
            .collect();

        let mut metadata = Map::new();
        metadata.insert("sequence".to_string(), json!(account.sequence));
        metadata.insert("account_number".to_string(), json!(account.account_number));

        Ok(AccountBalanceResponse {
            block_identifier: BlockIdentifier {
                index: header.height as i64,
                hash: header.hash,
            },
            balances,
            metadata: Some(metadata),
        })
    }

    async fn pin(
        &self,
        partial: &PartialBlockIdentifier,
    ) -> Result<crate::core::BlockHeader, ApiError> {
        Ok(fetch_block(self.client, partial).await?.header)
    }

    /// Denoms to report: the requested currencies, or every recognized one
    fn requested_denoms(
        &self,
        request: &AccountBalanceRequest,
    ) -> Result<Vec<&'static str>, ApiError> {
        match &request.currencies {
            None => Ok(self.registry.denoms()),
            Some(currencies) => currencies
                .iter()
                .map(|currency| {
                    self.registry
                        .denom(currency)
                        .ok_or_else(|| ApiError::InvalidCurrencyAmount {
                            field: "currencies".to_string(),
                            reason: format!(
                                "unrecognized currency {} with {} decimals",
                                currency.symbol, currency.decimals
                            ),
                        })
                })
                .collect(),
        }
    }
}
