//! Blocks as operations
//!
//! Each transaction becomes its fee operations followed by one transfer group
//! per bank send. Events emitted outside of transactions are reported as
//! pseudo-transactions `<BLOCKHASH>-BEGINBLOCK` and `<BLOCKHASH>-ENDBLOCK`
//! when they move coins.

use super::fetch_block;
use crate::client::ChainClient;
use crate::codec::{decode_tx, hash_tx, StdTx};
use crate::config::ChainParameters;
use crate::core::{Event, OperationMapper, TxResult};
use crate::error::ApiError;
use crate::types::{
    Block, BlockIdentifier, Operation, OperationStatus, PartialBlockIdentifier, Transaction,
    TransactionIdentifier,
};
use serde_json::{json, Map};

pub const BEGIN_BLOCK_SUFFIX: &str = "-BEGINBLOCK";
pub const END_BLOCK_SUFFIX: &str = "-ENDBLOCK";

pub struct BlockService<'a, C> {
    client: &'a C,
    params: &'a ChainParameters,
    mapper: OperationMapper,
}

impl<'a, C: ChainClient> BlockService<'a, C> {
    pub fn new(client: &'a C, params: &'a ChainParameters) -> Self {
        Self {
            client,
            params,
            mapper: OperationMapper::default(),
        }
    }

    pub async fn block(&self, partial: &PartialBlockIdentifier) -> Result<Block, ApiError> {
        let block = fetch_block(self.client, partial).await?;
        let header = &block.header;
        let results = self.client.block_results(header.height).await?;

        let mut transactions = Vec::with_capacity(block.txs.len() + 2);
        if let Some(tx) =
            self.events_transaction(&header.hash, BEGIN_BLOCK_SUFFIX, &results.begin_block_events)
        {
            transactions.push(tx);
        }
        for (i, raw) in block.txs.iter().enumerate() {
            transactions.push(self.transaction(raw, results.txs_results.get(i)));
        }
        if let Some(tx) =
            self.events_transaction(&header.hash, END_BLOCK_SUFFIX, &results.end_block_events)
        {
            transactions.push(tx);
        }

        let block_identifier = BlockIdentifier {
            index: header.height as i64,
            hash: header.hash.clone(),
        };
        // The first available block is its own parent
        let parent_block_identifier = if header.height <= 1 || header.parent_hash.is_empty() {
            block_identifier.clone()
        } else {
            BlockIdentifier {
                index: header.height as i64 - 1,
                hash: header.parent_hash.clone(),
            }
        };

        Ok(Block {
            block_identifier,
            parent_block_identifier,
            timestamp: header.timestamp_millis(),
            transactions,
        })
    }

    pub async fn block_transaction(
        &self,
        block_identifier: &BlockIdentifier,
        transaction_identifier: &TransactionIdentifier,
    ) -> Result<Transaction, ApiError> {
        let partial = PartialBlockIdentifier {
            index: Some(block_identifier.index),
            hash: Some(block_identifier.hash.clone()),
        };
        let block = self.block(&partial).await?;
        let wanted = &transaction_identifier.hash;

        block
            .transactions
            .into_iter()
            .find(|tx| tx.transaction_identifier.hash.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::TransactionNotFound(wanted.clone()))
    }

    /// Operations of one raw transaction; undecodable bytes yield none
    fn transaction(&self, raw: &[u8], result: Option<&TxResult>) -> Transaction {
        let hash = hash_tx(raw);
        let success = result.map_or(false, TxResult::is_success);

        let (operations, metadata) = match decode_tx(raw) {
            Ok(tx) => match self.tx_operations(&tx, success) {
                Ok(ops) => {
                    let mut metadata = Map::new();
                    metadata.insert("memo".to_string(), json!(tx.memo));
                    if let Some(result) = result {
                        metadata.insert("code".to_string(), json!(result.code));
                        metadata.insert("gas_wanted".to_string(), json!(result.gas_wanted));
                        metadata.insert("gas_used".to_string(), json!(result.gas_used));
                    }
                    (ops, Some(metadata))
                }
                Err(e) => {
                    log::warn!("transaction {} has malformed messages: {}", hash, e);
                    let mut metadata = Map::new();
                    metadata.insert("memo".to_string(), json!(tx.memo));
                    metadata.insert("error".to_string(), json!(e.to_string()));
                    (Vec::new(), Some(metadata))
                }
            },
            Err(e) => {
                log::warn!("skipping undecodable transaction {}: {}", hash, e);
                (Vec::new(), None)
            }
        };

        Transaction {
            transaction_identifier: TransactionIdentifier { hash },
            operations,
            metadata,
        }
    }

    fn tx_operations(
        &self,
        tx: &StdTx,
        success: bool,
    ) -> Result<Vec<Operation>, crate::codec::CodecError> {
        let mut ops = Vec::new();
        if let Some(payer) = tx.fee_payer()? {
            ops.extend(
                self.mapper
                    .map_fee(&payer, &self.params.fee_collector, &tx.fee.amount, 0),
            );
        }

        let status = OperationStatus::from_success(success);
        for send in tx.sends()? {
            let next = ops.len() as i64;
            ops.extend(self.mapper.map_transfer(
                &send.from_address,
                &send.to_address,
                &send.amount,
                status,
                next,
            ));
        }
        Ok(ops)
    }

    fn events_transaction(
        &self,
        block_hash: &str,
        suffix: &str,
        events: &[Event],
    ) -> Option<Transaction> {
        let operations = self.mapper.map_events(events, 0);
        if operations.is_empty() {
            return None;
        }
        Some(Transaction {
            transaction_identifier: TransactionIdentifier {
                hash: format!("{}{}", block_hash, suffix),
            },
            operations,
            metadata: None,
        })
    }
}
