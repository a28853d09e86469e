//! In-memory chain client
//!
//! Serves a fixed snapshot assembled with the `with_*` builders. Accounts,
//! delegations and unbonding delegations are the same at every height; the
//! heights requested are recorded so callers can check which height a read
//! was pinned to.

use super::{BlockQuery, BroadcastResult, ChainClient, ClientError, Height, NodeStatus};
use crate::codec::hash_tx;
use crate::core::{Account, Block, BlockResults, Delegation, UnbondingDelegation};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryClient {
    network: String,
    accounts: HashMap<String, Account>,
    delegations: HashMap<String, Vec<Delegation>>,
    unbonding: HashMap<String, Vec<UnbondingDelegation>>,
    blocks: BTreeMap<u64, (Block, BlockResults)>,
    peers: Vec<String>,
    failure: Option<ClientError>,
    rejection: Option<(u32, String)>,
    reads: Mutex<Vec<(String, Height)>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MemoryClient {
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.address.clone(), account);
        self
    }

    pub fn with_delegations(mut self, address: &str, delegations: Vec<Delegation>) -> Self {
        self.delegations.insert(address.to_string(), delegations);
        self
    }

    pub fn with_unbonding_delegations(
        mut self,
        address: &str,
        unbonding: Vec<UnbondingDelegation>,
    ) -> Self {
        self.unbonding.insert(address.to_string(), unbonding);
        self
    }

    pub fn with_block(mut self, block: Block, results: BlockResults) -> Self {
        self.blocks.insert(block.header.height, (block, results));
        self
    }

    pub fn with_peer(mut self, peer_id: &str) -> Self {
        self.peers.push(peer_id.to_string());
        self
    }

    /// Fail every call with `error`
    pub fn failing_with(mut self, error: ClientError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Reject broadcasts with a non-zero check code
    pub fn rejecting_broadcasts(mut self, code: u32, log: &str) -> Self {
        self.rejection = Some((code, log.to_string()));
        self
    }

    /// Raw transactions accepted so far
    pub async fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().await.clone()
    }

    /// Every state read so far as `(address, height)`
    pub async fn reads(&self) -> Vec<(String, Height)> {
        self.reads.lock().await.clone()
    }

    fn check(&self) -> Result<(), ClientError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn record_read(&self, address: &str, height: Height) -> Result<(), ClientError> {
        self.check()?;
        self.reads.lock().await.push((address.to_string(), height));
        Ok(())
    }

    fn find_block(&self, query: &BlockQuery) -> Option<&(Block, BlockResults)> {
        match query {
            BlockQuery::Latest => self.blocks.values().next_back(),
            BlockQuery::Height(height) => self.blocks.get(height),
            BlockQuery::Hash(hash) => self
                .blocks
                .values()
                .find(|(block, _)| block.header.hash.eq_ignore_ascii_case(hash)),
        }
    }
}

impl ChainClient for MemoryClient {
    async fn status(&self) -> Result<NodeStatus, ClientError> {
        self.check()?;
        let (latest, _) = self
            .blocks
            .values()
            .next_back()
            .ok_or_else(|| ClientError::NotFound("no blocks".to_string()))?;
        let (earliest, _) = self
            .blocks
            .values()
            .next()
            .ok_or_else(|| ClientError::NotFound("no blocks".to_string()))?;

        Ok(NodeStatus {
            network: self.network.clone(),
            latest_block_height: latest.header.height,
            latest_block_hash: latest.header.hash.clone(),
            latest_block_time: latest.header.time,
            earliest_block_height: earliest.header.height,
            earliest_block_hash: earliest.header.hash.clone(),
            catching_up: false,
            peers: self.peers.clone(),
        })
    }

    async fn account(&self, address: &str, height: Height) -> Result<Account, ClientError> {
        self.record_read(address, height).await?;
        Ok(self
            .accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| Account::empty(address)))
    }

    async fn delegations(
        &self,
        address: &str,
        height: Height,
    ) -> Result<Vec<Delegation>, ClientError> {
        self.record_read(address, height).await?;
        Ok(self.delegations.get(address).cloned().unwrap_or_default())
    }

    async fn unbonding_delegations(
        &self,
        address: &str,
        height: Height,
    ) -> Result<Vec<UnbondingDelegation>, ClientError> {
        self.record_read(address, height).await?;
        Ok(self.unbonding.get(address).cloned().unwrap_or_default())
    }

    async fn block(&self, query: &BlockQuery) -> Result<Block, ClientError> {
        self.check()?;
        self.find_block(query)
            .map(|(block, _)| block.clone())
            .ok_or_else(|| ClientError::NotFound(format!("block {:?}", query)))
    }

    async fn block_results(&self, height: u64) -> Result<BlockResults, ClientError> {
        self.check()?;
        self.blocks
            .get(&height)
            .map(|(_, results)| results.clone())
            .ok_or_else(|| ClientError::NotFound(format!("block results at {}", height)))
    }

    async fn broadcast(&self, tx: &[u8]) -> Result<BroadcastResult, ClientError> {
        self.check()?;
        if let Some((code, log)) = &self.rejection {
            return Err(ClientError::Broadcast {
                code: *code,
                log: log.clone(),
            });
        }
        self.broadcasts.lock().await.push(tx.to_vec());

        Ok(BroadcastResult {
            code: 0,
            log: String::new(),
            hash: hash_tx(tx),
        })
    }
}
