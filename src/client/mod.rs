//! Chain client interface
//!
//! Everything the gateway knows about the chain comes through
//! [`ChainClient`]. Reads are height-scoped so a request can pin one height
//! and issue every read against it.
//!
//! - [`HttpClient`] talks to a node's Tendermint RPC and LCD endpoints
//! - [`MemoryClient`] serves a fixed snapshot

pub mod http;
pub mod memory;

use crate::core::{Account, Block, BlockResults, Delegation, UnbondingDelegation};
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

pub use http::{HttpClient, HttpClientConfig};
pub use memory::MemoryClient;

/// Chain client errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Node returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Broadcast rejected with code {code}: {log}")]
    Broadcast { code: u32, log: String },
}

/// Height selector for state reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Height {
    Latest,
    At(u64),
}

/// Block selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockQuery {
    Latest,
    Height(u64),
    /// Hex block hash, case-insensitive
    Hash(String),
}

/// Node sync status
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStatus {
    pub network: String,
    pub latest_block_height: u64,
    pub latest_block_hash: String,
    pub latest_block_time: DateTime<Utc>,
    pub earliest_block_height: u64,
    pub earliest_block_hash: String,
    pub catching_up: bool,
    pub peers: Vec<String>,
}

/// Result of submitting a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastResult {
    pub code: u32,
    pub log: String,
    /// Uppercase hex transaction hash as reported by the node
    pub hash: String,
}

/// Read and broadcast access to a chain node
pub trait ChainClient: Send + Sync + 'static {
    fn status(&self) -> impl Future<Output = Result<NodeStatus, ClientError>> + Send;

    fn account(
        &self,
        address: &str,
        height: Height,
    ) -> impl Future<Output = Result<Account, ClientError>> + Send;

    fn delegations(
        &self,
        address: &str,
        height: Height,
    ) -> impl Future<Output = Result<Vec<Delegation>, ClientError>> + Send;

    fn unbonding_delegations(
        &self,
        address: &str,
        height: Height,
    ) -> impl Future<Output = Result<Vec<UnbondingDelegation>, ClientError>> + Send;

    fn block(&self, query: &BlockQuery)
        -> impl Future<Output = Result<Block, ClientError>> + Send;

    fn block_results(
        &self,
        height: u64,
    ) -> impl Future<Output = Result<BlockResults, ClientError>> + Send;

    fn broadcast(
        &self,
        tx: &[u8],
    ) -> impl Future<Output = Result<BroadcastResult, ClientError>> + Send;
}
