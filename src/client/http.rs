//! HTTP chain client
//!
//! Talks to a node's Tendermint RPC endpoint (blocks, results, broadcast,
//! status) and its legacy LCD REST endpoint (accounts and staking) through
//! `reqwest`, over http or https. Every request is bounded by the configured
//! timeout. Path segments and query values are percent-encoded.

use super::{BlockQuery, BroadcastResult, ChainClient, ClientError, Height, NodeStatus};
use crate::config::Config;
use crate::core::account::{UnbondingEntry, VestingPeriod, VestingSchedule};
use crate::core::coin::CoinSet;
use crate::core::{
    Account, AccountKind, Block, BlockHeader, BlockResults, Delegation, Event, EventAttribute,
    TxResult, UnbondingDelegation,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::time::Duration;

/// Endpoints and limits for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub rpc_url: String,
    pub lcd_url: String,
    pub timeout: Duration,
}

impl HttpClientConfig {
    /// Endpoints of an online configuration
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self {
            rpc_url: config.rpc_url.clone()?,
            lcd_url: config.lcd_url.clone()?,
            timeout: config.request_timeout,
        })
    }
}

/// Base URL of a node endpoint; http and https only
fn parse_base(url: &str) -> Result<Url, ClientError> {
    let parsed =
        Url::parse(url).map_err(|e| ClientError::Request(format!("invalid URL {}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::Request(format!("unsupported URL {}", url)));
    }
    if parsed.host_str().map_or(true, str::is_empty) || parsed.cannot_be_a_base() {
        return Err(ClientError::Request(format!("missing host in {}", url)));
    }
    Ok(parsed)
}

/// `base` extended with encoded path segments and query pairs
fn endpoint_url(
    base: &Url,
    segments: &[&str],
    query: &[(&str, String)],
) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Request(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Chain client backed by a node's RPC and LCD endpoints
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    rpc: Url,
    lcd: Url,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;
        Ok(Self {
            http,
            rpc: parse_base(&config.rpc_url)?,
            lcd: parse_base(&config.lcd_url)?,
            timeout: config.timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            ClientError::Request(e.to_string())
        }
    }

    /// Send one request and decode its JSON body
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ClientError::NotFound(what.to_string())),
            status => {
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                })
            }
        }
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(format!("{}: {}", what, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        log::debug!("GET {}", url);
        let what = url.path().to_string();
        self.send(self.http.get(url), &what).await
    }

    fn rpc_result<T>(response: RpcResponse<T>, what: &str) -> Result<T, ClientError> {
        match (response.result, response.error) {
            (_, Some(error)) => Err(ClientError::Request(format!(
                "rpc error {}: {} {}",
                error.code, error.message, error.data
            ))),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ClientError::Decode(format!("{}: empty result", what))),
        }
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = endpoint_url(&self.rpc, &[method], query)?;
        let response: RpcResponse<T> = self.get(url).await?;
        Self::rpc_result(response, method)
    }

    /// JSON-RPC POST, for requests too large for a query string
    async fn rpc_post<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ClientError> {
        log::debug!("POST {} {}", self.rpc, method);
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let request = self.http.post(self.rpc.clone()).json(&body);
        let response: RpcResponse<T> = self.send(request, method).await?;
        Self::rpc_result(response, method)
    }

    async fn lcd<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        height: Height,
    ) -> Result<T, ClientError> {
        let query = match height {
            Height::Latest => Vec::new(),
            Height::At(height) => vec![("height", height.to_string())],
        };
        let url = endpoint_url(&self.lcd, segments, &query)?;
        let response: LcdResponse<T> = self.get(url).await?;
        Ok(response.result)
    }
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
struct LcdResponse<T> {
    result: T,
}

/// Integers arrive as strings or numbers depending on the endpoint
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Text(String),
    Int(i64),
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) if s.is_empty() => Ok(0),
        Number::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn unsigned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = number(deserializer)?;
    u64::try_from(n).map_err(serde::de::Error::custom)
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct StatusResult {
    node_info: NodeInfo,
    sync_info: SyncInfo,
}

#[derive(Deserialize)]
struct NodeInfo {
    #[serde(default)]
    id: String,
    network: String,
}

#[derive(Deserialize)]
struct SyncInfo {
    latest_block_hash: String,
    #[serde(deserialize_with = "unsigned")]
    latest_block_height: u64,
    latest_block_time: DateTime<Utc>,
    #[serde(default)]
    earliest_block_hash: String,
    #[serde(default, deserialize_with = "unsigned")]
    earliest_block_height: u64,
    #[serde(default)]
    catching_up: bool,
}

#[derive(Deserialize)]
struct NetInfoResult {
    #[serde(default, deserialize_with = "nullable")]
    peers: Vec<NetPeer>,
}

#[derive(Deserialize)]
struct NetPeer {
    node_info: NodeInfo,
}

#[derive(Deserialize)]
struct BlockResult {
    block_id: BlockId,
    block: RawBlock,
}

#[derive(Deserialize, Default)]
struct BlockId {
    #[serde(default)]
    hash: String,
}

#[derive(Deserialize)]
struct RawBlock {
    header: RawHeader,
    data: RawData,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(deserialize_with = "unsigned")]
    height: u64,
    time: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable")]
    last_block_id: BlockId,
}

#[derive(Deserialize)]
struct RawData {
    #[serde(default, deserialize_with = "nullable")]
    txs: Vec<String>,
}

impl BlockResult {
    fn into_block(self) -> Result<Block, ClientError> {
        let txs = self
            .block
            .data
            .txs
            .iter()
            .map(|tx| {
                STANDARD
                    .decode(tx)
                    .map_err(|e| ClientError::Decode(format!("block tx: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block {
            header: BlockHeader {
                height: self.block.header.height,
                hash: self.block_id.hash.to_uppercase(),
                parent_hash: self.block.header.last_block_id.hash.to_uppercase(),
                time: self.block.header.time,
            },
            txs,
        })
    }
}

#[derive(Deserialize)]
struct RawBlockResults {
    #[serde(deserialize_with = "unsigned")]
    height: u64,
    #[serde(default, deserialize_with = "nullable")]
    txs_results: Vec<RawTxResult>,
    #[serde(default, deserialize_with = "nullable")]
    begin_block_events: Vec<RawEvent>,
    #[serde(default, deserialize_with = "nullable")]
    end_block_events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default, deserialize_with = "unsigned")]
    gas_wanted: u64,
    #[serde(default, deserialize_with = "unsigned")]
    gas_used: u64,
    #[serde(default, deserialize_with = "nullable")]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, deserialize_with = "nullable")]
    attributes: Vec<RawAttribute>,
}

#[derive(Deserialize)]
struct RawAttribute {
    #[serde(default, deserialize_with = "nullable")]
    key: String,
    #[serde(default, deserialize_with = "nullable")]
    value: String,
}

/// Attribute keys and values are base64 on the RPC
fn decode_attribute(raw: &str) -> Result<String, ClientError> {
    let bytes = STANDARD
        .decode(raw)
        .map_err(|e| ClientError::Decode(format!("event attribute: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ClientError::Decode(format!("event attribute: {}", e)))
}

fn decode_events(raw: Vec<RawEvent>) -> Result<Vec<Event>, ClientError> {
    raw.into_iter()
        .map(|event| {
            let attributes = event
                .attributes
                .iter()
                .map(|a| {
                    Ok(EventAttribute {
                        key: decode_attribute(&a.key)?,
                        value: decode_attribute(&a.value)?,
                    })
                })
                .collect::<Result<Vec<_>, ClientError>>()?;
            Ok(Event {
                kind: event.kind,
                attributes,
            })
        })
        .collect()
}

impl RawBlockResults {
    fn into_results(self) -> Result<BlockResults, ClientError> {
        let txs_results = self
            .txs_results
            .into_iter()
            .map(|tx| {
                Ok(TxResult {
                    code: tx.code,
                    log: tx.log,
                    gas_wanted: tx.gas_wanted,
                    gas_used: tx.gas_used,
                    events: decode_events(tx.events)?,
                })
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        Ok(BlockResults {
            height: self.height,
            txs_results,
            begin_block_events: decode_events(self.begin_block_events)?,
            end_block_events: decode_events(self.end_block_events)?,
        })
    }
}

#[derive(Deserialize)]
struct BroadcastTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    hash: String,
}

/// `{type, value}` account envelope from `/auth/accounts`
#[derive(Deserialize)]
struct RawAccountEnvelope {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct RawBaseAccount {
    #[serde(default)]
    address: String,
    #[serde(default)]
    coins: CoinSet,
    #[serde(default, deserialize_with = "unsigned")]
    account_number: u64,
    #[serde(default, deserialize_with = "unsigned")]
    sequence: u64,
}

/// Module accounts wrap a base account
#[derive(Deserialize)]
struct RawModuleAccount {
    base_account: RawBaseAccount,
}

#[derive(Deserialize)]
struct RawBaseVestingAccount {
    base_account: RawBaseAccount,
    #[serde(default)]
    original_vesting: CoinSet,
    #[serde(default)]
    delegated_free: CoinSet,
    #[serde(default)]
    delegated_vesting: CoinSet,
    #[serde(deserialize_with = "number")]
    end_time: i64,
}

#[derive(Deserialize)]
struct RawPeriodicVestingAccount {
    base_vesting_account: RawBaseVestingAccount,
    #[serde(deserialize_with = "number")]
    start_time: i64,
    #[serde(default, deserialize_with = "nullable")]
    vesting_periods: Vec<RawVestingPeriod>,
}

#[derive(Deserialize)]
struct RawDelayedVestingAccount {
    base_vesting_account: RawBaseVestingAccount,
}

#[derive(Deserialize)]
struct RawVestingPeriod {
    #[serde(deserialize_with = "number")]
    length: i64,
    #[serde(default)]
    amount: CoinSet,
}

fn from_value<T: DeserializeOwned>(kind: &str, value: serde_json::Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decode(format!("{}: {}", kind, e)))
}

impl RawBaseAccount {
    fn into_account(self, address: &str, kind: AccountKind) -> Account {
        Account {
            // Unknown addresses come back as an empty account with no address
            address: if self.address.is_empty() {
                address.to_string()
            } else {
                self.address
            },
            account_number: self.account_number,
            sequence: self.sequence,
            coins: self.coins,
            kind,
        }
    }
}

impl RawAccountEnvelope {
    fn into_account(self, address: &str) -> Result<Account, ClientError> {
        let kind = self.kind.as_str();
        match kind {
            "cosmos-sdk/Account" => {
                let base: RawBaseAccount = from_value(kind, self.value)?;
                Ok(base.into_account(address, AccountKind::Base))
            }
            "cosmos-sdk/ModuleAccount" => {
                let module: RawModuleAccount = from_value(kind, self.value)?;
                Ok(module.base_account.into_account(address, AccountKind::Base))
            }
            "cosmos-sdk/PeriodicVestingAccount" => {
                let raw: RawPeriodicVestingAccount = from_value(kind, self.value)?;
                let bva = raw.base_vesting_account;
                let schedule = VestingSchedule {
                    original_vesting: bva.original_vesting,
                    delegated_vesting: bva.delegated_vesting,
                    delegated_free: bva.delegated_free,
                    periods: raw
                        .vesting_periods
                        .into_iter()
                        .map(|p| VestingPeriod {
                            length_seconds: p.length,
                            amount: p.amount,
                        })
                        .collect(),
                    start_time: raw.start_time,
                    end_time: bva.end_time,
                };
                Ok(bva
                    .base_account
                    .into_account(address, AccountKind::Vesting(schedule)))
            }
            "cosmos-sdk/DelayedVestingAccount" => {
                // Everything unlocks at end_time: one period spanning the schedule
                let raw: RawDelayedVestingAccount = from_value(kind, self.value)?;
                let bva = raw.base_vesting_account;
                let schedule = VestingSchedule {
                    periods: vec![VestingPeriod {
                        length_seconds: 0,
                        amount: bva.original_vesting.clone(),
                    }],
                    original_vesting: bva.original_vesting,
                    delegated_vesting: bva.delegated_vesting,
                    delegated_free: bva.delegated_free,
                    start_time: bva.end_time,
                    end_time: bva.end_time,
                };
                Ok(bva
                    .base_account
                    .into_account(address, AccountKind::Vesting(schedule)))
            }
            other => Err(ClientError::Decode(format!(
                "unsupported account type {}",
                other
            ))),
        }
    }
}

#[derive(Deserialize)]
struct RawUnbondingDelegation {
    validator_address: String,
    #[serde(default, deserialize_with = "nullable")]
    entries: Vec<RawUnbondingEntry>,
}

#[derive(Deserialize)]
struct RawUnbondingEntry {
    #[serde(deserialize_with = "unsigned")]
    creation_height: u64,
    completion_time: DateTime<Utc>,
    #[serde(with = "crate::core::coin::amount_string")]
    balance: num_bigint::BigUint,
}

impl ChainClient for HttpClient {
    async fn status(&self) -> Result<NodeStatus, ClientError> {
        let (status, net_info) = futures::try_join!(
            self.rpc::<StatusResult>("status", &[]),
            self.rpc::<NetInfoResult>("net_info", &[]),
        )?;
        let sync = status.sync_info;

        Ok(NodeStatus {
            network: status.node_info.network,
            latest_block_height: sync.latest_block_height,
            latest_block_hash: sync.latest_block_hash.to_uppercase(),
            latest_block_time: sync.latest_block_time,
            earliest_block_height: sync.earliest_block_height,
            earliest_block_hash: sync.earliest_block_hash.to_uppercase(),
            catching_up: sync.catching_up,
            peers: net_info
                .peers
                .into_iter()
                .map(|p| p.node_info.id)
                .collect(),
        })
    }

    async fn account(&self, address: &str, height: Height) -> Result<Account, ClientError> {
        let envelope: RawAccountEnvelope = self
            .lcd(&["auth", "accounts", address], height)
            .await?;
        envelope.into_account(address)
    }

    async fn delegations(
        &self,
        address: &str,
        height: Height,
    ) -> Result<Vec<Delegation>, ClientError> {
        let delegations: Option<Vec<Delegation>> = self
            .lcd(&["staking", "delegators", address, "delegations"], height)
            .await?;
        Ok(delegations.unwrap_or_default())
    }

    async fn unbonding_delegations(
        &self,
        address: &str,
        height: Height,
    ) -> Result<Vec<UnbondingDelegation>, ClientError> {
        let raw: Option<Vec<RawUnbondingDelegation>> = self
            .lcd(
                &["staking", "delegators", address, "unbonding_delegations"],
                height,
            )
            .await?;

        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|u| UnbondingDelegation {
                validator_address: u.validator_address,
                entries: u
                    .entries
                    .into_iter()
                    .map(|e| UnbondingEntry {
                        creation_height: e.creation_height,
                        completion_time: e.completion_time,
                        balance: e.balance,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn block(&self, query: &BlockQuery) -> Result<Block, ClientError> {
        let result: BlockResult = match query {
            BlockQuery::Latest => self.rpc("block", &[]).await?,
            BlockQuery::Height(height) => {
                self.rpc("block", &[("height", height.to_string())]).await?
            }
            BlockQuery::Hash(hash) => {
                self.rpc("block_by_hash", &[("hash", format!("0x{}", hash))])
                    .await?
            }
        };
        if result.block_id.hash.is_empty() {
            return Err(ClientError::NotFound(format!("block {:?}", query)));
        }
        result.into_block()
    }

    async fn block_results(&self, height: u64) -> Result<BlockResults, ClientError> {
        let raw: RawBlockResults = self
            .rpc("block_results", &[("height", height.to_string())])
            .await?;
        raw.into_results()
    }

    async fn broadcast(&self, tx: &[u8]) -> Result<BroadcastResult, ClientError> {
        let result: BroadcastTxResult = self
            .rpc_post("broadcast_tx_sync", json!({ "tx": STANDARD.encode(tx) }))
            .await?;
        if result.code != 0 {
            return Err(ClientError::Broadcast {
                code: result.code,
                log: result.log,
            });
        }

        Ok(BroadcastResult {
            code: result.code,
            log: result.log,
            hash: result.hash.to_uppercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    #[test]
    fn test_base_url_parsing() {
        assert!(parse_base("http://localhost:26657").is_ok());
        assert!(parse_base("https://node.example/lcd/").is_ok());
        assert!(parse_base("ftp://node.example").is_err());
        assert!(parse_base("http://").is_err());
        assert!(parse_base("not a url").is_err());
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let base = parse_base("https://node.example/lcd/").unwrap();
        let url = endpoint_url(
            &base,
            &["auth", "accounts", "kava1x HTTP/1.1\r\nHost: evil/../x?y#z"],
            &[("height", "5".to_string())],
        )
        .unwrap();
        let url = url.as_str();

        assert!(url.starts_with("https://node.example/lcd/auth/accounts/kava1x%20HTTP"));
        assert!(url.contains("%0D%0A"));
        assert!(url.ends_with("?height=5"));
        assert!(!url.contains('\r') && !url.contains('\n') && !url.contains('#'));
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn test_block_results_decoding() {
        let raw: RawBlockResults = serde_json::from_value(json!({
            "height": "12",
            "txs_results": [{
                "code": 0,
                "log": "",
                "gas_wanted": "200000",
                "gas_used": "61234",
                "events": [{
                    "type": "transfer",
                    "attributes": [
                        {"key": STANDARD.encode("recipient"), "value": STANDARD.encode("kava1b")},
                        {"key": STANDARD.encode("amount"), "value": STANDARD.encode("5ukava")}
                    ]
                }]
            }],
            "begin_block_events": null,
            "end_block_events": [{"type": "burn", "attributes": null}]
        }))
        .unwrap();
        let results = raw.into_results().unwrap();

        assert_eq!(results.height, 12);
        assert_eq!(results.txs_results[0].gas_used, 61_234);
        assert_eq!(results.txs_results[0].events[0].attribute("amount"), Some("5ukava"));
        assert!(results.begin_block_events.is_empty());
        assert_eq!(results.end_block_events[0].kind, "burn");
    }

    #[test]
    fn test_periodic_vesting_account_decoding() {
        let envelope: RawAccountEnvelope = serde_json::from_value(json!({
            "type": "cosmos-sdk/PeriodicVestingAccount",
            "value": {
                "base_vesting_account": {
                    "base_account": {
                        "address": "kava1v",
                        "coins": [{"denom": "ukava", "amount": "1000"}],
                        "account_number": "9",
                        "sequence": "2"
                    },
                    "original_vesting": [{"denom": "ukava", "amount": "600"}],
                    "delegated_free": [],
                    "delegated_vesting": null,
                    "end_time": "2000"
                },
                "start_time": "1000",
                "vesting_periods": [
                    {"length": "400", "amount": [{"denom": "ukava", "amount": "200"}]},
                    {"length": "600", "amount": [{"denom": "ukava", "amount": "400"}]}
                ]
            }
        }))
        .unwrap();
        let account = envelope.into_account("kava1v").unwrap();

        assert_eq!(account.account_number, 9);
        assert_eq!(account.sequence, 2);
        let schedule = account.vesting_schedule().unwrap();
        assert_eq!(schedule.periods.len(), 2);
        assert_eq!(schedule.start_time, 1000);
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_empty_account_keeps_requested_address() {
        let envelope: RawAccountEnvelope = serde_json::from_value(json!({
            "type": "cosmos-sdk/Account",
            "value": {"address": "", "coins": [], "public_key": null, "account_number": "0", "sequence": "0"}
        }))
        .unwrap();
        let account = envelope.into_account("kava1new").unwrap();
        assert_eq!(account.address, "kava1new");
        assert!(account.coins.is_empty());
    }

    #[test]
    fn test_unsupported_account_type() {
        let envelope: RawAccountEnvelope = serde_json::from_value(json!({
            "type": "cosmos-sdk/ContinuousVestingAccount",
            "value": {}
        }))
        .unwrap();
        assert!(matches!(
            envelope.into_account("kava1c"),
            Err(ClientError::Decode(_))
        ));
    }

    /// Serve one canned JSON response on a local port, handing back the raw request
    async fn serve_once(body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(request);
        });
        (format!("http://{}", addr), rx)
    }

    /// Headers plus a Content-Length body
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(raw).unwrap()
    }

    fn client(rpc_url: &str, timeout: Duration) -> HttpClient {
        HttpClient::new(HttpClientConfig {
            rpc_url: rpc_url.to_string(),
            lcd_url: "http://127.0.0.1:1".to_string(),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_posts_json_rpc() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"code": 0, "data": "", "log": "[]", "hash": "ab12"}
        })
        .to_string();
        let (url, request) = serve_once(body).await;

        let result = client(&url, Duration::from_secs(5))
            .broadcast(b"tx")
            .await
            .unwrap();
        assert_eq!(result.hash, "AB12");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST / HTTP/1.1\r\n"));
        let (_, payload) = request.split_once("\r\n\r\n").unwrap();
        let payload: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(payload["method"], "broadcast_tx_sync");
        assert_eq!(payload["params"]["tx"], STANDARD.encode(b"tx"));
    }

    #[tokio::test]
    async fn test_rejected_broadcast() {
        let body = json!({
            "result": {"code": 5, "log": "insufficient funds", "hash": "AB12"}
        })
        .to_string();
        let (url, _request) = serve_once(body).await;

        let result = client(&url, Duration::from_secs(5)).broadcast(b"tx").await;
        assert_eq!(
            result,
            Err(ClientError::Broadcast {
                code: 5,
                log: "insufficient funds".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_account_path_is_encoded_on_the_wire() {
        let body = json!({
            "height": "3",
            "result": {
                "type": "cosmos-sdk/Account",
                "value": {"address": "", "coins": [], "account_number": "0", "sequence": "0"}
            }
        })
        .to_string();
        let (url, request) = serve_once(body).await;
        let client = HttpClient::new(HttpClientConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            lcd_url: url,
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let _ = client
            .account("kava1x HTTP/1.1\r\nX-Injected: 1", Height::At(3))
            .await;
        let request = request.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert_eq!(
            request_line,
            "GET /auth/accounts/kava1x%20HTTP%2F1.1%0D%0AX-Injected:%201?height=3 HTTP/1.1"
        );
        assert!(!request.contains("\r\nX-Injected"));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = client(&url, Duration::from_millis(100))
            .block_results(1)
            .await;
        assert_eq!(result, Err(ClientError::Timeout(100)));
    }
}
