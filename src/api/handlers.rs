//! Rosetta endpoint handlers

use crate::client::ChainClient;
use crate::config::{ChainParameters, Mode, NODE_VERSION, ROSETTA_VERSION};
use crate::construction::ConstructionService;
use crate::data::{BalanceService, BlockService};
use crate::error::{all_errors, ApiError};
use crate::types::{
    AccountBalanceRequest, AccountBalanceResponse, Allow, BlockIdentifier, BlockRequest,
    BlockResponse, BlockTransactionRequest, BlockTransactionResponse, ConstructionCombineRequest,
    ConstructionCombineResponse, ConstructionDeriveRequest, ConstructionDeriveResponse,
    ConstructionHashRequest, ConstructionMetadataRequest, ConstructionMetadataResponse,
    ConstructionParseRequest, ConstructionParseResponse, ConstructionPayloadsRequest,
    ConstructionPayloadsResponse, ConstructionPreprocessRequest, ConstructionPreprocessResponse,
    ConstructionSubmitRequest, MetadataRequest, NetworkIdentifier, NetworkListResponse,
    NetworkOptionsResponse, NetworkRequest, NetworkStatusResponse, OperationStatus,
    OperationStatusInfo, OperationType, Peer, SyncStatus, TransactionIdentifierResponse, Version,
};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state for API handlers
pub struct ApiState<C> {
    pub params: Arc<ChainParameters>,
    /// `None` in offline mode
    pub client: Option<Arc<C>>,
    pub mode: Mode,
}

// Derived Clone would require `C: Clone`
impl<C> Clone for ApiState<C> {
    fn clone(&self) -> Self {
        Self {
            params: Arc::clone(&self.params),
            client: self.client.clone(),
            mode: self.mode,
        }
    }
}

impl<C: ChainClient> ApiState<C> {
    pub fn online(params: ChainParameters, client: C) -> Self {
        Self {
            params: Arc::new(params),
            client: Some(Arc::new(client)),
            mode: Mode::Online,
        }
    }

    pub fn offline(params: ChainParameters) -> Self {
        Self {
            params: Arc::new(params),
            client: None,
            mode: Mode::Offline,
        }
    }

    fn network_identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: self.params.blockchain.clone(),
            network: self.params.chain_id.clone(),
        }
    }

    fn check_network(&self, network: &NetworkIdentifier) -> Result<(), ApiError> {
        if *network != self.network_identifier() {
            return Err(ApiError::InvalidNetwork(format!(
                "{}/{}",
                network.blockchain, network.network
            )));
        }
        Ok(())
    }

    /// Online-only endpoints answer `UnavailableOffline` before any other check
    fn require_online(&self) -> Result<(), ApiError> {
        if self.mode == Mode::Offline {
            return Err(ApiError::UnavailableOffline);
        }
        Ok(())
    }

    fn client(&self) -> Result<&C, ApiError> {
        self.require_online()?;
        self.client.as_deref().ok_or(ApiError::UnavailableOffline)
    }

    fn construction(&self) -> ConstructionService<'_, C> {
        ConstructionService::new(self.client.as_deref(), &self.params)
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: String,
    pub network: String,
}

// ============================================================================
// Network
// ============================================================================

/// GET /health
pub async fn health_check<C: ChainClient>(State(state): State<ApiState<C>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.mode.to_string(),
        network: state.params.chain_id.clone(),
    })
}

/// POST /network/list
pub async fn network_list<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(_req): Json<MetadataRequest>,
) -> Json<NetworkListResponse> {
    Json(NetworkListResponse {
        network_identifiers: vec![state.network_identifier()],
    })
}

/// POST /network/options
pub async fn network_options<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<NetworkRequest>,
) -> Result<Json<NetworkOptionsResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;

    let operation_statuses = [OperationStatus::Success, OperationStatus::Failure]
        .into_iter()
        .filter_map(|status| {
            status.as_wire().map(|name| OperationStatusInfo {
                status: name,
                successful: status == OperationStatus::Success,
            })
        })
        .collect();

    Ok(Json(NetworkOptionsResponse {
        version: Version {
            rosetta_version: ROSETTA_VERSION.to_string(),
            node_version: NODE_VERSION.to_string(),
            middleware_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        },
        allow: Allow {
            operation_statuses,
            operation_types: OperationType::ALL
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect(),
            errors: all_errors(),
            historical_balance_lookup: true,
        },
    }))
}

/// POST /network/status
pub async fn network_status<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<NetworkRequest>,
) -> Result<Json<NetworkStatusResponse>, ApiError> {
    let client = state.client()?;
    state.check_network(&req.network_identifier)?;
    let status = client.status().await?;

    let genesis = BlockIdentifier {
        index: status.earliest_block_height as i64,
        hash: status.earliest_block_hash,
    };
    Ok(Json(NetworkStatusResponse {
        current_block_identifier: BlockIdentifier {
            index: status.latest_block_height as i64,
            hash: status.latest_block_hash,
        },
        current_block_timestamp: status.latest_block_time.timestamp_millis(),
        oldest_block_identifier: Some(genesis.clone()),
        genesis_block_identifier: genesis,
        sync_status: Some(SyncStatus {
            current_index: Some(status.latest_block_height as i64),
            synced: Some(!status.catching_up),
        }),
        peers: status
            .peers
            .into_iter()
            .map(|peer_id| Peer { peer_id })
            .collect(),
    }))
}

// ============================================================================
// Data
// ============================================================================

/// POST /account/balance
pub async fn account_balance<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<AccountBalanceRequest>,
) -> Result<Json<AccountBalanceResponse>, ApiError> {
    let client = state.client()?;
    state.check_network(&req.network_identifier)?;
    let response = BalanceService::new(client, &state.params)
        .account_balance(&req)
        .await?;
    Ok(Json(response))
}

/// POST /block
pub async fn block<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<BlockResponse>, ApiError> {
    let client = state.client()?;
    state.check_network(&req.network_identifier)?;
    let block = BlockService::new(client, &state.params)
        .block(&req.block_identifier)
        .await?;
    Ok(Json(BlockResponse { block }))
}

/// POST /block/transaction
pub async fn block_transaction<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<BlockTransactionRequest>,
) -> Result<Json<BlockTransactionResponse>, ApiError> {
    let client = state.client()?;
    state.check_network(&req.network_identifier)?;
    let transaction = BlockService::new(client, &state.params)
        .block_transaction(&req.block_identifier, &req.transaction_identifier)
        .await?;
    Ok(Json(BlockTransactionResponse { transaction }))
}

// ============================================================================
// Construction
// ============================================================================

/// POST /construction/derive
pub async fn construction_derive<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionDeriveRequest>,
) -> Result<Json<ConstructionDeriveResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().derive(&req)?))
}

/// POST /construction/preprocess
pub async fn construction_preprocess<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionPreprocessRequest>,
) -> Result<Json<ConstructionPreprocessResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().preprocess(&req)?))
}

/// POST /construction/metadata
pub async fn construction_metadata<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionMetadataRequest>,
) -> Result<Json<ConstructionMetadataResponse>, ApiError> {
    state.require_online()?;
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().metadata(&req).await?))
}

/// POST /construction/payloads
pub async fn construction_payloads<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionPayloadsRequest>,
) -> Result<Json<ConstructionPayloadsResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().payloads(&req)?))
}

/// POST /construction/parse
pub async fn construction_parse<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionParseRequest>,
) -> Result<Json<ConstructionParseResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().parse(&req)?))
}

/// POST /construction/combine
pub async fn construction_combine<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionCombineRequest>,
) -> Result<Json<ConstructionCombineResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().combine(&req)?))
}

/// POST /construction/hash
pub async fn construction_hash<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionHashRequest>,
) -> Result<Json<TransactionIdentifierResponse>, ApiError> {
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().hash(&req)?))
}

/// POST /construction/submit
pub async fn construction_submit<C: ChainClient>(
    State(state): State<ApiState<C>>,
    Json(req): Json<ConstructionSubmitRequest>,
) -> Result<Json<TransactionIdentifierResponse>, ApiError> {
    state.require_online()?;
    state.check_network(&req.network_identifier)?;
    Ok(Json(state.construction().submit(&req).await?))
}
