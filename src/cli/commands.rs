//! CLI commands for the gateway
//!
//! `serve` runs the HTTP API; `derive` and `hash` are offline helpers that
//! go through the same construction code as the endpoints.

use crate::api::{create_router, ApiState};
use crate::client::{HttpClient, HttpClientConfig};
use crate::config::{ChainParameters, Config, Mode};
use crate::construction::{ConstructionService, CURVE_SECP256K1};
use crate::types::{
    ConstructionDeriveRequest, ConstructionHashRequest, NetworkIdentifier, PublicKey,
};
use axum::Router;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn network_identifier(params: &ChainParameters) -> NetworkIdentifier {
    NetworkIdentifier {
        blockchain: params.blockchain.clone(),
        network: params.chain_id.clone(),
    }
}

/// Router for the configured mode
pub fn build_router(config: &Config) -> CliResult<Router> {
    config.validate()?;
    let params = config.chain_parameters();

    let router = match config.mode {
        Mode::Offline => create_router(ApiState::<HttpClient>::offline(params)),
        Mode::Online => {
            let client_config = HttpClientConfig::from_config(config)
                .ok_or("online mode requires --rpc-url and --lcd-url")?;
            let client = HttpClient::new(client_config)?;
            create_router(ApiState::online(params, client))
        }
    };
    Ok(router)
}

/// Serve the API until the process is stopped
pub async fn cmd_serve(config: Config) -> CliResult<()> {
    let app = build_router(&config)?;

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!(
        "Rosetta API for {} ({} mode) listening on http://{}",
        config.network,
        config.mode,
        addr
    );
    if let (Mode::Online, Some(rpc), Some(lcd)) = (config.mode, &config.rpc_url, &config.lcd_url)
    {
        log::info!("node endpoints: rpc={} lcd={}", rpc, lcd);
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Address of a compressed secp256k1 public key
pub fn cmd_derive(network: &str, public_key: &str) -> CliResult<String> {
    let params = ChainParameters::kava(network);
    let response = ConstructionService::<HttpClient>::new(None, &params).derive(
        &ConstructionDeriveRequest {
            network_identifier: network_identifier(&params),
            public_key: PublicKey {
                hex_bytes: public_key.to_string(),
                curve_type: CURVE_SECP256K1.to_string(),
            },
            metadata: None,
        },
    )?;
    Ok(response.account_identifier.address)
}

/// Identifier of a signed transaction
pub fn cmd_hash(network: &str, signed_transaction: &str) -> CliResult<String> {
    let params = ChainParameters::kava(network);
    let response = ConstructionService::<HttpClient>::new(None, &params).hash(
        &ConstructionHashRequest {
            network_identifier: network_identifier(&params),
            signed_transaction: signed_transaction.trim().to_string(),
        },
    )?;
    Ok(response.transaction_identifier.hash)
}
