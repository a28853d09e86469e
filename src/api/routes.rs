//! Rosetta routes configuration

use crate::api::handlers::{self, ApiState};
use crate::client::ChainClient;
use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

/// Unknown paths get a JSON 404 rather than an empty body
async fn fallback_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no route for {}", uri.path()) })),
    )
}

/// Create the API router with all routes
pub fn create_router<C: ChainClient>(state: ApiState<C>) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check::<C>))
        // Network
        .route("/network/list", post(handlers::network_list::<C>))
        .route("/network/options", post(handlers::network_options::<C>))
        .route("/network/status", post(handlers::network_status::<C>))
        // Data
        .route("/account/balance", post(handlers::account_balance::<C>))
        .route("/block", post(handlers::block::<C>))
        .route("/block/transaction", post(handlers::block_transaction::<C>))
        // Construction
        .route("/construction/derive", post(handlers::construction_derive::<C>))
        .route(
            "/construction/preprocess",
            post(handlers::construction_preprocess::<C>),
        )
        .route(
            "/construction/metadata",
            post(handlers::construction_metadata::<C>),
        )
        .route(
            "/construction/payloads",
            post(handlers::construction_payloads::<C>),
        )
        .route("/construction/parse", post(handlers::construction_parse::<C>))
        .route(
            "/construction/combine",
            post(handlers::construction_combine::<C>),
        )
        .route("/construction/hash", post(handlers::construction_hash::<C>))
        .route("/construction/submit", post(handlers::construction_submit::<C>))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
