//! API errors
//!
//! Every failure a client can see maps to one fixed code. Codes are part of
//! the public interface and never change meaning.

use crate::client::ClientError;
use crate::codec::CodecError;
use crate::types::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Endpoint unavailable offline")]
    UnavailableOffline,
    #[error("Chain error: {0}")]
    Chain(ClientError),
    #[error("Unclear intent: {0}")]
    UnclearIntent(String),
    #[error("No operations provided")]
    NoOperations,
    #[error("Invalid options: {}", .0.join(", "))]
    InvalidOptions(Vec<String>),
    #[error("Invalid metadata: {}", .0.join(", "))]
    InvalidMetadata(Vec<String>),
    #[error("Missing public key for {0}")]
    MissingPublicKey(String),
    #[error("Invalid transaction: {0}")]
    InvalidTx(String),
    #[error("Invalid public key in {field}: {reason}")]
    InvalidPublicKey { field: String, reason: String },
    #[error("Unsupported curve type: {0}")]
    UnsupportedCurveType(String),
    #[error("Invalid address in {field}: {reason}")]
    InvalidAddress { field: String, reason: String },
    #[error("Invalid currency amount in {field}: {reason}")]
    InvalidCurrencyAmount { field: String, reason: String },
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),
    #[error("Invalid block identifier: {0}")]
    InvalidBlockIdentifier(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Invalid signature {index}: {reason}")]
    InvalidSignature { index: usize, reason: String },
}

impl ApiError {
    pub fn code(&self) -> i32 {
        match self {
            ApiError::UnavailableOffline => 1,
            ApiError::Chain(_) => 2,
            ApiError::UnclearIntent(_) => 3,
            ApiError::NoOperations => 4,
            ApiError::InvalidOptions(_) => 5,
            ApiError::InvalidMetadata(_) => 6,
            ApiError::MissingPublicKey(_) => 7,
            ApiError::InvalidTx(_) => 8,
            ApiError::InvalidPublicKey { .. } => 9,
            ApiError::UnsupportedCurveType(_) => 10,
            ApiError::InvalidAddress { .. } => 11,
            ApiError::InvalidCurrencyAmount { .. } => 12,
            ApiError::InvalidNetwork(_) => 13,
            ApiError::InvalidBlockIdentifier(_) => 14,
            ApiError::TransactionNotFound(_) => 15,
            ApiError::InvalidSignature { .. } => 16,
        }
    }

    /// Short, fixed message per code
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::UnavailableOffline => "Endpoint unavailable offline",
            ApiError::Chain(_) => "Error communicating with the chain",
            ApiError::UnclearIntent(_) => "Operations do not describe a supported transfer",
            ApiError::NoOperations => "No operations provided",
            ApiError::InvalidOptions(_) => "Invalid options",
            ApiError::InvalidMetadata(_) => "Invalid metadata",
            ApiError::MissingPublicKey(_) => "Missing public key for a required signer",
            ApiError::InvalidTx(_) => "Invalid transaction",
            ApiError::InvalidPublicKey { .. } => "Invalid public key",
            ApiError::UnsupportedCurveType(_) => "Unsupported curve type",
            ApiError::InvalidAddress { .. } => "Invalid address",
            ApiError::InvalidCurrencyAmount { .. } => "Invalid currency amount",
            ApiError::InvalidNetwork(_) => "Invalid network identifier",
            ApiError::InvalidBlockIdentifier(_) => "Invalid block identifier",
            ApiError::TransactionNotFound(_) => "Transaction not found",
            ApiError::InvalidSignature { .. } => "Invalid signature",
        }
    }

    /// Only upstream failures may succeed on a retry
    pub fn retriable(&self) -> bool {
        matches!(self, ApiError::Chain(_))
    }

    pub fn details(&self) -> Option<Map<String, Value>> {
        let details = match self {
            ApiError::UnavailableOffline | ApiError::NoOperations => return None,
            ApiError::Chain(e) => json!({ "error": e.to_string() }),
            ApiError::UnclearIntent(reason)
            | ApiError::InvalidTx(reason)
            | ApiError::InvalidBlockIdentifier(reason) => json!({ "error": reason }),
            ApiError::InvalidOptions(fields) | ApiError::InvalidMetadata(fields) => {
                json!({ "fields": fields })
            }
            ApiError::MissingPublicKey(signer) => json!({ "signer": signer }),
            ApiError::InvalidPublicKey { field, reason }
            | ApiError::InvalidAddress { field, reason }
            | ApiError::InvalidCurrencyAmount { field, reason } => {
                json!({ "field": field, "error": reason })
            }
            ApiError::UnsupportedCurveType(curve) => json!({ "curve_type": curve }),
            ApiError::InvalidNetwork(network) => json!({ "network": network }),
            ApiError::TransactionNotFound(hash) => json!({ "hash": hash }),
            ApiError::InvalidSignature { index, reason } => {
                json!({ "index": index, "error": reason })
            }
        };
        match details {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Wire form, with details
    pub fn to_error(&self) -> Error {
        Error {
            code: self.code(),
            message: self.message().to_string(),
            retriable: self.retriable(),
            details: self.details(),
        }
    }

    /// One representative of every code, in code order
    pub fn catalogue() -> Vec<ApiError> {
        let empty = String::new;
        vec![
            ApiError::UnavailableOffline,
            ApiError::Chain(ClientError::Request(empty())),
            ApiError::UnclearIntent(empty()),
            ApiError::NoOperations,
            ApiError::InvalidOptions(Vec::new()),
            ApiError::InvalidMetadata(Vec::new()),
            ApiError::MissingPublicKey(empty()),
            ApiError::InvalidTx(empty()),
            ApiError::InvalidPublicKey {
                field: empty(),
                reason: empty(),
            },
            ApiError::UnsupportedCurveType(empty()),
            ApiError::InvalidAddress {
                field: empty(),
                reason: empty(),
            },
            ApiError::InvalidCurrencyAmount {
                field: empty(),
                reason: empty(),
            },
            ApiError::InvalidNetwork(empty()),
            ApiError::InvalidBlockIdentifier(empty()),
            ApiError::TransactionNotFound(empty()),
            ApiError::InvalidSignature {
                index: 0,
                reason: empty(),
            },
        ]
    }
}

/// Every error the gateway can return, without details
pub fn all_errors() -> Vec<Error> {
    ApiError::catalogue()
        .iter()
        .map(|e| Error {
            details: None,
            ..e.to_error()
        })
        .collect()
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        ApiError::Chain(e)
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        ApiError::InvalidTx(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.retriable() {
            log::error!("{}", self);
        } else {
            log::debug!("rejected request: {}", self);
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.to_error())).into_response()
    }
}
