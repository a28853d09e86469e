//! Kava Rosetta: a Rosetta Data and Construction API gateway for Kava
//!
//! This crate provides:
//! - Balance decomposition of base and vesting accounts into spendable,
//!   vesting, delegated and unbonding categories at a pinned height
//! - Mapping of bank sends, fees and block events to balanced operations
//! - An amino-JSON transaction codec with length-prefixed framing
//! - The stateless construction flow: preprocess, metadata, payloads,
//!   parse, combine, hash and submit
//! - An axum server exposing the Rosetta endpoints in online or offline mode
//!
//! # Example
//!
//! ```rust
//! use kava_rosetta::client::MemoryClient;
//! use kava_rosetta::config::ChainParameters;
//! use kava_rosetta::construction::ConstructionService;
//! use kava_rosetta::crypto::KeyPair;
//! use kava_rosetta::types::{ConstructionDeriveRequest, NetworkIdentifier, PublicKey};
//!
//! let params = ChainParameters::kava("kava-4");
//! let key = KeyPair::from_private_key_hex(&"01".repeat(32)).unwrap();
//!
//! // Offline: no client
//! let service = ConstructionService::<MemoryClient>::new(None, &params);
//! let response = service
//!     .derive(&ConstructionDeriveRequest {
//!         network_identifier: NetworkIdentifier {
//!             blockchain: "Kava".to_string(),
//!             network: "kava-4".to_string(),
//!         },
//!         public_key: PublicKey {
//!             hex_bytes: key.public_key_hex(),
//!             curve_type: "secp256k1".to_string(),
//!         },
//!         metadata: None,
//!     })
//!     .unwrap();
//! assert!(response.account_identifier.address.starts_with("kava1"));
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod construction;
pub mod core;
pub mod crypto;
pub mod data;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use client::{ChainClient, ClientError, HttpClient, MemoryClient};
pub use codec::{decode_tx, encode_tx, hash_tx, StdTx, TxCodec};
pub use config::{ChainParameters, Config, Mode};
pub use construction::ConstructionService;
pub use core::{BalanceCategory, BalanceDecomposer, CoinSet, CurrencyRegistry, OperationMapper};
pub use crypto::KeyPair;
pub use error::ApiError;
