//! Cryptographic utilities for the gateway
//!
//! This module provides:
//! - SHA-256 hashing and transaction identifiers
//! - secp256k1 public keys, signatures and bech32 account addresses

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_hex_upper};
pub use keys::{
    address_from_public_key, module_address, public_key_from_hex, sign_message,
    validate_address, verify_signature, KeyError, KeyPair,
};
