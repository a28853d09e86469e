//! Hashing utilities
//!
//! SHA-256 is used for transaction identifiers, signing payloads and
//! address derivation.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as an uppercase hex string
pub fn sha256_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(sha256(data))
}
