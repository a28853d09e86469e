//! secp256k1 keys and account addresses
//!
//! Account addresses are bech32 encodings of
//! `RIPEMD160(SHA256(compressed public key))` under the chain's prefix.
//! Module accounts (such as the fee collector) use the first 20 bytes of
//! `SHA256(module name)` instead.

use bech32::{FromBase32, ToBase32, Variant};
use ripemd::Ripemd160;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use sha2::Digest;
use thiserror::Error;

use super::hash::sha256;

/// Length of an account address payload
pub const ADDRESS_LENGTH: usize = 20;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid message hash: expected 32 bytes")]
    InvalidMessage,
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Account address under the given prefix
    pub fn address(&self, prefix: &str) -> Result<String, KeyError> {
        address_from_public_key(&self.public_key, prefix)
    }

    /// Sign a 32-byte message hash
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message_hash)
    }
}

fn encode_address(payload: &[u8], prefix: &str) -> Result<String, KeyError> {
    bech32::encode(prefix, payload.to_base32(), Variant::Bech32).map_err(|e| {
        KeyError::InvalidAddress {
            address: hex::encode(payload),
            reason: e.to_string(),
        }
    })
}

/// Convert a public key to a bech32 account address
pub fn address_from_public_key(public_key: &PublicKey, prefix: &str) -> Result<String, KeyError> {
    let sha256_hash = sha256(&public_key.serialize());

    let mut ripemd = Ripemd160::new();
    ripemd.update(&sha256_hash);
    let ripemd_hash = ripemd.finalize();

    encode_address(&ripemd_hash, prefix)
}

/// Address of a module account such as `fee_collector`
pub fn module_address(name: &str, prefix: &str) -> Result<String, KeyError> {
    let hash = sha256(name.as_bytes());
    encode_address(&hash[..ADDRESS_LENGTH], prefix)
}

/// Check that `address` is a bech32 account address under `prefix`
pub fn validate_address(address: &str, prefix: &str) -> Result<(), KeyError> {
    let invalid = |reason: String| KeyError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let (hrp, data, variant) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;
    if hrp != prefix {
        return Err(invalid(format!("expected prefix {}", prefix)));
    }
    if variant != Variant::Bech32 {
        return Err(invalid("expected bech32 encoding".to_string()));
    }
    let payload = Vec::<u8>::from_base32(&data).map_err(|e| invalid(e.to_string()))?;
    if payload.len() != ADDRESS_LENGTH {
        return Err(invalid(format!("expected {} bytes", ADDRESS_LENGTH)));
    }
    Ok(())
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

fn message(message_hash: &[u8]) -> Result<Message, KeyError> {
    Message::from_digest_slice(message_hash).map_err(|_| KeyError::InvalidMessage)
}

/// Sign a message hash, returning a 64-byte compact low-S signature
pub fn sign_message(secret_key: &SecretKey, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::signing_only();
    let signature = secp.sign_ecdsa(&message(message_hash)?, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against a public key
///
/// High-S signatures are normalized before verification.
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::verification_only();
    let message = message(message_hash)?;
    let mut sig = ecdsa::Signature::from_compact(signature).map_err(|_| KeyError::InvalidSignature)?;
    sig.normalize_s();

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}
