//! Raw transaction framing
//!
//! Frame format: length (4 bytes, big endian) followed by the canonical JSON
//! body of a [`StdTx`]. The transaction hash is computed over the whole frame.

use super::tx::StdTx;
use crate::crypto::sha256_hex_upper;
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Size of the length prefix
pub const LENGTH_PREFIX: usize = 4;

/// Largest accepted body
pub const MAX_TX_SIZE: usize = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Failed to encode transaction: {0}")]
    Encode(String),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::InvalidTransaction(e.to_string())
    }
}

/// Length-prefixed transaction codec
#[derive(Debug, Clone, Copy)]
pub struct TxCodec {
    max_size: usize,
}

impl Default for TxCodec {
    fn default() -> Self {
        Self::new(MAX_TX_SIZE)
    }
}

impl TxCodec {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl<'a> Encoder<&'a StdTx> for TxCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &'a StdTx, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = item.to_canonical_json()?;
        if data.len() > self.max_size {
            return Err(CodecError::Encode(format!(
                "body of {} bytes exceeds {}",
                data.len(),
                self.max_size
            )));
        }

        dst.reserve(LENGTH_PREFIX + data.len());
        dst.put_u32(data.len() as u32);
        dst.put_slice(&data);

        Ok(())
    }
}

impl Decoder for TxCodec {
    type Item = StdTx;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_size {
            return Err(CodecError::InvalidTransaction(format!(
                "declared length {} exceeds {}",
                len, self.max_size
            )));
        }

        if src.len() < LENGTH_PREFIX + len {
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let data = src.split_to(len);

        let tx = serde_json::from_slice(&data)
            .map_err(|e| CodecError::InvalidTransaction(e.to_string()))?;

        Ok(Some(tx))
    }
}

/// Decode exactly one transaction from `raw`
pub fn decode_tx(raw: &[u8]) -> Result<StdTx, CodecError> {
    let mut buf = BytesMut::from(raw);
    match TxCodec::default().decode(&mut buf)? {
        Some(tx) if buf.is_empty() => Ok(tx),
        Some(_) => Err(CodecError::InvalidTransaction(format!(
            "{} trailing bytes",
            buf.len()
        ))),
        None => Err(CodecError::InvalidTransaction(format!(
            "truncated frame of {} bytes",
            raw.len()
        ))),
    }
}

pub fn encode_tx(tx: &StdTx) -> Result<Vec<u8>, CodecError> {
    let mut buf = BytesMut::new();
    TxCodec::default().encode(tx, &mut buf)?;
    Ok(buf.to_vec())
}

/// Transaction identifier: uppercase hex SHA-256 of the raw bytes
pub fn hash_tx(raw: &[u8]) -> String {
    sha256_hex_upper(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tx::{MsgSend, StdFee, StdSignature};

    fn sample_tx() -> StdTx {
        let msg = MsgSend::new("kava1a", "kava1b", "10ukava".parse().unwrap())
            .to_msg()
            .unwrap();
        let fee = StdFee {
            amount: "200ukava".parse().unwrap(),
            gas: 200_000,
        };
        StdTx::new(vec![msg], fee, "")
    }

    #[test]
    fn test_encode_decode() {
        let mut tx = sample_tx();
        tx.signatures.push(StdSignature {
            pub_key: "02ab".to_string(),
            signature: "cd".to_string(),
        });
        let raw = encode_tx(&tx).unwrap();
        assert_eq!(decode_tx(&raw).unwrap(), tx);
    }

    #[test]
    fn test_reencode_is_byte_identical() {
        let raw = encode_tx(&sample_tx()).unwrap();
        let again = encode_tx(&decode_tx(&raw).unwrap()).unwrap();
        assert_eq!(raw, again);
        assert_eq!(hash_tx(&raw), hash_tx(&again));
    }

    #[test]
    fn test_hash_is_uppercase_sha256_of_raw() {
        let raw = encode_tx(&sample_tx()).unwrap();
        let hash = hash_tx(&raw);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash.to_uppercase());
        assert_eq!(hash, sha256_hex_upper(&raw));
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let raw = encode_tx(&sample_tx()).unwrap();
        let cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![0, 0],
            vec![0, 0, 0, 0],
            vec![0xFF, 0xFF, 0xFF, 0xFF, b'{'],
            b"not a transaction at all".to_vec(),
            raw[..raw.len() - 1].to_vec(),
            [raw.clone(), vec![0]].concat(),
            [vec![0, 0, 0, 2], b"{}".to_vec()].concat(),
            [vec![0, 0, 0, 3], vec![0xC3, 0x28, 0xA0]].concat(),
        ];
        for case in cases {
            assert!(
                matches!(decode_tx(&case), Err(CodecError::InvalidTransaction(_))),
                "accepted {:?}",
                case
            );
        }
    }

    #[test]
    fn test_decoder_waits_for_full_frame() {
        let raw = encode_tx(&sample_tx()).unwrap();
        let mut codec = TxCodec::default();

        let mut partial = BytesMut::from(&raw[..10]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        let mut two = BytesMut::from(&[raw.clone(), raw.clone()].concat()[..]);
        assert!(codec.decode(&mut two).unwrap().is_some());
        assert!(codec.decode(&mut two).unwrap().is_some());
        assert!(two.is_empty());
    }

    #[test]
    fn test_encoder_enforces_size_limit() {
        let mut codec = TxCodec::new(16);
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(&sample_tx(), &mut buf),
            Err(CodecError::Encode(_))
        ));
    }
}
