//! Standard transaction structures
//!
//! Transactions use the amino JSON shape: `{msg, fee, signatures, memo}`, with
//! every message wrapped in a `{type, value}` envelope. JSON objects are
//! written with sorted keys, so serializing the same transaction always yields
//! the same bytes.

use super::codec::CodecError;
use crate::core::coin::CoinSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bank send message type
pub const MSG_SEND: &str = "cosmos-sdk/MsgSend";

/// Value fields naming the signing account, tried in order
const SIGNER_FIELDS: [&str; 9] = [
    "from_address",
    "delegator_address",
    "sender",
    "owner",
    "depositor",
    "borrower",
    "voter",
    "proposer",
    "creator",
];

/// A message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

impl Msg {
    /// Decode the envelope as a send; `None` for any other message type
    pub fn as_send(&self) -> Result<Option<MsgSend>, CodecError> {
        if self.kind != MSG_SEND {
            return Ok(None);
        }
        serde_json::from_value(self.value.clone())
            .map(Some)
            .map_err(|e| CodecError::InvalidTransaction(format!("{}: {}", MSG_SEND, e)))
    }

    /// Account that must sign the message, whatever its type
    pub fn signer(&self) -> Result<String, CodecError> {
        if let Some(send) = self.as_send()? {
            return Ok(send.from_address);
        }
        SIGNER_FIELDS
            .iter()
            .find_map(|field| self.value.get(field).and_then(Value::as_str))
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CodecError::InvalidTransaction(format!("{}: no signer field", self.kind))
            })
    }
}

/// Bank send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgSend {
    pub amount: CoinSet,
    pub from_address: String,
    pub to_address: String,
}

impl MsgSend {
    pub fn new(from_address: &str, to_address: &str, amount: CoinSet) -> Self {
        Self {
            amount,
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
        }
    }

    pub fn to_msg(&self) -> Result<Msg, CodecError> {
        let value = serde_json::to_value(self).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Msg {
            kind: MSG_SEND.to_string(),
            value,
        })
    }
}

/// Fee amount and gas limit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: CoinSet,
    #[serde(with = "u64_string")]
    pub gas: u64,
}

/// A signature with the compressed public key that produced it, both hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Msg>,
    pub fee: StdFee,
    #[serde(default)]
    pub signatures: Vec<StdSignature>,
    #[serde(default)]
    pub memo: String,
}

impl StdTx {
    pub fn new(msg: Vec<Msg>, fee: StdFee, memo: &str) -> Self {
        Self {
            msg,
            fee,
            signatures: Vec::new(),
            memo: memo.to_string(),
        }
    }

    /// Every bank send carried by the transaction, in message order
    pub fn sends(&self) -> Result<Vec<MsgSend>, CodecError> {
        let mut sends = Vec::new();
        for msg in &self.msg {
            if let Some(send) = msg.as_send()? {
                sends.push(send);
            }
        }
        Ok(sends)
    }

    /// Required signers of every message, in order of first appearance
    pub fn signers(&self) -> Result<Vec<String>, CodecError> {
        let mut signers: Vec<String> = Vec::new();
        for msg in &self.msg {
            let signer = msg.signer()?;
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        Ok(signers)
    }

    /// Address that pays the fee: the signer of the first message
    pub fn fee_payer(&self) -> Result<Option<String>, CodecError> {
        self.msg.first().map(Msg::signer).transpose()
    }

    /// Canonical JSON body: sorted keys, no whitespace
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, CodecError> {
        canonical_json(self)
    }
}

/// The document a signer commits to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StdSignDoc {
    #[serde(with = "u64_string")]
    pub account_number: u64,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<Msg>,
    #[serde(with = "u64_string")]
    pub sequence: u64,
}

impl StdSignDoc {
    pub fn new(tx: &StdTx, chain_id: &str, account_number: u64, sequence: u64) -> Self {
        Self {
            account_number,
            chain_id: chain_id.to_string(),
            fee: tx.fee.clone(),
            memo: tx.memo.clone(),
            msgs: tx.msg.clone(),
            sequence,
        }
    }

    pub fn sign_bytes(&self) -> Result<Vec<u8>, CodecError> {
        canonical_json(self)
    }
}

fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    // Value objects are BTreeMaps, which sorts the keys of nested messages too
    let value = serde_json::to_value(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Serde adapter writing a `u64` as a decimal string
mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
