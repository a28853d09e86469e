//! Construction options and metadata
//!
//! Both travel through the client as JSON maps. Each is parsed into a closed
//! struct; parsing reports every missing or malformed key at once.

use crate::codec::Msg;
use crate::core::{CoinSet, Dec};
use crate::crypto::validate_address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Gas adjustment used when the caller does not supply one
pub const DEFAULT_GAS_ADJUSTMENT: &str = "1.0";

/// Output of preprocess, input of metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionOptions {
    pub msgs: Vec<Msg>,
    pub memo: String,
    pub gas_adjustment: Dec,
    pub suggested_fee_multiplier: Dec,
    pub max_fee: Option<CoinSet>,
}

/// Account number and sequence of one required signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerData {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Output of metadata, input of payloads
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionMetadata {
    pub signers: Vec<SignerData>,
    pub gas_price: Dec,
    pub gas_wanted: u64,
    pub memo: String,
}

/// Collects the names of bad fields while a map is read
struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    invalid: Vec<String>,
}

impl<'a> FieldReader<'a> {
    fn new(map: &'a Map<String, Value>, version: u32) -> Self {
        let mut reader = Self {
            map,
            invalid: Vec::new(),
        };
        if let Some(v) = map.get("version") {
            if v.as_u64() != Some(u64::from(version)) {
                reader.invalid.push("version".to_string());
            }
        }
        reader
    }

    fn required<T>(&mut self, key: &str, parse: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        match self.map.get(key) {
            None | Some(Value::Null) => {
                self.invalid.push(key.to_string());
                None
            }
            Some(value) => self.parsed(key, value, parse),
        }
    }

    fn optional<T>(
        &mut self,
        key: &str,
        parse: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<Option<T>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(value) => self.parsed(key, value, parse).map(Some),
        }
    }

    fn parsed<T>(
        &mut self,
        key: &str,
        value: &Value,
        parse: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let parsed = parse(value);
        if parsed.is_none() {
            self.invalid.push(key.to_string());
        }
        parsed
    }

    fn finish(self) -> Result<(), Vec<String>> {
        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(self.invalid)
        }
    }
}

/// Decimals travel as strings; plain JSON numbers are accepted too
fn dec_value(value: &Value) -> Option<Dec> {
    match value {
        Value::String(s) => Dec::from_str(s).ok(),
        Value::Number(n) => n.as_f64().and_then(|f| Dec::from_f64(f).ok()),
        _ => None,
    }
}

fn string_value(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn typed<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

/// A bank send between two well-formed addresses of the chain
fn valid_send(msg: &Msg, account_prefix: &str) -> bool {
    match msg.as_send() {
        Ok(Some(send)) => {
            validate_address(&send.from_address, account_prefix).is_ok()
                && validate_address(&send.to_address, account_prefix).is_ok()
        }
        _ => false,
    }
}

impl ConstructionOptions {
    pub const VERSION: u32 = 1;

    /// Parse options whose send addresses must carry `account_prefix`
    pub fn from_map(map: &Map<String, Value>, account_prefix: &str) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(map, Self::VERSION);

        let msgs = reader.required("msgs", |v| {
            typed::<Vec<Msg>>(v).filter(|msgs| {
                !msgs.is_empty() && msgs.iter().all(|m| valid_send(m, account_prefix))
            })
        });
        let memo = reader.optional("memo", string_value);
        let gas_adjustment = reader.optional("gas_adjustment", dec_value);
        let multiplier = reader.required("suggested_fee_multiplier", dec_value);
        let max_fee = reader.optional("max_fee", typed::<CoinSet>);

        reader.finish()?;
        match (msgs, memo, gas_adjustment, multiplier, max_fee) {
            (Some(msgs), Some(memo), Some(gas_adjustment), Some(multiplier), Some(max_fee)) => {
                Ok(Self {
                    msgs,
                    memo: memo.unwrap_or_default(),
                    gas_adjustment: gas_adjustment.unwrap_or_else(default_gas_adjustment),
                    suggested_fee_multiplier: multiplier,
                    max_fee,
                })
            }
            _ => Err(vec!["options".to_string()]),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("version".to_string(), json!(Self::VERSION));
        map.insert("msgs".to_string(), json!(self.msgs));
        map.insert("memo".to_string(), json!(self.memo));
        map.insert(
            "gas_adjustment".to_string(),
            json!(self.gas_adjustment.to_string()),
        );
        map.insert(
            "suggested_fee_multiplier".to_string(),
            json!(self.suggested_fee_multiplier.to_string()),
        );
        if let Some(max_fee) = &self.max_fee {
            map.insert("max_fee".to_string(), json!(max_fee));
        }
        map
    }
}

pub fn default_gas_adjustment() -> Dec {
    Dec::from_str(DEFAULT_GAS_ADJUSTMENT).unwrap_or_else(|_| Dec::one())
}

impl ConstructionMetadata {
    pub const VERSION: u32 = 1;

    pub fn from_map(map: &Map<String, Value>) -> Result<Self, Vec<String>> {
        let mut reader = FieldReader::new(map, Self::VERSION);

        let signers = reader.required("signers", |v| {
            typed::<Vec<SignerData>>(v).filter(|signers| !signers.is_empty())
        });
        let gas_price = reader.required("gas_price", dec_value);
        let gas_wanted = reader.required("gas_wanted", Value::as_u64);
        let memo = reader.optional("memo", string_value);

        reader.finish()?;
        match (signers, gas_price, gas_wanted, memo) {
            (Some(signers), Some(gas_price), Some(gas_wanted), Some(memo)) => Ok(Self {
                signers,
                gas_price,
                gas_wanted,
                memo: memo.unwrap_or_default(),
            }),
            _ => Err(vec!["metadata".to_string()]),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("version".to_string(), json!(Self::VERSION));
        map.insert("signers".to_string(), json!(self.signers));
        map.insert("gas_price".to_string(), json!(self.gas_price.to_string()));
        map.insert("gas_wanted".to_string(), json!(self.gas_wanted));
        map.insert("memo".to_string(), json!(self.memo));
        map
    }
}

/// Names of the missing or malformed option keys
pub fn validate_options(map: &Map<String, Value>, account_prefix: &str) -> Vec<String> {
    ConstructionOptions::from_map(map, account_prefix)
        .err()
        .unwrap_or_default()
}

/// Names of the missing or malformed metadata keys
pub fn validate_metadata(map: &Map<String, Value>) -> Vec<String> {
    ConstructionMetadata::from_map(map).err().unwrap_or_default()
}
