//! Blocks and execution results as reported by the node

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header fields needed to pin and time-stamp a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    /// Uppercase hex
    pub hash: String,
    /// Uppercase hex, empty for the first block
    pub parent_hash: String,
    pub time: DateTime<Utc>,
}

impl BlockHeader {
    pub fn timestamp_millis(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

/// A block with its raw transactions
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// ABCI event emitted during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: &str, attributes: &[(&str, &str)]) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: attributes
                .iter()
                .map(|(key, value)| EventAttribute {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    /// First value for `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Outcome of a single transaction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub events: Vec<Event>,
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Execution results for every transaction of a block, in block order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockResults {
    pub height: u64,
    pub txs_results: Vec<TxResult>,
    pub begin_block_events: Vec<Event>,
    pub end_block_events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_attribute_lookup() {
        let event = Event::new("transfer", &[("recipient", "kava1b"), ("amount", "5ukava")]);
        assert_eq!(event.attribute("amount"), Some("5ukava"));
        assert_eq!(event.attribute("sender"), None);
    }

    #[test]
    fn test_event_json_uses_type_key() {
        let event: Event = serde_json::from_str(r#"{"type":"burn"}"#).unwrap();
        assert_eq!(event.kind, "burn");
        assert!(event.attributes.is_empty());
    }
}
