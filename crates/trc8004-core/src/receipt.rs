//! Transaction receipts: the read-only ledger output we decode events from.
//!
//! The JSON shape matches the ledger's transaction-info response:
//!
//! ```json
//! {
//!   "id": "…",
//!   "blockNumber": 123,
//!   "log": [{ "address": "…", "topics": ["…"], "data": "…" }]
//! }
//! ```
//!
//! Hex fields carry no `0x` prefix on the wire; log addresses are the bare
//! 20-byte account hash.
//!
//! Some providers also attach node-decoded events as
//! `"events": [{ "name": "…", "result": { … } }]`. Those are kept as-is in
//! [`ReceiptEvent`] and only consulted when no log decodes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Address, Word};

/// One log entry emitted during a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The emitting contract.
    pub address: Address,

    /// Indexed topics; `topics[0]` is the event signature hash.
    #[serde(default)]
    pub topics: Vec<Word>,

    /// Non-indexed fields, ABI-encoded.
    #[serde(default, with = "hex_bytes")]
    pub data: Bytes,
}

impl LogEntry {
    /// The event signature topic, if any.
    pub fn signature_topic(&self) -> Option<&Word> {
        self.topics.first()
    }
}

/// An event the node decoded on our behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEvent {
    pub name: String,

    /// Field values keyed by parameter name.
    #[serde(default)]
    pub result: Map<String, Value>,
}

impl ReceiptEvent {
    /// An unsigned field given as a JSON integer or a decimal string.
    pub fn uint(&self, key: &str) -> Option<u128> {
        match self.result.get(key)? {
            Value::Number(n) => n.as_u64().map(u128::from),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A confirmed transaction's receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Transaction id (hex), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Block the transaction was included in.
    #[serde(
        default,
        rename = "blockNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_number: Option<u64>,

    /// Log entries in emission order.
    #[serde(default, rename = "log")]
    pub logs: Vec<LogEntry>,

    /// Node-decoded events, when the provider supplies them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ReceiptEvent>,
}

impl TransactionReceipt {
    /// Build a receipt from log entries.
    pub fn from_logs(logs: Vec<LogEntry>) -> Self {
        Self {
            id: None,
            block_number: None,
            logs,
            events: Vec::new(),
        }
    }

    /// The first node-decoded event called `name`.
    pub fn decoded_event(&self, name: &str) -> Option<&ReceiptEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Parse the ledger's JSON form.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ledger_json() {
        let json = br#"{
            "id": "7c2d",
            "blockNumber": 51234,
            "fee": 1000,
            "log": [{
                "address": "a614f803b6fd780986a42c78ec9c7f77e6ded13c",
                "topics": [
                    "0d063c6022bff16d09991a9f91882ffa112f5fb2529136f65eb4c77bbd047e43",
                    "000000000000000000000000000000000000000000000000000000000000002a"
                ],
                "data": "00ff"
            }]
        }"#;

        let receipt = TransactionReceipt::from_json(json).unwrap();
        assert_eq!(receipt.block_number, Some(51234));
        assert_eq!(receipt.logs.len(), 1);

        let log = &receipt.logs[0];
        assert_eq!(log.address.0[0], Address::PREFIX);
        assert_eq!(log.topics[1].to_u128(), Some(42));
        assert_eq!(log.data.as_ref(), &[0x00, 0xff]);
    }

    #[test]
    fn test_node_decoded_events() {
        let receipt = TransactionReceipt::from_json(
            br#"{
                "id": "7c2d",
                "events": [
                    {"name": "Transfer", "result": {"value": 5}},
                    {"name": "AgentRegistered", "result": {"agentId": "42", "owner": "T..."}},
                    {"name": "AgentRegistered", "result": {"agent_id": 7}}
                ]
            }"#,
        )
        .unwrap();
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.events.len(), 3);

        let event = receipt.decoded_event("AgentRegistered").unwrap();
        assert_eq!(event.uint("agentId"), Some(42));
        assert_eq!(event.uint("owner"), None);
        assert_eq!(receipt.events[2].uint("agent_id"), Some(7));
        assert!(receipt.decoded_event("ValidationRequested").is_none());

        let echoed = serde_json::to_value(TransactionReceipt::from_logs(Vec::new())).unwrap();
        assert!(echoed.get("events").is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let receipt = TransactionReceipt::from_json(br#"{"id": "ab"}"#).unwrap();
        assert!(receipt.logs.is_empty());

        let receipt = TransactionReceipt::from_json(
            br#"{"log": [{"address": "a614f803b6fd780986a42c78ec9c7f77e6ded13c"}]}"#,
        )
        .unwrap();
        assert!(receipt.logs[0].topics.is_empty());
        assert!(receipt.logs[0].data.is_empty());
        assert!(receipt.logs[0].signature_topic().is_none());
    }
}
