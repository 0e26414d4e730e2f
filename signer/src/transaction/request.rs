//! Transaction request values.
//!
//! A [`TransactionRequest`] is an open field map: the ledger keeps adding
//! transaction types and fields, and the codec is the authority on what is
//! valid. This wrapper only knows the handful of fields the pipeline itself
//! reads or fills in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::signing::SignedTransaction;

/// What a caller hands to the pipeline as "the transaction".
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionInput {
    /// A transaction field map.
    Json(Map<String, Value>),
    /// A JSON-encoded transaction, or something that only looks like one.
    Text(String),
    /// An already signed `{ tx_blob, tx_id }` pair.
    Signed(SignedTransaction),
    /// Anything else. Always rejected.
    Other(Value),
}

impl From<Value> for TransactionInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let signed = match (map.get("tx_blob"), map.get("tx_id")) {
                    (Some(Value::String(blob)), Some(Value::String(id))) => Some(SignedTransaction {
                        tx_blob: blob.clone(),
                        tx_id: id.clone(),
                    }),
                    _ => None,
                };
                match signed {
                    Some(signed) => TransactionInput::Signed(signed),
                    None => TransactionInput::Json(map),
                }
            }
            Value::String(text) => TransactionInput::Text(text),
            other => TransactionInput::Other(other),
        }
    }
}

impl From<SignedTransaction> for TransactionInput {
    fn from(signed: SignedTransaction) -> Self {
        TransactionInput::Signed(signed)
    }
}

impl From<&str> for TransactionInput {
    fn from(text: &str) -> Self {
        TransactionInput::Text(text.to_string())
    }
}

/// State of the `LastLedgerSequence` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastLedger {
    /// Not set: the transaction never expires.
    Absent,
    /// Set to `null`: fill in from the network before submitting.
    Auto,
    /// A concrete ledger index.
    Fixed(u32),
}

/// A normalized transaction field map.
///
/// Built by [`normalize`](super::normalize::normalize); never aliases the
/// caller's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRequest {
    fields: Map<String, Value>,
}

impl TransactionRequest {
    pub(crate) fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The sending account. Normalization guarantees it is a string.
    pub fn account(&self) -> &str {
        self.fields
            .get("Account")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn transaction_type(&self) -> Option<&str> {
        self.fields.get("TransactionType").and_then(Value::as_str)
    }

    pub fn sequence(&self) -> Option<u32> {
        self.fields
            .get("Sequence")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn has_fee(&self) -> bool {
        self.fields.contains_key("Fee")
    }

    pub fn flags(&self) -> Option<u32> {
        self.fields
            .get("Flags")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Only an explicit `null` asks for an automatic expiry. Normalization
    /// turns every other value into a ledger index or rejects it; anything
    /// else that slips through is left for the codec to refuse.
    pub fn last_ledger(&self) -> LastLedger {
        match self.fields.get("LastLedgerSequence") {
            None => LastLedger::Absent,
            Some(Value::Null) => LastLedger::Auto,
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(LastLedger::Fixed)
                .unwrap_or(LastLedger::Absent),
        }
    }

    pub fn set_sequence(&mut self, sequence: u32) {
        self.fields.insert("Sequence".into(), Value::from(sequence));
    }

    /// Fee in drops, stored as the decimal string the codec expects.
    pub fn set_fee(&mut self, drops: u64) {
        self.fields.insert("Fee".into(), Value::String(drops.to_string()));
    }

    pub fn set_last_ledger_sequence(&mut self, ledger_index: u32) {
        self.fields
            .insert("LastLedgerSequence".into(), Value::from(ledger_index));
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> TransactionRequest {
        TransactionRequest::from_map(value.as_object().cloned().unwrap())
    }

    #[test]
    fn input_classification() {
        assert!(matches!(
            TransactionInput::from(json!({"tx_blob": "AB", "tx_id": "CD"})),
            TransactionInput::Signed(_)
        ));
        assert!(matches!(
            TransactionInput::from(json!({"Account": "r"})),
            TransactionInput::Json(_)
        ));
        assert!(matches!(
            TransactionInput::from(json!("{}")),
            TransactionInput::Text(_)
        ));
        assert!(matches!(
            TransactionInput::from(json!(42)),
            TransactionInput::Other(_)
        ));
        // Half a signed pair is just a (bad) transaction object.
        assert!(matches!(
            TransactionInput::from(json!({"tx_blob": "AB"})),
            TransactionInput::Json(_)
        ));
    }

    #[test]
    fn last_ledger_states() {
        assert_eq!(request(json!({})).last_ledger(), LastLedger::Absent);
        assert_eq!(
            request(json!({"LastLedgerSequence": null})).last_ledger(),
            LastLedger::Auto
        );
        assert_eq!(
            request(json!({"LastLedgerSequence": 1000})).last_ledger(),
            LastLedger::Fixed(1000)
        );
        // Never mistaken for the placeholder.
        assert_eq!(
            request(json!({"LastLedgerSequence": "1000"})).last_ledger(),
            LastLedger::Absent
        );
    }

    #[test]
    fn setters_write_codec_shapes() {
        let mut req = request(json!({"Account": "rX"}));
        req.set_fee(12);
        req.set_sequence(3);
        req.set_last_ledger_sequence(1005);
        assert_eq!(req.get("Fee"), Some(&json!("12")));
        assert_eq!(req.sequence(), Some(3));
        assert_eq!(req.last_ledger(), LastLedger::Fixed(1005));
        assert_eq!(req.account(), "rX");
    }

    #[test]
    fn serializes_as_plain_map() {
        let req = request(json!({"Account": "rX", "Sequence": 1}));
        let text = serde_json::to_value(&req).unwrap();
        assert_eq!(text, json!({"Account": "rX", "Sequence": 1}));
    }
}
