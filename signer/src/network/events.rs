//! Stream events pushed by the server after `subscribe`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ENGINE_RESULT_SUCCESS;

/// A parsed stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    LedgerClosed(LedgerClosed),
    Transaction(TransactionEvent),
}

/// `ledgerClosed` message from the `ledger` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClosed {
    pub ledger_index: u32,
    #[serde(default)]
    pub ledger_hash: Option<String>,
    /// Reference fee in drops.
    #[serde(default)]
    pub fee_base: Option<u64>,
    #[serde(default)]
    pub txn_count: Option<u32>,
}

/// `transaction` message from an account stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub engine_result: Option<String>,
    #[serde(default)]
    pub engine_result_message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub transaction: Value,
    #[serde(default)]
    pub ledger_index: Option<u32>,
    #[serde(default)]
    pub ledger_hash: Option<String>,
}

impl StreamEvent {
    /// Parse a server message by its `type` tag. Responses and message
    /// types the pipeline does not consume give `None`.
    pub fn from_message(message: &Value) -> Option<Self> {
        match message.get("type")?.as_str()? {
            "ledgerClosed" => serde_json::from_value(message.clone())
                .ok()
                .map(StreamEvent::LedgerClosed),
            "transaction" => serde_json::from_value(message.clone())
                .ok()
                .map(StreamEvent::Transaction),
            _ => None,
        }
    }
}

impl TransactionEvent {
    /// Hash of the reported transaction.
    pub fn hash(&self) -> Option<&str> {
        self.transaction.get("hash").and_then(Value::as_str)
    }

    /// `true` only for a successful, closed, validated report of exactly
    /// `tx_id`. A transaction that was merely seen does not count.
    pub fn confirms(&self, tx_id: &str) -> bool {
        self.kind == "transaction"
            && self.engine_result.as_deref() == Some(ENGINE_RESULT_SUCCESS)
            && self.hash() == Some(tx_id)
            && self.status.as_deref() == Some("closed")
            && self.validated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TX_ID: &str = "E08D6E9754025BA2534A78707605E0601F03ACE063687A0CA1BDDACFCD1698C7";

    fn transaction_message() -> Value {
        json!({
            "type": "transaction",
            "engine_result": "tesSUCCESS",
            "engine_result_message": "The transaction was applied.",
            "status": "closed",
            "validated": true,
            "ledger_index": 1000,
            "transaction": {"hash": TX_ID, "Account": "rX"},
        })
    }

    fn parse_transaction(message: Value) -> TransactionEvent {
        match StreamEvent::from_message(&message) {
            Some(StreamEvent::Transaction(event)) => event,
            other => panic!("expected transaction event, got {:?}", other),
        }
    }

    #[test]
    fn ledger_closed_parses() {
        let event = StreamEvent::from_message(&json!({
            "type": "ledgerClosed",
            "ledger_index": 1001,
            "ledger_hash": "AB",
            "fee_base": 10,
            "txn_count": 3,
        }));
        match event {
            Some(StreamEvent::LedgerClosed(closed)) => {
                assert_eq!(closed.ledger_index, 1001);
                assert_eq!(closed.fee_base, Some(10));
            }
            other => panic!("expected ledger event, got {:?}", other),
        }
    }

    #[test]
    fn responses_are_not_events() {
        assert!(StreamEvent::from_message(&json!({"id": 1, "status": "success"})).is_none());
        assert!(StreamEvent::from_message(&json!({"type": "response", "id": 1})).is_none());
        assert!(StreamEvent::from_message(&json!({"type": "ledgerClosed"})).is_none());
    }

    #[test]
    fn confirmation_requires_every_condition() {
        assert!(parse_transaction(transaction_message()).confirms(TX_ID));
        assert!(!parse_transaction(transaction_message()).confirms("FFFF"));

        let mut unvalidated = transaction_message();
        unvalidated["validated"] = json!(false);
        assert!(!parse_transaction(unvalidated).confirms(TX_ID));

        let mut proposed = transaction_message();
        proposed["status"] = json!("proposed");
        assert!(!parse_transaction(proposed).confirms(TX_ID));

        let mut failed = transaction_message();
        failed["engine_result"] = json!("tecUNFUNDED_PAYMENT");
        assert!(!parse_transaction(failed).confirms(TX_ID));

        let mut missing = transaction_message();
        missing.as_object_mut().unwrap().remove("validated");
        assert!(!parse_transaction(missing).confirms(TX_ID));
    }
}
