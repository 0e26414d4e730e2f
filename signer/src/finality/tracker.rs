//! # Finality Tracker
//!
//! Submitting is easy; knowing whether the transaction made it is the hard
//! part. A `tes`-class submit result only means the server applied it to
//! its *open* ledger. The transaction is final only when the account
//! stream reports it validated in a closed ledger, and it is dead once a
//! ledger past its `LastLedgerSequence` closes without it.
//!
//! [`FinalityTracker::track`] subscribes, submits, then races those two
//! signals. Both listeners are taken from the connection *before* the
//! subscribe request goes out, so nothing that happens between subscribing
//! and submitting is missed. Both are dropped as soon as the race is
//! decided.

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::state::FinalityStateMachine;
use crate::config::{ENGINE_RESULT_QUEUED, ENGINE_RESULT_TENTATIVE_PREFIX, TrackerConfig};
use crate::error::{FinalityFailure, SignError, SignResult};
use crate::network::{
    request_with_timeout, server_error, LedgerConnection, StreamEvent,
};
use crate::transaction::SignedTransaction;

/// A transaction the account stream reported validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmedTransaction {
    pub tx_id: String,
    /// The transaction record exactly as the stream reported it.
    pub transaction: Value,
    pub ledger_index: Option<u32>,
    pub ledger_hash: Option<String>,
}

/// Drives one submission to a terminal outcome over a borrowed connection.
pub struct FinalityTracker<'a, C: LedgerConnection + ?Sized> {
    connection: &'a C,
    config: &'a TrackerConfig,
}

impl<'a, C: LedgerConnection + ?Sized> FinalityTracker<'a, C> {
    pub fn new(connection: &'a C, config: &'a TrackerConfig) -> Self {
        Self { connection, config }
    }

    /// Subscribe, submit and wait for the outcome.
    ///
    /// `account` is the account whose transaction stream carries the
    /// confirmation. With `last_ledger_sequence` unset the wait only ends
    /// on confirmation or when the connection's event stream closes.
    pub async fn track(
        &self,
        signed: &SignedTransaction,
        account: &str,
        last_ledger_sequence: Option<u32>,
    ) -> SignResult<ConfirmedTransaction> {
        let mut machine = FinalityStateMachine::new(signed.tx_id.clone(), last_ledger_sequence);

        let ledger_events = self.connection.events();
        let transaction_events = self.connection.events();

        // Idle -> Subscribed
        let subscribe = json!({
            "command": "subscribe",
            "streams": ["ledger"],
            "accounts": [account],
        });
        let response = request_with_timeout(self.connection, subscribe, self.config.request_timeout)
            .await
            .and_then(|response| match server_error(&response) {
                Some(err) => Err(err),
                None => Ok(response),
            });
        if let Err(e) = response {
            machine.mark_subscribe_failed();
            warn!(account, error = %e, "subscribe failed");
            return Err(SignError::Subscribe(e));
        }
        machine.mark_subscribed();
        debug!(account, tx_id = %signed.tx_id, "subscribed to ledger and account streams");

        // Subscribed -> Submitted
        let submit = json!({
            "command": "submit",
            "tx_blob": signed.tx_blob,
        });
        let response = match request_with_timeout(self.connection, submit, self.config.request_timeout).await {
            Ok(response) => response,
            Err(e) => {
                machine.mark_submit_rejected();
                warn!(tx_id = %signed.tx_id, error = %e, "submit failed");
                return Err(SignError::SubmitFailed(e));
            }
        };
        let engine_result = response
            .get("engine_result")
            .and_then(Value::as_str)
            .map(str::to_string);
        if !engine_result.as_deref().map(is_tentative_success).unwrap_or(false) {
            machine.mark_submit_rejected();
            let engine_result_message = response
                .get("engine_result_message")
                .and_then(Value::as_str)
                .map(str::to_string);
            warn!(
                tx_id = %signed.tx_id,
                engine_result = ?engine_result,
                "submit not accepted"
            );
            return Err(SignError::SubmitRejected {
                engine_result,
                engine_result_message,
                response,
            });
        }
        machine.mark_submitted();
        info!(
            tx_id = %signed.tx_id,
            engine_result = ?engine_result,
            last_ledger_sequence = ?last_ledger_sequence,
            "transaction submitted, awaiting validation"
        );

        // The expiry may already have passed while the submit was in flight.
        let ledger_last = self.connection.state().ledger_last;
        let outcome = if machine.is_expired_at(ledger_last) {
            Err(FinalityFailure::Expired {
                ledger_index: ledger_last,
                last_ledger_sequence: last_ledger_sequence.unwrap_or_default(),
            })
        } else {
            // A validated confirmation already buffered alongside an expiry
            // wins; it is ground truth.
            tokio::select! {
                biased;
                confirmed = wait_for_confirmation(transaction_events, &signed.tx_id) => confirmed,
                expired = wait_for_expiry(ledger_events, last_ledger_sequence) => Err(expired),
            }
        };

        if self.config.unsubscribe_on_finality {
            self.unsubscribe(account).await;
        }

        match outcome {
            Ok(confirmed) => {
                machine.mark_confirmed();
                info!(
                    tx_id = %signed.tx_id,
                    ledger_index = ?confirmed.ledger_index,
                    elapsed_ms = machine.elapsed_ms(),
                    "transaction validated"
                );
                Ok(confirmed)
            }
            Err(failure) => {
                match failure {
                    FinalityFailure::Expired { .. } => machine.mark_timed_out(),
                    FinalityFailure::StreamClosed => machine.mark_abandoned(),
                };
                warn!(tx_id = %signed.tx_id, reason = %failure, state = ?machine.state(), "transaction not processed");
                Err(SignError::NotFinalized(failure))
            }
        }
    }

    async fn unsubscribe(&self, account: &str) {
        let request = json!({
            "command": "unsubscribe",
            "accounts": [account],
        });
        if let Err(e) = request_with_timeout(self.connection, request, self.config.request_timeout).await {
            debug!(account, error = %e, "unsubscribe failed, ignoring");
        }
    }
}

/// `tes...` or `terQUEUED`.
pub fn is_tentative_success(engine_result: &str) -> bool {
    engine_result.starts_with(ENGINE_RESULT_TENTATIVE_PREFIX) || engine_result == ENGINE_RESULT_QUEUED
}

/// Resolves with the first validated report of `tx_id`.
async fn wait_for_confirmation(
    mut events: broadcast::Receiver<StreamEvent>,
    tx_id: &str,
) -> Result<ConfirmedTransaction, FinalityFailure> {
    loop {
        match events.recv().await {
            Ok(StreamEvent::Transaction(event)) if event.confirms(tx_id) => {
                return Ok(ConfirmedTransaction {
                    tx_id: tx_id.to_string(),
                    ledger_index: event.ledger_index,
                    ledger_hash: event.ledger_hash,
                    transaction: event.transaction,
                });
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "transaction listener lagged, events dropped");
            }
            Err(RecvError::Closed) => return Err(FinalityFailure::StreamClosed),
        }
    }
}

/// Resolves once a ledger past `last_ledger_sequence` closes. Without an
/// expiry it only resolves if the stream closes.
async fn wait_for_expiry(
    mut events: broadcast::Receiver<StreamEvent>,
    last_ledger_sequence: Option<u32>,
) -> FinalityFailure {
    loop {
        match events.recv().await {
            Ok(StreamEvent::LedgerClosed(closed)) => {
                if let Some(lls) = last_ledger_sequence {
                    if closed.ledger_index > lls {
                        return FinalityFailure::Expired {
                            ledger_index: closed.ledger_index,
                            last_ledger_sequence: lls,
                        };
                    }
                }
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "ledger listener lagged, events dropped");
            }
            // The confirmation side reports closure.
            Err(RecvError::Closed) => return std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LedgerClosed, TransactionEvent};

    const TX_ID: &str = "ABCDEF";

    fn ledger(index: u32) -> StreamEvent {
        StreamEvent::LedgerClosed(LedgerClosed {
            ledger_index: index,
            ledger_hash: None,
            fee_base: None,
            txn_count: None,
        })
    }

    fn transaction(hash: &str, validated: bool) -> StreamEvent {
        StreamEvent::Transaction(TransactionEvent {
            kind: "transaction".into(),
            engine_result: Some("tesSUCCESS".into()),
            engine_result_message: None,
            status: Some("closed".into()),
            validated,
            transaction: json!({"hash": hash}),
            ledger_index: Some(42),
            ledger_hash: Some("HASH".into()),
        })
    }

    #[test]
    fn tentative_results() {
        assert!(is_tentative_success("tesSUCCESS"));
        assert!(is_tentative_success("terQUEUED"));
        assert!(!is_tentative_success("terPRE_SEQ"));
        assert!(!is_tentative_success("tecUNFUNDED_PAYMENT"));
        assert!(!is_tentative_success("tefPAST_SEQ"));
    }

    #[tokio::test]
    async fn confirmation_skips_unrelated_events() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(ledger(10)).unwrap();
        tx.send(transaction("OTHER", true)).unwrap();
        tx.send(transaction(TX_ID, false)).unwrap();
        tx.send(transaction(TX_ID, true)).unwrap();

        let confirmed = wait_for_confirmation(rx, TX_ID).await.unwrap();
        assert_eq!(confirmed.tx_id, TX_ID);
        assert_eq!(confirmed.ledger_index, Some(42));
        assert_eq!(confirmed.transaction["hash"], TX_ID);
    }

    #[tokio::test]
    async fn confirmation_reports_closed_stream() {
        let (tx, rx) = broadcast::channel::<StreamEvent>(4);
        drop(tx);
        assert!(matches!(
            wait_for_confirmation(rx, TX_ID).await,
            Err(FinalityFailure::StreamClosed)
        ));
    }

    #[tokio::test]
    async fn expiry_waits_for_strictly_later_ledger() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(ledger(999)).unwrap();
        tx.send(ledger(1000)).unwrap();
        tx.send(ledger(1001)).unwrap();

        match wait_for_expiry(rx, Some(1000)).await {
            FinalityFailure::Expired {
                ledger_index,
                last_ledger_sequence,
            } => {
                assert_eq!(ledger_index, 1001);
                assert_eq!(last_ledger_sequence, 1000);
            }
            other => panic!("expected expiry, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_expiry_never_times_out() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(ledger(u32::MAX)).unwrap();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(60),
            wait_for_expiry(rx, None),
        )
        .await;
        assert!(result.is_err(), "must still be waiting");
    }
}
