//! # Pipeline
//!
//! The entry boundary. Each function takes the transaction, the signing
//! credentials and (when online) the connection as separately typed
//! arguments, so a connection can never be mistaken for a key.
//!
//! ```text
//! input ─► normalize ─► resolve keys ─► [fill Sequence/Fee/LastLedgerSequence] ─► sign ─► track
//!   └── pre-signed { tx_blob, tx_id } ──────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::codec::CodecError;
use crate::config::TrackerConfig;
use crate::error::{SignError, SignResult};
use crate::finality::{ConfirmedTransaction, FinalityTracker};
use crate::identity::{resolve, KeyInput};
use crate::network::{request_with_timeout, LedgerConnection};
use crate::transaction::{
    normalize, sign, transaction_id, LastLedger, SignedTransaction, SigningMode,
    TransactionInput,
};

/// Terminal success value of [`process`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Signed offline; nothing was sent.
    Signed(SignedTransaction),
    /// Submitted and seen validated.
    Confirmed(ConfirmedTransaction),
}

/// Sign without a connection. `Sequence` and `Fee` must be present.
pub fn sign_offline(input: &TransactionInput, keys: &KeyInput) -> SignResult<SignedTransaction> {
    let request = normalize(input, SigningMode::Offline)?;
    let keys = resolve(keys)?;
    sign(&request, &keys)
}

/// Fill in what is missing from the network, sign, submit and wait for the
/// outcome.
pub async fn sign_and_submit<C>(
    input: &TransactionInput,
    keys: &KeyInput,
    connection: &C,
    config: &TrackerConfig,
) -> SignResult<ConfirmedTransaction>
where
    C: LedgerConnection + ?Sized,
{
    ensure_ready(connection)?;
    let mut request = normalize(input, SigningMode::Online)?;
    let keys = resolve(keys)?;

    if request.sequence().is_none() {
        let sequence = fetch_sequence(connection, request.account(), config).await?;
        request.set_sequence(sequence);
    }

    let state = connection.state();
    if !request.has_fee() {
        request.set_fee(state.fee_avg);
    }
    if request.last_ledger() == LastLedger::Auto {
        request.set_last_ledger_sequence(state.ledger_last.saturating_add(config.last_ledger_offset));
    }
    debug!(
        account = %request.account(),
        sequence = ?request.sequence(),
        fee = ?request.get("Fee"),
        last_ledger = ?request.last_ledger(),
        "transaction filled from network"
    );

    let signed = sign(&request, &keys)?;
    let last_ledger_sequence = match request.last_ledger() {
        LastLedger::Fixed(index) => Some(index),
        LastLedger::Absent | LastLedger::Auto => None,
    };
    FinalityTracker::new(connection, config)
        .track(&signed, request.account(), last_ledger_sequence)
        .await
}

/// Submit an already signed transaction and wait for the outcome.
///
/// The blob is decoded to find the account to watch and the expiry. The
/// `tx_id` the tracker waits for must be the blob's own hash; a pair whose
/// ID does not match its blob is rejected before anything is sent.
pub async fn submit_signed<C>(
    signed: &SignedTransaction,
    connection: &C,
    config: &TrackerConfig,
) -> SignResult<ConfirmedTransaction>
where
    C: LedgerConnection + ?Sized,
{
    ensure_ready(connection)?;
    check_tx_id(signed)?;
    let decoded = signed.decode().map_err(SignError::TransactionInvalid)?;
    let account = decoded
        .get("Account")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SignError::TransactionInvalid(CodecError::InvalidValue {
                field: "Account".into(),
                reason: "signed transaction has no account".into(),
            })
        })?;
    let last_ledger_sequence = decoded
        .get("LastLedgerSequence")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    info!(account, tx_id = %signed.tx_id, "submitting pre-signed transaction");
    FinalityTracker::new(connection, config)
        .track(signed, account, last_ledger_sequence)
        .await
}

/// Dispatch on what was supplied:
///
/// | input      | connection | result                       |
/// |------------|------------|------------------------------|
/// | pre-signed | yes        | [`submit_signed`]            |
/// | pre-signed | no         | `invalid_wsclient`           |
/// | other      | yes        | [`sign_and_submit`]          |
/// | other      | no         | [`sign_offline`]             |
///
/// Keys are required unless the input is pre-signed.
pub async fn process(
    input: &TransactionInput,
    keys: Option<&KeyInput>,
    connection: Option<&dyn LedgerConnection>,
    config: &TrackerConfig,
) -> SignResult<Outcome> {
    match (input, connection) {
        (TransactionInput::Signed(signed), Some(connection)) => {
            submit_signed(signed, connection, config)
                .await
                .map(Outcome::Confirmed)
        }
        (TransactionInput::Signed(_), None) => Err(SignError::InvalidConnection(
            "a pre-signed transaction can only be submitted over a connection".into(),
        )),
        (_, connection) => {
            let keys = keys.ok_or_else(|| {
                SignError::KeypairInvalid("no valid seed / secret / keypair entered".into())
            })?;
            match connection {
                Some(connection) => sign_and_submit(input, keys, connection, config)
                    .await
                    .map(Outcome::Confirmed),
                None => sign_offline(input, keys).map(Outcome::Signed),
            }
        }
    }
}

fn check_tx_id(signed: &SignedTransaction) -> SignResult<()> {
    let blob = hex::decode(signed.tx_blob.trim())
        .map_err(|_| SignError::TransactionInvalid(CodecError::InvalidHex("tx_blob".into())))?;
    let expected = transaction_id(&blob);
    if expected.eq_ignore_ascii_case(signed.tx_id.trim()) {
        Ok(())
    } else {
        Err(SignError::TransactionInvalid(CodecError::InvalidValue {
            field: "tx_id".into(),
            reason: format!("{} does not match the blob, which hashes to {}", signed.tx_id, expected),
        }))
    }
}

fn ensure_ready<C: LedgerConnection + ?Sized>(connection: &C) -> SignResult<()> {
    if connection.is_ready() {
        Ok(())
    } else {
        Err(SignError::InvalidConnection("connection is not open".into()))
    }
}

async fn fetch_sequence<C>(connection: &C, account: &str, config: &TrackerConfig) -> SignResult<u32>
where
    C: LedgerConnection + ?Sized,
{
    let request = json!({
        "command": "account_info",
        "account": account,
    });
    let response = request_with_timeout(connection, request, config.request_timeout)
        .await
        .map_err(SignError::AccountInfoFailed)?;

    let sequence = response
        .get("account_data")
        .and_then(|data| data.get("Sequence"))
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());
    match sequence {
        Some(sequence) => {
            debug!(account, sequence, "sequence from account_info");
            Ok(sequence)
        }
        None => Err(SignError::AccountInfoInvalid {
            error_message: response
                .get("error_message")
                .and_then(Value::as_str)
                .map(str::to_string),
            response,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const GENESIS_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";

    fn payment() -> TransactionInput {
        TransactionInput::from(json!({
            "TransactionType": "Payment",
            "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
            "Destination": "rrrrrrrrrrrrrrrrrrrrrhoLvTp",
            "Amount": 1000000,
            "Fee": 12,
            "Sequence": 1,
        }))
    }

    #[test]
    fn offline_signing() {
        let signed = sign_offline(&payment(), &KeyInput::from(GENESIS_SEED)).unwrap();
        assert_eq!(signed.tx_id.len(), 64);
    }

    #[tokio::test]
    async fn process_without_connection_signs() {
        let outcome = process(&payment(), Some(&KeyInput::from(GENESIS_SEED)), None, &TrackerConfig::default())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Signed(_)));
    }

    #[tokio::test]
    async fn process_requires_keys() {
        let err = process(&payment(), None, None, &TrackerConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeypairInvalid);
    }

    #[tokio::test]
    async fn presigned_needs_connection() {
        let signed = sign_offline(&payment(), &KeyInput::from(GENESIS_SEED)).unwrap();
        let err = process(&TransactionInput::Signed(signed), None, None, &TrackerConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWsclient);
    }

    #[test]
    fn tx_id_must_match_the_blob() {
        let signed = sign_offline(&payment(), &KeyInput::from(GENESIS_SEED)).unwrap();
        assert!(check_tx_id(&signed).is_ok());

        let lowercase = SignedTransaction {
            tx_blob: signed.tx_blob.clone(),
            tx_id: signed.tx_id.to_lowercase(),
        };
        assert!(check_tx_id(&lowercase).is_ok());

        let stale = SignedTransaction {
            tx_blob: signed.tx_blob.clone(),
            tx_id: "0".repeat(64),
        };
        assert_eq!(check_tx_id(&stale).unwrap_err().kind(), ErrorKind::TransactionInvalid);
    }

    #[test]
    fn outcome_serializes_untagged() {
        let signed = sign_offline(&payment(), &KeyInput::from(GENESIS_SEED)).unwrap();
        let value = serde_json::to_value(Outcome::Signed(signed.clone())).unwrap();
        assert_eq!(value["tx_id"], json!(signed.tx_id));
    }
}
