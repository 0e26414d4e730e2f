//! Error types for the signing and submission pipeline.
//!
//! Every public operation returns a [`SignError`]. Each variant maps to one
//! stable, machine-readable [`ErrorKind`] (the snake_case names callers
//! match on) plus a human message and, where one exists, the underlying
//! cause or the raw server response.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::keys::KeyError;
use crate::network::ConnectionError;

/// Result alias used across the crate.
pub type SignResult<T> = Result<T, SignError>;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    InvalidTransactionType,
    TransactionInvalidNoSignedObject,
    TransactionInvalid,
    MissingAccount,
    InvalidSequence,
    InvalidLastLedgerSequence,
    InvalidFlags,
    SeedInvalid,
    KeypairInvalid,
    KeypairInvalidKeys,
    KeypairInvalidHex,
    SequenceRequiredOffline,
    FeeRequiredOffline,
    LastLedgerSequenceRequiredOffline,
    SignError,
    SubscribeError,
    TransactionSubmitError,
    TransactionSubmitNonTesOrQueued,
    TransactionError,
    AccountInfoError,
    AccountInfoInvalid,
    InvalidWsclient,
}

impl ErrorKind {
    /// The snake_case name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::InvalidTransactionType => "invalid_transaction_type",
            ErrorKind::TransactionInvalidNoSignedObject => "transaction_invalid_no_signed_object",
            ErrorKind::TransactionInvalid => "transaction_invalid",
            ErrorKind::MissingAccount => "missing_account",
            ErrorKind::InvalidSequence => "invalid_sequence",
            ErrorKind::InvalidLastLedgerSequence => "invalid_last_ledger_sequence",
            ErrorKind::InvalidFlags => "invalid_flags",
            ErrorKind::SeedInvalid => "seed_invalid",
            ErrorKind::KeypairInvalid => "keypair_invalid",
            ErrorKind::KeypairInvalidKeys => "keypair_invalid_keys",
            ErrorKind::KeypairInvalidHex => "keypair_invalid_hex",
            ErrorKind::SequenceRequiredOffline => "sequence_required_offline",
            ErrorKind::FeeRequiredOffline => "fee_required_offline",
            ErrorKind::LastLedgerSequenceRequiredOffline => "last_ledger_sequence_required_offline",
            ErrorKind::SignError => "sign_error",
            ErrorKind::SubscribeError => "subscribe_error",
            ErrorKind::TransactionSubmitError => "transaction_submit_error",
            ErrorKind::TransactionSubmitNonTesOrQueued => "transaction_submit_non_tes_or_queued",
            ErrorKind::TransactionError => "transaction_error",
            ErrorKind::AccountInfoError => "account_info_error",
            ErrorKind::AccountInfoInvalid => "account_info_invalid",
            ErrorKind::InvalidWsclient => "invalid_wsclient",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A field that offline signing cannot invent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineField {
    Sequence,
    Fee,
    LastLedgerSequence,
}

impl OfflineField {
    fn kind(&self) -> ErrorKind {
        match self {
            OfflineField::Sequence => ErrorKind::SequenceRequiredOffline,
            OfflineField::Fee => ErrorKind::FeeRequiredOffline,
            OfflineField::LastLedgerSequence => ErrorKind::LastLedgerSequenceRequiredOffline,
        }
    }

    fn field_name(&self) -> &'static str {
        match self {
            OfflineField::Sequence => "Sequence",
            OfflineField::Fee => "Fee",
            OfflineField::LastLedgerSequence => "LastLedgerSequence",
        }
    }
}

/// What went wrong while encoding or signing.
#[derive(Debug, Error)]
pub enum SignCause {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Why the confirmation race ended without a validated transaction.
#[derive(Debug, Error)]
pub enum FinalityFailure {
    /// A ledger closed past the transaction's expiry.
    #[error("timeout, ledger_index {ledger_index} > tx LastLedgerSequence {last_ledger_sequence}")]
    Expired {
        ledger_index: u32,
        last_ledger_sequence: u32,
    },

    /// The connection's event stream ended before either side of the race
    /// resolved.
    #[error("event stream closed before the transaction was validated")]
    StreamClosed,
}

// ---------------------------------------------------------------------------
// SignError
// ---------------------------------------------------------------------------

/// The single terminal error every pipeline operation reports.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("the transaction looks like a JSON string, but could not be decoded: {reason}")]
    MalformedInput { reason: String },

    #[error("invalid transaction, expecting a transaction object or JSON encoded string")]
    InvalidTransactionType,

    #[error("invalid transaction, no transaction JSON and not a signed object {{ tx_blob, tx_id }}")]
    UnsignedBlob,

    #[error("error decoding signed transaction: {0}")]
    TransactionInvalid(#[source] CodecError),

    #[error("invalid transaction object, Account property not found")]
    MissingAccount,

    #[error("the Sequence property is invalid (expected number): {0}")]
    InvalidSequence(String),

    #[error("the LastLedgerSequence property is invalid (expected number or null): {0}")]
    InvalidLastLedgerSequence(String),

    #[error("the Flags property is invalid: {0}")]
    InvalidFlags(String),

    #[error("invalid seed / secret (sXXX...) entered")]
    SeedInvalid(#[source] KeyError),

    #[error("invalid keypair, no valid seed / secret / keypair entered: {0}")]
    KeypairInvalid(String),

    #[error("invalid keypair, privateKey and/or publicKey properties missing")]
    KeypairMissingKeys,

    #[error("invalid keypair, privateKey and/or publicKey not hexadecimal")]
    KeypairInvalidHex,

    #[error("{} required for offline signing", offline_field_list(.missing))]
    OfflineFieldsRequired { missing: Vec<OfflineField> },

    #[error("error signing the transaction: {0}")]
    Sign(#[source] SignCause),

    #[error("cannot subscribe to account (listen for account transaction events): {0}")]
    Subscribe(#[source] ConnectionError),

    #[error("transaction not sent or not accepted: {0}")]
    SubmitFailed(#[source] ConnectionError),

    #[error("transaction result not tes(SUCCESS) / terQUEUED{}", submit_suffix(.engine_result, .engine_result_message))]
    SubmitRejected {
        engine_result: Option<String>,
        engine_result_message: Option<String>,
        response: Value,
    },

    #[error("transaction not processed: {0}")]
    NotFinalized(#[source] FinalityFailure),

    #[error("error retrieving account_info: {0}")]
    AccountInfoFailed(#[source] ConnectionError),

    #[error("no account_data from account_info request{}", message_suffix(.error_message))]
    AccountInfoInvalid {
        error_message: Option<String>,
        response: Value,
    },

    #[error("invalid connection: {0}")]
    InvalidConnection(String),
}

impl SignError {
    /// The primary machine-readable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignError::MalformedInput { .. } => ErrorKind::MalformedInput,
            SignError::InvalidTransactionType => ErrorKind::InvalidTransactionType,
            SignError::UnsignedBlob => ErrorKind::TransactionInvalidNoSignedObject,
            SignError::TransactionInvalid(_) => ErrorKind::TransactionInvalid,
            SignError::MissingAccount => ErrorKind::MissingAccount,
            SignError::InvalidSequence(_) => ErrorKind::InvalidSequence,
            SignError::InvalidLastLedgerSequence(_) => ErrorKind::InvalidLastLedgerSequence,
            SignError::InvalidFlags(_) => ErrorKind::InvalidFlags,
            SignError::SeedInvalid(_) => ErrorKind::SeedInvalid,
            SignError::KeypairInvalid(_) => ErrorKind::KeypairInvalid,
            SignError::KeypairMissingKeys => ErrorKind::KeypairInvalidKeys,
            SignError::KeypairInvalidHex => ErrorKind::KeypairInvalidHex,
            SignError::OfflineFieldsRequired { missing } => missing
                .first()
                .map(OfflineField::kind)
                .unwrap_or(ErrorKind::SequenceRequiredOffline),
            SignError::Sign(_) => ErrorKind::SignError,
            SignError::Subscribe(_) => ErrorKind::SubscribeError,
            SignError::SubmitFailed(_) => ErrorKind::TransactionSubmitError,
            SignError::SubmitRejected { .. } => ErrorKind::TransactionSubmitNonTesOrQueued,
            SignError::NotFinalized(_) => ErrorKind::TransactionError,
            SignError::AccountInfoFailed(_) => ErrorKind::AccountInfoError,
            SignError::AccountInfoInvalid { .. } => ErrorKind::AccountInfoInvalid,
            SignError::InvalidConnection(_) => ErrorKind::InvalidWsclient,
        }
    }

    /// Every kind this error stands for. Only the offline guard reports
    /// more than one.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self {
            SignError::OfflineFieldsRequired { missing } => {
                missing.iter().map(OfflineField::kind).collect()
            }
            other => vec![other.kind()],
        }
    }

    /// Structured details in the `{ type, message, error }` shape callers
    /// log or forward. `error` carries the raw server response when there is
    /// one, otherwise the cause's message.
    pub fn details(&self) -> Value {
        let error = match self {
            SignError::SubmitRejected { response, .. }
            | SignError::AccountInfoInvalid { response, .. } => Some(response.clone()),
            other => std::error::Error::source(other).map(|s| Value::String(s.to_string())),
        };

        let mut details = json!({
            "type": self.kind().as_str(),
            "message": self.to_string(),
        });
        if let Some(error) = error {
            details["error"] = error;
        }
        if self.kinds().len() > 1 {
            details["types"] = Value::Array(
                self.kinds()
                    .iter()
                    .map(|k| Value::String(k.as_str().to_string()))
                    .collect(),
            );
        }
        details
    }
}

impl From<CodecError> for SignError {
    fn from(e: CodecError) -> Self {
        SignError::Sign(SignCause::Codec(e))
    }
}

fn offline_field_list(missing: &[OfflineField]) -> String {
    let names: Vec<&str> = missing.iter().map(OfflineField::field_name).collect();
    let noun = if names.len() == 1 { "property is" } else { "properties are" };
    format!("the {} {}", names.join(" and "), noun)
}

fn submit_suffix(engine_result: &Option<String>, message: &Option<String>) -> String {
    let mut suffix = String::new();
    if let Some(result) = engine_result {
        suffix.push_str(": ");
        suffix.push_str(result);
    }
    if let Some(message) = message {
        suffix.push_str(", ");
        suffix.push_str(message);
    }
    suffix
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(ErrorKind::SequenceRequiredOffline.as_str(), "sequence_required_offline");
        assert_eq!(
            ErrorKind::TransactionSubmitNonTesOrQueued.as_str(),
            "transaction_submit_non_tes_or_queued"
        );
        assert_eq!(ErrorKind::InvalidWsclient.as_str(), "invalid_wsclient");

        // serde and as_str must agree.
        let json = serde_json::to_string(&ErrorKind::AccountInfoInvalid).unwrap();
        assert_eq!(json, "\"account_info_invalid\"");
    }

    #[test]
    fn offline_guard_reports_every_missing_field() {
        let err = SignError::OfflineFieldsRequired {
            missing: vec![OfflineField::Sequence, OfflineField::Fee],
        };
        assert_eq!(err.kind(), ErrorKind::SequenceRequiredOffline);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::SequenceRequiredOffline, ErrorKind::FeeRequiredOffline]
        );
        assert!(err.to_string().contains("Sequence and Fee properties are"));
        assert_eq!(err.details()["types"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn submit_rejection_message_includes_engine_result() {
        let err = SignError::SubmitRejected {
            engine_result: Some("tecUNFUNDED_PAYMENT".into()),
            engine_result_message: Some("Insufficient XRP balance to send.".into()),
            response: json!({"engine_result": "tecUNFUNDED_PAYMENT"}),
        };
        let message = err.to_string();
        assert!(message.ends_with(": tecUNFUNDED_PAYMENT, Insufficient XRP balance to send."));

        let details = err.details();
        assert_eq!(details["type"], "transaction_submit_non_tes_or_queued");
        assert_eq!(details["error"]["engine_result"], "tecUNFUNDED_PAYMENT");
    }

    #[test]
    fn account_info_invalid_appends_server_message() {
        let err = SignError::AccountInfoInvalid {
            error_message: Some("Account not found.".into()),
            response: json!({"error": "actNotFound"}),
        };
        assert_eq!(
            err.to_string(),
            "no account_data from account_info request: Account not found."
        );
    }

    #[test]
    fn details_carry_the_cause() {
        let err = SignError::NotFinalized(FinalityFailure::Expired {
            ledger_index: 1001,
            last_ledger_sequence: 1000,
        });
        let details = err.details();
        assert_eq!(details["type"], "transaction_error");
        assert!(details["error"].as_str().unwrap().contains("1001"));
    }
}
