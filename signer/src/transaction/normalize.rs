//! Field normalization.
//!
//! Callers write transactions the way they think about them: fees as
//! numbers, sequences as strings, flags left out. The codec wants exactly
//! one shape per field. [`normalize`] bridges the two and fails early on
//! anything the codec would only reject later with a less useful error.

use serde_json::{Map, Value};
use tracing::debug;

use super::request::{TransactionInput, TransactionRequest};
use crate::config::TF_FULLY_CANONICAL_SIG;
use crate::error::{OfflineField, SignError, SignResult};

/// Amount-typed fields whose numeric values must travel as strings.
const AMOUNT_FIELDS: &[&str] = &[
    "Amount",
    "SendMax",
    "DeliverMin",
    "TakerPays",
    "TakerGets",
    "LimitAmount",
];

/// Minimum length of an uppercase hex string that is taken for a bare
/// signed blob.
const MIN_BARE_BLOB_LENGTH: usize = 10;

/// Whether a live connection will be available to fill in missing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    Offline,
    Online,
}

/// Produce a normalized copy of `input`.
///
/// Offline, `Sequence` and `Fee` must be present and `LastLedgerSequence`
/// cannot be the `null` placeholder; every missing one is reported in a
/// single error.
pub fn normalize(input: &TransactionInput, mode: SigningMode) -> SignResult<TransactionRequest> {
    let parsed;
    let map = match input {
        TransactionInput::Json(map) => map,
        TransactionInput::Text(text) => {
            parsed = parse_text(text)?;
            &parsed
        }
        TransactionInput::Signed(_) | TransactionInput::Other(_) => {
            return Err(SignError::InvalidTransactionType)
        }
    };
    normalize_map(map, mode)
}

fn parse_text(text: &str) -> SignResult<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SignError::InvalidTransactionType),
            Err(e) => Err(SignError::MalformedInput {
                reason: e.to_string(),
            }),
        };
    }
    if looks_like_blob(trimmed) {
        return Err(SignError::UnsignedBlob);
    }
    Err(SignError::InvalidTransactionType)
}

fn looks_like_blob(text: &str) -> bool {
    text.len() >= MIN_BARE_BLOB_LENGTH
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

fn normalize_map(map: &Map<String, Value>, mode: SigningMode) -> SignResult<TransactionRequest> {
    if !matches!(map.get("Account"), Some(Value::String(_))) {
        return Err(SignError::MissingAccount);
    }

    if mode == SigningMode::Offline {
        let mut missing = Vec::new();
        if !map.contains_key("Sequence") {
            missing.push(OfflineField::Sequence);
        }
        if !map.contains_key("Fee") {
            missing.push(OfflineField::Fee);
        }
        if matches!(map.get("LastLedgerSequence"), Some(Value::Null)) {
            missing.push(OfflineField::LastLedgerSequence);
        }
        if !missing.is_empty() {
            return Err(SignError::OfflineFieldsRequired { missing });
        }
    }

    let mut fields = map.clone();

    if let Some(fee) = fields.get_mut("Fee") {
        coerce_to_string(fee);
    }
    for name in AMOUNT_FIELDS {
        if let Some(amount) = fields.get_mut(*name) {
            coerce_amount(amount);
        }
    }

    if let Some(sequence) = fields.get("Sequence") {
        let sequence = parse_sequence(sequence)?;
        fields.insert("Sequence".into(), Value::from(sequence));
    }
    match fields.get("LastLedgerSequence") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let index = parse_ledger_index(value)?;
            fields.insert("LastLedgerSequence".into(), Value::from(index));
        }
    }

    let flags = canonical_flags(fields.get("Flags"))?;
    fields.insert("Flags".into(), Value::from(flags));

    let request = TransactionRequest::from_map(fields);
    debug!(
        account = %request.account(),
        transaction_type = ?request.transaction_type(),
        flags,
        "transaction normalized"
    );
    Ok(request)
}

/// Numbers become decimal strings. Whole floats such as `250000.0` (what
/// `0.25 * 1_000_000` yields) drop the fraction, since drops are integers.
fn coerce_to_string(value: &mut Value) {
    if let Value::Number(n) = value {
        let text = match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e17 => format!("{:.0}", f),
            _ => n.to_string(),
        };
        *value = Value::String(text);
    }
}

/// Scalar amounts become strings; issued amounts only get their `value`
/// coerced.
fn coerce_amount(amount: &mut Value) {
    match amount {
        Value::Number(_) => coerce_to_string(amount),
        Value::Object(obj) => {
            if let Some(value) = obj.get_mut("value") {
                coerce_to_string(value);
            }
        }
        _ => {}
    }
}

fn parse_sequence(value: &Value) -> SignResult<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SignError::InvalidSequence(value.to_string()))
}

fn parse_ledger_index(value: &Value) -> SignResult<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SignError::InvalidLastLedgerSequence(value.to_string()))
}

/// Flags with the fully-canonical-signature bit forced on.
///
/// Absent means exactly `2^31`; any value below `2^31` gets bit 31 OR-ed
/// in; values already at or above it are left alone.
pub fn canonical_flags(value: Option<&Value>) -> SignResult<u32> {
    let raw: u64 = match value {
        None | Some(Value::Null) => return Ok(TF_FULLY_CANONICAL_SIG),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| SignError::InvalidFlags(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| SignError::InvalidFlags(s.clone()))?,
        Some(other) => return Err(SignError::InvalidFlags(other.to_string())),
    };
    let flags = u32::try_from(raw).map_err(|_| SignError::InvalidFlags(raw.to_string()))?;
    if flags < TF_FULLY_CANONICAL_SIG {
        Ok(flags | TF_FULLY_CANONICAL_SIG)
    } else {
        Ok(flags)
    }
}
