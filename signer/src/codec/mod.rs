//! # Binary Codec
//!
//! The canonical binary transaction format: what gets signed, what gets
//! hashed into the transaction ID, and what `submit` carries as `tx_blob`.
//!
//! Fields are written in ascending `(type code, field code)` order, each
//! behind a 1–3 byte field header, variable-length payloads behind a 1–3
//! byte length prefix. Two byte strings are the same transaction exactly
//! when their canonical encodings match, which is why this module is the
//! single place any of it happens.

pub mod amount;
pub mod definitions;
pub mod deserializer;
pub mod serializer;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{HASH_PREFIX_TX_MULTISIGN, HASH_PREFIX_TX_SIGN};
use crate::crypto::decode_classic_address;
pub use deserializer::BinaryParser;
pub use serializer::BinarySerializer;

/// Encoding and decoding failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown field id: type {0}, field {1}")]
    UnknownFieldId(u8, u8),

    #[error("unknown transaction type: {0}")]
    UnknownTransactionType(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("field {0} is not valid hex")]
    InvalidHex(String),

    #[error("payload of {0} bytes exceeds the maximum length prefix")]
    LengthTooLarge(usize),

    #[error("invalid length prefix")]
    InvalidLengthPrefix,

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("expected a JSON object")]
    NotAnObject,
}

/// Full canonical encoding, signatures included.
pub fn encode(tx: &Map<String, Value>) -> Result<Vec<u8>, CodecError> {
    let mut ser = BinarySerializer::new();
    ser.write_object(tx, false)?;
    Ok(ser.into_bytes())
}

/// Uppercase hex of [`encode`], the form `submit` takes as `tx_blob`.
pub fn encode_hex(tx: &Map<String, Value>) -> Result<String, CodecError> {
    Ok(hex::encode_upper(encode(tx)?))
}

/// `STX\0` followed by the signing fields. This is the message a single
/// signer signs.
pub fn encode_for_signing(tx: &Map<String, Value>) -> Result<Vec<u8>, CodecError> {
    let mut ser = BinarySerializer::with_prefix(&HASH_PREFIX_TX_SIGN);
    ser.write_object(tx, true)?;
    Ok(ser.into_bytes())
}

/// `SMT\0`, the signing fields, then the signer's account ID. Each
/// multisig participant signs their own variant.
pub fn encode_for_multisigning(
    tx: &Map<String, Value>,
    signer_account: &str,
) -> Result<Vec<u8>, CodecError> {
    let account_id = decode_classic_address(signer_account)
        .map_err(|e| CodecError::InvalidAccount(format!("{}: {}", signer_account, e)))?;
    let mut ser = BinarySerializer::with_prefix(&HASH_PREFIX_TX_MULTISIGN);
    ser.write_object(tx, true)?;
    ser.write_raw(&account_id);
    Ok(ser.into_bytes())
}

/// Decode a canonical blob back to its JSON field map.
pub fn decode(blob: &[u8]) -> Result<Map<String, Value>, CodecError> {
    BinaryParser::new(blob).read_object(None)
}

/// [`decode`] for a hex string.
pub fn decode_hex(blob: &str) -> Result<Map<String, Value>, CodecError> {
    let bytes = hex::decode(blob.trim()).map_err(|_| CodecError::InvalidHex("tx_blob".into()))?;
    decode(&bytes)
}

/// Encode a JSON value that must be an object.
pub fn encode_value(tx: &Value) -> Result<Vec<u8>, CodecError> {
    encode(tx.as_object().ok_or(CodecError::NotAnObject)?)
}
