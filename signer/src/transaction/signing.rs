//! Transaction signing.
//!
//! Signing is a pure function of the normalized request and the resolved
//! keys: the same inputs always give the same blob and the same ID. The
//! caller's request is never modified; the signed fields are added to a
//! copy.
//!
//! - **Single**: `SigningPubKey` is set, the key signs
//!   `encode_for_signing(tx)`, and the signature lands in `TxnSignature`.
//! - **Multi**: `SigningPubKey` is empty, every signer signs
//!   `encode_for_multisigning(tx, own account)`, and the resulting `Signer`
//!   entries are sorted by account ID before encoding. Participant order
//!   does not matter.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::request::TransactionRequest;
use crate::codec::{self, CodecError};
use crate::config::HASH_PREFIX_TRANSACTION_ID;
use crate::crypto::{self, decode_classic_address, sha512_half_parts, Keypair};
use crate::error::{SignCause, SignError, SignResult};
use crate::identity::{KeyMaterial, KeyPairHex, MultisigSigner};

/// A signed transaction: the submit-ready blob and its ID, both uppercase
/// hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx_blob: String,
    pub tx_id: String,
}

impl SignedTransaction {
    /// Wrap an encoded blob, computing its ID.
    pub fn from_blob(blob: &[u8]) -> Self {
        Self {
            tx_blob: hex::encode_upper(blob),
            tx_id: transaction_id(blob),
        }
    }

    /// Decode the blob back into its field map.
    pub fn decode(&self) -> Result<Map<String, Value>, CodecError> {
        codec::decode_hex(&self.tx_blob)
    }
}

/// `sha512_half(TXN\0 ‖ blob)` as uppercase hex.
pub fn transaction_id(blob: &[u8]) -> String {
    hex::encode_upper(sha512_half_parts(&[&HASH_PREFIX_TRANSACTION_ID, blob]))
}

/// Sign along whichever path the key material selects.
pub fn sign(request: &TransactionRequest, keys: &KeyMaterial) -> SignResult<SignedTransaction> {
    match keys {
        KeyMaterial::Single(keypair) => sign_single(request, keypair),
        KeyMaterial::Multi(signers) => sign_multi(request, signers),
    }
}

/// Single-signature path.
pub fn sign_single(request: &TransactionRequest, keys: &KeyPairHex) -> SignResult<SignedTransaction> {
    let keypair = Keypair::from_hex_pair(&keys.public_key, &keys.private_key)
        .map_err(|e| SignError::Sign(SignCause::Key(e)))?;

    let mut tx = request.fields().clone();
    tx.insert("SigningPubKey".into(), Value::String(keypair.public_key_hex()));
    let signing_data = codec::encode_for_signing(&tx)?;
    let signature = keypair.sign(&signing_data);
    tx.insert("TxnSignature".into(), Value::String(hex::encode_upper(signature)));

    let blob = codec::encode(&tx)?;
    let signed = SignedTransaction::from_blob(&blob);
    debug!(
        account = %request.account(),
        signing_for = ?keys.account,
        tx_id = %signed.tx_id,
        "transaction signed"
    );
    Ok(signed)
}

/// Multisignature path.
pub fn sign_multi(
    request: &TransactionRequest,
    signers: &[MultisigSigner],
) -> SignResult<SignedTransaction> {
    if signers.is_empty() {
        return Err(SignError::KeypairInvalid(
            "empty multisig participant list".into(),
        ));
    }

    let mut tx = request.fields().clone();
    tx.insert("SigningPubKey".into(), Value::String(String::new()));
    tx.remove("TxnSignature");
    tx.remove("Signers");

    let mut entries = Vec::with_capacity(signers.len());
    for signer in signers {
        let keypair = Keypair::from_hex_pair(&signer.public_key, &signer.private_key)
            .map_err(|e| SignError::Sign(SignCause::Key(e)))?;
        let account_id = decode_classic_address(&signer.account).map_err(|e| {
            SignError::Sign(SignCause::Codec(CodecError::InvalidAccount(format!(
                "{}: {}",
                signer.account, e
            ))))
        })?;
        let signing_data = codec::encode_for_multisigning(&tx, &signer.account)?;
        let signature = keypair.sign(&signing_data);
        entries.push((
            account_id,
            json!({
                "Signer": {
                    "Account": signer.account,
                    "SigningPubKey": keypair.public_key_hex(),
                    "TxnSignature": hex::encode_upper(signature),
                }
            }),
        ));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    tx.insert(
        "Signers".into(),
        Value::Array(entries.into_iter().map(|(_, entry)| entry).collect()),
    );
    let blob = codec::encode(&tx)?;
    let signed = SignedTransaction::from_blob(&blob);
    debug!(
        account = %request.account(),
        signers = signers.len(),
        tx_id = %signed.tx_id,
        "transaction multisigned"
    );
    Ok(signed)
}

/// Check a signed transaction: the ID must match the blob and every
/// signature in it must verify.
///
/// Returns `Ok(false)` for a well-formed transaction whose signatures or
/// ID do not check out, and an error when the blob cannot be decoded.
pub fn verify_signed(signed: &SignedTransaction) -> SignResult<bool> {
    let blob = hex::decode(&signed.tx_blob)
        .map_err(|_| SignError::TransactionInvalid(CodecError::InvalidHex("tx_blob".into())))?;
    if transaction_id(&blob) != signed.tx_id.to_ascii_uppercase() {
        return Ok(false);
    }
    let tx = codec::decode(&blob).map_err(SignError::TransactionInvalid)?;

    if let Some(Value::Array(signers)) = tx.get("Signers") {
        if signers.is_empty() {
            return Ok(false);
        }
        for entry in signers {
            let signer = match entry.get("Signer") {
                Some(signer) => signer,
                None => return Ok(false),
            };
            let account = signer.get("Account").and_then(Value::as_str).unwrap_or_default();
            let data = codec::encode_for_multisigning(&tx, account)
                .map_err(SignError::TransactionInvalid)?;
            if !check_signature(signer, &data)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    let data = codec::encode_for_signing(&tx).map_err(SignError::TransactionInvalid)?;
    check_signature(&Value::Object(tx), &data)
}

fn check_signature(holder: &Value, data: &[u8]) -> SignResult<bool> {
    let field = |name: &str| {
        holder
            .get(name)
            .and_then(Value::as_str)
            .and_then(|s| hex::decode(s).ok())
            .filter(|bytes| !bytes.is_empty())
    };
    match (field("SigningPubKey"), field("TxnSignature")) {
        (Some(public_key), Some(signature)) => Ok(crypto::verify(&public_key, data, &signature)
            .unwrap_or(false)),
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
