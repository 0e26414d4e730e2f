//! # Hashing Utilities
//!
//! The ledger uses exactly three digests, and this module is the only place
//! that touches them:
//!
//! - **SHA-512Half**: the first 256 bits of SHA-512. Transaction IDs, signing
//!   digests and key derivation all use it.
//! - **SHA-256**: inside base58check checksums (doubled) and as the first
//!   step of account ID derivation.
//! - **RIPEMD-160**: the second step of account ID derivation.
//!
//! Everything returns fixed-size arrays. Callers that need hex call
//! `hex::encode_upper` themselves; the ledger is picky about case and the
//! choice belongs at the edge.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

use crate::config::ACCOUNT_ID_LENGTH;

/// First 32 bytes of SHA-512 over `data`.
///
/// # Example
///
/// ```
/// use rippled_sign::crypto::sha512_half;
///
/// let digest = sha512_half(b"ledger");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    sha512_half_parts(&[data])
}

/// SHA-512Half over the concatenation of `parts`, without building the
/// concatenated buffer.
pub fn sha512_half_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let full = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&full[..32]);
    output
}

/// Plain SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// `SHA-256(SHA-256(data))`. The first four bytes are the base58check
/// checksum.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Account ID of a public key: `RIPEMD-160(SHA-256(public_key))`.
///
/// Works the same for both key types. Ed25519 keys are hashed with their
/// `0xED` prefix byte included.
pub fn account_id(public_key: &[u8]) -> [u8; ACCOUNT_ID_LENGTH] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(public_key));
    let result = hasher.finalize();
    let mut output = [0u8; ACCOUNT_ID_LENGTH];
    output.copy_from_slice(&result);
    output
}
