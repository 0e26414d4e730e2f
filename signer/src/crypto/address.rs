//! # Addresses & Seeds
//!
//! The ledger's human-readable encodings are all base58check over its own
//! alphabet (`rpshnaf39w...`, not Bitcoin's): a version prefix, the payload,
//! and the first four bytes of `double_sha256(version ‖ payload)`.
//!
//! | Thing              | Version        | Payload  | Looks like |
//! |--------------------|----------------|----------|------------|
//! | Classic address    | `0x00`         | 20 bytes | `r...`     |
//! | secp256k1 seed     | `0x21`         | 16 bytes | `s...`     |
//! | Ed25519 seed       | `0x01E14B`     | 16 bytes | `sEd...`   |

use thiserror::Error;

use super::hash::double_sha256;
use super::keys::KeyAlgorithm;
use crate::config::{
    ACCOUNT_ID_LENGTH, ACCOUNT_ID_VERSION, ED25519_SEED_VERSION, FAMILY_SEED_VERSION,
    SEED_ENTROPY_LENGTH,
};

const CHECKSUM_LENGTH: usize = 4;

/// Failures decoding a base58check string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("not valid base58: {0}")]
    InvalidBase58(String),

    #[error("checksum mismatch")]
    BadChecksum,

    #[error("unexpected version prefix")]
    WrongVersion,

    #[error("unexpected payload length {0}")]
    WrongLength(usize),
}

/// Encode `version ‖ payload ‖ checksum` in the ledger alphabet.
pub fn encode_check(version: &[u8], payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(version.len() + payload.len() + CHECKSUM_LENGTH);
    buf.extend_from_slice(version);
    buf.extend_from_slice(payload);
    let checksum = double_sha256(&buf);
    buf.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
    bs58::encode(buf)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

/// Decode a base58check string, verify its checksum and return
/// `version ‖ payload`.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>, AddressError> {
    let mut raw = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
    if raw.len() <= CHECKSUM_LENGTH {
        return Err(AddressError::WrongLength(raw.len()));
    }
    let split = raw.len() - CHECKSUM_LENGTH;
    let expected = double_sha256(&raw[..split]);
    if raw[split..] != expected[..CHECKSUM_LENGTH] {
        return Err(AddressError::BadChecksum);
    }
    raw.truncate(split);
    Ok(raw)
}

/// Classic `r...` address of a 20-byte account ID.
pub fn encode_classic_address(account_id: &[u8; ACCOUNT_ID_LENGTH]) -> String {
    encode_check(&[ACCOUNT_ID_VERSION], account_id)
}

/// Account ID bytes of a classic address.
pub fn decode_classic_address(address: &str) -> Result<[u8; ACCOUNT_ID_LENGTH], AddressError> {
    let raw = decode_check(address)?;
    let (version, body) = raw.split_at(1);
    if version[0] != ACCOUNT_ID_VERSION {
        return Err(AddressError::WrongVersion);
    }
    body.try_into()
        .map_err(|_| AddressError::WrongLength(body.len()))
}

/// `true` when `address` decodes as a classic address.
pub fn is_valid_classic_address(address: &str) -> bool {
    decode_classic_address(address).is_ok()
}

/// Encode 16 bytes of seed entropy for the given algorithm.
pub fn encode_seed(entropy: &[u8; SEED_ENTROPY_LENGTH], algorithm: KeyAlgorithm) -> String {
    match algorithm {
        KeyAlgorithm::Secp256k1 => encode_check(&[FAMILY_SEED_VERSION], entropy),
        KeyAlgorithm::Ed25519 => encode_check(&ED25519_SEED_VERSION, entropy),
    }
}

/// Decode a seed string into its algorithm and entropy.
pub fn decode_seed(seed: &str) -> Result<(KeyAlgorithm, [u8; SEED_ENTROPY_LENGTH]), AddressError> {
    let raw = decode_check(seed)?;
    let (algorithm, body) = if raw.len() == ED25519_SEED_VERSION.len() + SEED_ENTROPY_LENGTH
        && raw[..3] == ED25519_SEED_VERSION
    {
        (KeyAlgorithm::Ed25519, &raw[3..])
    } else if raw.len() == 1 + SEED_ENTROPY_LENGTH {
        if raw[0] != FAMILY_SEED_VERSION {
            return Err(AddressError::WrongVersion);
        }
        (KeyAlgorithm::Secp256k1, &raw[1..])
    } else {
        return Err(AddressError::WrongLength(raw.len()));
    };

    let entropy = body
        .try_into()
        .map_err(|_| AddressError::WrongLength(body.len()))?;
    Ok((algorithm, entropy))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const GENESIS_ACCOUNT_ID: &str = "B5F762798A53D543A014CAF8B297CFF8F2F937E8";

    #[test]
    fn genesis_address_round_trip() {
        let id: [u8; 20] = hex::decode(GENESIS_ACCOUNT_ID).unwrap().try_into().unwrap();
        assert_eq!(encode_classic_address(&id), GENESIS_ADDRESS);
        assert_eq!(decode_classic_address(GENESIS_ADDRESS).unwrap(), id);
    }

    #[test]
    fn account_zero_is_all_r() {
        assert_eq!(encode_classic_address(&[0u8; 20]), "rrrrrrrrrrrrrrrrrrrrrhoLvTp");
    }

    #[test]
    fn corrupted_address_fails_checksum() {
        // Swap two characters in the body.
        let bad = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyhT";
        assert!(!is_valid_classic_address(bad));
    }

    #[test]
    fn non_alphabet_characters_rejected() {
        // '0' and 'l' are not in the ledger alphabet.
        assert!(matches!(
            decode_classic_address("r0l"),
            Err(AddressError::InvalidBase58(_))
        ));
    }

    #[test]
    fn genesis_seed_decodes_as_secp256k1() {
        let (algorithm, entropy) = decode_seed("snoPBrXtMeMyMHUVTgbuqAfg1SUTb").unwrap();
        assert_eq!(algorithm, KeyAlgorithm::Secp256k1);
        assert_eq!(
            hex::encode_upper(entropy),
            "DEDCE9CE67B451D852FD4E846FCDE31C"
        );
    }

    #[test]
    fn ed25519_seed_encodes_with_sed_prefix() {
        let seed = encode_seed(&[7u8; 16], KeyAlgorithm::Ed25519);
        assert!(seed.starts_with("sEd"));
        let (algorithm, entropy) = decode_seed(&seed).unwrap();
        assert_eq!(algorithm, KeyAlgorithm::Ed25519);
        assert_eq!(entropy, [7u8; 16]);
    }

    #[test]
    fn address_is_not_a_seed() {
        assert!(decode_seed(GENESIS_ADDRESS).is_err());
    }
}
