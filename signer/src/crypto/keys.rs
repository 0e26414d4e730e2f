//! # Key Management
//!
//! Ledger accounts are controlled by either a secp256k1 or an Ed25519 key.
//! This module derives both kinds from a seed, loads them from the hex
//! strings callers pass around, and signs.
//!
//! ## Derivation
//!
//! - **Ed25519**: the secret is `sha512_half(entropy)`. Public keys carry a
//!   `0xED` prefix byte so they are distinguishable from secp256k1 points.
//! - **secp256k1**: the "family" scheme. A private generator is the first
//!   `sha512_half(entropy ‖ i)` that is a valid scalar; the root account key
//!   adds `sha512_half(public_generator ‖ 0 ‖ j)` (again first valid) to it.
//!
//! ## Signing
//!
//! secp256k1 signs `sha512_half(message)` with RFC 6979 nonces, low-S, DER
//! encoded. Ed25519 signs the message itself.
//!
//! Private key bytes are never logged, and `Debug` prints only the public
//! key.

use ed25519_dalek::{Signature as Ed25519Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use secp256k1::{ecdsa, All, Message, PublicKey, Scalar, Secp256k1, SecretKey};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use super::address::{decode_seed, encode_classic_address, AddressError};
use super::hash::{account_id, sha512_half, sha512_half_parts};
use crate::config::{ACCOUNT_ID_LENGTH, SEED_ENTROPY_LENGTH};

/// Prefix byte of Ed25519 public keys and private key strings.
const ED25519_PREFIX: u8 = 0xED;

/// Errors that can occur during key operations.
///
/// Deliberately vague about key material: the message says what kind of
/// input was wrong, never what it contained.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid seed: {0}")]
    InvalidSeed(#[from] AddressError),

    #[error("invalid secret key: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key: not a valid curve point")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("keypair validation failed: public key does not match secret key")]
    KeypairMismatch,

    #[error("key derivation produced an invalid scalar")]
    DerivationFailed,
}

/// The two signature schemes the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Secp256k1,
    Ed25519,
}

fn secp() -> &'static Secp256k1<All> {
    static CONTEXT: OnceLock<Secp256k1<All>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::new)
}

enum Inner {
    Secp256k1 { secret: SecretKey, public: PublicKey },
    Ed25519 { signing: SigningKey },
}

/// A signing keypair for one ledger account key.
///
/// Does not implement `Serialize`. Export goes through
/// [`private_key_hex`](Self::private_key_hex) on purpose.
pub struct Keypair {
    inner: Inner,
}

impl Keypair {
    /// Derive the root keypair of a seed string (`s...` or `sEd...`).
    pub fn from_seed(seed: &str) -> Result<Self, KeyError> {
        let (algorithm, entropy) = decode_seed(seed.trim())?;
        Self::from_entropy(&entropy, algorithm)
    }

    /// Derive a keypair from raw seed entropy.
    pub fn from_entropy(
        entropy: &[u8; SEED_ENTROPY_LENGTH],
        algorithm: KeyAlgorithm,
    ) -> Result<Self, KeyError> {
        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let secret = sha512_half(entropy);
                Ok(Self {
                    inner: Inner::Ed25519 {
                        signing: SigningKey::from_bytes(&secret),
                    },
                })
            }
            KeyAlgorithm::Secp256k1 => {
                let private_generator = derive_scalar(entropy, None)?;
                let public_generator =
                    PublicKey::from_secret_key(secp(), &private_generator).serialize();
                let intermediate = derive_scalar(&public_generator, Some(0))?;
                let secret = intermediate
                    .add_tweak(&Scalar::from(private_generator))
                    .map_err(|_| KeyError::DerivationFailed)?;
                Ok(Self::from_secp_secret(secret))
            }
        }
    }

    /// Load a keypair from a private key hex string.
    ///
    /// Accepted shapes: `ED` + 64 hex (Ed25519), `00` + 64 hex or bare 64 hex
    /// (secp256k1). Case-insensitive.
    pub fn from_private_key_hex(private_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(private_key.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        match bytes.len() {
            33 if bytes[0] == ED25519_PREFIX => {
                let secret: [u8; 32] = bytes[1..]
                    .try_into()
                    .map_err(|_| KeyError::InvalidSecretKey)?;
                Ok(Self {
                    inner: Inner::Ed25519 {
                        signing: SigningKey::from_bytes(&secret),
                    },
                })
            }
            33 if bytes[0] == 0x00 => Self::secp_from_slice(&bytes[1..]),
            32 => Self::secp_from_slice(&bytes),
            _ => Err(KeyError::InvalidSecretKey),
        }
    }

    /// Load a keypair and check that it matches the public key the caller
    /// supplied alongside it.
    pub fn from_hex_pair(public_key: &str, private_key: &str) -> Result<Self, KeyError> {
        let keypair = Self::from_private_key_hex(private_key)?;
        let expected = hex::decode(public_key.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        if expected != keypair.public_key_bytes() {
            return Err(KeyError::KeypairMismatch);
        }
        Ok(keypair)
    }

    fn secp_from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_secp_secret(secret))
    }

    fn from_secp_secret(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(secp(), &secret);
        Self {
            inner: Inner::Secp256k1 { secret, public },
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self.inner {
            Inner::Secp256k1 { .. } => KeyAlgorithm::Secp256k1,
            Inner::Ed25519 { .. } => KeyAlgorithm::Ed25519,
        }
    }

    /// Public key bytes as they appear in `SigningPubKey`: a 33-byte
    /// compressed point, or `0xED` followed by the 32-byte Ed25519 key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match &self.inner {
            Inner::Secp256k1 { public, .. } => public.serialize().to_vec(),
            Inner::Ed25519 { signing } => {
                let mut out = Vec::with_capacity(33);
                out.push(ED25519_PREFIX);
                out.extend_from_slice(signing.verifying_key().as_bytes());
                out
            }
        }
    }

    /// Uppercase hex of [`public_key_bytes`](Self::public_key_bytes).
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(self.public_key_bytes())
    }

    /// Private key in the ledger's 33-byte string form (`00...` or `ED...`).
    ///
    /// **Handle with care.** Whoever holds this string controls the account.
    pub fn private_key_hex(&self) -> String {
        let (prefix, secret) = match &self.inner {
            Inner::Secp256k1 { secret, .. } => (0x00, secret.secret_bytes()),
            Inner::Ed25519 { signing } => (ED25519_PREFIX, signing.to_bytes()),
        };
        let mut bytes = Vec::with_capacity(33);
        bytes.push(prefix);
        bytes.extend_from_slice(&secret);
        hex::encode_upper(bytes)
    }

    pub fn account_id(&self) -> [u8; ACCOUNT_ID_LENGTH] {
        account_id(&self.public_key_bytes())
    }

    /// Classic `r...` address controlled by this key.
    pub fn classic_address(&self) -> String {
        encode_classic_address(&self.account_id())
    }

    /// Sign `message`. Deterministic for both algorithms.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.inner {
            Inner::Secp256k1 { secret, .. } => {
                let digest = Message::from_digest(sha512_half(message));
                let mut signature = secp().sign_ecdsa(&digest, secret);
                signature.normalize_s();
                signature.serialize_der().to_vec()
            }
            Inner::Ed25519 { signing } => signing.sign(message).to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?}, pub={})", self.algorithm(), self.public_key_hex())
    }
}

/// Verify `signature` over `message` with a public key in `SigningPubKey`
/// form. The algorithm follows from the key's prefix byte.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
    match public_key.first() {
        Some(&ED25519_PREFIX) if public_key.len() == 33 => {
            let key_bytes: [u8; 32] = public_key[1..]
                .try_into()
                .map_err(|_| KeyError::InvalidPublicKey)?;
            let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| KeyError::InvalidPublicKey)?;
            let signature =
                Ed25519Signature::from_slice(signature).map_err(|_| KeyError::InvalidSignature)?;
            Ok(key.verify(message, &signature).is_ok())
        }
        _ => {
            let key = PublicKey::from_slice(public_key).map_err(|_| KeyError::InvalidPublicKey)?;
            let signature =
                ecdsa::Signature::from_der(signature).map_err(|_| KeyError::InvalidSignature)?;
            let digest = Message::from_digest(sha512_half(message));
            Ok(secp().verify_ecdsa(&digest, &signature, &key).is_ok())
        }
    }
}

/// First `sha512_half(input ‖ [discriminator] ‖ counter)` that is a valid
/// secp256k1 secret (non-zero, below the group order).
fn derive_scalar(input: &[u8], discriminator: Option<u32>) -> Result<SecretKey, KeyError> {
    let discriminator = discriminator.map(u32::to_be_bytes);
    for counter in 0u32..=u32::MAX {
        let counter_bytes = counter.to_be_bytes();
        let candidate = match &discriminator {
            Some(d) => sha512_half_parts(&[input, d, &counter_bytes]),
            None => sha512_half_parts(&[input, &counter_bytes]),
        };
        if let Ok(secret) = SecretKey::from_slice(&candidate) {
            return Ok(secret);
        }
    }
    Err(KeyError::DerivationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address::encode_seed;

    const GENESIS_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";

    #[test]
    fn genesis_seed_derives_known_account() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        assert_eq!(kp.algorithm(), KeyAlgorithm::Secp256k1);
        assert_eq!(
            kp.public_key_hex(),
            "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020"
        );
        assert_eq!(kp.classic_address(), "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh");
    }

    #[test]
    fn private_key_string_round_trips() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        let private = kp.private_key_hex();
        assert_eq!(private.len(), 66);
        assert!(private.starts_with("00"));

        let restored = Keypair::from_private_key_hex(&private).unwrap();
        assert_eq!(restored.public_key_hex(), kp.public_key_hex());

        // The unprefixed form loads too.
        let bare = Keypair::from_private_key_hex(&private[2..]).unwrap();
        assert_eq!(bare.public_key_hex(), kp.public_key_hex());
    }

    #[test]
    fn ed25519_keys_carry_prefix() {
        let seed = encode_seed(&[1u8; 16], KeyAlgorithm::Ed25519);
        let kp = Keypair::from_seed(&seed).unwrap();
        assert_eq!(kp.algorithm(), KeyAlgorithm::Ed25519);
        assert!(kp.public_key_hex().starts_with("ED"));
        assert_eq!(kp.public_key_hex().len(), 66);
        assert!(kp.private_key_hex().starts_with("ED"));

        let restored = Keypair::from_private_key_hex(&kp.private_key_hex()).unwrap();
        assert_eq!(restored.public_key_hex(), kp.public_key_hex());
    }

    #[test]
    fn secp256k1_sign_verify_roundtrip() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        let sig = kp.sign(b"payment");
        assert!(verify(&kp.public_key_bytes(), b"payment", &sig).unwrap());
        assert!(!verify(&kp.public_key_bytes(), b"other", &sig).unwrap());
    }

    #[test]
    fn secp256k1_signatures_are_deterministic() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        assert_eq!(kp.sign(b"same"), kp.sign(b"same"));
    }

    #[test]
    fn ed25519_sign_verify_roundtrip() {
        let kp = Keypair::from_entropy(&[9u8; 16], KeyAlgorithm::Ed25519).unwrap();
        let sig = kp.sign(b"payment");
        assert_eq!(sig.len(), 64);
        assert!(verify(&kp.public_key_bytes(), b"payment", &sig).unwrap());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = Keypair::from_entropy(&[1u8; 16], KeyAlgorithm::Secp256k1).unwrap();
        let kp2 = Keypair::from_entropy(&[2u8; 16], KeyAlgorithm::Secp256k1).unwrap();
        let sig = kp1.sign(b"message");
        assert!(!verify(&kp2.public_key_bytes(), b"message", &sig).unwrap());
    }

    #[test]
    fn mismatched_pair_rejected() {
        let kp1 = Keypair::from_entropy(&[1u8; 16], KeyAlgorithm::Secp256k1).unwrap();
        let kp2 = Keypair::from_entropy(&[2u8; 16], KeyAlgorithm::Secp256k1).unwrap();
        let result = Keypair::from_hex_pair(&kp2.public_key_hex(), &kp1.private_key_hex());
        assert!(matches!(result, Err(KeyError::KeypairMismatch)));

        let ok = Keypair::from_hex_pair(&kp1.public_key_hex(), &kp1.private_key_hex());
        assert!(ok.is_ok());
    }

    #[test]
    fn invalid_private_keys_rejected() {
        assert!(Keypair::from_private_key_hex("deadbeef").is_err());
        assert!(Keypair::from_private_key_hex("not-hex-at-all").is_err());
        // Zero is not a valid scalar.
        assert!(Keypair::from_private_key_hex(&"0".repeat(64)).is_err());
    }

    #[test]
    fn invalid_seed_rejected() {
        assert!(matches!(
            Keypair::from_seed("sNotARealSeedAtAll123"),
            Err(KeyError::InvalidSeed(_))
        ));
    }

    #[test]
    fn debug_output_hides_private_key() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        let debug = format!("{:?}", kp);
        assert!(debug.contains(&kp.public_key_hex()));
        assert!(!debug.contains(&kp.private_key_hex()[2..]));
    }
}
