//! # Keypair Resolution
//!
//! Turns whatever the caller supplied as signing credentials into
//! [`KeyMaterial`]: one hex keypair, or an ordered list of multisig
//! signers each with a known account.
//!
//! Secret material is never invented. A seed is derived, a private key is
//! used to recover its public key, and anything else is an error.

use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::config::{MIN_KEY_HEX_LENGTH, MIN_SEED_BODY_LENGTH};
use crate::crypto::{account_id, encode_classic_address, Keypair};
use crate::error::{SignError, SignResult};

/// Signing credentials as the caller wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyInput {
    /// A family seed (`s...`).
    Seed(String),
    /// An explicit keypair object.
    Keypair(ExplicitKeypair),
    /// Multisig participants, in the caller's order.
    Multisig(Vec<Participant>),
}

impl From<&str> for KeyInput {
    fn from(seed: &str) -> Self {
        KeyInput::Seed(seed.to_string())
    }
}

/// An explicit `{ publicKey, privateKey, account? }` object. Either key may
/// be missing here; resolution reports it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExplicitKeypair {
    #[serde(rename = "publicKey", alias = "public_key")]
    pub public_key: Option<String>,
    #[serde(rename = "privateKey", alias = "private_key")]
    pub private_key: Option<String>,
    /// The account being signed for when it is not the key's own (regular
    /// key signing).
    #[serde(alias = "signAs")]
    pub account: Option<String>,
}

/// One multisig signer descriptor.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Participant {
    Seed(String),
    FamilySeed {
        #[serde(rename = "familySeed", alias = "family_seed")]
        family_seed: String,
        #[serde(default, alias = "signAs")]
        account: Option<String>,
    },
    Keys {
        #[serde(default, rename = "privateKey", alias = "private_key")]
        private_key: Option<String>,
        #[serde(default, rename = "publicKey", alias = "public_key")]
        public_key: Option<String>,
        #[serde(default, alias = "signAs")]
        account: Option<String>,
    },
}

/// A resolved single keypair, hex-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPairHex {
    pub public_key: String,
    pub private_key: String,
    pub account: Option<String>,
}

/// A resolved multisig signer.
#[derive(Clone, PartialEq, Eq)]
pub struct MultisigSigner {
    pub public_key: String,
    pub private_key: String,
    pub account: String,
}

/// Resolved signing credentials. Exactly one signing path follows from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    Single(KeyPairHex),
    Multi(Vec<MultisigSigner>),
}

impl fmt::Debug for ExplicitKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitKeypair")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("account", &self.account)
            .finish()
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Seed(_) => f.write_str("Participant::Seed(<redacted>)"),
            Participant::FamilySeed { account, .. } => f
                .debug_struct("Participant::FamilySeed")
                .field("account", account)
                .finish_non_exhaustive(),
            Participant::Keys {
                public_key,
                account,
                ..
            } => f
                .debug_struct("Participant::Keys")
                .field("public_key", public_key)
                .field("account", account)
                .finish_non_exhaustive(),
        }
    }
}

impl fmt::Debug for KeyPairHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairHex")
            .field("public_key", &self.public_key)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for MultisigSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultisigSigner")
            .field("public_key", &self.public_key)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve caller credentials into [`KeyMaterial`].
pub fn resolve(input: &KeyInput) -> SignResult<KeyMaterial> {
    match input {
        KeyInput::Seed(seed) => {
            let keypair = derive_from_seed(seed)?;
            Ok(KeyMaterial::Single(KeyPairHex {
                public_key: keypair.public_key_hex(),
                private_key: keypair.private_key_hex(),
                account: None,
            }))
        }
        KeyInput::Keypair(explicit) => resolve_explicit(explicit).map(KeyMaterial::Single),
        KeyInput::Multisig(participants) => {
            if participants.is_empty() {
                return Err(SignError::KeypairInvalid(
                    "empty multisig participant list".into(),
                ));
            }
            let signers = participants
                .iter()
                .map(resolve_participant)
                .collect::<SignResult<Vec<_>>>()?;
            debug!(signers = signers.len(), "multisig participants resolved");
            Ok(KeyMaterial::Multi(signers))
        }
    }
}

/// `true` for strings shaped like a seed: `s` followed by at least fifteen
/// alphanumerics, after trimming.
pub fn looks_like_seed(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    match trimmed.strip_prefix('s') {
        Some(body) => {
            body.len() >= MIN_SEED_BODY_LENGTH && body.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn derive_from_seed(seed: &str) -> SignResult<Keypair> {
    if !looks_like_seed(seed) {
        return Err(SignError::KeypairInvalid(
            "no valid seed / secret / keypair entered".into(),
        ));
    }
    Keypair::from_seed(seed.trim()).map_err(SignError::SeedInvalid)
}

fn is_key_hex(candidate: &str) -> bool {
    candidate.len() >= MIN_KEY_HEX_LENGTH
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

fn resolve_explicit(explicit: &ExplicitKeypair) -> SignResult<KeyPairHex> {
    let (public_key, private_key) = match (&explicit.public_key, &explicit.private_key) {
        (Some(public), Some(private)) => (public, private),
        _ => return Err(SignError::KeypairMissingKeys),
    };
    if !is_key_hex(public_key) || !is_key_hex(private_key) {
        return Err(SignError::KeypairInvalidHex);
    }
    Ok(KeyPairHex {
        public_key: public_key.clone(),
        private_key: private_key.clone(),
        account: explicit.account.clone(),
    })
}

fn resolve_participant(participant: &Participant) -> SignResult<MultisigSigner> {
    let (public_key, private_key, account) = match participant {
        Participant::Seed(seed) => {
            let keypair = derive_from_seed(seed)?;
            (keypair.public_key_hex(), keypair.private_key_hex(), None)
        }
        Participant::FamilySeed {
            family_seed,
            account,
        } => {
            let keypair = derive_from_seed(family_seed)?;
            (
                keypair.public_key_hex(),
                keypair.private_key_hex(),
                account.clone(),
            )
        }
        Participant::Keys {
            private_key: Some(private_key),
            public_key,
            account,
        } => {
            let public_key = match public_key {
                Some(public_key) => public_key.to_ascii_uppercase(),
                None => Keypair::from_private_key_hex(private_key)
                    .map_err(|_| SignError::KeypairInvalidHex)?
                    .public_key_hex(),
            };
            (public_key, private_key.to_ascii_uppercase(), account.clone())
        }
        Participant::Keys {
            private_key: None, ..
        } => {
            return Err(SignError::KeypairInvalid(
                "multisig participant has no seed, family seed or private key".into(),
            ))
        }
    };

    let account = match account {
        Some(account) => account,
        None => {
            let bytes = hex::decode(&public_key).map_err(|_| SignError::KeypairInvalidHex)?;
            encode_classic_address(&account_id(&bytes))
        }
    };

    Ok(MultisigSigner {
        public_key,
        private_key,
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const GENESIS_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const GENESIS_PUBLIC: &str =
        "0330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020";

    #[test]
    fn seed_resolves_to_single() {
        match resolve(&KeyInput::from(GENESIS_SEED)).unwrap() {
            KeyMaterial::Single(keys) => {
                assert_eq!(keys.public_key, GENESIS_PUBLIC);
                assert_eq!(keys.private_key.len(), 66);
                assert!(keys.account.is_none());
            }
            other => panic!("expected single keypair, got {:?}", other),
        }
    }

    #[test]
    fn seed_with_whitespace_accepted() {
        assert!(resolve(&KeyInput::from("  snoPBrXtMeMyMHUVTgbuqAfg1SUTb\n")).is_ok());
    }

    #[test]
    fn seed_shaped_but_invalid() {
        let err = resolve(&KeyInput::from("sXXXXXXXXXXXXXXXXXXXXXXXXXXX")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SeedInvalid);
    }

    #[test]
    fn non_seed_string() {
        let err = resolve(&KeyInput::from("hunter2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeypairInvalid);
    }

    #[test]
    fn explicit_keypair_missing_key() {
        let input: KeyInput = serde_json::from_value(json!({"publicKey": GENESIS_PUBLIC})).unwrap();
        assert_eq!(resolve(&input).unwrap_err().kind(), ErrorKind::KeypairInvalidKeys);
    }

    #[test]
    fn explicit_keypair_not_hex() {
        let input: KeyInput = serde_json::from_value(json!({
            "publicKey": GENESIS_PUBLIC,
            "privateKey": "not hex at all, definitely not",
        }))
        .unwrap();
        assert_eq!(resolve(&input).unwrap_err().kind(), ErrorKind::KeypairInvalidHex);

        // Lowercase hex is rejected too.
        let input: KeyInput = serde_json::from_value(json!({
            "publicKey": GENESIS_PUBLIC.to_lowercase(),
            "privateKey": "00".repeat(33),
        }))
        .unwrap();
        assert_eq!(resolve(&input).unwrap_err().kind(), ErrorKind::KeypairInvalidHex);
    }

    #[test]
    fn explicit_keypair_with_account() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        let input: KeyInput = serde_json::from_value(json!({
            "publicKey": kp.public_key_hex(),
            "privateKey": kp.private_key_hex(),
            "signAs": "rrrrrrrrrrrrrrrrrrrrrhoLvTp",
        }))
        .unwrap();
        match resolve(&input).unwrap() {
            KeyMaterial::Single(keys) => {
                assert_eq!(keys.account.as_deref(), Some("rrrrrrrrrrrrrrrrrrrrrhoLvTp"))
            }
            other => panic!("expected single keypair, got {:?}", other),
        }
    }

    #[test]
    fn private_key_only_participant_matches_direct_derivation() {
        let kp = Keypair::from_entropy(&[3u8; 16], crate::crypto::KeyAlgorithm::Secp256k1).unwrap();
        let input: KeyInput =
            serde_json::from_value(json!([{"privateKey": kp.private_key_hex()}])).unwrap();
        match resolve(&input).unwrap() {
            KeyMaterial::Multi(signers) => {
                assert_eq!(signers.len(), 1);
                assert_eq!(signers[0].public_key, kp.public_key_hex());
                assert_eq!(signers[0].account, kp.classic_address());
            }
            other => panic!("expected multisig, got {:?}", other),
        }
    }

    #[test]
    fn mixed_participants_keep_order() {
        let input: KeyInput = serde_json::from_value(json!([
            {"familySeed": GENESIS_SEED, "signAs": "rrrrrrrrrrrrrrrrrrrrrhoLvTp"},
            GENESIS_SEED,
        ]))
        .unwrap();
        match resolve(&input).unwrap() {
            KeyMaterial::Multi(signers) => {
                assert_eq!(signers[0].account, "rrrrrrrrrrrrrrrrrrrrrhoLvTp");
                assert_eq!(signers[1].account, GENESIS_ADDRESS);
                assert_eq!(signers[0].public_key, signers[1].public_key);
            }
            other => panic!("expected multisig, got {:?}", other),
        }
    }

    #[test]
    fn empty_participant_rejected() {
        let input: KeyInput = serde_json::from_value(json!([{"account": GENESIS_ADDRESS}])).unwrap();
        assert_eq!(resolve(&input).unwrap_err().kind(), ErrorKind::KeypairInvalid);

        let input = KeyInput::Multisig(vec![]);
        assert_eq!(resolve(&input).unwrap_err().kind(), ErrorKind::KeypairInvalid);
    }

    #[test]
    fn debug_never_prints_secrets() {
        let kp = Keypair::from_seed(GENESIS_SEED).unwrap();
        let material = resolve(&KeyInput::from(GENESIS_SEED)).unwrap();
        let explicit = ExplicitKeypair {
            public_key: Some(kp.public_key_hex()),
            private_key: Some(kp.private_key_hex()),
            account: None,
        };
        for text in [format!("{:?}", material), format!("{:?}", explicit)] {
            assert!(!text.contains(&kp.private_key_hex()));
        }
        assert!(!format!("{:?}", Participant::Seed(GENESIS_SEED.into())).contains(GENESIS_SEED));
    }
}
