//! Signing identities: who signs, and with which keys.

pub mod resolver;

pub use resolver::{
    resolve, ExplicitKeypair, KeyInput, KeyMaterial, KeyPairHex, MultisigSigner, Participant,
};
