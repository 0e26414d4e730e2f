//! # Cryptographic Primitives
//!
//! Hashing, base58check encodings and key handling for ledger accounts.
//! Thin wrappers around audited implementations (`sha2`, `ripemd`,
//! `secp256k1`, `ed25519-dalek`); nothing here implements a primitive
//! itself.

pub mod address;
pub mod hash;
pub mod keys;

pub use address::{
    decode_classic_address, decode_seed, encode_classic_address, encode_seed,
    is_valid_classic_address, AddressError,
};
pub use hash::{account_id, double_sha256, sha256, sha512_half, sha512_half_parts};
pub use keys::{verify, KeyAlgorithm, KeyError, Keypair};
