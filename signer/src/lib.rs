// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # rippled-sign — Core Library
//!
//! Sign XRP Ledger transactions, submit them over a connection you already
//! hold, and find out whether they actually made it into a validated
//! ledger. A `tesSUCCESS` from `submit` is only a promise; this crate
//! waits for the ledger to keep it, or for the transaction's
//! `LastLedgerSequence` to pass.
//!
//! ## Architecture
//!
//! - **crypto** — SHA-512Half, base58check addresses and seeds, secp256k1
//!   and Ed25519 keys.
//! - **codec** — The canonical binary transaction format.
//! - **transaction** — Input normalization, signing, transaction IDs.
//! - **identity** — Seeds, keypairs and multisig participants → key material.
//! - **network** — The connection capability and its stream events.
//! - **finality** — Subscribe, submit, race confirmation against expiry.
//! - **pipeline** — The entry points tying it all together.
//! - **config** — Ledger constants and tracker knobs.
//! - **error** — One error type with stable, machine-readable kinds.
//!
//! ## Example
//!
//! ```
//! use rippled_sign::{pipeline, KeyInput, TransactionInput};
//! use serde_json::json;
//!
//! let tx = TransactionInput::from(json!({
//!     "TransactionType": "Payment",
//!     "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
//!     "Destination": "rrrrrrrrrrrrrrrrrrrrrhoLvTp",
//!     "Amount": "1000000",
//!     "Fee": "12",
//!     "Sequence": 1,
//! }));
//! let signed = pipeline::sign_offline(&tx, &KeyInput::from("snoPBrXtMeMyMHUVTgbuqAfg1SUTb")).unwrap();
//! assert_eq!(signed.tx_id.len(), 64);
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod finality;
pub mod identity;
pub mod network;
pub mod pipeline;
pub mod transaction;

pub use config::TrackerConfig;
pub use error::{ErrorKind, SignError, SignResult};
pub use finality::ConfirmedTransaction;
pub use identity::{KeyInput, KeyMaterial};
pub use network::{ConnectionError, LedgerConnection, NetworkState, StreamEvent};
pub use pipeline::{process, sign_and_submit, sign_offline, submit_signed, Outcome};
pub use transaction::{SignedTransaction, TransactionInput, TransactionRequest};
