//! # Transaction Module
//!
//! From caller input to a submit-ready blob.
//!
//! ```text
//! request.rs   — TransactionInput / TransactionRequest / LastLedger
//! normalize.rs — field coercion, flag canonicalization, offline guards
//! signing.rs   — single and multi signing, transaction IDs, verification
//! ```

pub mod normalize;
pub mod request;
pub mod signing;

pub use normalize::{canonical_flags, normalize, SigningMode};
pub use request::{LastLedger, TransactionInput, TransactionRequest};
pub use signing::{sign, sign_multi, sign_single, transaction_id, verify_signed, SignedTransaction};
