//! # Ledger Constants & Tracker Configuration
//!
//! Every magic number the signer relies on lives here. Most of them are not
//! ours to choose: they are fixed by the XRP Ledger wire format, and changing
//! them produces blobs that no server will accept. The few knobs that *are*
//! ours (how far ahead an automatic expiry lands, whether to unsubscribe
//! after a result) live in [`TrackerConfig`].

use std::time::Duration;

// ---------------------------------------------------------------------------
// Hash Prefixes
// ---------------------------------------------------------------------------

/// Prefix hashed in front of a signed blob to produce its transaction ID.
/// ASCII `TXN\0`.
pub const HASH_PREFIX_TRANSACTION_ID: [u8; 4] = [0x54, 0x58, 0x4E, 0x00];

/// Prefix of the single-signature signing payload. ASCII `STX\0`.
pub const HASH_PREFIX_TX_SIGN: [u8; 4] = [0x53, 0x54, 0x58, 0x00];

/// Prefix of the multisignature signing payload. ASCII `SMT\0`.
pub const HASH_PREFIX_TX_MULTISIGN: [u8; 4] = [0x53, 0x4D, 0x54, 0x00];

// ---------------------------------------------------------------------------
// Address & Seed Encoding
// ---------------------------------------------------------------------------

/// Version byte for classic `r...` account addresses.
pub const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Version byte for secp256k1 family seeds (`s...`).
pub const FAMILY_SEED_VERSION: u8 = 0x21;

/// Version prefix for Ed25519 seeds. Three bytes so that the encoded string
/// reads `sEd...`.
pub const ED25519_SEED_VERSION: [u8; 3] = [0x01, 0xE1, 0x4B];

/// Seeds carry 128 bits of entropy.
pub const SEED_ENTROPY_LENGTH: usize = 16;

/// Account IDs are RIPEMD-160 digests.
pub const ACCOUNT_ID_LENGTH: usize = 20;

/// Minimum number of characters after the leading `s` for a string to be
/// treated as a seed at all.
pub const MIN_SEED_BODY_LENGTH: usize = 15;

/// Minimum length of a hex key accepted in an explicit keypair.
pub const MIN_KEY_HEX_LENGTH: usize = 24;

// ---------------------------------------------------------------------------
// Transaction Fields
// ---------------------------------------------------------------------------

/// The "fully canonical signature" flag. Every transaction this crate signs
/// carries it.
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;

/// How many ledgers past the last closed one an automatic
/// `LastLedgerSequence` lands.
pub const DEFAULT_LAST_LEDGER_OFFSET: u32 = 5;

/// Engine result the transaction stream reports for a successful, applied
/// transaction.
pub const ENGINE_RESULT_SUCCESS: &str = "tesSUCCESS";

/// Prefix shared by every tentatively successful engine result.
pub const ENGINE_RESULT_TENTATIVE_PREFIX: &str = "tes";

/// Engine result for a transaction parked in the open-ledger queue.
pub const ENGINE_RESULT_QUEUED: &str = "terQUEUED";

// ---------------------------------------------------------------------------
// Tracker Configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for the finality tracker.
///
/// The defaults match what a caller submitting a single payment over a
/// shared connection wants. Tests shrink the timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Ledgers added to the last closed index when `LastLedgerSequence` is
    /// requested as automatic.
    pub last_ledger_offset: u32,

    /// Send a server-side `unsubscribe` for the account once the race is
    /// decided. Off by default: the ledger stream is usually shared with
    /// other users of the connection.
    pub unsubscribe_on_finality: bool,

    /// Upper bound on a single request/response round-trip (subscribe,
    /// submit, account_info). `None` leaves it to the connection.
    pub request_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            last_ledger_offset: DEFAULT_LAST_LEDGER_OFFSET,
            unsubscribe_on_finality: false,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl TrackerConfig {
    /// Builder-style setter for the automatic expiry margin.
    pub fn with_last_ledger_offset(mut self, offset: u32) -> Self {
        self.last_ledger_offset = offset;
        self
    }

    /// Builder-style setter for the unsubscribe behaviour.
    pub fn with_unsubscribe_on_finality(mut self, enabled: bool) -> Self {
        self.unsubscribe_on_finality = enabled;
        self
    }

    /// Builder-style setter for the request timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
