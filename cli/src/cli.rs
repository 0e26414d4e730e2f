//! # CLI Interface
//!
//! Defines the command-line argument structure for `rippled-sign` using
//! `clap` derive. Supports five subcommands: `sign`, `submit`,
//! `submit-blob`, `inspect` and `version`.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sign XRP Ledger transactions and wait for a validated result.
///
/// Transactions are read as JSON from the positional argument, from
/// `--file`, or from stdin. Results are written to stdout as JSON; logs go
/// to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "rippled-sign",
    about = "Sign and submit XRP Ledger transactions",
    version,
    propagate_version = true
)]
pub struct RippledSignCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "RIPPLED_SIGN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// More log output. Repeat for more (`-vv`).
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign offline. `Sequence` and `Fee` must be in the transaction.
    Sign(SignArgs),
    /// Fill in missing fields from the network, sign, submit and wait for
    /// the transaction to validate or expire.
    Submit(SubmitArgs),
    /// Submit an already signed blob and wait for the outcome.
    SubmitBlob(SubmitBlobArgs),
    /// Decode a transaction blob to JSON.
    Inspect(InspectArgs),
    /// Print version information and exit.
    Version,
}

/// Where the transaction JSON comes from.
#[derive(Args, Debug)]
pub struct TransactionArgs {
    /// Transaction JSON. Omit to read `--file` or stdin.
    pub transaction: Option<String>,

    /// Read the transaction JSON from a file.
    #[arg(long, short = 'f', conflicts_with = "transaction")]
    pub file: Option<PathBuf>,
}

/// Signing credentials.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Family seed (`s...`).
    ///
    /// Prefer the environment variable over the flag so the seed does not
    /// end up in shell history.
    #[arg(long, short = 's', env = "RIPPLED_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Hex public key of an explicit keypair.
    #[arg(long, requires = "private_key", conflicts_with = "secret")]
    pub public_key: Option<String>,

    /// Hex private key of an explicit keypair.
    #[arg(long, requires = "public_key", conflicts_with = "secret")]
    pub private_key: Option<String>,

    /// Account to sign for when it is not the key's own (regular key).
    #[arg(long, alias = "sign-as")]
    pub account: Option<String>,

    /// Multisig participant. Repeat for each signer. Either a seed or a
    /// JSON object such as `{"familySeed":"s...","account":"r..."}`.
    #[arg(long = "signer", conflicts_with_all = ["secret", "public_key"])]
    pub signers: Vec<String>,
}

/// Connection settings shared by the online subcommands.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// WebSocket endpoint of a rippled server.
    #[arg(long, short = 'u', env = "RIPPLED_URL", default_value = "wss://s.altnet.rippletest.net:51233")]
    pub url: String,

    /// Seconds allowed for connecting and for each request round-trip.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Ledgers past the last closed one for an automatic
    /// `LastLedgerSequence` (`"LastLedgerSequence": null`).
    #[arg(long, default_value_t = 5)]
    pub ledger_offset: u32,

    /// Unsubscribe from the account stream once the outcome is known.
    #[arg(long)]
    pub unsubscribe: bool,
}

/// Arguments for the `sign` subcommand.
#[derive(Parser, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub transaction: TransactionArgs,

    #[command(flatten)]
    pub keys: KeyArgs,
}

/// Arguments for the `submit` subcommand.
#[derive(Parser, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub transaction: TransactionArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Arguments for the `submit-blob` subcommand.
#[derive(Parser, Debug)]
pub struct SubmitBlobArgs {
    /// Signed transaction blob, hex.
    pub tx_blob: String,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Arguments for the `inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Transaction blob, hex.
    pub tx_blob: String,
}
