// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # rippled-sign
//!
//! Entry point for the `rippled-sign` binary. Parses CLI arguments,
//! initializes logging, and runs one of:
//!
//! - `sign`        — sign offline and print `{ tx_blob, tx_id }`
//! - `submit`      — sign, submit and wait for validation or expiry
//! - `submit-blob` — submit an already signed blob and wait
//! - `inspect`     — decode a blob to JSON and check its signatures
//! - `version`     — print build version information
//!
//! Results go to stdout as JSON. On failure the structured error details
//! are printed to stdout as well and the process exits non-zero.

mod cli;
mod logging;
mod ws;

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use rippled_sign::identity::{ExplicitKeypair, Participant};
use rippled_sign::transaction::verify_signed;
use rippled_sign::{
    codec, pipeline, KeyInput, LedgerConnection, SignError, SignedTransaction, TrackerConfig,
    TransactionInput,
};

use cli::{Commands, RippledSignCli};
use logging::LogFormat;
use ws::WsConnection;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RippledSignCli::parse();
    logging::init_logging(cli.verbose, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Sign(args) => sign(args),
        Commands::Submit(args) => submit(args).await,
        Commands::SubmitBlob(args) => submit_blob(args).await,
        Commands::Inspect(args) => inspect(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Signs offline and prints the blob and its ID.
fn sign(args: cli::SignArgs) -> Result<()> {
    let input = read_transaction(&args.transaction)?;
    let keys = key_input(&args.keys)?
        .context("no signing credentials: pass --secret, --public-key/--private-key or --signer")?;

    let signed = pipeline::sign_offline(&input, &keys).or_else(report)?;
    tracing::info!(tx_id = %signed.tx_id, "transaction signed");
    print_json(&signed)
}

/// Signs, submits and waits for the outcome.
async fn submit(args: cli::SubmitArgs) -> Result<()> {
    let input = read_transaction(&args.transaction)?;
    let keys = key_input(&args.keys)?;
    let config = tracker_config(&args.connection);
    let connection = connect(&args.connection).await?;

    let outcome = pipeline::process(
        &input,
        keys.as_ref(),
        Some(&connection as &dyn LedgerConnection),
        &config,
    )
    .await;
    connection.close();
    print_json(&outcome.or_else(report)?)
}

/// Submits a pre-signed blob and waits for the outcome.
async fn submit_blob(args: cli::SubmitBlobArgs) -> Result<()> {
    let blob = hex::decode(args.tx_blob.trim()).context("tx_blob is not valid hex")?;
    let signed = SignedTransaction::from_blob(&blob);
    let config = tracker_config(&args.connection);
    let connection = connect(&args.connection).await?;

    tracing::info!(tx_id = %signed.tx_id, "submitting signed blob");
    let confirmed = pipeline::submit_signed(&signed, &connection, &config).await;
    connection.close();
    print_json(&confirmed.or_else(report)?)
}

/// Decodes a blob and prints its fields, the ID it would have if
/// submitted, and whether its signatures check out.
fn inspect(args: cli::InspectArgs) -> Result<()> {
    let blob = hex::decode(args.tx_blob.trim()).context("tx_blob is not valid hex")?;
    let fields = codec::decode(&blob).context("failed to decode transaction blob")?;

    #[derive(Serialize)]
    struct Inspection {
        tx_id: String,
        signatures_valid: Option<bool>,
        transaction: serde_json::Map<String, serde_json::Value>,
    }
    let signed = SignedTransaction::from_blob(&blob);
    print_json(&Inspection {
        signatures_valid: verify_signed(&signed).ok(),
        tx_id: signed.tx_id,
        transaction: fields,
    })
}

/// Prints version information to stdout.
fn print_version() {
    println!("rippled-sign {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

async fn connect(args: &cli::ConnectionArgs) -> Result<WsConnection> {
    WsConnection::connect(&args.url, Duration::from_secs(args.timeout_secs)).await
}

fn tracker_config(args: &cli::ConnectionArgs) -> TrackerConfig {
    TrackerConfig::default()
        .with_last_ledger_offset(args.ledger_offset)
        .with_unsubscribe_on_finality(args.unsubscribe)
        .with_request_timeout(Some(Duration::from_secs(args.timeout_secs)))
}

/// Reads the transaction JSON from the argument, a file, or stdin.
fn read_transaction(args: &cli::TransactionArgs) -> Result<TransactionInput> {
    let text = match (&args.transaction, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read transaction from stdin")?;
            text
        }
    };
    Ok(TransactionInput::from(text.trim()))
}

/// Builds the credentials from whichever key flags were given. `None` when
/// none were.
fn key_input(args: &cli::KeyArgs) -> Result<Option<KeyInput>> {
    if !args.signers.is_empty() {
        let participants = args
            .signers
            .iter()
            .map(|signer| parse_participant(signer.as_str()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Some(KeyInput::Multisig(participants)));
    }
    if args.public_key.is_some() || args.private_key.is_some() {
        return Ok(Some(KeyInput::Keypair(ExplicitKeypair {
            public_key: args.public_key.clone(),
            private_key: args.private_key.clone(),
            account: args.account.clone(),
        })));
    }
    Ok(args.secret.clone().map(KeyInput::Seed))
}

fn parse_participant(signer: &str) -> Result<Participant> {
    let signer = signer.trim();
    if signer.starts_with('{') {
        serde_json::from_str(signer).with_context(|| format!("invalid --signer object: {}", signer))
    } else {
        Ok(Participant::Seed(signer.to_string()))
    }
}

/// Prints the structured error to stdout, then hands it on to `anyhow`.
fn report<T>(err: SignError) -> Result<T> {
    let details = serde_json::to_string_pretty(&err.details())?;
    println!("{}", details);
    Err(anyhow::Error::new(err).context("transaction failed"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signer_flags_accept_seeds_and_objects() {
        assert_eq!(
            parse_participant("sSeed").unwrap(),
            Participant::Seed("sSeed".into())
        );
        let parsed =
            parse_participant(r#"{"familySeed":"sSeed","account":"rAccount"}"#).unwrap();
        assert_eq!(
            parsed,
            Participant::FamilySeed {
                family_seed: "sSeed".into(),
                account: Some("rAccount".into()),
            }
        );
        assert!(parse_participant("{not json").is_err());
    }

    #[test]
    fn key_flags_pick_the_right_shape() {
        let mut args = cli::KeyArgs {
            secret: Some("sSeed".into()),
            public_key: None,
            private_key: None,
            account: None,
            signers: vec![],
        };
        assert_eq!(key_input(&args).unwrap(), Some(KeyInput::Seed("sSeed".into())));

        args.secret = None;
        assert_eq!(key_input(&args).unwrap(), None);

        args.signers = vec!["sA".into(), "sB".into()];
        match key_input(&args).unwrap() {
            Some(KeyInput::Multisig(list)) => assert_eq!(list.len(), 2),
            other => panic!("expected multisig, got {:?}", other),
        }
    }

    #[test]
    fn tracker_config_follows_flags() {
        let args = cli::ConnectionArgs {
            url: "ws://localhost:6006".into(),
            timeout_secs: 3,
            ledger_offset: 8,
            unsubscribe: true,
        };
        let config = tracker_config(&args);
        assert_eq!(config.last_ledger_offset, 8);
        assert!(config.unsubscribe_on_finality);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
    }
}
