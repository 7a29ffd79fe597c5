//! Reference host for the pin ledger.
//!
//! Supplies the caller identity (from `--signer`, env or config) and a monotonic
//! wall clock, replays the persisted ledger, runs a single invocation and
//! persists the committed record.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use firefly_pin::{
    codec, logging, BatchPin, HostEnvironment, Invocation, Ledger, LedgerStore,
    LogFormat, MonotonicTimeSource, Outcome, PinConfig, PinPayload, SystemTimeSource,
};

#[derive(Parser, Debug)]
#[command(name = "firefly-pin", version, about = "Append-only batch pin ledger")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "FIREFLY_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger file (JSON lines). Overrides config.
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Authenticated caller identity. Overrides config.
    #[arg(long)]
    signer: Option<String>,

    /// Membership service provider ID. Qualifies the resolved signer as
    /// `<msp>::<signer>`. Overrides config.
    #[arg(long)]
    msp_id: Option<String>,

    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pin a batch from explicit fields.
    PinBatch {
        #[arg(long)]
        uuids: HexBytes,
        #[arg(long)]
        batch_hash: HexBytes,
        #[arg(long)]
        payload_ref: String,
        #[arg(long = "context")]
        contexts: Vec<HexBytes>,
    },
    /// Pin a batch from an encoded payload blob.
    PinBatchData {
        #[arg(long)]
        payload: HexBytes,
    },
    /// Print the encoded payload blob (hex) for the given fields.
    EncodePayload {
        #[arg(long)]
        uuids: HexBytes,
        #[arg(long)]
        batch_hash: HexBytes,
        #[arg(long)]
        payload_ref: String,
        #[arg(long = "context")]
        contexts: Vec<HexBytes>,
    },
    /// Record a caller-tagged network event.
    NetworkAction {
        #[arg(long)]
        action: String,
        #[arg(long = "payload")]
        payload: Vec<HexBytes>,
    },
    /// Print the protocol version.
    NetworkVersion,
    /// Print every committed record.
    List,
}

/// Hex-encoded byte argument, with or without a `0x` prefix.
#[derive(Debug, Clone)]
struct HexBytes(Vec<u8>);

impl FromStr for HexBytes {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex::decode(s.trim_start_matches("0x")).map(HexBytes)
    }
}

fn unhex(values: Vec<HexBytes>) -> Vec<Vec<u8>> {
    values.into_iter().map(|v| v.0).collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PinConfig::from_file(path)?,
        None => PinConfig::default(),
    };
    let rejected = config.apply_env();
    if let Some(path) = cli.ledger {
        config.ledger_path = Some(path);
    }
    if let Some(signer) = cli.signer {
        config.signer = Some(signer);
    }
    if let Some(msp_id) = cli.msp_id {
        config.msp_id = Some(msp_id);
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    logging::init_tracing(config.log_format)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    for var in &rejected {
        tracing::warn!(
            key = var.key,
            value = %var.value,
            reason = %var.reason,
            "Ignoring invalid environment override"
        );
    }

    let invocation = match cli.command {
        Command::NetworkVersion => {
            println!("{}", firefly_pin::NETWORK_VERSION);
            return Ok(());
        }
        Command::EncodePayload {
            uuids,
            batch_hash,
            payload_ref,
            contexts,
        } => {
            let blob = codec::encode_payload(&PinPayload {
                uuids: uuids.0,
                batch_hash: batch_hash.0,
                payload_ref,
                contexts: unhex(contexts),
            })?;
            println!("{}", hex::encode(blob));
            return Ok(());
        }
        Command::List => None,
        Command::PinBatch {
            uuids,
            batch_hash,
            payload_ref,
            contexts,
        } => Some(Invocation::PinBatch {
            uuids: uuids.0,
            batch_hash: batch_hash.0,
            payload_ref,
            contexts: unhex(contexts),
        }),
        Command::PinBatchData { payload } => Some(Invocation::PinBatchData { payload: payload.0 }),
        Command::NetworkAction { action, payload } => Some(Invocation::NetworkAction {
            action,
            payload: unhex(payload),
        }),
    };

    let Some(ledger_path) = config.ledger_path.clone() else {
        bail!("no ledger path configured (use --ledger, FIREFLY_LEDGER_PATH or ledger_path)");
    };
    let store = LedgerStore::new(&ledger_path)?;
    let ledger = Arc::new(Ledger::from_records(store.load()?));

    let Some(invocation) = invocation else {
        for record in ledger.snapshot() {
            println!("{}", serde_json::to_string(&*record)?);
        }
        return Ok(());
    };

    let identity = config.identity()?;
    let floor = ledger.last().map(|r| r.timestamp());
    let host = HostEnvironment::new(
        identity,
        MonotonicTimeSource::starting_after(SystemTimeSource, floor),
    );
    let ctx = host.context()?;

    let contract = BatchPin::new(Arc::clone(&ledger)).with_max_payload_bytes(config.max_payload_bytes);
    match contract.invoke(&ctx, invocation)? {
        Outcome::Appended(index) => {
            let record = ledger
                .get(index)
                .context("appended record missing from ledger")?;
            store.append(&record)?;
            tracing::info!(
                index,
                author = %record.author(),
                namespace = record.namespace(),
                path = %ledger_path.display(),
                "Record committed"
            );
            println!("{}", serde_json::to_string(&*record)?);
        }
        Outcome::Version(v) => println!("{v}"),
    }

    Ok(())
}
