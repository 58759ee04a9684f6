use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use colored::Colorize;
use rcl_crypto::KeypairRequest;
use rcl_engine::{EngineConfig, RoundSummary, Scenario};
use rcl_ledger::{network_to_unix, CloseClock, LedgerConfig, SystemCloseClock, NETWORK_EPOCH_OFFSET};
use rcl_types::{Hash256, Quality};
use serde::{Deserialize, Serialize};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Keypair(args) => cmd_keypair(args, &cli.format),
        Command::Quality(args) => cmd_quality(args, &cli.format),
        Command::Simulate(args) => cmd_simulate(args, &cli.format, cli.verbose),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// keypair
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct KeypairOutput {
    account_id: String,
    algorithm: String,
    public_key: String,
    seed: String,
}

fn cmd_keypair(args: KeypairArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let request = KeypairRequest {
        algorithm: args.algorithm,
        passphrase: args.passphrase,
        secret: args.secret,
        seed: args.seed,
        seed_hex: args.seed_hex,
    };
    let (seed, algorithm) = request.resolve_seed()?;
    let keys = request.resolve()?;
    let output = KeypairOutput {
        account_id: keys.account_id().to_base58(),
        algorithm: algorithm.to_string(),
        public_key: keys.public_key().to_hex(),
        seed: seed.to_base58(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Text => {
            println!("{} {}", "Account:".bold(), output.account_id.green());
            println!("  Algorithm:  {}", output.algorithm.cyan());
            println!("  Public key: {}", output.public_key);
            println!("  Seed:       {}", output.seed.yellow());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// quality
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct QualityOutput {
    index: String,
    quality: u64,
    rate: String,
}

fn cmd_quality(args: QualityArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let index = Hash256::from_hex(args.index.trim())
        .with_context(|| format!("'{}' is not a 256-bit hex value", args.index))?;
    let quality = Quality::from_book_index(&index);
    let output = QualityOutput {
        index: index.to_hex(),
        quality: quality.value(),
        rate: quality.rate()?.to_string(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Text => {
            println!("Quality {}", output.quality.to_string().yellow().bold());
            println!("  Rate: {}", output.rate);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// simulate
// ---------------------------------------------------------------------------

/// Contents of a `--config` file.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub engine: EngineConfig,
    pub ledger: LedgerConfig,
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.engine.validate()?;
        config.ledger.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

#[derive(Serialize)]
struct RoundOutput {
    #[serde(flatten)]
    summary: RoundSummary,
    closed_at: String,
}

#[derive(Serialize)]
struct AccountOutput {
    name: String,
    account_id: String,
    balance: u64,
    sequence: u32,
    owner_count: u32,
}

#[derive(Serialize)]
struct SimulationOutput {
    rounds: Vec<RoundOutput>,
    accounts: Vec<AccountOutput>,
}

/// Network close time as an RFC 3339 UTC timestamp.
fn render_close_time(close_time: u64) -> String {
    i64::try_from(network_to_unix(close_time))
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| close_time.to_string())
}

/// Parse an RFC 3339 timestamp into network time.
fn parse_start_time(text: &str) -> anyhow::Result<u64> {
    let unix = DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("'{text}' is not an RFC 3339 timestamp"))?
        .timestamp();
    match u64::try_from(unix) {
        Ok(unix) if unix >= NETWORK_EPOCH_OFFSET => Ok(unix - NETWORK_EPOCH_OFFSET),
        _ => bail!("start time {text} is before 2000-01-01"),
    }
}

fn cmd_simulate(args: SimulateArgs, format: &OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let start = match &args.start_time {
        Some(text) => parse_start_time(text)?,
        None => SystemCloseClock.network_now(),
    };

    let mut scenario = Scenario::new(config.engine, config.ledger, start)?;
    let rounds = scenario.run_genesis_scenario()?;

    let closed = scenario.closed();
    let mut accounts = Vec::new();
    for account in scenario.accounts() {
        if let Some(root) = closed.account(&account.id())? {
            accounts.push(AccountOutput {
                name: account.name().to_string(),
                account_id: account.id().to_base58(),
                balance: root.balance.value(),
                sequence: root.sequence,
                owner_count: root.owner_count,
            });
        }
    }
    let output = SimulationOutput {
        rounds: rounds
            .into_iter()
            .map(|summary| RoundOutput {
                closed_at: render_close_time(summary.close_time),
                summary,
            })
            .collect(),
        accounts,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Text => {
            for round in &output.rounds {
                let summary = &round.summary;
                println!(
                    "{} ledger {} {}",
                    "✓".green().bold(),
                    summary.sequence.to_string().bold(),
                    summary.hash.short_hex().yellow()
                );
                println!(
                    "  Closed {}  ({} applied, {} passes)",
                    round.closed_at.cyan(),
                    summary.applied,
                    summary.passes
                );
            }
            println!();
            for account in &output.accounts {
                print!("  {:<6} {} {:>16}", account.name.bold(), account.account_id, account.balance);
                if verbose {
                    print!("  seq {} owns {}", account.sequence, account.owner_count);
                }
                println!();
            }
            Ok(())
        }
    }
}
