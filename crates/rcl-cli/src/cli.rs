use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rcl",
    about = "Replicated closing ledger: keys, qualities and scripted closes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Derive an account keypair from a seed or passphrase
    Keypair(KeypairArgs),
    /// Decode the quality stored in a book directory key
    Quality(QualityArgs),
    /// Run the scripted genesis history against an in-memory store
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct KeypairArgs {
    #[arg(long)]
    pub passphrase: Option<String>,
    /// Base58 family seed
    #[arg(long)]
    pub seed: Option<String>,
    #[arg(long)]
    pub seed_hex: Option<String>,
    /// Legacy secret: seed in any encoding, or a passphrase. Always secp256k1.
    #[arg(long)]
    pub secret: Option<String>,
    /// secp256k1 or ed25519
    #[arg(short, long)]
    pub algorithm: Option<String>,
}

#[derive(Args)]
pub struct QualityArgs {
    /// 64 hex digits
    pub index: String,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// TOML file with optional [engine] and [ledger] tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// RFC 3339 start time; defaults to now
    #[arg(long)]
    pub start_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keypair_passphrase() {
        let cli = Cli::try_parse_from(["rcl", "keypair", "--passphrase", "masterpassphrase"]).unwrap();
        if let Command::Keypair(args) = cli.command {
            assert_eq!(args.passphrase, Some("masterpassphrase".into()));
            assert!(args.algorithm.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_keypair_algorithm() {
        let cli = Cli::try_parse_from(["rcl", "keypair", "--seed-hex", "00", "-a", "ed25519"]).unwrap();
        if let Command::Keypair(args) = cli.command {
            assert_eq!(args.seed_hex, Some("00".into()));
            assert_eq!(args.algorithm, Some("ed25519".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_quality() {
        let cli = Cli::try_parse_from(["rcl", "quality", "ABCD"]).unwrap();
        if let Command::Quality(args) = cli.command {
            assert_eq!(args.index, "ABCD");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_simulate() {
        let cli = Cli::try_parse_from([
            "rcl",
            "simulate",
            "--config",
            "net.toml",
            "--start-time",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("net.toml")));
            assert_eq!(args.start_time.as_deref(), Some("2024-01-01T00:00:00Z"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["rcl", "--format", "json", "simulate"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["rcl", "--verbose", "quality", "00"]).unwrap();
        assert!(cli.verbose);
    }
}
