use clap::Parser;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    // logs go to stderr so `--format json` output stays parseable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = cli::Cli::parse();
    commands::run_command(cli)
}
