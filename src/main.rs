use clap::Parser;
use pmp_llm_relay::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Probe(args) => cli::probe::run(args).await,
    }
}
