use clap::Parser;
use authkeep::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => cli::migrate::run().await,
        Command::PurgeTokens => cli::purge_tokens::run().await,
    }
}
