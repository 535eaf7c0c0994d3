use clap::Parser;
use unified_llm::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli::bootstrap()?;

    match cli.command {
        Command::Call(args) => cli::call::run(&config, args).await,
        Command::Providers => cli::providers::run(&config).await,
    }
}
