use clap::Parser;
use deployer::cli::Cli;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let Cli { command } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    command.run().await?;
    Ok(())
}
