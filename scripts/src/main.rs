use clap::Parser;
use scripts::{cli::Cli, errors::ScriptError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli { config, command } = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    command.run(&config).await
}
