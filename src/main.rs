//! Churn Guard - Main Entry Point
//!
//! Runs one pipeline step per invocation, or the scoring server.

use churn_guard::cli::{
    cmd_explain, cmd_predict, cmd_preprocess, cmd_schema, cmd_serve, cmd_train, Cli, Commands,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_guard=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let paths = cli.paths();

    match cli.command {
        Commands::Preprocess => cmd_preprocess(&paths)?,
        Commands::Train { test_size, n_estimators } => cmd_train(&paths, test_size, n_estimators)?,
        Commands::Explain { sample_size, permutations } => {
            cmd_explain(&paths, sample_size, permutations)?
        }
        Commands::Predict { record } => cmd_predict(&paths, &record)?,
        Commands::Schema => cmd_schema()?,
        Commands::Serve { port, host } => cmd_serve(paths, &host, port).await?,
    }

    Ok(())
}
