use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use presswire::app::AppContext;
use presswire::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Latest { n } => {
            commands::latest(&ctx, n).await?;
        }
        Commands::Search { query, limit } => {
            commands::search(&ctx, &query, limit).await?;
        }
        Commands::Get { id } => {
            commands::get(&ctx, &id).await?;
        }
        Commands::Categories => {
            commands::categories(&ctx).await?;
        }
        Commands::Refresh => {
            commands::refresh(&ctx).await?;
        }
    }

    Ok(())
}
