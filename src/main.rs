//! pdfrag CLI entry point.

use anyhow::Result;
use clap::Parser;
use pdfrag::cli::{commands, Cli, Commands, Output};
use pdfrag::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        Output::error(&format!("{:#}", e));
        Output::info("Run 'pdfrag doctor' to check your configuration.");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Variables in .env do not override the ones already set.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(std::path::PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_filter(cli.verbose)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match &cli.command {
        Commands::Run { question, dir } => {
            commands::run_pipeline(question.clone(), dir.clone(), settings).await?;
        }

        Commands::Index {
            dir,
            recursive,
            skip_existing,
        } => {
            commands::run_index(dir.clone(), *recursive, *skip_existing, settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Query { question, top_k } => {
            commands::run_query(question, *top_k, settings).await?;
        }

        Commands::Search {
            query,
            limit,
            min_score,
        } => {
            commands::run_search(query, *limit, *min_score, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path.as_ref(), &settings)?;
        }
    }

    Ok(())
}
