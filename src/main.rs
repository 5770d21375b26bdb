use clap::{Parser, Subcommand};
use tracing::info;

mod config;
mod db;
mod error;
mod pipeline;
mod schedule;
mod source;
mod users;

use crate::db::AppState;
use crate::source::HttpUserApi;

#[derive(Parser)]
#[command(
    name = "userpipe",
    about = "Fetches one random user per run and appends it to the users table"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one pipeline run now
    Run,
    /// Fire a run at every UTC midnight, skipping missed intervals
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userpipe=debug,sqlx=warn,reqwest=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let state = AppState::init().await?;
    let api = HttpUserApi::new(&state.config.api)?;

    match cli.command {
        Command::Run => {
            let report = pipeline::run(&state, &api).await?;
            info!(run_id = %report.run_id, rows_loaded = report.rows_loaded, "run complete");
        }
        Command::Schedule => schedule::run_daily(&state, &api).await,
    }

    Ok(())
}
