// src/main.rs
use dotenvy::dotenv;
use shared_expense_tracker::{cli, config::AppConfig, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    logging::init_logging(&config.log_file, &config.log_filter)?;

    cli::run(config).await
}
