pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

pub enum AppCommand {
    Calculate(CalculateArgs),
}

/// Request fields given on the command line; missing ones are prompted for.
#[derive(Debug, Clone, Default)]
pub struct CalculateArgs {
    pub symbol: Option<String>,
    pub year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub principal: Option<u64>,
    pub monthly: Option<u64>,
    pub explain: bool,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Hindsight starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Calculate(args) => {
            let provider =
                providers::yahoo_finance::YahooFinanceProvider::new(&config.providers.yahoo)?;
            cli::calculate::run(args, &provider, &config.currency).await
        }
    }
}
