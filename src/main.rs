use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use hindsight::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Estimate what an investment made in the past would be worth today
    Calc(CalcArgs),
}

#[derive(Args)]
struct CalcArgs {
    /// Ticker symbol, at most 5 characters
    #[arg(short, long)]
    symbol: Option<String>,

    /// Buy on January 1st of this year
    #[arg(short, long, conflicts_with = "start_date")]
    year: Option<i32>,

    /// Buy on this date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// One-time amount invested at the start, in whole dollars
    #[arg(short, long)]
    principal: Option<u64>,

    /// Amount invested every month after the start, in whole dollars
    #[arg(short, long)]
    monthly: Option<u64>,

    /// List every purchase made
    #[arg(short, long)]
    explain: bool,
}

impl From<CalcArgs> for hindsight::CalculateArgs {
    fn from(args: CalcArgs) -> hindsight::CalculateArgs {
        hindsight::CalculateArgs {
            symbol: args.symbol,
            year: args.year,
            start_date: args.start_date,
            principal: args.principal,
            monthly: args.monthly,
            explain: args.explain,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => hindsight::cli::setup::setup(),
        Some(Commands::Calc(args)) => {
            hindsight::run_command(
                hindsight::AppCommand::Calculate(args.into()),
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
