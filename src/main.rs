use anyhow::Result;
use cambio::core::estimate::parse_amount;
use cambio::core::log::init_logging;
use cambio::{CategoryFilter, CurrencyCode, TradeSide};
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;

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
    /// Display current exchange quotes
    Quotes {
        /// Category to show: crypto, fiat, cards or savings
        #[arg(long)]
        category: Option<CategoryFilter>,

        /// Show every category
        #[arg(long, conflicts_with = "category")]
        all: bool,

        /// Reload this many times after a failed fetch
        #[arg(long, default_value_t = 0)]
        retries: usize,
    },
    /// Estimate the total for buying or selling an amount of a currency
    Estimate {
        /// Currency code, e.g. USD or BTC
        #[arg(long)]
        code: CurrencyCode,

        /// Units of the currency to trade; `,` or `.` as decimal separator
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,

        /// Side of the trade: buy or sell
        #[arg(long, default_value = "buy")]
        side: TradeSide,

        /// Reload this many times after a failed fetch
        #[arg(long, default_value_t = 0)]
        retries: usize,
    },
}

impl From<Commands> for cambio::AppCommand {
    fn from(cmd: Commands) -> cambio::AppCommand {
        match cmd {
            Commands::Quotes {
                category,
                all,
                retries,
            } => cambio::AppCommand::Quotes {
                category,
                all,
                retries,
            },
            Commands::Estimate {
                code,
                amount,
                side,
                retries,
            } => cambio::AppCommand::Estimate {
                code,
                side,
                amount,
                retries,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cambio::cli::setup::setup(),
        Some(cmd) => cambio::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
