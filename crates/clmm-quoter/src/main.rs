use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use clmm_quoter::{price_report, PoolFile, PositionRequest, Quoter, QuoterConfig, SwapRequest};

#[derive(Parser, Debug)]
#[command(name = "clmm-quoter")]
#[command(about = "Off-chain swap and position quotes for concentrated liquidity pools")]
struct Args {
    /// Path to quoter configuration file
    #[arg(short, long, default_value = "quoter.toml")]
    config: String,

    /// Pool snapshot and tick arrays as JSON
    #[arg(short, long)]
    pool: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote a swap against the pool snapshot
    Swap {
        /// Input amount, or output amount with --exact-output
        #[arg(long)]
        amount: u64,

        /// Sell token0 for token1
        #[arg(long)]
        zero_for_one: bool,

        #[arg(long)]
        exact_output: bool,

        /// Stop at this price of token0 in token1
        #[arg(long)]
        limit_price: Option<Decimal>,
    },

    /// Size a position over a price range
    Position {
        #[arg(long)]
        lower_price: Decimal,

        #[arg(long)]
        upper_price: Decimal,

        #[arg(long, conflicts_with_all = ["amount_a", "amount_b"], required_unless_present_all = ["amount_a", "amount_b"])]
        liquidity: Option<u128>,

        #[arg(long, requires = "amount_b")]
        amount_a: Option<u64>,

        #[arg(long, requires = "amount_a")]
        amount_b: Option<u64>,
    },

    /// List initialized tick arrays around the current price
    TickArrays,

    /// Convert a tick or sqrt price
    Price {
        #[arg(long, allow_negative_numbers = true, conflicts_with = "sqrt_price", required_unless_present = "sqrt_price")]
        tick: Option<i32>,

        #[arg(long)]
        sqrt_price: Option<u128>,

        /// token0 decimals, taken from --pool when omitted
        #[arg(long)]
        decimals_a: Option<u8>,

        /// token1 decimals, taken from --pool when omitted
        #[arg(long)]
        decimals_b: Option<u8>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    let config = load_config(&args.config)?;
    log::debug!("Configuration: {:?}", config);

    match args.command {
        Command::Swap {
            amount,
            zero_for_one,
            exact_output,
            limit_price,
        } => {
            let quoter = load_quoter(config, args.pool.as_deref())?;
            let report = quoter.quote_swap(&SwapRequest {
                amount,
                zero_for_one,
                exact_output,
                limit_price,
            })?;
            print_json(&report)
        }
        Command::Position {
            lower_price,
            upper_price,
            liquidity,
            amount_a,
            amount_b,
        } => {
            let quoter = load_quoter(config, args.pool.as_deref())?;
            let report = quoter.quote_position(&PositionRequest {
                lower_price,
                upper_price,
                liquidity,
                amount_a,
                amount_b,
            })?;
            print_json(&report)
        }
        Command::TickArrays => {
            let quoter = load_quoter(config, args.pool.as_deref())?;
            print_json(&quoter.tick_arrays()?)
        }
        Command::Price {
            tick,
            sqrt_price,
            decimals_a,
            decimals_b,
        } => {
            let pool = match args.pool.as_deref() {
                Some(path) => Some(load_pool(path)?.pool),
                None => None,
            };
            let decimals_a = decimals_a.or(pool.as_ref().map(|p| p.mint_decimals_0)).unwrap_or(0);
            let decimals_b = decimals_b.or(pool.as_ref().map(|p| p.mint_decimals_1)).unwrap_or(0);
            let report = price_report(
                tick,
                sqrt_price,
                decimals_a,
                decimals_b,
                pool.as_ref().map(|p| p.tick_spacing),
            )?;
            print_json(&report)
        }
    }
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &str) -> anyhow::Result<QuoterConfig> {
    if Path::new(path).exists() {
        let config = QuoterConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path))?;
        log::info!("Loaded configuration from {}", path);
        Ok(config)
    } else {
        log::info!("No config file at {}, using defaults", path);
        Ok(QuoterConfig::default())
    }
}

fn load_pool(path: &str) -> anyhow::Result<PoolFile> {
    let pool_file =
        PoolFile::load(path).with_context(|| format!("Failed to load pool file {}", path))?;
    log::info!(
        "Loaded pool at tick {} with {} tick arrays",
        pool_file.pool.tick_current,
        pool_file.tick_arrays.len()
    );
    Ok(pool_file)
}

fn load_quoter(config: QuoterConfig, pool: Option<&str>) -> anyhow::Result<Quoter> {
    let path = pool.context("--pool is required for this command")?;
    Ok(Quoter::new(config, load_pool(path)?))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
