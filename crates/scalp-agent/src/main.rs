//! Scalp Eval
//!
//! Runs a single decision cycle over a candle file and prints the decision as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use scalp_agent::{DecisionCore, OpenPosition};
use scalp_core::types::parse_candles;
use scalp_core::{PositionSide, StrategyConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "scalp-eval", version, about = "Evaluate one trading decision cycle")]
struct Args {
    /// JSON file of candles: [[timestamp, open, high, low, close, volume], ...]
    #[arg(long)]
    candles: PathBuf,

    /// Current account equity in quote currency.
    #[arg(long)]
    equity: Decimal,

    /// Optional TOML/JSON/YAML strategy configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side of the currently open position, if any.
    #[arg(long, requires = "opened_at")]
    side: Option<PositionSide>,

    /// Open time of the current position in epoch milliseconds.
    #[arg(long, requires = "side")]
    opened_at: Option<i64>,

    /// Realised P&L of trades already closed today, in order. Repeatable.
    #[arg(long = "pnl", allow_hyphen_values = true)]
    pnl: Vec<Decimal>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the decision.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scalp_agent=info,risk_manager=info,signal_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = StrategyConfig::load(args.config.as_deref()).context("loading configuration")?;
    info!(
        timeframe = %config.market.timeframe,
        candle_limit = config.market.candle_limit,
        dry_run = config.market.dry_run,
        "Configuration loaded"
    );

    let raw = std::fs::read_to_string(&args.candles)
        .with_context(|| format!("reading {}", args.candles.display()))?;
    let candles = parse_candles(&raw).context("parsing candles")?;

    let mut core = DecisionCore::new(&config);
    for pnl in &args.pnl {
        core.record_closed_trade(*pnl, args.equity);
    }

    let position = match (args.side, args.opened_at) {
        (Some(side), Some(opened_at_ms)) => Some(OpenPosition { side, opened_at_ms }),
        _ => None,
    };

    let decision = core.evaluate(&candles, args.equity, position.as_ref());

    let output = if args.pretty {
        serde_json::to_string_pretty(&decision)?
    } else {
        serde_json::to_string(&decision)?
    };
    println!("{}", output);

    Ok(())
}
