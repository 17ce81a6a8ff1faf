//! Backtest replay entry point.
//!
//! Replays a CSV or JSON price tape (`spec.md` §6 formats) through
//! `BacktestEngine` and prints the post-run report.
//!
//! Usage:
//!   cargo run --bin backtest -- path/to/tape.csv
//!   cargo run --bin backtest -- path/to/tape.json --json

use anyhow::{bail, Context, Result};
use bop_engine::bin_common::parse_args;
use engine::{init_tracing_with_level, BacktestEngine, LatencyModel, SlippageModel};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing_with_level("info");

    let args = parse_args();
    let Some(tape_path) = args.first() else {
        bail!("usage: backtest <tape.csv|tape.json> [--json]");
    };
    let is_json = args.iter().any(|a| a == "--json") || tape_path.ends_with(".json");

    info!(tape = %tape_path, "starting backtest replay");

    let bt = BacktestEngine::new(LatencyModel::default(), SlippageModel::default(), Duration::from_millis(100));

    let tape = if is_json {
        bt.run_from_json(tape_path).with_context(|| format!("reading JSON tape {tape_path}"))?
    } else {
        bt.run_from_csv(tape_path).with_context(|| format!("reading CSV tape {tape_path}"))?
    };

    bt.run(tape).await;

    let report = bt.report().await;
    info!(
        final_balance = %report.final_balance,
        total_fills = report.total_fills,
        total_orders = report.total_orders,
        "backtest replay finished"
    );
    for (market_hash, qty) in &report.positions {
        info!(market_hash, qty, "final position");
    }

    Ok(())
}
