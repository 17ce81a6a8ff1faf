//! Live trading entry point.
//!
//! Loads `config/engine.yaml` (override with `ENGINE_CONFIG_PATH`), wires up
//! whatever backends the caller registered, and runs `LiveExecutionEngine`
//! until Ctrl+C.
//!
//! Usage:
//!   cargo run --bin live
//!
//! Required environment variables:
//!   - API_KEY

use anyhow::{Context, Result};
use bop_engine::bin_common::{load_config_from_env, ConfigType};
use engine::{init_tracing_with_level, ExecutionEngine, LiveClock, LiveExecutionEngine, ShutdownManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = load_config_from_env(ConfigType::Engine);
    let config = engine::EngineConfig::load(&config_path)
        .with_context(|| format!("loading engine config from {}", config_path.display()))?;

    init_tracing_with_level(&config.logging.level);

    info!("========================================");
    info!("Starting live execution engine");
    info!("Press Ctrl+C to stop");
    info!("========================================");

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.spawn_signal_handler();

    let clock = Arc::new(LiveClock);
    let tick_interval = Duration::from_millis(config.tick.interval_ms);
    let exec_engine = Arc::new(ExecutionEngine::new(clock, tick_interval));

    // No concrete venue backend ships with this crate (spec §1: venue
    // backends are an external collaborator) — register one here before
    // running against a real account.

    let live_engine = LiveExecutionEngine::new(
        exec_engine.clone(),
        Duration::from_secs(config.live_sync.interval_secs),
    );

    let flag = shutdown.flag();
    let engine_for_watchdog = exec_engine.clone();
    tokio::spawn(async move {
        while flag.load(std::sync::atomic::Ordering::Acquire) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        engine_for_watchdog.stop();
    });

    live_engine.run().await;

    info!("========================================");
    info!("Live execution engine stopped gracefully");
    info!("========================================");
    Ok(())
}
