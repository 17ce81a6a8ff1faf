//! Live trading on top of `ExecutionEngine`: a periodic background task that
//! pulls balance/positions off every registered backend and refreshes the
//! shared cache under one lock.
//!
//! Grounded on `core/engine.hpp`'s `sync_state` and the teacher's
//! `infrastructure/balance_manager.rs`/`position_manager.rs` for the
//! `tokio::spawn` periodic-sync idiom (compute fresh values, then take the
//! lock only to swap them in).

use crate::domain::market::fnv1a;
use crate::domain::price::Price;
use crate::infrastructure::engine::ExecutionEngine;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub struct LiveExecutionEngine {
    pub engine: Arc<ExecutionEngine>,
    sync_interval: Duration,
    sync_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl LiveExecutionEngine {
    pub fn new(engine: Arc<ExecutionEngine>, sync_interval: Duration) -> Self {
        Self { engine, sync_interval, sync_handle: std::sync::Mutex::new(None) }
    }

    /// Spawns the periodic venue-sync task (`spec.md` §4.3's 5s cadence)
    /// alongside the tick loop; both run until `ExecutionEngine::stop`.
    pub fn spawn_sync_task(&self) {
        let engine = self.engine.clone();
        let interval = self.sync_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if !engine.is_running() {
                    break;
                }
                sync_state(&engine).await;
            }
        });
        *self.sync_handle.lock().expect("sync handle lock poisoned") = Some(handle);
    }

    /// Runs the tick loop until `ExecutionEngine::stop`, then joins the
    /// sync task so shutdown only returns once both background loops have
    /// actually exited (`spec.md` §4.2: shutdown joins the sync thread).
    pub async fn run(&self) {
        self.spawn_sync_task();
        self.engine.run().await;
        self.join_sync_task().await;
    }

    /// Awaits the sync task's exit. A no-op if it was never spawned or has
    /// already been joined.
    async fn join_sync_task(&self) {
        let handle = self.sync_handle.lock().expect("sync handle lock poisoned").take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(%err, "sync task panicked during shutdown");
            }
        }
    }
}

/// One balance/positions refresh: sums balance across every backend (each
/// venue's own share of capital), merges positions (summed per market
/// across backends), then takes the cache lock once to install both.
async fn sync_state(engine: &ExecutionEngine) {
    let mut total_balance = Price::zero();
    let mut merged_positions: HashMap<u32, i64> = HashMap::new();

    for backend in engine.backends() {
        let balance = backend.get_balance().await;
        total_balance = total_balance + balance;

        let positions_json = backend.get_positions().await;
        match parse_positions(&positions_json) {
            Ok(positions) => {
                for (hash, qty) in positions {
                    *merged_positions.entry(hash).or_insert(0) += qty;
                }
            }
            Err(err) => warn!(backend = backend.name(), %err, "failed to parse positions payload"),
        }
    }

    engine.update_cache(total_balance, merged_positions);
    debug!("live sync: balance and positions refreshed");
}

/// Accepts the three shapes `spec.md` §6 tolerates, resolving every ticker
/// or venue token through `fnv1a` into the `u32` hash the cache keys on:
/// 1. `[{"asset_id"|"token_id": "...", "size": "45"}, ...]` (size as string)
/// 2. `{"market_positions": [{"ticker": "...", "position": 45}, ...]}`
/// 3. `{"positions": [{"market_ticker"|"token_id"|"ticker": "...", "quantity"|"position"|"size": 45}, ...]}`
///
/// Any other shape is treated as "no positions" rather than an error — a
/// malformed payload from one venue shouldn't poison the whole sync.
fn parse_positions(json: &str) -> Result<Vec<(u32, i64)>, serde_json::Error> {
    let value: Value = serde_json::from_str(json)?;
    Ok(extract_positions(&value))
}

fn ticker_field(item: &Value) -> Option<&str> {
    item.get("market_ticker")
        .or_else(|| item.get("token_id"))
        .or_else(|| item.get("ticker"))
        .or_else(|| item.get("asset_id"))
        .and_then(Value::as_str)
}

fn quantity_field(item: &Value) -> Option<i64> {
    let raw = item.get("quantity").or_else(|| item.get("position")).or_else(|| item.get("size"))?;
    raw.as_i64().or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
}

fn extract_entries(items: &[Value]) -> Vec<(u32, i64)> {
    items
        .iter()
        .filter_map(|item| {
            let ticker = ticker_field(item)?;
            let qty = quantity_field(item)?;
            Some((fnv1a(ticker), qty))
        })
        .collect()
}

fn extract_positions(value: &Value) -> Vec<(u32, i64)> {
    match value {
        Value::Array(items) => extract_entries(items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("market_positions") {
                return extract_entries(items);
            }
            if let Some(Value::Array(items)) = map.get("positions") {
                return extract_entries(items);
            }
            error!("positions payload object has neither market_positions nor positions array");
            Vec::new()
        }
        _ => {
            error!("positions payload neither array nor object, ignoring");
            Vec::new()
        }
    }
}
