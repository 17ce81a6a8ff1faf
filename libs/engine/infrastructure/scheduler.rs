//! Drains newly-submitted algorithms/strategies into the active set and
//! ticks each one in turn, every engine tick.
//!
//! Grounded on `core/algo_manager.hpp`'s `AlgoManager` (pending/active
//! double buffering so a `submit` call mid-tick never races the in-flight
//! iteration) and the teacher's `infrastructure/risk_manager.rs` for the
//! "drain under lock, iterate outside it" shape.

use crate::application::strategy::Strategy;
use crate::domain::order::Order;
use crate::infrastructure::algorithms::Algorithm;
use crate::infrastructure::engine::ExecutionEngine;
use parking_lot::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct Pending {
    algos: Vec<(Order, i64)>,
    strategies: Vec<Box<dyn Strategy>>,
}

pub struct AlgoScheduler {
    pending: Mutex<Pending>,
    active_algos: Mutex<Vec<Algorithm>>,
    active_strategies: Mutex<Vec<Box<dyn Strategy>>>,
}

impl AlgoScheduler {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            active_algos: Mutex::new(Vec::new()),
            active_strategies: Mutex::new(Vec::new()),
        }
    }

    /// Queues an order for the next tick. `now_ns` stamps the algorithm's
    /// construction time (e.g. the TWAP schedule's start).
    pub fn submit(&self, order: Order, now_ns: i64) {
        self.pending.lock().algos.push((order, now_ns));
    }

    pub fn submit_strategy(&self, strategy: Box<dyn Strategy>) {
        self.pending.lock().strategies.push(strategy);
    }

    pub fn active_algo_count(&self) -> usize {
        self.active_algos.lock().len()
    }

    pub fn active_strategy_count(&self) -> usize {
        self.active_strategies.lock().len()
    }

    /// Drains `pending` into `active`, then ticks every active algorithm and
    /// strategy once, dropping the ones that report done.
    pub async fn tick(&self, engine: &ExecutionEngine) {
        let drained = {
            let mut pending = self.pending.lock();
            std::mem::take(&mut *pending)
        };

        for (order, now_ns) in drained.algos {
            match Algorithm::from_order(order, now_ns) {
                Some(algo) => self.active_algos.lock().push(algo),
                None => warn!("order.algo_type didn't match algo_params, dropped at submission"),
            }
        }
        self.active_strategies.lock().extend(drained.strategies);

        let mut algos = std::mem::take(&mut *self.active_algos.lock());
        let mut still_active = Vec::with_capacity(algos.len());
        for mut algo in algos.drain(..) {
            let done = algo.tick(engine).await;
            if done {
                debug!(market_hash = algo.market_hash(), "algorithm finished");
            } else {
                still_active.push(algo);
            }
        }
        *self.active_algos.lock() = still_active;

        let mut strategies = std::mem::take(&mut *self.active_strategies.lock());
        let mut still_active_strategies = Vec::with_capacity(strategies.len());
        for mut strategy in strategies.drain(..) {
            let done = strategy.tick(engine).await;
            if !done {
                still_active_strategies.push(strategy);
            }
        }
        *self.active_strategies.lock() = still_active_strategies;
    }

    /// Forwards a market-data update to every active strategy, in order.
    pub async fn broadcast_market_event(&self, engine: &ExecutionEngine, market_hash: u32) {
        let mut strategies = std::mem::take(&mut *self.active_strategies.lock());
        for strategy in strategies.iter_mut() {
            strategy.on_market_event(engine, market_hash).await;
        }
        *self.active_strategies.lock() = strategies;
    }

    /// Forwards an order status transition to every active strategy.
    pub async fn broadcast_execution_event(&self, engine: &ExecutionEngine, order_id: &str) {
        let mut strategies = std::mem::take(&mut *self.active_strategies.lock());
        for strategy in strategies.iter_mut() {
            strategy.on_execution_event(engine, order_id).await;
        }
        *self.active_strategies.lock() = strategies;
    }
}

impl Default for AlgoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketId;
    use crate::domain::order::OrderBuilder;
    use crate::infrastructure::clock::BacktestClock;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn submitted_algo_becomes_active_after_one_tick() {
        let engine = ExecutionEngine::new(Arc::new(BacktestClock::new()), Duration::from_millis(100));
        let order = OrderBuilder::new(MarketId::new("X"), true, 10, 0).twap(60).build().unwrap();
        engine.scheduler().submit(order, 0);
        assert_eq!(engine.scheduler().active_algo_count(), 0);

        engine.tick_once().await;
        assert_eq!(engine.scheduler().active_algo_count(), 1);
    }

    #[tokio::test]
    async fn finished_algo_is_dropped_from_active_set() {
        let clock = Arc::new(BacktestClock::new());
        let engine = ExecutionEngine::new(clock.clone(), Duration::from_millis(100));
        let order = OrderBuilder::new(MarketId::new("X"), true, 10, 0).twap(1).build().unwrap();
        engine.scheduler().submit(order, 0);
        engine.tick_once().await;
        assert_eq!(engine.scheduler().active_algo_count(), 1);

        clock.set_current_time_ns(2_000_000_000);
        engine.tick_once().await;
        assert_eq!(engine.scheduler().active_algo_count(), 0);
    }
}
