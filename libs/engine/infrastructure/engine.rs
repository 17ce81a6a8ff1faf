//! The execution engine: owns venue backends, caches balance/positions,
//! dispatches orders, and drives the algorithm scheduler at a fixed cadence.
//!
//! Grounded on `core/engine.hpp`'s `ExecutionEngine` (dispatch variants,
//! first-nonzero fan-out, tick loop) and the teacher's
//! `infrastructure/balance_manager.rs` for the "compute under lock, act after
//! dropping it" locking idiom.

use crate::domain::market::MarketId;
use crate::domain::order::{AlgoType, Order};
use crate::domain::price::Price;
use crate::infrastructure::backend::{Backend, REJECTED_ORDER_ID};
use crate::infrastructure::clock::Clock;
use crate::infrastructure::order_tracker::OrderTracker;
use crate::infrastructure::scheduler::AlgoScheduler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cached balance + positions, protected by a single mutex (`spec.md` §4.2).
#[derive(Default)]
pub struct EngineCache {
    pub balance: Price,
    pub positions: HashMap<u32, i64>,
}

pub struct ExecutionEngine {
    backends: Vec<Arc<dyn Backend>>,
    pub(crate) tracker: Arc<OrderTracker>,
    pub(crate) scheduler: Arc<AlgoScheduler>,
    cache: Mutex<EngineCache>,
    starting_balance: Mutex<Option<Price>>,
    clock: Arc<dyn Clock>,
    is_running: AtomicBool,
    tick_interval: Duration,
}

impl ExecutionEngine {
    pub fn new(clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        Self {
            backends: Vec::new(),
            tracker: Arc::new(OrderTracker::new()),
            scheduler: Arc::new(AlgoScheduler::new()),
            cache: Mutex::new(EngineCache::default()),
            starting_balance: Mutex::new(None),
            clock,
            is_running: AtomicBool::new(false),
            tick_interval,
        }
    }

    pub fn register_backend(&mut self, backend: Arc<dyn Backend>) {
        self.backends.push(backend);
    }

    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    pub fn tracker(&self) -> &OrderTracker {
        &self.tracker
    }

    /// Clones the tracker handle so a backend (e.g. the backtest matcher)
    /// can post fills into the same tracker `dispatch` tracks orders in.
    pub fn tracker_arc(&self) -> Arc<OrderTracker> {
        self.tracker.clone()
    }

    pub fn scheduler(&self) -> &AlgoScheduler {
        &self.scheduler
    }

    pub fn now_ns(&self) -> i64 {
        self.clock.now_ns()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Release);
    }

    /// If `o.algo_type != None`, hands off to the scheduler. Else, if a
    /// backend is bound, places it and tracks the returned id. Else logs
    /// "no backend bound" and does nothing.
    pub async fn dispatch(&self, order: Order) -> Option<String> {
        if order.algo_type != AlgoType::None {
            self.scheduler.submit(order, self.now_ns());
            return None;
        }

        let Some(backend) = order.backend.clone() else {
            warn!("dispatch: no backend bound, order dropped");
            return None;
        };

        let id = backend.create_order(&order).await;
        if id.is_empty() || id == REJECTED_ORDER_ID {
            debug!(id, "venue rejected order");
            return None;
        }
        self.tracker.track(&id, order);
        Some(id)
    }

    /// All orders sharing one non-null backend go through `create_batch`;
    /// otherwise each is dispatched individually.
    pub async fn dispatch_batch(&self, orders: Vec<Order>) {
        if orders.is_empty() {
            return;
        }
        let common_backend = orders[0].backend.clone();
        let all_same = common_backend.is_some()
            && orders.iter().all(|o| {
                matches!((&o.backend, &common_backend), (Some(a), Some(b)) if Arc::ptr_eq(a, b))
            });

        if all_same {
            let backend = common_backend.unwrap();
            let ids = backend.create_batch(&orders).await;
            for (id, order) in ids.into_iter().zip(orders.into_iter()) {
                if id.is_empty() || id == REJECTED_ORDER_ID {
                    continue;
                }
                self.tracker.track(&id, order);
            }
        } else {
            for order in orders {
                self.dispatch(order).await;
            }
        }
    }

    pub async fn dispatch_conditional(&self, condition: bool, order: Order) {
        if condition {
            self.dispatch(order).await;
        } else {
            debug!("dispatch_conditional: condition false, order suppressed");
        }
    }

    /// Both legs dispatch unconditionally; they are linked only by the
    /// caller's convention (venue-side OCO linking is a future extension).
    pub async fn dispatch_oco(&self, a: Order, b: Order) {
        self.dispatch(a).await;
        self.dispatch(b).await;
    }

    /// First non-zero answer across backends, in registration order — not a
    /// consistent cross-venue snapshot; an accepted relaxation (`spec.md` §5).
    pub async fn get_price(&self, market: &MarketId, outcome_yes: bool) -> Price {
        for backend in &self.backends {
            let price = backend.get_price(market, outcome_yes).await;
            if !price.is_zero() {
                return price;
            }
        }
        Price::zero()
    }

    pub async fn get_depth(&self, market: &MarketId, is_bid: bool) -> Price {
        for backend in &self.backends {
            let depth = backend.get_depth(market, is_bid).await;
            if !depth.is_zero() {
                return depth;
            }
        }
        Price::zero()
    }

    pub async fn get_volume(&self, market: &MarketId) -> i64 {
        for backend in &self.backends {
            let volume = backend.get_volume(market).await;
            if volume != 0 {
                return volume;
            }
        }
        0
    }

    pub fn get_position(&self, market: &MarketId) -> i64 {
        self.cache.lock().positions.get(&market.hash).copied().unwrap_or(0)
    }

    pub fn get_balance(&self) -> Price {
        self.cache.lock().balance
    }

    pub fn get_exposure(&self) -> i64 {
        self.cache.lock().positions.values().map(|q| q.abs()).sum()
    }

    /// Realized P&L: cached balance minus the balance observed on the first
    /// sync. No mark-to-market pricing source is in scope for the core
    /// cache, so this is realized P&L only, not mark-to-market.
    pub fn get_pnl(&self) -> Price {
        let baseline = self.starting_balance.lock().unwrap_or(Price::zero());
        self.cache.lock().balance - baseline
    }

    /// Installs a fresh balance/positions snapshot (`spec.md` §4.2's
    /// periodic live sync). The first call's balance becomes the PnL
    /// baseline `get_pnl` measures against.
    pub(crate) fn update_cache(&self, balance: Price, positions: HashMap<u32, i64>) {
        let mut starting = self.starting_balance.lock();
        if starting.is_none() {
            *starting = Some(balance);
        }
        drop(starting);

        let mut cache = self.cache.lock();
        cache.balance = balance;
        cache.positions = positions;
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// One iteration of `scheduler.tick` — split out from `run()` so both
    /// the live and backtest loops can drive it explicitly.
    pub async fn tick_once(&self) {
        self.scheduler.tick(self).await;
    }

    /// Enters the tick loop: `scheduler.tick(self)` then sleep, until
    /// `stop()` flips `is_running`.
    pub async fn run(&self) {
        self.is_running.store(true, Ordering::Release);
        info!(interval_ms = self.tick_interval.as_millis() as u64, "engine tick loop starting");
        while self.is_running() {
            self.tick_once().await;
            tokio::time::sleep(self.tick_interval).await;
        }
        info!("engine tick loop stopped");
    }
}
