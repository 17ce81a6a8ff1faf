//! Volume-weighted participation: on each tick, trades `participation_rate`
//! of the venue's observed volume delta since the last tick, throttled to at
//! most one slice every 2 s. The first observation only primes the
//! watermark and never trades, since there is no prior reading to take a
//! delta against.
//!
//! Grounded on `core/algo.cpp`'s `VwapAlgo::tick_impl` (volume-delta
//! participation, not a fixed clip size, `last_market_volume == -1` priming
//! on the first tick) and `Backend::get_volume`'s "0 means no observation
//! yet" contract.

use crate::domain::order::Order;
use crate::infrastructure::engine::ExecutionEngine;

const THROTTLE_NS: i64 = 2_000_000_000;

pub struct VwapAlgo {
    pub(super) parent_order: Order,
    participation_rate: f64,
    sent_qty: i32,
    last_volume: Option<i64>,
    last_slice_ns: Option<i64>,
}

impl VwapAlgo {
    pub fn new(parent_order: Order, participation_rate: f64) -> Self {
        Self { parent_order, participation_rate, sent_qty: 0, last_volume: None, last_slice_ns: None }
    }

    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        let total_qty = self.parent_order.quantity;
        if self.sent_qty >= total_qty {
            return true;
        }

        let volume = engine.get_volume(&self.parent_order.market).await;
        let Some(last_volume) = self.last_volume else {
            self.last_volume = Some(volume);
            return false;
        };

        let delta = (volume - last_volume).max(0);
        self.last_volume = Some(volume);
        if delta == 0 {
            return false;
        }

        let now = engine.now_ns();
        if let Some(last) = self.last_slice_ns {
            if now - last < THROTTLE_NS {
                return false;
            }
        }

        let participate = ((delta as f64 * self.participation_rate).round() as i32).max(0);
        let qty = participate.min(total_qty - self.sent_qty);
        if qty > 0 {
            let price = engine.get_price(&self.parent_order.market, self.parent_order.outcome_yes).await;
            let child = self.parent_order.child(qty, price, self.parent_order.is_buy, now);
            engine.dispatch(child).await;
            self.sent_qty += qty;
            self.last_slice_ns = Some(now);
        }

        self.sent_qty >= total_qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketId;
    use crate::domain::order::OrderBuilder;
    use crate::infrastructure::backend::Backend;
    use crate::infrastructure::clock::BacktestClock;
    use async_trait::async_trait;
    use crate::domain::market::MarketId as MId;
    use crate::domain::price::Price;
    use std::sync::Arc;

    struct VolBackend(i64);

    #[async_trait]
    impl Backend for VolBackend {
        fn name(&self) -> &str {
            "vol"
        }
        async fn get_price(&self, _market: &MId, _outcome_yes: bool) -> Price {
            Price::from_cents(50)
        }
        async fn get_depth(&self, _market: &MId, _is_bid: bool) -> Price {
            Price::zero()
        }
        async fn get_volume(&self, _market: &MId) -> i64 {
            self.0
        }
        async fn get_balance(&self) -> Price {
            Price::zero()
        }
        async fn get_positions(&self) -> String {
            "[]".to_string()
        }
        async fn create_order(&self, _order: &Order) -> String {
            "v1".to_string()
        }
        async fn cancel_order(&self, _id: &str) -> bool {
            true
        }
        async fn create_batch(&self, orders: &[Order]) -> Vec<String> {
            orders.iter().map(|_| "v".to_string()).collect()
        }
    }

    struct GrowingVolBackend(std::sync::atomic::AtomicI64);

    #[async_trait]
    impl Backend for GrowingVolBackend {
        fn name(&self) -> &str {
            "growing_vol"
        }
        async fn get_price(&self, _market: &MId, _outcome_yes: bool) -> Price {
            Price::from_cents(50)
        }
        async fn get_depth(&self, _market: &MId, _is_bid: bool) -> Price {
            Price::zero()
        }
        async fn get_volume(&self, _market: &MId) -> i64 {
            self.0.load(std::sync::atomic::Ordering::Relaxed)
        }
        async fn get_balance(&self) -> Price {
            Price::zero()
        }
        async fn get_positions(&self) -> String {
            "[]".to_string()
        }
        async fn create_order(&self, _order: &Order) -> String {
            "v1".to_string()
        }
        async fn cancel_order(&self, _id: &str) -> bool {
            true
        }
        async fn create_batch(&self, orders: &[Order]) -> Vec<String> {
            orders.iter().map(|_| "v".to_string()).collect()
        }
    }

    #[tokio::test]
    async fn first_tick_only_primes_and_never_trades() {
        let mut engine = ExecutionEngine::new(Arc::new(BacktestClock::new()), std::time::Duration::from_millis(100));
        engine.register_backend(Arc::new(VolBackend(1000)));

        let parent = OrderBuilder::new(MarketId::new("X"), true, 1000, 0).vwap(0.1).build().unwrap();
        let mut algo = VwapAlgo::new(parent, 0.1);

        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 0);
        assert_eq!(algo.last_volume, Some(1000));
    }

    #[tokio::test]
    async fn participates_proportionally_to_volume_delta_after_priming() {
        let clock = Arc::new(BacktestClock::new());
        let mut engine = ExecutionEngine::new(clock.clone(), std::time::Duration::from_millis(100));
        let volume = Arc::new(GrowingVolBackend(std::sync::atomic::AtomicI64::new(1000)));
        engine.register_backend(volume.clone());

        let parent = OrderBuilder::new(MarketId::new("X"), true, 1000, 0).vwap(0.1).build().unwrap();
        let mut algo = VwapAlgo::new(parent, 0.1);

        // First tick only primes the watermark.
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 0);

        volume.0.store(2000, std::sync::atomic::Ordering::Relaxed);
        clock.set_current_time_ns(3_000_000_000);
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 100);
    }

    #[tokio::test]
    async fn throttles_to_one_slice_per_2s() {
        let clock = Arc::new(BacktestClock::new());
        let mut engine = ExecutionEngine::new(clock.clone(), std::time::Duration::from_millis(100));
        let volume = Arc::new(GrowingVolBackend(std::sync::atomic::AtomicI64::new(1000)));
        engine.register_backend(volume.clone());

        let parent = OrderBuilder::new(MarketId::new("X"), true, 1000, 0).vwap(0.1).build().unwrap();
        let mut algo = VwapAlgo::new(parent, 0.1);

        // First tick only primes the watermark.
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 0);

        volume.0.store(2000, std::sync::atomic::Ordering::Relaxed);
        clock.set_current_time_ns(1_000_000_000);
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 100);

        // Volume keeps growing within the 2s throttle window: no new slice.
        volume.0.store(2500, std::sync::atomic::Ordering::Relaxed);
        clock.set_current_time_ns(2_000_000_000);
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 100);

        // Past the throttle window: a fresh delta now participates.
        volume.0.store(3000, std::sync::atomic::Ordering::Relaxed);
        clock.set_current_time_ns(3_500_000_000);
        algo.tick(&engine).await;
        assert_eq!(algo.sent_qty, 200);
    }
}
