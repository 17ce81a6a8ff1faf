//! Trailing stop: tracks the most favorable price seen and fires a market
//! order once price reverses by `trail_amount` from that watermark.
//!
//! Grounded on `core/algo.cpp`'s `TrailingStopAlgo::tick_impl`: a buy order
//! tracks the running low and fires on a rebound; a sell order tracks the
//! running high and fires on a pullback.

use crate::domain::order::Order;
use crate::domain::price::Price;
use crate::infrastructure::engine::ExecutionEngine;

pub struct TrailingStopAlgo {
    pub(super) parent_order: Order,
    trail_amount: Price,
    watermark: Option<Price>,
    triggered: bool,
}

impl TrailingStopAlgo {
    pub fn new(parent_order: Order, trail_amount: Price) -> Self {
        Self { parent_order, trail_amount, watermark: None, triggered: false }
    }

    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        if self.triggered {
            return true;
        }

        let price = engine.get_price(&self.parent_order.market, self.parent_order.outcome_yes).await;
        if price.is_zero() {
            return false;
        }

        let watermark = match self.watermark {
            None => {
                self.watermark = Some(price);
                return false;
            }
            Some(w) => w,
        };

        let fired = if self.parent_order.is_buy {
            if price.raw < watermark.raw {
                self.watermark = Some(price);
                false
            } else {
                price.raw - watermark.raw >= self.trail_amount.raw
            }
        } else {
            if price.raw > watermark.raw {
                self.watermark = Some(price);
                false
            } else {
                watermark.raw - price.raw >= self.trail_amount.raw
            }
        };

        if fired {
            let child = self.parent_order.child(
                self.parent_order.quantity,
                Price::zero(),
                self.parent_order.is_buy,
                engine.now_ns(),
            );
            engine.dispatch(child).await;
            self.triggered = true;
        }

        self.triggered
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
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct MovingPriceBackend(Arc<AtomicI64>);

    #[async_trait]
    impl Backend for MovingPriceBackend {
        fn name(&self) -> &str {
            "moving"
        }
        async fn get_price(&self, _market: &MarketId, _outcome_yes: bool) -> Price {
            Price::new(self.0.load(Ordering::Relaxed))
        }
        async fn get_depth(&self, _market: &MarketId, _is_bid: bool) -> Price {
            Price::zero()
        }
        async fn get_balance(&self) -> Price {
            Price::zero()
        }
        async fn get_positions(&self) -> String {
            "[]".to_string()
        }
        async fn create_order(&self, _order: &Order) -> String {
            "ts1".to_string()
        }
        async fn cancel_order(&self, _id: &str) -> bool {
            true
        }
        async fn create_batch(&self, orders: &[Order]) -> Vec<String> {
            orders.iter().map(|_| "ts".to_string()).collect()
        }
    }

    #[tokio::test]
    async fn fires_on_reversal_from_watermark() {
        let price = Arc::new(AtomicI64::new(Price::from_cents(60).raw));
        let mut engine = ExecutionEngine::new(Arc::new(BacktestClock::new()), std::time::Duration::from_millis(100));
        engine.register_backend(Arc::new(MovingPriceBackend(price.clone())));

        let parent = OrderBuilder::new(MarketId::new("X"), false, 10, 0)
            .trailing_stop(Price::from_cents(5))
            .build()
            .unwrap();
        let mut algo = TrailingStopAlgo::new(parent, Price::from_cents(5));

        // Seed the watermark at 0.60.
        assert!(!algo.tick(&engine).await);

        // Price keeps rising: watermark follows, never fires.
        price.store(Price::from_cents(70).raw, Ordering::Relaxed);
        assert!(!algo.tick(&engine).await);
        assert_eq!(algo.watermark, Some(Price::from_cents(70)));

        // Price pulls back by more than the trail amount: fires.
        price.store(Price::from_cents(64).raw, Ordering::Relaxed);
        assert!(algo.tick(&engine).await);
        assert!(algo.triggered);
    }
}
