//! Market maker: keeps a two-sided quote around a reference price, `spread`
//! apart. Re-quotes both sides together when the reference price itself
//! moves; terminates (cancelling the other side) the moment either side
//! fills.
//!
//! Grounded on `core/algo.cpp`'s `MarketMakerAlgo::tick_impl`; fill
//! detection goes through `OrderTracker::get` rather than a private fill
//! callback, since the tracker is the engine's single source of truth for
//! order status (`spec.md` §4.4).

use crate::domain::order::{Order, PegReference};
use crate::domain::price::Price;
use crate::infrastructure::engine::ExecutionEngine;
use crate::infrastructure::order_tracker::OrderStatus;

pub struct MarketMakerAlgo {
    pub(super) parent_order: Order,
    spread: Price,
    reference: PegReference,
    bid_order_id: Option<String>,
    ask_order_id: Option<String>,
    last_ref_price: Option<Price>,
}

impl MarketMakerAlgo {
    pub fn new(parent_order: Order, spread: Price, reference: PegReference) -> Self {
        Self {
            parent_order,
            spread,
            reference,
            bid_order_id: None,
            ask_order_id: None,
            last_ref_price: None,
        }
    }

    /// Mirrors `PegAlgo::reference_price`: resolves through `get_depth`
    /// rather than the single-scalar `get_price`, so Bid/Ask/Mid actually
    /// differ.
    async fn reference_price(&self, engine: &ExecutionEngine) -> Option<Price> {
        match self.reference {
            PegReference::Bid => {
                let bid = engine.get_depth(&self.parent_order.market, true).await;
                if bid.is_zero() { None } else { Some(bid) }
            }
            PegReference::Ask => {
                let ask = engine.get_depth(&self.parent_order.market, false).await;
                if ask.is_zero() { None } else { Some(ask) }
            }
            PegReference::Mid => {
                let bid = engine.get_depth(&self.parent_order.market, true).await;
                let ask = engine.get_depth(&self.parent_order.market, false).await;
                if bid.is_zero() || ask.is_zero() {
                    None
                } else {
                    Some(Price::new((bid.raw + ask.raw) / 2))
                }
            }
        }
    }

    /// Scans the tracker first: if either side has filled, cancels the other
    /// and reports done. Otherwise re-quotes both sides together if the
    /// reference price has moved since the last quote.
    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        if self.is_filled(engine, &self.bid_order_id).await {
            self.cancel(self.ask_order_id.take()).await;
            self.bid_order_id = None;
            return true;
        }
        if self.is_filled(engine, &self.ask_order_id).await {
            self.cancel(self.bid_order_id.take()).await;
            self.ask_order_id = None;
            return true;
        }

        let Some(reference_price) = self.reference_price(engine).await else {
            return false;
        };

        if self.last_ref_price == Some(reference_price) {
            return false;
        }

        self.cancel(self.bid_order_id.take()).await;
        self.cancel(self.ask_order_id.take()).await;

        let half = Price::new(self.spread.raw / 2);
        let bid_target = reference_price - half;
        let ask_target = reference_price + half;
        let now = engine.now_ns();

        let bid_child = self.parent_order.child(self.parent_order.quantity, bid_target, true, now);
        let ask_child = self.parent_order.child(self.parent_order.quantity, ask_target, false, now);
        self.bid_order_id = engine.dispatch(bid_child).await;
        self.ask_order_id = engine.dispatch(ask_child).await;
        self.last_ref_price = Some(reference_price);

        false
    }

    async fn is_filled(&self, engine: &ExecutionEngine, slot: &Option<String>) -> bool {
        let Some(id) = slot else { return false };
        engine.tracker().get(id).map(|r| r.status == OrderStatus::Filled).unwrap_or(false)
    }

    async fn cancel(&self, id: Option<String>) {
        let Some(id) = id else { return };
        if let Some(backend) = &self.parent_order.backend {
            backend.cancel_order(&id).await;
        }
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
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MovingDepthBackend {
        bid: AtomicI64,
        ask: AtomicI64,
        counter: AtomicUsize,
    }

    #[async_trait]
    impl Backend for MovingDepthBackend {
        fn name(&self) -> &str {
            "mm"
        }
        async fn get_price(&self, _market: &MarketId, _outcome_yes: bool) -> Price {
            Price::zero()
        }
        async fn get_depth(&self, _market: &MarketId, is_bid: bool) -> Price {
            if is_bid {
                Price::new(self.bid.load(Ordering::Relaxed))
            } else {
                Price::new(self.ask.load(Ordering::Relaxed))
            }
        }
        async fn get_balance(&self) -> Price {
            Price::zero()
        }
        async fn get_positions(&self) -> String {
            "[]".to_string()
        }
        async fn create_order(&self, _order: &Order) -> String {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            format!("mm_{n}")
        }
        async fn cancel_order(&self, _id: &str) -> bool {
            true
        }
        async fn create_batch(&self, orders: &[Order]) -> Vec<String> {
            orders.iter().map(|_| "mm".to_string()).collect()
        }
    }

    fn setup(bid_cents: i64, ask_cents: i64) -> (ExecutionEngine, Arc<MovingDepthBackend>) {
        let mut engine = ExecutionEngine::new(Arc::new(BacktestClock::new()), std::time::Duration::from_millis(100));
        let backend = Arc::new(MovingDepthBackend {
            bid: AtomicI64::new(Price::from_cents(bid_cents).raw),
            ask: AtomicI64::new(Price::from_cents(ask_cents).raw),
            counter: AtomicUsize::new(0),
        });
        engine.register_backend(backend.clone());
        (engine, backend)
    }

    #[tokio::test]
    async fn quotes_both_sides_and_skips_requote_when_reference_unchanged() {
        let (engine, backend) = setup(48, 52);
        let parent = OrderBuilder::new(MarketId::new("X"), true, 10, 0)
            .backend(backend as Arc<dyn Backend>)
            .market_maker(Price::from_cents(4), PegReference::Mid)
            .build()
            .unwrap();
        let mut algo = MarketMakerAlgo::new(parent, Price::from_cents(4), PegReference::Mid);

        algo.tick(&engine).await;
        assert!(algo.bid_order_id.is_some());
        assert!(algo.ask_order_id.is_some());

        let bid_before = algo.bid_order_id.clone();
        let ask_before = algo.ask_order_id.clone();
        algo.tick(&engine).await;
        assert_eq!(algo.bid_order_id, bid_before);
        assert_eq!(algo.ask_order_id, ask_before);
    }

    #[tokio::test]
    async fn reference_price_move_requotes_both_sides() {
        let (engine, backend) = setup(48, 52);
        let parent = OrderBuilder::new(MarketId::new("X"), true, 10, 0)
            .backend(backend.clone() as Arc<dyn Backend>)
            .market_maker(Price::from_cents(4), PegReference::Mid)
            .build()
            .unwrap();
        let mut algo = MarketMakerAlgo::new(parent, Price::from_cents(4), PegReference::Mid);

        algo.tick(&engine).await;
        let bid_before = algo.bid_order_id.clone();
        let ask_before = algo.ask_order_id.clone();
        let ref_before = algo.last_ref_price;

        backend.bid.store(Price::from_cents(50).raw, Ordering::Relaxed);
        backend.ask.store(Price::from_cents(54).raw, Ordering::Relaxed);
        algo.tick(&engine).await;

        assert_ne!(algo.last_ref_price, ref_before);
        assert_ne!(algo.bid_order_id, bid_before);
        assert_ne!(algo.ask_order_id, ask_before);
    }

    #[tokio::test]
    async fn bid_fill_cancels_ask_and_terminates() {
        let (engine, backend) = setup(48, 52);
        let parent = OrderBuilder::new(MarketId::new("X"), true, 10, 0)
            .backend(backend as Arc<dyn Backend>)
            .market_maker(Price::from_cents(4), PegReference::Mid)
            .build()
            .unwrap();
        let mut algo = MarketMakerAlgo::new(parent, Price::from_cents(4), PegReference::Mid);

        algo.tick(&engine).await;
        let bid_id = algo.bid_order_id.clone().unwrap();
        engine.tracker().update_status(&bid_id, OrderStatus::Filled);

        let done = algo.tick(&engine).await;
        assert!(done);
        assert!(algo.bid_order_id.is_none());
    }
}
