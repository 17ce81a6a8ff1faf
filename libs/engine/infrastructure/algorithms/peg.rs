//! Pegged order: re-quotes a single resting child at `reference + offset`,
//! where `reference` is the best bid, best ask, or their midpoint. Re-quotes
//! only when the target has moved and at most once per 500 ms, so a quiet or
//! choppy market doesn't generate a cancel/replace every tick.
//!
//! Grounded on `core/algo.cpp`'s `PegAlgo::tick_impl`, which pegs to a book
//! side read off the local book; `Backend::get_depth(market, is_bid)`
//! supplies that side here (`spec.md` §4.6.3), with Mid averaging both.

use crate::domain::order::{Order, PegReference};
use crate::domain::price::Price;
use crate::infrastructure::engine::ExecutionEngine;

const THROTTLE_NS: i64 = 500_000_000;

pub struct PegAlgo {
    pub(super) parent_order: Order,
    reference: PegReference,
    offset: Price,
    active_order_id: Option<String>,
    last_quoted_price: Option<Price>,
    last_update_ns: Option<i64>,
}

impl PegAlgo {
    pub fn new(parent_order: Order, reference: PegReference, offset: Price) -> Self {
        Self {
            parent_order,
            reference,
            offset,
            active_order_id: None,
            last_quoted_price: None,
            last_update_ns: None,
        }
    }

    /// `None` if the side(s) needed aren't available yet (zero depth).
    async fn reference_price(&self, engine: &ExecutionEngine) -> Option<Price> {
        match self.reference {
            PegReference::Bid => {
                let bid = engine.get_depth(&self.parent_order.market, true).await;
                if bid.is_zero() {
                    None
                } else {
                    Some(bid)
                }
            }
            PegReference::Ask => {
                let ask = engine.get_depth(&self.parent_order.market, false).await;
                if ask.is_zero() {
                    None
                } else {
                    Some(ask)
                }
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

    /// Never self-terminates; lives until the parent order is cancelled
    /// externally, so `tick` always reports "not done".
    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        let Some(reference_price) = self.reference_price(engine).await else {
            return false;
        };

        let target = reference_price + self.offset;
        if self.last_quoted_price == Some(target) {
            return false;
        }

        let now = engine.now_ns();
        if let Some(last) = self.last_update_ns {
            if now - last < THROTTLE_NS {
                return false;
            }
        }

        if let Some(id) = self.active_order_id.take() {
            if let Some(backend) = &self.parent_order.backend {
                backend.cancel_order(&id).await;
            }
        }
        let child = self.parent_order.child(self.parent_order.quantity, target, self.parent_order.is_buy, now);
        self.active_order_id = engine.dispatch(child).await;
        self.last_quoted_price = Some(target);
        self.last_update_ns = Some(now);

        false
    }
}
