//! Cross-venue arbitrage: one-shot. Reads the YES price on both the parent
//! market and `market2`; when one side is cheaper than the other by at least
//! `min_profit`, buys the cheap side and sells the expensive side, then
//! terminates.
//!
//! Grounded on `core/algo.cpp`'s `ArbitrageAlgo::tick_impl`, adapted to the
//! literal buy-low/sell-high cross-venue model `spec.md` §4.6.6 and end-to-
//! end scenario 5 describe (not the combined-YES+NO synthetic payout the
//! original source's variable names suggest — the scenario's worked numbers
//! only make sense as same-outcome price discrepancy).

use crate::domain::order::{MarketId2Ref, Order, OrderBuilder};
use crate::domain::price::Price;
use crate::infrastructure::engine::ExecutionEngine;
use tracing::warn;

pub struct ArbitrageAlgo {
    pub(super) parent_order: Order,
    market2: MarketId2Ref,
    min_profit: Price,
    done: bool,
}

impl ArbitrageAlgo {
    pub fn new(parent_order: Order, market2: MarketId2Ref, min_profit: Price) -> Self {
        Self { parent_order, market2, min_profit, done: false }
    }

    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        if self.done {
            return true;
        }

        let price1 = engine.get_price(&self.parent_order.market, true).await;
        let price2 = self.market2.backend.get_price(&self.market2.market, true).await;
        if price1.is_zero() || price2.is_zero() {
            return false;
        }

        let buy_on_market1 = if price2.raw > price1.raw + self.min_profit.raw {
            true
        } else if price1.raw > price2.raw + self.min_profit.raw {
            false
        } else {
            return false;
        };

        let now = engine.now_ns();
        let qty = self.parent_order.quantity;

        let (buy_leg, sell_leg) = if buy_on_market1 {
            let buy = self.parent_order.child(qty, price1, true, now);
            let sell = OrderBuilder::new(self.market2.market.clone(), false, qty, now)
                .outcome_yes(true)
                .price(price2)
                .backend(self.market2.backend.clone())
                .build();
            (buy, sell)
        } else {
            let sell = self.parent_order.child(qty, price1, false, now);
            let buy = OrderBuilder::new(self.market2.market.clone(), true, qty, now)
                .outcome_yes(true)
                .price(price2)
                .backend(self.market2.backend.clone())
                .build();
            (sell, buy)
        };

        match sell_leg {
            Ok(other_leg) => {
                engine.dispatch(buy_leg).await;
                engine.dispatch(other_leg).await;
                self.done = true;
            }
            Err(err) => {
                warn!(%err, "arbitrage second leg rejected at construction");
            }
        }

        self.done
    }
}
