//! Time-weighted average price: slices `parent_order.quantity` linearly over
//! `duration_sec`, re-slicing toward the linear target at most once every
//! 5 s so a 100 ms tick loop doesn't dump one tiny child order per tick. The
//! final catch-up slice, once `duration_sec` has elapsed, bypasses the
//! throttle so the full quantity is always delivered by the deadline.
//!
//! Grounded on `core/algo.cpp`'s `TwapAlgo::tick_impl` (linear schedule,
//! catch-up slicing rather than fixed-size clips, `last_slice_time_ns == 0
//! || now - last > 5e9` interval gate).

use crate::domain::order::Order;
use crate::infrastructure::engine::ExecutionEngine;

const SLICE_THROTTLE_NS: i64 = 5_000_000_000;

pub struct TwapAlgo {
    pub(super) parent_order: Order,
    duration_sec: i64,
    start_ns: i64,
    sent_qty: i32,
    last_slice_ns: i64,
}

impl TwapAlgo {
    pub fn new(parent_order: Order, duration_sec: i64, now_ns: i64) -> Self {
        Self { parent_order, duration_sec, start_ns: now_ns, sent_qty: 0, last_slice_ns: 0 }
    }

    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        let total_qty = self.parent_order.quantity;
        if self.sent_qty >= total_qty {
            return true;
        }

        let now = engine.now_ns();
        let elapsed_ns = (now - self.start_ns).max(0) as i128;
        let duration_ns = (self.duration_sec.max(1) as i128) * 1_000_000_000;
        let catch_up = elapsed_ns >= duration_ns;
        let interval_passed = self.last_slice_ns == 0 || now - self.last_slice_ns > SLICE_THROTTLE_NS;

        if catch_up || interval_passed {
            let target_qty = if catch_up {
                total_qty
            } else {
                ((total_qty as i128 * elapsed_ns) / duration_ns) as i32
            };

            let slice_qty = (target_qty - self.sent_qty).clamp(0, total_qty - self.sent_qty);
            if slice_qty > 0 {
                let price = engine.get_price(&self.parent_order.market, self.parent_order.outcome_yes).await;
                let child = self.parent_order.child(slice_qty, price, self.parent_order.is_buy, now);
                engine.dispatch(child).await;
                self.sent_qty += slice_qty;
                self.last_slice_ns = now;
            }
        }

        self.sent_qty >= total_qty || catch_up
    }
}
