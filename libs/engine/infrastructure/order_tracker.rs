//! Authoritative store of live orders, fills, and status transitions.
//!
//! Grounded on `core/order_tracker.hpp` for exact semantics (the `""`/`"error"`
//! id sentinel, status promotion rules) and on the teacher's
//! `infrastructure/order_manager.rs` for the Rust shape: a `Mutex`-guarded
//! map wrapped in a small service type, tested with a `make_*` test helper.

use crate::domain::order::Order;
use crate::domain::price::Price;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }
}

#[derive(Clone)]
pub struct OrderRecord {
    pub id: String,
    pub order: Order,
    pub status: OrderStatus,
    pub filled_qty: i32,
    pub avg_fill_price: Price,
    pub fills: Vec<(i32, Price, i64)>,
    /// Running `Σ qty·price.raw` in raw price units, so repeated fills only
    /// round once at read time instead of compounding a rounding error per
    /// fill (see SPEC_FULL.md §9's `avg_fill_price` resolution).
    cost_raw: i128,
}

pub struct OrderTracker {
    records: Mutex<HashMap<String, OrderRecord>>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self { records: Mutex::new(HashMap::new()) }
    }

    /// Ignores `id` that is empty or literally `"error"` — the venue
    /// failure sentinel; no record is created.
    pub fn track(&self, id: &str, order: Order) {
        if id.is_empty() || id == "error" {
            warn!(id, "not tracking order: venue rejection sentinel");
            return;
        }
        let mut records = self.records.lock();
        records.insert(
            id.to_string(),
            OrderRecord {
                id: id.to_string(),
                order,
                status: OrderStatus::Open,
                filled_qty: 0,
                avg_fill_price: Price::zero(),
                fills: Vec::new(),
                cost_raw: 0,
            },
        );
    }

    /// No-op once the record is already in a terminal status (invariant 4:
    /// terminal statuses absorb — a `Filled`/`Cancelled` order never flips).
    pub fn update_status(&self, id: &str, status: OrderStatus) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(id) {
            if !record.status.is_terminal() {
                record.status = status;
            }
        }
    }

    pub fn add_fill(&self, id: &str, qty: i32, price: Price, ts_ns: i64) {
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(id) else {
            debug!(id, "add_fill on unknown order id");
            return;
        };

        record.cost_raw += price.raw as i128 * qty as i128;
        record.filled_qty += qty;
        record.fills.push((qty, price, ts_ns));

        if record.filled_qty > 0 {
            let avg_raw = record.cost_raw / record.filled_qty as i128;
            record.avg_fill_price = Price::new(avg_raw as i64);
        }

        record.status = if record.filled_qty >= record.order.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    pub fn count_open(&self, market_hash: u32) -> usize {
        let records = self.records.lock();
        records
            .values()
            .filter(|r| r.order.market.hash == market_hash)
            .filter(|r| {
                matches!(r.status, OrderStatus::Pending | OrderStatus::Open | OrderStatus::PartiallyFilled)
            })
            .count()
    }

    pub fn get(&self, id: &str) -> Option<OrderRecord> {
        self.records.lock().get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<OrderRecord> {
        self.records.lock().values().cloned().collect()
    }
}

impl Default for OrderTracker {
    fn default() -> Self {
        Self::new()
    }
}
