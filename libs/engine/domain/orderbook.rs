//! Sorted bid/ask price ladders.
//!
//! Adapted from the teacher's `domain/orderbook.rs` (sorted `Vec` +
//! binary-search idiom, snapshot/update split) onto this crate's fixed-point
//! `Price` type and the two-sided `{bids, asks}` shape `spec.md` §3 requires,
//! instead of the teacher's string-price-level/single-side-update wire shape.

use super::price::Price;

/// One side of the book. Bids sort descending (best first), asks ascending.
#[derive(Debug, Clone)]
pub struct OrderBookSide {
    levels: Vec<(Price, i64)>,
    is_bid: bool,
}

impl OrderBookSide {
    pub fn new(is_bid: bool) -> Self {
        Self { levels: Vec::with_capacity(64), is_bid }
    }

    pub fn process_snapshot(&mut self, levels: &[(Price, i64)]) {
        self.levels.clear();
        self.levels.extend(levels.iter().copied().filter(|(_, size)| *size > 0));
        if self.is_bid {
            self.levels.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        } else {
            self.levels.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }
    }

    /// `size == 0` removes the level.
    pub fn process_update(&mut self, price: Price, size: i64) {
        let search = self.levels.binary_search_by(|(p, _)| {
            if self.is_bid {
                p.cmp(&price).reverse()
            } else {
                p.cmp(&price)
            }
        });

        match search {
            Ok(idx) => {
                if size == 0 {
                    self.levels.remove(idx);
                } else {
                    self.levels[idx].1 = size;
                }
            }
            Err(idx) => {
                if size > 0 {
                    self.levels.insert(idx, (price, size));
                }
            }
        }
    }

    pub fn best(&self) -> Option<(Price, i64)> {
        self.levels.first().copied()
    }

    pub fn levels(&self) -> &[(Price, i64)] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn total_size(&self) -> i64 {
        self.levels.iter().map(|(_, s)| s).sum()
    }
}

/// Complete two-sided book for one market.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub bids: OrderBookSide,
    pub asks: OrderBookSide,
}

impl OrderBook {
    pub fn new() -> Self {
        Self { bids: OrderBookSide::new(true), asks: OrderBookSide::new(false) }
    }

    pub fn apply_snapshot(&mut self, bids: &[(Price, i64)], asks: &[(Price, i64)]) {
        self.bids.process_snapshot(bids);
        self.asks.process_snapshot(asks);
    }

    pub fn apply_update(&mut self, is_bid: bool, price: Price, size: i64) {
        if is_bid {
            self.bids.process_update(price, size);
        } else {
            self.asks.process_update(price, size);
        }
    }

    pub fn best_bid(&self) -> Option<(Price, i64)> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<(Price, i64)> {
        self.asks.best()
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(Price::new((bid.raw + ask.raw) / 2)),
            _ => None,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(cents: i64) -> Price {
        Price::from_cents(cents)
    }

    #[test]
    fn snapshot_sorts_and_drops_zero_size() {
        let mut bids = OrderBookSide::new(true);
        bids.process_snapshot(&[(p(70), 100), (p(75), 200), (p(72), 0)]);
        assert_eq!(bids.levels().len(), 2);
        assert_eq!(bids.best(), Some((p(75), 200)));
    }

    #[test]
    fn update_adds_modifies_and_removes_levels() {
        let mut bids = OrderBookSide::new(true);
        bids.process_snapshot(&[(p(75), 200), (p(74), 150)]);

        bids.process_update(p(75), 300);
        assert_eq!(bids.best(), Some((p(75), 300)));

        bids.process_update(p(76), 100);
        assert_eq!(bids.best(), Some((p(76), 100)));

        bids.process_update(p(76), 0);
        assert_eq!(bids.best(), Some((p(75), 300)));
    }

    #[test]
    fn spread_and_mid() {
        let mut ob = OrderBook::new();
        ob.apply_snapshot(&[(p(74), 100), (p(73), 200)], &[(p(76), 100), (p(77), 200)]);
        assert_eq!(ob.best_bid(), Some((p(74), 100)));
        assert_eq!(ob.best_ask(), Some((p(76), 100)));
        assert_eq!(ob.spread(), Some(p(2)));
        assert_eq!(ob.mid_price(), Some(p(75)));
    }

    #[test]
    fn apply_update_routes_by_side() {
        let mut ob = OrderBook::new();
        ob.apply_snapshot(&[(p(74), 100)], &[(p(76), 100)]);
        ob.apply_update(true, p(75), 200);
        assert_eq!(ob.best_bid(), Some((p(75), 200)));
        ob.apply_update(false, p(75), 150);
        assert_eq!(ob.best_ask(), Some((p(75), 150)));
    }

    #[test]
    fn snapshot_then_zero_delta_removes_level() {
        let mut ob = OrderBook::new();
        ob.apply_snapshot(&[(p(74), 100)], &[]);
        ob.apply_update(true, p(74), 0);
        assert!(ob.bids.is_empty());
    }
}
