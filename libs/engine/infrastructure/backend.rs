//! The seam every venue implements against. Grounded on
//! `core/market_base.hpp`'s minimal `MarketBackend` (`name`, `get_price`,
//! `get_depth`), extended to the full surface `spec.md` §6 requires.
//!
//! Concrete venues (HTTP/WebSocket clients, auth signers) are out of scope —
//! only `BacktestMarketBackend` ships with this crate.

use crate::domain::market::MarketId;
use crate::domain::order::Order;
use crate::domain::price::Price;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("venue request failed: {0}")]
    Request(String),
}

/// Venue id/error sentinel the engine inspects instead of escalating to a
/// `Result::Err` — `create_order` returning `""` or `"error"` means
/// "venue-rejected order" per `spec.md` §7, not a transport failure.
pub const REJECTED_ORDER_ID: &str = "error";

#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// `0` if unknown.
    async fn get_price(&self, market: &MarketId, outcome_yes: bool) -> Price;

    async fn get_depth(&self, market: &MarketId, is_bid: bool) -> Price;

    /// Volume at a market, used by VWAP. Default: unimplemented venues
    /// report zero, which VWAP treats as "no observation yet".
    async fn get_volume(&self, _market: &MarketId) -> i64 {
        0
    }

    async fn get_balance(&self) -> Price;

    /// JSON string; see `spec.md` §6 for the three accepted position
    /// shapes the live sync loop tolerates.
    async fn get_positions(&self) -> String;

    /// Returns the venue order id, or `""`/`"error"` on rejection.
    async fn create_order(&self, order: &Order) -> String;

    async fn cancel_order(&self, id: &str) -> bool;

    async fn create_batch(&self, orders: &[Order]) -> Vec<String>;
}
