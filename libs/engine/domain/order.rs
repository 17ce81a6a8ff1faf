//! Immutable order record and its construction-time validation.
//!
//! The expression-template grammar the original source builds orders with is
//! out of scope (`spec.md` §1); any construction style works as long as the
//! result is an immutable `Order`. `OrderBuilder` plays that role here and
//! carries over the grammar's embedded validation rules (`core/core.hpp`'s
//! `Buy`/`Sell` quantity check, `core/modifiers.hpp`'s Iceberg/VWAP/bracket
//! checks) since those are genuine invariants, not grammar mechanics.

use super::market::MarketId;
use super::price::Price;
use std::sync::Arc;
use thiserror::Error;

use crate::infrastructure::backend::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tif {
    Gtc,
    Ioc,
    Fok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stp {
    None,
    CancelNew,
    CancelOld,
    CancelBoth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgoType {
    None,
    Peg,
    Twap,
    Vwap,
    Trailing,
    Arbitrage,
    MarketMaker,
}

/// Tagged union of per-algorithm parameters. Only the variant matching
/// `algo_type` is meaningful; `None` orders carry `AlgoParams::None`.
#[derive(Debug, Clone)]
pub enum AlgoParams {
    None,
    Twap { duration_sec: i64 },
    Vwap { participation_rate: f64 },
    Trailing { trail_amount: Price },
    Peg { reference: PegReference, offset: Price },
    MarketMaker { spread: Price, reference: PegReference },
    Arbitrage { market2: MarketId2Ref, min_profit: Price },
}

/// `Arbitrage`'s second leg: a market/backend pair distinct from the parent
/// order's own `market`/`backend`. Kept as a small copy-friendly handle
/// (the `MarketId` itself plus the backend it trades on) rather than
/// embedding inside `AlgoParams` directly, since `MarketId` owns a `String`.
#[derive(Debug, Clone)]
pub struct MarketId2Ref {
    pub market: MarketId,
    pub backend: Arc<dyn Backend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegReference {
    Bid,
    Ask,
    Mid,
}

/// One desired trading action. Created by `OrderBuilder::build()` and
/// thereafter immutable.
#[derive(Clone)]
pub struct Order {
    pub market: MarketId,
    pub market2: Option<MarketId>,
    pub quantity: i32,
    pub is_buy: bool,
    pub outcome_yes: bool,
    pub price: Price,
    pub tif: Tif,
    pub post_only: bool,
    pub display_qty: i32,
    pub tp_price: Option<Price>,
    pub sl_price: Option<Price>,
    pub account_hash: u32,
    pub stp: Stp,
    pub creation_timestamp_ns: i64,
    pub algo_type: AlgoType,
    pub algo_params: AlgoParams,
    pub backend: Option<Arc<dyn Backend>>,
    pub is_spread: bool,
}

impl Order {
    /// A fresh order carrying the same market/outcome/backend as `self`,
    /// with `algo_type` reset to `None` — what every algorithm's dispatched
    /// child order derives from its `parent_order`.
    pub fn child(&self, quantity: i32, price: Price, is_buy: bool, now_ns: i64) -> Order {
        Order {
            market: self.market.clone(),
            market2: None,
            quantity,
            is_buy,
            outcome_yes: self.outcome_yes,
            price,
            tif: self.tif,
            post_only: false,
            display_qty: 0,
            tp_price: None,
            sl_price: None,
            account_hash: self.account_hash,
            stp: self.stp,
            creation_timestamp_ns: now_ns,
            algo_type: AlgoType::None,
            algo_params: AlgoParams::None,
            backend: self.backend.clone(),
            is_spread: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderBuildError {
    #[error("quantity must be > 0, got {0}")]
    InvalidQuantity(i32),
    #[error("iceberg display_qty must be > 0, got {0}")]
    InvalidDisplayQty(i32),
    #[error("VWAP participation rate must be in (0, 1], got {0}")]
    InvalidParticipationRate(f64),
    #[error("TWAP duration_sec must be > 0, got {0}")]
    InvalidDuration(i64),
    #[error("bracket price must be >= 0")]
    InvalidBracketPrice,
}

/// Fluent builder standing in for the out-of-scope grammar. `build()` is the
/// single validation gate: orders that fail construction never reach the
/// engine (`spec.md` §7, "Invalid Construction").
pub struct OrderBuilder {
    market: MarketId,
    market2: Option<MarketId>,
    quantity: i32,
    is_buy: bool,
    outcome_yes: bool,
    price: Price,
    tif: Tif,
    post_only: bool,
    display_qty: i32,
    iceberg_requested: bool,
    tp_price: Option<Price>,
    sl_price: Option<Price>,
    account_hash: u32,
    stp: Stp,
    creation_timestamp_ns: i64,
    algo_type: AlgoType,
    algo_params: AlgoParams,
    backend: Option<Arc<dyn Backend>>,
    is_spread: bool,
}

impl OrderBuilder {
    pub fn new(market: MarketId, is_buy: bool, quantity: i32, now_ns: i64) -> Self {
        Self {
            market,
            market2: None,
            quantity,
            is_buy,
            outcome_yes: true,
            price: Price::zero(),
            tif: Tif::Gtc,
            post_only: false,
            display_qty: 0,
            iceberg_requested: false,
            tp_price: None,
            sl_price: None,
            account_hash: 0,
            stp: Stp::None,
            creation_timestamp_ns: now_ns,
            algo_type: AlgoType::None,
            algo_params: AlgoParams::None,
            backend: None,
            is_spread: false,
        }
    }

    pub fn outcome_yes(mut self, yes: bool) -> Self {
        self.outcome_yes = yes;
        self
    }

    pub fn price(mut self, price: Price) -> Self {
        self.price = price;
        self
    }

    pub fn tif(mut self, tif: Tif) -> Self {
        self.tif = tif;
        self
    }

    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    pub fn iceberg(mut self, display_qty: i32) -> Self {
        self.display_qty = display_qty;
        self.iceberg_requested = true;
        self
    }

    pub fn bracket(mut self, tp_price: Option<Price>, sl_price: Option<Price>) -> Self {
        self.tp_price = tp_price;
        self.sl_price = sl_price;
        self
    }

    pub fn account_hash(mut self, account_hash: u32) -> Self {
        self.account_hash = account_hash;
        self
    }

    pub fn stp(mut self, stp: Stp) -> Self {
        self.stp = stp;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn twap(mut self, duration_sec: i64) -> Self {
        self.algo_type = AlgoType::Twap;
        self.algo_params = AlgoParams::Twap { duration_sec };
        self
    }

    pub fn vwap(mut self, participation_rate: f64) -> Self {
        self.algo_type = AlgoType::Vwap;
        self.algo_params = AlgoParams::Vwap { participation_rate };
        self
    }

    pub fn trailing_stop(mut self, trail_amount: Price) -> Self {
        self.algo_type = AlgoType::Trailing;
        self.algo_params = AlgoParams::Trailing { trail_amount };
        self
    }

    pub fn peg(mut self, reference: PegReference, offset: Price) -> Self {
        self.algo_type = AlgoType::Peg;
        self.algo_params = AlgoParams::Peg { reference, offset };
        self
    }

    pub fn market_maker(mut self, spread: Price, reference: PegReference) -> Self {
        self.algo_type = AlgoType::MarketMaker;
        self.algo_params = AlgoParams::MarketMaker { spread, reference };
        self
    }

    pub fn arbitrage(mut self, market2: MarketId, backend2: Arc<dyn Backend>, min_profit: Price) -> Self {
        self.algo_type = AlgoType::Arbitrage;
        self.algo_params = AlgoParams::Arbitrage {
            market2: MarketId2Ref { market: market2, backend: backend2 },
            min_profit,
        };
        self.is_spread = true;
        self
    }

    pub fn build(self) -> Result<Order, OrderBuildError> {
        if self.quantity <= 0 {
            return Err(OrderBuildError::InvalidQuantity(self.quantity));
        }
        if self.display_qty < 0 || (self.iceberg_requested && self.display_qty <= 0) {
            return Err(OrderBuildError::InvalidDisplayQty(self.display_qty));
        }
        if let Some(p) = self.tp_price {
            if p.raw < 0 {
                return Err(OrderBuildError::InvalidBracketPrice);
            }
        }
        if let Some(p) = self.sl_price {
            if p.raw < 0 {
                return Err(OrderBuildError::InvalidBracketPrice);
            }
        }
        match &self.algo_params {
            AlgoParams::Twap { duration_sec } if *duration_sec <= 0 => {
                return Err(OrderBuildError::InvalidDuration(*duration_sec));
            }
            AlgoParams::Vwap { participation_rate } if !(0.0 < *participation_rate && *participation_rate <= 1.0) => {
                return Err(OrderBuildError::InvalidParticipationRate(*participation_rate));
            }
            _ => {}
        }

        Ok(Order {
            market: self.market,
            market2: self.market2,
            quantity: self.quantity,
            is_buy: self.is_buy,
            outcome_yes: self.outcome_yes,
            price: self.price,
            tif: self.tif,
            post_only: self.post_only,
            display_qty: self.display_qty,
            tp_price: self.tp_price,
            sl_price: self.sl_price,
            account_hash: self.account_hash,
            stp: self.stp,
            creation_timestamp_ns: self.creation_timestamp_ns,
            algo_type: self.algo_type,
            algo_params: self.algo_params,
            backend: self.backend,
            is_spread: self.is_spread,
        })
    }
}
