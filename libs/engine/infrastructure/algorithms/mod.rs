//! The six algorithm variants as a closed sum type (`spec.md` §4.6), not a
//! trait-object hierarchy — the original source's `Algo` base class is
//! collapsed into one enum since there are exactly six shapes and none of
//! them need open extension. Grounded on `core/algo.cpp`'s six `tick_impl`
//! bodies; `MarketMaker`/`Arbitrage` are wired into the factory here, fixing
//! the omission in the original source's `AlgoManager::submit` (see
//! SPEC_FULL.md §9).

mod arbitrage;
mod market_maker;
mod peg;
mod trailing_stop;
mod twap;
mod vwap;

pub use arbitrage::ArbitrageAlgo;
pub use market_maker::MarketMakerAlgo;
pub use peg::PegAlgo;
pub use trailing_stop::TrailingStopAlgo;
pub use twap::TwapAlgo;
pub use vwap::VwapAlgo;

use crate::domain::order::{AlgoParams, AlgoType, Order};
use crate::infrastructure::engine::ExecutionEngine;

pub enum Algorithm {
    Twap(TwapAlgo),
    Vwap(VwapAlgo),
    Peg(PegAlgo),
    Trailing(TrailingStopAlgo),
    MarketMaker(MarketMakerAlgo),
    Arbitrage(ArbitrageAlgo),
}

impl Algorithm {
    /// `None` for `AlgoType::None` orders (those never reach the scheduler)
    /// or if `algo_params` doesn't match `algo_type` (a construction bug
    /// upstream, not a runtime condition the scheduler should paper over).
    pub fn from_order(order: Order, now_ns: i64) -> Option<Algorithm> {
        match (order.algo_type, order.algo_params.clone()) {
            (AlgoType::Twap, AlgoParams::Twap { duration_sec }) => {
                Some(Algorithm::Twap(TwapAlgo::new(order, duration_sec, now_ns)))
            }
            (AlgoType::Vwap, AlgoParams::Vwap { participation_rate }) => {
                Some(Algorithm::Vwap(VwapAlgo::new(order, participation_rate)))
            }
            (AlgoType::Peg, AlgoParams::Peg { reference, offset }) => {
                Some(Algorithm::Peg(PegAlgo::new(order, reference, offset)))
            }
            (AlgoType::Trailing, AlgoParams::Trailing { trail_amount }) => {
                Some(Algorithm::Trailing(TrailingStopAlgo::new(order, trail_amount)))
            }
            (AlgoType::MarketMaker, AlgoParams::MarketMaker { spread, reference }) => {
                Some(Algorithm::MarketMaker(MarketMakerAlgo::new(order, spread, reference)))
            }
            (AlgoType::Arbitrage, AlgoParams::Arbitrage { market2, min_profit }) => {
                Some(Algorithm::Arbitrage(ArbitrageAlgo::new(order, market2, min_profit)))
            }
            _ => None,
        }
    }

    /// Returns `true` once this algorithm is done and should be dropped.
    pub async fn tick(&mut self, engine: &ExecutionEngine) -> bool {
        match self {
            Algorithm::Twap(a) => a.tick(engine).await,
            Algorithm::Vwap(a) => a.tick(engine).await,
            Algorithm::Peg(a) => a.tick(engine).await,
            Algorithm::Trailing(a) => a.tick(engine).await,
            Algorithm::MarketMaker(a) => a.tick(engine).await,
            Algorithm::Arbitrage(a) => a.tick(engine).await,
        }
    }

    pub fn market_hash(&self) -> u32 {
        match self {
            Algorithm::Twap(a) => a.parent_order.market.hash,
            Algorithm::Vwap(a) => a.parent_order.market.hash,
            Algorithm::Peg(a) => a.parent_order.market.hash,
            Algorithm::Trailing(a) => a.parent_order.market.hash,
            Algorithm::MarketMaker(a) => a.parent_order.market.hash,
            Algorithm::Arbitrage(a) => a.parent_order.market.hash,
        }
    }
}
