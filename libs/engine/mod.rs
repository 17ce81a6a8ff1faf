//! Order execution and strategy engine for binary prediction markets.
//!
//! Clean-architecture layering: `domain` (pure types, no I/O),
//! `infrastructure` (tracker, scheduler, algorithms, the engines, backend
//! trait), `application` (the `Strategy` contract consumers build on top of
//! algorithms).

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::market::MarketId;
pub use domain::order::{AlgoParams, AlgoType, Order, OrderBuildError, OrderBuilder, Side, Stp, Tif};
pub use domain::orderbook::OrderBook;
pub use domain::price::Price;

pub use infrastructure::backend::{Backend, BackendError};
pub use infrastructure::backtest::{BacktestEngine, BacktestMarketBackend, LatencyModel, SlippageModel};
pub use infrastructure::clock::{BacktestClock, Clock, LiveClock};
pub use infrastructure::engine::ExecutionEngine;
pub use infrastructure::live_engine::LiveExecutionEngine;
pub use infrastructure::logging::{init_tracing, init_tracing_with_level};
pub use infrastructure::order_tracker::{OrderRecord, OrderStatus, OrderTracker};
pub use infrastructure::scheduler::AlgoScheduler;
pub use infrastructure::shutdown::ShutdownManager;

pub use application::strategy::{EventStrategy, Strategy};
pub use config::{ConfigError, EngineConfig};
