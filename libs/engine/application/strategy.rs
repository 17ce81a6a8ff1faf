//! The contract strategies built on top of algorithms implement.
//!
//! Grounded on `core/algo_manager.hpp`'s `ExecutionStrategy`/`EventStrategy`
//! for the shape (a tick contract plus event hooks); the teacher's
//! `application/strategies/traits.rs::Strategy` only lends naming and error
//! conventions here, not the trait shape, since `spec.md` §4.7 calls for a
//! synchronous-per-tick contract rather than the teacher's async daemon
//! lifecycle (`run`/`shutdown`).

use crate::infrastructure::engine::ExecutionEngine;
use async_trait::async_trait;

/// One user-defined strategy, ticked alongside algorithms by the scheduler.
/// Returning `true` from `tick` retires it, same as an `Algorithm`.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    async fn tick(&mut self, engine: &ExecutionEngine) -> bool;

    /// Fired when the engine observes a market data update. Default: no-op.
    async fn on_market_event(&mut self, _engine: &ExecutionEngine, _market_hash: u32) {}

    /// Fired when a tracked order transitions status. Default: no-op.
    async fn on_execution_event(&mut self, _engine: &ExecutionEngine, _order_id: &str) {}
}

/// A `Strategy` built purely from event hooks, with no periodic work — its
/// `tick` always returns `false` and both hooks are supplied by the caller
/// as boxed closures, matching `spec.md` §4.7's "event-only" strategy shape.
pub struct EventStrategy {
    name: String,
    on_market_event: Box<dyn FnMut(&ExecutionEngine, u32) + Send + Sync>,
    on_execution_event: Box<dyn FnMut(&ExecutionEngine, &str) + Send + Sync>,
}

impl EventStrategy {
    pub fn new(
        name: impl Into<String>,
        on_market_event: impl FnMut(&ExecutionEngine, u32) + Send + Sync + 'static,
        on_execution_event: impl FnMut(&ExecutionEngine, &str) + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), on_market_event: Box::new(on_market_event), on_execution_event: Box::new(on_execution_event) }
    }
}

#[async_trait]
impl Strategy for EventStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tick(&mut self, _engine: &ExecutionEngine) -> bool {
        false
    }

    async fn on_market_event(&mut self, engine: &ExecutionEngine, market_hash: u32) {
        (self.on_market_event)(engine, market_hash);
    }

    async fn on_execution_event(&mut self, engine: &ExecutionEngine, order_id: &str) {
        (self.on_execution_event)(engine, order_id);
    }
}
