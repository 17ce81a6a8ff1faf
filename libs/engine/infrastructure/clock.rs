//! Clock injection (`spec.md` §9): algorithms read time only through this
//! capability so live and backtest share identical algorithm code.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now_ns(&self) -> i64;
}

#[derive(Default)]
pub struct LiveClock;

impl Clock for LiveClock {
    fn now_ns(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as i64
    }
}

/// A settable virtual clock driven by tape replay.
pub struct BacktestClock {
    current_ns: AtomicI64,
}

impl BacktestClock {
    pub fn new() -> Self {
        Self { current_ns: AtomicI64::new(0) }
    }

    pub fn set_current_time_ns(&self, ns: i64) {
        self.current_ns.store(ns, Ordering::Release);
    }
}

impl Clock for BacktestClock {
    fn now_ns(&self) -> i64 {
        self.current_ns.load(Ordering::Acquire)
    }
}

impl Default for BacktestClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_clock_is_settable() {
        let clock = BacktestClock::new();
        assert_eq!(clock.now_ns(), 0);
        clock.set_current_time_ns(12345);
        assert_eq!(clock.now_ns(), 12345);
    }

    #[test]
    fn live_clock_advances() {
        let clock = LiveClock;
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }
}
