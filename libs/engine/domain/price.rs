//! Fixed-point price scalar.
//!
//! Binary prediction markets quote in `[0, 1]`; we store that as a signed
//! 64-bit integer with an implicit scale of 1,000,000 so arithmetic and
//! comparisons stay exact instead of drifting through floats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price {
    pub raw: i64,
}

impl Price {
    pub const SCALE: i64 = 1_000_000;

    pub const fn new(raw: i64) -> Self {
        Self { raw }
    }

    pub const fn zero() -> Self {
        Self { raw: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Rounds to nearest, ties away from zero — matches the reference
    /// implementation's `(int64_t)(d*SCALE + (d>=0?0.5:-0.5))`.
    pub fn from_double(d: f64) -> Self {
        let scaled = d * Self::SCALE as f64;
        let rounded = if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        Self { raw: rounded as i64 }
    }

    pub fn to_double(&self) -> f64 {
        self.raw as f64 / Self::SCALE as f64
    }

    pub fn from_usd(usd: f64) -> Self {
        Self::from_double(usd)
    }

    /// `raw = cents * 10_000` (cents are hundredths of a unit; scale is
    /// millionths, so one cent is `SCALE / 100`).
    pub fn from_cents(cents: i64) -> Self {
        Self::from_ticks(cents, 100)
    }

    pub fn to_cents(&self) -> i64 {
        self.to_ticks(100)
    }

    pub fn from_ticks(ticks: i64, ticks_per_unit: i64) -> Self {
        Self { raw: ticks * (Self::SCALE / ticks_per_unit) }
    }

    pub fn to_ticks(&self, ticks_per_unit: i64) -> i64 {
        self.raw / (Self::SCALE / ticks_per_unit)
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, rhs: Price) -> Price {
        Price { raw: self.raw + rhs.raw }
    }
}

impl Sub for Price {
    type Output = Price;
    fn sub(self, rhs: Price) -> Price {
        Price { raw: self.raw - rhs.raw }
    }
}

impl Neg for Price {
    type Output = Price;
    fn neg(self) -> Price {
        Price { raw: -self.raw }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_double())
    }
}
