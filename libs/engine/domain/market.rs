//! Content-addressed market handle.

use serde::{Deserialize, Serialize};
use std::fmt;

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// FNV-1a over the bytes of `s`.
pub fn fnv1a(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A market handle: an FNV-1a hash of the ticker plus the original string
/// for display/lookup. Equality and hashing use `hash` only — tickers are
/// assumed collision-free within a process, per spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketId {
    pub hash: u32,
    pub ticker: String,
    /// True once a venue-specific token id has replaced the human ticker.
    pub resolved: bool,
}

impl MarketId {
    pub fn new(ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        Self { hash: fnv1a(&ticker), ticker, resolved: false }
    }

    pub fn resolve(&mut self, venue_token: impl Into<String>) {
        self.ticker = venue_token.into();
        self.hash = fnv1a(&self.ticker);
        self.resolved = true;
    }
}

impl PartialEq for MarketId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for MarketId {}

impl std::hash::Hash for MarketId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:08x}", self.ticker, self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_vectors() {
        // Empty string hashes to the offset basis.
        assert_eq!(fnv1a(""), FNV_OFFSET_BASIS);
        // Known FNV-1a(32) vector for "a".
        assert_eq!(fnv1a("a"), 0xe40c292c);
    }

    #[test]
    fn equality_is_hash_only() {
        let a = MarketId::new("AAPL-UP");
        let b = MarketId::new("AAPL-UP");
        assert_eq!(a, b);
        assert_eq!(a.hash, fnv1a("AAPL-UP"));
    }

    #[test]
    fn resolve_flips_flag_and_rehashes() {
        let mut m = MarketId::new("AAPL-UP");
        assert!(!m.resolved);
        let before = m.hash;
        m.resolve("0xdeadbeef");
        assert!(m.resolved);
        assert_ne!(m.hash, before);
        assert_eq!(m.ticker, "0xdeadbeef");
    }
}
