//! Price feed handle for collateral and reward assets.
//!
//! The engine consumes feeds, it never produces prices: an external
//! operator (or a test) pushes updates in. A feed distinguishes three
//! failure shapes with different protocol consequences:
//!
//! - stale or zero prices downgrade the collateral toward default
//! - a transient `unavailable` failure leaves status untouched, so a
//!   flaky oracle cannot cause a false default

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::DEFAULT_MAX_PRICE_AGE_SECS;
use crate::utils::math::Fix;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// A manually driven price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
    /// Symbol the feed reports on, for error messages
    symbol: String,
    /// Last reported price in reference units
    price: Fix,
    /// Timestamp of the last update
    updated_at: u64,
    /// Maximum age before the price counts as stale, in seconds
    max_age_secs: u64,
    /// Transient failure flag: reads error without affecting status
    unavailable: bool,
}

impl PriceFeed {
    /// Create a feed with an initial price observation
    pub fn new(symbol: impl Into<String>, price: Fix, now: u64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            updated_at: now,
            max_age_secs: DEFAULT_MAX_PRICE_AGE_SECS,
            unavailable: false,
        }
    }

    /// Override the staleness window
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Push a new price observation
    pub fn set_price(&mut self, price: Fix, now: u64) {
        self.price = price;
        self.updated_at = now;
    }

    /// Toggle the transient failure mode
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Timestamp of the last update
    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// Read the current price. Errors if the feed is transiently failing,
    /// the last observation is older than the staleness window, or the
    /// reported price is zero.
    pub fn price(&self, now: u64) -> Result<Fix> {
        if self.unavailable {
            return Err(Error::FeedUnavailable(self.symbol.clone()));
        }
        let age = now.saturating_sub(self.updated_at);
        if age > self.max_age_secs {
            return Err(Error::StalePrice {
                last_update: age,
                max_age: self.max_age_secs,
            });
        }
        if self.price.is_zero() {
            return Err(Error::ZeroPrice(self.symbol.clone()));
        }
        Ok(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_price() {
        let feed = PriceFeed::new("USDC", Fix::ONE, 100);
        assert_eq!(feed.price(100).unwrap(), Fix::ONE);
    }

    #[test]
    fn test_stale_price() {
        let feed = PriceFeed::new("USDC", Fix::ONE, 100).with_max_age(60);
        assert!(feed.price(160).is_ok());
        assert!(matches!(feed.price(161), Err(Error::StalePrice { .. })));
    }

    #[test]
    fn test_zero_price() {
        let feed = PriceFeed::new("USDC", Fix::ZERO, 100);
        assert_eq!(feed.price(100), Err(Error::ZeroPrice("USDC".into())));
    }

    #[test]
    fn test_unavailable_takes_precedence() {
        let mut feed = PriceFeed::new("USDC", Fix::ONE, 100);
        feed.set_unavailable(true);
        assert_eq!(feed.price(100), Err(Error::FeedUnavailable("USDC".into())));
        feed.set_unavailable(false);
        assert!(feed.price(100).is_ok());
    }

    #[test]
    fn test_update_refreshes_staleness() {
        let mut feed = PriceFeed::new("USDC", Fix::ONE, 0).with_max_age(60);
        assert!(feed.price(100).is_err());
        feed.set_price(Fix::ONE, 100);
        assert_eq!(feed.updated_at(), 100);
        assert!(feed.price(100).is_ok());
    }
}
