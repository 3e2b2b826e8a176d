//! The furnace: batched, linear melting of issued-token revenue.
//!
//! Issued-token revenue routed here is not burned at once. Each deposit opens
//! a batch that releases linearly over the melting period; `melt` collects
//! every batch's newly vested portion and reports the total for the caller to
//! burn from the furnace's balance. Burning supply without reducing the
//! baskets-needed figure raises per-token backing for all holders.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// MELTING BATCHES
// ═══════════════════════════════════════════════════════════════════════════════

/// One deposit vesting linearly from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltingBatch {
    /// Total amount in the batch
    pub amount: Fix,
    /// Vesting start timestamp
    pub start: u64,
    /// Vesting end timestamp
    pub end: u64,
    /// Portion already melted
    pub melted: Fix,
}

impl MeltingBatch {
    /// Vested-but-unmelted portion at `now`
    fn releasable(&self, now: u64) -> Result<Fix> {
        let vested = if now >= self.end {
            self.amount
        } else if now <= self.start {
            Fix::ZERO
        } else {
            let elapsed = Fix::from_integer(now - self.start);
            let duration = Fix::from_integer(self.end - self.start);
            self.amount.mul_div(elapsed, duration, Rounding::Floor)?
        };
        Ok(vested.saturating_sub(self.melted))
    }
}

/// Accumulates deposits and melts them over time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Furnace {
    batches: Vec<MeltingBatch>,
    period_secs: u64,
}

impl Furnace {
    /// Create a furnace with the given melting period
    pub fn new(period_secs: u64) -> Self {
        Self { batches: Vec::new(), period_secs }
    }

    /// Melting period in seconds
    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }

    /// Update the melting period. Applies to batches opened afterwards.
    pub fn set_period(&mut self, period_secs: u64) {
        self.period_secs = period_secs;
    }

    /// Live batches
    pub fn batches(&self) -> &[MeltingBatch] {
        &self.batches
    }

    /// Total deposited amount not yet melted
    pub fn pending(&self) -> Fix {
        self.batches
            .iter()
            .map(|b| b.amount.saturating_sub(b.melted))
            .fold(Fix::ZERO, |acc, x| acc.saturating_add(x))
    }

    /// Open a batch for a fresh deposit. A zero-length period vests at once.
    pub fn notify_of_deposit(&mut self, amount: Fix, now: u64) {
        if amount.is_zero() {
            return;
        }
        tracing::debug!(amount = %amount, period = self.period_secs, "furnace deposit");
        self.batches.push(MeltingBatch {
            amount,
            start: now,
            end: now + self.period_secs,
            melted: Fix::ZERO,
        });
    }

    /// Collect every batch's newly vested portion. Idempotent at a fixed
    /// `now`; fully melted batches are dropped.
    pub fn melt(&mut self, now: u64) -> Result<Fix> {
        let mut total = Fix::ZERO;
        for batch in &mut self.batches {
            let release = batch.releasable(now)?;
            if !release.is_zero() {
                batch.melted = batch.melted.checked_add(release)?;
                total = total.checked_add(release)?;
            }
        }
        self.batches.retain(|b| b.melted < b.amount);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_release() {
        let mut furnace = Furnace::new(1_000);
        furnace.notify_of_deposit(Fix::from_integer(100), 0);

        assert_eq!(furnace.melt(250).unwrap(), Fix::from_integer(25));
        assert_eq!(furnace.melt(500).unwrap(), Fix::from_integer(25));
        assert_eq!(furnace.melt(1_000).unwrap(), Fix::from_integer(50));
        assert_eq!(furnace.melt(2_000).unwrap(), Fix::ZERO);
        assert!(furnace.batches().is_empty());
    }

    #[test]
    fn test_melt_is_idempotent_within_a_step() {
        let mut furnace = Furnace::new(1_000);
        furnace.notify_of_deposit(Fix::from_integer(100), 0);

        assert_eq!(furnace.melt(400).unwrap(), Fix::from_integer(40));
        assert_eq!(furnace.melt(400).unwrap(), Fix::ZERO);
        assert_eq!(furnace.pending(), Fix::from_integer(60));
    }

    #[test]
    fn test_overlapping_batches_accumulate() {
        let mut furnace = Furnace::new(1_000);
        furnace.notify_of_deposit(Fix::from_integer(100), 0);
        furnace.notify_of_deposit(Fix::from_integer(50), 500);

        // At t=1000: first batch fully vested, second half vested
        assert_eq!(furnace.melt(1_000).unwrap(), Fix::from_integer(125));
        assert_eq!(furnace.melt(1_500).unwrap(), Fix::from_integer(25));
    }

    #[test]
    fn test_zero_period_vests_immediately() {
        let mut furnace = Furnace::new(0);
        furnace.notify_of_deposit(Fix::from_integer(7), 123);
        assert_eq!(furnace.melt(123).unwrap(), Fix::from_integer(7));
    }

    #[test]
    fn test_zero_deposit_opens_no_batch() {
        let mut furnace = Furnace::new(1_000);
        furnace.notify_of_deposit(Fix::ZERO, 0);
        assert!(furnace.batches().is_empty());
    }
}
