//! The insurance pool: staked insurance units that backstop the protocol.
//!
//! Stakers deposit insurance units for pool shares. Revenue routed to the
//! pool raises the unit-per-share exchange rate; a seizure during
//! recapitalization lowers it. Shares themselves never move, so both
//! appreciation and loss apply to all stakers pro-rata.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::ids::AccountId;
use crate::error::{Error, Result};
use crate::utils::math::{Fix, Rounding};

/// Staked insurance units held against protocol shortfalls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePool {
    shares: HashMap<AccountId, Fix>,
    total_shares: Fix,
    total_staked: Fix,
}

impl InsurancePool {
    /// An empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Insurance units held by the pool
    pub fn total_staked(&self) -> Fix {
        self.total_staked
    }

    /// Outstanding shares
    pub fn total_shares(&self) -> Fix {
        self.total_shares
    }

    /// Shares held by an account
    pub fn shares_of(&self, account: &AccountId) -> Fix {
        self.shares.get(account).copied().unwrap_or(Fix::ZERO)
    }

    /// Insurance units redeemable per share. ONE for an empty pool.
    pub fn exchange_rate(&self) -> Fix {
        if self.total_shares.is_zero() {
            return Fix::ONE;
        }
        self.total_staked
            .div_rounding(self.total_shares, Rounding::Floor)
            .unwrap_or(Fix::ZERO)
    }

    /// Deposit insurance units; returns the shares issued
    pub fn stake(&mut self, account: &AccountId, amount: Fix) -> Result<Fix> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let issued = if self.total_shares.is_zero() {
            amount
        } else {
            amount.mul_div(self.total_shares, self.total_staked, Rounding::Floor)?
        };
        let entry = self.shares.entry(account.clone()).or_insert(Fix::ZERO);
        *entry = entry.checked_add(issued)?;
        self.total_shares = self.total_shares.checked_add(issued)?;
        self.total_staked = self.total_staked.checked_add(amount)?;
        tracing::debug!(account = %account, amount = %amount, shares = %issued, "stake");
        Ok(issued)
    }

    /// Burn shares; returns the insurance units released
    pub fn unstake(&mut self, account: &AccountId, shares: Fix) -> Result<Fix> {
        if shares.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let held = self.shares_of(account);
        if held < shares {
            return Err(Error::InsufficientBalance {
                required: shares.to_string(),
                available: held.to_string(),
            });
        }
        let amount = shares.mul_div(self.total_staked, self.total_shares, Rounding::Floor)?;
        let remaining = held.saturating_sub(shares);
        if remaining.is_zero() {
            self.shares.remove(account);
        } else {
            self.shares.insert(account.clone(), remaining);
        }
        self.total_shares = self.total_shares.saturating_sub(shares);
        self.total_staked = self.total_staked.saturating_sub(amount);
        tracing::debug!(account = %account, shares = %shares, amount = %amount, "unstake");
        Ok(amount)
    }

    /// Revenue deposit; raises the exchange rate for all stakers
    pub fn add_revenue(&mut self, amount: Fix) -> Result<()> {
        if self.total_shares.is_zero() {
            return Err(Error::NoDistributionTargets);
        }
        self.total_staked = self.total_staked.checked_add(amount)?;
        Ok(())
    }

    /// Confiscate up to `amount` of staked units for recapitalization.
    /// Returns what was actually taken; shares are untouched, so the loss
    /// falls on all stakers pro-rata.
    pub fn seize(&mut self, amount: Fix) -> Fix {
        let taken = amount.min(self.total_staked);
        self.total_staked = self.total_staked.saturating_sub(taken);
        if !taken.is_zero() {
            tracing::warn!(seized = %taken, remaining = %self.total_staked, "insurance seized");
        }
        taken
    }
}
