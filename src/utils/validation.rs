//! Input validation utilities for the basketUSD protocol.
//!
//! Validators reject malformed configuration synchronously, before any
//! state change, so a failed setter leaves the engine untouched.

use crate::error::{Error, Result};
use crate::utils::constants::MAX_DISTRIBUTION_SHARE;
use crate::utils::math::Fix;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is non-zero
pub fn validate_non_zero(amount: Fix, _name: &str) -> Result<()> {
    if amount.is_zero() {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURAL VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that two paired configuration arrays have equal length
pub fn validate_equal_lengths(left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::LengthMismatch { left, right });
    }
    Ok(())
}

/// Validate a distribution share against the protocol ceiling
pub fn validate_share(share: u64) -> Result<()> {
    if share > MAX_DISTRIBUTION_SHARE {
        return Err(Error::ShareTooLarge {
            share,
            ceiling: MAX_DISTRIBUTION_SHARE,
        });
    }
    Ok(())
}
