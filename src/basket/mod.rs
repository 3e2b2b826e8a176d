//! Basket definition and the basket handler.
//!
//! The *prime basket* is the governance-chosen target composition: target
//! units per basket unit, per collateral. The *current basket* is derived
//! from it by substituting defaulted collateral with configured backups.
//! The current basket carries a monotonically increasing nonce; issuance
//! records are invalidated when the nonce moves.

pub mod handler;

use serde::{Deserialize, Serialize};

use crate::core::ids::{TargetUnit, TokenId};
use crate::utils::math::Fix;

pub use handler::{BasketHandler, SwitchOutcome};

// ═══════════════════════════════════════════════════════════════════════════════
// PRIME BASKET
// ═══════════════════════════════════════════════════════════════════════════════

/// One prime-basket entry: a collateral and its target weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEntry {
    /// Collateral token
    pub token: TokenId,
    /// Target units needed per basket unit
    pub weight: Fix,
}

/// Backup configuration for one target-unit class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Number of backups to include when a primary defaults
    pub min_count: usize,
    /// Eligible backup collateral, in preference order
    pub tokens: Vec<TokenId>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CURRENT BASKET
// ═══════════════════════════════════════════════════════════════════════════════

/// One current-basket entry: a collateral and the reference units of it
/// needed per basket unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketEntry {
    /// Collateral token
    pub token: TokenId,
    /// Reference units per basket unit
    pub ref_amount: Fix,
}

/// The current basket, derived from the prime basket with backups
/// substituted for defaulted collateral
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    /// Ordered constituents
    pub entries: Vec<BasketEntry>,
    /// Monotonically increasing change counter
    pub nonce: u64,
    /// Timestamp of the last switch
    pub timestamp: u64,
    /// False when backups were insufficient: the basket is degenerate and
    /// the system reports not-fully-collateralized rather than silently
    /// substituting partial backing
    pub resolved: bool,
}

impl Basket {
    /// Whether the basket has no constituents
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reference amount required for a token, if it is a constituent
    pub fn ref_amount(&self, token: &TokenId) -> Option<Fix> {
        self.entries
            .iter()
            .find(|e| &e.token == token)
            .map(|e| e.ref_amount)
    }
}

/// A target-unit class still missing weight after a switch attempt,
/// reported alongside an unresolved basket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedUnit {
    /// The target-unit class
    pub target_unit: TargetUnit,
    /// Sound backups found
    pub available: usize,
    /// Backups required
    pub required: usize,
}
