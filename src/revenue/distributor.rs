//! Revenue distribution table.
//!
//! Revenue arrives in two flavors: issued-token revenue and insurance-unit
//! revenue. The distributor holds an ordered table mapping destinations to a
//! pair of share counts, one per flavor, and splits each revenue amount
//! pro-rata across the table. Division dust goes to the first destination
//! holding shares of the flavor, so distribution conserves the input exactly.

use serde::{Deserialize, Serialize};

use crate::core::ids::AccountId;
use crate::error::{Error, Result};
use crate::utils::constants::MAX_DISTRIBUTION_SHARE;
use crate::utils::math::{Fix, Rounding};
use crate::utils::validation::validate_share;

// ═══════════════════════════════════════════════════════════════════════════════
// DESTINATIONS AND SHARES
// ═══════════════════════════════════════════════════════════════════════════════

/// A revenue destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// The furnace, which melts issued-token revenue
    Furnace,
    /// The insurance pool, which absorbs insurance-unit revenue
    InsurancePool,
    /// An arbitrary external account
    External(AccountId),
}

/// Share counts for one destination, one per revenue flavor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueShare {
    /// Shares of issued-token revenue
    pub stable: u64,
    /// Shares of insurance-unit revenue
    pub insurance: u64,
}

impl RevenueShare {
    /// Share count for the given flavor
    pub fn of(&self, kind: RevenueKind) -> u64 {
        match kind {
            RevenueKind::Stable => self.stable,
            RevenueKind::Insurance => self.insurance,
        }
    }

    fn is_empty(&self) -> bool {
        self.stable == 0 && self.insurance == 0
    }
}

/// The flavor of a revenue amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevenueKind {
    /// Denominated in the issued token
    Stable,
    /// Denominated in the insurance unit
    Insurance,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISTRIBUTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered distribution table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    table: Vec<(Destination, RevenueShare)>,
}

impl Default for Distributor {
    /// 40% of issued-token revenue to the furnace, 60% of insurance-unit
    /// revenue to the insurance pool
    fn default() -> Self {
        Self {
            table: vec![
                (Destination::Furnace, RevenueShare { stable: 4_000, insurance: 0 }),
                (Destination::InsurancePool, RevenueShare { stable: 0, insurance: 6_000 }),
            ],
        }
    }
}

impl Distributor {
    /// An empty table; revenue cannot be distributed until shares are set
    pub fn empty() -> Self {
        Self { table: Vec::new() }
    }

    /// The table in order
    pub fn table(&self) -> &[(Destination, RevenueShare)] {
        &self.table
    }

    /// Set (or with an all-zero share, remove) a destination's shares.
    ///
    /// The furnace may only hold issued-token shares and the insurance pool
    /// may only hold insurance-unit shares. Each column is capped at
    /// [`MAX_DISTRIBUTION_SHARE`] total.
    pub fn set_distribution(&mut self, dest: Destination, share: RevenueShare) -> Result<()> {
        if dest == Destination::Furnace && share.insurance != 0 {
            return Err(Error::FurnaceShareInvalid);
        }
        if dest == Destination::InsurancePool && share.stable != 0 {
            return Err(Error::InsuranceShareInvalid);
        }
        validate_share(share.stable)?;
        validate_share(share.insurance)?;

        if share.is_empty() {
            self.table.retain(|(d, _)| *d != dest);
            return Ok(());
        }

        // Check the prospective totals before touching the table
        for kind in [RevenueKind::Stable, RevenueKind::Insurance] {
            let rest: u64 = self
                .table
                .iter()
                .filter(|(d, _)| *d != dest)
                .map(|(_, s)| s.of(kind))
                .sum();
            let total = rest + share.of(kind);
            if total > MAX_DISTRIBUTION_SHARE {
                return Err(Error::ShareTooLarge { share: total, ceiling: MAX_DISTRIBUTION_SHARE });
            }
        }

        match self.table.iter_mut().find(|(d, _)| *d == dest) {
            Some((_, existing)) => *existing = share,
            None => self.table.push((dest, share)),
        }
        Ok(())
    }

    /// Total share count of one flavor
    pub fn total(&self, kind: RevenueKind) -> u64 {
        self.table.iter().map(|(_, s)| s.of(kind)).sum()
    }

    /// Split `amount` across the table pro-rata by flavor shares. Division
    /// dust goes to the first destination holding shares of the flavor, so
    /// the returned payouts sum to `amount` exactly.
    pub fn distribute(
        &self,
        kind: RevenueKind,
        amount: Fix,
    ) -> Result<Vec<(Destination, Fix)>> {
        let total = self.total(kind);
        if total == 0 {
            return Err(Error::NoDistributionTargets);
        }
        if amount.is_zero() {
            return Ok(Vec::new());
        }

        let total_fix = Fix::from_integer(total);
        let mut payouts = Vec::new();
        let mut paid = Fix::ZERO;
        for (dest, share) in &self.table {
            let shares = share.of(kind);
            if shares == 0 {
                continue;
            }
            let cut = amount.mul_div(Fix::from_integer(shares), total_fix, Rounding::Floor)?;
            paid = paid.checked_add(cut)?;
            payouts.push((dest.clone(), cut));
        }

        let remainder = amount.saturating_sub(paid);
        if !remainder.is_zero() {
            // first() is non-empty here since total > 0
            if let Some((_, first)) = payouts.first_mut() {
                *first = first.checked_add(remainder)?;
            }
        }
        Ok(payouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split() {
        let dist = Distributor::default();
        assert_eq!(dist.total(RevenueKind::Stable), 4_000);
        assert_eq!(dist.total(RevenueKind::Insurance), 6_000);

        let payouts = dist.distribute(RevenueKind::Stable, Fix::from_integer(100)).unwrap();
        assert_eq!(payouts, vec![(Destination::Furnace, Fix::from_integer(100))]);
    }

    #[test]
    fn test_furnace_rejects_insurance_shares() {
        let mut dist = Distributor::default();
        assert!(matches!(
            dist.set_distribution(
                Destination::Furnace,
                RevenueShare { stable: 100, insurance: 1 },
            ),
            Err(Error::FurnaceShareInvalid)
        ));
        assert!(matches!(
            dist.set_distribution(
                Destination::InsurancePool,
                RevenueShare { stable: 1, insurance: 100 },
            ),
            Err(Error::InsuranceShareInvalid)
        ));
    }

    #[test]
    fn test_share_ceiling() {
        let mut dist = Distributor::default();
        let err = dist.set_distribution(
            Destination::External(AccountId::from("treasury")),
            RevenueShare { stable: 7_000, insurance: 0 },
        );
        assert!(matches!(err, Err(Error::ShareTooLarge { share: 11_000, ceiling: 10_000 })));
        // The rejected setter left the table untouched
        assert_eq!(dist.total(RevenueKind::Stable), 4_000);
    }

    #[test]
    fn test_zero_share_removes_destination() {
        let mut dist = Distributor::default();
        dist.set_distribution(Destination::Furnace, RevenueShare::default()).unwrap();
        assert_eq!(dist.total(RevenueKind::Stable), 0);
        assert!(matches!(
            dist.distribute(RevenueKind::Stable, Fix::ONE),
            Err(Error::NoDistributionTargets)
        ));
    }

    #[test]
    fn test_remainder_goes_to_first_destination() {
        let mut dist = Distributor::empty();
        dist.set_distribution(
            Destination::External(AccountId::from("a")),
            RevenueShare { stable: 1, insurance: 0 },
        )
        .unwrap();
        dist.set_distribution(
            Destination::External(AccountId::from("b")),
            RevenueShare { stable: 1, insurance: 0 },
        )
        .unwrap();
        dist.set_distribution(
            Destination::External(AccountId::from("c")),
            RevenueShare { stable: 1, insurance: 0 },
        )
        .unwrap();

        let amount = Fix::from_raw(100);
        let payouts = dist.distribute(RevenueKind::Stable, amount).unwrap();
        let total: u128 = payouts.iter().map(|(_, p)| p.raw()).sum();
        assert_eq!(total, 100);
        // 100/3 floors to 33; the first destination absorbs the 1-unit dust
        assert_eq!(payouts[0].1, Fix::from_raw(34));
        assert_eq!(payouts[1].1, Fix::from_raw(33));
        assert_eq!(payouts[2].1, Fix::from_raw(33));
    }

    #[test]
    fn test_conservation_with_mixed_shares() {
        let mut dist = Distributor::default();
        dist.set_distribution(
            Destination::External(AccountId::from("treasury")),
            RevenueShare { stable: 777, insurance: 333 },
        )
        .unwrap();

        for kind in [RevenueKind::Stable, RevenueKind::Insurance] {
            let amount = Fix::from_raw(1_234_567_891_234_567_891);
            let payouts = dist.distribute(kind, amount).unwrap();
            let total: u128 = payouts.iter().map(|(_, p)| p.raw()).sum();
            assert_eq!(total, amount.raw());
        }
    }
}
