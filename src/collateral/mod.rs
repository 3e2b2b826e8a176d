//! Collateral adapters and their default state machine.
//!
//! Each collateral token is wrapped by one adapter exposing price,
//! exchange-rate-to-reference (`ref_per_tok`), target-unit identity, and a
//! status in {SOUND, IFFY, DISABLED}. Status transitions on `refresh`:
//!
//! - SOUND → IFFY when the reference price deviates beyond the default
//!   threshold, or the feed is stale / reports zero
//! - IFFY → DISABLED once the condition has persisted for
//!   `delay_until_default`; IFFY → SOUND if it clears before that
//! - any → DISABLED immediately when `ref_per_tok` decreases (hard
//!   default); DISABLED is terminal
//!
//! A transiently failing feed leaves status unchanged.
//!
//! The underlying yield mechanism is a tagged variant, not a subclass: a
//! static-rate token, a rebasing token, or a vault share.

pub mod feed;

use serde::{Deserialize, Serialize};

use crate::core::ids::{TargetUnit, TokenId};
use crate::error::{Error, Result};
use crate::utils::constants::{DEFAULT_DEFAULT_THRESHOLD_BPS, DEFAULT_DELAY_UNTIL_DEFAULT_SECS};
use crate::utils::math::{within_deviation, Fix, Rounding};

pub use feed::PriceFeed;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Status of a collateral adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollateralStatus {
    /// Fully functional
    Sound,
    /// Questionable; will default if the condition persists
    Iffy,
    /// Defaulted. Terminal for this adapter instance.
    Disabled,
}

impl CollateralStatus {
    /// The worse of two statuses
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE MECHANISM
// ═══════════════════════════════════════════════════════════════════════════════

/// How a collateral token accrues reference units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateMechanism {
    /// Pegged 1:1 to its reference unit, no yield (e.g. a plain fiatcoin)
    StaticRate,
    /// Rebasing token whose exchange rate is a published index
    Rebasing {
        /// Current index: reference units per token
        index: Fix,
    },
    /// Vault share redeemable for a pool of underlying assets
    VaultShare {
        /// Underlying assets held by the vault, in reference units
        assets: Fix,
        /// Shares outstanding
        shares: Fix,
    },
}

impl RateMechanism {
    /// Current reference units per collateral token
    pub fn ref_per_tok(&self) -> Fix {
        match self {
            RateMechanism::StaticRate => Fix::ONE,
            RateMechanism::Rebasing { index } => *index,
            RateMechanism::VaultShare { assets, shares } => {
                if shares.is_zero() {
                    Fix::ONE
                } else {
                    *assets / *shares
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REWARD PROGRAM
// ═══════════════════════════════════════════════════════════════════════════════

/// Optional reward emission attached to a collateral (e.g. lending
/// incentives paid in a separate token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardProgram {
    /// Token the rewards are paid in
    pub token: TokenId,
    /// Rewards accrued since the last claim
    pub accrued: Fix,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL
// ═══════════════════════════════════════════════════════════════════════════════

/// A collateral adapter: one wrapped collateral token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collateral {
    /// Wrapped token
    pub token: TokenId,
    /// Target-unit class this collateral belongs to
    pub target_unit: TargetUnit,
    /// Target units per reference unit (usually 1)
    pub target_per_ref: Fix,
    /// Market price feed: reference units per collateral token
    pub feed: PriceFeed,
    /// Yield mechanism
    pub mechanism: RateMechanism,
    /// Allowed reference-unit deviation before IFFY, in basis points
    pub default_threshold_bps: u64,
    /// Delay between first IFFY observation and DISABLED, in seconds
    pub delay_until_default_secs: u64,
    /// Per-collateral cap on auction size in reference units; falls back
    /// to the protocol default when absent
    pub max_trade_volume: Option<Fix>,
    /// Optional reward emission
    pub rewards: Option<RewardProgram>,

    status: CollateralStatus,
    /// Timestamp at which IFFY hardens into DISABLED; `None` means never
    when_default: Option<u64>,
    /// High-water mark for ref_per_tok; a decrease is a hard default
    prev_ref_per_tok: Fix,
}

impl Collateral {
    /// Create a new sound collateral adapter
    pub fn new(
        token: TokenId,
        target_unit: TargetUnit,
        feed: PriceFeed,
        mechanism: RateMechanism,
    ) -> Self {
        let prev_ref_per_tok = mechanism.ref_per_tok();
        Self {
            token,
            target_unit,
            target_per_ref: Fix::ONE,
            feed,
            mechanism,
            default_threshold_bps: DEFAULT_DEFAULT_THRESHOLD_BPS,
            delay_until_default_secs: DEFAULT_DELAY_UNTIL_DEFAULT_SECS,
            max_trade_volume: None,
            rewards: None,
            status: CollateralStatus::Sound,
            when_default: None,
            prev_ref_per_tok,
        }
    }

    /// Override the default threshold (builder style)
    pub fn with_default_threshold(mut self, bps: u64) -> Self {
        self.default_threshold_bps = bps;
        self
    }

    /// Override the delay until default (builder style)
    pub fn with_delay_until_default(mut self, secs: u64) -> Self {
        self.delay_until_default_secs = secs;
        self
    }

    /// Attach a reward program (builder style)
    pub fn with_rewards(mut self, token: TokenId) -> Self {
        self.rewards = Some(RewardProgram { token, accrued: Fix::ZERO });
        self
    }

    /// Override the per-collateral trade volume cap (builder style)
    pub fn with_max_trade_volume(mut self, volume: Fix) -> Self {
        self.max_trade_volume = Some(volume);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADAPTER INTERFACE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current status
    pub fn status(&self) -> CollateralStatus {
        self.status
    }

    /// Timestamp at which this collateral defaults, if pending
    pub fn when_default(&self) -> Option<u64> {
        self.when_default
    }

    /// Reference units per collateral token
    pub fn ref_per_tok(&self) -> Fix {
        self.mechanism.ref_per_tok()
    }

    /// Target units per reference unit
    pub fn target_per_ref(&self) -> Fix {
        self.target_per_ref
    }

    /// Market price in reference units per collateral token
    pub fn price(&self, now: u64) -> Result<Fix> {
        self.feed.price(now)
    }

    /// Re-evaluate status. Idempotent at a fixed timestamp.
    pub fn refresh(&mut self, now: u64) {
        if self.status == CollateralStatus::Disabled {
            return;
        }

        // Hard default: ref_per_tok must never decrease
        let rate = self.mechanism.ref_per_tok();
        if rate < self.prev_ref_per_tok {
            tracing::warn!(
                token = %self.token,
                "ref_per_tok decreased, hard default"
            );
            self.status = CollateralStatus::Disabled;
            self.when_default = Some(now);
            return;
        }
        self.prev_ref_per_tok = rate;

        // Soft default: peg deviation or an unusable feed
        let sound = match self.feed.price(now) {
            Ok(price) => {
                // Reference price of one token should track target_per_ref
                // scaled by the accrued exchange rate
                let expected = self.target_per_ref * rate;
                within_deviation(price, expected, self.default_threshold_bps)
            }
            // Stale or zero prices are a default signal
            Err(Error::StalePrice { .. }) | Err(Error::ZeroPrice(_)) => false,
            // A transient feed failure must not move status at all
            Err(_) => return,
        };

        if sound {
            self.status = CollateralStatus::Sound;
            self.when_default = None;
        } else {
            match self.when_default {
                None => {
                    self.when_default = Some(now + self.delay_until_default_secs);
                    self.status = CollateralStatus::Iffy;
                    tracing::info!(token = %self.token, "collateral turned iffy");
                }
                Some(at) if now >= at => {
                    self.status = CollateralStatus::Disabled;
                    tracing::warn!(token = %self.token, "collateral disabled");
                }
                Some(_) => self.status = CollateralStatus::Iffy,
            }
        }
    }

    /// Claim accrued rewards, if any. Best-effort: returns `None` when no
    /// program is attached or nothing has accrued.
    pub fn claim_rewards(&mut self) -> Option<(TokenId, Fix)> {
        let program = self.rewards.as_mut()?;
        if program.accrued.is_zero() {
            return None;
        }
        let amount = program.accrued;
        program.accrued = Fix::ZERO;
        Some((program.token.clone(), amount))
    }

    /// Accrue rewards from the external emission (driven by the operator
    /// or tests standing in for the external protocol)
    pub fn accrue_rewards(&mut self, amount: Fix) {
        if let Some(program) = self.rewards.as_mut() {
            program.accrued = program.accrued.saturating_add(amount);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET
// ═══════════════════════════════════════════════════════════════════════════════

/// A registered asset: either full collateral or a plain priced token
/// (reward tokens that can be sold but never back the basket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Asset {
    /// Collateral adapter
    Collateral(Collateral),
    /// Price-only asset
    Plain {
        /// The token
        token: TokenId,
        /// Market price feed in reference units
        feed: PriceFeed,
        /// Per-asset trade volume cap in reference units
        max_trade_volume: Option<Fix>,
    },
}

impl Asset {
    /// The wrapped token
    pub fn token(&self) -> &TokenId {
        match self {
            Asset::Collateral(c) => &c.token,
            Asset::Plain { token, .. } => token,
        }
    }

    /// Market price in reference units per token
    pub fn price(&self, now: u64) -> Result<Fix> {
        match self {
            Asset::Collateral(c) => c.price(now),
            Asset::Plain { feed, .. } => feed.price(now),
        }
    }

    /// View as collateral, if it is one
    pub fn as_collateral(&self) -> Option<&Collateral> {
        match self {
            Asset::Collateral(c) => Some(c),
            Asset::Plain { .. } => None,
        }
    }

    /// Mutable view as collateral, if it is one
    pub fn as_collateral_mut(&mut self) -> Option<&mut Collateral> {
        match self {
            Asset::Collateral(c) => Some(c),
            Asset::Plain { .. } => None,
        }
    }

    /// Trade volume cap for this asset, falling back to the given default
    pub fn max_trade_volume(&self, default: Fix) -> Fix {
        match self {
            Asset::Collateral(c) => c.max_trade_volume.unwrap_or(default),
            Asset::Plain { max_trade_volume, .. } => max_trade_volume.unwrap_or(default),
        }
    }

    /// Maximum sell amount in token units for this asset at `price`,
    /// derived from its volume cap
    pub fn max_sell_amount(&self, default_volume: Fix, price: Fix) -> Result<Fix> {
        let volume = self.max_trade_volume(default_volume);
        volume.div_rounding(price, Rounding::Floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Collateral {
        Collateral::new(
            TokenId::from("USDC"),
            TargetUnit::from("USD"),
            PriceFeed::new("USDC", Fix::ONE, 0).with_max_age(u64::MAX),
            RateMechanism::StaticRate,
        )
        .with_default_threshold(500)
        .with_delay_until_default(86_400)
    }

    #[test]
    fn test_sound_stays_sound() {
        let mut c = usdc();
        c.refresh(100);
        assert_eq!(c.status(), CollateralStatus::Sound);
        assert_eq!(c.when_default(), None);
    }

    #[test]
    fn test_deviation_turns_iffy_within_one_refresh() {
        let mut c = usdc();
        // 6% below peg, beyond the 5% threshold
        c.feed.set_price(Fix::from_raw(94 * Fix::SCALE / 100), 100);
        c.refresh(100);
        assert_eq!(c.status(), CollateralStatus::Iffy);
        assert_eq!(c.when_default(), Some(100 + 86_400));
    }

    #[test]
    fn test_iffy_recovers_before_delay() {
        let mut c = usdc();
        c.feed.set_price(Fix::from_raw(94 * Fix::SCALE / 100), 100);
        c.refresh(100);
        assert_eq!(c.status(), CollateralStatus::Iffy);

        c.feed.set_price(Fix::ONE, 200);
        c.refresh(200);
        assert_eq!(c.status(), CollateralStatus::Sound);
        assert_eq!(c.when_default(), None);
    }

    #[test]
    fn test_iffy_disables_exactly_at_delay() {
        let mut c = usdc();
        c.feed.set_price(Fix::from_raw(94 * Fix::SCALE / 100), 100);
        c.refresh(100);

        // One second before the deadline: still iffy
        c.refresh(100 + 86_399);
        assert_eq!(c.status(), CollateralStatus::Iffy);

        // Exactly at the deadline: disabled
        c.refresh(100 + 86_400);
        assert_eq!(c.status(), CollateralStatus::Disabled);
    }

    #[test]
    fn test_disabled_is_terminal() {
        let mut c = usdc();
        c.feed.set_price(Fix::from_raw(90 * Fix::SCALE / 100), 100);
        c.refresh(100);
        c.refresh(100 + 86_400);
        assert_eq!(c.status(), CollateralStatus::Disabled);

        // Peg restored, but the adapter stays dead
        c.feed.set_price(Fix::ONE, 200_000);
        c.refresh(200_000);
        assert_eq!(c.status(), CollateralStatus::Disabled);
    }

    #[test]
    fn test_falling_ref_per_tok_hard_defaults() {
        let mut c = Collateral::new(
            TokenId::from("vUSD"),
            TargetUnit::from("USD"),
            PriceFeed::new("vUSD", Fix::ONE, 0).with_max_age(u64::MAX),
            RateMechanism::Rebasing { index: Fix::ONE },
        );
        c.refresh(10);
        assert_eq!(c.status(), CollateralStatus::Sound);

        c.mechanism = RateMechanism::Rebasing { index: Fix::from_raw(Fix::SCALE - 1) };
        c.refresh(20);
        assert_eq!(c.status(), CollateralStatus::Disabled);
    }

    #[test]
    fn test_transient_feed_failure_leaves_status() {
        let mut c = usdc();
        c.refresh(100);
        assert_eq!(c.status(), CollateralStatus::Sound);

        c.feed.set_unavailable(true);
        c.refresh(200);
        assert_eq!(c.status(), CollateralStatus::Sound);
        assert_eq!(c.when_default(), None);
    }

    #[test]
    fn test_stale_feed_is_a_default_signal() {
        let mut c = Collateral::new(
            TokenId::from("USDT"),
            TargetUnit::from("USD"),
            PriceFeed::new("USDT", Fix::ONE, 0).with_max_age(60),
            RateMechanism::StaticRate,
        );
        c.refresh(30);
        assert_eq!(c.status(), CollateralStatus::Sound);

        c.refresh(61);
        assert_eq!(c.status(), CollateralStatus::Iffy);
    }

    #[test]
    fn test_vault_share_rate_and_appreciation() {
        let mechanism = RateMechanism::VaultShare {
            assets: Fix::from_integer(150),
            shares: Fix::from_integer(100),
        };
        assert_eq!(mechanism.ref_per_tok(), Fix::from_raw(15 * Fix::SCALE / 10));
    }

    #[test]
    fn test_rebasing_appreciation_keeps_sound_when_priced_accordingly() {
        let mut c = Collateral::new(
            TokenId::from("aUSD"),
            TargetUnit::from("USD"),
            PriceFeed::new("aUSD", Fix::ONE, 0).with_max_age(u64::MAX),
            RateMechanism::Rebasing { index: Fix::ONE },
        );
        c.refresh(10);

        // Index appreciates 10% and the market reprices the token
        c.mechanism = RateMechanism::Rebasing { index: Fix::from_raw(11 * Fix::SCALE / 10) };
        c.feed.set_price(Fix::from_raw(11 * Fix::SCALE / 10), 20);
        c.refresh(20);
        assert_eq!(c.status(), CollateralStatus::Sound);
    }

    #[test]
    fn test_claim_rewards() {
        let mut c = usdc().with_rewards(TokenId::from("COMP"));
        assert_eq!(c.claim_rewards(), None);

        c.accrue_rewards(Fix::from_integer(5));
        assert_eq!(
            c.claim_rewards(),
            Some((TokenId::from("COMP"), Fix::from_integer(5)))
        );
        // Second claim is a no-op
        assert_eq!(c.claim_rewards(), None);
    }

    #[test]
    fn test_status_worst() {
        use CollateralStatus::*;
        assert_eq!(Sound.worst(Iffy), Iffy);
        assert_eq!(Iffy.worst(Disabled), Disabled);
        assert_eq!(Sound.worst(Sound), Sound);
    }
}
