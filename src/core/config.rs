//! Protocol configuration and parameters.
//!
//! A single `ProtocolParams` struct carries every governable knob of the
//! engine. Owner-gated setters on the protocol mutate it; `validate()`
//! rejects inconsistent combinations before any state change.

use serde::{Deserialize, Serialize};

use crate::utils::constants::*;
use crate::utils::math::Fix;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Governable protocol parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Protocol version
    pub version: String,

    /// Per-auction cap on the sell side's value in reference units.
    /// A per-collateral `max_trade_volume` overrides this default.
    pub max_trade_volume: Fix,

    /// Maximum accepted slippage on an auction, as a fraction of the
    /// sell value (`min_buy = sell_value × (1 − max_trade_slippage)`)
    pub max_trade_slippage: Fix,

    /// Value threshold in reference units below which a trade or
    /// shortfall is absorbed rather than acted on
    pub dust_amount: Fix,

    /// Delay between a collateral default (basket switch) and the first
    /// recapitalization trade, in seconds
    pub trading_delay_secs: u64,

    /// Fixed duration of every auction, in seconds
    pub auction_length_secs: u64,

    /// Fraction of current supply issuable per block; capacity never
    /// falls below `min_block_issuance`
    pub issuance_rate: Fix,

    /// Issuance capacity floor in issued tokens per block
    pub min_block_issuance: Fix,

    /// Duration over which a melting batch releases linearly, in seconds
    pub melting_period_secs: u64,

    /// Fraction of required backing retained before excess collateral is
    /// handed out as revenue
    pub backing_buffer: Fix,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_trade_volume: Fix::from_integer(DEFAULT_MAX_TRADE_VOLUME),
            max_trade_slippage: Fix::from_raw(DEFAULT_MAX_TRADE_SLIPPAGE_RAW),
            dust_amount: Fix::from_raw(DEFAULT_DUST_AMOUNT_RAW),
            trading_delay_secs: DEFAULT_TRADING_DELAY_SECS,
            auction_length_secs: DEFAULT_AUCTION_LENGTH_SECS,
            issuance_rate: Fix::from_raw(DEFAULT_ISSUANCE_RATE_RAW),
            min_block_issuance: Fix::from_integer(MIN_BLOCK_ISSUANCE),
            melting_period_secs: DEFAULT_MELTING_PERIOD_SECS,
            backing_buffer: Fix::from_raw(DEFAULT_BACKING_BUFFER_RAW),
        }
    }
}

impl ProtocolParams {
    /// Override the slippage tolerance (for tests)
    pub fn with_slippage(mut self, slippage: Fix) -> Self {
        self.max_trade_slippage = slippage;
        self
    }

    /// Override the dust threshold (for tests)
    pub fn with_dust(mut self, dust: Fix) -> Self {
        self.dust_amount = dust;
        self
    }

    /// Override the trading delay (for tests)
    pub fn with_trading_delay(mut self, secs: u64) -> Self {
        self.trading_delay_secs = secs;
        self
    }

    /// Override the issuance rate and floor (for tests)
    pub fn with_issuance_rate(mut self, rate: Fix, floor: Fix) -> Self {
        self.issuance_rate = rate;
        self.min_block_issuance = floor;
        self
    }

    /// Override the per-auction volume cap (for tests)
    pub fn with_max_trade_volume(mut self, volume: Fix) -> Self {
        self.max_trade_volume = volume;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> bool {
        self.max_trade_slippage < Fix::ONE
            && self.backing_buffer < Fix::ONE
            && self.issuance_rate <= Fix::ONE
            && self.auction_length_secs > 0
            && self.melting_period_secs > 0
            && !self.min_block_issuance.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate());
        assert_eq!(params.max_trade_slippage, Fix::from_bps(100));
        assert_eq!(params.min_block_issuance, Fix::from_integer(10_000));
    }

    #[test]
    fn test_builders() {
        let params = ProtocolParams::default()
            .with_slippage(Fix::from_bps(50))
            .with_dust(Fix::ONE)
            .with_trading_delay(7200);
        assert_eq!(params.max_trade_slippage, Fix::from_bps(50));
        assert_eq!(params.dust_amount, Fix::ONE);
        assert_eq!(params.trading_delay_secs, 7200);
        assert!(params.validate());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = ProtocolParams::default();
        params.max_trade_slippage = Fix::ONE;
        assert!(!params.validate());

        let mut params = ProtocolParams::default();
        params.auction_length_secs = 0;
        assert!(!params.validate());

        let mut params = ProtocolParams::default();
        params.min_block_issuance = Fix::ZERO;
        assert!(!params.validate());
    }
}
