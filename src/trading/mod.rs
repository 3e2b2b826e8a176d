//! Auction plumbing: the external venue interface and the broker that
//! tracks individual trades.

pub mod broker;
pub mod venue;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ids::TokenId;
use crate::utils::math::Fix;

pub use broker::{Broker, SettledTrade, Trade, TradeStatus};
pub use venue::{AuctionVenue, Clearing, ManualVenue};

// ═══════════════════════════════════════════════════════════════════════════════
// TRADER IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

/// The trading agents able to hold auctions. At most one OPEN trade may
/// exist per (trader, sell token) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraderId {
    /// The backing manager, trading to recapitalize
    BackingManager,
    /// Revenue trader targeting the issued token (proceeds melt)
    StableTrader,
    /// Revenue trader targeting the insurance unit (proceeds insure)
    InsuranceTrader,
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraderId::BackingManager => "backing-manager",
            TraderId::StableTrader => "stable-trader",
            TraderId::InsuranceTrader => "insurance-trader",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRADE REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// A price-protected request to auction one token for another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Token to sell
    pub sell: TokenId,
    /// Token to buy
    pub buy: TokenId,
    /// Amount of the sell token on offer
    pub sell_amount: Fix,
    /// Minimum acceptable buy amount for a full fill; partial fills must
    /// clear at least pro-rata against this bound
    pub min_buy_amount: Fix,
}
