//! Protocol event log.
//!
//! Every externally visible state change appends an event. The log is an
//! in-memory audit trail for drivers and tests; it carries no behavior of
//! its own.

use serde::{Deserialize, Serialize};

use crate::core::ids::{AccountId, TargetUnit, TokenId};
use crate::utils::math::Fix;

/// An externally visible protocol state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Asset added to the registry
    AssetRegistered {
        /// The registered token
        token: TokenId,
    },
    /// Asset removed from the registry
    AssetUnregistered {
        /// The removed token
        token: TokenId,
    },
    /// Asset adapter hot-swapped in place
    AssetSwapped {
        /// The token whose adapter changed
        token: TokenId,
    },
    /// Prime basket replaced
    PrimeBasketSet {
        /// Number of prime entries
        entries: usize,
    },
    /// Backup list replaced for one target unit
    BackupConfigSet {
        /// The target-unit class
        target_unit: TargetUnit,
    },
    /// Current basket recomputed
    BasketSwitched {
        /// The new basket nonce
        nonce: u64,
        /// Whether every target unit was covered
        resolved: bool,
    },
    /// Distribution table changed
    DistributionSet,
    /// Issuance queued
    IssuanceStarted {
        /// Record id
        id: String,
        /// Minting account
        minter: AccountId,
        /// Issued-token amount
        amount: Fix,
    },
    /// Issuance minted, instantly or from the queue
    IssuanceCompleted {
        /// Minting account
        minter: AccountId,
        /// Issued-token amount
        amount: Fix,
    },
    /// Issuance refunded, by cancellation or a basket switch
    IssuanceCanceled {
        /// Record id
        id: String,
        /// Minting account
        minter: AccountId,
        /// Refunded issued-token amount
        amount: Fix,
    },
    /// Tokens redeemed for collateral
    Redeemed {
        /// Redeeming account
        account: AccountId,
        /// Issued-token amount burned
        amount: Fix,
        /// Basket units released
        baskets: Fix,
    },
    /// Auction opened
    TradeStarted {
        /// Trade id
        id: String,
        /// Token sold
        sell: TokenId,
        /// Token bought
        buy: TokenId,
        /// Lot size
        sell_amount: Fix,
    },
    /// Auction settled
    TradeSettled {
        /// Trade id
        id: String,
        /// Amount sold
        sold: Fix,
        /// Amount bought
        bought: Fix,
    },
    /// Revenue paid to a distribution destination
    RevenueDistributed {
        /// Amount paid
        amount: Fix,
    },
    /// Collateral rewards swept into backing
    RewardsClaimed {
        /// Reward token
        token: TokenId,
        /// Claimed amount
        amount: Fix,
    },
    /// Issued tokens burned by the furnace
    Melted {
        /// Amount burned
        amount: Fix,
    },
    /// Insurance units staked
    Staked {
        /// Staking account
        account: AccountId,
        /// Insurance units deposited
        amount: Fix,
    },
    /// Insurance units unstaked
    Unstaked {
        /// Unstaking account
        account: AccountId,
        /// Insurance units released
        amount: Fix,
    },
    /// Staked insurance confiscated for recapitalization
    InsuranceSeized {
        /// Units taken
        amount: Fix,
    },
    /// Excess backing handed to the revenue traders
    ExcessDistributed {
        /// The token handed out
        token: TokenId,
        /// Total amount handed out
        amount: Fix,
    },
}

impl ProtocolEvent {
    /// Stable event-type tag for filtering and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            ProtocolEvent::AssetRegistered { .. } => "asset_registered",
            ProtocolEvent::AssetUnregistered { .. } => "asset_unregistered",
            ProtocolEvent::AssetSwapped { .. } => "asset_swapped",
            ProtocolEvent::PrimeBasketSet { .. } => "prime_basket_set",
            ProtocolEvent::BackupConfigSet { .. } => "backup_config_set",
            ProtocolEvent::BasketSwitched { .. } => "basket_switched",
            ProtocolEvent::DistributionSet => "distribution_set",
            ProtocolEvent::IssuanceStarted { .. } => "issuance_started",
            ProtocolEvent::IssuanceCompleted { .. } => "issuance_completed",
            ProtocolEvent::IssuanceCanceled { .. } => "issuance_canceled",
            ProtocolEvent::Redeemed { .. } => "redeemed",
            ProtocolEvent::TradeStarted { .. } => "trade_started",
            ProtocolEvent::TradeSettled { .. } => "trade_settled",
            ProtocolEvent::RevenueDistributed { .. } => "revenue_distributed",
            ProtocolEvent::RewardsClaimed { .. } => "rewards_claimed",
            ProtocolEvent::Melted { .. } => "melted",
            ProtocolEvent::Staked { .. } => "staked",
            ProtocolEvent::Unstaked { .. } => "unstaked",
            ProtocolEvent::InsuranceSeized { .. } => "insurance_seized",
            ProtocolEvent::ExcessDistributed { .. } => "excess_distributed",
        }
    }
}

/// Append-only in-memory event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
}

impl EventLog {
    /// An empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&mut self, event: ProtocolEvent) {
        tracing::trace!(event_type = event.event_type(), "event");
        self.events.push(event);
    }

    /// All events in order
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Events of one type, in order
    pub fn of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a ProtocolEvent> {
        self.events
            .iter()
            .filter(move |e| e.event_type() == event_type)
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
