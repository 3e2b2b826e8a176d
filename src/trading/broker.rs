//! Broker: creates and tracks individual trades.
//!
//! One broker serves all traders. It enforces the single-open-trade rule
//! per (trader, sell token), stamps every auction with the protocol-wide
//! auction length, and resolves settlements — filled, partial, or expired
//! — into DONE trades. A trade cannot be cancelled early, only settled at
//! or after its end time.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::core::ids::derive_id;
use crate::error::{Error, Result};
use crate::trading::venue::{AuctionVenue, Clearing};
use crate::trading::{TradeRequest, TraderId};
use crate::utils::math::Fix;

// ═══════════════════════════════════════════════════════════════════════════════
// TRADE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Auction running
    Open,
    /// Settled, whether filled or expired
    Done,
}

/// A single auction tracked by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Content-derived identifier
    pub id: String,
    /// Trader that opened the trade
    pub trader: TraderId,
    /// The price-protected request
    pub request: TradeRequest,
    /// Timestamp the auction opened
    pub start_time: u64,
    /// Timestamp the auction can settle
    pub end_time: u64,
    /// Lifecycle state
    pub status: TradeStatus,
    /// Broker-assigned open sequence
    pub seq: u64,
    /// Venue-assigned auction id
    pub external_id: u64,
    /// Clearing amounts, once settled
    pub clearing: Option<Clearing>,
}

/// A settled trade together with the unsold remainder that returns to the
/// seller's balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledTrade {
    /// The trade, now DONE
    pub trade: Trade,
    /// Clearing amounts
    pub clearing: Clearing,
    /// Sell tokens that did not clear
    pub unsold: Fix,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BROKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Creates and tracks trades for all traders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    trades: HashMap<String, Trade>,
    /// Open (trader, sell token) pairs; serializes that resource
    open_pairs: HashSet<(TraderId, String)>,
    auction_length_secs: u64,
    seq: u64,
}

impl Broker {
    /// Create a broker with the given auction length
    pub fn new(auction_length_secs: u64) -> Self {
        Self {
            trades: HashMap::new(),
            open_pairs: HashSet::new(),
            auction_length_secs,
            seq: 0,
        }
    }

    /// Current auction length in seconds
    pub fn auction_length_secs(&self) -> u64 {
        self.auction_length_secs
    }

    /// Update the auction length. Applies to trades opened afterwards.
    pub fn set_auction_length(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(Error::InvalidParameter {
                name: "auction_length_secs".into(),
                reason: "must be positive".into(),
            });
        }
        self.auction_length_secs = secs;
        Ok(())
    }

    /// Whether the trader has an open trade selling `token`
    pub fn has_open(&self, trader: TraderId, token: &str) -> bool {
        self.open_pairs.contains(&(trader, token.to_string()))
    }

    /// Whether the trader has any open trade
    pub fn has_any_open(&self, trader: TraderId) -> bool {
        self.open_pairs.iter().any(|(t, _)| *t == trader)
    }

    /// Look up a trade by id
    pub fn trade(&self, id: &str) -> Result<&Trade> {
        self.trades.get(id).ok_or_else(|| Error::TradeNotFound(id.into()))
    }

    /// Ids of open trades whose end time has passed, in the order the
    /// trades were opened
    pub fn settleable(&self, now: u64) -> Vec<String> {
        let mut ended: Vec<&Trade> = self
            .trades
            .values()
            .filter(|t| t.status == TradeStatus::Open && now >= t.end_time)
            .collect();
        ended.sort_by_key(|t| t.seq);
        ended.into_iter().map(|t| t.id.clone()).collect()
    }

    /// All trades, open and done
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    /// Open an auction for the request on behalf of `trader`
    pub fn open_trade(
        &mut self,
        trader: TraderId,
        request: TradeRequest,
        venue: &mut dyn AuctionVenue,
        now: u64,
    ) -> Result<String> {
        if request.sell_amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let pair = (trader, request.sell.to_string());
        if self.open_pairs.contains(&pair) {
            return Err(Error::TradeAlreadyOpen {
                trader: trader.to_string(),
                token: request.sell.to_string(),
            });
        }

        let external_id = venue.initiate_auction(&request, self.auction_length_secs)?;
        self.seq += 1;
        let id = derive_id(
            "trade",
            &[&trader.to_string(), request.sell.as_str(), request.buy.as_str()],
            self.seq,
        );

        tracing::info!(
            trade = %id,
            trader = %trader,
            sell = %request.sell,
            buy = %request.buy,
            sell_amount = %request.sell_amount,
            min_buy = %request.min_buy_amount,
            "trade started"
        );

        self.trades.insert(
            id.clone(),
            Trade {
                id: id.clone(),
                trader,
                request,
                start_time: now,
                end_time: now + self.auction_length_secs,
                status: TradeStatus::Open,
                seq: self.seq,
                external_id,
                clearing: None,
            },
        );
        self.open_pairs.insert(pair);
        Ok(id)
    }

    /// Settle a trade at or after its end time. The trade becomes DONE
    /// regardless of fill; the unsold remainder is reported for return to
    /// the seller.
    pub fn settle_trade(
        &mut self,
        id: &str,
        venue: &mut dyn AuctionVenue,
        now: u64,
    ) -> Result<SettledTrade> {
        let trade = self
            .trades
            .get_mut(id)
            .ok_or_else(|| Error::TradeNotFound(id.into()))?;
        if trade.status == TradeStatus::Done {
            return Err(Error::TradeNotFound(format!("{} already settled", id)));
        }
        if now < trade.end_time {
            return Err(Error::TradeNotEnded {
                id: id.into(),
                now,
                end_time: trade.end_time,
            });
        }

        let clearing = venue.settle(trade.external_id)?;
        trade.status = TradeStatus::Done;
        trade.clearing = Some(clearing);
        let unsold = trade.request.sell_amount.saturating_sub(clearing.sold);
        self.open_pairs.remove(&(trade.trader, trade.request.sell.to_string()));

        tracing::info!(
            trade = %id,
            sold = %clearing.sold,
            bought = %clearing.bought,
            unsold = %unsold,
            "trade settled"
        );

        Ok(SettledTrade { trade: trade.clone(), clearing, unsold })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::TokenId;
    use crate::trading::venue::ManualVenue;

    fn request(sell: &str, buy: &str, amount: u64) -> TradeRequest {
        TradeRequest {
            sell: TokenId::from(sell),
            buy: TokenId::from(buy),
            sell_amount: Fix::from_integer(amount),
            min_buy_amount: Fix::from_integer(amount * 99 / 100),
        }
    }

    #[test]
    fn test_open_and_settle_filled() {
        let mut broker = Broker::new(1800);
        let mut venue = ManualVenue::new();

        let id = broker
            .open_trade(TraderId::BackingManager, request("USDT", "DAI", 100), &mut venue, 1000)
            .unwrap();
        assert!(broker.has_open(TraderId::BackingManager, "USDT"));

        let external = broker.trade(&id).unwrap().external_id;
        venue.fill_at_min(external).unwrap();

        let settled = broker.settle_trade(&id, &mut venue, 2800).unwrap();
        assert_eq!(settled.clearing.sold, Fix::from_integer(100));
        assert_eq!(settled.clearing.bought, Fix::from_integer(99));
        assert_eq!(settled.unsold, Fix::ZERO);
        assert!(!broker.has_open(TraderId::BackingManager, "USDT"));
        assert_eq!(settled.trade.status, TradeStatus::Done);
    }

    #[test]
    fn test_one_open_trade_per_pair() {
        let mut broker = Broker::new(1800);
        let mut venue = ManualVenue::new();

        broker
            .open_trade(TraderId::StableTrader, request("COMP", "BUSD", 10), &mut venue, 0)
            .unwrap();
        assert!(matches!(
            broker.open_trade(TraderId::StableTrader, request("COMP", "BUSD", 5), &mut venue, 0),
            Err(Error::TradeAlreadyOpen { .. })
        ));
        // A different trader may sell the same token concurrently
        broker
            .open_trade(TraderId::InsuranceTrader, request("COMP", "INSR", 10), &mut venue, 0)
            .unwrap();
    }

    #[test]
    fn test_cannot_settle_early() {
        let mut broker = Broker::new(1800);
        let mut venue = ManualVenue::new();
        let id = broker
            .open_trade(TraderId::BackingManager, request("USDT", "DAI", 100), &mut venue, 1000)
            .unwrap();

        assert!(matches!(
            broker.settle_trade(&id, &mut venue, 2799),
            Err(Error::TradeNotEnded { .. })
        ));
        assert!(broker.settle_trade(&id, &mut venue, 2800).is_ok());
    }

    #[test]
    fn test_expired_trade_settles_done_with_full_remainder() {
        let mut broker = Broker::new(1800);
        let mut venue = ManualVenue::new();
        let id = broker
            .open_trade(TraderId::BackingManager, request("USDT", "DAI", 100), &mut venue, 0)
            .unwrap();

        let settled = broker.settle_trade(&id, &mut venue, 1800).unwrap();
        assert_eq!(settled.clearing.sold, Fix::ZERO);
        assert_eq!(settled.unsold, Fix::from_integer(100));
        // A new trade for the pair is possible again
        assert!(!broker.has_open(TraderId::BackingManager, "USDT"));
    }

    #[test]
    fn test_settleable_lists_ended_trades() {
        let mut broker = Broker::new(100);
        let mut venue = ManualVenue::new();
        let a = broker
            .open_trade(TraderId::BackingManager, request("USDT", "DAI", 100), &mut venue, 0)
            .unwrap();
        let b = broker
            .open_trade(TraderId::StableTrader, request("COMP", "BUSD", 10), &mut venue, 50)
            .unwrap();
        let c = broker
            .open_trade(TraderId::InsuranceTrader, request("COMP", "INSR", 10), &mut venue, 50)
            .unwrap();

        assert_eq!(broker.settleable(100), vec![a.clone()]);
        // Ended trades settle in the order they were opened
        assert_eq!(broker.settleable(150), vec![a.clone(), b, c]);
        broker.settle_trade(&a, &mut venue, 100).unwrap();
        assert_eq!(broker.settleable(150).len(), 2);
    }
}
