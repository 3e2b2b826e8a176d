//! External auction venue interface.
//!
//! The protocol consumes a venue, it never implements price discovery:
//! `initiate_auction` opens a time-boxed auction and `settle` reports the
//! clearing amounts. `ManualVenue` is the in-crate implementation driven
//! by an operator (or a test) posting clearing results; production
//! deployments adapt a real venue behind the same trait.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::trading::TradeRequest;
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// VENUE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Clearing amounts of a settled auction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clearing {
    /// Sell tokens actually sold
    pub sold: Fix,
    /// Buy tokens received
    pub bought: Fix,
}

/// An external auction venue
pub trait AuctionVenue {
    /// Open an auction for the given request, returning the venue's
    /// auction identifier
    fn initiate_auction(&mut self, request: &TradeRequest, duration_secs: u64) -> Result<u64>;

    /// Settle an auction, returning the clearing amounts. An auction with
    /// no acceptable bids clears at zero.
    fn settle(&mut self, auction_id: u64) -> Result<Clearing>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL VENUE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingAuction {
    request: TradeRequest,
    clearing: Option<Clearing>,
    settled: bool,
}

/// Venue driven by manually posted clearing results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualVenue {
    auctions: HashMap<u64, PendingAuction>,
    next_id: u64,
}

impl ManualVenue {
    /// Create an empty venue
    pub fn new() -> Self {
        Self::default()
    }

    /// Post the clearing result for an open auction. Enforces price
    /// protection: a partial fill must clear at least pro-rata against
    /// the request's `min_buy_amount`.
    pub fn post_clearing(&mut self, auction_id: u64, sold: Fix, bought: Fix) -> Result<()> {
        let auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or_else(|| Error::VenueError(format!("unknown auction {}", auction_id)))?;
        if auction.settled {
            return Err(Error::VenueError(format!("auction {} already settled", auction_id)));
        }
        if sold > auction.request.sell_amount {
            return Err(Error::VenueError("clearing exceeds sell amount".into()));
        }
        if !sold.is_zero() {
            // bought / sold must be at least min_buy / sell_amount
            let floor = auction.request.min_buy_amount.mul_div(
                sold,
                auction.request.sell_amount,
                Rounding::Floor,
            )?;
            if bought < floor {
                return Err(Error::VenueError(format!(
                    "clearing price below protection: bought {}, floor {}",
                    bought, floor
                )));
            }
        }
        auction.clearing = Some(Clearing { sold, bought });
        Ok(())
    }

    /// Fill an auction completely at exactly its protected price
    pub fn fill_at_min(&mut self, auction_id: u64) -> Result<()> {
        let (sell_amount, min_buy) = {
            let auction = self
                .auctions
                .get(&auction_id)
                .ok_or_else(|| Error::VenueError(format!("unknown auction {}", auction_id)))?;
            (auction.request.sell_amount, auction.request.min_buy_amount)
        };
        self.post_clearing(auction_id, sell_amount, min_buy)
    }

    /// The request backing an open auction
    pub fn request(&self, auction_id: u64) -> Option<&TradeRequest> {
        self.auctions.get(&auction_id).map(|a| &a.request)
    }
}

impl AuctionVenue for ManualVenue {
    fn initiate_auction(&mut self, request: &TradeRequest, _duration_secs: u64) -> Result<u64> {
        if request.sell_amount.is_zero() {
            return Err(Error::VenueError("zero sell amount".into()));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.auctions.insert(
            id,
            PendingAuction { request: request.clone(), clearing: None, settled: false },
        );
        Ok(id)
    }

    fn settle(&mut self, auction_id: u64) -> Result<Clearing> {
        let auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or_else(|| Error::VenueError(format!("unknown auction {}", auction_id)))?;
        if auction.settled {
            return Err(Error::VenueError(format!("auction {} already settled", auction_id)));
        }
        auction.settled = true;
        // No bids: the auction expires unfilled
        Ok(auction.clearing.unwrap_or_default())
    }
}
