//! Revenue traders: convert assorted revenue tokens into one target token.
//!
//! Two traders exist, one per revenue flavor. Each holds token balances
//! received from the backing manager, auctions everything that is not its
//! target token, and surrenders accumulated target tokens to the caller for
//! forwarding (to the furnace, or the insurance pool).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::config::ProtocolParams;
use crate::core::ids::TokenId;
use crate::error::Result;
use crate::registry::AssetRegistry;
use crate::trading::{AuctionVenue, Broker, SettledTrade, TradeRequest, TraderId};
use crate::utils::math::{Fix, Rounding};

/// Auctions revenue tokens for a single target token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueTrader {
    id: TraderId,
    target: TokenId,
    balances: HashMap<TokenId, Fix>,
}

impl RevenueTrader {
    /// Create a trader converting everything into `target`
    pub fn new(id: TraderId, target: TokenId) -> Self {
        Self { id, target, balances: HashMap::new() }
    }

    /// This trader's identity
    pub fn id(&self) -> TraderId {
        self.id
    }

    /// The token everything is converted into
    pub fn target(&self) -> &TokenId {
        &self.target
    }

    /// Balance of one token
    pub fn balance_of(&self, token: &TokenId) -> Fix {
        self.balances.get(token).copied().unwrap_or(Fix::ZERO)
    }

    /// Tokens currently held, in sorted order
    pub fn held_tokens(&self) -> Vec<TokenId> {
        let mut tokens: Vec<TokenId> = self
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(t, _)| t.clone())
            .collect();
        tokens.sort();
        tokens
    }

    /// Credit revenue to this trader
    pub fn receive(&mut self, token: &TokenId, amount: Fix) {
        if amount.is_zero() {
            return;
        }
        let entry = self.balances.entry(token.clone()).or_insert(Fix::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// Drain the accumulated target-token balance for forwarding
    pub fn take_target(&mut self) -> Fix {
        self.balances.remove(&self.target).unwrap_or(Fix::ZERO)
    }

    /// Try to auction the held balance of `token` for the target token.
    ///
    /// No trade opens when the token is the target itself, a trade for it is
    /// already open, or its value sits below the dust floor. The sell amount
    /// is capped by the asset's max trade volume and the buy bound carries
    /// the protocol-wide slippage allowance. Returns the trade id if one
    /// opened.
    pub fn manage_token(
        &mut self,
        token: &TokenId,
        registry: &AssetRegistry,
        params: &ProtocolParams,
        broker: &mut Broker,
        venue: &mut dyn AuctionVenue,
        now: u64,
    ) -> Result<Option<String>> {
        if *token == self.target || broker.has_open(self.id, token.as_str()) {
            return Ok(None);
        }
        let balance = self.balance_of(token);
        if balance.is_zero() {
            return Ok(None);
        }

        let sell_asset = registry.to_asset(token)?;
        let sell_price = sell_asset.price(now)?;
        let buy_price = registry.to_asset(&self.target)?.price(now)?;

        let value = balance.mul_rounding(sell_price, Rounding::Floor);
        if value < params.dust_amount {
            return Ok(None);
        }

        let cap = sell_asset.max_sell_amount(params.max_trade_volume, sell_price)?;
        let sell_amount = balance.min(cap);
        if sell_amount.is_zero() {
            return Ok(None);
        }

        let gross = sell_amount.mul_div(sell_price, buy_price, Rounding::Floor)?;
        let min_buy = gross.mul_rounding(
            Fix::ONE.saturating_sub(params.max_trade_slippage),
            Rounding::Floor,
        );

        let request = TradeRequest {
            sell: token.clone(),
            buy: self.target.clone(),
            sell_amount,
            min_buy_amount: min_buy,
        };
        let remaining = balance.saturating_sub(sell_amount);
        self.balances.insert(token.clone(), remaining);
        let id = broker.open_trade(self.id, request, venue, now)?;
        Ok(Some(id))
    }

    /// Absorb a settlement: bank the proceeds and restore the unsold
    /// remainder
    pub fn absorb(&mut self, settled: &SettledTrade) {
        self.receive(&settled.trade.request.buy, settled.clearing.bought);
        self.receive(&settled.trade.request.sell, settled.unsold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collateral::Asset;
    use crate::collateral::feed::PriceFeed;
    use crate::trading::ManualVenue;

    fn plain_asset(symbol: &str, price: u64) -> Asset {
        Asset::Plain {
            token: TokenId::from(symbol),
            feed: PriceFeed::new(symbol, Fix::from_integer(price), 0),
            max_trade_volume: None,
        }
    }

    fn setup() -> (AssetRegistry, ProtocolParams, Broker, ManualVenue) {
        let mut registry = AssetRegistry::new();
        registry.register(plain_asset("COMP", 1)).unwrap();
        registry.register(plain_asset("INSR", 1)).unwrap();
        let params = ProtocolParams::default();
        let broker = Broker::new(params.auction_length_secs);
        (registry, params, broker, ManualVenue::new())
    }

    #[test]
    fn test_auctions_non_target_revenue() {
        let (registry, params, mut broker, mut venue) = setup();
        let mut trader = RevenueTrader::new(TraderId::InsuranceTrader, TokenId::from("INSR"));
        trader.receive(&TokenId::from("COMP"), Fix::from_integer(10));

        let id = trader
            .manage_token(&TokenId::from("COMP"), &registry, &params, &mut broker, &mut venue, 0)
            .unwrap()
            .unwrap();
        let trade = broker.trade(&id).unwrap();
        assert_eq!(trade.request.sell_amount, Fix::from_integer(10));
        // 1% slippage allowance on equal prices
        assert_eq!(trade.request.min_buy_amount, Fix::from_raw(9_900_000_000_000_000_000));
        assert_eq!(trader.balance_of(&TokenId::from("COMP")), Fix::ZERO);
    }

    #[test]
    fn test_target_token_is_never_auctioned() {
        let (registry, params, mut broker, mut venue) = setup();
        let mut trader = RevenueTrader::new(TraderId::InsuranceTrader, TokenId::from("INSR"));
        trader.receive(&TokenId::from("INSR"), Fix::from_integer(5));

        let opened = trader
            .manage_token(&TokenId::from("INSR"), &registry, &params, &mut broker, &mut venue, 0)
            .unwrap();
        assert!(opened.is_none());
        assert_eq!(trader.take_target(), Fix::from_integer(5));
        assert_eq!(trader.take_target(), Fix::ZERO);
    }

    #[test]
    fn test_dust_balances_are_not_auctioned() {
        let (registry, params, mut broker, mut venue) = setup();
        let mut trader = RevenueTrader::new(TraderId::StableTrader, TokenId::from("INSR"));
        // Default dust floor is 0.01 in value terms
        trader.receive(&TokenId::from("COMP"), Fix::from_raw(9_000_000_000_000_000));

        let opened = trader
            .manage_token(&TokenId::from("COMP"), &registry, &params, &mut broker, &mut venue, 0)
            .unwrap();
        assert!(opened.is_none());
    }

    #[test]
    fn test_volume_cap_leaves_remainder_held() {
        let (mut registry, params, mut broker, mut venue) = setup();
        registry
            .swap_registered(Asset::Plain {
                token: TokenId::from("COMP"),
                feed: PriceFeed::new("COMP", Fix::from_integer(1), 0),
                max_trade_volume: Some(Fix::from_integer(6)),
            })
            .unwrap();

        let mut trader = RevenueTrader::new(TraderId::StableTrader, TokenId::from("INSR"));
        trader.receive(&TokenId::from("COMP"), Fix::from_integer(10));

        let id = trader
            .manage_token(&TokenId::from("COMP"), &registry, &params, &mut broker, &mut venue, 0)
            .unwrap()
            .unwrap();
        assert_eq!(broker.trade(&id).unwrap().request.sell_amount, Fix::from_integer(6));
        assert_eq!(trader.balance_of(&TokenId::from("COMP")), Fix::from_integer(4));
    }

    #[test]
    fn test_absorb_settlement() {
        let (registry, params, mut broker, mut venue) = setup();
        let mut trader = RevenueTrader::new(TraderId::InsuranceTrader, TokenId::from("INSR"));
        trader.receive(&TokenId::from("COMP"), Fix::from_integer(10));

        let id = trader
            .manage_token(&TokenId::from("COMP"), &registry, &params, &mut broker, &mut venue, 0)
            .unwrap()
            .unwrap();
        let external = broker.trade(&id).unwrap().external_id;
        venue.fill_at_min(external).unwrap();
        let settled = broker
            .settle_trade(&id, &mut venue, params.auction_length_secs)
            .unwrap();
        trader.absorb(&settled);

        assert_eq!(trader.take_target(), Fix::from_raw(9_900_000_000_000_000_000));
    }
}
