//! The backing manager: custodian of collateral and recapitalization trader.
//!
//! All collateral backing the issued token sits here. Issuance deposits flow
//! in, redemption withdrawals flow out, and when the basket is not fully
//! collateralized the manager runs one auction at a time, pairing its
//! largest surplus against its largest deficit. With no surplus left it
//! seizes staked insurance units instead. Once fully collateralized, any
//! excess above the backing buffer is handed to the revenue traders.
//!
//! Deposits behind queued issuances wait in a separate escrow that the
//! surplus, deficit and collateralization math never sees, so they can
//! always be refunded in full.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::basket::BasketHandler;
use crate::core::config::ProtocolParams;
use crate::core::ids::TokenId;
use crate::error::{Error, Result};
use crate::registry::AssetRegistry;
use crate::revenue::{Distributor, RevenueKind, RevenueTrader};
use crate::staking::InsurancePool;
use crate::trading::{AuctionVenue, Broker, SettledTrade, TradeRequest, TraderId};
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// BACKING MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Holds the collateral backing the issued token. The sole writer of these
/// balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingManager {
    balances: HashMap<TokenId, Fix>,
    /// Deposits held for queued issuances, excluded from all backing math
    escrow: HashMap<TokenId, Fix>,
}

impl BackingManager {
    /// An empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of one token
    pub fn balance_of(&self, token: &TokenId) -> Fix {
        self.balances.get(token).copied().unwrap_or(Fix::ZERO)
    }

    /// All balances
    pub fn balances(&self) -> &HashMap<TokenId, Fix> {
        &self.balances
    }

    /// Credit tokens (issuance deposits, trade proceeds, claimed rewards)
    pub fn receive(&mut self, token: &TokenId, amount: Fix) {
        if amount.is_zero() {
            return;
        }
        let entry = self.balances.entry(token.clone()).or_insert(Fix::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// Debit tokens (redemption withdrawals, auction lots)
    pub fn release(&mut self, token: &TokenId, amount: Fix) -> Result<()> {
        let held = self.balance_of(token);
        if held < amount {
            return Err(Error::InsufficientBalance {
                required: amount.to_string(),
                available: held.to_string(),
            });
        }
        self.balances.insert(token.clone(), held.saturating_sub(amount));
        Ok(())
    }

    /// Escrowed amount of one token
    pub fn escrow_of(&self, token: &TokenId) -> Fix {
        self.escrow.get(token).copied().unwrap_or(Fix::ZERO)
    }

    /// Hold a queued issuance's deposit apart from the backing balances
    pub fn escrow_receive(&mut self, token: &TokenId, amount: Fix) {
        if amount.is_zero() {
            return;
        }
        let entry = self.escrow.entry(token.clone()).or_insert(Fix::ZERO);
        *entry = entry.saturating_add(amount);
    }

    /// Return an escrowed deposit to its minter
    pub fn escrow_release(&mut self, token: &TokenId, amount: Fix) -> Result<()> {
        let held = self.escrow_of(token);
        if held < amount {
            return Err(Error::InsufficientBalance {
                required: amount.to_string(),
                available: held.to_string(),
            });
        }
        self.escrow.insert(token.clone(), held.saturating_sub(amount));
        Ok(())
    }

    /// Move an escrowed deposit into backing when its issuance vests
    pub fn escrow_promote(&mut self, token: &TokenId, amount: Fix) -> Result<()> {
        self.escrow_release(token, amount)?;
        self.receive(token, amount);
        Ok(())
    }

    /// Per-token amounts required to back `baskets_needed` basket units
    fn needed_amounts(
        &self,
        registry: &AssetRegistry,
        handler: &BasketHandler,
        baskets_needed: Fix,
    ) -> Result<HashMap<TokenId, Fix>> {
        if baskets_needed.is_zero() || handler.basket().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(handler
            .quote(registry, baskets_needed, Rounding::Ceil)?
            .into_iter()
            .collect())
    }

    /// Sweep reward accruals from every collateral adapter into the backing
    /// balances
    pub fn claim_rewards(&mut self, registry: &mut AssetRegistry) -> Vec<(TokenId, Fix)> {
        let mut claimed = Vec::new();
        for collateral in registry.collateral_mut() {
            if let Some((token, amount)) = collateral.claim_rewards() {
                self.receive(&token, amount);
                claimed.push((token, amount));
            }
        }
        self.balances.retain(|_, v| !v.is_zero());
        claimed
    }

    /// One step of recapitalization: open at most one auction pairing the
    /// largest surplus against the largest deficit, by value.
    ///
    /// Does nothing while a backing trade is open, during the post-switch
    /// trading delay, or when the basket is fully collateralized. With no
    /// surplus above the dust floor, staked insurance units are seized and
    /// sold instead. Returns the opened trade's id, if any.
    #[allow(clippy::too_many_arguments)]
    pub fn rebalance(
        &mut self,
        registry: &AssetRegistry,
        handler: &BasketHandler,
        baskets_needed: Fix,
        params: &ProtocolParams,
        broker: &mut Broker,
        venue: &mut dyn AuctionVenue,
        insurance: &mut InsurancePool,
        insurance_token: &TokenId,
        now: u64,
    ) -> Result<Option<String>> {
        if broker.has_any_open(TraderId::BackingManager) {
            return Ok(None);
        }
        if now < handler.basket().timestamp + params.trading_delay_secs {
            return Ok(None);
        }
        if handler.fully_collateralized(registry, &self.balances, baskets_needed) {
            return Ok(None);
        }

        let needed = self.needed_amounts(registry, handler, baskets_needed)?;

        // Largest surplus and largest deficit across registered assets
        let mut surplus: Option<(TokenId, Fix, Fix, Fix)> = None; // (token, amount, price, value)
        let mut deficit: Option<(TokenId, Fix, Fix, Fix)> = None;
        for token in registry.tokens() {
            let Ok(price) = registry.to_asset(token).and_then(|a| a.price(now)) else {
                continue;
            };
            let held = self.balance_of(token);
            let required = needed.get(token).copied().unwrap_or(Fix::ZERO);
            if held > required {
                let amount = held.saturating_sub(required);
                let value = amount.mul_rounding(price, Rounding::Floor);
                if value >= params.dust_amount
                    && surplus.as_ref().map_or(true, |(_, _, _, v)| value > *v)
                {
                    surplus = Some((token.clone(), amount, price, value));
                }
            } else if required > held {
                let amount = required.saturating_sub(held);
                let value = amount.mul_rounding(price, Rounding::Ceil);
                if value >= params.dust_amount
                    && deficit.as_ref().map_or(true, |(_, _, _, v)| value > *v)
                {
                    deficit = Some((token.clone(), amount, price, value));
                }
            }
        }

        let Some((buy_token, _, buy_price, deficit_value)) = deficit else {
            return Ok(None);
        };

        let (sell_token, sell_amount, sell_price) = match surplus {
            Some((token, available, price, _)) => {
                // Sell no more than needed to cover the deficit
                let cover = deficit_value.div_rounding(price, Rounding::Ceil)?;
                (token, available.min(cover), price)
            }
            None => {
                // No surplus left: seize staked insurance and sell it
                let price = registry.to_asset(insurance_token)?.price(now)?;
                let units = deficit_value.div_rounding(price, Rounding::Ceil)?;
                let seized = insurance.seize(units);
                if seized.is_zero() {
                    return Ok(None);
                }
                self.receive(insurance_token, seized);
                (insurance_token.clone(), seized, price)
            }
        };

        let cap = registry
            .to_asset(&sell_token)?
            .max_sell_amount(params.max_trade_volume, sell_price)?;
        let sell_amount = sell_amount.min(cap);
        if sell_amount.is_zero() {
            return Ok(None);
        }

        let gross = sell_amount.mul_div(sell_price, buy_price, Rounding::Floor)?;
        let min_buy = gross.mul_rounding(
            Fix::ONE.saturating_sub(params.max_trade_slippage),
            Rounding::Floor,
        );

        self.release(&sell_token, sell_amount)?;
        let request = TradeRequest {
            sell: sell_token,
            buy: buy_token,
            sell_amount,
            min_buy_amount: min_buy,
        };
        let id = broker.open_trade(TraderId::BackingManager, request, venue, now)?;
        Ok(Some(id))
    }

    /// Absorb a settlement: bank the proceeds and restore the unsold
    /// remainder
    pub fn absorb(&mut self, settled: &SettledTrade) {
        self.receive(&settled.trade.request.buy, settled.clearing.bought);
        self.receive(&settled.trade.request.sell, settled.unsold);
    }

    /// Forward balances above the buffered backing requirement to the
    /// revenue traders, split by the distribution table's flavor totals.
    /// Only runs while fully collateralized. Returns the per-token amounts
    /// handed out.
    pub fn handout_excess(
        &mut self,
        registry: &AssetRegistry,
        handler: &BasketHandler,
        baskets_needed: Fix,
        params: &ProtocolParams,
        distributor: &Distributor,
        stable_trader: &mut RevenueTrader,
        insurance_trader: &mut RevenueTrader,
    ) -> Result<Vec<(TokenId, Fix)>> {
        if !handler.fully_collateralized(registry, &self.balances, baskets_needed) {
            return Ok(Vec::new());
        }
        let stable_total = distributor.total(RevenueKind::Stable);
        let insurance_total = distributor.total(RevenueKind::Insurance);
        let grand = stable_total + insurance_total;
        if grand == 0 {
            return Ok(Vec::new());
        }

        let needed = self.needed_amounts(registry, handler, baskets_needed)?;
        let buffer_factor = Fix::ONE.saturating_add(params.backing_buffer);

        let mut handed = Vec::new();
        for token in registry.tokens() {
            let required = needed
                .get(token)
                .copied()
                .unwrap_or(Fix::ZERO)
                .mul_rounding(buffer_factor, Rounding::Ceil);
            let held = self.balance_of(token);
            if held <= required {
                continue;
            }
            let excess = held.saturating_sub(required);

            let to_stable = excess.mul_div(
                Fix::from_integer(stable_total),
                Fix::from_integer(grand),
                Rounding::Floor,
            )?;
            let to_insurance = excess.saturating_sub(to_stable);

            self.release(token, excess)?;
            stable_trader.receive(token, to_stable);
            insurance_trader.receive(token, to_insurance);
            handed.push((token.clone(), excess));
        }
        Ok(handed)
    }
}
