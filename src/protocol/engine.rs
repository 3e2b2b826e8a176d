//! The protocol engine: one struct owning every component.
//!
//! `Protocol` wires the registry, basket handler, backing manager, token
//! ledger, revenue pipeline, furnace, insurance pool and issuance queue
//! together, and owns the logical clock they all read. Every state
//! transition is a method call; deferred work (queued issuance, open
//! auctions, melting) advances through repeated `poke`, `run_auctions` and
//! `settle_trades` calls as the driver moves the clock.

use serde::{Deserialize, Serialize};

use crate::auth::Authorizer;
use crate::backing::BackingManager;
use crate::basket::{BasketHandler, SwitchOutcome};
use crate::collateral::{Asset, CollateralStatus};
use crate::core::config::ProtocolParams;
use crate::core::ids::{AccountId, TargetUnit, TokenId};
use crate::core::token::StableToken;
use crate::error::{Error, Result};
use crate::furnace::Furnace;
use crate::issuance::IssuanceQueue;
use crate::protocol::events::{EventLog, ProtocolEvent};
use crate::registry::AssetRegistry;
use crate::revenue::{Destination, Distributor, RevenueKind, RevenueShare, RevenueTrader};
use crate::staking::InsurancePool;
use crate::trading::{AuctionVenue, Broker, TraderId};
use crate::utils::constants::SECS_PER_BLOCK;
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Logical clock: block height plus wall time, advanced by the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Block height
    pub block: u64,
    /// Timestamp in seconds
    pub time: u64,
}

/// How an issuance request was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Minted immediately; the listed deposits were taken
    Instant {
        /// Collateral deposited
        deposits: Vec<(TokenId, Fix)>,
    },
    /// Queued behind the per-block rate limit
    Queued {
        /// Record id, usable with `cancel_issuance`
        id: String,
        /// Collateral deposited, held until vesting or refund
        deposits: Vec<(TokenId, Fix)>,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

/// The complete protocol state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    params: ProtocolParams,
    auth: Authorizer,
    registry: AssetRegistry,
    basket: BasketHandler,
    backing: BackingManager,
    token: StableToken,
    distributor: Distributor,
    stable_trader: RevenueTrader,
    insurance_trader: RevenueTrader,
    broker: Broker,
    furnace: Furnace,
    insurance: InsurancePool,
    issuance: IssuanceQueue,
    events: EventLog,
    insurance_token: TokenId,
    clock: Clock,
}

impl Protocol {
    /// Create a fresh protocol. `issued_token` names the stable token the
    /// protocol mints; `insurance_token` is the staked unit and must be
    /// registered as a priced asset before recapitalization can seize it.
    pub fn new(
        params: ProtocolParams,
        owner: AccountId,
        issued_token: TokenId,
        insurance_token: TokenId,
    ) -> Result<Self> {
        if !params.validate() {
            return Err(Error::InvalidParameter {
                name: "params".into(),
                reason: "out-of-range protocol parameters".into(),
            });
        }
        Ok(Self {
            auth: Authorizer::new(owner),
            registry: AssetRegistry::new(),
            basket: BasketHandler::new(),
            backing: BackingManager::new(),
            token: StableToken::new(),
            distributor: Distributor::default(),
            stable_trader: RevenueTrader::new(TraderId::StableTrader, issued_token),
            insurance_trader: RevenueTrader::new(TraderId::InsuranceTrader, insurance_token.clone()),
            broker: Broker::new(params.auction_length_secs),
            furnace: Furnace::new(params.melting_period_secs),
            insurance: InsurancePool::new(),
            issuance: IssuanceQueue::new(),
            events: EventLog::new(),
            insurance_token,
            clock: Clock::default(),
            params,
        })
    }

    /// The ledger account holding issued tokens pending melt
    pub fn furnace_account() -> AccountId {
        AccountId::from("furnace")
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLOCK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current clock
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Advance the clock by whole blocks
    pub fn advance_blocks(&mut self, blocks: u64) {
        self.clock.block += blocks;
        self.clock.time += blocks * SECS_PER_BLOCK;
    }

    /// Advance the clock by seconds, moving block height along with it
    pub fn advance_secs(&mut self, secs: u64) {
        self.clock.time += secs;
        self.clock.block += secs / SECS_PER_BLOCK;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Protocol parameters
    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// The asset registry
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// The basket handler
    pub fn basket(&self) -> &BasketHandler {
        &self.basket
    }

    /// The backing manager
    pub fn backing(&self) -> &BackingManager {
        &self.backing
    }

    /// The issued-token ledger
    pub fn token(&self) -> &StableToken {
        &self.token
    }

    /// The distribution table
    pub fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    /// The broker
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// The furnace
    pub fn furnace(&self) -> &Furnace {
        &self.furnace
    }

    /// The insurance pool
    pub fn insurance_pool(&self) -> &InsurancePool {
        &self.insurance
    }

    /// The issuance queue
    pub fn issuance_queue(&self) -> &IssuanceQueue {
        &self.issuance
    }

    /// The event log
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Worst collateral status across the current basket
    pub fn basket_status(&self) -> CollateralStatus {
        self.basket.status(&self.registry)
    }

    /// Whether held collateral covers the outstanding supply's basket
    /// entitlement
    pub fn fully_collateralized(&self) -> bool {
        self.basket.fully_collateralized(
            &self.registry,
            self.backing.balances(),
            self.token.baskets_needed(),
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GOVERNANCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register an asset. Owner-gated; registering an identical asset twice
    /// is a no-op.
    pub fn register_asset(&mut self, caller: &AccountId, asset: Asset) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        let token = asset.token().clone();
        if self.registry.register(asset)? {
            self.events.record(ProtocolEvent::AssetRegistered { token });
        }
        Ok(())
    }

    /// Unregister an asset. Owner-gated; the exact registered asset must be
    /// presented.
    pub fn unregister_asset(&mut self, caller: &AccountId, asset: &Asset) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        self.registry.unregister(asset)?;
        self.events.record(ProtocolEvent::AssetUnregistered {
            token: asset.token().clone(),
        });
        Ok(())
    }

    /// Replace the adapter for an already registered token in place.
    /// Owner-gated.
    pub fn swap_asset(&mut self, caller: &AccountId, asset: Asset) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        let token = asset.token().clone();
        self.registry.swap_registered(asset)?;
        self.events.record(ProtocolEvent::AssetSwapped { token });
        Ok(())
    }

    /// Replace the prime basket. Owner-gated; takes effect at the next
    /// `switch_basket`.
    pub fn set_prime_basket(
        &mut self,
        caller: &AccountId,
        tokens: Vec<TokenId>,
        weights: Vec<Fix>,
    ) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        let entries = tokens.len();
        self.basket.set_prime_basket(&self.registry, tokens, weights)?;
        self.events.record(ProtocolEvent::PrimeBasketSet { entries });
        Ok(())
    }

    /// Replace one target unit's backup list. Owner-gated.
    pub fn set_backup_config(
        &mut self,
        caller: &AccountId,
        target_unit: TargetUnit,
        min_count: usize,
        tokens: Vec<TokenId>,
    ) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        self.basket
            .set_backup_config(&self.registry, target_unit.clone(), min_count, tokens)?;
        self.events.record(ProtocolEvent::BackupConfigSet { target_unit });
        Ok(())
    }

    /// Recompute the current basket from prime and backup configuration.
    /// Owner-gated. Bumps the nonce, which refunds all queued issuances on
    /// the next `poke`.
    pub fn switch_basket(&mut self, caller: &AccountId) -> Result<SwitchOutcome> {
        self.auth.ensure_owner(caller)?;
        let outcome = self.basket.switch_basket(&mut self.registry, self.clock.time)?;
        self.events.record(ProtocolEvent::BasketSwitched {
            nonce: outcome.nonce,
            resolved: outcome.resolved,
        });
        Ok(outcome)
    }

    /// Set one destination's revenue shares. Owner-gated.
    pub fn set_distribution(
        &mut self,
        caller: &AccountId,
        dest: Destination,
        share: RevenueShare,
    ) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        self.distributor.set_distribution(dest, share)?;
        self.events.record(ProtocolEvent::DistributionSet);
        Ok(())
    }

    /// Replace the protocol parameters. Owner-gated; the broker and furnace
    /// pick up the new auction length and melting period for future trades
    /// and deposits.
    pub fn set_params(&mut self, caller: &AccountId, params: ProtocolParams) -> Result<()> {
        self.auth.ensure_owner(caller)?;
        if !params.validate() {
            return Err(Error::InvalidParameter {
                name: "params".into(),
                reason: "out-of-range protocol parameters".into(),
            });
        }
        self.broker.set_auction_length(params.auction_length_secs)?;
        self.furnace.set_period(params.melting_period_secs);
        self.params = params;
        Ok(())
    }

    /// Hand ownership to another account. Owner-gated.
    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<()> {
        self.auth.transfer_ownership(caller, new_owner)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ISSUANCE AND REDEMPTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Issue `amount` stable tokens to `minter` against a basket-unit
    /// deposit at current rates.
    ///
    /// The basket must be SOUND. Minting happens now if the amount fits the
    /// block's remaining capacity and nothing is queued ahead; the deposits
    /// then move straight into backing. Otherwise the request joins the
    /// queue and its deposits wait in escrow until vesting or refund.
    pub fn issue(&mut self, minter: &AccountId, amount: Fix) -> Result<IssueOutcome> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.registry.refresh_all(self.clock.time);
        let status = self.basket.status(&self.registry);
        if status != CollateralStatus::Sound {
            return Err(Error::BasketNotSound(format!("basket status is {:?}", status)));
        }

        let baskets = amount.mul_rounding(self.token.baskets_per_token(), Rounding::Ceil);
        let deposits = self.basket.quote(&self.registry, baskets, Rounding::Ceil)?;
        let supply = self.token.total_supply();

        if self
            .issuance
            .fits_instantly(&self.params, supply, amount, self.clock.block)
        {
            for (token, quantity) in &deposits {
                self.backing.receive(token, *quantity);
            }
            self.issuance
                .note_instant(&self.params, supply, amount, self.clock.block)?;
            self.token.mint(minter, amount, baskets)?;
            self.events.record(ProtocolEvent::IssuanceCompleted {
                minter: minter.clone(),
                amount,
            });
            return Ok(IssueOutcome::Instant { deposits });
        }

        for (token, quantity) in &deposits {
            self.backing.escrow_receive(token, *quantity);
        }
        let id = self.issuance.enqueue(
            minter.clone(),
            amount,
            baskets,
            deposits.clone(),
            self.basket.nonce(),
            &self.params,
            supply,
            self.clock.block,
        )?;
        self.events.record(ProtocolEvent::IssuanceStarted {
            id: id.clone(),
            minter: minter.clone(),
            amount,
        });
        Ok(IssueOutcome::Queued { id, deposits })
    }

    /// Cancel a queued issuance. Only its minter may cancel; the deposits
    /// are returned in full.
    pub fn cancel_issuance(
        &mut self,
        minter: &AccountId,
        id: &str,
    ) -> Result<Vec<(TokenId, Fix)>> {
        let record = self.issuance.cancel(id, minter)?;
        for (token, quantity) in &record.deposits {
            self.backing.escrow_release(token, *quantity)?;
        }
        self.events.record(ProtocolEvent::IssuanceCanceled {
            id: record.id,
            minter: record.minter,
            amount: record.amount,
        });
        Ok(record.deposits)
    }

    /// Redeem `amount` stable tokens for a pro-rata share of held
    /// collateral at current rates. Always available, even while
    /// undercollateralized; each constituent payout is capped by the
    /// redeemer's pro-rata share of what is actually held. When the basket
    /// is unresolved there is nothing to quote, so the payout is a pro-rata
    /// slice of every held backing balance instead.
    pub fn redeem(&mut self, account: &AccountId, amount: Fix) -> Result<Vec<(TokenId, Fix)>> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.registry.refresh_all(self.clock.time);
        let supply = self.token.total_supply();
        let baskets = self.token.redemption_baskets(amount)?;

        let payouts = if self.basket.basket().is_empty() {
            let mut held: Vec<(TokenId, Fix)> = self
                .backing
                .balances()
                .iter()
                .filter(|(_, balance)| !balance.is_zero())
                .map(|(token, balance)| (token.clone(), *balance))
                .collect();
            held.sort_by(|a, b| a.0.cmp(&b.0));

            let mut payouts = Vec::with_capacity(held.len());
            for (token, balance) in held {
                let share = balance.mul_div(amount, supply, Rounding::Floor)?;
                payouts.push((token, share));
            }
            payouts
        } else {
            let quote = self.basket.quote(&self.registry, baskets, Rounding::Floor)?;
            let mut payouts = Vec::with_capacity(quote.len());
            for (token, quantity) in quote {
                let held = self.backing.balance_of(&token);
                let prorata = held.mul_div(amount, supply, Rounding::Floor)?;
                payouts.push((token, quantity.min(prorata)));
            }
            payouts
        };

        self.token.burn(account, amount, baskets)?;
        for (token, quantity) in &payouts {
            self.backing.release(token, *quantity)?;
        }
        self.events.record(ProtocolEvent::Redeemed {
            account: account.clone(),
            amount,
            baskets,
        });
        Ok(payouts)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAKING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stake insurance units; returns the pool shares issued
    pub fn stake(&mut self, account: &AccountId, amount: Fix) -> Result<Fix> {
        let shares = self.insurance.stake(account, amount)?;
        self.events.record(ProtocolEvent::Staked {
            account: account.clone(),
            amount,
        });
        Ok(shares)
    }

    /// Burn pool shares; returns the insurance units released
    pub fn unstake(&mut self, account: &AccountId, shares: Fix) -> Result<Fix> {
        let amount = self.insurance.unstake(account, shares)?;
        self.events.record(ProtocolEvent::Unstaked {
            account: account.clone(),
            amount,
        });
        Ok(amount)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEFERRED WORK
    // ═══════════════════════════════════════════════════════════════════════════

    /// One maintenance pass: refresh collateral, melt vested furnace
    /// batches, and vest or refund queued issuances. Idempotent at a fixed
    /// clock.
    pub fn poke(&mut self) -> Result<()> {
        self.registry.refresh_all(self.clock.time);

        let melted = self.furnace.melt(self.clock.time)?;
        if !melted.is_zero() {
            self.token.melt(&Self::furnace_account(), melted)?;
            self.events.record(ProtocolEvent::Melted { amount: melted });
        }

        // Records leave the queue only after their refund or mint has been
        // applied, so a failure here leaves them retryable
        let outcome = self.issuance.vest_ready(self.clock.block, self.basket.nonce());
        for record in outcome.refunded {
            for (token, quantity) in &record.deposits {
                self.backing.escrow_release(token, *quantity)?;
            }
            self.issuance.remove(&record.id)?;
            self.events.record(ProtocolEvent::IssuanceCanceled {
                id: record.id,
                minter: record.minter,
                amount: record.amount,
            });
        }
        for record in outcome.vested {
            for (token, quantity) in &record.deposits {
                self.backing.escrow_promote(token, *quantity)?;
            }
            self.token.mint(&record.minter, record.amount, record.baskets)?;
            self.issuance.remove(&record.id)?;
            self.events.record(ProtocolEvent::IssuanceCompleted {
                minter: record.minter,
                amount: record.amount,
            });
        }
        Ok(())
    }

    /// Push a fresh oracle observation for one asset's feed
    pub fn set_feed_price(&mut self, token: &TokenId, price: Fix) -> Result<()> {
        let now = self.clock.time;
        match self.registry.get_mut(token)? {
            Asset::Collateral(c) => c.feed.set_price(price, now),
            Asset::Plain { feed, .. } => feed.set_price(price, now),
        }
        Ok(())
    }

    /// Mark an asset's feed available or unavailable
    pub fn set_feed_unavailable(&mut self, token: &TokenId, unavailable: bool) -> Result<()> {
        match self.registry.get_mut(token)? {
            Asset::Collateral(c) => c.feed.set_unavailable(unavailable),
            Asset::Plain { feed, .. } => feed.set_unavailable(unavailable),
        }
        Ok(())
    }

    /// Record externally reported reward accrual for one collateral
    pub fn accrue_rewards(&mut self, token: &TokenId, amount: Fix) -> Result<()> {
        let asset = self.registry.get_mut(token)?;
        let collateral = asset
            .as_collateral_mut()
            .ok_or_else(|| Error::NotCollateral(token.to_string()))?;
        collateral.accrue_rewards(amount);
        Ok(())
    }

    /// Sweep reward accruals from collateral adapters into backing
    pub fn claim_rewards(&mut self) -> Result<()> {
        for (token, amount) in self.backing.claim_rewards(&mut self.registry) {
            self.events.record(ProtocolEvent::RewardsClaimed { token, amount });
        }
        Ok(())
    }

    /// One trading pass: a recapitalization auction if backing is short,
    /// otherwise excess handout and revenue auctions.
    pub fn run_auctions(&mut self, venue: &mut dyn AuctionVenue) -> Result<()> {
        self.registry.refresh_all(self.clock.time);
        self.claim_rewards()?;

        let staked_before = self.insurance.total_staked();
        if let Some(id) = self.backing.rebalance(
            &self.registry,
            &self.basket,
            self.token.baskets_needed(),
            &self.params,
            &mut self.broker,
            venue,
            &mut self.insurance,
            &self.insurance_token,
            self.clock.time,
        )? {
            let seized = staked_before.saturating_sub(self.insurance.total_staked());
            if !seized.is_zero() {
                self.events.record(ProtocolEvent::InsuranceSeized { amount: seized });
            }
            self.record_trade_started(&id)?;
            return Ok(());
        }

        for (token, amount) in self.backing.handout_excess(
            &self.registry,
            &self.basket,
            self.token.baskets_needed(),
            &self.params,
            &self.distributor,
            &mut self.stable_trader,
            &mut self.insurance_trader,
        )? {
            self.events.record(ProtocolEvent::ExcessDistributed { token, amount });
        }

        for token in self.stable_trader.held_tokens() {
            if let Some(id) = self.stable_trader.manage_token(
                &token,
                &self.registry,
                &self.params,
                &mut self.broker,
                venue,
                self.clock.time,
            )? {
                self.record_trade_started(&id)?;
            }
        }
        for token in self.insurance_trader.held_tokens() {
            if let Some(id) = self.insurance_trader.manage_token(
                &token,
                &self.registry,
                &self.params,
                &mut self.broker,
                venue,
                self.clock.time,
            )? {
                self.record_trade_started(&id)?;
            }
        }

        self.forward_revenue()?;
        Ok(())
    }

    fn record_trade_started(&mut self, id: &str) -> Result<()> {
        let trade = self.broker.trade(id)?;
        self.events.record(ProtocolEvent::TradeStarted {
            id: trade.id.clone(),
            sell: trade.request.sell.clone(),
            buy: trade.request.buy.clone(),
            sell_amount: trade.request.sell_amount,
        });
        Ok(())
    }

    /// Push accumulated target-token revenue through the distribution table
    fn forward_revenue(&mut self) -> Result<()> {
        let stable = self.stable_trader.take_target();
        if !stable.is_zero() {
            for (dest, cut) in self.distributor.distribute(RevenueKind::Stable, stable)? {
                match dest {
                    Destination::Furnace => {
                        self.token.credit(&Self::furnace_account(), cut)?;
                        self.furnace.notify_of_deposit(cut, self.clock.time);
                    }
                    Destination::External(account) => {
                        self.token.credit(&account, cut)?;
                    }
                    // set_distribution forbids stable shares here
                    Destination::InsurancePool => {}
                }
                self.events.record(ProtocolEvent::RevenueDistributed { amount: cut });
            }
        }

        let insurance = self.insurance_trader.take_target();
        if !insurance.is_zero() {
            for (dest, cut) in self.distributor.distribute(RevenueKind::Insurance, insurance)? {
                match dest {
                    Destination::InsurancePool => {
                        // Without stakers the pool cannot absorb revenue;
                        // hold it at the trader for a later pass
                        if self.insurance.add_revenue(cut).is_err() {
                            self.insurance_trader.receive(&self.insurance_token, cut);
                            continue;
                        }
                    }
                    // External payouts of insurance units leave the tracked
                    // ledger; the event is the whole effect
                    Destination::External(_) => {}
                    Destination::Furnace => {}
                }
                self.events.record(ProtocolEvent::RevenueDistributed { amount: cut });
            }
        }
        Ok(())
    }

    /// Settle every trade whose auction has ended, routing proceeds back to
    /// the trader that opened it
    pub fn settle_trades(&mut self, venue: &mut dyn AuctionVenue) -> Result<()> {
        for id in self.broker.settleable(self.clock.time) {
            let settled = self.broker.settle_trade(&id, venue, self.clock.time)?;
            match settled.trade.trader {
                TraderId::BackingManager => self.backing.absorb(&settled),
                TraderId::StableTrader => self.stable_trader.absorb(&settled),
                TraderId::InsuranceTrader => self.insurance_trader.absorb(&settled),
            }
            self.events.record(ProtocolEvent::TradeSettled {
                id: settled.trade.id,
                sold: settled.clearing.sold,
                bought: settled.clearing.bought,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collateral::feed::PriceFeed;
    use crate::collateral::{Collateral, RateMechanism};
    use crate::trading::ManualVenue;

    fn owner() -> AccountId {
        AccountId::from("owner")
    }

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn usd_collateral(symbol: &str) -> Asset {
        Asset::Collateral(
            Collateral::new(
                TokenId::from(symbol),
                TargetUnit::from("USD"),
                PriceFeed::new(symbol, Fix::ONE, 0).with_max_age(u64::MAX),
                RateMechanism::StaticRate,
            )
            .with_delay_until_default(86_400),
        )
    }

    fn protocol() -> Protocol {
        let mut p = Protocol::new(
            ProtocolParams::default(),
            owner(),
            TokenId::from("BUSD"),
            TokenId::from("INSR"),
        )
        .unwrap();
        p.register_asset(&owner(), usd_collateral("USDC")).unwrap();
        p.register_asset(&owner(), usd_collateral("USDT")).unwrap();
        p.register_asset(
            &owner(),
            Asset::Plain {
                token: TokenId::from("INSR"),
                feed: PriceFeed::new("INSR", Fix::ONE, 0).with_max_age(u64::MAX),
                max_trade_volume: None,
            },
        )
        .unwrap();
        p.set_prime_basket(
            &owner(),
            vec![TokenId::from("USDC"), TokenId::from("USDT")],
            vec![Fix::from_raw(Fix::SCALE / 2), Fix::from_raw(Fix::SCALE / 2)],
        )
        .unwrap();
        p.switch_basket(&owner()).unwrap();
        p
    }

    #[test]
    fn test_instant_issue_and_redeem_round_trip() {
        let mut p = protocol();
        let outcome = p.issue(&alice(), Fix::from_integer(100)).unwrap();
        let IssueOutcome::Instant { deposits } = outcome else {
            panic!("expected instant issuance");
        };
        assert_eq!(deposits.len(), 2);
        assert_eq!(p.token().total_supply(), Fix::from_integer(100));
        assert!(p.fully_collateralized());

        let payouts = p.redeem(&alice(), Fix::from_integer(100)).unwrap();
        assert_eq!(payouts.len(), 2);
        for (_, quantity) in &payouts {
            assert_eq!(*quantity, Fix::from_integer(50));
        }
        assert_eq!(p.token().total_supply(), Fix::ZERO);
    }

    #[test]
    fn test_large_issuance_queues_and_vests() {
        let mut p = protocol();
        let outcome = p.issue(&alice(), Fix::from_integer(50_000)).unwrap();
        assert!(matches!(outcome, IssueOutcome::Queued { .. }));
        assert_eq!(p.token().total_supply(), Fix::ZERO);

        p.advance_blocks(4);
        p.poke().unwrap();
        assert_eq!(p.token().total_supply(), Fix::ZERO);

        p.advance_blocks(1);
        p.poke().unwrap();
        assert_eq!(p.token().total_supply(), Fix::from_integer(50_000));
    }

    #[test]
    fn test_basket_switch_refunds_queued_issuance() {
        let mut p = protocol();
        p.issue(&alice(), Fix::from_integer(50_000)).unwrap();
        let escrowed = p.backing().escrow_of(&TokenId::from("USDC"));
        assert!(!escrowed.is_zero());

        p.switch_basket(&owner()).unwrap();
        p.poke().unwrap();

        assert_eq!(p.token().total_supply(), Fix::ZERO);
        assert_eq!(p.backing().escrow_of(&TokenId::from("USDC")), Fix::ZERO);
        assert_eq!(p.events().of_type("issuance_canceled").count(), 1);
    }

    #[test]
    fn test_repeat_issues_in_one_block_hit_the_rate_limit() {
        let mut p = protocol();
        let first = p.issue(&alice(), Fix::from_integer(10_000)).unwrap();
        assert!(matches!(first, IssueOutcome::Instant { .. }));

        // The block's capacity is spent; the next request queues
        let second = p.issue(&alice(), Fix::from_integer(10_000)).unwrap();
        assert!(matches!(second, IssueOutcome::Queued { .. }));
        assert_eq!(p.token().total_supply(), Fix::from_integer(10_000));

        p.advance_blocks(2);
        p.poke().unwrap();
        assert_eq!(p.token().total_supply(), Fix::from_integer(20_000));
    }

    #[test]
    fn test_issue_requires_sound_basket() {
        let mut p = protocol();
        let mut bad = usd_collateral("USDC");
        if let Asset::Collateral(c) = &mut bad {
            c.feed.set_price(Fix::from_raw(80 * Fix::SCALE / 100), 0);
        }
        p.swap_asset(&owner(), bad).unwrap();

        assert!(matches!(
            p.issue(&alice(), Fix::ONE),
            Err(Error::BasketNotSound(_))
        ));
    }

    #[test]
    fn test_transient_feed_outage_leaves_status() {
        let mut p = protocol();
        p.set_feed_unavailable(&TokenId::from("USDT"), true).unwrap();
        p.advance_secs(3_600);
        p.poke().unwrap();
        assert_eq!(p.basket_status(), CollateralStatus::Sound);

        p.set_feed_unavailable(&TokenId::from("USDT"), false).unwrap();
        p.poke().unwrap();
        assert_eq!(p.basket_status(), CollateralStatus::Sound);
    }

    #[test]
    fn test_governance_is_owner_gated() {
        let mut p = protocol();
        assert!(matches!(
            p.switch_basket(&alice()),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            p.set_prime_basket(&alice(), vec![TokenId::from("USDC")], vec![Fix::ONE]),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_revenue_pipeline_melts_into_backing() {
        let mut p = protocol();
        p.issue(&alice(), Fix::from_integer(100)).unwrap();

        // Hand the stable trader bought-back issued tokens directly and
        // forward them; the furnace holds all issued-token shares
        p.stable_trader.receive(&TokenId::from("BUSD"), Fix::from_integer(10));
        let mut venue = ManualVenue::new();
        p.run_auctions(&mut venue).unwrap();

        assert_eq!(p.furnace().pending(), Fix::from_integer(10));
        assert_eq!(
            p.token().balance_of(&Protocol::furnace_account()),
            Fix::from_integer(10)
        );

        p.advance_secs(p.params().melting_period_secs);
        let before = p.token().baskets_per_token();
        p.poke().unwrap();
        assert_eq!(p.token().balance_of(&Protocol::furnace_account()), Fix::ZERO);
        assert!(p.token().baskets_per_token() > before);
    }

    #[test]
    fn test_full_redemption_survives_revenue_melt() {
        let mut p = protocol();
        p.issue(&alice(), Fix::from_integer(100)).unwrap();

        // Bought-back issued tokens join the tracked supply, so after they
        // melt every remaining balance is still covered
        p.stable_trader.receive(&TokenId::from("BUSD"), Fix::from_integer(10));
        let mut venue = ManualVenue::new();
        p.run_auctions(&mut venue).unwrap();
        assert_eq!(p.token().total_supply(), Fix::from_integer(110));

        p.advance_secs(p.params().melting_period_secs);
        p.poke().unwrap();
        assert_eq!(p.token().total_supply(), Fix::from_integer(100));

        let payouts = p.redeem(&alice(), Fix::from_integer(100)).unwrap();
        assert_eq!(payouts.len(), 2);
        assert_eq!(p.token().balance_of(&alice()), Fix::ZERO);
        assert_eq!(p.token().total_supply(), Fix::ZERO);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut p = protocol();
        p.issue(&alice(), Fix::from_integer(100)).unwrap();

        let bytes = bincode::serialize(&p).unwrap();
        let restored: Protocol = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.token().total_supply(), Fix::from_integer(100));
        assert_eq!(restored.clock(), p.clock());
    }
}
