//! Rate-limited FIFO issuance queue.
//!
//! Issuance beyond the per-block capacity is enqueued rather than rejected.
//! Each record carries a fractional finish block computed cumulatively from
//! the record before it, so back-to-back requests vest strictly in order.
//! Instant mints consume the same schedule, so repeated requests within one
//! block queue behind each other instead of each seeing a fresh capacity.
//! Records outlive neither a basket switch (they refund in full on the next
//! poke) nor an explicit cancellation by their minter.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::config::ProtocolParams;
use crate::core::ids::{derive_id, AccountId, TokenId};
use crate::error::{Error, Result};
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// ISSUANCE RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One queued issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRecord {
    /// Content-derived identifier
    pub id: String,
    /// The account minting
    pub minter: AccountId,
    /// Issued-token amount
    pub amount: Fix,
    /// Basket units the amount represented at enqueue time
    pub baskets: Fix,
    /// Collateral already deposited, for minting or refund
    pub deposits: Vec<(TokenId, Fix)>,
    /// Basket nonce at enqueue time; a mismatch at vesting refunds
    pub basket_nonce: u64,
    /// Fractional block at which the record may vest
    pub available_at: Fix,
}

/// The FIFO queue of pending issuances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceQueue {
    queue: VecDeque<IssuanceRecord>,
    /// Finish block of the most recent enqueue; the cumulative schedule tail
    last_available_at: Fix,
    seq: u64,
}

impl IssuanceQueue {
    /// An empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Issued-token amount mintable per block: the configured floor, or the
    /// rate applied to current supply, whichever is greater
    pub fn block_capacity(params: &ProtocolParams, total_supply: Fix) -> Fix {
        params
            .min_block_issuance
            .max(params.issuance_rate.mul_rounding(total_supply, Rounding::Floor))
    }

    /// Whether an `amount` issuance can mint immediately: nothing queued
    /// ahead, and the amount still fits what is left of the current block's
    /// capacity
    pub fn fits_instantly(
        &self,
        params: &ProtocolParams,
        total_supply: Fix,
        amount: Fix,
        current_block: u64,
    ) -> bool {
        if !self.queue.is_empty() {
            return false;
        }
        let capacity = Self::block_capacity(params, total_supply);
        let Ok(blocks) = amount.div_rounding(capacity, Rounding::Ceil) else {
            return false;
        };
        let start = self.last_available_at.max(Fix::from_integer(current_block));
        match start.checked_add(blocks) {
            Ok(finish) => finish <= Fix::from_integer(current_block + 1),
            Err(_) => false,
        }
    }

    /// Consume capacity for an instant mint, so later requests in the same
    /// block queue behind it
    pub fn note_instant(
        &mut self,
        params: &ProtocolParams,
        total_supply: Fix,
        amount: Fix,
        current_block: u64,
    ) -> Result<()> {
        let capacity = Self::block_capacity(params, total_supply);
        let blocks = amount.div_rounding(capacity, Rounding::Ceil)?;
        let start = self.last_available_at.max(Fix::from_integer(current_block));
        self.last_available_at = start.checked_add(blocks)?;
        Ok(())
    }

    /// Pending records, front first
    pub fn pending(&self) -> impl Iterator<Item = &IssuanceRecord> {
        self.queue.iter()
    }

    /// Whether any issuance is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue an issuance. The finish block continues the schedule from the
    /// queue tail, so concurrent requests serialize.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &mut self,
        minter: AccountId,
        amount: Fix,
        baskets: Fix,
        deposits: Vec<(TokenId, Fix)>,
        basket_nonce: u64,
        params: &ProtocolParams,
        total_supply: Fix,
        current_block: u64,
    ) -> Result<String> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let capacity = Self::block_capacity(params, total_supply);
        let blocks = amount.div_rounding(capacity, Rounding::Ceil)?;
        let start = self.last_available_at.max(Fix::from_integer(current_block));
        let available_at = start.checked_add(blocks)?;

        self.seq += 1;
        let id = derive_id("issuance", &[minter.as_str()], self.seq);
        tracing::debug!(
            issuance = %id,
            minter = %minter,
            amount = %amount,
            available_at = %available_at,
            "issuance queued"
        );
        self.queue.push_back(IssuanceRecord {
            id: id.clone(),
            minter,
            amount,
            baskets,
            deposits,
            basket_nonce,
            available_at,
        });
        self.last_available_at = available_at;
        Ok(id)
    }

    /// Everything actionable at `current_block`: records whose basket nonce
    /// went stale (to refund, regardless of position) and, in FIFO order,
    /// records whose finish block has passed (to mint). Records stay queued
    /// until `remove`, so a failed refund or mint can be retried.
    pub fn vest_ready(&self, current_block: u64, current_nonce: u64) -> VestOutcome {
        let refunded: Vec<IssuanceRecord> = self
            .queue
            .iter()
            .filter(|r| r.basket_nonce != current_nonce)
            .cloned()
            .collect();

        let block = Fix::from_integer(current_block);
        let mut vested = Vec::new();
        for record in &self.queue {
            if record.basket_nonce != current_nonce {
                continue;
            }
            if record.available_at > block {
                break;
            }
            vested.push(record.clone());
        }
        VestOutcome { vested, refunded }
    }

    /// Drop one record from the queue, after its refund or mint has been
    /// applied
    pub fn remove(&mut self, id: &str) -> Result<IssuanceRecord> {
        let index = self
            .queue
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::IssuanceNotFound(id.into()))?;
        // remove() is in-bounds; fall back to an impossible error otherwise
        self.queue
            .remove(index)
            .ok_or_else(|| Error::IssuanceNotFound(id.into()))
    }

    /// Cancel one pending issuance. Only its minter may cancel; the record
    /// is returned for refunding.
    pub fn cancel(&mut self, id: &str, minter: &AccountId) -> Result<IssuanceRecord> {
        let record = self
            .queue
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::IssuanceNotFound(id.into()))?;
        if record.minter != *minter {
            return Err(Error::Unauthorized(format!(
                "issuance {} belongs to another account",
                id
            )));
        }
        self.remove(id)
    }
}

/// The result of one vesting pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VestOutcome {
    /// Records to mint, in FIFO order
    pub vested: Vec<IssuanceRecord>,
    /// Records to refund in full
    pub refunded: Vec<IssuanceRecord>,
}
