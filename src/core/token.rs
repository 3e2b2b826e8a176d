//! Issued-token ledger.
//!
//! Tracks balances and total supply of the stable token together with
//! `baskets_needed`: the number of basket units the outstanding supply is
//! entitled to. Minting and redemption move supply and baskets together;
//! melting burns supply while leaving `baskets_needed` untouched, which is
//! what raises backing-per-token for the remaining holders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::ids::AccountId;
use crate::error::{Error, Result};
use crate::utils::math::{Fix, Rounding};

// ═══════════════════════════════════════════════════════════════════════════════
// STABLE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger for the issued stable token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StableToken {
    /// Balances by account
    balances: HashMap<AccountId, Fix>,
    /// Total outstanding supply
    total_supply: Fix,
    /// Basket units the outstanding supply is entitled to
    baskets_needed: Fix,
}

impl StableToken {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account
    pub fn balance_of(&self, account: &AccountId) -> Fix {
        self.balances.get(account).copied().unwrap_or(Fix::ZERO)
    }

    /// Total outstanding supply
    pub fn total_supply(&self) -> Fix {
        self.total_supply
    }

    /// Basket units the outstanding supply is entitled to
    pub fn baskets_needed(&self) -> Fix {
        self.baskets_needed
    }

    /// Basket units backing one issued token. One basket unit per token at
    /// par; melting pushes this above one.
    pub fn baskets_per_token(&self) -> Fix {
        if self.total_supply.is_zero() {
            Fix::ONE
        } else {
            self.baskets_needed / self.total_supply
        }
    }

    /// Mint `amount` tokens to `to`, entitled to `baskets` basket units
    pub fn mint(&mut self, to: &AccountId, amount: Fix, baskets: Fix) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.total_supply = self.total_supply.checked_add(amount)?;
        self.baskets_needed = self.baskets_needed.checked_add(baskets)?;
        let balance = self.balances.entry(to.clone()).or_insert(Fix::ZERO);
        *balance = balance.checked_add(amount)?;
        Ok(())
    }

    /// Burn `amount` tokens from `from`, releasing `baskets` basket units
    /// of entitlement
    pub fn burn(&mut self, from: &AccountId, amount: Fix, baskets: Fix) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }
        self.balances.insert(from.clone(), balance - amount);
        self.total_supply = self.total_supply.checked_sub(amount)?;
        self.baskets_needed = self.baskets_needed.saturating_sub(baskets);
        Ok(())
    }

    /// Burn `amount` tokens from `from` without releasing basket
    /// entitlement. Used by the furnace: remaining holders gain backing.
    pub fn melt(&mut self, from: &AccountId, amount: Fix) -> Result<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }
        self.balances.insert(from.clone(), balance - amount);
        self.total_supply = self.total_supply.checked_sub(amount)?;
        Ok(())
    }

    /// Credit tokens bought back from circulation, such as auction proceeds
    /// paid by market counterparties. Balance and supply grow together so
    /// every balance stays redeemable; the basket entitlement is untouched,
    /// which is what lets a later melt raise backing per token.
    pub fn credit(&mut self, to: &AccountId, amount: Fix) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.total_supply = self.total_supply.checked_add(amount)?;
        let balance = self.balances.entry(to.clone()).or_insert(Fix::ZERO);
        *balance = balance.checked_add(amount)?;
        Ok(())
    }

    /// Transfer `amount` between accounts
    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Fix) -> Result<()> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount.to_string(),
                available: from_balance.to_string(),
            });
        }
        self.balances.insert(from.clone(), from_balance - amount);
        let to_balance = self.balances.entry(to.clone()).or_insert(Fix::ZERO);
        *to_balance = to_balance.checked_add(amount)?;
        Ok(())
    }

    /// Basket units a redemption of `amount` tokens is entitled to:
    /// `baskets_needed × amount / supply`, rounded down
    pub fn redemption_baskets(&self, amount: Fix) -> Result<Fix> {
        if self.total_supply.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.baskets_needed
            .mul_div(amount, self.total_supply, Rounding::Floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn bob() -> AccountId {
        AccountId::from("bob")
    }

    #[test]
    fn test_mint_and_burn() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(100), Fix::from_integer(100)).unwrap();
        assert_eq!(token.total_supply(), Fix::from_integer(100));
        assert_eq!(token.baskets_needed(), Fix::from_integer(100));
        assert_eq!(token.balance_of(&alice()), Fix::from_integer(100));

        token.burn(&alice(), Fix::from_integer(40), Fix::from_integer(40)).unwrap();
        assert_eq!(token.total_supply(), Fix::from_integer(60));
        assert_eq!(token.baskets_needed(), Fix::from_integer(60));
    }

    #[test]
    fn test_burn_more_than_balance_fails() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(10), Fix::from_integer(10)).unwrap();
        assert!(token.burn(&alice(), Fix::from_integer(11), Fix::from_integer(11)).is_err());
    }

    #[test]
    fn test_transfer() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(10), Fix::from_integer(10)).unwrap();
        token.transfer(&alice(), &bob(), Fix::from_integer(4)).unwrap();
        assert_eq!(token.balance_of(&alice()), Fix::from_integer(6));
        assert_eq!(token.balance_of(&bob()), Fix::from_integer(4));
        assert!(token.transfer(&bob(), &alice(), Fix::from_integer(5)).is_err());
    }

    #[test]
    fn test_melt_raises_baskets_per_token() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(100), Fix::from_integer(100)).unwrap();
        assert_eq!(token.baskets_per_token(), Fix::ONE);

        // Melt 20 from alice: 80 tokens now entitled to 100 baskets
        token.melt(&alice(), Fix::from_integer(20)).unwrap();
        assert_eq!(token.total_supply(), Fix::from_integer(80));
        assert_eq!(token.baskets_needed(), Fix::from_integer(100));
        assert_eq!(token.baskets_per_token(), Fix::from_raw(125 * Fix::SCALE / 100));
    }

    #[test]
    fn test_credit_then_melt_conserves_the_ledger() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(100), Fix::from_integer(100)).unwrap();
        token.credit(&bob(), Fix::from_integer(10)).unwrap();
        assert_eq!(token.total_supply(), Fix::from_integer(110));
        assert_eq!(token.baskets_needed(), Fix::from_integer(100));

        token.melt(&bob(), Fix::from_integer(10)).unwrap();
        assert_eq!(token.total_supply(), Fix::from_integer(100));
        // Alice can still burn her full balance against the supply
        token.burn(&alice(), Fix::from_integer(100), Fix::from_integer(100)).unwrap();
        assert_eq!(token.total_supply(), Fix::ZERO);
    }

    #[test]
    fn test_redemption_baskets_prorata() {
        let mut token = StableToken::new();
        token.mint(&alice(), Fix::from_integer(100), Fix::from_integer(50)).unwrap();
        // 100 supply entitled to 50 baskets: redeeming 10 claims 5
        assert_eq!(
            token.redemption_baskets(Fix::from_integer(10)).unwrap(),
            Fix::from_integer(5)
        );
    }
}
