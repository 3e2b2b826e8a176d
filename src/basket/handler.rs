//! Basket handler: composition, switching, quoting, collateralization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::basket::{Basket, BasketEntry, BackupConfig, PrimeEntry, UnresolvedUnit};
use crate::collateral::CollateralStatus;
use crate::core::ids::{TargetUnit, TokenId};
use crate::error::{Error, Result};
use crate::registry::AssetRegistry;
use crate::utils::constants::{MAX_BACKUP_LIST, MAX_BASKET_SIZE};
use crate::utils::math::{Fix, Rounding};
use crate::utils::validation::{validate_equal_lengths, validate_non_zero};

// ═══════════════════════════════════════════════════════════════════════════════
// BASKET HANDLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Owns the prime basket, backup configurations and the current basket.
/// Sole writer of basket composition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketHandler {
    prime: Vec<PrimeEntry>,
    backups: HashMap<TargetUnit, BackupConfig>,
    current: Basket,
}

/// Outcome of a switch attempt, reported with the basket-set event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchOutcome {
    /// New basket nonce
    pub nonce: u64,
    /// Whether the new basket is resolved
    pub resolved: bool,
    /// Target units left short of backups, when unresolved
    pub unresolved_units: Vec<UnresolvedUnit>,
}

impl BasketHandler {
    /// Create a handler with no basket configured
    pub fn new() -> Self {
        Self::default()
    }

    /// The current basket
    pub fn basket(&self) -> &Basket {
        &self.current
    }

    /// Current basket nonce
    pub fn nonce(&self) -> u64 {
        self.current.nonce
    }

    /// The configured prime basket
    pub fn prime(&self) -> &[PrimeEntry] {
        &self.prime
    }

    /// Backup configuration for a target unit, if set
    pub fn backup_config(&self, unit: &TargetUnit) -> Option<&BackupConfig> {
        self.backups.get(unit)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replace the prime basket. Tokens must be registered collateral;
    /// weights are target units per basket unit. Does not touch the
    /// current basket until the next `switch_basket`.
    pub fn set_prime_basket(
        &mut self,
        registry: &AssetRegistry,
        tokens: Vec<TokenId>,
        weights: Vec<Fix>,
    ) -> Result<()> {
        validate_equal_lengths(tokens.len(), weights.len())?;
        if tokens.is_empty() {
            return Err(Error::EmptyBasket);
        }
        if tokens.len() > MAX_BASKET_SIZE {
            return Err(Error::InvalidParameter {
                name: "tokens".into(),
                reason: format!("basket exceeds {} entries", MAX_BASKET_SIZE),
            });
        }
        for (token, weight) in tokens.iter().zip(&weights) {
            registry.to_collateral(token)?;
            validate_non_zero(*weight, "weight")?;
        }

        self.prime = tokens
            .into_iter()
            .zip(weights)
            .map(|(token, weight)| PrimeEntry { token, weight })
            .collect();
        Ok(())
    }

    /// Replace the backup configuration of one target-unit class
    pub fn set_backup_config(
        &mut self,
        registry: &AssetRegistry,
        target_unit: TargetUnit,
        min_count: usize,
        tokens: Vec<TokenId>,
    ) -> Result<()> {
        if min_count == 0 {
            return Err(Error::InvalidParameter {
                name: "min_count".into(),
                reason: "must be at least 1".into(),
            });
        }
        if tokens.len() > MAX_BACKUP_LIST {
            return Err(Error::InvalidParameter {
                name: "tokens".into(),
                reason: format!("backup list exceeds {} entries", MAX_BACKUP_LIST),
            });
        }
        for token in &tokens {
            let collateral = registry.to_collateral(token)?;
            if collateral.target_unit != target_unit {
                return Err(Error::InvalidParameter {
                    name: "tokens".into(),
                    reason: format!(
                        "backup {} targets {}, expected {}",
                        token, collateral.target_unit, target_unit
                    ),
                });
            }
        }

        self.backups.insert(target_unit, BackupConfig { min_count, tokens });
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SWITCHING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Recompute the current basket from the prime basket, substituting
    /// DISABLED (or unregistered) collateral with backups from its
    /// target-unit list. Forces a refresh pass first so the decision sees
    /// fresh status. Always bumps the nonce, even when the composition is
    /// unchanged, so external automation can detect the switch attempt.
    pub fn switch_basket(
        &mut self,
        registry: &mut AssetRegistry,
        now: u64,
    ) -> Result<SwitchOutcome> {
        if self.prime.is_empty() {
            return Err(Error::EmptyBasket);
        }

        registry.refresh_all(now);

        let mut entries: Vec<BasketEntry> = Vec::new();
        // Target weight still uncovered per target-unit class, in prime order
        let mut missing: Vec<(TargetUnit, Fix)> = Vec::new();

        for entry in &self.prime {
            match registry.to_collateral(&entry.token) {
                Ok(collateral) if collateral.status() != CollateralStatus::Disabled => {
                    // ref units = target weight / target_per_ref
                    let ref_amount =
                        entry.weight.div_rounding(collateral.target_per_ref(), Rounding::Ceil)?;
                    push_entry(&mut entries, entry.token.clone(), ref_amount);
                }
                _ => {
                    let unit = registry
                        .to_collateral(&entry.token)
                        .map(|c| c.target_unit.clone())
                        .unwrap_or_else(|_| self.prime_target_unit_fallback(&entry.token));
                    accumulate(&mut missing, unit, entry.weight);
                }
            }
        }

        let mut unresolved_units = Vec::new();
        for (unit, weight) in missing {
            match self.select_backups(registry, &unit) {
                Ok(backups) => {
                    let share = weight.div_rounding(
                        Fix::from_integer(backups.len() as u64),
                        Rounding::Ceil,
                    )?;
                    for token in backups {
                        let collateral = registry.to_collateral(&token)?;
                        let ref_amount =
                            share.div_rounding(collateral.target_per_ref(), Rounding::Ceil)?;
                        push_entry(&mut entries, token, ref_amount);
                    }
                }
                Err(short) => unresolved_units.push(short),
            }
        }

        let resolved = unresolved_units.is_empty();
        self.current = Basket {
            entries: if resolved { entries } else { Vec::new() },
            nonce: self.current.nonce + 1,
            timestamp: now,
            resolved,
        };

        if resolved {
            tracing::info!(nonce = self.current.nonce, "basket set");
        } else {
            tracing::warn!(
                nonce = self.current.nonce,
                units = unresolved_units.len(),
                "basket unresolved"
            );
        }

        Ok(SwitchOutcome {
            nonce: self.current.nonce,
            resolved,
            unresolved_units,
        })
    }

    /// Pick `min_count` sound backups for a target unit, in list order
    fn select_backups(
        &self,
        registry: &AssetRegistry,
        unit: &TargetUnit,
    ) -> std::result::Result<Vec<TokenId>, UnresolvedUnit> {
        let config = self.backups.get(unit);
        let required = config.map(|c| c.min_count).unwrap_or(1);
        let mut chosen = Vec::new();

        if let Some(config) = config {
            for token in &config.tokens {
                if chosen.len() == required {
                    break;
                }
                if let Ok(collateral) = registry.to_collateral(token) {
                    if collateral.status() == CollateralStatus::Sound {
                        chosen.push(token.clone());
                    }
                }
            }
        }

        if chosen.len() < required {
            Err(UnresolvedUnit {
                target_unit: unit.clone(),
                available: chosen.len(),
                required,
            })
        } else {
            Ok(chosen)
        }
    }

    /// Target unit for a prime token that has been unregistered. The
    /// adapter is gone, so fall back to any backup list naming it.
    fn prime_target_unit_fallback(&self, token: &TokenId) -> TargetUnit {
        for (unit, config) in &self.backups {
            if config.tokens.contains(token) {
                return unit.clone();
            }
        }
        TargetUnit::new(format!("unknown:{}", token))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTING AND COLLATERALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Token quantities required to mint (`Rounding::Ceil`) or received on
    /// redemption (`Rounding::Floor`) of `units` basket units, at live
    /// exchange rates
    pub fn quote(
        &self,
        registry: &AssetRegistry,
        units: Fix,
        rounding: Rounding,
    ) -> Result<Vec<(TokenId, Fix)>> {
        if self.current.is_empty() {
            return Err(Error::BasketNotSound("basket is empty or unresolved".into()));
        }
        let mut quantities = Vec::with_capacity(self.current.entries.len());
        for entry in &self.current.entries {
            let collateral = registry
                .to_collateral(&entry.token)
                .map_err(|_| Error::BasketTokenUnregistered(entry.token.to_string()))?;
            // tokens = ref_amount × units / ref_per_tok
            let quantity = entry
                .ref_amount
                .mul_div(units, collateral.ref_per_tok(), rounding)?;
            quantities.push((entry.token.clone(), quantity));
        }
        Ok(quantities)
    }

    /// Basket units represented by the given held balances: the minimum
    /// over constituents of `balance × ref_per_tok / ref_amount`
    pub fn baskets_held(
        &self,
        registry: &AssetRegistry,
        balances: &HashMap<TokenId, Fix>,
    ) -> Fix {
        if self.current.is_empty() {
            return Fix::ZERO;
        }
        let mut held = Fix::MAX;
        for entry in &self.current.entries {
            let Ok(collateral) = registry.to_collateral(&entry.token) else {
                return Fix::ZERO;
            };
            let balance = balances.get(&entry.token).copied().unwrap_or(Fix::ZERO);
            let baskets = match balance.mul_div(
                collateral.ref_per_tok(),
                entry.ref_amount,
                Rounding::Floor,
            ) {
                Ok(b) => b,
                Err(_) => return Fix::ZERO,
            };
            held = held.min(baskets);
        }
        held
    }

    /// True iff held collateral, valued in basket units, covers the
    /// supply's basket-unit requirement
    pub fn fully_collateralized(
        &self,
        registry: &AssetRegistry,
        balances: &HashMap<TokenId, Fix>,
        baskets_needed: Fix,
    ) -> bool {
        self.current.resolved && self.baskets_held(registry, balances) >= baskets_needed
    }

    /// Worst status across basket constituents. An empty or unresolved
    /// basket reports DISABLED.
    pub fn status(&self, registry: &AssetRegistry) -> CollateralStatus {
        if self.current.is_empty() || !self.current.resolved {
            return CollateralStatus::Disabled;
        }
        let mut worst = CollateralStatus::Sound;
        for entry in &self.current.entries {
            match registry.to_collateral(&entry.token) {
                Ok(collateral) => worst = worst.worst(collateral.status()),
                Err(_) => return CollateralStatus::Disabled,
            }
        }
        worst
    }
}

fn push_entry(entries: &mut Vec<BasketEntry>, token: TokenId, ref_amount: Fix) {
    if let Some(existing) = entries.iter_mut().find(|e| e.token == token) {
        existing.ref_amount += ref_amount;
    } else {
        entries.push(BasketEntry { token, ref_amount });
    }
}

fn accumulate(missing: &mut Vec<(TargetUnit, Fix)>, unit: TargetUnit, weight: Fix) {
    if let Some((_, total)) = missing.iter_mut().find(|(u, _)| *u == unit) {
        *total += weight;
    } else {
        missing.push((unit, weight));
    }
}
