//! Asset registry: the token-to-adapter mapping.
//!
//! Every token the protocol touches (basket collateral, backups, reward
//! tokens) is registered here exactly once. Adapters can be hot-upgraded
//! via `swap_registered` without disturbing basket references. Refreshing
//! all collateral adapters is reserved to the basket handler so basket
//! decisions always see fresh status.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::collateral::{Asset, Collateral};
use crate::core::ids::TokenId;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry of all tokens and their adapters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Adapters by token
    assets: HashMap<TokenId, Asset>,
    /// Registration order, for deterministic enumeration
    order: Vec<TokenId>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. Returns `true` if the registry changed; a
    /// re-registration of an identical asset is a no-op, and a different
    /// asset under an already-registered token is rejected.
    pub fn register(&mut self, asset: Asset) -> Result<bool> {
        let token = asset.token().clone();
        match self.assets.get(&token) {
            Some(existing) if *existing == asset => Ok(false),
            Some(_) => Err(Error::DuplicateToken(token.to_string())),
            None => {
                tracing::info!(token = %token, "asset registered");
                self.assets.insert(token.clone(), asset);
                self.order.push(token);
                Ok(true)
            }
        }
    }

    /// Unregister an asset. The exact asset must currently be registered.
    pub fn unregister(&mut self, asset: &Asset) -> Result<()> {
        let token = asset.token();
        match self.assets.get(token) {
            Some(existing) if existing == asset => {
                self.assets.remove(token);
                self.order.retain(|t| t != token);
                tracing::info!(token = %token, "asset unregistered");
                Ok(())
            }
            _ => Err(Error::AssetNotFound(token.to_string())),
        }
    }

    /// Atomically replace the adapter registered for a token. The new
    /// asset must wrap a token that is already registered.
    pub fn swap_registered(&mut self, new_asset: Asset) -> Result<()> {
        let token = new_asset.token().clone();
        if !self.assets.contains_key(&token) {
            return Err(Error::TokenUnregistered(token.to_string()));
        }
        tracing::info!(token = %token, "asset swapped");
        self.assets.insert(token, new_asset);
        Ok(())
    }

    /// Look up the asset for a token
    pub fn to_asset(&self, token: &TokenId) -> Result<&Asset> {
        self.assets
            .get(token)
            .ok_or_else(|| Error::TokenUnregistered(token.to_string()))
    }

    /// Look up the collateral adapter for a token
    pub fn to_collateral(&self, token: &TokenId) -> Result<&Collateral> {
        let asset = self.to_asset(token)?;
        asset
            .as_collateral()
            .ok_or_else(|| Error::NotCollateral(token.to_string()))
    }

    /// Mutable access to a registered asset
    pub fn get_mut(&mut self, token: &TokenId) -> Result<&mut Asset> {
        self.assets
            .get_mut(token)
            .ok_or_else(|| Error::TokenUnregistered(token.to_string()))
    }

    /// Whether a token is registered
    pub fn is_registered(&self, token: &TokenId) -> bool {
        self.assets.contains_key(token)
    }

    /// All registered tokens in registration order
    pub fn tokens(&self) -> &[TokenId] {
        &self.order
    }

    /// Iterate all collateral adapters mutably
    pub fn collateral_mut(&mut self) -> impl Iterator<Item = &mut Collateral> {
        self.assets.values_mut().filter_map(|a| a.as_collateral_mut())
    }

    /// Refresh every collateral adapter. Only the basket handler may drive
    /// this, which guarantees basket decisions always see fresh status.
    pub(crate) fn refresh_all(&mut self, now: u64) {
        for collateral in self.assets.values_mut().filter_map(|a| a.as_collateral_mut()) {
            collateral.refresh(now);
        }
    }
}
