//! Owner gating for governance operations.

use serde::{Deserialize, Serialize};

use crate::core::ids::AccountId;
use crate::error::{Error, Result};

/// Tracks the owning account and gates governance calls on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizer {
    owner: AccountId,
}

impl Authorizer {
    /// Create an authorizer owned by `owner`
    pub fn new(owner: AccountId) -> Self {
        Self { owner }
    }

    /// The current owner
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Fail unless `caller` is the owner
    pub fn ensure_owner(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the owner",
                caller
            )));
        }
        Ok(())
    }

    /// Hand ownership to another account. Owner-gated itself.
    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<()> {
        self.ensure_owner(caller)?;
        tracing::info!(from = %self.owner, to = %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_gating() {
        let auth = Authorizer::new(AccountId::from("owner"));
        assert!(auth.ensure_owner(&AccountId::from("owner")).is_ok());
        assert!(matches!(
            auth.ensure_owner(&AccountId::from("mallory")),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn test_transfer_ownership() {
        let mut auth = Authorizer::new(AccountId::from("owner"));
        assert!(auth
            .transfer_ownership(&AccountId::from("mallory"), AccountId::from("mallory"))
            .is_err());
        auth.transfer_ownership(&AccountId::from("owner"), AccountId::from("dao"))
            .unwrap();
        assert!(auth.ensure_owner(&AccountId::from("dao")).is_ok());
    }
}
