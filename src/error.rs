//! Error types for the basketUSD protocol.
//!
//! This module defines all error types used throughout the protocol,
//! providing clear and actionable error messages.

use thiserror::Error;

/// Result type alias for basketUSD operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the basketUSD protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Registry Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Token already registered under a different asset
    #[error("duplicate registration for token {0}")]
    DuplicateToken(String),

    /// Asset not present in the registry
    #[error("asset not found for token {0}")]
    AssetNotFound(String),

    /// Swap target does not match the registered token
    #[error("token mismatch on swap: expected {expected}, got {got}")]
    TokenMismatch {
        /// Token currently registered
        expected: String,
        /// Token carried by the replacement asset
        got: String,
    },

    /// Token has no registration at all
    #[error("token not registered: {0}")]
    TokenUnregistered(String),

    /// Registered asset is not a collateral adapter
    #[error("token {0} is registered but is not collateral")]
    NotCollateral(String),

    // ═══════════════════════════════════════════════════════════════════
    // Basket Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Prime basket has not been configured yet
    #[error("prime basket is empty")]
    EmptyBasket,

    /// Basket could not be resolved from the available backups
    #[error("basket unresolved: target unit {0} has insufficient sound backups")]
    BasketUnresolved(String),

    /// Basket references a token with no live adapter
    #[error("basket references unregistered token {0}")]
    BasketTokenUnregistered(String),

    // ═══════════════════════════════════════════════════════════════════
    // Collateral / Price Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Price is stale (not updated recently)
    #[error("price is stale: last update {last_update}s ago, max allowed {max_age}s")]
    StalePrice {
        /// Seconds since last update
        last_update: u64,
        /// Maximum allowed age in seconds
        max_age: u64,
    },

    /// Price feed reported zero
    #[error("price feed for {0} reported zero")]
    ZeroPrice(String),

    /// Price feed failed transiently
    #[error("price feed for {0} unavailable")]
    FeedUnavailable(String),

    /// Collateral is disabled and cannot serve the operation
    #[error("collateral {0} is disabled")]
    CollateralDisabled(String),

    // ═══════════════════════════════════════════════════════════════════
    // Trading Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A trade for this sell token is already open
    #[error("trade already open for {trader} selling {token}")]
    TradeAlreadyOpen {
        /// Trader holding the open trade
        trader: String,
        /// Sell token of the open trade
        token: String,
    },

    /// Trade not found by id
    #[error("trade not found: {0}")]
    TradeNotFound(String),

    /// Trade cannot settle before its end time
    #[error("trade {id} not ended: now {now}, ends {end_time}")]
    TradeNotEnded {
        /// Trade identifier
        id: String,
        /// Current timestamp
        now: u64,
        /// Scheduled end of the auction
        end_time: u64,
    },

    /// Auction venue rejected or lost the auction
    #[error("auction venue error: {0}")]
    VenueError(String),

    // ═══════════════════════════════════════════════════════════════════
    // Distribution Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Furnace destination must carry no insurance share
    #[error("furnace destination cannot receive insurance-unit revenue")]
    FurnaceShareInvalid,

    /// Insurance destination must carry no stable share
    #[error("insurance destination cannot receive stable-unit revenue")]
    InsuranceShareInvalid,

    /// A single share exceeds the protocol ceiling
    #[error("distribution share {share} exceeds ceiling {ceiling}")]
    ShareTooLarge {
        /// Offending share in basis points
        share: u64,
        /// Protocol-wide ceiling in basis points
        ceiling: u64,
    },

    /// No destination carries a share for the distributed unit
    #[error("no destinations configured for the distributed unit")]
    NoDistributionTargets,

    // ═══════════════════════════════════════════════════════════════════
    // Issuance Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Issuance record not found
    #[error("issuance not found: {0}")]
    IssuanceNotFound(String),

    /// Operation exceeds the caller's balance
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount required
        required: String,
        /// Amount available
        available: String,
    },

    /// Issuance against an unsound or unresolved basket
    #[error("basket is not sound: {0}")]
    BasketNotSound(String),

    // ═══════════════════════════════════════════════════════════════════
    // Authorization / Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Not authorized to perform this action
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Invalid input parameter
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Paired configuration arrays differ in length
    #[error("array length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first array
        left: usize,
        /// Length of the second array
        right: usize,
    },

    /// Amount is zero
    #[error("amount cannot be zero")]
    ZeroAmount,

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Overflow in calculation
    #[error("arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    /// Invariant violation detected
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal error (should not happen in production)
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns true if this error is recoverable by retrying later or with
    /// different inputs
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StalePrice { .. }
                | Error::FeedUnavailable(_)
                | Error::TradeAlreadyOpen { .. }
                | Error::TradeNotEnded { .. }
                | Error::InsufficientBalance { .. }
                | Error::BasketNotSound(_)
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_)
                | Error::Internal(_)
                | Error::Overflow { .. }
                | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Registry errors: 1xxx
            Error::DuplicateToken(_) => 1001,
            Error::AssetNotFound(_) => 1002,
            Error::TokenMismatch { .. } => 1003,
            Error::TokenUnregistered(_) => 1004,
            Error::NotCollateral(_) => 1005,

            // Basket errors: 2xxx
            Error::EmptyBasket => 2001,
            Error::BasketUnresolved(_) => 2002,
            Error::BasketTokenUnregistered(_) => 2003,

            // Collateral / price errors: 3xxx
            Error::StalePrice { .. } => 3001,
            Error::ZeroPrice(_) => 3002,
            Error::FeedUnavailable(_) => 3003,
            Error::CollateralDisabled(_) => 3004,

            // Trading errors: 4xxx
            Error::TradeAlreadyOpen { .. } => 4001,
            Error::TradeNotFound(_) => 4002,
            Error::TradeNotEnded { .. } => 4003,
            Error::VenueError(_) => 4004,

            // Distribution errors: 5xxx
            Error::FurnaceShareInvalid => 5001,
            Error::InsuranceShareInvalid => 5002,
            Error::ShareTooLarge { .. } => 5003,
            Error::NoDistributionTargets => 5004,

            // Issuance errors: 6xxx
            Error::IssuanceNotFound(_) => 6001,
            Error::InsufficientBalance { .. } => 6002,
            Error::BasketNotSound(_) => 6003,

            // Authorization / configuration errors: 7xxx
            Error::Unauthorized(_) => 7001,
            Error::InvalidParameter { .. } => 7002,
            Error::LengthMismatch { .. } => 7003,
            Error::ZeroAmount => 7004,

            // Serialization errors: 8xxx
            Error::Serialization(_) => 8001,
            Error::Deserialization(_) => 8002,

            // Internal errors: 9xxx
            Error::Overflow { .. } => 9001,
            Error::Underflow { .. } => 9002,
            Error::InvariantViolation(_) => 9003,
            Error::Internal(_) => 9004,
            Error::Storage(_) => 9005,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        // Ensure all error codes are unique
        let codes = vec![
            Error::DuplicateToken("".into()).code(),
            Error::AssetNotFound("".into()).code(),
            Error::EmptyBasket.code(),
            Error::StalePrice { last_update: 0, max_age: 0 }.code(),
            Error::TradeAlreadyOpen { trader: "".into(), token: "".into() }.code(),
            Error::FurnaceShareInvalid.code(),
            Error::IssuanceNotFound("".into()).code(),
            Error::Unauthorized("".into()).code(),
            Error::Serialization("".into()).code(),
            Error::Internal("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::ShareTooLarge { share: 12000, ceiling: 10000 };
        assert!(err.to_string().contains("12000"));
        assert!(err.to_string().contains("10000"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::StalePrice { last_update: 0, max_age: 0 }.is_recoverable());
        assert!(!Error::Internal("test".into()).is_recoverable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::InvariantViolation("test".into()).is_critical());
        assert!(Error::Overflow { operation: "test".into() }.is_critical());
        assert!(!Error::AssetNotFound("test".into()).is_critical());
    }
}
