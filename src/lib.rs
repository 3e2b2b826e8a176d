//! # basketUSD Protocol
//!
//! An over-collateralized, basket-backed stable-value token protocol engine.
//! Users deposit a basket of collateral tokens to mint the issued token; the
//! protocol tracks whether held collateral still backs the token 1:1, reacts
//! to collateral impairment by substituting backup collateral, rebalances
//! through time-boxed auctions, and redistributes surplus value to a staking
//! pool that insures the system and a melting mechanism that increases
//! per-token backing.
//!
//! ## Architecture
//!
//! The engine consists of several core modules:
//!
//! - **Registry**: token-to-adapter registry with hot-swap upgrades
//! - **Basket**: prime/backup basket configuration and the current basket
//! - **Backing**: collateral balances and recapitalization trading
//! - **Revenue**: distribution table and per-destination revenue traders
//! - **Trading**: broker and auction lifecycle against an external venue
//! - **Furnace / Staking**: melting batches and the insurance pool
//! - **Issuance**: rate-limited FIFO issuance queue and pro-rata redemption
//!
//! All state transitions are discrete, externally-triggered operations; the
//! engine owns a logical clock (block height + timestamp) advanced by the
//! driver. There is no internal scheduler: issuance and auctions are deferred
//! workflows advanced by repeated `poke`/`settle` calls.
//!
//! ## Example
//!
//! ```rust,ignore
//! use basketusd::prelude::*;
//!
//! let mut protocol = Protocol::new(params, owner.clone(), busd, insr)?;
//! protocol.register_asset(&owner, usdc_collateral)?;
//! protocol.set_prime_basket(&owner, vec![usdc], vec![Fix::ONE])?;
//! protocol.switch_basket(&owner)?;
//! let outcome = protocol.issue(&alice, Fix::from_integer(100))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod auth;
pub mod backing;
pub mod basket;
pub mod collateral;
pub mod core;
pub mod error;
pub mod furnace;
pub mod issuance;
pub mod protocol;
pub mod registry;
pub mod revenue;
pub mod staking;
pub mod storage;
pub mod trading;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collateral::{Asset, Collateral, CollateralStatus, RateMechanism};
    pub use crate::core::{
        config::ProtocolParams,
        ids::{AccountId, TargetUnit, TokenId},
        token::StableToken,
    };
    pub use crate::error::{Error, Result};
    pub use crate::protocol::{engine::Protocol, events::ProtocolEvent};
    pub use crate::trading::venue::{AuctionVenue, ManualVenue};
    pub use crate::utils::math::Fix;
}

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "basketUSD";
