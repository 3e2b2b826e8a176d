//! Fundamental types: identifiers, protocol parameters, and the
//! issued-token ledger.

pub mod config;
pub mod ids;
pub mod token;
