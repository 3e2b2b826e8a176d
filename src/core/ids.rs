//! Identifier newtypes used across the protocol.
//!
//! Tokens, target units and accounts are identified by short symbolic
//! names; trades and issuances get content-derived hex identifiers so
//! records stay addressable across snapshots.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// SYMBOLIC IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! symbol_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a symbol
            pub fn new(symbol: impl Into<String>) -> Self {
                Self(symbol.into())
            }

            /// The underlying symbol
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

symbol_id! {
    /// A collateral or reward token, identified by its symbol (e.g. "USDC")
    TokenId
}

symbol_id! {
    /// The class of reference unit a backup group belongs to (e.g. "USD")
    TargetUnit
}

symbol_id! {
    /// An account able to hold issued tokens, stake, or own the protocol
    AccountId
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTENT-DERIVED IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives a short hex identifier from the given parts plus a sequence
/// number. Stable across runs for identical inputs.
pub fn derive_id(tag: &str, parts: &[&str], seq: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    hasher.update(seq.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
