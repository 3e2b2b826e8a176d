//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and
//! modification. Fixed-point values are expressed as raw 18-decimal
//! integers so they can seed `Fix::from_raw` in const position.

// ═══════════════════════════════════════════════════════════════════════════════
// SHARES AND RATIOS
// ═══════════════════════════════════════════════════════════════════════════════

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u64 = 10_000;

/// Ceiling for any single distribution share, in basis points
pub const MAX_DISTRIBUTION_SHARE: u64 = 10_000;

// ═══════════════════════════════════════════════════════════════════════════════
// BASKET LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of collateral entries in the prime basket
pub const MAX_BASKET_SIZE: usize = 100;

/// Maximum number of eligible backups per target unit
pub const MAX_BACKUP_LIST: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// TRADING DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default auction duration in seconds (30 minutes)
pub const DEFAULT_AUCTION_LENGTH_SECS: u64 = 1_800;

/// Default delay between a collateral default and the first
/// recapitalization trade, in seconds
pub const DEFAULT_TRADING_DELAY_SECS: u64 = 0;

/// Default maximum trade slippage (1%), raw 18-decimal fraction
pub const DEFAULT_MAX_TRADE_SLIPPAGE_RAW: u128 = 10_000_000_000_000_000;

/// Default dust threshold (0.01 reference units), raw 18-decimal value.
/// Trades or shortfalls below it are absorbed instead of acted on.
pub const DEFAULT_DUST_AMOUNT_RAW: u128 = 10_000_000_000_000_000;

/// Default per-auction volume cap in reference units (1,000,000)
pub const DEFAULT_MAX_TRADE_VOLUME: u64 = 1_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// ISSUANCE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Issuance capacity floor in issued tokens per block
pub const MIN_BLOCK_ISSUANCE: u64 = 10_000;

/// Default issuance rate as a fraction of supply per block (0.025%),
/// raw 18-decimal fraction
pub const DEFAULT_ISSUANCE_RATE_RAW: u128 = 250_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// REVENUE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default melting batch duration in seconds (7 days)
pub const DEFAULT_MELTING_PERIOD_SECS: u64 = 604_800;

/// Default backing buffer kept by the backing manager before excess is
/// handed out as revenue (0.01%), raw 18-decimal fraction
pub const DEFAULT_BACKING_BUFFER_RAW: u128 = 100_000_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default allowed reference-unit deviation before a collateral turns
/// IFFY (5%), in basis points
pub const DEFAULT_DEFAULT_THRESHOLD_BPS: u64 = 500;

/// Default delay between the first IFFY observation and DISABLED,
/// in seconds (24 hours)
pub const DEFAULT_DELAY_UNTIL_DEFAULT_SECS: u64 = 86_400;

/// Default maximum price feed age before a price counts as stale,
/// in seconds
pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 3_600;

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Seconds per block for the logical clock
pub const SECS_PER_BLOCK: u64 = 12;
