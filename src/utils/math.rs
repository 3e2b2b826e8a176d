//! Fixed-point arithmetic for precise protocol accounting.
//!
//! All token quantities, prices, exchange rates and basket weights are
//! 18-decimal unsigned fixed-point values. Rounding direction is always
//! explicit at conversion boundaries: quotes round against the caller
//! (up on issuance, down on redemption) so the protocol never leaks value
//! through truncation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use crate::error::{Error, Result};
use crate::utils::constants::BPS_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════════
// ROUNDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Rounding direction for lossy fixed-point operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Round toward zero
    Floor,
    /// Round away from zero
    Ceil,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIX
// ═══════════════════════════════════════════════════════════════════════════════

/// Unsigned fixed-point number with 18 decimal places of precision
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Fix(u128);

impl Fix {
    /// Scale factor: 10^18
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(Self::SCALE);

    /// Largest representable value
    pub const MAX: Self = Self(u128::MAX);

    /// Create a new Fix from a raw 18-decimal value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from an integer (scales up)
    pub const fn from_integer(value: u64) -> Self {
        Self((value as u128) * Self::SCALE)
    }

    /// Create from basis points (100 bps = 1%)
    pub const fn from_bps(bps: u64) -> Self {
        Self((bps as u128) * Self::SCALE / (BPS_DIVISOR as u128))
    }

    /// Get the raw underlying value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Check if value is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction
    pub const fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Saturating addition
    pub const fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Minimum of two values
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Maximum of two values
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| Error::Overflow { operation: "fix add".into() })
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or_else(|| Error::Underflow { operation: "fix sub".into() })
    }

    /// Multiply with explicit rounding
    pub fn mul_rounding(self, other: Self, rounding: Rounding) -> Self {
        Self(mul_div_u128(self.0, other.0, Self::SCALE, rounding))
    }

    /// Divide with explicit rounding
    pub fn div_rounding(self, other: Self, rounding: Rounding) -> Result<Self> {
        if other.0 == 0 {
            return Err(Error::InvalidParameter {
                name: "divisor".into(),
                reason: "division by zero".into(),
            });
        }
        Ok(Self(mul_div_u128(self.0, Self::SCALE, other.0, rounding)))
    }

    /// Computes `self * b / c` in one pass with explicit rounding
    pub fn mul_div(self, b: Self, c: Self, rounding: Rounding) -> Result<Self> {
        if c.0 == 0 {
            return Err(Error::InvalidParameter {
                name: "divisor".into(),
                reason: "division by zero".into(),
            });
        }
        Ok(Self(mul_div_u128(self.0, b.0, c.0, rounding)))
    }
}

impl Add for Fix {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Fix {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Fix {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Fix {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for Fix {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        // Multiply then divide by scale to maintain precision; floor rounded
        Self(mul_div_u128(self.0, rhs.0, Self::SCALE, Rounding::Floor))
    }
}

impl Div for Fix {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        // Multiply by scale first to maintain precision; floor rounded
        Self(mul_div_u128(self.0, Self::SCALE, rhs.0, Rounding::Floor))
    }
}

impl Sum for Fix {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Fix::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            write!(f, "{}", int)
        } else {
            let s = format!("{:018}", frac);
            write!(f, "{}.{}", int, s.trim_end_matches('0'))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDE MUL-DIV
// ═══════════════════════════════════════════════════════════════════════════════

/// Computes `a * b / c` over a 256-bit intermediate with the given rounding.
/// Saturates at `u128::MAX` rather than wrapping.
fn mul_div_u128(a: u128, b: u128, c: u128, rounding: Rounding) -> u128 {
    debug_assert!(c != 0);

    // 128x128 -> 256 schoolbook via 64-bit limbs
    let (lo, hi) = wide_mul(a, b);
    let (quot, rem) = wide_div(lo, hi, c);

    match rounding {
        Rounding::Floor => quot,
        Rounding::Ceil => {
            if rem > 0 {
                quot.saturating_add(1)
            } else {
                quot
            }
        }
    }
}

/// Full 256-bit product of two u128 values as (lo, hi)
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1u128 << 64) - 1;
    let (a_lo, a_hi) = (a & MASK, a >> 64);
    let (b_lo, b_hi) = (b & MASK, b >> 64);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (lo, hi)
}

/// Divide a 256-bit value (lo, hi) by a u128 divisor, returning (quotient,
/// remainder). Saturates the quotient at `u128::MAX` on overflow.
fn wide_div(lo: u128, hi: u128, div: u128) -> (u128, u128) {
    if hi == 0 {
        return (lo / div, lo % div);
    }
    if hi >= div {
        // Quotient does not fit in 128 bits
        return (u128::MAX, 0);
    }

    // Restoring long division over the 256-bit dividend. The remainder can
    // transiently reach 2^128; the carry bit tracks that overflow.
    let mut quot: u128 = 0;
    let mut rem: u128 = 0;
    for i in (0..256).rev() {
        let bit = if i >= 128 {
            (hi >> (i - 128)) & 1
        } else {
            (lo >> i) & 1
        };
        let carry = rem >> 127;
        rem = (rem << 1) | bit;
        if carry == 1 || rem >= div {
            rem = rem.wrapping_sub(div);
            if i < 128 {
                quot |= 1u128 << i;
            } else {
                return (u128::MAX, 0);
            }
        }
    }
    (quot, rem)
}

// ═══════════════════════════════════════════════════════════════════════════════
// UTILITY FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Check if a value is within a basis-point deviation of a target
pub fn within_deviation(value: Fix, target: Fix, max_deviation_bps: u64) -> bool {
    if target.is_zero() {
        return value.is_zero();
    }

    let diff = if value > target { value - target } else { target - value };

    // deviation_bps = diff * 10000 / target
    let deviation = mul_div_u128(
        diff.raw(),
        BPS_DIVISOR as u128,
        target.raw(),
        Rounding::Floor,
    );
    deviation <= max_deviation_bps as u128
}
