//! Shared utilities: fixed-point math, protocol constants, input validation.

pub mod constants;
pub mod math;
pub mod validation;
