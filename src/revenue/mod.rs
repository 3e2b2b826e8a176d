//! Revenue handling: the distribution table and the per-flavor traders.

pub mod distributor;
pub mod trader;

pub use distributor::{Destination, Distributor, RevenueKind, RevenueShare};
pub use trader::RevenueTrader;
