//! # Market Module
//!
//! Pure price logic: reading a pool's implied rate, comparing it against
//! external reference prices, and planning the swap orders that follow from
//! that comparison. Nothing in here touches the network.

/// Ledger-compatible decimal rounding and formatting
pub mod decimal;
/// Pool rate, reference rate and divergence
pub mod divergence;
/// Order intents
pub mod order;
/// Stabilizing and volume planners
pub mod planner;
/// Reserve, price, coin and pool types
pub mod types;

pub use divergence::{evaluate, Evaluation};
pub use order::{OrderIntent, Side};
pub use planner::{plan, plan_volume, reserve_usd, Plan, StabilizeCaps, VolumeParams};
pub use types::{Coin, Denom, Pool, ReferencePrice, ReservePair};
