//! # Engine Module
//!
//! The two long-running loops: the stabilizer, which pushes one pool back toward
//! its reference rate, and the volume generator, which spreads symmetric orders
//! over a random set of pools.

/// Random pool selection
pub mod selection;
/// Price-stabilizing state machine
pub mod stabilizer;
/// Volume generation loop
pub mod volume;

pub use selection::select_pools;
pub use stabilizer::{PairTarget, SessionOutcome, Stabilizer, StabilizerSettings};
pub use volume::{VolumeGenerator, VolumeReport, VolumeSettings};
