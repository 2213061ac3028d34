/*!
 * # Firestation - Liquidity Pool Price Stabilizer
 *
 * Firestation keeps a Gravity DEX liquidity pool close to the exchange rate implied
 * by external USD prices, and can generate trading volume across pools.
 *
 * ## Core Features
 *
 * - **Divergence Evaluation**: Compares a pool's reserve ratio with reference prices
 * - **Order Planning**: Sizes a corrective swap, or symmetric pairs in volume mode
 * - **Signing**: Builds and signs amino-JSON swap transactions offline
 * - **Submission Loop**: Replays orders with locally advanced sequences until the
 *   pool converges or the iteration budget runs out
 *
 * ## Module Structure
 *
 * - `market`: Pure rate, divergence and planning logic
 * - `tx`: Key recovery, message encoding and signing
 * - `client`: Ledger node and price service clients
 * - `engine`: Stabilizer state machine and volume loop
 * - `config`: TOML configuration
 * - `utils`: Logging and application context
 */

/// Ledger node and price service clients
pub mod client;
/// TOML configuration
pub mod config;
/// Stabilizer and volume loops
pub mod engine;
/// Library error type
pub mod error;
/// Rates, divergence and order planning
pub mod market;
/// Transaction building and signing
pub mod tx;
/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod test_helpers;

pub use error::{Error, Result};
