//! # Transaction Module
//!
//! Key recovery, swap message encoding and amino-JSON signing.

/// Account number and local sequence counter
pub mod account;
/// Transaction assembly and signing
pub mod builder;
/// Swap message wire types and validation
pub mod msg;
/// Signing abstraction
pub mod signer;
/// Mnemonic recovery and address derivation
pub mod wallet;

pub use account::AccountState;
pub use builder::{decode, SignedTransaction, StdTx, TxBuilder};
pub use signer::{KeySigner, TxSigner};
pub use wallet::derive_account;
