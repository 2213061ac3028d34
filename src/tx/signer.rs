use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::error::{Error, Result};

/// Something that can sign a transaction digest on behalf of one account.
///
/// The builder only needs the account address, the compressed public key that goes
/// into the signature envelope, and a raw 64-byte `r || s` signature over a SHA-256
/// digest.
pub trait TxSigner: Send + Sync {
    /// Bech32 address of the signing account.
    fn address(&self) -> &str;

    /// 33-byte compressed secp256k1 public key.
    fn public_key(&self) -> Vec<u8>;

    /// Signs a 32-byte digest.
    ///
    /// # Errors
    /// `Signing` if the key cannot produce a signature.
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64]>;
}

/// secp256k1 key held in memory.
pub struct KeySigner {
    /// Bech32 address derived from the public key
    address: String,
    /// Underlying signing key
    inner: PrivateKeySigner,
}

impl KeySigner {
    /// Wraps a private key under a precomputed address.
    pub const fn new(address: String, inner: PrivateKeySigner) -> Self {
        Self { address, inner }
    }
}

impl std::fmt::Debug for KeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TxSigner for KeySigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn public_key(&self) -> Vec<u8> {
        self.inner.credential().verifying_key().to_sec1_bytes().into_vec()
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64]> {
        let signature = self
            .inner
            .sign_hash_sync(&B256::from(*digest))
            .map_err(|e| Error::Signing(e.to_string()))?;

        // r || s, dropping the recovery byte
        let bytes = signature.as_bytes();
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&bytes[..64]);
        Ok(compact)
    }
}
