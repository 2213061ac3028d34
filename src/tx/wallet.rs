//! Account recovery from a BIP-39 phrase along the Cosmos HD path.

use alloy::signers::local::{coins_bip39::English, LocalSignerError, MnemonicBuilder};
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::signer::{KeySigner, TxSigner};
use crate::error::{Error, Result};

/// BIP-44 path for coin type 118, first account, first address.
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// Bech32 prefix of account addresses.
pub const ACCOUNT_PREFIX: &str = "cosmos";

/// Bech32 account address for a compressed secp256k1 public key:
/// `bech32(prefix, ripemd160(sha256(pubkey)))`.
///
/// # Errors
/// `Signing` if the key is not 33 bytes or the address cannot be encoded.
pub fn account_address(prefix: &str, public_key: &[u8]) -> Result<String> {
    if public_key.len() != 33 {
        return Err(Error::Signing(format!(
            "expected a 33-byte compressed public key, got {} bytes",
            public_key.len()
        )));
    }
    let key_hash = Ripemd160::digest(Sha256::digest(public_key));
    let hrp = Hrp::parse(prefix).map_err(|e| Error::Signing(format!("bad prefix {prefix}: {e}")))?;
    bech32::encode::<Bech32>(hrp, &key_hash).map_err(|e| Error::Signing(e.to_string()))
}

/// Recovers the account signer and address from a recovery phrase.
///
/// # Errors
/// * `InvalidMnemonic` if the phrase is not a valid English BIP-39 mnemonic
/// * `Signing` if the derived key cannot be turned into an address
pub fn derive_account(mnemonic: &str, passphrase: &str) -> Result<KeySigner> {
    let builder = MnemonicBuilder::<English>::default()
        .phrase(mnemonic.trim())
        .derivation_path(COSMOS_HD_PATH)
        .map_err(|e| Error::Signing(e.to_string()))?
        .password(passphrase);

    let inner = builder.build().map_err(|e| {
        let message = e.to_string();
        match e {
            LocalSignerError::MnemonicBuilderError(_) | LocalSignerError::Bip39Error(_) => {
                Error::InvalidMnemonic(message)
            }
            _ => Error::Signing(message),
        }
    })?;

    let public_key = inner.credential().verifying_key().to_sec1_bytes();
    let address = account_address(ACCOUNT_PREFIX, &public_key)?;
    let signer = KeySigner::new(address, inner);
    log::debug!("wallet: recovered account {}", signer.address());
    Ok(signer)
}
