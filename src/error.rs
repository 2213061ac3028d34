use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the evaluation, planning, signing and submission pipeline.
///
/// None of these are retried internally. A session that hits one of them stops and
/// hands the error to the operator.
#[derive(Debug, Error)]
pub enum Error {
    /// Pool reserves cannot produce a rate (zero or negative balances).
    #[error("invalid reserves: {0}")]
    InvalidReserves(String),

    /// A reference price is absent or unusable for one side of the pair.
    #[error("missing reference price for {0}")]
    MissingReferencePrice(String),

    /// An order intent failed basic validation.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Key material is missing or malformed, or signing failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// The transaction could not be serialized or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Query or broadcast failure talking to the node or the price service.
    #[error("network error: {0}")]
    Network(String),

    /// A symbol, account or pool does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The recovery phrase could not be turned into a key.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Configuration could not be read or failed validation.
    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid url: {e}"))
    }
}
