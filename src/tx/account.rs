/// On-chain account metadata needed to sign.
///
/// The sequence is read from the ledger once per run and then advanced locally by
/// whichever loop owns this value. Transactions in a burst are not confirmed
/// before the next one is signed, so the chain's view lags behind this counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    /// Bech32 account address
    pub address: String,
    /// Next sequence number to sign with
    pub sequence: u64,
    /// Ledger-assigned account number
    pub account_number: u64,
}

impl AccountState {
    /// Creates an account state.
    pub fn new(address: &str, sequence: u64, account_number: u64) -> Self {
        Self {
            address: address.to_string(),
            sequence,
            account_number,
        }
    }

    /// Moves to the next sequence after a submission and returns it.
    pub fn advance(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}
