use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::market::Denom;

/// Known on-chain denoms and their CoinMarketCap ids.
pub const DEFAULT_PRICE_IDS: &[(&str, &str)] = &[
    ("uatom", "3794"),
    ("ubtsg", "8905"),
    ("udvpn", "2643"),
    ("uxprt", "7281"),
    ("uakt", "7431"),
    ("uluna", "4172"),
    ("ungm", "8279"),
    ("uiris", "3874"),
];

/// Maps denoms to the ids the price source knows them by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceIds {
    ids: HashMap<Denom, String>,
}

impl Default for PriceIds {
    fn default() -> Self {
        Self {
            ids: DEFAULT_PRICE_IDS
                .iter()
                .map(|(denom, id)| ((*denom).to_string(), (*id).to_string()))
                .collect(),
        }
    }
}

impl PriceIds {
    /// Built-in table extended (or overridden) by `extra`.
    pub fn with_overrides<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::default();
        for (denom, id) in extra {
            table.ids.insert(denom.clone(), id.clone());
        }
        table
    }

    /// Price id for `denom`, if known.
    pub fn id_for(&self, denom: &str) -> Option<&str> {
        self.ids.get(denom).map(String::as_str)
    }

    /// True when a price id is known for `denom`.
    pub fn knows(&self, denom: &str) -> bool {
        self.ids.contains_key(denom)
    }

    /// Price ids for every denom, in order.
    ///
    /// # Errors
    /// `MissingReferencePrice` for the first unknown denom.
    pub fn resolve(&self, denoms: &[&str]) -> Result<Vec<String>> {
        denoms
            .iter()
            .map(|denom| {
                self.id_for(denom)
                    .map(ToString::to_string)
                    .ok_or_else(|| Error::MissingReferencePrice(format!("{denom} has no price id")))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let ids = PriceIds::default();
        assert_eq!(ids.id_for("uatom"), Some("3794"));
        assert_eq!(ids.id_for("uluna"), Some("4172"));
        assert!(!ids.knows("stake"));
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let extra: HashMap<String, String> = [
            ("stake".to_string(), "1".to_string()),
            ("uatom".to_string(), "9999".to_string()),
        ]
        .into_iter()
        .collect();
        let ids = PriceIds::with_overrides(&extra);
        assert_eq!(ids.id_for("stake"), Some("1"));
        assert_eq!(ids.id_for("uatom"), Some("9999"));
        assert_eq!(ids.id_for("uiris"), Some("3874"));
    }

    #[test]
    fn test_resolve() {
        let ids = PriceIds::default();
        assert_eq!(ids.resolve(&["uakt", "udvpn"]).unwrap(), vec!["7431", "2643"]);
        assert!(matches!(
            ids.resolve(&["uatom", "unknown"]),
            Err(Error::MissingReferencePrice(_))
        ));
    }
}
