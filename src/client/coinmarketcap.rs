use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::PriceSource;
use crate::error::{Error, Result};

/// Public API host.
pub const CMC_API_BASE_URL: &str = "https://pro-api.coinmarketcap.com/";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Quote currency.
const CONVERT: &str = "USD";

/// Request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Envelope of every CoinMarketCap response.
#[derive(Debug, Deserialize)]
struct QuotesResponse {
    status: Status,
    #[serde(default)]
    data: HashMap<String, Quoted>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Quoted {
    quote: HashMap<String, Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    price: Option<f64>,
}

/// Extracts USD prices for `ids` from a `quotes/latest` response body.
///
/// Prices are rounded to six decimals before conversion, so float noise past the
/// sixth digit never reaches the rate arithmetic.
///
/// # Errors
/// * `Network` when the service reports an error status
/// * `NotFound` when an id has no USD quote
/// * `Encoding` when the body is not a quotes response
pub fn parse_quotes(body: &str, ids: &[String]) -> Result<HashMap<String, BigDecimal>> {
    let response: QuotesResponse = serde_json::from_str(body)?;
    if response.status.error_code != 0 {
        return Err(Error::Network(format!(
            "coinmarketcap error {}: {}",
            response.status.error_code,
            response.status.error_message.unwrap_or_default()
        )));
    }

    let mut prices = HashMap::with_capacity(ids.len());
    for id in ids {
        let price = response
            .data
            .get(id)
            .and_then(|d| d.quote.get(CONVERT))
            .and_then(|q| q.price)
            .ok_or_else(|| Error::NotFound(format!("price for id {id}")))?;
        let price = BigDecimal::from_str(&format!("{price:.6}"))
            .map_err(|e| Error::Network(format!("price for id {id} is not a decimal: {e}")))?;
        prices.insert(id.clone(), price);
    }
    Ok(prices)
}

/// Reference price source backed by the CoinMarketCap quotes API.
#[derive(Debug, Clone)]
pub struct CoinMarketCapClient {
    /// API base URL
    base: Url,
    /// API key sent with every request
    api_key: String,
    /// HTTP client
    client: Client,
}

impl CoinMarketCapClient {
    /// Creates a client against the public API.
    ///
    /// # Errors
    /// `Network` if the HTTP client cannot be built.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(CMC_API_BASE_URL, api_key)
    }

    /// Creates a client against another host serving the same API.
    ///
    /// # Errors
    /// * `Config` if `base_url` is not a URL
    /// * `Network` if the HTTP client cannot be built
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: Url::parse(base_url)?,
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for CoinMarketCapClient {
    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, BigDecimal>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = self.base.join("v1/cryptocurrency/quotes/latest")?;
        log::debug!("cmc: quotes for {}", ids.join(","));

        let body = self
            .client
            .get(url)
            .query(&[("id", ids.join(",").as_str()), ("convert", CONVERT)])
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .text()
            .await?;

        parse_quotes(&body, ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::dec;

    const BODY: &str = r#"{
        "status": {"timestamp": "2021-05-10T00:00:00.000Z", "error_code": 0, "error_message": null},
        "data": {
            "3794": {"id": 3794, "symbol": "ATOM", "quote": {"USD": {"price": 21.123456789}}},
            "4172": {"id": 4172, "symbol": "LUNA", "quote": {"USD": {"price": 14.5}}}
        }
    }"#;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_rounds_to_six_decimals() {
        let prices = parse_quotes(BODY, &ids(&["3794", "4172"])).unwrap();
        assert_eq!(prices["3794"], dec("21.123457"));
        assert_eq!(prices["4172"], dec("14.5"));
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let err = parse_quotes(BODY, &ids(&["3794", "8905"])).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_error_status_is_network_error() {
        let body = r#"{"status": {"error_code": 1001, "error_message": "This API Key is invalid."}}"#;
        let err = parse_quotes(body, &ids(&["3794"])).unwrap_err();
        assert!(matches!(err, Error::Network(ref m) if m.contains("1001")));
    }

    #[test]
    fn test_garbage_body() {
        assert!(matches!(
            parse_quotes("<html>", &ids(&["3794"])),
            Err(Error::Encoding(_))
        ));
    }
}
