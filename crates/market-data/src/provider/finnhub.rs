//! Finnhub provider adapter.
//!
//! Secondary vendor for quotes and company fundamentals. Finnhub has no free
//! daily-history endpoint, so the historical operation stays at the trait
//! default. Quotes come back as bare numbers and a zero price means the
//! symbol is unknown.
//!
//! Finnhub addresses German listings as `XETRA:SAP` rather than the `SAP.DE`
//! convention the rest of the system uses, so symbols are translated before
//! every request.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use log::debug;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::models::{DataClass, DataSource, Fundamentals, Quote};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

lazy_static! {
    /// Listings where the Finnhub symbol is not derivable by the generic
    /// `.DE` rule alone.
    static ref GERMAN_TICKER_MAP: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("SAP.DE", "XETRA:SAP");
        m.insert("SIE.DE", "XETRA:SIE");
        m.insert("ALV.DE", "XETRA:ALV");
        m.insert("BAS.DE", "XETRA:BAS");
        m.insert("BAYN.DE", "XETRA:BAYN");
        m.insert("BMW.DE", "XETRA:BMW");
        m.insert("DTE.DE", "XETRA:DTE");
        m.insert("VOW3.DE", "XETRA:VOW3");
        m.insert("ADS.DE", "XETRA:ADS");
        m.insert("MBG.DE", "XETRA:MBG");
        m
    };
}

pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

/// `/quote` payload. Single-letter fields, all numeric.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price. Zero means Finnhub does not know the symbol.
    c: f64,
    /// Absolute change since previous close.
    #[serde(default)]
    d: Option<f64>,
    /// Percent change since previous close.
    #[serde(default)]
    dp: Option<f64>,
}

/// `/stock/profile2` payload.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    name: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
    #[serde(rename = "finnhubIndustry")]
    industry: Option<String>,
    /// Reported in millions of the listing currency.
    #[serde(rename = "marketCapitalization")]
    market_capitalization: Option<f64>,
}

impl FinnhubProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Translate a canonical symbol into Finnhub's notation.
    fn vendor_symbol(symbol: &str) -> String {
        if let Some(mapped) = GERMAN_TICKER_MAP.get(symbol) {
            return (*mapped).to_string();
        }
        if let Some(stem) = symbol.strip_suffix(".DE") {
            return format!("XETRA:{}", stem);
        }
        symbol.to_string()
    }

    async fn fetch(&self, path: &str, symbol: &str) -> Result<String, ProviderError> {
        let vendor = Self::vendor_symbol(symbol);
        let params = [("symbol", vendor.as_str()), ("token", self.api_key.as_str())];

        let url = reqwest::Url::parse_with_params(&format!("{}/{}", BASE_URL, path), &params)
            .map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to build URL: {}", e),
            })?;

        debug!(
            "Finnhub request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                ProviderError::Network(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status.is_server_error() {
            return Err(ProviderError::Unavailable {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(ProviderError::Network)
    }

    fn decimal_from(field: &str, value: f64) -> Result<Decimal, ProviderError> {
        Decimal::from_f64(value).ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: format!("non-finite value in field: {}", field),
        })
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, class: DataClass) -> bool {
        matches!(class, DataClass::Quote | DataClass::Fundamentals)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let text = self.fetch("quote", symbol).await?;

        let response: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse quote: {}", e),
            })?;

        if response.c == 0.0 {
            return Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        let price = Self::decimal_from("c", response.c)?;
        let change = response
            .d
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO);
        let change_percent = response
            .dp
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO);

        Ok(Quote {
            ticker: symbol.to_string(),
            price,
            change,
            change_percent,
            volume: None,
            as_of: Utc::now(),
            source: DataSource::Finnhub,
        })
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, ProviderError> {
        let text = self.fetch("stock/profile2", symbol).await?;

        let response: ProfileResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse profile: {}", e),
            })?;

        let mut fundamentals = Fundamentals::new(symbol, DataSource::Finnhub);
        fundamentals.name = response.name;
        fundamentals.exchange = response.exchange;
        fundamentals.currency = response.currency;
        fundamentals.industry = response.industry;
        fundamentals.market_cap = response
            .market_capitalization
            .filter(|v| *v > 0.0)
            .and_then(|millions| Decimal::from_f64(millions * 1_000_000.0));

        // Unknown symbols come back as an empty object, not an error status.
        if !fundamentals.has_data() {
            return Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        Ok(fundamentals)
    }
}
