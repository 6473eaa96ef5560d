//! Twelve Data provider adapter.
//!
//! Primary vendor for quotes and daily history. The API reports errors in the
//! response body with an HTTP 200, so every payload is checked for the
//! `status: "error"` envelope before parsing.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::models::{DataClass, DataSource, HistoricalBar, HistoricalPeriod, Quote};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://api.twelvedata.com";
const PROVIDER_ID: &str = "TWELVE_DATA";

pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
}

/// Error envelope returned with HTTP 200 on failures.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    status: Option<String>,
    code: Option<u16>,
    message: Option<String>,
}

/// `/quote` payload. All numbers arrive as strings.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    symbol: Option<String>,
    close: Option<String>,
    change: Option<String>,
    percent_change: Option<String>,
    volume: Option<String>,
}

/// `/time_series` payload.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    values: Option<Vec<TimeSeriesBar>>,
}

#[derive(Debug, Deserialize)]
struct TimeSeriesBar {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: Option<String>,
}

impl TwelveDataProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    async fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&format!("{}/{}", BASE_URL, path), &all_params)
            .map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to build URL: {}", e),
            })?;

        debug!(
            "Twelve Data request: {}",
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

    /// Reject error envelopes before the payload is parsed as data.
    fn check_api_error(text: &str, symbol: &str) -> Result<(), ProviderError> {
        let Ok(status) = serde_json::from_str::<ApiStatus>(text) else {
            return Ok(());
        };
        if status.status.as_deref() != Some("error") {
            return Ok(());
        }

        let message = status.message.unwrap_or_default();
        match status.code {
            Some(429) => Err(ProviderError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            }),
            Some(400) | Some(404) => Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            }),
            _ => Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message,
            }),
        }
    }

    fn parse_decimal(field: &str, value: &Option<String>) -> Result<Decimal, ProviderError> {
        value
            .as_deref()
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("missing or invalid field: {}", field),
            })
    }

    /// How many daily bars to request for a period, capped at the vendor's
    /// free-tier maximum of 5000.
    fn output_size(period: HistoricalPeriod) -> i64 {
        period.days().min(5000)
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, class: DataClass) -> bool {
        matches!(class, DataClass::Quote | DataClass::Historical)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let params = [("symbol", symbol)];
        let text = self.fetch("quote", &params).await?;
        Self::check_api_error(&text, symbol)?;

        let response: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse quote: {}", e),
            })?;

        if response.symbol.is_none() && response.close.is_none() {
            return Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        let price = Self::parse_decimal("close", &response.close)?;
        let change = Self::parse_decimal("change", &response.change).unwrap_or(Decimal::ZERO);
        let change_percent =
            Self::parse_decimal("percent_change", &response.percent_change).unwrap_or(Decimal::ZERO);
        let volume = response
            .volume
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok());

        Ok(Quote {
            ticker: symbol.to_string(),
            price,
            change,
            change_percent,
            volume,
            as_of: Utc::now(),
            source: DataSource::TwelveData,
        })
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: HistoricalPeriod,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        let size = Self::output_size(period).to_string();
        let params = [
            ("symbol", symbol),
            ("interval", "1day"),
            ("outputsize", size.as_str()),
        ];

        let text = self.fetch("time_series", &params).await?;
        Self::check_api_error(&text, symbol)?;

        let response: TimeSeriesResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse time series: {}", e),
            })?;

        let values = response.values.ok_or_else(|| ProviderError::NotFound {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

        let mut bars: Vec<HistoricalBar> = values
            .into_iter()
            .filter_map(|v| {
                // Intraday-capable endpoint, but 1day bars carry a plain date.
                let date = NaiveDate::parse_from_str(&v.datetime, "%Y-%m-%d").ok()?;
                Some(HistoricalBar {
                    ticker: symbol.to_string(),
                    date,
                    open: Decimal::from_str(&v.open).ok()?,
                    high: Decimal::from_str(&v.high).ok()?,
                    low: Decimal::from_str(&v.low).ok()?,
                    close: Decimal::from_str(&v.close).ok()?,
                    volume: v.volume.as_deref().and_then(|s| s.parse().ok()),
                    source: DataSource::TwelveData,
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("time series for {} contained no parseable bars", symbol),
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!("Twelve Data: fetched {} bars for {}", bars.len(), symbol);

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_with_429_is_rate_limited() {
        let body = r#"{"code":429,"message":"You have run out of API credits","status":"error"}"#;
        let err = TwelveDataProvider::check_api_error(body, "AAPL").unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn error_envelope_with_400_is_not_found() {
        let body = r#"{"code":400,"message":"symbol not found","status":"error"}"#;
        let err = TwelveDataProvider::check_api_error(body, "NOPE").unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn ok_payload_passes_error_check() {
        let body = r#"{"symbol":"AAPL","close":"187.44","status":"ok"}"#;
        assert!(TwelveDataProvider::check_api_error(body, "AAPL").is_ok());
    }

    #[test]
    fn output_size_is_capped() {
        assert_eq!(
            TwelveDataProvider::output_size(HistoricalPeriod::OneMonth),
            30
        );
        assert_eq!(TwelveDataProvider::output_size(HistoricalPeriod::Max), 5000);
    }

    #[test]
    fn supports_quote_and_history_only() {
        let provider = TwelveDataProvider::new("test_key".to_string());
        assert!(provider.supports(DataClass::Quote));
        assert!(provider.supports(DataClass::Historical));
        assert!(!provider.supports(DataClass::Fundamentals));
    }
}
