//! Alpha Vantage provider adapter.
//!
//! Tertiary vendor covering quotes, daily history, and fundamentals. The free
//! tier is throttled hard (5 calls per minute) and signals throttling through
//! a `Note` or `Information` field in an otherwise well-formed 200 response,
//! so those fields are checked before any payload is trusted.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::ProviderError;
use crate::models::{DataClass, DataSource, Fundamentals, HistoricalBar, HistoricalPeriod, Quote};
use crate::provider::MarketDataProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

/// GLOBAL_QUOTE response.
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

/// TIME_SERIES_DAILY response.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// OVERVIEW response. The API returns far more fields than these.
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Exchange")]
    exchange: Option<String>,
    #[serde(rename = "Currency")]
    currency: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "PEGRatio")]
    peg_ratio: Option<String>,
    #[serde(rename = "PriceToBookRatio")]
    price_to_book: Option<String>,
    #[serde(rename = "Beta")]
    beta: Option<String>,
    #[serde(rename = "EPS")]
    eps: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
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

    /// The free tier reports throttling as `Note` or `Information` text with
    /// HTTP 200. Any such field counts as a rate limit unless it reads like a
    /// symbol problem.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
        symbol: &str,
    ) -> Result<(), ProviderError> {
        if let Some(msg) = error_message {
            if msg.contains("Invalid API call") {
                return Err(ProviderError::NotFound {
                    provider: PROVIDER_ID.to_string(),
                    symbol: symbol.to_string(),
                });
            }
            return Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        for msg in [note, information].into_iter().flatten() {
            warn!("Alpha Vantage throttle notice: {}", msg);
            return Err(ProviderError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        Ok(())
    }

    fn parse_decimal(s: &str) -> Option<Decimal> {
        // OVERVIEW uses "None" and "-" for absent metrics.
        let trimmed = s.trim().trim_end_matches('%');
        if trimmed.is_empty() || trimmed == "None" || trimmed == "-" {
            return None;
        }
        Decimal::from_str(trimmed).ok()
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports(&self, class: DataClass) -> bool {
        matches!(
            class,
            DataClass::Quote | DataClass::Historical | DataClass::Fundamentals
        )
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;

        let response: GlobalQuoteResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse quote: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
            symbol,
        )?;

        // Unknown symbols return an empty Global Quote object.
        let quote = response
            .global_quote
            .filter(|q| q.price.is_some())
            .ok_or_else(|| ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            })?;

        let price = quote
            .price
            .as_deref()
            .and_then(Self::parse_decimal)
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: "missing or invalid price".to_string(),
            })?;

        Ok(Quote {
            ticker: symbol.to_string(),
            price,
            change: quote
                .change
                .as_deref()
                .and_then(Self::parse_decimal)
                .unwrap_or(Decimal::ZERO),
            change_percent: quote
                .change_percent
                .as_deref()
                .and_then(Self::parse_decimal)
                .unwrap_or(Decimal::ZERO),
            volume: quote.volume.as_deref().and_then(|s| s.parse().ok()),
            as_of: Utc::now(),
            source: DataSource::AlphaVantage,
        })
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: HistoricalPeriod,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        // 'full' is premium-only; compact covers roughly 100 trading days.
        let outputsize = if period.days() > 100 { "full" } else { "compact" };
        let params = [
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("outputsize", outputsize),
        ];

        let text = self.fetch(&params).await?;
        let response: TimeSeriesResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse time series: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
            symbol,
        )?;

        let time_series = response.time_series.ok_or_else(|| ProviderError::NotFound {
            provider: PROVIDER_ID.to_string(),
            symbol: symbol.to_string(),
        })?;

        let cutoff = Utc::now().date_naive() - chrono::Duration::days(period.days());
        let mut bars: Vec<HistoricalBar> = time_series
            .into_iter()
            .filter_map(|(date_str, bar)| {
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").ok()?;
                if date < cutoff {
                    return None;
                }
                Some(HistoricalBar {
                    ticker: symbol.to_string(),
                    date,
                    open: Decimal::from_str(&bar.open).ok()?,
                    high: Decimal::from_str(&bar.high).ok()?,
                    low: Decimal::from_str(&bar.low).ok()?,
                    close: Decimal::from_str(&bar.close).ok()?,
                    volume: bar.volume.parse().ok(),
                    source: DataSource::AlphaVantage,
                })
            })
            .collect();

        if bars.is_empty() {
            return Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!("Alpha Vantage: fetched {} bars for {}", bars.len(), symbol);

        Ok(bars)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, ProviderError> {
        let params = [("function", "OVERVIEW"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;

        let response: OverviewResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse overview: {}", e),
            })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
            symbol,
        )?;

        if response.symbol.is_none() {
            return Err(ProviderError::NotFound {
                provider: PROVIDER_ID.to_string(),
                symbol: symbol.to_string(),
            });
        }

        let mut fundamentals = Fundamentals::new(symbol, DataSource::AlphaVantage);
        fundamentals.name = response.name;
        fundamentals.exchange = response.exchange;
        fundamentals.currency = response.currency;
        fundamentals.sector = response.sector.filter(|s| s != "None");
        fundamentals.industry = response.industry.filter(|s| s != "None");
        fundamentals.description = response.description;
        fundamentals.market_cap = response
            .market_capitalization
            .as_deref()
            .and_then(Self::parse_decimal);
        fundamentals.pe_ratio = response.pe_ratio.as_deref().and_then(Self::parse_decimal);
        fundamentals.peg_ratio = response.peg_ratio.as_deref().and_then(Self::parse_decimal);
        fundamentals.price_to_book = response
            .price_to_book
            .as_deref()
            .and_then(Self::parse_decimal);
        fundamentals.beta = response.beta.as_deref().and_then(Self::parse_decimal);
        fundamentals.eps = response.eps.as_deref().and_then(Self::parse_decimal);
        fundamentals.dividend_yield = response
            .dividend_yield
            .as_deref()
            .and_then(Self::parse_decimal);
        fundamentals.fifty_two_week_high = response
            .week_52_high
            .as_deref()
            .and_then(Self::parse_decimal);
        fundamentals.fifty_two_week_low = response
            .week_52_low
            .as_deref()
            .and_then(Self::parse_decimal);

        Ok(fundamentals)
    }
}
