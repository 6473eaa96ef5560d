//! Synthesis fallback backed by an OpenAI-compatible chat completions API.
//!
//! Last resort when every real vendor has failed. The model is asked for a
//! strict-JSON estimate and the answer is marked [`DataSource::Synthetic`] so
//! downstream consumers can disclose that the number is an approximation, not
//! an observation.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ProviderError;
use crate::models::{
    DataClass, DataSource, Fundamentals, HistoricalBar, HistoricalPeriod, Quote,
};
use crate::provider::MarketDataProvider;

const PROVIDER_ID: &str = "SYNTHETIC";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct SyntheticProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The shape the model is instructed to emit for a quote estimate.
#[derive(Debug, Deserialize)]
struct QuoteEstimate {
    price: f64,
    #[serde(default)]
    change_percent: Option<f64>,
}

/// The shape the model is instructed to emit for a history estimate.
#[derive(Debug, Deserialize)]
struct HistoryEstimate {
    bars: Vec<BarEstimate>,
}

#[derive(Debug, Deserialize)]
struct BarEstimate {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// The shape the model is instructed to emit for fundamentals.
#[derive(Debug, Deserialize)]
struct FundamentalsEstimate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    pe_ratio: Option<f64>,
}

impl SyntheticProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a market data estimator. Respond with a single JSON \
                                object and nothing else. No prose, no code fences."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.2,
        });

        debug!("synthesis request to {} using {}", self.base_url, self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
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
        if !status.is_success() {
            return Err(ProviderError::Unavailable {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(ProviderError::Network)?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: "completion contained no choices".to_string(),
            })
    }

    /// Models occasionally wrap the object in markdown fences despite the
    /// instructions. Strip them before parsing.
    fn extract_json(content: &str) -> &str {
        let trimmed = content.trim();
        let trimmed = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
    }

    fn parse_payload<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ProviderError> {
        serde_json::from_str(Self::extract_json(content)).map_err(|e| {
            warn!("synthesis returned unparseable payload: {}", e);
            ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("completion was not the requested JSON object: {}", e),
            }
        })
    }

    fn decimal_from(value: f64) -> Result<Decimal, ProviderError> {
        Decimal::from_str(&format!("{:.4}", value)).map_err(|_| ProviderError::Malformed {
            provider: PROVIDER_ID.to_string(),
            message: "estimate was not a finite number".to_string(),
        })
    }

    fn bars_from(
        symbol: &str,
        estimate: HistoryEstimate,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        if estimate.bars.is_empty() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: "completion carried no bars".to_string(),
            });
        }

        let mut bars = Vec::with_capacity(estimate.bars.len());
        for entry in estimate.bars {
            let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").map_err(|_| {
                ProviderError::Malformed {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("unparseable bar date: {}", entry.date),
                }
            })?;
            for price in [entry.open, entry.high, entry.low, entry.close] {
                if !price.is_finite() || price <= 0.0 {
                    return Err(ProviderError::Malformed {
                        provider: PROVIDER_ID.to_string(),
                        message: format!("implausible bar price for {}: {}", entry.date, price),
                    });
                }
            }
            bars.push(HistoricalBar {
                ticker: symbol.to_string(),
                date,
                open: Self::decimal_from(entry.open)?,
                high: Self::decimal_from(entry.high)?,
                low: Self::decimal_from(entry.low)?,
                close: Self::decimal_from(entry.close)?,
                volume: entry
                    .volume
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v as i64),
                source: DataSource::Synthetic,
            });
        }
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
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
        let prompt = format!(
            "Estimate the most recent trading price for the stock ticker {}. \
             Reply with exactly: {{\"price\": <number>, \"change_percent\": <number>}}",
            symbol
        );

        let content = self.complete(&prompt).await?;
        let estimate: QuoteEstimate = Self::parse_payload(&content)?;

        if !estimate.price.is_finite() || estimate.price <= 0.0 {
            return Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: format!("implausible price estimate: {}", estimate.price),
            });
        }

        Ok(Quote {
            ticker: symbol.to_string(),
            price: Self::decimal_from(estimate.price)?,
            change: Decimal::ZERO,
            change_percent: estimate
                .change_percent
                .filter(|v| v.is_finite())
                .map(Self::decimal_from)
                .transpose()?
                .unwrap_or(Decimal::ZERO),
            volume: None,
            as_of: Utc::now(),
            source: DataSource::Synthetic,
        })
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        period: HistoricalPeriod,
    ) -> Result<Vec<HistoricalBar>, ProviderError> {
        let prompt = format!(
            "Provide an approximate daily OHLCV price history for the stock ticker {} \
             covering the last {} calendar days, trading days only, oldest first. Reply \
             with exactly: {{\"bars\": [{{\"date\": \"YYYY-MM-DD\", \"open\": <number>, \
             \"high\": <number>, \"low\": <number>, \"close\": <number>, \
             \"volume\": <number>}}, ...]}}",
            symbol,
            period.days()
        );

        let content = self.complete(&prompt).await?;
        let estimate: HistoryEstimate = Self::parse_payload(&content)?;
        Self::bars_from(symbol, estimate)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, ProviderError> {
        let prompt = format!(
            "Provide approximate fundamentals for the stock ticker {}. Reply with exactly: \
             {{\"name\": <string>, \"sector\": <string>, \"industry\": <string>, \
             \"market_cap\": <number>, \"pe_ratio\": <number>}}",
            symbol
        );

        let content = self.complete(&prompt).await?;
        let estimate: FundamentalsEstimate = Self::parse_payload(&content)?;

        let mut fundamentals = Fundamentals::new(symbol, DataSource::Synthetic);
        fundamentals.name = estimate.name;
        fundamentals.sector = estimate.sector;
        fundamentals.industry = estimate.industry;
        fundamentals.market_cap = estimate
            .market_cap
            .filter(|v| v.is_finite() && *v > 0.0)
            .map(Self::decimal_from)
            .transpose()?;
        fundamentals.pe_ratio = estimate
            .pe_ratio
            .filter(|v| v.is_finite())
            .map(Self::decimal_from)
            .transpose()?;

        if !fundamentals.has_data() {
            return Err(ProviderError::Malformed {
                provider: PROVIDER_ID.to_string(),
                message: "completion carried no usable fields".to_string(),
            });
        }

        Ok(fundamentals)
    }
}
