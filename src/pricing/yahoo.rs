//! Yahoo Finance chart API client
//!
//! Fetches daily closes from the v8 chart endpoint. Bar timestamps are shifted
//! by the exchange's GMT offset before taking the calendar date, so FX bars
//! stamped late in the previous UTC day land on the right trading date.

use super::{DailyClose, MarketDataProvider, ProviderError};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance API base URL
pub const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";

/// Configuration for the Yahoo client
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Base URL for the chart API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ProviderConfig> for YahooConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Client for the Yahoo Finance chart API
pub struct YahooClient {
    config: YahooConfig,
    client: Client,
}

impl YahooClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_config(YahooConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: YahooConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("Mozilla/5.0 (compatible; vote-backtest)")
            .build()?;

        Ok(Self { config, client })
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.config.base_url, ticker)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        let url = self.chart_url(ticker);
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive
        let period2 = (end + ChronoDuration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        tracing::debug!(ticker, %start, %end, "Fetching daily history");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        // Yahoo answers unknown tickers with 404 and an error body
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body = response.text().await?;
        let mut closes = parse_chart(&body)?;
        closes.retain(|c| c.date >= start && c.date <= end);
        Ok(closes)
    }
}

/// Chart response envelope
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    /// Absent when the window has no bars
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
    #[allow(dead_code)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Parse a chart response body into ascending daily closes, dropping null bars
fn parse_chart(body: &str) -> Result<Vec<DailyClose>, ProviderError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = response.chart.error {
        let code = error.code.unwrap_or_default();
        if code == "Not Found" {
            return Ok(vec![]);
        }
        return Err(ProviderError::Api(format!(
            "{}: {}",
            code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(vec![]);
    };
    let Some(timestamps) = result.timestamp else {
        return Ok(vec![]);
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != timestamps.len() {
        return Err(ProviderError::Parse(format!(
            "{} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    let mut series = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.into_iter().zip(closes) {
        let Some(close) = close.and_then(Decimal::from_f64) else {
            continue;
        };
        let local = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0)
            .ok_or_else(|| ProviderError::Parse(format!("invalid timestamp {}", ts)))?;
        series.push(DailyClose {
            date: local.date_naive(),
            close: close.round_dp(6),
        });
    }
    series.sort_by_key(|c| c.date);
    series.dedup_by_key(|c| c.date);
    Ok(series)
}
