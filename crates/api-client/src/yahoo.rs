use crate::error::ApiError;
use crate::history::HistorySource;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use configuration::FallbackConfig;
use core_types::{Bar, Contract};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; trailguard/0.1)";

// --- Chart API Deserialization ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

/// Daily OHLCV columns. Days without trading come back as `null`.
#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Daily bars from the public Yahoo Finance chart API, the fallback source.
///
/// Broker codes are mapped to Yahoo tickers by appending the configured
/// exchange suffix, e.g. `2330` becomes `2330.TW`.
pub struct YahooHistory {
    client: reqwest::Client,
    base_url: String,
    symbol_suffix: String,
}

impl YahooHistory {
    pub fn new(config: &FallbackConfig, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            symbol_suffix: config.symbol_suffix.clone(),
        })
    }
}

#[async_trait]
impl HistorySource for YahooHistory {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn source_symbol(&self, contract: &Contract) -> String {
        format!("{}{}", contract.code, self.symbol_suffix)
    }

    async fn daily_bars(
        &self,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError> {
        let ticker = self.source_symbol(contract);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        // period2 is exclusive, so ask for up to the start of the following day.
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let period2 = end
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(ApiError::InvalidData(format!("Invalid date range {start}..{end}")));
        };

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

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(ticker = %ticker, status = status.as_u16(), "Chart response.");
        if status == reqwest::StatusCode::NOT_FOUND {
            // Unknown tickers are reported as 404 with an error body.
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_chart(&text)
    }
}

/// Turns a chart API body into bars, skipping days with missing prices.
fn parse_chart(body: &str) -> Result<Vec<Bar>, ApiError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    if let Some(err) = envelope.chart.error {
        return Err(ApiError::Unavailable(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let column = |values: &[Option<f64>]| values.get(i).copied().flatten().and_then(Decimal::from_f64);
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open),
            column(&quote.high),
            column(&quote.low),
            column(&quote.close),
        ) else {
            continue;
        };
        let date = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| ApiError::InvalidData(format!("Invalid bar timestamp: {ts}")))?
            .date_naive();

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume: column(&quote.volume).unwrap_or_default(),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_bars_and_skips_null_days() {
        let body = r#"{"chart":{"result":[{
            "timestamp":[1765846800,1765933200,1766019600],
            "indicators":{"quote":[{
                "open":[100.0,null,103.0],
                "high":[101.5,null,110.0],
                "low":[99.0,null,102.0],
                "close":[101.0,null,108.0],
                "volume":[1500,null,null]
            }]}
        }],"error":null}}"#;

        let bars = parse_chart(body).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 12, 16).unwrap());
        assert_eq!(bars[1].high, dec!(110));
        assert_eq!(bars[1].volume, Decimal::ZERO);
        assert_eq!(Bar::highest_high(&bars), Some(dec!(110)));
    }

    #[test]
    fn empty_result_is_no_data() {
        let body = r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());

        let body = r#"{"chart":{"result":null,"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn chart_error_is_surfaced() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(parse_chart(body), Err(ApiError::Unavailable(_))));
    }

    #[test]
    fn ticker_carries_the_exchange_suffix() {
        let source = YahooHistory::new(&FallbackConfig::default(), Duration::from_secs(5)).unwrap();
        let contract = Contract {
            code: "2330".to_string(),
            name: String::new(),
            reference: dec!(1000),
            limit_up: dec!(1100),
            limit_down: dec!(900),
        };
        assert_eq!(source.source_symbol(&contract), "2330.TW");
        assert_eq!(source.name(), "yahoo");
    }
}
