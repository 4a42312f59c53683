use crate::config::Config;
use crate::errors::{AdvisorError, Result};
use crate::models::stock::{Bar, BarSeries, CompanyProfile, FundamentalSnapshot};
use crate::sources::base::MarketDataSource;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const SOURCE_NAME: &str = "Yahoo Finance";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";

/// Yahoo Finance 数据源（同步 HTTP）
pub struct YahooFinanceSource {
    client: Client,
    probe_client: Client,
    base_url: String,
    probe_url: String,
}

impl YahooFinanceSource {
    /// 创建新的 Yahoo Finance 数据源
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let probe_client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            probe_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_url: config.probe_url.clone(),
        })
    }

    fn fetch_quote_summary(&self, symbol: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol))
            .query(&[("modules", SUMMARY_MODULES)])
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(AdvisorError::FundamentalsUnavailable {
                symbol: symbol.to_string(),
                reason: format!("HTTP status {}", status),
            });
        }

        let json: Value = serde_json::from_str(&text)?;
        first_summary_result(symbol, &json).cloned()
    }
}

impl MarketDataSource for YahooFinanceSource {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn probe_connectivity(&self) -> Result<()> {
        self.probe_client
            .get(&self.probe_url)
            .send()
            .map(|_| ())
            .map_err(|e| AdvisorError::Connectivity {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })
    }

    fn fetch_history(&self, symbol: &str, period: &str) -> Result<BarSeries> {
        debug!("获取 {} 的 {} 日线数据", symbol, period);

        let response = self
            .client
            .get(format!("{}/v8/finance/chart/{}", self.base_url, symbol))
            .query(&[("range", period), ("interval", "1d"), ("includePrePost", "false")])
            .send()?;

        let status = response.status();
        let text = response.text()?;

        match parse_chart(symbol, &text) {
            Ok(series) => {
                debug!("获取到 {} 条日线记录", series.len());
                Ok(series)
            }
            Err(e) if !status.is_success() => Err(AdvisorError::DataError(format!(
                "History request for {} failed: HTTP status {} ({})",
                symbol, status, e
            ))),
            Err(e) => Err(e),
        }
    }

    fn fetch_snapshot(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        let summary = self.fetch_quote_summary(symbol)?;
        Ok(parse_snapshot(&summary))
    }

    fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let summary = self.fetch_quote_summary(symbol)?;
        Ok(parse_profile(symbol, &summary))
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
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
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(rename = "exchangeTimezoneName")]
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// Parses a chart response. A missing result or an error payload (unknown or
/// delisted symbol) produces an empty series; rows without a close are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<BarSeries> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = &envelope.chart.error {
        info!(
            "{} returned no chart for {}: {} {}",
            SOURCE_NAME,
            symbol,
            error.code.as_deref().unwrap_or_default(),
            error.description.as_deref().unwrap_or_default()
        );
    }

    let result = match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(BarSeries::empty(symbol)),
    };

    let quote = match result.indicators.quote.into_iter().next() {
        Some(quote) => quote,
        None => return Ok(BarSeries::empty(symbol)),
    };

    // 时间戳按交易所所在时区换算为交易日
    let tz: Tz = result
        .meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(Tz::UTC);

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let close = match value_at(&quote.close, i) {
            Some(close) => close,
            None => continue,
        };
        let date = match DateTime::<Utc>::from_timestamp(*ts, 0) {
            Some(dt) => dt.with_timezone(&tz).date_naive(),
            None => continue,
        };

        bars.push(Bar {
            date,
            open: value_at(&quote.open, i).unwrap_or(close),
            high: value_at(&quote.high, i).unwrap_or(close),
            low: value_at(&quote.low, i).unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or_default(),
        });
    }

    Ok(BarSeries::new(symbol, bars))
}

fn value_at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn first_summary_result<'a>(symbol: &str, json: &'a Value) -> Result<&'a Value> {
    let summary = json.get("quoteSummary");

    summary
        .and_then(|s| s.get("result"))
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| {
            let reason = summary
                .and_then(|s| s.get("error"))
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .unwrap_or("empty quote summary");
            AdvisorError::FundamentalsUnavailable {
                symbol: symbol.to_string(),
                reason: reason.to_string(),
            }
        })
}

// 数值字段可能是裸数字，也可能是 {"raw": .., "fmt": ..}
fn number(summary: &Value, module: &str, key: &str) -> Option<f64> {
    match summary.get(module)?.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::Object(o) => o.get("raw").and_then(Value::as_f64),
        _ => None,
    }
}

fn text(summary: &Value, module: &str, key: &str) -> Option<String> {
    summary
        .get(module)?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

pub fn parse_snapshot(summary: &Value) -> FundamentalSnapshot {
    FundamentalSnapshot {
        current_price: number(summary, "financialData", "currentPrice")
            .or_else(|| number(summary, "price", "regularMarketPrice")),
        previous_close: number(summary, "summaryDetail", "previousClose"),
        open: number(summary, "summaryDetail", "open"),
        day_low: number(summary, "summaryDetail", "dayLow"),
        day_high: number(summary, "summaryDetail", "dayHigh"),
        market_cap: number(summary, "summaryDetail", "marketCap")
            .or_else(|| number(summary, "price", "marketCap")),
        volume: number(summary, "summaryDetail", "volume"),
        avg_volume: number(summary, "summaryDetail", "averageVolume"),
        pe_ratio: number(summary, "summaryDetail", "trailingPE"),
        forward_pe: number(summary, "summaryDetail", "forwardPE"),
        eps: number(summary, "defaultKeyStatistics", "trailingEps"),
        dividend_yield: number(summary, "summaryDetail", "dividendYield"),
        fifty_two_week_high: number(summary, "summaryDetail", "fiftyTwoWeekHigh"),
        fifty_two_week_low: number(summary, "summaryDetail", "fiftyTwoWeekLow"),
        beta: number(summary, "summaryDetail", "beta"),
        target_mean_price: number(summary, "financialData", "targetMeanPrice"),
        target_high_price: number(summary, "financialData", "targetHighPrice"),
        target_low_price: number(summary, "financialData", "targetLowPrice"),
        recommendation_key: text(summary, "financialData", "recommendationKey"),
    }
}

pub fn parse_profile(symbol: &str, summary: &Value) -> CompanyProfile {
    CompanyProfile {
        name: text(summary, "price", "shortName").unwrap_or_else(|| symbol.to_string()),
        sector: text(summary, "assetProfile", "sector"),
        industry: text(summary, "assetProfile", "industry"),
        website: text(summary, "assetProfile", "website"),
        description: text(summary, "assetProfile", "longBusinessSummary"),
        country: text(summary, "assetProfile", "country"),
        employees: number(summary, "assetProfile", "fullTimeEmployees").map(|n| n as u64),
        exchange: text(summary, "price", "exchangeName"),
    }
}
