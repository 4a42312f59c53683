use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::ticker::is_indian_symbol;
use crate::util;

/// 日线数据结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// One symbol's daily bars, ascending by date with no duplicated dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// 按日期升序排序，同一日期保留最后一条
    pub fn new(symbol: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by(|a, b| a.date.cmp(&b.date));

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            symbol: symbol.to_string(),
            bars: deduped,
        }
    }

    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// 最近 `max_bars` 条日线，不足时返回全部
    pub fn recent(&self, max_bars: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(max_bars);
        &self.bars[start..]
    }
}

/// 基本面快照，缺失字段为 `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub day_low: Option<f64>,
    pub day_high: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
    pub avg_volume: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub beta: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub recommendation_key: Option<String>,
}

/// Fundamentals as seen by the pipeline: either a snapshot or the reason
/// the lookup failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Fundamentals {
    Available(FundamentalSnapshot),
    Unavailable { reason: String },
}

impl Fundamentals {
    pub fn snapshot(&self) -> Option<&FundamentalSnapshot> {
        match self {
            Fundamentals::Available(snapshot) => Some(snapshot),
            Fundamentals::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Fundamentals::Available(_))
    }

    pub fn pe_ratio(&self) -> Option<f64> {
        self.snapshot().and_then(|s| s.pe_ratio)
    }

    pub fn target_mean_price(&self) -> Option<f64> {
        self.snapshot().and_then(|s| s.target_mean_price)
    }

    pub fn recommendation_key(&self) -> Option<&str> {
        self.snapshot().and_then(|s| s.recommendation_key.as_deref())
    }
}

/// 公司概况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub employees: Option<u64>,
    pub exchange: Option<String>,
}

impl CompanyProfile {
    pub fn unavailable(ticker: &str) -> Self {
        Self {
            name: ticker.to_string(),
            description: Some("Information not available".to_string()),
            ..Self::default()
        }
    }
}

/// Display-oriented metrics derived from the symbol and its fundamentals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub currency_symbol: String,
    pub is_indian_stock: bool,
    pub market_cap_formatted: String,
    pub dividend_yield_pct: Option<f64>,
}

impl MarketMetrics {
    pub fn from_fundamentals(symbol: &str, fundamentals: &Fundamentals) -> Self {
        let is_indian_stock = is_indian_symbol(symbol);
        let currency_symbol = if is_indian_stock { "₹" } else { "$" };
        let snapshot = fundamentals.snapshot();

        let market_cap_formatted = snapshot
            .and_then(|s| s.market_cap)
            .map(|cap| util::format_market_cap(cap, currency_symbol))
            .unwrap_or_else(|| "N/A".to_string());

        let dividend_yield_pct = snapshot
            .and_then(|s| s.dividend_yield)
            .filter(|y| *y != 0.0)
            .map(|y| util::round2(y * 100.0));

        Self {
            currency_symbol: currency_symbol.to_string(),
            is_indian_stock,
            market_cap_formatted,
            dividend_yield_pct,
        }
    }
}
