use serde::{Serialize, Serializer};
use std::fmt;

use crate::models::stock::{CompanyProfile, Fundamentals, MarketMetrics};

/// Chart-ready OHLC point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcPoint {
    #[serde(rename = "x")]
    pub date: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub start_price: f64,
    pub end_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub volatility: f64,
}

/// 指标计算结果，各序列与日线一一对应
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesReport {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub volumes: Vec<i64>,
    pub sma20: Vec<f64>,
    pub sma50: Vec<f64>,
    pub daily_returns: Vec<f64>,
    pub ohlc: Vec<OhlcPoint>,
    pub stats: SeriesStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAssessment {
    #[serde(rename = "trend")]
    pub label: String,
    pub strength: i32,
    #[serde(rename = "recent_returns")]
    pub recent_return_pct: f64,
    #[serde(rename = "volatility")]
    pub volatility_pct: f64,
    pub momentum_ratio: f64,
    pub rsi: f64,
    pub overbought: bool,
    pub oversold: bool,
    pub golden_cross: bool,
    pub death_cross: bool,
}

/// 预测结果，`dates` 与 `prices` 等长
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
}

impl Prediction {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn final_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}

/// Ordered from least to most favourable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecommendationCategory {
    StrongSell,
    Sell,
    ModerateSell,
    Hold,
    ModerateBuy,
    Buy,
    StrongBuy,
}

pub const UNAVAILABLE_LABEL: &str = "Unable to Generate";

impl RecommendationCategory {
    pub const ALL: [RecommendationCategory; 7] = [
        RecommendationCategory::StrongSell,
        RecommendationCategory::Sell,
        RecommendationCategory::ModerateSell,
        RecommendationCategory::Hold,
        RecommendationCategory::ModerateBuy,
        RecommendationCategory::Buy,
        RecommendationCategory::StrongBuy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RecommendationCategory::StrongBuy => "Strong Buy",
            RecommendationCategory::Buy => "Buy",
            RecommendationCategory::ModerateBuy => "Moderate Buy",
            RecommendationCategory::Hold => "Hold",
            RecommendationCategory::ModerateSell => "Moderate Sell",
            RecommendationCategory::Sell => "Sell",
            RecommendationCategory::StrongSell => "Strong Sell",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            RecommendationCategory::StrongBuy => {
                "The stock shows strong positive trends, good analyst ratings, and favorable valuation metrics."
            }
            RecommendationCategory::Buy => {
                "The stock shows positive trends and potential for growth based on technical and fundamental factors."
            }
            RecommendationCategory::ModerateBuy => {
                "The stock shows some positive indicators, but with limited conviction."
            }
            RecommendationCategory::Hold => "The stock shows mixed signals with no clear trend direction.",
            RecommendationCategory::ModerateSell => {
                "The stock shows some negative indicators that suggest caution."
            }
            RecommendationCategory::Sell => "The stock shows negative trends and unfavorable metrics.",
            RecommendationCategory::StrongSell => {
                "The stock shows strong negative trends, poor analyst ratings, and concerning valuation metrics."
            }
        }
    }
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RecommendationCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

fn serialize_category<S: Serializer>(
    category: &Option<RecommendationCategory>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match category {
        Some(category) => category.serialize(serializer),
        None => serializer.serialize_str(UNAVAILABLE_LABEL),
    }
}

/// Per-component contributions to the recommendation score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub trend: i32,
    pub prediction: i32,
    pub analyst: i32,
    pub target: i32,
    pub valuation: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.trend + self.prediction + self.analyst + self.target + self.valuation
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// `None` only for the degraded result produced when history could not be fetched.
    #[serde(rename = "recommendation", serialize_with = "serialize_category")]
    pub category: Option<RecommendationCategory>,
    pub explanation: String,
    pub score: i32,
    pub breakdown: ScoreBreakdown,
    pub trend: String,
    #[serde(rename = "analyst_recommendation")]
    pub analyst_key: String,
    pub target_mean_price: Option<f64>,
    #[serde(rename = "target_potential")]
    pub target_potential_pct: Option<f64>,
    pub predicted_price: Option<f64>,
    #[serde(rename = "predicted_change")]
    pub predicted_change_pct: Option<f64>,
    pub prediction: Prediction,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        self.category.map(|c| c.label()).unwrap_or(UNAVAILABLE_LABEL)
    }

    pub fn is_degraded(&self) -> bool {
        self.category.is_none()
    }
}

/// 单次分析的完整输出
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub symbol: String,
    pub period: String,
    pub series: SeriesReport,
    pub profile: CompanyProfile,
    pub fundamentals: Fundamentals,
    pub metrics: MarketMetrics,
    pub recommendation: Recommendation,
}
