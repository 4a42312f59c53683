pub mod indicators;
pub mod predictor;
pub mod recommendation;
pub mod ticker;
pub mod trend;

use crate::errors::{AdvisorError, Result};
use crate::models::analysis::Recommendation;
use crate::models::stock::{BarSeries, Fundamentals};

/// 趋势 → 预测 → 评分，纯计算，不访问数据源
pub fn evaluate(series: &BarSeries, fundamentals: &Fundamentals, days: usize) -> Result<Recommendation> {
    let current_price = series
        .last()
        .map(|bar| bar.close)
        .ok_or_else(|| AdvisorError::NoData { ticker: series.symbol.clone() })?;

    let trend = trend::assess_trend(series);
    let prediction = predictor::predict_prices(series, days);

    Ok(recommendation::build_recommendation(current_price, &trend, prediction, fundamentals))
}
