use crate::models::analysis::{OhlcPoint, SeriesReport, SeriesStats};
use crate::models::stock::BarSeries;
use crate::util::{self, round2};

pub const SHORT_SMA_WINDOW: usize = 20;
pub const LONG_SMA_WINDOW: usize = 50;

/// Simple moving average rounded to 2 decimals; the first `window - 1`
/// points are reported as 0.
pub fn sma(closes: &[f64], window: usize) -> Vec<f64> {
    util::rolling_mean(closes, window)
        .into_iter()
        .map(|v| v.map(round2).unwrap_or(0.0))
        .collect()
}

/// 日收益率（百分比，未取整），首日为 0
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(closes.len());
    for (i, close) in closes.iter().enumerate() {
        if i == 0 || closes[i - 1] == 0.0 {
            returns.push(0.0);
        } else {
            returns.push((close / closes[i - 1] - 1.0) * 100.0);
        }
    }
    returns
}

pub fn series_stats(closes: &[f64], returns: &[f64]) -> SeriesStats {
    let (first, last) = match (closes.first(), closes.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return SeriesStats::default(),
    };

    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let change_pct = if first != 0.0 { (last / first - 1.0) * 100.0 } else { 0.0 };

    SeriesStats {
        avg_price: round2(util::mean(closes)),
        min_price: round2(min),
        max_price: round2(max),
        start_price: round2(first),
        end_price: round2(last),
        price_change: round2(last - first),
        price_change_percent: round2(change_pct),
        volatility: round2(util::sample_std(returns)),
    }
}

/// 计算图表与统计所需的全部指标
pub fn compute_series_report(series: &BarSeries) -> SeriesReport {
    let bars = series.bars();
    let closes = series.closes();
    let returns = daily_returns(&closes);

    SeriesReport {
        dates: bars.iter().map(|b| util::format_date(&b.date)).collect(),
        prices: closes.iter().map(|c| round2(*c)).collect(),
        volumes: bars.iter().map(|b| b.volume).collect(),
        sma20: sma(&closes, SHORT_SMA_WINDOW),
        sma50: sma(&closes, LONG_SMA_WINDOW),
        daily_returns: returns.iter().map(|r| round2(*r)).collect(),
        ohlc: bars
            .iter()
            .map(|b| OhlcPoint {
                date: util::format_date(&b.date),
                open: round2(b.open),
                high: round2(b.high),
                low: round2(b.low),
                close: round2(b.close),
            })
            .collect(),
        stats: series_stats(&closes, &returns),
    }
}
