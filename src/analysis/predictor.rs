//! 短期价格预测
//!
//! 在最近一段日线上拟合线性回归（特征：日序号、MA7、MA14、7 日波动率），
//! 然后逐日外推，并把单日涨跌幅限制在 3% 以内。

use chrono::Duration;
use log::warn;

use crate::models::analysis::Prediction;
use crate::models::stock::{Bar, BarSeries};
use crate::util::{self, round2};

pub const DEFAULT_HORIZON_DAYS: usize = 30;
pub const LOOKBACK_BARS: usize = 90;
pub const MAX_DAILY_CHANGE: f64 = 0.03;
/// Fewer bars than this still predict, but the fit is of little value.
pub const RECOMMENDED_MIN_BARS: usize = 14;

const FEATURE_COUNT: usize = 4;
const PIVOT_TOLERANCE: f64 = 1e-10;

type Features = [f64; FEATURE_COUNT];

/// Ordinary least squares fit `y = intercept + coefficients · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Features,
}

impl LinearFit {
    pub fn predict(&self, x: &Features) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x.iter())
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// Fits by solving the centred normal equations. Columns that are constant
/// or linearly dependent on earlier ones get a zero coefficient, so
/// degenerate inputs reduce to predicting the mean.
pub fn fit_linear(rows: &[Features], targets: &[f64]) -> LinearFit {
    let n = rows.len().min(targets.len());
    if n == 0 {
        return LinearFit { intercept: 0.0, coefficients: [0.0; FEATURE_COUNT] };
    }

    let mut x_mean = [0.0; FEATURE_COUNT];
    for row in &rows[..n] {
        for (m, v) in x_mean.iter_mut().zip(row.iter()) {
            *m += v / n as f64;
        }
    }
    let y_mean = util::mean(&targets[..n]);

    // 中心化后的 XᵀX 与 Xᵀy
    let mut xtx = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
    let mut xty = [0.0; FEATURE_COUNT];
    for (row, y) in rows[..n].iter().zip(targets[..n].iter()) {
        let centred: Vec<f64> = row.iter().zip(x_mean.iter()).map(|(v, m)| v - m).collect();
        let dy = y - y_mean;
        for i in 0..FEATURE_COUNT {
            xty[i] += centred[i] * dy;
            for j in 0..FEATURE_COUNT {
                xtx[i][j] += centred[i] * centred[j];
            }
        }
    }

    let coefficients = solve_symmetric(xtx, xty);
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(x_mean.iter())
            .map(|(c, m)| c * m)
            .sum::<f64>();

    LinearFit { intercept, coefficients }
}

// 带部分主元的高斯消元，主元过小的列视为自由变量并取 0
fn solve_symmetric(mut a: [[f64; FEATURE_COUNT]; FEATURE_COUNT], mut b: Features) -> Features {
    let scale = (0..FEATURE_COUNT).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let tolerance = PIVOT_TOLERANCE * scale.max(f64::MIN_POSITIVE);

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(FEATURE_COUNT);
    let mut row = 0;
    for col in 0..FEATURE_COUNT {
        if row >= FEATURE_COUNT {
            break;
        }
        let best = (row..FEATURE_COUNT)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(row);
        if a[best][col].abs() <= tolerance {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);

        for r in row + 1..FEATURE_COUNT {
            let factor = a[r][col] / a[row][col];
            if factor != 0.0 {
                for c in col..FEATURE_COUNT {
                    a[r][c] -= factor * a[row][c];
                }
                b[r] -= factor * b[row];
            }
        }
        pivots.push((row, col));
        row += 1;
    }

    let mut solution = [0.0; FEATURE_COUNT];
    for &(r, col) in pivots.iter().rev() {
        let mut acc = b[r];
        for c in col + 1..FEATURE_COUNT {
            acc -= a[r][c] * solution[c];
        }
        solution[col] = acc / a[r][col];
    }
    solution
}

/// 每根日线的特征：日序号、MA7、MA14（窗口未满时取收盘价）、7 日标准差（未满时为 0）
pub fn engineer_features(bars: &[Bar]) -> Vec<Features> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma7 = util::rolling_mean(&closes, 7);
    let ma14 = util::rolling_mean(&closes, 14);
    let vol7 = util::rolling_std(&closes, 7);

    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            [
                i as f64,
                ma7[i].unwrap_or(*close),
                ma14[i].unwrap_or(*close),
                vol7[i].unwrap_or(0.0),
            ]
        })
        .collect()
}

/// Projects `days` calendar days past the last bar.
pub fn predict_prices(series: &BarSeries, days: usize) -> Prediction {
    let bars = series.recent(LOOKBACK_BARS);
    let (last_bar, last_close) = match bars.last() {
        Some(bar) => (bar, bar.close),
        None => return Prediction::default(),
    };
    if bars.len() < RECOMMENDED_MIN_BARS {
        warn!(
            "Predicting {} from only {} bars; the projection will be low quality",
            series.symbol,
            bars.len()
        );
    }

    let features = engineer_features(bars);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    // 只用最近三分之一的数据训练
    let train_len = (bars.len() / 3).max(1);
    let start = bars.len() - train_len;
    let fit = fit_linear(&features[start..], &closes[start..]);

    let last = features[features.len() - 1];
    let last_day = last[0];
    let (mut ma7, mut ma14, volatility) = (last[1], last[2], last[3]);

    let mut prediction = Prediction {
        dates: Vec::with_capacity(days),
        prices: Vec::with_capacity(days),
    };
    let mut previous = last_close;

    for step in 1..=days {
        let mut raw = fit.predict(&[last_day + step as f64, ma7, ma14, volatility]);
        if !raw.is_finite() {
            raw = previous;
        }
        let max_change = previous.abs() * MAX_DAILY_CHANGE;
        let price = raw.clamp(previous - max_change, previous + max_change);

        let date = last_bar.date + Duration::days(step as i64);
        prediction.dates.push(util::format_date(&date));
        prediction.prices.push(round2(price));
        previous = round2(price);

        ma7 = (ma7 * 6.0 + price) / 7.0;
        ma14 = (ma14 * 13.0 + price) / 14.0;
    }

    prediction
}
