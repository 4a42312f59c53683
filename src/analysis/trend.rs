use crate::models::analysis::TrendAssessment;
use crate::models::stock::BarSeries;
use crate::util::{self, round2};

pub const RSI_PERIOD: usize = 14;
pub const NEUTRAL_RSI: f64 = 50.0;
pub const OVERBOUGHT_RSI: f64 = 70.0;
pub const OVERSOLD_RSI: f64 = 30.0;
const LOSS_FLOOR: f64 = 1e-4;
const RECENT_RETURN_WINDOW: usize = 20;
const MAX_STRENGTH: i32 = 6;
// 价格与均线相对差小于该值视为持平
const LEVEL_TOLERANCE: f64 = 1e-9;

/// RSI of the last bar, using simple rolling means of gains and losses.
///
/// With fewer than `period` deltas the averages are undefined and fall back
/// to a zero gain over the loss floor. A zero average loss is replaced by the
/// floor; when both averages are zero the ratio is undefined and the neutral
/// value 50 is returned.
pub fn relative_strength_index(closes: &[f64], period: usize) -> f64 {
    // 首个差值记为 0
    let deltas: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    let (avg_gain, avg_loss) = if period > 0 && deltas.len() >= period {
        let window = &deltas[deltas.len() - period..];
        let gain = window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let loss = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;
        (gain, loss)
    } else {
        (0.0, LOSS_FLOOR)
    };

    rsi_from_averages(avg_gain, avg_loss)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let avg_loss = if avg_loss <= 0.0 {
        if avg_gain <= 0.0 {
            return NEUTRAL_RSI;
        }
        LOSS_FLOOR
    } else {
        avg_loss
    };

    let rs = avg_gain / avg_loss;
    if !rs.is_finite() {
        return NEUTRAL_RSI;
    }
    100.0 - 100.0 / (1.0 + rs)
}

/// Where the last close sits relative to a moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Above,
    At,
    Below,
}

impl Level {
    fn of(price: f64, average: f64) -> Self {
        let tolerance = LEVEL_TOLERANCE * average.abs().max(1.0);
        if price - average > tolerance {
            Level::Above
        } else if average - price > tolerance {
            Level::Below
        } else {
            Level::At
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaPosition {
    pub sma20: Level,
    pub sma50: Level,
    pub sma200: Level,
}

impl MaPosition {
    fn above20(&self) -> bool {
        self.sma20 == Level::Above
    }
    fn above50(&self) -> bool {
        self.sma50 == Level::Above
    }
    fn above200(&self) -> bool {
        self.sma200 == Level::Above
    }
    fn below20(&self) -> bool {
        self.sma20 == Level::Below
    }
    fn below50(&self) -> bool {
        self.sma50 == Level::Below
    }
    fn below200(&self) -> bool {
        self.sma200 == Level::Below
    }
}

pub struct TrendRule {
    pub label: &'static str,
    pub strength: i32,
    matches: fn(&MaPosition) -> bool,
}

fn strong_uptrend(p: &MaPosition) -> bool {
    p.above20() && p.above50() && p.above200()
}
fn uptrend(p: &MaPosition) -> bool {
    p.above20() && p.above50()
}
fn weak_uptrend(p: &MaPosition) -> bool {
    p.above20()
}
fn strong_downtrend(p: &MaPosition) -> bool {
    p.below20() && p.below50() && p.below200()
}
fn downtrend(p: &MaPosition) -> bool {
    p.below20() && p.below50()
}
fn weak_downtrend(p: &MaPosition) -> bool {
    p.below20()
}
fn sideways(_: &MaPosition) -> bool {
    true
}

/// 按顺序匹配，第一条命中的规则生效
pub static TREND_RULES: [TrendRule; 7] = [
    TrendRule { label: "Strong Uptrend", strength: 5, matches: strong_uptrend },
    TrendRule { label: "Uptrend", strength: 4, matches: uptrend },
    TrendRule { label: "Weak Uptrend", strength: 3, matches: weak_uptrend },
    TrendRule { label: "Strong Downtrend", strength: -5, matches: strong_downtrend },
    TrendRule { label: "Downtrend", strength: -4, matches: downtrend },
    TrendRule { label: "Weak Downtrend", strength: -3, matches: weak_downtrend },
    TrendRule { label: "Sideways", strength: 0, matches: sideways },
];

pub fn classify_position(position: &MaPosition) -> (&'static str, i32) {
    TREND_RULES
        .iter()
        .find(|rule| (rule.matches)(position))
        .map(|rule| (rule.label, rule.strength))
        .unwrap_or(("Sideways", 0))
}

/// Moving average whose warm-up points are seeded with the first close.
fn seeded_sma(closes: &[f64], window: usize) -> Vec<f64> {
    let seed = closes.first().copied().unwrap_or_default();
    util::rolling_mean(closes, window)
        .into_iter()
        .map(|v| v.unwrap_or(seed))
        .collect()
}

/// 根据最近两个点判断 SMA20 与 SMA50 的金叉/死叉
fn crossovers(sma20: &[f64], sma50: &[f64]) -> (bool, bool) {
    if sma20.len() < 2 || sma50.len() < 2 {
        return (false, false);
    }
    let (s20_now, s20_prev) = (sma20[sma20.len() - 1], sma20[sma20.len() - 2]);
    let (s50_now, s50_prev) = (sma50[sma50.len() - 1], sma50[sma50.len() - 2]);

    let golden = s20_now > s50_now && s20_prev <= s50_prev;
    let death = s20_now < s50_now && s20_prev >= s50_prev;
    (golden, death)
}

pub fn assess_trend(series: &BarSeries) -> TrendAssessment {
    let closes = series.closes();

    let returns: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 }))
        .take(closes.len())
        .collect();

    let recent = &returns[returns.len().saturating_sub(RECENT_RETURN_WINDOW)..];
    let recent_return_pct = util::mean(recent) * 100.0;
    let volatility_pct = util::sample_std(&returns) * 100.0;

    let positive_days = returns.iter().filter(|r| **r > 0.0).count();
    let negative_days = returns.iter().filter(|r| **r < 0.0).count();
    let momentum_ratio = positive_days as f64 / negative_days.max(1) as f64;

    let rsi = relative_strength_index(&closes, RSI_PERIOD);

    let sma20 = seeded_sma(&closes, 20);
    let sma50 = seeded_sma(&closes, 50);
    let sma200 = seeded_sma(&closes, 200);

    let current = closes.last().copied().unwrap_or_default();
    let position = MaPosition {
        sma20: Level::of(current, sma20.last().copied().unwrap_or(current)),
        sma50: Level::of(current, sma50.last().copied().unwrap_or(current)),
        sma200: Level::of(current, sma200.last().copied().unwrap_or(current)),
    };

    let (base_label, base_strength) = classify_position(&position);
    let mut label = base_label.to_string();
    let mut strength = base_strength;

    let (golden_cross, death_cross) = crossovers(&sma20, &sma50);
    if golden_cross {
        label = "Golden Cross (Bullish Signal)".to_string();
        strength += 1;
    } else if death_cross {
        label = "Death Cross (Bearish Signal)".to_string();
        strength -= 1;
    }

    let overbought = rsi > OVERBOUGHT_RSI;
    let oversold = rsi < OVERSOLD_RSI;
    if overbought {
        label.push_str(" (Overbought)");
        strength -= 1;
    } else if oversold {
        label.push_str(" (Oversold)");
        strength += 1;
    }

    TrendAssessment {
        label,
        strength: strength.clamp(-MAX_STRENGTH, MAX_STRENGTH),
        recent_return_pct: round2(recent_return_pct),
        volatility_pct: round2(volatility_pct),
        momentum_ratio: round2(momentum_ratio),
        rsi: round2(rsi),
        overbought,
        oversold,
        golden_cross,
        death_cross,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stock::Bar;
    use chrono::{Duration, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                date: start + Duration::days(i as i64),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: 10_000,
            })
            .collect();
        BarSeries::new("TEST", bars)
    }

    fn position(sma20: Level, sma50: Level, sma200: Level) -> MaPosition {
        MaPosition { sma20, sma50, sma200 }
    }

    #[test]
    fn rsi_is_neutral_for_flat_prices() {
        assert_eq!(relative_strength_index(&[100.0; 40], RSI_PERIOD), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_stays_within_bounds_for_pure_gains() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let rsi = relative_strength_index(&closes, RSI_PERIOD);
        assert!(rsi > 99.0);
        assert!(rsi <= 100.0);
    }

    #[test]
    fn rsi_is_zero_for_pure_losses() {
        let closes: Vec<f64> = (0..40).map(|i| 200.0 - i as f64).collect();
        assert_eq!(relative_strength_index(&closes, RSI_PERIOD), 0.0);
    }

    #[test]
    fn rsi_uses_last_window_only() {
        // 最近 14 个差值：7 个 +2，7 个 -1
        let mut closes = vec![100.0; 20];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let rsi = relative_strength_index(&closes, RSI_PERIOD);
        assert!((rsi - 100.0 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rule_table_is_first_match_wins() {
        use Level::*;
        assert_eq!(classify_position(&position(Above, Above, Above)), ("Strong Uptrend", 5));
        assert_eq!(classify_position(&position(Above, Above, Below)), ("Uptrend", 4));
        assert_eq!(classify_position(&position(Above, Below, Above)), ("Weak Uptrend", 3));
        assert_eq!(classify_position(&position(Below, Below, Below)), ("Strong Downtrend", -5));
        assert_eq!(classify_position(&position(Below, Below, Above)), ("Downtrend", -4));
        assert_eq!(classify_position(&position(Below, Above, Below)), ("Weak Downtrend", -3));
        assert_eq!(classify_position(&position(At, At, At)), ("Sideways", 0));
        assert_eq!(classify_position(&position(At, Below, Below)), ("Sideways", 0));
    }

    #[test]
    fn flat_market_is_sideways() {
        let trend = assess_trend(&series_from_closes(&[250.0; 252]));
        assert_eq!(trend.label, "Sideways");
        assert_eq!(trend.strength, 0);
        assert_eq!(trend.rsi, 50.0);
        assert!(!trend.overbought && !trend.oversold);
        assert!(!trend.golden_cross && !trend.death_cross);
        assert_eq!(trend.volatility_pct, 0.0);
        assert_eq!(trend.momentum_ratio, 0.0);
    }

    #[test]
    fn steady_rally_is_overbought_strong_uptrend() {
        let closes: Vec<f64> = (0..260).map(|i| 50.0 + i as f64 * 0.5).collect();
        let trend = assess_trend(&series_from_closes(&closes));
        assert_eq!(trend.label, "Strong Uptrend (Overbought)");
        assert_eq!(trend.strength, 4);
        assert!(trend.overbought);
        assert!(trend.recent_return_pct > 0.0);
    }

    #[test]
    fn steady_decline_is_oversold_strong_downtrend() {
        let closes: Vec<f64> = (0..260).map(|i| 300.0 - i as f64 * 0.5).collect();
        let trend = assess_trend(&series_from_closes(&closes));
        assert_eq!(trend.label, "Strong Downtrend (Oversold)");
        assert_eq!(trend.strength, -4);
        assert!(trend.oversold);
        assert_eq!(trend.momentum_ratio, 0.0);
    }

    #[test]
    fn golden_cross_overrides_label() {
        // 长期下跌后急涨，使 SMA20 在最后一根上穿 SMA50
        let mut closes: Vec<f64> = (0..80).map(|i| 200.0 - i as f64).collect();
        let mut found = false;
        for _ in 0..60 {
            let last = *closes.last().unwrap();
            closes.push(last + 6.0);
            let trend = assess_trend(&series_from_closes(&closes));
            if trend.golden_cross {
                assert!(trend.label.starts_with("Golden Cross (Bullish Signal)"));
                assert!(!trend.death_cross);
                found = true;
                break;
            }
        }
        assert!(found);
    }

    #[test]
    fn death_cross_overrides_label() {
        // 长期上涨后急跌，使 SMA20 在最后一根下穿 SMA50
        let mut closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let mut found = false;
        for _ in 0..60 {
            let last = *closes.last().unwrap();
            closes.push(last - 6.0);
            let trend = assess_trend(&series_from_closes(&closes));
            if trend.death_cross {
                assert!(trend.label.starts_with("Death Cross (Bearish Signal)"));
                assert!(!trend.golden_cross);
                assert!(trend.strength < 0);
                found = true;
                break;
            }
        }
        assert!(found);
    }

    #[test]
    fn strength_is_always_bounded() {
        let patterns: Vec<Vec<f64>> = vec![
            (0..300).map(|i| 100.0 + (i as f64 * 0.3).sin() * 20.0).collect(),
            (0..30).map(|i| 10.0 + i as f64).collect(),
            vec![5.0, 4.0, 6.0],
            vec![42.0],
        ];
        for closes in patterns {
            let trend = assess_trend(&series_from_closes(&closes));
            assert!((-6..=6).contains(&trend.strength));
            assert!((0.0..=100.0).contains(&trend.rsi));
        }
    }
}
