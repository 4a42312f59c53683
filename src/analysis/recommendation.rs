use crate::errors::AdvisorError;
use crate::models::analysis::{
    Prediction, Recommendation, RecommendationCategory, ScoreBreakdown, TrendAssessment,
};
use crate::models::stock::Fundamentals;
use crate::util::round2;

const STRONG_MOVE_PCT: f64 = 15.0;
const MODERATE_MOVE_PCT: f64 = 5.0;

/// +2 / +1 / -1 / -2 for a percentage move, most extreme bracket first.
pub fn move_points(change_pct: f64) -> i32 {
    if change_pct > STRONG_MOVE_PCT {
        2
    } else if change_pct > MODERATE_MOVE_PCT {
        1
    } else if change_pct < -STRONG_MOVE_PCT {
        -2
    } else if change_pct < -MODERATE_MOVE_PCT {
        -1
    } else {
        0
    }
}

/// 分析师评级：买入 +1，卖出 -1
pub fn analyst_points(key: &str) -> i32 {
    match key {
        "buy" | "strongBuy" | "strong_buy" => 1,
        "sell" | "strongSell" | "strong_sell" => -1,
        _ => 0,
    }
}

/// 市盈率在 (5, 25) 之间 +1，高于 50 记 -1
pub fn valuation_points(pe_ratio: Option<f64>) -> i32 {
    match pe_ratio {
        Some(pe) if pe > 5.0 && pe < 25.0 => 1,
        Some(pe) if pe > 50.0 => -1,
        _ => 0,
    }
}

pub fn category_for_score(score: i32) -> RecommendationCategory {
    match score {
        s if s >= 5 => RecommendationCategory::StrongBuy,
        s if s >= 3 => RecommendationCategory::Buy,
        s if s >= 1 => RecommendationCategory::ModerateBuy,
        s if s >= -1 => RecommendationCategory::Hold,
        s if s >= -3 => RecommendationCategory::ModerateSell,
        s if s >= -5 => RecommendationCategory::Sell,
        _ => RecommendationCategory::StrongSell,
    }
}

fn percent_change(to: f64, from: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to / from - 1.0) * 100.0
    }
}

/// Combines trend, projection and fundamentals into a scored recommendation.
///
/// `current_price` is the last historical close. Missing fundamentals
/// contribute nothing: the target price defaults to the current price and the
/// analyst key to "N/A".
pub fn build_recommendation(
    current_price: f64,
    trend: &TrendAssessment,
    prediction: Prediction,
    fundamentals: &Fundamentals,
) -> Recommendation {
    let predicted_price = prediction.final_price().unwrap_or(current_price);
    let predicted_change_pct = percent_change(predicted_price, current_price);

    let analyst_key = fundamentals.recommendation_key().unwrap_or("N/A").to_string();

    let target_mean_price = fundamentals
        .target_mean_price()
        .filter(|p| *p != 0.0)
        .unwrap_or(current_price);
    let target_potential_pct = percent_change(target_mean_price, current_price);

    let breakdown = ScoreBreakdown {
        trend: trend.strength,
        prediction: move_points(predicted_change_pct),
        analyst: analyst_points(&analyst_key),
        target: move_points(target_potential_pct),
        valuation: valuation_points(fundamentals.pe_ratio()),
    };
    let score = breakdown.total();
    let category = category_for_score(score);

    Recommendation {
        category: Some(category),
        explanation: category.explanation().to_string(),
        score,
        breakdown,
        trend: trend.label.clone(),
        analyst_key,
        target_mean_price: Some(target_mean_price),
        target_potential_pct: Some(round2(target_potential_pct)),
        predicted_price: Some(round2(predicted_price)),
        predicted_change_pct: Some(round2(predicted_change_pct)),
        prediction,
    }
}

/// 无法获取历史数据时返回的降级结果
pub fn unavailable_recommendation(err: &AdvisorError) -> Recommendation {
    Recommendation {
        category: None,
        explanation: format!("An error occurred while analyzing the stock: {}", err),
        score: 0,
        breakdown: ScoreBreakdown::default(),
        trend: "Unknown".to_string(),
        analyst_key: "N/A".to_string(),
        target_mean_price: None,
        target_potential_pct: None,
        predicted_price: None,
        predicted_change_pct: None,
        prediction: Prediction::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::UNAVAILABLE_LABEL;
    use crate::models::stock::FundamentalSnapshot;

    fn trend(strength: i32) -> TrendAssessment {
        TrendAssessment {
            label: "Sideways".to_string(),
            strength,
            recent_return_pct: 0.0,
            volatility_pct: 0.0,
            momentum_ratio: 1.0,
            rsi: 50.0,
            overbought: false,
            oversold: false,
            golden_cross: false,
            death_cross: false,
        }
    }

    fn flat_prediction(price: f64) -> Prediction {
        Prediction {
            dates: vec!["2024-01-02".to_string()],
            prices: vec![price],
        }
    }

    #[test]
    fn boundary_scores_map_exactly() {
        assert_eq!(category_for_score(5), RecommendationCategory::StrongBuy);
        assert_eq!(category_for_score(4), RecommendationCategory::Buy);
        assert_eq!(category_for_score(3), RecommendationCategory::Buy);
        assert_eq!(category_for_score(1), RecommendationCategory::ModerateBuy);
        assert_eq!(category_for_score(0), RecommendationCategory::Hold);
        assert_eq!(category_for_score(-1), RecommendationCategory::Hold);
        assert_eq!(category_for_score(-3), RecommendationCategory::ModerateSell);
        assert_eq!(category_for_score(-5), RecommendationCategory::Sell);
        assert_eq!(category_for_score(-6), RecommendationCategory::StrongSell);
    }

    #[test]
    fn category_is_monotonic_in_score() {
        let categories: Vec<_> = (-12..=12).map(category_for_score).collect();
        assert!(categories.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(categories.first(), Some(&RecommendationCategory::StrongSell));
        assert_eq!(categories.last(), Some(&RecommendationCategory::StrongBuy));
        for category in RecommendationCategory::ALL {
            assert!(categories.contains(&category));
        }
    }

    #[test]
    fn move_brackets() {
        assert_eq!(move_points(15.01), 2);
        assert_eq!(move_points(15.0), 1);
        assert_eq!(move_points(5.0), 0);
        assert_eq!(move_points(-5.0), 0);
        assert_eq!(move_points(-5.5), -1);
        assert_eq!(move_points(-20.0), -2);
    }

    #[test]
    fn analyst_and_valuation_points() {
        assert_eq!(analyst_points("strongBuy"), 1);
        assert_eq!(analyst_points("buy"), 1);
        assert_eq!(analyst_points("hold"), 0);
        assert_eq!(analyst_points("strongSell"), -1);
        assert_eq!(analyst_points("N/A"), 0);

        assert_eq!(valuation_points(Some(18.0)), 1);
        assert_eq!(valuation_points(Some(5.0)), 0);
        assert_eq!(valuation_points(Some(30.0)), 0);
        assert_eq!(valuation_points(Some(75.0)), -1);
        assert_eq!(valuation_points(Some(0.0)), 0);
        assert_eq!(valuation_points(None), 0);
    }

    #[test]
    fn all_components_add_up() {
        let snapshot = FundamentalSnapshot {
            pe_ratio: Some(20.0),
            target_mean_price: Some(130.0),
            recommendation_key: Some("buy".to_string()),
            ..Default::default()
        };
        let rec = build_recommendation(
            100.0,
            &trend(4),
            flat_prediction(108.0),
            &Fundamentals::Available(snapshot),
        );

        assert_eq!(
            rec.breakdown,
            ScoreBreakdown { trend: 4, prediction: 1, analyst: 1, target: 2, valuation: 1 }
        );
        assert_eq!(rec.score, 9);
        assert_eq!(rec.category, Some(RecommendationCategory::StrongBuy));
        assert_eq!(rec.predicted_change_pct, Some(8.0));
        assert_eq!(rec.target_potential_pct, Some(30.0));
        assert_eq!(rec.analyst_key, "buy");
    }

    #[test]
    fn missing_fundamentals_contribute_nothing() {
        let fundamentals = Fundamentals::Unavailable { reason: "HTTP 401".into() };
        let rec = build_recommendation(50.0, &trend(-3), flat_prediction(40.0), &fundamentals);

        assert_eq!(rec.breakdown.prediction, -2);
        assert_eq!(rec.breakdown.target, 0);
        assert_eq!(rec.breakdown.analyst, 0);
        assert_eq!(rec.breakdown.valuation, 0);
        assert_eq!(rec.score, -5);
        assert_eq!(rec.category, Some(RecommendationCategory::Sell));
        assert_eq!(rec.target_mean_price, Some(50.0));
        assert_eq!(rec.analyst_key, "N/A");
    }

    #[test]
    fn degraded_result_embeds_error() {
        let err = AdvisorError::NoData { ticker: "ZZZZ".into() };
        let rec = unavailable_recommendation(&err);

        assert!(rec.is_degraded());
        assert_eq!(rec.label(), UNAVAILABLE_LABEL);
        assert_eq!(rec.score, 0);
        assert_eq!(rec.trend, "Unknown");
        assert!(rec.explanation.contains("No data available for ticker ZZZZ"));
        assert!(rec.prediction.is_empty());

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["recommendation"], "Unable to Generate");
    }
}
