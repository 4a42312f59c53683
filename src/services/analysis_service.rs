use crate::analysis::recommendation::unavailable_recommendation;
use crate::analysis::{self, indicators, ticker};
use crate::config::Config;
use crate::errors::{AdvisorError, Result};
use crate::models::analysis::{AnalysisReport, Recommendation};
use crate::models::stock::{BarSeries, CompanyProfile, Fundamentals, MarketMetrics};
use crate::sources::base::MarketDataSource;
use crate::util::arrow_utils;
use arrow::record_batch::RecordBatch;
use log::{error, info, warn};
use std::sync::Arc;

/// 分析服务，串联数据获取、指标计算与买卖建议
///
/// Holds no mutable state; concurrent callers can share one instance.
pub struct AnalysisService {
    config: Config,
    source: Arc<dyn MarketDataSource + Send + Sync>,
}

impl AnalysisService {
    /// 创建新的分析服务实例
    pub fn new(config: Config, source: Arc<dyn MarketDataSource + Send + Sync>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 获取历史日线：先探测连通性，空结果时在 NSE/BSE 之间回退一次
    pub fn fetch_history(&self, ticker: &str, period: &str) -> Result<BarSeries> {
        self.load_history(ticker, period).map_err(|e| {
            error!("Error fetching stock data for {}: {}", ticker, e);
            e
        })
    }

    fn load_history(&self, ticker: &str, period: &str) -> Result<BarSeries> {
        self.source.probe_connectivity()?;

        let symbol = ticker::normalize_ticker(ticker);
        info!("Fetching data for {} (formatted as {})", ticker, symbol);

        let mut series = self.source.fetch_history(&symbol, period)?;
        if series.is_empty() {
            if let Some(alternative) = ticker::alternate_exchange_symbol(&symbol) {
                info!("No data found for {}, trying {}", symbol, alternative);
                series = self.source.fetch_history(&alternative, period)?;
            }
        }

        if series.is_empty() {
            return Err(AdvisorError::NoData { ticker: ticker.to_string() });
        }

        Ok(series)
    }

    /// 基本面获取失败时降级为 `Fundamentals::Unavailable`，不向上抛错
    pub fn fetch_fundamentals(&self, ticker: &str, symbol: &str) -> Fundamentals {
        match self.source.fetch_snapshot(symbol) {
            Ok(snapshot) => Fundamentals::Available(snapshot),
            Err(e) => {
                error!("Error fetching financial metrics for {}: {}", ticker, e);
                warn!("Continuing without fundamentals for {}", symbol);
                Fundamentals::Unavailable { reason: e.to_string() }
            }
        }
    }

    pub fn fetch_profile(&self, ticker: &str, symbol: &str) -> CompanyProfile {
        match self.source.fetch_profile(symbol) {
            Ok(profile) => profile,
            Err(e) => {
                error!("Error fetching company info for {}: {}", ticker, e);
                warn!("Continuing without company profile for {}", symbol);
                CompanyProfile::unavailable(ticker)
            }
        }
    }

    /// Full report for one ticker: chart series, profile, fundamentals and a
    /// recommendation computed over `Config::recommendation_period`.
    pub fn analyze(&self, ticker: &str, period: &str) -> Result<AnalysisReport> {
        self.build_report(ticker, period).map_err(|e| {
            error!("Error processing request for {}: {}", ticker, e);
            AdvisorError::for_ticker(ticker, e)
        })
    }

    fn build_report(&self, ticker: &str, period: &str) -> Result<AnalysisReport> {
        let series = self.fetch_history(ticker, period)?;
        let symbol = series.symbol.clone();

        let report = indicators::compute_series_report(&series);
        let profile = self.fetch_profile(ticker, &symbol);
        let fundamentals = self.fetch_fundamentals(ticker, &symbol);
        let metrics = MarketMetrics::from_fundamentals(&symbol, &fundamentals);

        let recommendation = if period == self.config.recommendation_period {
            self.recommend_from(ticker, &series, &fundamentals)
        } else {
            self.recommend(ticker)
        };

        Ok(AnalysisReport {
            ticker: ticker.to_string(),
            symbol,
            period: period.to_string(),
            series: report,
            profile,
            fundamentals,
            metrics,
            recommendation,
        })
    }

    /// 生成买卖建议；任何失败都以降级结果返回
    pub fn recommend(&self, ticker: &str) -> Recommendation {
        let series = match self.fetch_history(ticker, &self.config.recommendation_period) {
            Ok(series) => series,
            Err(e) => return self.degraded(ticker, &e),
        };
        let fundamentals = self.fetch_fundamentals(ticker, &series.symbol);

        self.recommend_from(ticker, &series, &fundamentals)
    }

    fn recommend_from(&self, ticker: &str, series: &BarSeries, fundamentals: &Fundamentals) -> Recommendation {
        match analysis::evaluate(series, fundamentals, self.config.prediction_days) {
            Ok(recommendation) => recommendation,
            Err(e) => self.degraded(ticker, &e),
        }
    }

    fn degraded(&self, ticker: &str, err: &AdvisorError) -> Recommendation {
        error!("Error generating recommendation for {}: {}", ticker, err);
        unavailable_recommendation(err)
    }

    /// 导出原始日线（Date, Open, High, Low, Close, Volume）
    pub fn export_series(&self, ticker: &str, period: &str) -> Result<RecordBatch> {
        self.fetch_history(ticker, period)
            .and_then(|series| arrow_utils::series_to_record_batch(&series))
            .map_err(|e| {
                error!("Error generating export for {}: {}", ticker, e);
                AdvisorError::for_ticker(ticker, e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{RecommendationCategory, UNAVAILABLE_LABEL};
    use crate::models::stock::{Bar, CompanyProfile, FundamentalSnapshot};
    use crate::sources::memory::InMemorySource;
    use crate::util::arrow_utils::ExportFormat;
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar {
                date: start + Duration::days(i as i64),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: 1_000,
            })
            .collect()
    }

    fn service(source: InMemorySource) -> AnalysisService {
        AnalysisService::new(Config::new(), Arc::new(source))
    }

    fn flat_source(symbol: &str) -> InMemorySource {
        InMemorySource::new_with_data(vec![BarSeries::new(symbol, bars_from_closes(&[100.0; 252]))])
    }

    #[test]
    fn flat_market_is_sideways_hold() {
        let service = service(flat_source("AAPL"));
        let report = service.analyze("aapl", "1y").unwrap();

        assert_eq!(report.symbol, "AAPL");
        assert_eq!(report.series.prices.len(), 252);
        assert_eq!(report.series.stats.volatility, 0.0);

        let rec = &report.recommendation;
        assert_eq!(rec.trend, "Sideways");
        assert_eq!(rec.category, Some(RecommendationCategory::Hold));
        assert_eq!(rec.score, 0);
        assert_eq!(rec.prediction.len(), 30);
        assert!(rec.prediction.prices.iter().all(|p| (*p - 100.0).abs() < 1e-9));
        assert_eq!(rec.analyst_key, "N/A");
    }

    #[test]
    fn missing_nse_listing_falls_back_to_bse() {
        let series = BarSeries::new("RELIANCE.BO", bars_from_closes(&[2500.0; 60]));
        let source = InMemorySource::new_with_data(vec![series])
            .with_snapshot("RELIANCE.BO", FundamentalSnapshot { pe_ratio: Some(20.0), ..Default::default() });
        let service = service(source);

        let history = service.fetch_history("RELIANCE", "1y").unwrap();
        assert_eq!(history.symbol, "RELIANCE.BO");

        // 基本面按实际返回数据的代码获取
        let report = service.analyze("RELIANCE", "1y").unwrap();
        assert!(report.fundamentals.is_available());
        assert_eq!(report.metrics.currency_symbol, "₹");
        assert_eq!(report.recommendation.breakdown.valuation, 1);
    }

    #[test]
    fn unknown_ticker_reports_no_data() {
        let service = service(flat_source("AAPL"));

        let err = service.analyze("ZZZZ", "1y").unwrap_err();
        assert!(err.to_string().contains("ZZZZ"));
        assert!(matches!(err.root_cause(), AdvisorError::NoData { .. }));
    }

    #[test]
    fn unreachable_source_fails_with_connectivity() {
        let service = service(flat_source("AAPL").unreachable());

        let err = service.analyze("AAPL", "1y").unwrap_err();
        assert!(matches!(err, AdvisorError::Ticker { .. }));
        assert!(matches!(err.root_cause(), AdvisorError::Connectivity { .. }));

        let rec = service.recommend("AAPL");
        assert!(rec.is_degraded());
        assert_eq!(rec.label(), UNAVAILABLE_LABEL);
        assert!(rec.prediction.is_empty());
    }

    #[test]
    fn loaded_profile_is_reported() {
        let profile = CompanyProfile {
            name: "Apple Inc.".to_string(),
            sector: Some("Technology".to_string()),
            country: Some("United States".to_string()),
            employees: Some(161_000),
            ..Default::default()
        };
        let service = service(flat_source("AAPL").with_profile("AAPL", profile.clone()));

        let report = service.analyze("AAPL", "1y").unwrap();
        assert_eq!(report.profile, profile);
        assert_eq!(report.metrics.currency_symbol, "$");
    }

    #[test]
    fn missing_fundamentals_do_not_fail_analysis() {
        let service = service(flat_source("MSFT"));
        let report = service.analyze("MSFT", "1y").unwrap();

        assert!(!report.fundamentals.is_available());
        assert_eq!(report.profile.name, "MSFT");
        assert_eq!(report.recommendation.target_potential_pct, Some(0.0));
    }

    #[test]
    fn recommendation_caps_daily_moves() {
        let closes: Vec<f64> = (0..200).map(|i| 50.0 * 1.05_f64.powi(i)).collect();
        let source = InMemorySource::new_with_data(vec![BarSeries::new("TSLA", bars_from_closes(&closes))]);
        let rec = service(source).recommend("TSLA");

        assert_eq!(rec.prediction.len(), 30);
        let mut previous = *closes.last().unwrap();
        for price in &rec.prediction.prices {
            assert!(*price <= previous * 1.03 + 0.01);
            assert!(*price >= previous * 0.97 - 0.01);
            previous = *price;
        }
    }

    #[test]
    fn exported_series_reloads_offline() {
        let service = service(flat_source("INFOSYS.NS"));
        let batch = service.export_series("INFOSYS", "6mo").unwrap();

        let names: Vec<String> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["Date", "Open", "High", "Low", "Close", "Volume"]);
        assert_eq!(batch.num_rows(), 252);

        let dir = tempdir().unwrap();
        let path = dir.path().join(arrow_utils::export_file_name("INFOSYS", ExportFormat::Ipc));
        let series = service.fetch_history("INFOSYS", "6mo").unwrap();
        arrow_utils::save_series(&series, ExportFormat::Ipc, &path).unwrap();

        let offline = AnalysisService::new(Config::new(), Arc::new(InMemorySource::load_from_file(&path).unwrap()));
        let report = offline.analyze("INFOSYS", "1y").unwrap();
        assert_eq!(report.symbol, "INFOSYS.NS");
        assert_eq!(report.series.dates, service.analyze("INFOSYS", "1y").unwrap().series.dates);
    }
}
