use crate::errors::Result;
use crate::models::stock::{BarSeries, CompanyProfile, FundamentalSnapshot};

/// Base trait for market data sources
///
/// Calls are blocking. Implementations own any caching or rate limiting;
/// the pipeline performs no retries beyond the NSE/BSE fallback.
pub trait MarketDataSource {
    /// Human-readable name used in error messages
    fn source_name(&self) -> &'static str;

    /// Fail fast with `AdvisorError::Connectivity` when the source is unreachable
    fn probe_connectivity(&self) -> Result<()>;

    /// Daily bars for `symbol` over an opaque `period` such as "1mo" or "1y".
    /// An unknown symbol yields an empty series rather than an error.
    fn fetch_history(&self, symbol: &str, period: &str) -> Result<BarSeries>;

    /// Fundamental snapshot for `symbol`
    fn fetch_snapshot(&self, symbol: &str) -> Result<FundamentalSnapshot>;

    /// Descriptive company profile for `symbol`
    fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile>;
}
