// 公开导出的模块，供外部使用
pub mod analysis;
pub mod errors;
pub mod models;
pub mod services;
pub mod sources;

// 为了支持主程序保持公开
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{AdvisorError, Result};
pub use models::analysis::{AnalysisReport, Prediction, Recommendation, RecommendationCategory, TrendAssessment};
pub use models::stock::{Bar, BarSeries, FundamentalSnapshot, Fundamentals};
pub use services::analysis_service::AnalysisService;
pub use sources::base::MarketDataSource;
pub use sources::memory::InMemorySource;
pub use sources::yahoo::YahooFinanceSource;
