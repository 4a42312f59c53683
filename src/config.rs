use std::env;

use crate::analysis::predictor::DEFAULT_HORIZON_DAYS;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_PROBE_URL: &str = "https://finance.yahoo.com";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub probe_url: String,
    pub probe_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub default_period: String,
    pub recommendation_period: String,
    pub prediction_days: usize,
    pub user_agent: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            probe_timeout_secs: 5,
            request_timeout_secs: 30,
            default_period: "1y".to_string(),
            recommendation_period: "1y".to_string(),
            prediction_days: DEFAULT_HORIZON_DAYS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// 默认配置叠加环境变量
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(url) = env::var("STOCK_ADVISOR_BASE_URL").ok().filter(|s| !s.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(url) = env::var("STOCK_ADVISOR_PROBE_URL").ok().filter(|s| !s.trim().is_empty()) {
            config.probe_url = url;
        }
        if let Some(secs) = env::var("STOCK_ADVISOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.request_timeout_secs = secs;
        }

        config
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_probe_url(mut self, url: &str) -> Self {
        self.probe_url = url.to_string();
        self
    }

    pub fn with_probe_timeout_secs(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_default_period(mut self, period: &str) -> Self {
        self.default_period = period.to_string();
        self
    }

    pub fn with_recommendation_period(mut self, period: &str) -> Self {
        self.recommendation_period = period.to_string();
        self
    }

    pub fn with_prediction_days(mut self, days: usize) -> Self {
        self.prediction_days = days;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
