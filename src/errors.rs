use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Unable to connect to {source_name}. Please check your internet connection: {message}")]
    Connectivity {
        source_name: String,
        message: String,
    },

    #[error("No data available for ticker {ticker}")]
    NoData { ticker: String },

    #[error("Fundamentals unavailable for {symbol}: {reason}")]
    FundamentalsUnavailable { symbol: String, reason: String },

    #[error("Failed to retrieve data for {ticker}: {source}")]
    Ticker {
        ticker: String,
        #[source]
        source: Box<AdvisorError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    ArrowError(String),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AdvisorError {
    /// 给错误附加出错的股票代码，已附加过的不再重复包装
    pub fn for_ticker(ticker: &str, err: AdvisorError) -> Self {
        match err {
            AdvisorError::Ticker { .. } => err,
            other => AdvisorError::Ticker {
                ticker: ticker.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// 去掉 `Ticker` 包装后的根本原因
    pub fn root_cause(&self) -> &AdvisorError {
        match self {
            AdvisorError::Ticker { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdvisorError>;

// 用于从字符串创建错误
impl From<String> for AdvisorError {
    fn from(s: String) -> Self {
        AdvisorError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for AdvisorError {
    fn from(s: &str) -> Self {
        AdvisorError::Unknown(s.to_string())
    }
}

impl From<arrow_schema::ArrowError> for AdvisorError {
    fn from(e: arrow_schema::ArrowError) -> Self {
        AdvisorError::ArrowError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_wrapper_carries_symbol_and_cause() {
        let err = AdvisorError::for_ticker("INFY", AdvisorError::NoData { ticker: "INFY".into() });
        let text = err.to_string();
        assert!(text.contains("INFY"));
        assert!(text.contains("No data available"));
        assert!(matches!(err.root_cause(), AdvisorError::NoData { .. }));
    }

    #[test]
    fn ticker_wrapper_is_not_nested() {
        let inner = AdvisorError::for_ticker("AAPL", AdvisorError::DataError("boom".into()));
        let outer = AdvisorError::for_ticker("AAPL", inner);
        assert_eq!(outer.to_string(), "Failed to retrieve data for AAPL: Data error: boom");
    }
}
