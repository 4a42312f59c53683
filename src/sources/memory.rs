use log::info;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::{AdvisorError, Result};
use crate::models::stock::{BarSeries, CompanyProfile, FundamentalSnapshot};
use crate::sources::base::MarketDataSource;
use crate::util::arrow_utils;

/// 内存数据源，用于离线分析与测试
///
/// `period` is ignored: every call returns the full stored series.
pub struct InMemorySource {
    series: Vec<BarSeries>,
    // 索引用于快速查找
    symbol_index: HashMap<String, usize>,
    snapshots: HashMap<String, FundamentalSnapshot>,
    profiles: HashMap<String, CompanyProfile>,
    reachable: bool,
}

impl InMemorySource {
    /// 使用提供的数据创建新的数据源实例
    pub fn new_with_data(series: Vec<BarSeries>) -> Self {
        let mut source = Self {
            series,
            symbol_index: HashMap::new(),
            snapshots: HashMap::new(),
            profiles: HashMap::new(),
            reachable: true,
        };

        source.rebuild_indices();

        source
    }

    /// 从 `export --format ipc` 生成的 Arrow 文件加载
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let series = arrow_utils::read_series_from_arrow(path)?;
        info!("Loaded {} bars of {} from {}", series.len(), series.symbol, path.display());
        Ok(Self::new_with_data(vec![series]))
    }

    pub fn with_snapshot(mut self, symbol: &str, snapshot: FundamentalSnapshot) -> Self {
        self.snapshots.insert(symbol.to_string(), snapshot);
        self
    }

    pub fn with_profile(mut self, symbol: &str, profile: CompanyProfile) -> Self {
        self.profiles.insert(symbol.to_string(), profile);
        self
    }

    /// Simulates a network outage for the connectivity probe.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// 重建索引
    fn rebuild_indices(&mut self) {
        self.symbol_index.clear();

        for (i, series) in self.series.iter().enumerate() {
            self.symbol_index.insert(series.symbol.clone(), i);
        }
    }
}

impl MarketDataSource for InMemorySource {
    fn source_name(&self) -> &'static str {
        "in-memory data"
    }

    fn probe_connectivity(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(AdvisorError::Connectivity {
                source_name: self.source_name().to_string(),
                message: "network unreachable".to_string(),
            })
        }
    }

    fn fetch_history(&self, symbol: &str, _period: &str) -> Result<BarSeries> {
        Ok(self
            .symbol_index
            .get(symbol)
            .map(|&idx| self.series[idx].clone())
            .unwrap_or_else(|| BarSeries::empty(symbol)))
    }

    fn fetch_snapshot(&self, symbol: &str) -> Result<FundamentalSnapshot> {
        self.snapshots
            .get(symbol)
            .cloned()
            .ok_or_else(|| AdvisorError::FundamentalsUnavailable {
                symbol: symbol.to_string(),
                reason: "no snapshot loaded".to_string(),
            })
    }

    fn fetch_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.profiles
            .get(symbol)
            .cloned()
            .ok_or_else(|| AdvisorError::DataError(format!("No profile loaded for {}", symbol)))
    }
}
