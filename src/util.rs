use chrono::NaiveDate;

use crate::errors::{AdvisorError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// 滚动均值，窗口未满的位置为 `None`
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// 滚动样本标准差，窗口未满的位置为 `None`
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

fn rolling(values: &[f64], window: usize, f: fn(&[f64]) -> f64) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                None
            } else {
                Some(f(&values[i + 1 - window..=i]))
            }
        })
        .collect()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

// Arrow 的 date32 以 1970-01-01 起的天数存储
pub fn date_to_epoch_days(date: &NaiveDate) -> i32 {
    date.signed_duration_since(unix_epoch()).num_days() as i32
}

pub fn epoch_days_to_date(days: i32) -> Result<NaiveDate> {
    unix_epoch()
        .checked_add_signed(chrono::Duration::days(days as i64))
        .ok_or_else(|| AdvisorError::DataError(format!("Invalid epoch day: {}", days)))
}

/// 市值格式化，例如 `$2.95T`、`₹845.10B`
pub fn format_market_cap(value: f64, currency_symbol: &str) -> String {
    if value >= 1e12 {
        format!("{}{:.2}T", currency_symbol, value / 1e12)
    } else if value >= 1e9 {
        format!("{}{:.2}B", currency_symbol, value / 1e9)
    } else if value >= 1e6 {
        format!("{}{:.2}M", currency_symbol, value / 1e6)
    } else {
        format!("{}{}", currency_symbol, format_thousands(value.round() as i64))
    }
}

fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

// Arrow数据转换工具
pub mod arrow_utils {
    use super::*;
    use crate::models::stock::{Bar, BarSeries};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use arrow_array::{Array, ArrayRef, Date32Array, Float64Array, Int64Array};
    use arrow_ipc::reader::FileReader;
    use arrow_ipc::writer::FileWriter;
    use log::info;
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::{Read, Seek, Write};
    use std::path::Path;
    use std::str::FromStr;
    use std::sync::Arc;

    pub const SYMBOL_METADATA_KEY: &str = "symbol";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ExportFormat {
        Csv,
        Ipc,
        Json,
    }

    impl ExportFormat {
        pub fn extension(&self) -> &'static str {
            match self {
                ExportFormat::Csv => "csv",
                ExportFormat::Ipc => "arrow",
                ExportFormat::Json => "json",
            }
        }
    }

    impl FromStr for ExportFormat {
        type Err = AdvisorError;

        fn from_str(s: &str) -> Result<Self> {
            match s.to_lowercase().as_str() {
                "csv" => Ok(ExportFormat::Csv),
                "ipc" | "arrow" => Ok(ExportFormat::Ipc),
                "json" | "jsonl" => Ok(ExportFormat::Json),
                other => Err(AdvisorError::DataError(format!("Unknown export format: {}", other))),
            }
        }
    }

    /// 下载文件名，例如 `AAPL_stock_data.csv`
    pub fn export_file_name(ticker: &str, format: ExportFormat) -> String {
        format!("{}_stock_data.{}", ticker.trim().to_uppercase(), format.extension())
    }

    pub fn series_schema(symbol: &str) -> Schema {
        let mut metadata = HashMap::new();
        metadata.insert(SYMBOL_METADATA_KEY.to_string(), symbol.to_string());

        Schema::new(vec![
            Field::new("Date", DataType::Date32, false),
            Field::new("Open", DataType::Float64, false),
            Field::new("High", DataType::Float64, false),
            Field::new("Low", DataType::Float64, false),
            Field::new("Close", DataType::Float64, false),
            Field::new("Volume", DataType::Int64, false),
        ])
        .with_metadata(metadata)
    }

    // 将日线序列转换为Arrow记录批次
    pub fn series_to_record_batch(series: &BarSeries) -> Result<RecordBatch> {
        let bars = series.bars();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Date32Array::from(
                bars.iter().map(|b| date_to_epoch_days(&b.date)).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.open).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.high).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.low).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(bars.iter().map(|b| b.close).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(bars.iter().map(|b| b.volume).collect::<Vec<_>>())),
        ];

        Ok(RecordBatch::try_new(Arc::new(series_schema(&series.symbol)), columns)?)
    }

    // 从Arrow记录批次还原日线序列
    pub fn record_batch_to_bars(batch: &RecordBatch) -> Result<Vec<Bar>> {
        fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<T>())
                .ok_or_else(|| AdvisorError::ArrowError(format!("Failed to downcast {} column", name)))
        }

        let dates = column::<Date32Array>(batch, "Date")?;
        let opens = column::<Float64Array>(batch, "Open")?;
        let highs = column::<Float64Array>(batch, "High")?;
        let lows = column::<Float64Array>(batch, "Low")?;
        let closes = column::<Float64Array>(batch, "Close")?;
        let volumes = column::<Int64Array>(batch, "Volume")?;

        let mut bars = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            if dates.is_null(i) || closes.is_null(i) {
                continue;
            }
            bars.push(Bar {
                date: epoch_days_to_date(dates.value(i))?,
                open: opens.value(i),
                high: highs.value(i),
                low: lows.value(i),
                close: closes.value(i),
                volume: volumes.value(i),
            });
        }

        Ok(bars)
    }

    pub fn write_batch<W: Write>(batch: &RecordBatch, format: ExportFormat, writer: W) -> Result<()> {
        match format {
            ExportFormat::Csv => {
                let mut csv_writer = arrow::csv::WriterBuilder::new().with_header(true).build(writer);
                csv_writer.write(batch)?;
            }
            ExportFormat::Ipc => {
                // 使用默认选项，不启用压缩
                let mut ipc_writer = FileWriter::try_new(writer, &batch.schema())?;
                ipc_writer.write(batch)?;
                ipc_writer.finish()?;
            }
            ExportFormat::Json => {
                let mut json_writer = arrow_json::LineDelimitedWriter::new(writer);
                json_writer.write(batch)?;
                json_writer.finish()?;
            }
        }
        Ok(())
    }

    // 将日线序列保存到文件
    pub fn save_series(series: &BarSeries, format: ExportFormat, path: &Path) -> Result<()> {
        info!("Saving {} bars of {} to {}", series.len(), series.symbol, path.display());

        let batch = series_to_record_batch(series)?;
        let file = File::create(path)?;
        write_batch(&batch, format, file)
    }

    pub fn read_series_from_ipc<R: Read + Seek>(reader: R) -> Result<BarSeries> {
        let reader = FileReader::try_new(reader, None)?;
        let symbol = reader
            .schema()
            .metadata()
            .get(SYMBOL_METADATA_KEY)
            .cloned()
            .ok_or_else(|| AdvisorError::ArrowError("Missing symbol metadata".to_string()))?;

        let mut bars = Vec::new();
        for batch in reader {
            bars.extend(record_batch_to_bars(&batch?)?);
        }

        Ok(BarSeries::new(&symbol, bars))
    }

    // 从Arrow文件读取日线序列
    pub fn read_series_from_arrow(path: &Path) -> Result<BarSeries> {
        read_series_from_ipc(File::open(path)?)
    }
}
