use stock_advisor::config::Config;
use stock_advisor::services::analysis_service::AnalysisService;
use stock_advisor::sources::base::MarketDataSource;
use stock_advisor::sources::memory::InMemorySource;
use stock_advisor::sources::yahoo::YahooFinanceSource;
use stock_advisor::util::arrow_utils::{self, ExportFormat};

use anyhow::Context;
use clap::{App, Arg, ArgMatches, SubCommand};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn ticker_arg<'a>() -> Arg<'a> {
    Arg::with_name("ticker")
        .short('t')
        .long("ticker")
        .value_name("TICKER")
        .help("Ticker to analyze, e.g. AAPL, RELIANCE or TCS.BO")
        .required(true)
        .takes_value(true)
}

fn offline_arg<'a>() -> Arg<'a> {
    Arg::with_name("offline")
        .long("offline")
        .value_name("FILE")
        .help("Read bars from an Arrow file written by `export --format ipc` instead of the network")
        .takes_value(true)
}

fn build_source(matches: &ArgMatches, config: &Config) -> anyhow::Result<Arc<dyn MarketDataSource + Send + Sync>> {
    match matches.value_of("offline") {
        Some(path) => {
            info!("Using offline data from {}", path);
            let source = InMemorySource::load_from_file(Path::new(path))
                .with_context(|| format!("failed to load {}", path))?;
            Ok(Arc::new(source))
        }
        None => Ok(Arc::new(YahooFinanceSource::new(config)?)),
    }
}

fn build_app(default_period: &str) -> App<'_> {
    let app = App::new("StockAdvisor")
        .version("0.1.0")
        .about("Stock trend analysis, short-term price projection and buy/sell recommendations");

    // 添加子命令
    let app = app
        .subcommand(
            SubCommand::with_name("analyze")
                .about("Print the full analysis report as JSON")
                .arg(ticker_arg())
                .arg(
                    Arg::with_name("period")
                        .short('p')
                        .long("period")
                        .value_name("PERIOD")
                        .help("History window for the chart series (1mo, 6mo, 1y, 5y, ...)")
                        .takes_value(true)
                        .default_value(default_period),
                )
                .arg(
                    Arg::with_name("days")
                        .short('d')
                        .long("days")
                        .value_name("DAYS")
                        .help("Prediction horizon in calendar days")
                        .takes_value(true),
                )
                .arg(offline_arg()),
        )
        .subcommand(
            SubCommand::with_name("recommend")
                .about("Print only the recommendation as JSON")
                .arg(ticker_arg())
                .arg(
                    Arg::with_name("days")
                        .short('d')
                        .long("days")
                        .value_name("DAYS")
                        .help("Prediction horizon in calendar days")
                        .takes_value(true),
                )
                .arg(offline_arg()),
        )
        .subcommand(
            SubCommand::with_name("export")
                .about("Export raw daily bars")
                .arg(ticker_arg())
                .arg(
                    Arg::with_name("period")
                        .short('p')
                        .long("period")
                        .value_name("PERIOD")
                        .help("History window to export")
                        .takes_value(true)
                        .default_value(default_period),
                )
                .arg(
                    Arg::with_name("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format (csv, ipc, json)")
                        .takes_value(true)
                        .default_value("csv"),
                )
                .arg(
                    Arg::with_name("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Output path, defaults to <TICKER>_stock_data.<ext>")
                        .takes_value(true),
                )
                .arg(offline_arg()),
        );

    app
}

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let defaults = Config::from_env();
    let matches = build_app(&defaults.default_period).get_matches();

    if let Some((name, sub)) = matches.subcommand() {
        let mut config = defaults.clone();
        let days = if name == "export" { None } else { sub.value_of("days") };
        if let Some(days) = days {
            let days = days
                .parse::<usize>()
                .with_context(|| format!("invalid --days value: {}", days))?;
            config = config.with_prediction_days(days);
        }

        let source = build_source(sub, &config)?;
        let service = AnalysisService::new(config, source);
        let ticker = sub.value_of("ticker").unwrap_or_default();

        match name {
            "analyze" => {
                let period = sub.value_of("period").unwrap_or(&defaults.default_period);
                let report = service.analyze(ticker, period)?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            "recommend" => {
                let recommendation = service.recommend(ticker);
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            }
            "export" => {
                let period = sub.value_of("period").unwrap_or(&defaults.default_period);
                let format: ExportFormat = sub.value_of("format").unwrap_or("csv").parse()?;
                let output = sub
                    .value_of("output")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(arrow_utils::export_file_name(ticker, format)));

                let batch = service.export_series(ticker, period)?;
                let file = File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
                arrow_utils::write_batch(&batch, format, BufWriter::new(file))?;

                info!("Exported {} rows to {}", batch.num_rows(), output.display());
            }
            _ => {}
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}
