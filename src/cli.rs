//! CLI definition and dispatch.
//!
//! Results are written to stdout as JSON; diagnostics and logs go to stderr.
//! A failure prints `{"error": ...}` and exits with the code of its error
//! family.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::cache::CachedDataPort;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    DEFAULT_LOG_FILTER, build_backtest_config, cache_enabled, csv_dir, data_timeframe, log_level,
    validate_config,
};
use crate::domain::engine::run_strategy;
use crate::domain::error::StratsimError;
use crate::domain::normalizer::normalize;
use crate::domain::response::ErrorResponse;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{MarketData, PriceDataPort, TickerResolver};

#[derive(Parser, Debug)]
#[command(
    name = "stratsim",
    version,
    about = "Interpret and backtest structured trading strategies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a strategy JSON file against CSV price history
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        /// Replace the strategy's ticker
        #[arg(short, long)]
        ticker: Option<String>,
        /// Write the response here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Normalize a strategy and print its summary
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
        /// Resolve the ticker against the configured price directory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List tickers with daily price history
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            ticker,
            output,
        } => run_backtest(&config, &strategy, ticker.as_deref(), output.as_deref()),
        Command::Validate { strategy, config } => run_validate(&strategy, config.as_deref()),
        Command::ListTickers { config } => run_list_tickers(&config),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            match serde_json::to_string(&ErrorResponse::from(&e)) {
                Ok(body) => println!("{}", body),
                Err(_) => eprintln!("error: {e}"),
            }
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path, require_data: bool) -> Result<FileConfigAdapter, StratsimError> {
    let config = FileConfigAdapter::from_file(path)?;
    init_logging(Some(log_level(&config)));
    validate_config(&config, require_data)?;
    info!(path = %path.display(), "config loaded");
    Ok(config)
}

/// `RUST_LOG` wins over `[logging] level`. Repeated calls are no-ops.
fn init_logging(level: Option<String>) {
    let level = level.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// CSV source, wrapped in the shared cache unless `[data] cache = false`.
pub fn build_data_port(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn MarketData + Send + Sync>, StratsimError> {
    let csv = CsvAdapter::new(csv_dir(config)?);
    if cache_enabled(config) {
        Ok(Arc::new(CachedDataPort::new(csv)))
    } else {
        Ok(Arc::new(csv))
    }
}

fn read_strategy(path: &Path) -> Result<Value, StratsimError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| {
        StratsimError::malformed(format!("{} is not valid JSON: {}", path.display(), e))
    })
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), StratsimError> {
    let body = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, body + "\n")?;
            info!(path = %path.display(), "response written");
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    strategy_path: &Path,
    ticker: Option<&str>,
    output: Option<&Path>,
) -> Result<(), StratsimError> {
    let config = load_config(config_path, true)?;
    let mut candidate = read_strategy(strategy_path)?;
    if let (Some(t), Some(obj)) = (ticker, candidate.as_object_mut()) {
        obj.insert("ticker".into(), Value::String(t.to_string()));
    }

    let data = build_data_port(&config)?;
    let response = run_strategy(
        &candidate,
        data.as_ref(),
        data_timeframe(&config)?,
        &build_backtest_config(&config)?,
    )?;
    write_json(&response, output)
}

/// Accepts every syntactically valid ticker; used when no data is configured.
struct AnyTicker;

impl TickerResolver for AnyTicker {
    fn is_resolvable(&self, _ticker: &str) -> bool {
        true
    }
}

fn run_validate(strategy_path: &Path, config_path: Option<&Path>) -> Result<(), StratsimError> {
    let rule = match config_path {
        Some(path) => {
            let config = load_config(path, true)?;
            let candidate = read_strategy(strategy_path)?;
            normalize(&candidate, &CsvAdapter::new(csv_dir(&config)?))?
        }
        None => {
            init_logging(None);
            normalize(&read_strategy(strategy_path)?, &AnyTicker)?
        }
    };
    write_json(&rule.summary(), None)
}

fn run_list_tickers(config_path: &Path) -> Result<(), StratsimError> {
    let config = load_config(config_path, true)?;
    let tickers = CsvAdapter::new(csv_dir(&config)?).list_tickers()?;
    for ticker in &tickers {
        println!("{}", ticker);
    }
    info!(count = tickers.len(), "tickers listed");
    Ok(())
}

#[cfg(feature = "web")]
fn run_serve(config_path: &Path) -> Result<(), StratsimError> {
    use crate::adapters::web::{AppState, build_router};
    use crate::domain::config_validation::listen_addr;

    let config = load_config(config_path, true)?;
    let addr = listen_addr(&config)?;
    let state = AppState {
        data: build_data_port(&config)?,
        timeframe: data_timeframe(&config)?,
        backtest: build_backtest_config(&config)?,
    };
    let router = build_router(state);

    tokio::runtime::Runtime::new()?.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "stratsim listening");
        axum::serve(listener, router).await?;
        Ok::<(), StratsimError>(())
    })
}

#[cfg(not(feature = "web"))]
fn run_serve(_config_path: &Path) -> Result<(), StratsimError> {
    Err(StratsimError::ConfigInvalid {
        section: "web".to_string(),
        key: "listen".to_string(),
        reason: "built without the web feature".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backtest_args() {
        let cli = Cli::try_parse_from([
            "stratsim",
            "backtest",
            "--config",
            "cfg.ini",
            "--strategy",
            "rule.json",
            "--ticker",
            "MSFT",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config,
                strategy,
                ticker,
                output,
            } => {
                assert_eq!(config, PathBuf::from("cfg.ini"));
                assert_eq!(strategy, PathBuf::from("rule.json"));
                assert_eq!(ticker.as_deref(), Some("MSFT"));
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn validate_config_flag_is_optional() {
        let cli = Cli::try_parse_from(["stratsim", "validate", "-s", "rule.json"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { config: None, .. }));
    }

    #[test]
    fn backtest_requires_strategy() {
        assert!(Cli::try_parse_from(["stratsim", "backtest", "--config", "cfg.ini"]).is_err());
    }

    #[test]
    fn list_tickers_subcommand_name() {
        let cli = Cli::try_parse_from(["stratsim", "list-tickers", "-c", "cfg.ini"]).unwrap();
        assert!(matches!(cli.command, Command::ListTickers { .. }));
    }
}
