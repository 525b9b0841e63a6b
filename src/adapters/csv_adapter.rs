//! CSV file data adapter.
//!
//! One file per ticker and timeframe: `{base}/{TICKER}.csv` for daily bars,
//! `{base}/{TICKER}_{timeframe}.csv` otherwise. The header row is matched by
//! name, case-insensitively; unknown columns (`adj close`, `dividends`) are
//! ignored.

use crate::domain::error::StratsimError;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::{PriceDataPort, TickerResolver, Timeframe};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str, timeframe: Timeframe) -> PathBuf {
        match timeframe {
            Timeframe::Daily => self.base_path.join(format!("{}.csv", ticker)),
            other => self.base_path.join(format!("{}_{}.csv", ticker, other)),
        }
    }
}

fn unresolvable(ticker: &str, reason: String) -> StratsimError {
    StratsimError::UnresolvableTicker {
        ticker: ticker.to_string(),
        reason,
    }
}

/// Provider exports mark missing sessions with an empty field or `null`.
fn is_missing(field: &str) -> bool {
    let f = field.trim();
    f.is_empty() || f.eq_ignore_ascii_case("null") || f.eq_ignore_ascii_case("nan")
}

impl PriceDataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<PriceBar>, StratsimError> {
        let path = self.csv_path(ticker, timeframe);
        let content = fs::read_to_string(&path)
            .map_err(|e| unresolvable(ticker, format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| unresolvable(ticker, format!("CSV header error: {}", e)))?
            .clone();

        let mut idx = [0usize; 6];
        for (slot, name) in idx.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| unresolvable(ticker, format!("missing {} column", name)))?;
        }

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| unresolvable(ticker, format!("CSV parse error: {}", e)))?;
            let field = |i: usize| record.get(idx[i]).unwrap_or("");

            if (1..COLUMNS.len()).any(|i| is_missing(field(i))) {
                skipped += 1;
                continue;
            }

            let date_str = field(0).trim();
            let date = NaiveDate::parse_from_str(date_str.get(..10).unwrap_or(date_str), "%Y-%m-%d")
                .map_err(|e| {
                    unresolvable(
                        ticker,
                        format!("invalid date '{}' on row {}: {}", date_str, line + 2, e),
                    )
                })?;

            let mut values = [0.0f64; 5];
            for (k, value) in values.iter_mut().enumerate() {
                let raw = field(k + 1).trim();
                *value = raw.parse().map_err(|e| {
                    unresolvable(
                        ticker,
                        format!("invalid {} value '{}' on row {}: {}", COLUMNS[k + 1], raw, line + 2, e),
                    )
                })?;
            }
            let [open, high, low, close, volume] = values;

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if skipped > 0 {
            debug!(ticker, skipped, "skipped rows with missing fields");
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsimError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut tickers = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();

            if let Some(stem) = name_str.strip_suffix(".csv") {
                if !stem.is_empty() && !stem.contains('_') {
                    tickers.push(stem.to_string());
                }
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

impl TickerResolver for CsvAdapter {
    fn is_resolvable(&self, ticker: &str) -> bool {
        [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly]
            .into_iter()
            .any(|tf| self.csv_path(ticker, tf).is_file())
    }
}
