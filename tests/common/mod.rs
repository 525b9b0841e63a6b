#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use stratsim::domain::error::StratsimError;
pub use stratsim::domain::price_bar::PriceBar;
use stratsim::ports::data_port::{PriceDataPort, TickerResolver, Timeframe};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    /// Ticker that resolves but fails to load.
    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        _timeframe: Timeframe,
    ) -> Result<Vec<PriceBar>, StratsimError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(StratsimError::UnresolvableTicker {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| StratsimError::UnresolvableTicker {
                ticker: ticker.to_string(),
                reason: "no data".to_string(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, StratsimError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

impl TickerResolver for MockDataPort {
    fn is_resolvable(&self, ticker: &str) -> bool {
        self.data.contains_key(ticker) || self.errors.contains_key(ticker)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> PriceBar {
    PriceBar {
        date: date(date_str),
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.0),
        close,
        volume: 10_000.0,
    }
}

/// One bar per calendar day starting at `start`.
pub fn bars_from_closes(start: &str, closes: &[f64]) -> Vec<PriceBar> {
    let first = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: first + Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.0),
            close,
            volume: 10_000.0,
        })
        .collect()
}

/// Gently oscillating series that never trends.
pub fn generate_bars(start: &str, count: usize, base_price: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| base_price + if i % 2 == 0 { 0.0 } else { 1.0 })
        .collect();
    bars_from_closes(start, &closes)
}

/// Thirty closes whose RSI(14) drops below 30 at bar 19 (close 91), stays
/// there on bar 20 and recovers on bar 21 (close 95).
pub fn rsi_dip_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..15)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect();
    closes.extend([99.0, 97.0, 95.0, 93.0, 91.0, 89.0]);
    closes.extend([95.0, 99.0, 101.0, 102.0, 101.0, 102.0, 103.0, 102.0, 103.0]);
    closes
}

pub fn rsi_dip_bars() -> Vec<PriceBar> {
    bars_from_closes("2024-01-01", &rsi_dip_closes())
}

pub fn rsi_dip_port() -> MockDataPort {
    MockDataPort::new().with_bars("TEST", rsi_dip_bars())
}
