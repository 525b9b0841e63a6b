//! Market data port traits.

use crate::domain::error::StratsimError;
use crate::domain::price_bar::PriceBar;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Bar resolution. Indicators and the simulator only assume that bars are
/// ordered and evenly meaningful; daily is the only resolution the CSV
/// layout carries by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeframe {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
            Timeframe::Monthly => "1mo",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "d" | "daily" => Ok(Timeframe::Daily),
            "1wk" | "1w" | "w" | "weekly" => Ok(Timeframe::Weekly),
            "1mo" | "1m" | "m" | "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!("unknown timeframe '{}'", other)),
        }
    }
}

pub trait PriceDataPort {
    /// Full available history for `ticker`, ascending by date.
    ///
    /// A ticker the source cannot supply is `UnresolvableTicker`.
    fn fetch_bars(&self, ticker: &str, timeframe: Timeframe)
    -> Result<Vec<PriceBar>, StratsimError>;

    fn list_tickers(&self) -> Result<Vec<String>, StratsimError>;

    /// Shared, immutable history. Caching ports hand out their stored copy.
    fn fetch_shared(
        &self,
        ticker: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<[PriceBar]>, StratsimError> {
        self.fetch_bars(ticker, timeframe).map(Arc::from)
    }
}

/// Answers whether a symbol maps to a price series, without loading it.
pub trait TickerResolver {
    fn is_resolvable(&self, ticker: &str) -> bool;
}

/// A source that can both resolve and supply tickers.
pub trait MarketData: PriceDataPort + TickerResolver {}

impl<T: PriceDataPort + TickerResolver + ?Sized> MarketData for T {}
