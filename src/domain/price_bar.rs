//! Daily price bar representation.

use crate::domain::error::StratsimError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn fields_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Reject bar sequences the indicator math cannot trust: non-finite or
/// negative fields, and dates that are not strictly ascending.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), StratsimError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.fields_valid() {
            return Err(StratsimError::computation(format!(
                "bar {} ({}) has a non-finite or negative field",
                i, bar.date
            )));
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(StratsimError::computation(format!(
                "bar dates not strictly ascending at {} (after {})",
                bar.date,
                bars[i - 1].date
            )));
        }
    }
    Ok(())
}
