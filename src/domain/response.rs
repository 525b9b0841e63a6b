//! Response payloads returned to the presentation layer.

use crate::domain::backtest::Trade;
use crate::domain::chart::ChartBundle;
use crate::domain::error::StratsimError;
use crate::domain::metrics::{BacktestResult, TradeStats};
use crate::domain::strategy::{StrategyRule, StrategySummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResponse {
    /// Total compounded return, percent, two decimals.
    #[serde(rename = "return")]
    pub total_return: f64,
    /// Percent of trades with a positive return, two decimals.
    pub win_rate: f64,
    pub trades: usize,
    #[serde(rename = "strategySummary")]
    pub strategy_summary: StrategySummary,
    pub chart: ChartBundle,
    pub trade_log: Vec<Trade>,
    pub stats: TradeStats,
}

impl BacktestResponse {
    pub fn new(rule: &StrategyRule, result: BacktestResult, chart: ChartBundle) -> Self {
        BacktestResponse {
            total_return: round2(result.total_return_pct),
            win_rate: round2(result.win_rate_pct),
            trades: result.trade_count,
            strategy_summary: rule.summary(),
            chart,
            trade_log: result.trades,
            stats: result.stats,
        }
    }
}

/// Failure body. Carries nothing but the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&StratsimError> for ErrorResponse {
    fn from(err: &StratsimError) -> Self {
        ErrorResponse {
            error: err.to_string(),
        }
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
