//! Performance metrics and statistics derived from a simulation.

use crate::domain::backtest::{SimulationResult, Trade};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cumulative_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub avg_trade_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub avg_holding_days: f64,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration: usize,
    /// Bars on which the combined entry signal held.
    pub signal_bars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub total_return_pct: f64,
    pub win_rate_pct: f64,
    pub trade_count: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub stats: TradeStats,
}

impl BacktestResult {
    pub fn compute(sim: &SimulationResult<'_>) -> Self {
        let trades = &sim.trades;
        let equity_curve = build_equity_curve(sim);

        let total_return_pct = (compounded_growth(trades) - 1.0) * 100.0;

        let winning_trades = trades.iter().filter(|t| t.is_win()).count();
        let losing_trades = trades.iter().filter(|t| t.pnl_pct < 0.0).count();
        let breakeven_trades = trades.len() - winning_trades - losing_trades;

        let win_rate_pct = if trades.is_empty() {
            0.0
        } else {
            winning_trades as f64 / trades.len() as f64 * 100.0
        };

        let (max_drawdown_pct, max_drawdown_duration) = compute_drawdown(&equity_curve);

        let stats = TradeStats {
            winning_trades,
            losing_trades,
            breakeven_trades,
            avg_trade_pct: mean(trades.iter().map(|t| t.pnl_pct)),
            best_trade_pct: trades.iter().map(|t| t.pnl_pct).fold(None, max_of).unwrap_or(0.0),
            worst_trade_pct: trades.iter().map(|t| t.pnl_pct).fold(None, min_of).unwrap_or(0.0),
            avg_holding_days: mean(trades.iter().map(|t| t.holding_days() as f64)),
            max_drawdown_pct,
            max_drawdown_duration,
            signal_bars: sim.signal.iter().filter(|&&s| s).count(),
        };

        BacktestResult {
            total_return_pct,
            win_rate_pct,
            trade_count: trades.len(),
            trades: trades.clone(),
            equity_curve,
            stats,
        }
    }
}

fn compounded_growth(trades: &[Trade]) -> f64 {
    trades.iter().fold(1.0, |growth, t| compound(growth, t.pnl_pct))
}

/// Apply one trade to running growth. A short can lose more than 100%;
/// growth floors at zero and stays there.
fn compound(growth: f64, pnl_pct: f64) -> f64 {
    if growth <= 0.0 {
        return 0.0;
    }
    (growth * (1.0 + pnl_pct / 100.0)).max(0.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n > 0 { sum / n as f64 } else { 0.0 }
}

fn max_of(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

fn min_of(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

/// One point per window bar; the curve only moves on bars where a trade
/// closes.
fn build_equity_curve(sim: &SimulationResult<'_>) -> Vec<EquityPoint> {
    let mut growth = 1.0;
    let mut exits = sim.trades.iter().peekable();

    sim.window
        .iter()
        .map(|bar| {
            while let Some(trade) = exits.next_if(|t| t.exit_date == bar.date) {
                growth = compound(growth, trade.pnl_pct);
            }
            EquityPoint {
                date: bar.date,
                cumulative_return_pct: (growth - 1.0) * 100.0,
            }
        })
        .collect()
}

/// Largest peak-to-trough decline of `1 + return` in percent, and the
/// longest run of bars spent below a peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = 1.0 + first.cumulative_return_pct / 100.0;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        let equity = 1.0 + point.cumulative_return_pct / 100.0;
        if equity >= peak {
            peak = equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak * 100.0);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}
