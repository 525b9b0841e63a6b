//! Single-position backtest simulator.
//!
//! Walks the analysis window bar by bar, either flat or holding one
//! position. A buy rule opens a long and a sell rule opens a short when the
//! combined signal fires while flat; the position closes on
//! the first bar where the signal no longer holds, or is force-closed at the
//! last bar of the window. Fills are at the bar's close. A bar closing at
//! zero gives no basis for a percentage return and is never entered.
//!
//! Indicators are computed over the whole history so that warmup may come
//! from bars before the window starts.

use crate::domain::error::StratsimError;
use crate::domain::indicator::{check_finite, compute_indicators};
use crate::domain::price_bar::{PriceBar, validate_bars};
use crate::domain::signal::{Signal, combine_signals, evaluate_condition};
use crate::domain::strategy::{Action, StrategyRule};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

/// Optional inclusive bounds of the analysis window; `None` means open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl From<Action> for Direction {
    fn from(action: Action) -> Self {
        match action {
            Action::Buy => Direction::Long,
            Action::Sell => Direction::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    EndOfData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    /// Percent, 5.0 == +5%.
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl_pct > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_forced(&self) -> bool {
        self.exit_reason == ExitReason::EndOfData
    }
}

/// Output of a run: the window actually simulated and its closed trades.
#[derive(Debug, Clone)]
pub struct SimulationResult<'a> {
    pub ticker: String,
    pub window: &'a [PriceBar],
    pub signal: Signal,
    pub trades: Vec<Trade>,
}

pub fn run_backtest<'a>(
    bars: &'a [PriceBar],
    rule: &StrategyRule,
    config: &BacktestConfig,
) -> Result<SimulationResult<'a>, StratsimError> {
    validate_bars(bars)?;
    check_history(bars, rule)?;

    let indicators = compute_indicators(bars, &rule.indicator_types());
    for series in indicators.values() {
        check_finite(series)?;
    }

    let signals: Vec<Signal> = rule
        .conditions
        .iter()
        .map(|c| evaluate_condition(c, bars, &indicators))
        .collect();
    let combined = combine_signals(&signals, rule.combination);

    let (start, end) = window_bounds(bars, config);
    if start >= end {
        return Err(StratsimError::InsufficientHistory {
            ticker: rule.ticker.clone(),
            indicator: describe_window(config),
            bars: 0,
            required: 1,
        });
    }

    debug!(
        ticker = %rule.ticker,
        bars = bars.len(),
        window_start = %bars[start].date,
        window_end = %bars[end - 1].date,
        "running backtest"
    );

    let direction = Direction::from(rule.action);
    let trades = simulate(&bars[start..end], &combined[start..end], direction)?;

    debug!(ticker = %rule.ticker, trades = trades.len(), "backtest complete");

    Ok(SimulationResult {
        ticker: rule.ticker.clone(),
        window: &bars[start..end],
        signal: combined[start..end].to_vec(),
        trades,
    })
}

fn check_history(bars: &[PriceBar], rule: &StrategyRule) -> Result<(), StratsimError> {
    let required = rule.required_bars();
    if bars.len() >= required {
        return Ok(());
    }
    let indicator = rule
        .limiting_condition()
        .map_or_else(|| "PRICE".to_string(), |c| c.limiting_operand().to_string());
    Err(StratsimError::InsufficientHistory {
        ticker: rule.ticker.clone(),
        indicator,
        bars: bars.len(),
        required,
    })
}

/// Half-open index range of bars inside the configured window.
fn window_bounds(bars: &[PriceBar], config: &BacktestConfig) -> (usize, usize) {
    let start = config
        .start_date
        .map_or(0, |d| bars.partition_point(|b| b.date < d));
    let end = config
        .end_date
        .map_or(bars.len(), |d| bars.partition_point(|b| b.date <= d));
    (start, end)
}

fn describe_window(config: &BacktestConfig) -> String {
    let fmt = |d: Option<NaiveDate>| d.map_or_else(|| "..".to_string(), |d| d.to_string());
    format!(
        "analysis window {} to {}",
        fmt(config.start_date),
        fmt(config.end_date)
    )
}

enum State {
    Flat,
    Open { entry: usize },
}

fn simulate(
    bars: &[PriceBar],
    signal: &[bool],
    direction: Direction,
) -> Result<Vec<Trade>, StratsimError> {
    let mut trades = Vec::new();
    let mut state = State::Flat;
    let last = bars.len().saturating_sub(1);

    for (i, &fires) in signal.iter().enumerate() {
        state = match state {
            State::Flat if fires && i < last && bars[i].close > 0.0 => State::Open { entry: i },
            State::Open { entry } if !fires => {
                trades.push(close_trade(bars, entry, i, direction, ExitReason::Signal)?);
                State::Flat
            }
            other => other,
        };
    }

    if let State::Open { entry } = state {
        trades.push(close_trade(bars, entry, last, direction, ExitReason::EndOfData)?);
    }

    Ok(trades)
}

fn close_trade(
    bars: &[PriceBar],
    entry: usize,
    exit: usize,
    direction: Direction,
    exit_reason: ExitReason,
) -> Result<Trade, StratsimError> {
    let entry_bar = &bars[entry];
    let exit_bar = &bars[exit];
    let ratio = exit_bar.close / entry_bar.close;
    let pnl_pct = match direction {
        Direction::Long => (ratio - 1.0) * 100.0,
        Direction::Short => (1.0 - ratio) * 100.0,
    };
    if !pnl_pct.is_finite() {
        return Err(StratsimError::computation(format!(
            "trade entered {} at {} produced a non-finite return",
            entry_bar.date, entry_bar.close
        )));
    }

    Ok(Trade {
        direction,
        entry_date: entry_bar.date,
        entry_price: entry_bar.close,
        exit_date: exit_bar.date,
        exit_price: exit_bar.close,
        pnl_pct,
        exit_reason,
    })
}
