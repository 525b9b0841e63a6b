//! End-to-end request pipeline shared by the CLI and the HTTP adapter.
//!
//! candidate JSON -> normalize -> fetch history -> simulate -> metrics ->
//! chart -> response.

use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::chart::ChartBundle;
use crate::domain::error::StratsimError;
use crate::domain::metrics::BacktestResult;
use crate::domain::normalizer::normalize;
use crate::domain::price_bar::PriceBar;
use crate::domain::response::BacktestResponse;
use crate::domain::strategy::StrategyRule;
use crate::ports::data_port::{PriceDataPort, TickerResolver, Timeframe};
use serde_json::Value;
use tracing::info;

pub fn run_strategy<P>(
    candidate: &Value,
    data: &P,
    timeframe: Timeframe,
    config: &BacktestConfig,
) -> Result<BacktestResponse, StratsimError>
where
    P: PriceDataPort + TickerResolver + ?Sized,
{
    let rule = normalize(candidate, data)?;
    let bars = data.fetch_shared(&rule.ticker, timeframe)?;
    if bars.is_empty() {
        return Err(StratsimError::UnresolvableTicker {
            ticker: rule.ticker.clone(),
            reason: "no price history".into(),
        });
    }
    backtest_rule(&rule, &bars, config)
}

pub fn backtest_rule(
    rule: &StrategyRule,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResponse, StratsimError> {
    let sim = run_backtest(bars, rule, config)?;
    let result = BacktestResult::compute(&sim);
    let chart = ChartBundle::build(&sim, &result.equity_curve);

    info!(
        ticker = %rule.ticker,
        trades = result.trade_count,
        total_return_pct = result.total_return_pct,
        win_rate_pct = result.win_rate_pct,
        "backtest finished"
    );

    Ok(BacktestResponse::new(rule, result, chart))
}
