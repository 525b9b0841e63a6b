//! Declarative chart payload: price series, equity curve and trade markers.
//!
//! Nothing here renders; the bundle is serialized for an external renderer.

use crate::domain::backtest::{Direction, SimulationResult};
use crate::domain::metrics::EquityPoint;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMarker {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: MarkerKind,
    pub direction: Direction,
    /// Exit produced by the end of data rather than by the signal.
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBundle {
    pub ticker: String,
    pub prices: Vec<PricePoint>,
    pub equity_curve: Vec<EquityPoint>,
    pub markers: Vec<TradeMarker>,
}

impl ChartBundle {
    pub fn build(sim: &SimulationResult<'_>, equity_curve: &[EquityPoint]) -> Self {
        let prices = sim
            .window
            .iter()
            .map(|b| PricePoint {
                date: b.date,
                close: b.close,
            })
            .collect();

        let markers = sim
            .trades
            .iter()
            .flat_map(|t| {
                [
                    TradeMarker {
                        date: t.entry_date,
                        price: t.entry_price,
                        kind: MarkerKind::Entry,
                        direction: t.direction,
                        forced: false,
                    },
                    TradeMarker {
                        date: t.exit_date,
                        price: t.exit_price,
                        kind: MarkerKind::Exit,
                        direction: t.direction,
                        forced: t.is_forced(),
                    },
                ]
            })
            .collect();

        ChartBundle {
            ticker: sim.ticker.clone(),
            prices,
            equity_curve: equity_curve.to_vec(),
            markers,
        }
    }
}
