//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let emas = ema_values(&closes, period);

    let values = bars
        .iter()
        .zip(emas)
        .map(|(bar, ema)| match ema {
            Some(v) => IndicatorPoint::defined(bar.date, IndicatorValue::Simple(v)),
            None => IndicatorPoint::undefined(bar.date),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// SMA-seeded EMA over a plain slice; `None` for the first `period - 1` slots.
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i < period - 1 {
            sum += v;
            out.push(None);
        } else if i == period - 1 {
            sum += v;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = v * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn value(series: &IndicatorSeries, i: usize) -> f64 {
        assert!(series.values[i].valid, "bar {} undefined", i);
        match series.values[i].value {
            IndicatorValue::Simple(v) => v,
            ref other => panic!("expected simple value, got {:?}", other),
        }
    }

    #[test]
    fn ema_warmup() {
        let series = calculate_ema(&make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        let valid: Vec<bool> = series.values.iter().map(|p| p.valid).collect();
        assert_eq!(valid, [false, false, true, true, true]);
    }

    #[test]
    fn ema_seed_then_recursion() {
        let series = calculate_ema(&make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        let k = 0.5;
        let seed = 20.0;
        let ema_3 = 40.0 * k + seed * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert_relative_eq!(value(&series, 2), seed);
        assert_relative_eq!(value(&series, 3), ema_3);
        assert_relative_eq!(value(&series, 4), ema_4);
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let series = calculate_ema(&make_bars(&[10.0, 20.0, 30.0]), 1);
        assert_relative_eq!(value(&series, 0), 10.0);
        assert_relative_eq!(value(&series, 1), 20.0);
    }

    #[test]
    fn ema_flat_prices() {
        let series = calculate_ema(&make_bars(&[100.0; 6]), 3);
        for i in 2..6 {
            assert_relative_eq!(value(&series, i), 100.0);
        }
    }

    #[test]
    fn ema_values_on_plain_slice() {
        let out = ema_values(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(1.5));
        assert_relative_eq!(out[2].unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn ema_degenerate_inputs_stay_aligned() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        let series = calculate_ema(&make_bars(&[10.0, 20.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
        assert_eq!(series.indicator_type, IndicatorType::Ema(0));
    }
}
