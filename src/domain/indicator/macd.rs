//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the SMA of its first
//! `signal` defined values
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars; all three outputs share it.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::undefined(b.date))
        .collect();

    if fast == 0 || slow == 0 || signal_period == 0 || bars.len() < slow {
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    // The line is defined once both EMAs are; with fast < slow that is slow - 1.
    let line_start = slow.max(fast) - 1;
    let line: Vec<f64> = (line_start..bars.len())
        .map(|i| match (ema_fast[i], ema_slow[i]) {
            (Some(f), Some(s)) => f - s,
            _ => f64::NAN,
        })
        .collect();
    let signal = ema_values(&line, signal_period);

    for (offset, (&macd_line, signal_value)) in line.iter().zip(signal).enumerate() {
        if let Some(signal_value) = signal_value {
            let i = line_start + offset;
            values[i] = IndicatorPoint::defined(
                bars[i].date,
                IndicatorValue::Macd {
                    line: macd_line,
                    signal: signal_value,
                    histogram: macd_line - signal_value,
                },
            );
        }
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[PriceBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn trending(n: usize) -> Vec<PriceBar> {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 + (i as f64).sin()).collect();
        make_bars(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let series = calculate_macd_default(&trending(40));

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid, "Index {} should be valid", warmup);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = calculate_macd_default(&trending(60));

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            } else {
                panic!("Expected Macd value");
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]);
        let series = calculate_macd(&bars, 3, 5, 2);

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ema_fast = ema_values(&closes, 3);
        let ema_slow = ema_values(&closes, 5);

        for (i, point) in series.values.iter().enumerate().filter(|(_, p)| p.valid) {
            if let IndicatorValue::Macd { line, .. } = point.value {
                let expected = ema_fast[i].unwrap() - ema_slow[i].unwrap();
                assert!((line - expected).abs() < 1e-12, "MACD line mismatch at {}", i);
            }
        }
    }

    #[test]
    fn macd_signal_seeded_with_sma_of_line() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 15.0, 14.0, 18.0, 17.0, 21.0]);
        let series = calculate_macd(&bars, 2, 4, 3);

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let f = ema_values(&closes, 2);
        let s = ema_values(&closes, 4);
        let line = |i: usize| f[i].unwrap() - s[i].unwrap();
        let seed = (line(3) + line(4) + line(5)) / 3.0;

        assert!(!series.values[4].valid);
        if let IndicatorValue::Macd { signal, .. } = series.values[5].value {
            assert!((signal - seed).abs() < 1e-12);
        } else {
            panic!("Expected Macd value");
        }
    }

    #[test]
    fn macd_short_history_is_all_undefined() {
        let series = calculate_macd_default(&trending(30));
        assert_eq!(series.values.len(), 30);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn macd_zero_period() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        for series in [
            calculate_macd(&bars, 0, 26, 9),
            calculate_macd(&bars, 12, 0, 9),
            calculate_macd(&bars, 12, 26, 0),
        ] {
            assert_eq!(series.values.len(), 3);
            assert!(series.values.iter().all(|p| !p.valid));
        }
    }

    #[test]
    fn macd_indicator_type() {
        let series = calculate_macd(&make_bars(&[100.0]), 5, 10, 3);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
    }
}
