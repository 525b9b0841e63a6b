//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values = rolling_mean(&closes, period)
        .into_iter()
        .enumerate()
        .map(|(i, mean)| match mean {
            Some(middle) => {
                let window = &closes[i + 1 - period..=i];
                let variance = window
                    .iter()
                    .map(|c| (c - middle).powi(2))
                    .sum::<f64>()
                    / period as f64;
                let band = mult * variance.sqrt();
                IndicatorPoint::defined(
                    bars[i].date,
                    IndicatorValue::Bollinger {
                        upper: middle + band,
                        middle,
                        lower: middle - band,
                    },
                )
            }
            None => IndicatorPoint::undefined(bars[i].date),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}
