//! Condition evaluation engine.
//!
//! Evaluates conditions against price bars and pre-computed indicator values,
//! producing one boolean per bar.
//!
//! # Evaluation Semantics
//!
//! - Comparisons: evaluated at each bar; `==` uses an absolute tolerance
//! - `crosses_above`/`crosses_below`: need both operands defined at `t` and
//!   `t-1`; always `false` at index 0
//! - A bar where any required operand is undefined evaluates to `false`

use crate::domain::condition::{Condition, IndicatorField, IndicatorRef, Operand, Operator};
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price_bar::PriceBar;
use crate::domain::strategy::Combination;
use std::collections::HashMap;

const EPSILON: f64 = 1e-9;

/// Per-bar boolean, aligned 1:1 with the bars it was evaluated on.
pub type Signal = Vec<bool>;

pub fn evaluate_condition(
    condition: &Condition,
    bars: &[PriceBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Signal {
    (0..bars.len())
        .map(|i| evaluate_at(condition, bars, indicators, i))
        .collect()
}

pub fn evaluate_at(
    condition: &Condition,
    bars: &[PriceBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> bool {
    let resolve = |op: &Operand, i: usize| resolve_operand(op, bars, indicators, i);

    let (Some(left), Some(right)) = (
        resolve(&condition.left, bar_index),
        resolve(&condition.right, bar_index),
    ) else {
        return false;
    };

    match condition.operator {
        Operator::Less => left < right,
        Operator::Greater => left > right,
        Operator::LessEqual => left <= right,
        Operator::GreaterEqual => left >= right,
        Operator::Equal => (left - right).abs() < EPSILON,
        Operator::CrossesAbove | Operator::CrossesBelow => {
            if bar_index == 0 {
                return false;
            }
            let (Some(left_prev), Some(right_prev)) = (
                resolve(&condition.left, bar_index - 1),
                resolve(&condition.right, bar_index - 1),
            ) else {
                return false;
            };
            if condition.operator == Operator::CrossesAbove {
                left_prev <= right_prev && left > right
            } else {
                left_prev >= right_prev && left < right
            }
        }
    }
}

/// Element-wise AND (`All`) or OR (`Any`) of equally long signals.
pub fn combine_signals(signals: &[Signal], combination: Combination) -> Signal {
    let Some(first) = signals.first() else {
        return Vec::new();
    };
    (0..first.len())
        .map(|i| match combination {
            Combination::All => signals.iter().all(|s| s[i]),
            Combination::Any => signals.iter().any(|s| s[i]),
        })
        .collect()
}

fn resolve_operand(
    operand: &Operand,
    bars: &[PriceBar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> Option<f64> {
    match operand {
        Operand::Price => bars.get(bar_index).map(|b| b.close),
        Operand::Volume => bars.get(bar_index).map(|b| b.volume),
        Operand::Constant(v) => Some(*v),
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators, bar_index),
    }
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> Option<f64> {
    let point = indicators
        .get(&ind_ref.indicator_type)?
        .values
        .get(bar_index)?;
    if !point.valid {
        return None;
    }
    extract_field(&point.value, ind_ref.field)
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> Option<f64> {
    match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => Some(*v),
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => Some(*line),
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => Some(*signal),
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => {
            Some(*histogram)
        }
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => Some(*upper),
        (IndicatorValue::Bollinger { middle, .. }, IndicatorField::BollingerMiddle) => {
            Some(*middle)
        }
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => Some(*lower),
        _ => None,
    }
}
