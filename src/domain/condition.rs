//! Condition vocabulary.
//!
//! - `Operand`: What can be compared (price, volume, constants, indicators)
//! - `IndicatorRef`: Reference to an indicator with a specific field
//! - `IndicatorField`: Which field of a multi-value indicator to use
//! - `Operator`: Closed set of comparison operators
//! - `Condition`: One `left operator right` comparison
//!
//! Every type here is produced by the normalizer; nothing downstream parses
//! free text.

use crate::domain::indicator::{IndicatorType, macd};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Price,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    CrossesAbove,
    CrossesBelow,
}

impl Operator {
    pub fn is_crossing(&self) -> bool {
        matches!(self, Operator::CrossesAbove | Operator::CrossesBelow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Equal => "==",
            Operator::CrossesAbove => "crosses_above",
            Operator::CrossesBelow => "crosses_below",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operand {
    pub fn indicator(indicator_type: IndicatorType, field: IndicatorField) -> Self {
        Operand::Indicator(IndicatorRef {
            indicator_type,
            field,
        })
    }

    /// Shorthand for single-valued indicators (RSI, SMA, EMA, ATR).
    pub fn simple(indicator_type: IndicatorType) -> Self {
        Operand::indicator(indicator_type, IndicatorField::Value)
    }

    pub fn indicator_type(&self) -> Option<IndicatorType> {
        match self {
            Operand::Indicator(r) => Some(r.indicator_type),
            _ => None,
        }
    }

    /// Index of the first bar at which this operand has a value.
    pub fn lookback(&self) -> usize {
        self.indicator_type().map_or(0, |t| t.lookback())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Price => f.write_str("PRICE"),
            Operand::Volume => f.write_str("VOLUME"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(r) => write!(f, "{}", r),
        }
    }
}

/// Canonical token, readable back by the normalizer.
impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.indicator_type, self.field) {
            (IndicatorType::Macd { fast, slow, signal }, field) => {
                let name = match field {
                    IndicatorField::MacdSignal => "MACD_SIGNAL",
                    IndicatorField::MacdHistogram => "MACD_HIST",
                    _ => "MACD",
                };
                if (fast, slow, signal)
                    == (macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL)
                {
                    f.write_str(name)
                } else {
                    write!(f, "{}({},{},{})", name, fast, slow, signal)
                }
            }
            (
                IndicatorType::Bollinger {
                    period,
                    stddev_mult_x100,
                },
                field,
            ) => {
                let name = match field {
                    IndicatorField::BollingerUpper => "BB_UPPER",
                    IndicatorField::BollingerLower => "BB_LOWER",
                    _ => "BB_MIDDLE",
                };
                let mult = stddev_mult_x100 as f64 / 100.0;
                write!(f, "{}({},{})", name, period, mult)
            }
            (other, _) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub operator: Operator,
    pub right: Operand,
}

impl Condition {
    pub fn new(left: Operand, operator: Operator, right: Operand) -> Self {
        Condition {
            left,
            operator,
            right,
        }
    }

    /// Bars that must precede the first evaluable bar. Crossings also read
    /// the previous bar.
    pub fn lookback(&self) -> usize {
        let base = self.left.lookback().max(self.right.lookback());
        if self.operator.is_crossing() {
            base + 1
        } else {
            base
        }
    }

    pub fn required_bars(&self) -> usize {
        self.lookback() + 1
    }

    /// The operand with the longest warmup, used to name it in errors.
    pub fn limiting_operand(&self) -> &Operand {
        if self.right.lookback() > self.left.lookback() {
            &self.right
        } else {
            &self.left
        }
    }

    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        [&self.left, &self.right]
            .iter()
            .filter_map(|op| op.indicator_type())
            .collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}
