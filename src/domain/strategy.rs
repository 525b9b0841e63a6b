//! Validated strategy rule and its canonical summary.

use crate::domain::condition::{Condition, Operand};
use crate::domain::indicator::IndicatorType;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.write_str("buy"),
            Action::Sell => f.write_str("sell"),
        }
    }
}

/// How per-condition signals are merged into one entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combination {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRule {
    pub ticker: String,
    pub action: Action,
    pub conditions: Vec<Condition>,
    pub combination: Combination,
}

impl StrategyRule {
    /// Every indicator the rule reads, deduplicated, in first-use order.
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        let mut types: Vec<IndicatorType> = Vec::new();
        for t in self.conditions.iter().flat_map(|c| c.indicator_types()) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
        types
    }

    /// The condition with the longest warmup.
    pub fn limiting_condition(&self) -> Option<&Condition> {
        self.conditions.iter().max_by_key(|c| c.lookback())
    }

    pub fn required_bars(&self) -> usize {
        self.limiting_condition().map_or(1, |c| c.required_bars())
    }

    pub fn summary(&self) -> StrategySummary {
        StrategySummary {
            ticker: self.ticker.clone(),
            action: self.action,
            conditions: self
                .conditions
                .iter()
                .map(|c| ConditionSummary {
                    indicator: c.left.to_string(),
                    operator: c.operator.to_string(),
                    value: match &c.right {
                        Operand::Constant(v) => SummaryValue::Number(*v),
                        other => SummaryValue::Reference(other.to_string()),
                    },
                })
                .collect(),
            combination: self.combination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub ticker: String,
    pub action: Action,
    pub conditions: Vec<ConditionSummary>,
    pub combination: Combination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionSummary {
    pub indicator: String,
    pub operator: String,
    pub value: SummaryValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Number(f64),
    Reference(String),
}
