//! Strategy normalizer.
//!
//! Turns an untrusted strategy candidate (JSON produced by an upstream
//! text-to-structure step) into a validated [`StrategyRule`]. Field presence
//! and JSON types are checked explicitly; the first violated invariant is
//! reported as `MalformedStrategy` and nothing is partially accepted.
//!
//! # Token grammar
//!
//! Indicator tokens are case-insensitive; spaces and hyphens read as `_`.
//!
//! | Token | Operand |
//! |---|---|
//! | `RSI`, `RSI14`, `RSI(14)` | RSI, default period 14 |
//! | `SMA50`, `SMA(50)`, `MA50` | SMA, period required |
//! | `EMA20`, `EMA(20)` | EMA, period required |
//! | `ATR`, `ATR(14)` | ATR, default period 14 |
//! | `MACD`, `MACD_SIGNAL`, `MACD_HIST` | MACD fields, optional `(fast,slow,signal)` |
//! | `BB`/`BB_MIDDLE`, `BB_UPPER`, `BB_LOWER` | Bollinger fields, optional `(period,mult)` |
//! | `PRICE`, `CLOSE` | closing price |
//! | `VOLUME` | volume |

use crate::domain::condition::{Condition, IndicatorField, Operand, Operator};
use crate::domain::error::StratsimError;
use crate::domain::indicator::{
    DEFAULT_ATR_PERIOD, DEFAULT_BOLLINGER_MULT_X100, DEFAULT_BOLLINGER_PERIOD, DEFAULT_RSI_PERIOD,
    IndicatorType, macd,
};
use crate::domain::strategy::{Action, Combination, StrategyRule};
use crate::ports::data_port::TickerResolver;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const MAX_PERIOD: usize = 500;
const MAX_TICKER_LEN: usize = 15;

pub fn normalize<R: TickerResolver + ?Sized>(
    candidate: &Value,
    resolver: &R,
) -> Result<StrategyRule, StratsimError> {
    let result = normalize_candidate(candidate, resolver);
    match &result {
        Ok(rule) => debug!(
            ticker = %rule.ticker,
            action = %rule.action,
            conditions = rule.conditions.len(),
            "strategy normalized"
        ),
        Err(e) => warn!(error = %e, "strategy rejected"),
    }
    result
}

fn normalize_candidate<R: TickerResolver + ?Sized>(
    candidate: &Value,
    resolver: &R,
) -> Result<StrategyRule, StratsimError> {
    let obj = candidate
        .as_object()
        .ok_or_else(|| StratsimError::malformed("strategy is not a JSON object"))?;

    if let Some(upstream) = obj.get("error") {
        let msg = upstream.as_str().map_or_else(|| upstream.to_string(), str::to_string);
        return Err(StratsimError::malformed(format!(
            "upstream parser reported an error: {}",
            msg
        )));
    }

    let ticker = parse_ticker(obj)?;
    let action = parse_action(obj)?;
    let conditions = parse_conditions(obj)?;
    let combination = parse_combination(obj)?;

    if !resolver.is_resolvable(&ticker) {
        return Err(StratsimError::malformed(format!(
            "ticker {} does not resolve to a price series",
            ticker
        )));
    }

    Ok(StrategyRule {
        ticker,
        action,
        conditions,
        combination,
    })
}

fn parse_ticker(obj: &Map<String, Value>) -> Result<String, StratsimError> {
    let raw = match obj.get("ticker") {
        None | Some(Value::Null) => return Err(StratsimError::malformed("ticker is missing")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(StratsimError::malformed("ticker is not a string")),
    };

    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(StratsimError::malformed("ticker is empty"));
    }
    if ticker.len() > MAX_TICKER_LEN
        || !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'))
    {
        return Err(StratsimError::malformed(format!(
            "ticker '{}' is not a valid symbol",
            raw
        )));
    }
    Ok(ticker)
}

fn action_token(token: &str) -> Option<Action> {
    match token.trim().to_ascii_lowercase().as_str() {
        "buy" | "long" => Some(Action::Buy),
        "sell" | "short" => Some(Action::Sell),
        _ => None,
    }
}

fn parse_action(obj: &Map<String, Value>) -> Result<Action, StratsimError> {
    let tokens: Vec<&str> = match obj.get("action") {
        None | Some(Value::Null) => return Err(StratsimError::malformed("action is missing")),
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| StratsimError::malformed("action list contains a non-string"))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(StratsimError::malformed("action is not a string")),
    };

    let mut found: Option<Action> = None;
    for token in tokens {
        let action = action_token(token).ok_or_else(|| {
            StratsimError::malformed(format!("unknown action '{}' (expected buy or sell)", token))
        })?;
        match found {
            Some(prev) if prev != action => {
                return Err(StratsimError::malformed(
                    "strategy requests both buy and sell; only one action is supported",
                ));
            }
            _ => found = Some(action),
        }
    }
    found.ok_or_else(|| StratsimError::malformed("action list is empty"))
}

fn parse_conditions(obj: &Map<String, Value>) -> Result<Vec<Condition>, StratsimError> {
    let items = match obj.get("conditions") {
        None | Some(Value::Null) => return Err(StratsimError::malformed("conditions are missing")),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(StratsimError::malformed("conditions is not a list")),
    };
    if items.is_empty() {
        return Err(StratsimError::malformed("conditions list is empty"));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            parse_condition(item).map_err(|reason| {
                StratsimError::malformed(format!("condition {}: {}", i, reason))
            })
        })
        .collect()
}

fn parse_condition(item: &Value) -> Result<Condition, String> {
    let obj = item.as_object().ok_or("not an object")?;

    let indicator = match obj.get("indicator") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => return Err("indicator is missing".into()),
        Some(_) => return Err("indicator is not a string".into()),
    };
    let left = parse_operand_token(indicator)
        .ok_or_else(|| format!("unknown indicator token '{}'", indicator))?;

    let operator_raw = match obj.get("operator") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => return Err("operator is missing".into()),
        Some(_) => return Err("operator is not a string".into()),
    };
    let operator = parse_operator(operator_raw)
        .ok_or_else(|| format!("unknown operator token '{}'", operator_raw))?;

    let right = match obj.get("value") {
        None | Some(Value::Null) => return Err("value is missing".into()),
        Some(Value::Number(n)) => {
            Operand::Constant(n.as_f64().ok_or_else(|| format!("value {} is not finite", n))?)
        }
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Operand::Constant(v),
            _ => parse_operand_token(s).ok_or_else(|| {
                format!("value '{}' is neither a number nor a known indicator", s)
            })?,
        },
        Some(other) => {
            return Err(format!(
                "value {} is neither a number nor a known indicator",
                other
            ));
        }
    };

    check_value_domain(&left, &right)?;

    if left == right {
        return Err(format!("{} is compared with itself", left));
    }

    check_parameters(&left)?;
    check_parameters(&right)?;

    Ok(Condition::new(left, operator, right))
}

fn check_value_domain(left: &Operand, right: &Operand) -> Result<(), String> {
    let Operand::Constant(v) = *right else {
        return Ok(());
    };
    match left.indicator_type() {
        Some(IndicatorType::Rsi(_)) if !(0.0..=100.0).contains(&v) => Err(format!(
            "RSI threshold {} is outside [0, 100]",
            v
        )),
        Some(IndicatorType::Macd { .. }) => Ok(()),
        _ if v < 0.0 => Err(format!("{} threshold {} is negative", left, v)),
        _ => Ok(()),
    }
}

fn check_parameters(operand: &Operand) -> Result<(), String> {
    let Some(t) = operand.indicator_type() else {
        return Ok(());
    };
    let periods: Vec<usize> = match t {
        IndicatorType::Sma(n)
        | IndicatorType::Ema(n)
        | IndicatorType::Rsi(n)
        | IndicatorType::Atr(n) => vec![n],
        IndicatorType::Macd { fast, slow, signal } => vec![fast, slow, signal],
        IndicatorType::Bollinger { period, .. } => vec![period],
    };
    if let Some(bad) = periods.iter().find(|&&p| p == 0 || p > MAX_PERIOD) {
        return Err(format!(
            "{} period {} is outside 1..={}",
            operand, bad, MAX_PERIOD
        ));
    }
    match t {
        IndicatorType::Macd { fast, slow, .. } if fast >= slow => Err(format!(
            "MACD fast period {} must be shorter than slow period {}",
            fast, slow
        )),
        IndicatorType::Bollinger {
            stddev_mult_x100: 0,
            ..
        } => Err("Bollinger multiplier must be positive".into()),
        _ => Ok(()),
    }
}

fn parse_combination(obj: &Map<String, Value>) -> Result<Combination, StratsimError> {
    match obj.get("combination") {
        None | Some(Value::Null) => Ok(Combination::All),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "all" | "and" => Ok(Combination::All),
            "any" | "or" => Ok(Combination::Any),
            _ => Err(StratsimError::malformed(format!(
                "unknown combination '{}' (expected all or any)",
                s
            ))),
        },
        Some(_) => Err(StratsimError::malformed("combination is not a string")),
    }
}

pub fn parse_operator(token: &str) -> Option<Operator> {
    let t = token.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match t.as_str() {
        "<" => Some(Operator::Less),
        ">" => Some(Operator::Greater),
        "<=" => Some(Operator::LessEqual),
        ">=" => Some(Operator::GreaterEqual),
        "==" | "=" => Some(Operator::Equal),
        "crosses_above" | "cross_above" => Some(Operator::CrossesAbove),
        "crosses_below" | "cross_below" => Some(Operator::CrossesBelow),
        _ => None,
    }
}

/// Splits `NAME(a,b)` or `NAME50` into the base name and its raw parameters.
fn split_token(token: &str) -> Option<(&str, Vec<&str>)> {
    if let Some(open) = token.find('(') {
        let inner = token[open + 1..].strip_suffix(')')?;
        let params = inner.split(',').map(str::trim).collect();
        return Some((token[..open].trim_end_matches('_'), params));
    }
    let digits_at = token
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(token.len());
    let (base, digits) = token.split_at(digits_at);
    let base = base.trim_end_matches('_');
    if digits.is_empty() {
        Some((base, Vec::new()))
    } else {
        Some((base, vec![digits]))
    }
}

fn parse_periods(params: &[&str]) -> Option<Vec<usize>> {
    params.iter().map(|p| p.parse::<usize>().ok()).collect()
}

/// Parses an indicator or price token into an operand. Periods are not
/// range-checked here.
pub fn parse_operand_token(token: &str) -> Option<Operand> {
    let t = token.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    match t.as_str() {
        "PRICE" | "CLOSE" => return Some(Operand::Price),
        "VOLUME" => return Some(Operand::Volume),
        _ => {}
    }

    let (base, params) = split_token(&t)?;

    match base {
        "RSI" | "ATR" => {
            let default = if base == "RSI" {
                DEFAULT_RSI_PERIOD
            } else {
                DEFAULT_ATR_PERIOD
            };
            let period = match parse_periods(&params)?.as_slice() {
                [] => default,
                [n] => *n,
                _ => return None,
            };
            let indicator = if base == "RSI" {
                IndicatorType::Rsi(period)
            } else {
                IndicatorType::Atr(period)
            };
            Some(Operand::simple(indicator))
        }
        "SMA" | "MA" | "EMA" => match parse_periods(&params)?.as_slice() {
            [n] if base == "EMA" => Some(Operand::simple(IndicatorType::Ema(*n))),
            [n] => Some(Operand::simple(IndicatorType::Sma(*n))),
            _ => None,
        },
        "MACD" | "MACD_LINE" | "MACD_SIGNAL" | "MACD_HIST" | "MACD_HISTOGRAM" => {
            let field = match base {
                "MACD_SIGNAL" => IndicatorField::MacdSignal,
                "MACD_HIST" | "MACD_HISTOGRAM" => IndicatorField::MacdHistogram,
                _ => IndicatorField::MacdLine,
            };
            let (fast, slow, signal) = match parse_periods(&params)?.as_slice() {
                [] => (macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL),
                [f, s, g] => (*f, *s, *g),
                _ => return None,
            };
            Some(Operand::indicator(
                IndicatorType::Macd { fast, slow, signal },
                field,
            ))
        }
        "BB" | "BB_MIDDLE" | "BB_UPPER" | "BB_LOWER" | "BOLLINGER" => {
            let field = match base {
                "BB_UPPER" => IndicatorField::BollingerUpper,
                "BB_LOWER" => IndicatorField::BollingerLower,
                _ => IndicatorField::BollingerMiddle,
            };
            let (period, stddev_mult_x100) = match params.as_slice() {
                [] => (DEFAULT_BOLLINGER_PERIOD, DEFAULT_BOLLINGER_MULT_X100),
                [p] => (p.parse().ok()?, DEFAULT_BOLLINGER_MULT_X100),
                [p, m] => {
                    let mult: f64 = m.parse().ok()?;
                    if !mult.is_finite() || mult < 0.0 {
                        return None;
                    }
                    (p.parse().ok()?, (mult * 100.0).round() as u32)
                }
                _ => return None,
            };
            Some(Operand::indicator(
                IndicatorType::Bollinger {
                    period,
                    stddev_mult_x100,
                },
                field,
            ))
        }
        _ => None,
    }
}
