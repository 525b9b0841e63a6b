//! stratsim: interpreter and backtester for structured trading strategies.
//!
//! A strategy arrives as loosely-typed JSON, is normalized into a
//! [`domain::strategy::StrategyRule`], replayed over historical bars and
//! summarized as a [`domain::response::BacktestResponse`].
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
