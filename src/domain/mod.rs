//! Core domain types and logic.

pub mod price_bar;
pub mod indicator;
pub mod condition;
pub mod strategy;
pub mod signal;
pub mod normalizer;
pub mod backtest;
pub mod metrics;
pub mod chart;
pub mod response;
pub mod engine;
pub mod config_validation;
pub mod error;
