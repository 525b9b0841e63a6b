//! Configuration validation.
//!
//! Every key is checked before a command touches price data, so a bad INI
//! file fails fast with the section and key named.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::StratsimError;
use crate::ports::config_port::{ConfigPort, parse_bool};
use crate::ports::data_port::Timeframe;
use chrono::NaiveDate;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_LOG_FILTER: &str = "stratsim=info";

/// Validate all sections. `require_data` is set by commands that load prices.
pub fn validate_config(config: &dyn ConfigPort, require_data: bool) -> Result<(), StratsimError> {
    if require_data {
        csv_dir(config)?;
    }
    data_timeframe(config)?;
    validate_cache_flag(config)?;
    build_backtest_config(config)?;
    listen_addr(config)?;
    Ok(())
}

pub fn csv_dir(config: &dyn ConfigPort) -> Result<PathBuf, StratsimError> {
    config
        .get_string("data", "csv_dir")
        .map(PathBuf::from)
        .ok_or_else(|| StratsimError::ConfigMissing {
            section: "data".to_string(),
            key: "csv_dir".to_string(),
        })
}

pub fn data_timeframe(config: &dyn ConfigPort) -> Result<Timeframe, StratsimError> {
    match config.get_string("data", "timeframe") {
        None => Ok(Timeframe::default()),
        Some(s) => s.parse().map_err(|reason| StratsimError::ConfigInvalid {
            section: "data".to_string(),
            key: "timeframe".to_string(),
            reason,
        }),
    }
}

pub fn cache_enabled(config: &dyn ConfigPort) -> bool {
    config.get_bool("data", "cache", true)
}

fn validate_cache_flag(config: &dyn ConfigPort) -> Result<(), StratsimError> {
    match config.get_string("data", "cache") {
        Some(s) if parse_bool(&s).is_none() => Err(StratsimError::ConfigInvalid {
            section: "data".to_string(),
            key: "cache".to_string(),
            reason: format!("'{}' is not a boolean", s),
        }),
        _ => Ok(()),
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StratsimError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start >= end {
            return Err(StratsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
    }
    Ok(BacktestConfig {
        start_date,
        end_date,
    })
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, StratsimError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| StratsimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            })
        })
        .transpose()
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, StratsimError> {
    let raw = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    raw.parse().map_err(|_| StratsimError::ConfigInvalid {
        section: "web".to_string(),
        key: "listen".to_string(),
        reason: format!("'{}' is not a socket address", raw),
    })
}

/// Log filter directive from `[logging] level`, e.g. `debug` or
/// `stratsim=debug,tower_http=info`.
pub fn log_level(config: &dyn ConfigPort) -> String {
    config
        .get_string("logging", "level")
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn valid_config() -> &'static str {
        r#"
[data]
csv_dir = /tmp/prices
timeframe = 1d
cache = true

[backtest]
start_date = 2019-01-01
end_date = 2024-12-31

[web]
listen = 0.0.0.0:9000

[logging]
level = debug
"#
    }

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = adapter(valid_config());
        assert!(validate_config(&config, true).is_ok());
        assert_eq!(csv_dir(&config).unwrap(), PathBuf::from("/tmp/prices"));
        assert_eq!(listen_addr(&config).unwrap().port(), 9000);
        assert_eq!(log_level(&config), "debug");
        assert!(cache_enabled(&config));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = adapter("");
        assert!(validate_config(&config, false).is_ok());
        assert_eq!(data_timeframe(&config).unwrap(), Timeframe::Daily);
        assert_eq!(build_backtest_config(&config).unwrap(), BacktestConfig::default());
        assert_eq!(listen_addr(&config).unwrap().to_string(), DEFAULT_LISTEN);
        assert_eq!(log_level(&config), DEFAULT_LOG_FILTER);
        assert!(cache_enabled(&config));
    }

    #[test]
    fn missing_csv_dir_when_required() {
        let config = adapter("[data]\ntimeframe = 1d\n");
        let err = validate_config(&config, true).unwrap_err();
        assert!(
            matches!(err, StratsimError::ConfigMissing { ref section, ref key } if section == "data" && key == "csv_dir")
        );
        assert!(validate_config(&config, false).is_ok());
    }

    #[test]
    fn bad_timeframe_rejected() {
        let config = adapter("[data]\ntimeframe = 5m\n");
        let err = validate_config(&config, false).unwrap_err();
        assert!(matches!(err, StratsimError::ConfigInvalid { ref key, .. } if key == "timeframe"));
    }

    #[test]
    fn bad_cache_flag_rejected() {
        let config = adapter("[data]\ncache = sometimes\n");
        let err = validate_config(&config, false).unwrap_err();
        assert!(matches!(err, StratsimError::ConfigInvalid { ref key, .. } if key == "cache"));
    }

    #[test]
    fn cache_flag_spellings_accepted() {
        for v in ["off", "No", "1"] {
            let config = adapter(&format!("[data]\ncache = {}\n", v));
            assert!(validate_config(&config, false).is_ok(), "{}", v);
        }
        assert!(!cache_enabled(&adapter("[data]\ncache = off\n")));
    }

    #[test]
    fn start_after_end_rejected() {
        let config = adapter("[backtest]\nstart_date = 2024-01-01\nend_date = 2023-01-01\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratsimError::ConfigInvalid { ref key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_rejected() {
        let config = adapter("[backtest]\nend_date = 31/12/2024\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratsimError::ConfigInvalid { ref key, .. } if key == "end_date"));
    }

    #[test]
    fn open_ended_window() {
        let config = adapter("[backtest]\nstart_date = 2020-06-01\n");
        let bt = build_backtest_config(&config).unwrap();
        assert_eq!(bt.start_date, NaiveDate::from_ymd_opt(2020, 6, 1));
        assert_eq!(bt.end_date, None);
    }

    #[test]
    fn bad_listen_rejected() {
        let config = adapter("[web]\nlisten = not-an-address\n");
        let err = validate_config(&config, false).unwrap_err();
        assert!(matches!(err, StratsimError::ConfigInvalid { ref section, .. } if section == "web"));
    }
}
