//! Domain error types.

/// Top-level error type for stratsim.
///
/// Every variant is terminal for the request that produced it; nothing in the
/// engine retries.
#[derive(Debug, thiserror::Error)]
pub enum StratsimError {
    #[error("malformed strategy: {reason}")]
    MalformedStrategy { reason: String },

    #[error(
        "insufficient history for {ticker}: {indicator} needs {required} bars, have {bars}"
    )]
    InsufficientHistory {
        ticker: String,
        indicator: String,
        bars: usize,
        required: usize,
    },

    #[error("unresolvable ticker {ticker}: {reason}")]
    UnresolvableTicker { ticker: String, reason: String },

    #[error("computation error: {reason}")]
    Computation { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StratsimError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        StratsimError::MalformedStrategy {
            reason: reason.into(),
        }
    }

    pub fn computation(reason: impl Into<String>) -> Self {
        StratsimError::Computation {
            reason: reason.into(),
        }
    }
}

impl From<&StratsimError> for std::process::ExitCode {
    fn from(err: &StratsimError) -> Self {
        let code: u8 = match err {
            StratsimError::Io(_) | StratsimError::Json(_) => 1,
            StratsimError::ConfigParse { .. }
            | StratsimError::ConfigMissing { .. }
            | StratsimError::ConfigInvalid { .. } => 2,
            StratsimError::MalformedStrategy { .. } => 3,
            StratsimError::UnresolvableTicker { .. } => 4,
            StratsimError::InsufficientHistory { .. } => 5,
            StratsimError::Computation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
