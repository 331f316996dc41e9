use thiserror::Error;

/// Top-level error type for Strata.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for StrataError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
