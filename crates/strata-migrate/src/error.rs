//! Error types for the strata-migrate crate.

use strata_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Unknown migration target: {version}")]
    UnknownTarget { version: String },

    #[error("Failed to apply migration {version}: {source}")]
    ApplyFailure {
        version: String,
        #[source]
        source: GraphError,
    },

    #[error("Failed to revert migration {version}: {source}")]
    RevertFailure {
        version: String,
        #[source]
        source: GraphError,
    },

    #[error("Malformed migration script {version}: {reason}")]
    MalformedScript { version: String, reason: String },

    #[error("Applied migration {version} has no script")]
    MissingScript { version: String },

    #[error("Migration {version} is pending but a later version is applied")]
    OutOfOrder { version: String },

    #[error("Migration {version} is recorded as applied more than once")]
    DuplicateRecord { version: String },

    #[error("Invalid migration name: {name}")]
    InvalidName { name: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Whether the caller asked for something that cannot be done, as
    /// opposed to the store or the script set failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownTarget { .. } | Self::InvalidName { .. })
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
