//! Configuration management for Strata tools.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`STRATA__` prefix, `__` separator)
//! 2. Config file (`strata.toml`, optional)
//! 3. Defaults

use serde::Deserialize;

use crate::error::StrataError;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "STRATA";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub migrations: MigrationSettings,
}

/// Connection parameters for the graph store.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Where migration scripts live.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationSettings {
    /// Directory holding `<timestamp>_<name>.cypher` scripts.
    #[serde(default = "default_migration_dir")]
    pub dir: String,
}

impl Settings {
    /// Load settings from `<file_prefix>.toml` (if present) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, StrataError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        tracing::debug!(
            uri = %settings.neo4j.uri,
            database = %settings.neo4j.database,
            migration_dir = %settings.migrations.dir,
            "Loaded settings"
        );
        Ok(settings)
    }
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_migration_dir() -> String {
    "migrations".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            dir: default_migration_dir(),
        }
    }
}
