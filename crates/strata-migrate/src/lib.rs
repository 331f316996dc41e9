//! strata-migrate: versioned schema migrations for the Strata graph store.
//!
//! Scripts live in a [`ScriptSource`] (a directory of `.cypher` files by
//! default). [`MigrationRunner`] tracks which versions are applied as
//! `Migration` nodes and moves the store forward or back one transaction per
//! script.

pub mod error;
pub mod runner;
pub mod script;

pub use error::{MigrateError, Result};
pub use runner::{MigrationRunner, MigrationStatus};
pub use script::{scaffold, DirectorySource, MigrationScript, ScriptSource};
