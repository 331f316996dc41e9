//! strata-core: Shared types, configuration, and error handling for Strata.
//!
//! This crate provides the foundational pieces used by the graph and
//! migration crates:
//! - Entity schemas (label, natural key, ordered field list)
//! - The `Category` domain entity and its filter/patch projections
//! - Settings loading (file + environment)
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::StrataError;
pub use types::{Category, CategoryFilter, CategoryPatch, EntitySchema, FieldDef, FieldKind};
