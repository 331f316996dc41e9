//! Strata Graph: Neo4j access layer.
//!
//! Every read and write against the graph store goes through a
//! [`GraphSession`]. Queries are built by [`QueryBuilder`] from validated
//! identifiers and bound parameters, and typed entities are mapped onto
//! labelled nodes by [`Repository`] and [`Hierarchy`].

pub mod client;
pub mod hierarchy;
pub mod mock;
pub mod query;
pub mod repository;
pub mod seed;
pub mod session;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use hierarchy::Hierarchy;
pub use query::{Criteria, Depth, Direction, QueryBuilder, DEFAULT_LIMIT};
pub use repository::Repository;
pub use seed::{SeedLoader, SeedReport};
pub use session::{AccessMode, Field, GraphSession, NodeRecord, Record, RecordStream, Statement};
