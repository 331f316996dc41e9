//! Transactional session abstraction over the graph store.
//!
//! A [`GraphSession`] runs a unit of work (one or more parameterized
//! [`Statement`]s) inside a single transaction and hands back the rows of
//! the final statement as a [`RecordStream`].

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::GraphError;

/// Whether a unit of work only reads or may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// A Cypher statement with its bound parameters and returned columns.
///
/// Parameters are kept in a `BTreeMap` so two statements built from the same
/// inputs compare (and print) identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: BTreeMap<String, Value>,
    /// Variable names in the `RETURN` clause to decode from each row.
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
            columns: Vec::new(),
        }
    }

    /// Bind a parameter value.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Declare a returned column.
    pub fn returns(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// A node as seen by a query: its labels and scalar properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRecord {
    pub labels: Vec<String>,
    pub properties: serde_json::Map<String, Value>,
}

impl NodeRecord {
    pub fn new(label: impl Into<String>, properties: serde_json::Map<String, Value>) -> Self {
        Self {
            labels: vec![label.into()],
            properties,
        }
    }
}

/// A single returned column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Node(NodeRecord),
    Value(Value),
}

/// One result row: bound variable name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, field: Field) -> Self {
        self.insert(name, field);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// The node bound to `name`.
    pub fn node(&self, name: &str) -> Result<&NodeRecord, GraphError> {
        match self.fields.get(name) {
            Some(Field::Node(node)) => Ok(node),
            Some(Field::Value(_)) => Err(GraphError::Serialization(format!(
                "column `{name}` is a scalar, expected a node"
            ))),
            None => Err(GraphError::Serialization(format!(
                "column `{name}` missing from record"
            ))),
        }
    }

    /// Deserialize the scalar bound to `name`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, GraphError> {
        let value = match self.fields.get(name) {
            Some(Field::Value(value)) => value.clone(),
            Some(Field::Node(node)) => Value::Object(node.properties.clone()),
            None => Value::Null,
        };
        serde_json::from_value(value)
            .map_err(|e| GraphError::Serialization(format!("column `{name}`: {e}")))
    }
}

/// Rows pulled from the store on demand.
type RowStream = Pin<Box<dyn Stream<Item = Result<Record, GraphError>> + Send>>;

enum Source {
    Buffered(std::vec::IntoIter<Record>),
    Live(RowStream),
}

/// Lazy, finite, single-pass sequence of records.
///
/// Run the work again to read the rows a second time.
pub struct RecordStream {
    source: Source,
}

impl RecordStream {
    /// A stream over rows that were already fetched.
    pub fn buffered(records: Vec<Record>) -> Self {
        Self {
            source: Source::Buffered(records.into_iter()),
        }
    }

    pub fn empty() -> Self {
        Self::buffered(Vec::new())
    }

    /// A stream that fetches each record only when asked for it.
    pub fn live(rows: impl Stream<Item = Result<Record, GraphError>> + Send + 'static) -> Self {
        Self {
            source: Source::Live(Box::pin(rows)),
        }
    }

    /// Pull the next record, fetching from the store if needed.
    pub async fn next(&mut self) -> Result<Option<Record>, GraphError> {
        match &mut self.source {
            Source::Buffered(records) => Ok(records.next()),
            Source::Live(rows) => rows.next().await.transpose(),
        }
    }

    /// The first record, if any.
    pub async fn first(mut self) -> Result<Option<Record>, GraphError> {
        self.next().await
    }

    /// The first record; [`GraphError::Empty`] when there is none.
    pub async fn single(self) -> Result<Record, GraphError> {
        self.first().await?.ok_or(GraphError::Empty)
    }

    /// Drain every remaining record.
    pub async fn collect(mut self) -> Result<Vec<Record>, GraphError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}

/// Transactional access to the graph store.
///
/// Implementations run every statement of one `execute` call inside a single
/// transaction: either all of them commit or none do. A connection is held
/// only for the duration of the call (or until a lazily streamed read is
/// drained or dropped).
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run `work` atomically and return the rows of its final statement.
    async fn execute(
        &self,
        work: Vec<Statement>,
        mode: AccessMode,
    ) -> Result<RecordStream, GraphError>;

    /// Run a single statement.
    async fn run(&self, statement: Statement, mode: AccessMode) -> Result<RecordStream, GraphError> {
        self.execute(vec![statement], mode).await
    }
}
