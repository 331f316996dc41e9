//! Neo4j connection management and the driver-backed [`GraphSession`].

use async_trait::async_trait;
use futures::TryStreamExt;
use neo4rs::{
    query, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query, Txn,
};
use serde_json::Value;

use strata_core::config::Neo4jSettings;

use crate::session::{AccessMode, Field, GraphSession, NodeRecord, Record, RecordStream, Statement};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Invalid identifier `{identifier}`: only letters, digits and underscores are allowed")]
    InvalidIdentifier { identifier: String },

    #[error("Field `{field}` is not declared on {label}")]
    UnknownField { label: String, field: String },

    #[error("Node not found: {label} with key {key}")]
    NotFound { label: String, key: String },

    #[error("Query returned no rows")]
    Empty,

    #[error("Filter has no populated fields; use Criteria::All to match every node")]
    EmptyFilter,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Neo4j unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Statement rejected: {0}")]
    Rejected(String),

    #[error("Neo4j query error: {0}")]
    Query(#[source] neo4rs::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// Whether the caller, not the store, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier { .. }
                | Self::UnknownField { .. }
                | Self::NotFound { .. }
                | Self::Empty
                | Self::EmptyFilter
                | Self::ConstraintViolation(_)
                | Self::Serialization(_)
        )
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(err: neo4rs::Error) -> Self {
        let message = err.to_string();
        if message.contains("ConstraintValidationFailed")
            || message.contains("already exists with label")
        {
            return Self::ConstraintViolation(message);
        }
        if message.contains("Neo.ClientError") {
            return Self::Rejected(message);
        }
        match err {
            neo4rs::Error::ConnectionError | neo4rs::Error::IOError { .. } => {
                Self::StoreUnavailable(message)
            }
            other => Self::Query(other),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&Neo4jSettings::default())
    }
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            database: settings.database.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// This is the connection provider handed to repositories and the migration
/// runner. Each `execute` borrows a pooled connection for that call only.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::StoreUnavailable(e.to_string()))?;

        tracing::info!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Release the connection pool. Outstanding clones keep it alive until
    /// they are dropped too.
    pub async fn close(self) {
        drop(self.graph);
        tracing::info!("Closed Neo4j client");
    }
}

#[async_trait]
impl GraphSession for GraphClient {
    async fn execute(
        &self,
        work: Vec<Statement>,
        mode: AccessMode,
    ) -> Result<RecordStream, GraphError> {
        if work.is_empty() {
            return Ok(RecordStream::empty());
        }

        // A lone read streams straight off an auto-commit connection.
        if mode == AccessMode::Read {
            if let [statement] = work.as_slice() {
                let columns = statement.columns.clone();
                let rows = self
                    .graph
                    .execute(to_query(statement)?)
                    .await?
                    .into_stream()
                    .map_err(GraphError::from)
                    .map_ok(move |row| row_to_record(&row, &columns));
                return Ok(RecordStream::live(rows));
            }
        }

        let mut txn = self.graph.start_txn().await?;
        let mut records = Vec::new();
        for (index, statement) in work.iter().enumerate() {
            match run_in_txn(&mut txn, statement).await {
                Ok(rows) => records = rows,
                Err(err) => {
                    tracing::warn!(statement = index, error = %err, "Rolling back transaction");
                    if let Err(rollback_err) = txn.rollback().await {
                        tracing::warn!(error = %rollback_err, "Rollback failed");
                    }
                    return Err(err);
                }
            }
        }
        txn.commit().await?;

        tracing::debug!(statements = work.len(), rows = records.len(), "Committed transaction");
        Ok(RecordStream::buffered(records))
    }
}

async fn run_in_txn(txn: &mut Txn, statement: &Statement) -> Result<Vec<Record>, GraphError> {
    let mut rows = txn.execute(to_query(statement)?).await?;
    let mut records = Vec::new();
    while let Some(row) = rows.next(txn.handle()).await? {
        records.push(row_to_record(&row, &statement.columns));
    }
    Ok(records)
}

// ── Conversions ──────────────────────────────────────────────────

fn to_query(statement: &Statement) -> Result<Query, GraphError> {
    let mut q = query(&statement.text);
    for (key, value) in &statement.params {
        q = q.param(key, to_bolt(value)?);
    }
    Ok(q)
}

/// Convert a JSON parameter into its Bolt representation.
///
/// Bolt integers are signed 64-bit; a larger unsigned number is refused
/// rather than rounded through a float.
pub(crate) fn to_bolt(value: &Value) -> Result<BoltType, GraphError> {
    let bolt = match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else if n.is_f64() {
                BoltType::from(n.as_f64().unwrap_or_default())
            } else {
                return Err(GraphError::Serialization(format!(
                    "integer {n} does not fit in a signed 64-bit Bolt integer"
                )));
            }
        }
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(to_bolt(item)?);
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::new();
            for (key, item) in map {
                bolt.put(BoltString::from(key.as_str()), to_bolt(item)?);
            }
            BoltType::Map(bolt)
        }
    };
    Ok(bolt)
}

/// Decode the declared columns of a driver row.
pub(crate) fn row_to_record(row: &neo4rs::Row, columns: &[String]) -> Record {
    let mut record = Record::new();
    for column in columns {
        let field = match row.get::<neo4rs::Node>(column) {
            Ok(node) => Field::Node(neo4j_node_to_record(&node)),
            Err(_) => Field::Value(scalar(
                || row.get::<bool>(column).ok(),
                || row.get::<i64>(column).ok(),
                || row.get::<f64>(column).ok(),
                || row.get::<String>(column).ok(),
                || row.get::<Vec<String>>(column).ok(),
            )),
        };
        record.insert(column.clone(), field);
    }
    record
}

fn neo4j_node_to_record(node: &neo4rs::Node) -> NodeRecord {
    let labels = node.labels().into_iter().map(str::to_string).collect();
    let mut properties = serde_json::Map::new();
    for key in node.keys() {
        let value = scalar(
            || node.get::<bool>(key).ok(),
            || node.get::<i64>(key).ok(),
            || node.get::<f64>(key).ok(),
            || node.get::<String>(key).ok(),
            || node.get::<Vec<String>>(key).ok(),
        );
        properties.insert(key.to_string(), value);
    }
    NodeRecord { labels, properties }
}

/// Try each scalar decoding in turn; integers before floats so whole numbers
/// stay integral.
fn scalar(
    as_bool: impl FnOnce() -> Option<bool>,
    as_int: impl FnOnce() -> Option<i64>,
    as_float: impl FnOnce() -> Option<f64>,
    as_string: impl FnOnce() -> Option<String>,
    as_list: impl FnOnce() -> Option<Vec<String>>,
) -> Value {
    if let Some(b) = as_bool() {
        return Value::Bool(b);
    }
    if let Some(i) = as_int() {
        return Value::from(i);
    }
    if let Some(f) = as_float() {
        return Value::from(f);
    }
    if let Some(s) = as_string() {
        return Value::String(s);
    }
    if let Some(list) = as_list() {
        return Value::from(list);
    }
    Value::Null
}
