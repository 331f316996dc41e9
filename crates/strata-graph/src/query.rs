//! Cypher query builder for labelled entities.
//!
//! Only structural identifiers (labels, property names, relationship types)
//! are ever spliced into query text, and only after they pass
//! [`validate_identifier`]. Every value travels as a bound parameter:
//! property values as `$p_<property>`, the natural key as `$key`, result
//! caps as `$limit`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use strata_core::EntitySchema;

use crate::client::GraphError;
use crate::session::Statement;

/// Result cap applied when callers do not pick one.
pub const DEFAULT_LIMIT: usize = 100;

/// Variable every entity-returning statement binds its node to.
pub const NODE_COLUMN: &str = "n";

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Reject anything that is not a plain Cypher identifier.
pub fn validate_identifier(identifier: &str) -> Result<&str, GraphError> {
    if identifier_pattern().is_match(identifier) {
        Ok(identifier)
    } else {
        Err(GraphError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}

/// Serialize a value into a property map.
pub fn to_properties<T: Serialize>(value: &T) -> Result<serde_json::Map<String, Value>, GraphError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(GraphError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(GraphError::Serialization(e.to_string())),
    }
}

/// Which end of a directed relationship the starting node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Nodes with an edge pointing *into* the start node.
    Children,
    /// Nodes the start node points *to*.
    Parents,
}

/// How far a traversal may walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Depth {
    #[default]
    One,
    /// Up to `n` hops (`Hops(0)` and `Hops(1)` mean one hop).
    Hops(u32),
    Unbounded,
}

impl Depth {
    fn pattern(&self) -> String {
        match self {
            Self::One | Self::Hops(0) | Self::Hops(1) => String::new(),
            Self::Hops(n) => format!("*1..{n}"),
            Self::Unbounded => "*1..".to_string(),
        }
    }
}

/// Constraints for a `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Explicitly unconstrained: every node of the label, up to the limit.
    All,
    /// Equality on each property. Null entries place no constraint; at
    /// least one non-null entry is required.
    Matching(BTreeMap<String, Value>),
    /// Case-sensitive substring match on one string property.
    Contains { field: String, fragment: String },
}

impl Criteria {
    /// Build equality constraints from the populated fields of `filter`.
    ///
    /// Null fields are skipped. A filter with no populated field fails with
    /// [`GraphError::EmptyFilter`] instead of silently matching everything.
    pub fn matching<F: Serialize>(filter: &F) -> Result<Self, GraphError> {
        let populated: BTreeMap<String, Value> = to_properties(filter)?
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect();
        if populated.is_empty() {
            return Err(GraphError::EmptyFilter);
        }
        Ok(Self::Matching(populated))
    }

    /// Single-property equality.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.into(), value.into());
        Self::Matching(map)
    }

    /// Substring search on `field`.
    pub fn contains(field: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            fragment: fragment.into(),
        }
    }
}

/// Builds statements for one label keyed by one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    label: String,
    key: String,
}

impl QueryBuilder {
    pub fn new(label: &str, key: &str) -> Result<Self, GraphError> {
        Ok(Self {
            label: validate_identifier(label)?.to_string(),
            key: validate_identifier(key)?.to_string(),
        })
    }

    /// Builder for a schema; every declared field name is validated too.
    pub fn for_schema(schema: &EntitySchema) -> Result<Self, GraphError> {
        for name in schema.field_names() {
            validate_identifier(name)?;
        }
        Self::new(&schema.label, &schema.key)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn match_by_key(&self, var: &str, param: &str) -> String {
        format!("({var}:{} {{{}: ${param}}})", self.label, self.key)
    }

    /// `CREATE` a node carrying every given property.
    pub fn create(&self, props: &BTreeMap<String, Value>) -> Result<Statement, GraphError> {
        let mut assignments = Vec::with_capacity(props.len());
        for name in props.keys() {
            let name = validate_identifier(name)?;
            assignments.push(format!("{name}: $p_{name}"));
        }
        let body = if assignments.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", assignments.join(", "))
        };

        let statement = Statement::new(format!(
            "CREATE (n:{}{body}) RETURN n",
            self.label
        ));
        Ok(bind_props(statement, props).returns(NODE_COLUMN))
    }

    /// Exact match on the natural key.
    pub fn get(&self, key: impl Into<Value>) -> Statement {
        Statement::new(format!("MATCH {} RETURN n", self.match_by_key("n", "key")))
            .param("key", key)
            .returns(NODE_COLUMN)
    }

    /// Nodes matching `criteria`, ordered by key, capped at `limit`.
    pub fn find(&self, criteria: &Criteria, limit: usize) -> Result<Statement, GraphError> {
        let mut statement = match criteria {
            Criteria::All => Statement::new(format!(
                "MATCH (n:{}) RETURN n ORDER BY n.{} LIMIT $limit",
                self.label, self.key
            )),
            Criteria::Matching(filters) => {
                let populated: BTreeMap<String, Value> = filters
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                if populated.is_empty() {
                    return Err(GraphError::EmptyFilter);
                }
                let mut predicates = Vec::with_capacity(populated.len());
                for name in populated.keys() {
                    let name = validate_identifier(name)?;
                    predicates.push(format!("n.{name} = $p_{name}"));
                }
                let statement = Statement::new(format!(
                    "MATCH (n:{}) WHERE {} RETURN n ORDER BY n.{} LIMIT $limit",
                    self.label,
                    predicates.join(" AND "),
                    self.key
                ));
                bind_props(statement, &populated)
            }
            Criteria::Contains { field, fragment } => {
                if fragment.is_empty() {
                    return Err(GraphError::EmptyFilter);
                }
                let field = validate_identifier(field)?;
                Statement::new(format!(
                    "MATCH (n:{}) WHERE n.{field} CONTAINS $p_{field} \
                     RETURN n ORDER BY n.{} LIMIT $limit",
                    self.label, self.key
                ))
                .param(format!("p_{field}"), fragment.as_str())
            }
        };
        // Bolt integers are signed; anything larger is no cap at all.
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        statement = statement.param("limit", limit);
        Ok(statement.returns(NODE_COLUMN))
    }

    /// Set only the given properties on the node with `key`.
    pub fn update(
        &self,
        key: impl Into<Value>,
        props: &BTreeMap<String, Value>,
    ) -> Result<Statement, GraphError> {
        let mut assignments = Vec::with_capacity(props.len());
        for name in props.keys() {
            let name = validate_identifier(name)?;
            assignments.push(format!("n.{name} = $p_{name}"));
        }
        let set = if assignments.is_empty() {
            String::new()
        } else {
            format!(" SET {}", assignments.join(", "))
        };

        let statement = Statement::new(format!(
            "MATCH {}{set} RETURN n",
            self.match_by_key("n", "key")
        ))
        .param("key", key);
        Ok(bind_props(statement, props).returns(NODE_COLUMN))
    }

    /// Detach and delete the node with `key`; returns how many were removed.
    pub fn delete(&self, key: impl Into<Value>) -> Statement {
        Statement::new(format!(
            "MATCH {} DETACH DELETE n RETURN count(n) AS deleted",
            self.match_by_key("n", "key")
        ))
        .param("key", key)
        .returns("deleted")
    }

    /// Walk `relationship` edges from the node with `key`.
    ///
    /// Each direction has its own fixed template. Results are distinct,
    /// exclude the start node and are ordered by key.
    pub fn traverse(
        &self,
        relationship: &str,
        direction: Direction,
        key: impl Into<Value>,
        depth: Depth,
    ) -> Result<Statement, GraphError> {
        let rel = validate_identifier(relationship)?;
        let hops = depth.pattern();
        let start = self.match_by_key("start", "key");
        let text = match direction {
            Direction::Children => format!(
                "MATCH (m:{label})-[:{rel}{hops}]->{start} WHERE m <> start \
                 RETURN DISTINCT m AS n ORDER BY n.{key}",
                label = self.label,
                key = self.key,
            ),
            Direction::Parents => format!(
                "MATCH {start}-[:{rel}{hops}]->(m:{label}) WHERE m <> start \
                 RETURN DISTINCT m AS n ORDER BY n.{key}",
                label = self.label,
                key = self.key,
            ),
        };
        Ok(Statement::new(text).param("key", key).returns(NODE_COLUMN))
    }

    /// Idempotently connect `child -[relationship]-> parent`.
    ///
    /// Returns `linked = 0` when either endpoint is missing.
    pub fn link(
        &self,
        relationship: &str,
        child: impl Into<Value>,
        parent: impl Into<Value>,
    ) -> Result<Statement, GraphError> {
        let rel = validate_identifier(relationship)?;
        Ok(Statement::new(format!(
            "MATCH {} MATCH {} MERGE (child)-[:{rel}]->(parent) RETURN count(*) AS linked",
            self.match_by_key("child", "child"),
            self.match_by_key("parent", "parent"),
        ))
        .param("child", child)
        .param("parent", parent)
        .returns("linked"))
    }

    /// Remove `child -[relationship]-> parent` if present.
    pub fn unlink(
        &self,
        relationship: &str,
        child: impl Into<Value>,
        parent: impl Into<Value>,
    ) -> Result<Statement, GraphError> {
        let rel = validate_identifier(relationship)?;
        Ok(Statement::new(format!(
            "MATCH {}-[r:{rel}]->{} DELETE r RETURN count(r) AS removed",
            self.match_by_key("child", "child"),
            self.match_by_key("parent", "parent"),
        ))
        .param("child", child)
        .param("parent", parent)
        .returns("removed"))
    }

    /// `MERGE` one node per key in a single statement.
    pub fn merge_keys(&self, keys: Vec<Value>) -> Statement {
        Statement::new(format!(
            "UNWIND $keys AS k MERGE (n:{} {{{}: k}}) RETURN count(n) AS merged",
            self.label, self.key
        ))
        .param("keys", keys)
        .returns("merged")
    }

    /// `MERGE` one edge per `{child, parent}` pair whose endpoints exist.
    pub fn merge_edges(
        &self,
        relationship: &str,
        pairs: Vec<(Value, Value)>,
    ) -> Result<Statement, GraphError> {
        let rel = validate_identifier(relationship)?;
        let pairs: Vec<Value> = pairs
            .into_iter()
            .map(|(child, parent)| serde_json::json!({ "child": child, "parent": parent }))
            .collect();
        Ok(Statement::new(format!(
            "UNWIND $pairs AS pair \
             MATCH (child:{label} {{{key}: pair.child}}) \
             MATCH (parent:{label} {{{key}: pair.parent}}) \
             MERGE (child)-[:{rel}]->(parent) RETURN count(*) AS merged",
            label = self.label,
            key = self.key,
        ))
        .param("pairs", pairs)
        .returns("merged"))
    }
}

fn bind_props(statement: Statement, props: &BTreeMap<String, Value>) -> Statement {
    props.iter().fold(statement, |s, (name, value)| {
        s.param(format!("p_{name}"), value.clone())
    })
}
