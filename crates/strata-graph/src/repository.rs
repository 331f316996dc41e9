//! Generic CRUD over one labelled entity kind.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use strata_core::EntitySchema;

use crate::client::GraphError;
use crate::query::{to_properties, Criteria, QueryBuilder, NODE_COLUMN};
use crate::session::{AccessMode, GraphSession, Record};

/// Maps entities of type `E` onto nodes described by an [`EntitySchema`].
///
/// `E` is any serde type whose serialized fields are all declared in the
/// schema. Every call runs as its own unit of work on the shared session.
pub struct Repository<E> {
    session: Arc<dyn GraphSession>,
    schema: EntitySchema,
    builder: QueryBuilder,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            schema: self.schema.clone(),
            builder: self.builder.clone(),
            entity: PhantomData,
        }
    }
}

impl<E> Repository<E>
where
    E: Serialize + DeserializeOwned,
{
    /// Fails with `InvalidIdentifier` if the label, key or any field name is
    /// not a plain identifier, and with `UnknownField` if the key is not a
    /// declared field.
    pub fn new(session: Arc<dyn GraphSession>, schema: EntitySchema) -> Result<Self, GraphError> {
        let builder = QueryBuilder::for_schema(&schema)?;
        if schema.field(&schema.key).is_none() {
            return Err(GraphError::UnknownField {
                label: schema.label.clone(),
                field: schema.key.clone(),
            });
        }
        Ok(Self {
            session,
            schema,
            builder,
            entity: PhantomData,
        })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn label(&self) -> &str {
        &self.schema.label
    }

    pub(crate) fn session(&self) -> &dyn GraphSession {
        self.session.as_ref()
    }

    pub(crate) fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Create a node from every declared attribute of `entity`.
    ///
    /// A duplicate natural key surfaces as `ConstraintViolation` once the
    /// store's uniqueness constraint is in place.
    pub async fn create(&self, entity: &E) -> Result<E, GraphError> {
        let supplied = self.checked(to_properties(entity)?)?;
        let key = match supplied.get(&self.schema.key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                return Err(GraphError::Serialization(format!(
                    "{} is missing its key `{}`",
                    self.schema.label, self.schema.key
                )))
            }
        };

        let props: BTreeMap<String, Value> = self
            .schema
            .field_names()
            .map(|name| {
                let value = supplied.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();

        let statement = self.builder.create(&props)?;
        let record = self
            .session
            .run(statement, AccessMode::Write)
            .await
            .map_err(|e| self.log_failure("create", &key, e))?
            .single()
            .await?;

        tracing::info!(label = %self.schema.label, key = %display_key(&key), "Created node");
        self.decode(&record)
    }

    /// Exact-match lookup by natural key.
    pub async fn get(&self, key: impl Into<Value>) -> Result<E, GraphError> {
        let key = key.into();
        let record = self
            .session
            .run(self.builder.get(key.clone()), AccessMode::Read)
            .await?
            .first()
            .await?;

        match record {
            Some(record) => self.decode(&record),
            None => Err(self.not_found(&key)),
        }
    }

    /// Nodes matching `criteria`, ordered by natural key, at most `limit`.
    ///
    /// An empty result is not an error.
    pub async fn find(&self, criteria: &Criteria, limit: usize) -> Result<Vec<E>, GraphError> {
        match criteria {
            Criteria::All => {}
            Criteria::Matching(filters) => {
                for (name, value) in filters {
                    self.check_field(name, value)?;
                }
            }
            Criteria::Contains { field, fragment } => {
                self.check_field(field, &Value::String(fragment.clone()))?;
            }
        }

        let statement = self.builder.find(criteria, limit)?;
        let mut stream = self.session.run(statement, AccessMode::Read).await?;
        let mut entities = Vec::new();
        while let Some(record) = stream.next().await? {
            entities.push(self.decode(&record)?);
        }

        tracing::debug!(label = %self.schema.label, count = entities.len(), "Find");
        Ok(entities)
    }

    /// Every node of the label, ordered by natural key, at most `limit`.
    pub async fn list(&self, limit: usize) -> Result<Vec<E>, GraphError> {
        self.find(&Criteria::All, limit).await
    }

    /// Write the fields present in `patch` onto the node with `key`.
    ///
    /// Fields absent from the serialized patch are left untouched; an
    /// explicit `null` removes the property.
    pub async fn update<P: Serialize>(
        &self,
        key: impl Into<Value>,
        patch: &P,
    ) -> Result<E, GraphError> {
        let key = key.into();
        let props = self.checked(to_properties(patch)?)?;
        if props.get(&self.schema.key).is_some_and(Value::is_null) {
            return Err(GraphError::Serialization(format!(
                "cannot remove key `{}` from {}",
                self.schema.key, self.schema.label
            )));
        }

        let statement = self.builder.update(key.clone(), &props)?;
        let record = self
            .session
            .run(statement, AccessMode::Write)
            .await
            .map_err(|e| self.log_failure("update", &key, e))?
            .first()
            .await?;

        match record {
            Some(record) => {
                tracing::info!(
                    label = %self.schema.label,
                    key = %display_key(&key),
                    fields = props.len(),
                    "Updated node"
                );
                self.decode(&record)
            }
            None => Err(self.not_found(&key)),
        }
    }

    /// Detach and remove the node with `key` and all its relationships.
    ///
    /// Returns whether a node existed. Deleting a missing key is not an
    /// error: afterwards no such node remains either way.
    pub async fn delete(&self, key: impl Into<Value>) -> Result<bool, GraphError> {
        let key = key.into();
        let record = self
            .session
            .run(self.builder.delete(key.clone()), AccessMode::Write)
            .await
            .map_err(|e| self.log_failure("delete", &key, e))?
            .first()
            .await?;

        let deleted = match record {
            Some(record) => record.get::<i64>("deleted")?,
            None => 0,
        };
        tracing::info!(label = %self.schema.label, key = %display_key(&key), deleted, "Deleted node");
        Ok(deleted > 0)
    }

    pub(crate) fn decode(&self, record: &Record) -> Result<E, GraphError> {
        let node = record.node(NODE_COLUMN)?;
        serde_json::from_value(Value::Object(node.properties.clone()))
            .map_err(|e| GraphError::Serialization(format!("{}: {e}", self.schema.label)))
    }

    pub(crate) fn not_found(&self, key: &Value) -> GraphError {
        GraphError::NotFound {
            label: self.schema.label.clone(),
            key: display_key(key),
        }
    }

    fn checked(
        &self,
        props: serde_json::Map<String, Value>,
    ) -> Result<BTreeMap<String, Value>, GraphError> {
        for (name, value) in &props {
            self.check_field(name, value)?;
        }
        Ok(props.into_iter().collect())
    }

    fn check_field(&self, name: &str, value: &Value) -> Result<(), GraphError> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| GraphError::UnknownField {
                label: self.schema.label.clone(),
                field: name.to_string(),
            })?;
        if !field.kind.accepts(value) {
            return Err(GraphError::Serialization(format!(
                "{}.{name} expects {:?}, got {value}",
                self.schema.label, field.kind
            )));
        }
        Ok(())
    }

    fn log_failure(&self, operation: &str, key: &Value, err: GraphError) -> GraphError {
        tracing::warn!(
            operation,
            label = %self.schema.label,
            key = %display_key(key),
            error = %err,
            "Graph write failed"
        );
        err
    }
}

pub(crate) fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
