//! Parent/child traversal over a directed relationship between nodes of one
//! label, e.g. `(child:Category)-[:SUBCATEGORY_OF]->(parent:Category)`.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::GraphError;
use crate::query::{validate_identifier, Depth, Direction, NODE_COLUMN};
use crate::repository::{display_key, Repository};
use crate::session::AccessMode;

/// A [`Repository`] plus the edge type that links children to parents.
pub struct Hierarchy<E> {
    repo: Repository<E>,
    relationship: String,
}

impl<E> Hierarchy<E>
where
    E: Serialize + DeserializeOwned,
{
    pub fn new(repo: Repository<E>, relationship: &str) -> Result<Self, GraphError> {
        let relationship = validate_identifier(relationship)?.to_string();
        Ok(Self { repo, relationship })
    }

    pub fn repository(&self) -> &Repository<E> {
        &self.repo
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    /// Nodes reachable from `key` in `direction`.
    ///
    /// [`Depth::One`] follows a single edge. Deeper walks yield each node at
    /// most once, even when it is reachable along several paths or through a
    /// cycle, and never yield the start node itself.
    pub async fn traverse(
        &self,
        direction: Direction,
        key: impl Into<Value>,
        depth: Depth,
    ) -> Result<Vec<E>, GraphError> {
        let key = key.into();
        let statement = self.repo.builder().traverse(
            &self.relationship,
            direction,
            key.clone(),
            depth,
        )?;

        let mut stream = self.repo.session().run(statement, AccessMode::Read).await?;
        let key_field = self.repo.schema().key.as_str();
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        while let Some(record) = stream.next().await? {
            let node = record.node(NODE_COLUMN)?;
            let node_key = node
                .properties
                .get(key_field)
                .map(display_key)
                .unwrap_or_default();
            if node_key == display_key(&key) || !seen.insert(node_key) {
                continue;
            }
            nodes.push(self.repo.decode(&record)?);
        }

        tracing::debug!(
            label = %self.repo.label(),
            key = %display_key(&key),
            ?direction,
            ?depth,
            count = nodes.len(),
            "Traversed hierarchy"
        );
        Ok(nodes)
    }

    /// Direct children of `key`.
    pub async fn children(&self, key: impl Into<Value>) -> Result<Vec<E>, GraphError> {
        self.traverse(Direction::Children, key, Depth::One).await
    }

    /// Direct parents of `key`.
    pub async fn parents(&self, key: impl Into<Value>) -> Result<Vec<E>, GraphError> {
        self.traverse(Direction::Parents, key, Depth::One).await
    }

    /// Connect `child` under `parent`. Linking twice leaves a single edge.
    ///
    /// Fails with `NotFound` if either node is missing.
    pub async fn link(
        &self,
        child: impl Into<Value>,
        parent: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let (child, parent) = (child.into(), parent.into());
        let statement = self.repo.builder().link(
            &self.relationship,
            child.clone(),
            parent.clone(),
        )?;
        let linked = match self
            .repo
            .session()
            .run(statement, AccessMode::Write)
            .await?
            .first()
            .await?
        {
            Some(record) => record.get::<i64>("linked")?,
            None => 0,
        };

        if linked == 0 {
            return Err(GraphError::NotFound {
                label: self.repo.label().to_string(),
                key: format!("{} or {}", display_key(&child), display_key(&parent)),
            });
        }
        tracing::info!(
            child = %display_key(&child),
            parent = %display_key(&parent),
            relationship = %self.relationship,
            "Linked nodes"
        );
        Ok(())
    }

    /// Remove the edge from `child` to `parent`; returns whether one existed.
    pub async fn unlink(
        &self,
        child: impl Into<Value>,
        parent: impl Into<Value>,
    ) -> Result<bool, GraphError> {
        let statement = self
            .repo
            .builder()
            .unlink(&self.relationship, child, parent)?;
        let removed = match self
            .repo
            .session()
            .run(statement, AccessMode::Write)
            .await?
            .first()
            .await?
        {
            Some(record) => record.get::<i64>("removed")?,
            None => 0,
        };
        Ok(removed > 0)
    }
}
