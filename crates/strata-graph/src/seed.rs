//! Bootstrap a hierarchy from a CSV table.
//!
//! The header row names the key column (e.g. `name`) and, optionally, a
//! `parent_<key>` column. Every row becomes a node and every non-empty parent
//! cell becomes a `child -[relationship]-> parent` edge. Writes use `MERGE`,
//! so loading the same table twice changes nothing.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use strata_core::EntitySchema;

use crate::client::GraphError;
use crate::query::{validate_identifier, QueryBuilder};
use crate::session::{AccessMode, GraphSession};

/// One parsed data row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeedRow {
    pub key: String,
    pub parent: Option<String>,
}

/// What a load wrote (or confirmed already present).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub nodes: usize,
    pub edges: usize,
}

pub struct SeedLoader {
    session: Arc<dyn GraphSession>,
    builder: QueryBuilder,
    relationship: String,
}

impl SeedLoader {
    pub fn new(
        session: Arc<dyn GraphSession>,
        schema: &EntitySchema,
        relationship: &str,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            session,
            builder: QueryBuilder::for_schema(schema)?,
            relationship: validate_identifier(relationship)?.to_string(),
        })
    }

    fn parent_column(&self) -> String {
        format!("parent_{}", self.builder.key())
    }

    /// Parse CSV text into rows. Blank lines are skipped.
    pub fn parse(&self, input: &str) -> Result<Vec<SeedRow>, GraphError> {
        let mut lines = input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Ok(Vec::new());
        };
        let header = split_csv_line(header);
        let key_idx = column_index(&header, self.builder.key()).ok_or_else(|| {
            GraphError::Serialization(format!(
                "seed header has no `{}` column",
                self.builder.key()
            ))
        })?;
        let parent_idx = column_index(&header, &self.parent_column());

        let mut rows = Vec::new();
        for (number, line) in lines {
            let cells = split_csv_line(line);
            let key = cells
                .get(key_idx)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    GraphError::Serialization(format!("seed line {}: empty key", number + 1))
                })?;
            let parent = parent_idx
                .and_then(|idx| cells.get(idx))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            rows.push(SeedRow {
                key: key.to_string(),
                parent,
            });
        }
        Ok(rows)
    }

    /// Merge every row's node, then every parent edge, in one transaction.
    ///
    /// Edges whose parent has no row of its own are skipped by the store and
    /// left out of the report.
    pub async fn load(&self, input: &str) -> Result<SeedReport, GraphError> {
        let rows = self.parse(input)?;
        let keys: BTreeSet<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        let pairs: BTreeSet<(&str, &str)> = rows
            .iter()
            .filter_map(|r| r.parent.as_deref().map(|p| (r.key.as_str(), p)))
            .collect();

        if keys.is_empty() {
            return Ok(SeedReport::default());
        }

        let mut work = vec![self
            .builder
            .merge_keys(keys.iter().map(|k| Value::from(*k)).collect())];
        if !pairs.is_empty() {
            work.push(self.builder.merge_edges(
                &self.relationship,
                pairs
                    .iter()
                    .map(|(child, parent)| (Value::from(*child), Value::from(*parent)))
                    .collect(),
            )?);
        }
        let last = self
            .session
            .execute(work, AccessMode::Write)
            .await?
            .first()
            .await?;

        // The store only draws edges between rows it knows; count what it drew.
        let edges = match (&last, pairs.is_empty()) {
            (Some(record), false) => {
                usize::try_from(record.get::<Option<i64>>("merged")?.unwrap_or(0)).unwrap_or(0)
            }
            _ => 0,
        };
        if edges < pairs.len() {
            tracing::warn!(
                label = %self.builder.label(),
                skipped = pairs.len() - edges,
                "Skipped edges whose parent has no row"
            );
        }

        let report = SeedReport {
            nodes: keys.len(),
            edges,
        };
        tracing::info!(
            label = %self.builder.label(),
            nodes = report.nodes,
            edges = report.edges,
            "Seeded hierarchy"
        );
        Ok(report)
    }
}

fn column_index(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h.trim() == name)
}

/// Split one CSV line, honouring double-quoted cells with `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}
