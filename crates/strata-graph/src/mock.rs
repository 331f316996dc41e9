//! Mock graph session for testing.
//!
//! Every statement is handed to a responder closure that decides which rows
//! come back (or which error is raised). Executed work is recorded together
//! with whether it committed or rolled back, so tests can assert on the
//! exact statements sent and on transaction boundaries.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::GraphError;
use crate::session::{AccessMode, GraphSession, Record, RecordStream, Statement};

type Responder = dyn Fn(&Statement) -> Result<Vec<Record>, GraphError> + Send + Sync;

/// How a recorded unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    RolledBack,
}

/// One `execute` call as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedWork {
    pub mode: AccessMode,
    /// Statements that reached the store, up to and including a failing one.
    pub statements: Vec<Statement>,
    pub outcome: Outcome,
}

/// Mock session driven by a responder closure.
pub struct MockSession {
    responder: Box<Responder>,
    log: Mutex<Vec<RecordedWork>>,
}

impl MockSession {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Statement) -> Result<Vec<Record>, GraphError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: Mutex::new(Vec::new()),
        }
    }

    /// A session that answers every statement with no rows.
    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedWork>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every unit of work executed so far.
    pub fn work(&self) -> Vec<RecordedWork> {
        self.log().clone()
    }

    /// Statements from committed work only, in execution order.
    pub fn committed(&self) -> Vec<Statement> {
        self.log()
            .iter()
            .filter(|w| w.outcome == Outcome::Committed)
            .flat_map(|w| w.statements.iter().cloned())
            .collect()
    }

    /// Number of units of work that rolled back.
    pub fn rollbacks(&self) -> usize {
        self.log()
            .iter()
            .filter(|w| w.outcome == Outcome::RolledBack)
            .count()
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::empty()
    }
}

#[async_trait]
impl GraphSession for MockSession {
    async fn execute(
        &self,
        work: Vec<Statement>,
        mode: AccessMode,
    ) -> Result<RecordStream, GraphError> {
        let mut seen = Vec::with_capacity(work.len());
        let mut records = Vec::new();
        for statement in work {
            let result = (self.responder)(&statement);
            seen.push(statement);
            match result {
                Ok(rows) => records = rows,
                Err(err) => {
                    self.log().push(RecordedWork {
                        mode,
                        statements: seen,
                        outcome: Outcome::RolledBack,
                    });
                    return Err(err);
                }
            }
        }
        self.log().push(RecordedWork {
            mode,
            statements: seen,
            outcome: Outcome::Committed,
        });
        Ok(RecordStream::buffered(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Field;

    #[tokio::test]
    async fn records_commits_and_rollbacks() {
        let session = MockSession::new(|stmt| {
            if stmt.text.contains("FAIL") {
                Err(GraphError::Rejected("boom".into()))
            } else {
                Ok(vec![Record::new().with("x", Field::Value(1.into()))])
            }
        });

        let rows = session
            .run(Statement::new("RETURN 1 AS x"), AccessMode::Read)
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = session
            .execute(
                vec![
                    Statement::new("CREATE (a)"),
                    Statement::new("FAIL"),
                    Statement::new("CREATE (b)"),
                ],
                AccessMode::Write,
            )
            .await;
        assert!(err.is_err());

        assert_eq!(session.rollbacks(), 1);
        assert_eq!(session.committed().len(), 1);
        let work = session.work();
        assert_eq!(work[1].statements.len(), 2);
        assert_eq!(work[1].mode, AccessMode::Write);
    }
}
