//! Applies and reverts migration scripts, recording each applied version as
//! a `Migration` node in the store itself.
//!
//! The applied versions always form a prefix of the sorted available
//! versions. Every operation checks that before it changes anything.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;

use strata_graph::{AccessMode, GraphError, GraphSession, Statement};

use crate::error::{MigrateError, Result};
use crate::script::{scaffold, MigrationScript, ScriptSource, EXTENSION};

const CREATE_CONSTRAINT: &str = "CREATE CONSTRAINT unique_migration_version IF NOT EXISTS \
     FOR (m:Migration) REQUIRE m.version IS UNIQUE";
const APPLIED: &str = "MATCH (m:Migration) \
     RETURN m.version AS version, m.applied_at AS applied_at ORDER BY version";
const RECORD: &str = "CREATE (m:Migration {version: $version, applied_at: $applied_at})";
const FORGET: &str = "MATCH (m:Migration) WHERE m.version IN [$version, $legacy] DELETE m";

/// One line of the status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub version: String,
    /// RFC 3339 timestamp, `None` while pending.
    pub applied_at: Option<String>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

pub struct MigrationRunner {
    session: Arc<dyn GraphSession>,
    source: Box<dyn ScriptSource>,
    lock: Mutex<()>,
}

impl MigrationRunner {
    pub fn new(session: Arc<dyn GraphSession>, source: impl ScriptSource + 'static) -> Self {
        Self {
            session,
            source: Box::new(source),
            lock: Mutex::new(()),
        }
    }

    /// Ensure the version constraint and the script source exist. Safe to
    /// call any number of times.
    pub async fn initialize(&self) -> Result<()> {
        self.source.prepare()?;
        self.session
            .run(Statement::new(CREATE_CONSTRAINT), AccessMode::Write)
            .await?;
        tracing::info!("Migration tracking initialized");
        Ok(())
    }

    /// Applied versions, ascending.
    pub async fn applied(&self) -> Result<Vec<String>> {
        Ok(self.history().await?.into_iter().map(|m| m.version).collect())
    }

    /// Versions with a script in the source, ascending.
    pub fn available(&self) -> Result<Vec<String>> {
        self.source.list()
    }

    /// Every known version with its applied timestamp, if any.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
        let mut report: BTreeMap<String, Option<String>> = self
            .available()?
            .into_iter()
            .map(|version| (version, None))
            .collect();
        for applied in self.history().await? {
            // Applied with an unknown timestamp still counts as applied.
            let at = applied.applied_at.unwrap_or_default();
            report.insert(applied.version, Some(at));
        }
        Ok(report
            .into_iter()
            .map(|(version, applied_at)| MigrationStatus { version, applied_at })
            .collect())
    }

    /// Apply pending scripts in ascending order, up to and including
    /// `target` when given. Returns the versions applied.
    ///
    /// Stops at the first failure. Versions applied before it stay applied.
    pub async fn upgrade(&self, target: Option<&str>) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;

        let applied = self.applied().await?;
        let available = self.available()?;
        check_history(&applied, &available)?;
        if let Some(target) = target {
            if !available.iter().any(|v| v == target) {
                return Err(MigrateError::UnknownTarget {
                    version: target.to_string(),
                });
            }
        }

        // Parse everything first so a malformed later script stops the run
        // before any earlier one is applied.
        let pending = available
            .get(applied.len()..)
            .unwrap_or_default()
            .iter()
            .filter(|v| target.map_or(true, |t| v.as_str() <= t))
            .map(|v| self.load(v))
            .collect::<Result<Vec<_>>>()?;

        let mut done = Vec::with_capacity(pending.len());
        for script in pending {
            self.apply(&script).await?;
            done.push(script.version);
        }
        if done.is_empty() {
            tracing::info!("No pending migrations");
        }
        Ok(done)
    }

    /// Revert every applied version after `target`, newest first. Returns
    /// the versions reverted.
    pub async fn downgrade(&self, target: &str) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;

        let applied = self.applied().await?;
        let available = self.available()?;
        check_history(&applied, &available)?;
        let Some(position) = applied.iter().position(|v| v == target) else {
            return Err(MigrateError::UnknownTarget {
                version: target.to_string(),
            });
        };

        let to_revert = applied[position + 1..]
            .iter()
            .rev()
            .map(|v| self.load(v))
            .collect::<Result<Vec<_>>>()?;

        let mut done = Vec::with_capacity(to_revert.len());
        for script in to_revert {
            self.revert(&script).await?;
            done.push(script.version);
        }
        Ok(done)
    }

    /// Scaffold a new script named `<YYYYmmddHHMMSS>_<name>` and return its
    /// version.
    pub fn create_migration(&self, name: &str) -> Result<String> {
        scaffold(self.source.as_ref(), name)
    }

    /// Recorded versions, ascending. Records written with the file name
    /// (`<version>.cypher`) are read as the bare version.
    async fn history(&self) -> Result<Vec<MigrationStatus>> {
        let statement = Statement::new(APPLIED).returns("version").returns("applied_at");
        let mut rows = self.session.run(statement, AccessMode::Read).await?;
        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            let version: String = row.get("version")?;
            history.push(MigrationStatus {
                version: bare_version(&version).to_string(),
                applied_at: row.get("applied_at")?,
            });
        }
        history.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(history)
    }

    fn load(&self, version: &str) -> Result<MigrationScript> {
        MigrationScript::parse(version, &self.source.read(version)?)
    }

    async fn apply(&self, script: &MigrationScript) -> Result<()> {
        let record = Statement::new(RECORD)
            .param("version", script.version.as_str())
            .param(
                "applied_at",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        self.run_script(&script.ups, record)
            .await
            .map_err(|source| {
                tracing::error!(version = %script.version, error = %source, "Migration failed");
                MigrateError::ApplyFailure {
                    version: script.version.clone(),
                    source,
                }
            })?;
        tracing::info!(version = %script.version, "Applied migration");
        Ok(())
    }

    async fn revert(&self, script: &MigrationScript) -> Result<()> {
        let forget = Statement::new(FORGET)
            .param("version", script.version.as_str())
            .param("legacy", format!("{}.{EXTENSION}", script.version));
        self.run_script(&script.downs, forget)
            .await
            .map_err(|source| {
                tracing::error!(version = %script.version, error = %source, "Revert failed");
                MigrateError::RevertFailure {
                    version: script.version.clone(),
                    source,
                }
            })?;
        tracing::info!(version = %script.version, "Reverted migration");
        Ok(())
    }

    /// Run a section followed by its bookkeeping statement.
    ///
    /// The store refuses schema and data changes in one transaction, so
    /// schema statements commit first on their own. The data statements and
    /// `bookkeeping` then commit together, which keeps the `Migration` node
    /// in step with the data.
    async fn run_script(
        &self,
        statements: &[String],
        bookkeeping: Statement,
    ) -> std::result::Result<(), GraphError> {
        let (schema, data): (Vec<&String>, Vec<&String>) =
            statements.iter().partition(|s| is_schema_change(s));

        if !schema.is_empty() {
            let work = schema.into_iter().map(Statement::new).collect();
            self.session.execute(work, AccessMode::Write).await?;
        }

        let mut work: Vec<Statement> = data.into_iter().map(Statement::new).collect();
        work.push(bookkeeping);
        self.session.execute(work, AccessMode::Write).await?;
        Ok(())
    }
}

fn schema_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(CREATE|DROP)\s+((RANGE|TEXT|POINT|LOOKUP|FULLTEXT|VECTOR)\s+)?(CONSTRAINT|INDEX)\b",
        )
        .expect("valid schema statement regex")
    })
}

fn is_schema_change(statement: &str) -> bool {
    schema_pattern().is_match(statement)
}

fn bare_version(recorded: &str) -> &str {
    recorded
        .strip_suffix(EXTENSION)
        .and_then(|stem| stem.strip_suffix('.'))
        .unwrap_or(recorded)
}

/// Applied must equal the first `applied.len()` available versions, each
/// recorded once. `applied` is sorted.
fn check_history(applied: &[String], available: &[String]) -> Result<()> {
    if let Some(pair) = applied.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(MigrateError::DuplicateRecord {
            version: pair[0].clone(),
        });
    }
    if let Some(missing) = applied.iter().find(|v| !available.contains(*v)) {
        return Err(MigrateError::MissingScript {
            version: missing.clone(),
        });
    }
    for (applied, expected) in applied.iter().zip(available) {
        if applied != expected {
            return Err(MigrateError::OutOfOrder {
                version: expected.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use serde_json::json;
    use strata_graph::mock::MockSession;
    use strata_graph::{Field, Record};
    use tempfile::TempDir;

    use super::*;
    use crate::script::DirectorySource;

    const V1: &str = "20240101000000_category_constraint";
    const V2: &str = "20240102000000_seed_dairy";
    const V3: &str = "20240103000000_seed_meat";

    /// Migration nodes plus the names of seeded categories.
    #[derive(Default)]
    struct Store {
        migrations: BTreeMap<String, String>,
        categories: Vec<String>,
        constraint: bool,
    }

    type Shared = Arc<StdMutex<Store>>;

    fn respond(store: &Shared, stmt: &Statement) -> std::result::Result<Vec<Record>, GraphError> {
        let mut store = store.lock().unwrap();
        let text = stmt.text.as_str();
        let version = || stmt.params["version"].as_str().unwrap().to_string();

        if text.contains("FAIL") {
            return Err(GraphError::Rejected("Invalid input 'FAIL'".into()));
        }
        if text == APPLIED {
            return Ok(store
                .migrations
                .iter()
                .map(|(v, at)| {
                    Record::new()
                        .with("version", Field::Value(json!(v)))
                        .with("applied_at", Field::Value(json!(at)))
                })
                .collect());
        }
        if text == RECORD {
            let at = stmt.params["applied_at"].as_str().unwrap().to_string();
            store.migrations.insert(version(), at);
        } else if text == FORGET {
            store.migrations.remove(&version());
            store.migrations.remove(stmt.params["legacy"].as_str().unwrap());
        } else if text.starts_with("CREATE CONSTRAINT category_name") {
            store.constraint = true;
        } else if text.starts_with("DROP CONSTRAINT category_name") {
            store.constraint = false;
        } else if let Some(rest) = text.strip_prefix("CREATE (:Category {name: '") {
            store.categories.push(rest.split('\'').next().unwrap().to_string());
        } else if let Some(rest) = text.strip_prefix("MATCH (c:Category {name: '") {
            let name = rest.split('\'').next().unwrap();
            store.categories.retain(|c| c != name);
        }
        Ok(Vec::new())
    }

    fn seed(name: &str) -> String {
        format!(
            "# --- !Ups\nCREATE (:Category {{name: '{name}'}});\n\
             # --- !Downs\nMATCH (c:Category {{name: '{name}'}}) DETACH DELETE c;\n"
        )
    }

    fn constraint() -> String {
        "# --- !Ups\n\
         CREATE CONSTRAINT category_name IF NOT EXISTS FOR (c:Category) REQUIRE c.name IS UNIQUE;\n\
         # --- !Downs\n\
         DROP CONSTRAINT category_name IF EXISTS;\n"
            .to_string()
    }

    struct Harness {
        runner: MigrationRunner,
        session: Arc<MockSession>,
        store: Shared,
        dir: TempDir,
    }

    fn harness(scripts: &[(&str, String)]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        for (version, content) in scripts {
            source.write(version, content).unwrap();
        }
        let store: Shared = Arc::default();
        let responder_store = store.clone();
        let session = Arc::new(MockSession::new(move |stmt| respond(&responder_store, stmt)));
        Harness {
            runner: MigrationRunner::new(session.clone(), source),
            session,
            store,
            dir,
        }
    }

    fn standard() -> Harness {
        harness(&[(V1, constraint()), (V2, seed("dairy")), (V3, seed("meat"))])
    }

    fn writes(session: &MockSession) -> usize {
        session
            .work()
            .iter()
            .filter(|w| w.mode == AccessMode::Write)
            .count()
    }

    #[tokio::test]
    async fn upgrade_applies_every_pending_script_in_order() {
        let h = standard();
        let applied = h.runner.upgrade(None).await.unwrap();
        assert_eq!(applied, vec![V1, V2, V3]);
        assert_eq!(h.runner.applied().await.unwrap(), h.runner.available().unwrap());

        let store = h.store.lock().unwrap();
        assert!(store.constraint);
        assert_eq!(store.categories, vec!["dairy", "meat"]);
    }

    #[tokio::test]
    async fn schema_statements_commit_before_data_and_record() {
        let h = standard();
        h.runner.upgrade(Some(V1)).await.unwrap();

        let work = h.session.work();
        let writes: Vec<_> = work.iter().filter(|w| w.mode == AccessMode::Write).collect();
        assert_eq!(writes.len(), 2);
        assert!(writes[0].statements[0].text.starts_with("CREATE CONSTRAINT"));
        assert_eq!(writes[1].statements.len(), 1);
        assert_eq!(writes[1].statements[0].text, RECORD);
    }

    #[tokio::test]
    async fn data_statements_share_a_transaction_with_the_record() {
        let h = harness(&[(V2, seed("dairy"))]);
        h.runner.upgrade(None).await.unwrap();

        let work = h.session.work();
        let write = work.iter().find(|w| w.mode == AccessMode::Write).unwrap();
        assert_eq!(write.statements.len(), 2);
        assert!(write.statements[0].text.starts_with("CREATE (:Category"));
        assert_eq!(write.statements[1].text, RECORD);
    }

    #[tokio::test]
    async fn upgrade_then_downgrade_keeps_the_target() {
        let h = harness(&[(V1, constraint()), (V2, seed("dairy"))]);
        h.runner.upgrade(None).await.unwrap();
        {
            let store = h.store.lock().unwrap();
            assert!(store.constraint);
            assert_eq!(store.categories, vec!["dairy"]);
        }

        let reverted = h.runner.downgrade(V1).await.unwrap();
        assert_eq!(reverted, vec![V2]);
        assert_eq!(h.runner.applied().await.unwrap(), vec![V1]);

        let store = h.store.lock().unwrap();
        assert!(store.constraint);
        assert!(store.categories.is_empty());
    }

    #[tokio::test]
    async fn upgrade_to_target_is_inclusive_and_repeatable() {
        let h = standard();
        assert_eq!(h.runner.upgrade(Some(V2)).await.unwrap(), vec![V1, V2]);
        assert_eq!(h.runner.applied().await.unwrap(), vec![V1, V2]);

        // Already-applied target: nothing to do.
        assert!(h.runner.upgrade(Some(V1)).await.unwrap().is_empty());
        assert_eq!(h.runner.upgrade(None).await.unwrap(), vec![V3]);
    }

    #[tokio::test]
    async fn unknown_target_applies_nothing() {
        let h = standard();
        let err = h.runner.upgrade(Some("nonexistent")).await.unwrap_err();
        assert!(matches!(err, MigrateError::UnknownTarget { ref version } if version == "nonexistent"));
        assert!(err.is_client_error());
        assert_eq!(writes(&h.session), 0);
        assert!(h.runner.applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_rolls_back_and_stops() {
        let h = harness(&[
            (V1, seed("dairy")),
            (V2, "# --- !Ups\nCREATE (:Category {name: 'x'});\nFAIL;\n# --- !Downs\n".to_string()),
            (V3, seed("meat")),
        ]);

        let err = h.runner.upgrade(None).await.unwrap_err();
        match err {
            MigrateError::ApplyFailure { version, source } => {
                assert_eq!(version, V2);
                assert!(matches!(source, GraphError::Rejected(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(h.runner.applied().await.unwrap(), vec![V1]);
        assert_eq!(h.session.rollbacks(), 1);
        assert!(!h.session.committed().iter().any(|s| s.text.contains("meat")));
    }

    #[tokio::test]
    async fn malformed_pending_script_stops_before_any_change() {
        let h = harness(&[(V1, seed("dairy")), (V2, "CREATE (n)".to_string())]);
        let err = h.runner.upgrade(None).await.unwrap_err();
        assert!(matches!(err, MigrateError::MalformedScript { ref version, .. } if version == V2));
        assert_eq!(writes(&h.session), 0);
    }

    #[tokio::test]
    async fn downgrade_reverts_newest_first() {
        let h = standard();
        h.runner.upgrade(None).await.unwrap();

        assert_eq!(h.runner.downgrade(V1).await.unwrap(), vec![V3, V2]);
        let forgotten: Vec<String> = h
            .session
            .committed()
            .iter()
            .filter(|s| s.text == FORGET)
            .map(|s| s.params["version"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(forgotten, vec![V3, V2]);
    }

    #[tokio::test]
    async fn downgrade_target_must_be_applied() {
        let h = standard();
        h.runner.upgrade(Some(V1)).await.unwrap();
        assert!(matches!(
            h.runner.downgrade(V3).await,
            Err(MigrateError::UnknownTarget { .. })
        ));
        assert!(h.runner.downgrade(V1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn revert_failure_stops() {
        let h = harness(&[
            (V1, seed("dairy")),
            (V2, "# --- !Ups\n# --- !Downs\nFAIL;\n".to_string()),
            (V3, seed("meat")),
        ]);
        h.runner.upgrade(None).await.unwrap();

        let err = h.runner.downgrade(V1).await.unwrap_err();
        assert!(matches!(err, MigrateError::RevertFailure { ref version, .. } if version == V2));
        assert_eq!(h.runner.applied().await.unwrap(), vec![V1, V2]);
    }

    #[tokio::test]
    async fn broken_history_is_refused() {
        let h = standard();
        h.store
            .lock()
            .unwrap()
            .migrations
            .insert(V2.to_string(), "2024-01-02T00:00:00Z".to_string());
        assert!(matches!(
            h.runner.upgrade(None).await,
            Err(MigrateError::OutOfOrder { ref version }) if version == V1
        ));

        h.store
            .lock()
            .unwrap()
            .migrations
            .insert("20231231000000_deleted".to_string(), String::new());
        assert!(matches!(
            h.runner.downgrade(V2).await,
            Err(MigrateError::MissingScript { ref version }) if version == "20231231000000_deleted"
        ));
        assert_eq!(writes(&h.session), 0);
    }

    #[tokio::test]
    async fn duplicate_records_are_refused_without_panicking() {
        let h = standard();
        {
            let mut store = h.store.lock().unwrap();
            store.migrations.insert(V1.to_string(), "2024-01-01T00:00:00Z".to_string());
            store.migrations.insert(format!("{V1}.cypher"), String::new());
        }
        assert!(matches!(
            h.runner.upgrade(None).await,
            Err(MigrateError::DuplicateRecord { ref version }) if version == V1
        ));
        assert!(matches!(
            h.runner.downgrade(V1).await,
            Err(MigrateError::DuplicateRecord { .. })
        ));
        assert_eq!(writes(&h.session), 0);
    }

    #[test]
    fn history_longer_than_scripts_is_an_error() {
        let one = vec![V1.to_string()];
        let twice = vec![V1.to_string(), V1.to_string()];
        assert!(matches!(
            check_history(&twice, &one),
            Err(MigrateError::DuplicateRecord { .. })
        ));
        assert!(check_history(&one, &one).is_ok());
    }

    #[tokio::test]
    async fn file_name_records_count_as_applied() {
        let h = standard();
        {
            let mut store = h.store.lock().unwrap();
            store.migrations.insert(V1.to_string(), "2024-01-01T00:00:00Z".to_string());
            store.migrations.insert(format!("{V2}.cypher"), "2023-06-01T00:00:00Z".to_string());
        }

        assert_eq!(h.runner.applied().await.unwrap(), vec![V1, V2]);
        assert_eq!(h.runner.upgrade(None).await.unwrap(), vec![V3]);

        assert_eq!(h.runner.downgrade(V1).await.unwrap(), vec![V3, V2]);
        let store = h.store.lock().unwrap();
        assert_eq!(store.migrations.keys().collect::<Vec<_>>(), vec![V1]);
    }

    /// Lets other tasks run before every call reaches the store.
    struct Yielding(Arc<MockSession>);

    #[async_trait::async_trait]
    impl GraphSession for Yielding {
        async fn execute(
            &self,
            work: Vec<Statement>,
            mode: AccessMode,
        ) -> std::result::Result<strata_graph::RecordStream, GraphError> {
            tokio::task::yield_now().await;
            self.0.execute(work, mode).await
        }
    }

    #[tokio::test]
    async fn concurrent_upgrades_apply_each_version_once() {
        let h = standard();
        let runner = MigrationRunner::new(
            Arc::new(Yielding(h.session.clone())),
            DirectorySource::new(h.dir.path()),
        );

        let (first, second) = tokio::join!(runner.upgrade(None), runner.upgrade(None));
        let (first, second) = (first.unwrap(), second.unwrap());

        let mut sizes = [first.len(), second.len()];
        sizes.sort_unstable();
        assert_eq!(sizes, [0, 3]);
        assert_eq!(first.iter().chain(&second).collect::<Vec<_>>(), vec![V1, V2, V3]);

        let recorded: Vec<String> = h
            .session
            .committed()
            .iter()
            .filter(|s| s.text == RECORD)
            .map(|s| s.params["version"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(recorded, vec![V1, V2, V3]);
        assert_eq!(h.store.lock().unwrap().categories, vec!["dairy", "meat"]);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("migrations");
        let session = Arc::new(MockSession::empty());
        let runner = MigrationRunner::new(session.clone(), DirectorySource::new(&scripts));

        runner.initialize().await.unwrap();
        runner.initialize().await.unwrap();

        assert!(scripts.is_dir());
        let committed = session.committed();
        assert_eq!(committed.len(), 2);
        assert!(committed.iter().all(|s| s.text == CREATE_CONSTRAINT));
        assert!(CREATE_CONSTRAINT.contains("IF NOT EXISTS"));
    }

    #[tokio::test]
    async fn status_marks_applied_versions() {
        let h = standard();
        h.runner.upgrade(Some(V1)).await.unwrap();

        let status = h.runner.status().await.unwrap();
        assert_eq!(status.len(), 3);
        assert!(status[0].is_applied());
        assert!(status[0]
            .applied_at
            .as_deref()
            .is_some_and(|at| chrono::DateTime::parse_from_rfc3339(at).is_ok()));
        assert!(!status[1].is_applied());
        assert!(!status[2].is_applied());
    }

    #[test]
    fn create_migration_scaffolds_a_parsable_script() {
        let h = harness(&[]);
        let version = h.runner.create_migration("create_categories").unwrap();

        assert!(version.ends_with("_create_categories"));
        assert_eq!(version.find('_'), Some(14));
        assert_eq!(h.runner.available().unwrap(), vec![version.clone()]);

        let path = h.dir.path().join(format!("{version}.cypher"));
        let content = std::fs::read_to_string(path).unwrap();
        let script = MigrationScript::parse(&version, &content).unwrap();
        assert!(script.ups.is_empty() && script.downs.is_empty());
    }

    #[test]
    fn create_migration_rejects_unsafe_names() {
        let h = harness(&[]);
        for name in ["", "../escape", "two words", "9lives"] {
            assert!(matches!(
                h.runner.create_migration(name),
                Err(MigrateError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn recognises_schema_statements() {
        assert!(is_schema_change("CREATE CONSTRAINT x IF NOT EXISTS FOR (n:A) REQUIRE n.k IS UNIQUE"));
        assert!(is_schema_change("drop index x if exists"));
        assert!(is_schema_change("CREATE FULLTEXT INDEX names FOR (n:A) ON EACH [n.name]"));
        assert!(!is_schema_change("CREATE (:Index {name: 'x'})"));
        assert!(!is_schema_change("MATCH (n) DETACH DELETE n"));
    }
}
