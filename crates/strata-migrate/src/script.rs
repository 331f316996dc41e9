//! Migration scripts: parsing, plus the source trait and its directory-backed
//! implementation.
//!
//! A script is a `<digits>_<name>.cypher` file whose version is the file
//! stem. Its body holds two sections introduced by the literal lines
//! `# --- !Ups` and `# --- !Downs`. Statements inside a section are separated
//! by `;`. Lines starting with `#` or `//` are comments.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use strata_graph::query::validate_identifier;

use crate::error::{MigrateError, Result};

pub const UPS_MARKER: &str = "# --- !Ups";
pub const DOWNS_MARKER: &str = "# --- !Downs";
pub const EXTENSION: &str = "cypher";

/// Body written by `create_migration`.
pub const TEMPLATE: &str = "\
# --- !Ups
# Add your UP migration Cypher here


# --- !Downs
# Add your DOWN migration Cypher here
";

fn file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+_.+)\.cypher$").expect("valid script file regex"))
}

/// Version of a script file, or `None` if the name does not follow
/// `<digits>_<name>.cypher`.
pub fn version_of(file_name: &str) -> Option<&str> {
    file_pattern()
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: String,
    pub ups: Vec<String>,
    pub downs: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Ups,
    Downs,
}

impl MigrationScript {
    pub fn parse(version: &str, content: &str) -> Result<Self> {
        let malformed = |reason: &str| MigrateError::MalformedScript {
            version: version.to_string(),
            reason: reason.to_string(),
        };

        let mut section = Section::Preamble;
        let mut ups = String::new();
        let mut downs = String::new();
        for line in content.lines() {
            match (line.trim(), section) {
                (UPS_MARKER, Section::Preamble) => section = Section::Ups,
                (UPS_MARKER, _) => {
                    return Err(malformed("`# --- !Ups` must appear exactly once, first"))
                }
                (DOWNS_MARKER, Section::Ups) => section = Section::Downs,
                (DOWNS_MARKER, Section::Preamble) => {
                    return Err(malformed("`# --- !Downs` appears before `# --- !Ups`"))
                }
                (DOWNS_MARKER, Section::Downs) => {
                    return Err(malformed("`# --- !Downs` appears twice"))
                }
                (text, Section::Preamble) => {
                    if !text.is_empty() && !is_comment(text) {
                        return Err(malformed("statements before `# --- !Ups`"));
                    }
                }
                (_, Section::Ups) => {
                    ups.push_str(line);
                    ups.push('\n');
                }
                (_, Section::Downs) => {
                    downs.push_str(line);
                    downs.push('\n');
                }
            }
        }

        match section {
            Section::Preamble => Err(malformed("missing `# --- !Ups`")),
            Section::Ups => Err(malformed("missing `# --- !Downs`")),
            Section::Downs => Ok(Self {
                version: version.to_string(),
                ups: split_statements(&ups),
                downs: split_statements(&downs),
            }),
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

/// Split a section into statements on `;` outside of quoted text.
pub fn split_statements(block: &str) -> Vec<String> {
    let code: Vec<&str> = block
        .lines()
        .filter(|line| !is_comment(line.trim_start()))
        .collect();
    let code = code.join("\n");

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in code.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                ';' => statements.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Write a fresh [`TEMPLATE`] script named `<YYYYmmddHHMMSS>_<name>` and
/// return its version. `name` must be a plain identifier.
pub fn scaffold(source: &dyn ScriptSource, name: &str) -> Result<String> {
    validate_identifier(name).map_err(|_| MigrateError::InvalidName {
        name: name.to_string(),
    })?;
    let version = format!("{}_{name}", Utc::now().format("%Y%m%d%H%M%S"));
    source.write(&version, TEMPLATE)?;
    tracing::info!(version = %version, "Created migration");
    Ok(version)
}

/// Where migration scripts live.
pub trait ScriptSource: Send + Sync {
    /// Make sure the source exists and can be written to.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// All script versions, sorted ascending.
    fn list(&self) -> Result<Vec<String>>;

    /// Raw content of one script. Fails with `MissingScript` if absent.
    fn read(&self, version: &str) -> Result<String>;

    /// Store a new script. Never overwrites an existing one.
    fn write(&self, version: &str, content: &str) -> Result<()>;
}

/// Scripts stored as files in a single directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, version: &str) -> PathBuf {
        self.dir.join(format!("{version}.{EXTENSION}"))
    }
}

impl ScriptSource for DirectorySource {
    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(version) = entry.file_name().to_str().and_then(version_of) {
                versions.push(version.to_string());
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn read(&self, version: &str) -> Result<String> {
        match fs::read_to_string(self.path(version)) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MigrateError::MissingScript {
                version: version.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, version: &str, content: &str) -> Result<()> {
        self.prepare()?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(version))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}
