//! CLI entry point for strata-migrate.
//!
//! Connection and script directory come from `strata.toml` and `STRATA__*`
//! environment variables; results go to stdout, logs to stderr as JSON.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use strata_core::{Category, Settings};
use strata_graph::{
    Criteria, Depth, Direction, GraphClient, GraphConfig, Hierarchy, Repository, SeedLoader,
    DEFAULT_LIMIT,
};
use strata_migrate::{scaffold, DirectorySource, MigrationRunner};

#[derive(Parser)]
#[command(name = "strata-migrate")]
#[command(about = "Versioned schema migrations for the Strata graph store")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: strata).
    #[arg(short, long, default_value = "strata", global = true)]
    config: String,

    /// Override the migration script directory.
    #[arg(long, global = true)]
    dir: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the version constraint and the script directory.
    Init,
    /// Scaffold a new, empty migration script.
    Create {
        /// Identifier appended to the timestamp, e.g. `create_categories`.
        name: String,
    },
    /// Apply pending migrations.
    Upgrade {
        /// Stop after this version (inclusive).
        #[arg(long)]
        target: Option<String>,
    },
    /// Revert every migration applied after the target.
    Downgrade {
        /// Version to keep as the newest applied one.
        #[arg(long)]
        target: String,
    },
    /// List migrations and whether each is applied.
    Status {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Load categories from a `name,parent_name` CSV file.
    Seed {
        /// Path to the CSV file.
        csv: String,
    },
    /// List categories, or the subcategories of one.
    Categories {
        /// Only list categories directly under this one.
        #[arg(long, conflicts_with = "name")]
        parent: Option<String>,
        /// Only list categories whose name contains this text.
        #[arg(long)]
        name: Option<String>,
        /// Include every descendant of `--parent`, not just direct children.
        #[arg(long, requires = "parent")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    let source = DirectorySource::new(cli.dir.unwrap_or_else(|| settings.migrations.dir.clone()));

    // Scaffolding never touches the store.
    if let Command::Create { name } = &cli.command {
        let version = scaffold(&source, name)?;
        println!("Created migration: {version}");
        return Ok(());
    }

    let graph = Arc::new(GraphClient::connect(&GraphConfig::from(&settings.neo4j)).await?);

    let outcome = run(cli.command, graph.clone(), source).await;

    match Arc::try_unwrap(graph) {
        Ok(client) => client.close().await,
        Err(_) => tracing::warn!("Graph client still shared at shutdown"),
    }
    outcome
}

async fn run(
    command: Command,
    graph: Arc<GraphClient>,
    source: DirectorySource,
) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            MigrationRunner::new(graph, source).initialize().await?;
            println!("Migration tracking initialized");
        }
        Command::Upgrade { target } => {
            let runner = MigrationRunner::new(graph, source);
            for version in runner.upgrade(target.as_deref()).await? {
                println!("Applied migration: {version}");
            }
        }
        Command::Downgrade { target } => {
            let runner = MigrationRunner::new(graph, source);
            for version in runner.downgrade(&target).await? {
                println!("Reverted migration: {version}");
            }
        }
        Command::Status { json } => {
            let report = MigrationRunner::new(graph, source).status().await?;
            if json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                for entry in report {
                    match entry.applied_at {
                        Some(at) => println!("[x] {}  {at}", entry.version),
                        None => println!("[ ] {}", entry.version),
                    }
                }
            }
        }
        Command::Seed { csv } => {
            let input = std::fs::read_to_string(&csv)?;
            let loader = SeedLoader::new(graph, &Category::schema(), Category::PARENT_EDGE)?;
            let report = loader.load(&input).await?;
            println!("Seeded {} nodes and {} edges", report.nodes, report.edges);
        }
        Command::Categories { parent, name, all } => {
            let repo: Repository<Category> = Repository::new(graph, Category::schema())?;
            let categories = match (parent, name) {
                (None, None) => repo.list(DEFAULT_LIMIT).await?,
                (None, Some(fragment)) => {
                    repo.find(&Criteria::contains("name", fragment), DEFAULT_LIMIT)
                        .await?
                }
                (Some(parent), _) => {
                    let depth = if all { Depth::Unbounded } else { Depth::One };
                    Hierarchy::new(repo, Category::PARENT_EDGE)?
                        .traverse(Direction::Children, parent, depth)
                        .await?
                }
            };
            for category in categories {
                println!("{}\t{}", category.name, category.friendly_name());
            }
        }
        // Handled before connecting.
        Command::Create { .. } => {}
    }
    Ok(())
}
