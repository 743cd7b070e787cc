//! sqlgraph CLI - Drive the graph engine against the sample schema

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sqlgraph::config::{CONFIG_FILE, SqlgraphConfig};
use sqlgraph::model::{Class, Object, Project, Resource, TASK_RESOURCE, Task};
use sqlgraph::storage::SqliteStore;
use sqlgraph::{GraphReader, GraphWriter, InsertMode, LinkManager, Repository};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlgraph")]
#[command(version = "0.0.1")]
#[command(about = "Descriptor-driven SQL persistence for nested object graphs")]
#[command(long_about = r#"
sqlgraph persists parents, their owned children and linked peers in one call,
and reads them back with a single join.

Example usage:
  sqlgraph init
  sqlgraph class add --name C1 --object O1 --object O2
  sqlgraph class show --id 1
  sqlgraph resource add --name Crane --kind machine --status available
  sqlgraph project add --name Bridge --manager Ana --task Survey
  sqlgraph link --task 1 --resource 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to sqlgraph.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Classes and their objects
    Class {
        #[command(subcommand)]
        action: ClassAction,
    },

    /// Standalone resources that tasks can link to
    Resource {
        #[command(subcommand)]
        action: ResourceAction,
    },

    /// Projects and their tasks
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Replace the resources linked to a task
    Link {
        /// Task id
        #[arg(short, long)]
        task: i64,

        /// Resource ids, in order; none clears the task's links
        #[arg(short, long)]
        resource: Vec<i64>,
    },

    /// Show row counts per table
    Stats,

    /// Delete every row from every table
    Clear,
}

#[derive(Subcommand)]
enum ClassAction {
    /// Insert a class together with its objects
    Add {
        #[arg(short, long)]
        name: String,

        /// Object names, one per owned object
        #[arg(short, long)]
        object: Vec<String>,
    },

    /// Print a class graph as JSON
    Show {
        #[arg(short, long)]
        id: i64,
    },

    /// Rename a class
    Rename {
        #[arg(short, long)]
        id: i64,

        #[arg(short, long)]
        name: String,
    },

    /// Delete a class; its objects and links cascade
    Delete {
        #[arg(short, long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum ResourceAction {
    /// Insert a resource
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        kind: String,

        #[arg(short, long)]
        status: String,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Insert a project together with its tasks
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        manager: String,

        /// Task names, one per owned task
        #[arg(short, long)]
        task: Vec<String>,
    },

    /// Print a project graph as JSON
    Show {
        #[arg(short, long)]
        id: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let settings = SqlgraphConfig::load(&config_path)?.unwrap_or_default();
    let database = settings.resolve_database(cli.database.as_deref(), Path::new("."));

    match cli.command {
        Commands::Init { force } => {
            let written = SqlgraphConfig {
                database: Some(database.display().to_string()),
                ..settings
            };
            written.save(&config_path, force)?;
            SqliteStore::open(&database)?;

            println!("✅ Wrote {}", config_path.display());
            println!("🗄️  Database: {}", database.display());
        }

        Commands::Class { action } => {
            let mut store = open_store(&database)?;
            match action {
                ClassAction::Add { name, object } => {
                    let mut class = Class::named(name);
                    class.objects = object.into_iter().map(|o| Object::named(o, 0.0)).collect();

                    let tx = store.connection_mut().transaction()?;
                    let written = GraphWriter::new(&tx).insert_graph(&class, InsertMode::Generated)?;
                    tx.commit()?;
                    println!("✅ Class {} with {} object(s)", written.root_id, written.child_ids.len());
                }
                ClassAction::Show { id } => {
                    let spec = Class::graph_spec(settings.join)?;
                    match GraphReader::new(store.connection()).read_graph::<Class>(&spec, id)? {
                        Some(class) => println!("{}", serde_json::to_string_pretty(&class)?),
                        None => println!("∅ No class {}", id),
                    }
                }
                ClassAction::Rename { id, name } => {
                    let repo = Repository::new(store.connection());
                    let Some(class) = repo.get::<Class>(id)? else {
                        anyhow::bail!("no class with id {}", id);
                    };
                    repo.update(&Class { name, ..class })?;
                    println!("✅ Renamed class {}", id);
                }
                ClassAction::Delete { id } => {
                    let removed = GraphWriter::new(store.connection()).delete_graph::<Class>(id)?;
                    if removed == 0 {
                        println!("∅ No class {}", id);
                    } else {
                        println!("🗑️  Deleted class {}", id);
                    }
                }
            }
        }

        Commands::Resource { action } => {
            let store = open_store(&database)?;
            match action {
                ResourceAction::Add { name, kind, status } => {
                    let resource = Resource {
                        name,
                        kind,
                        status,
                        acquisition_date: Some(Utc::now()),
                        ..Default::default()
                    };
                    let id = Repository::new(store.connection()).insert(&resource, InsertMode::Generated)?;
                    println!("✅ Resource {}", id);
                }
            }
        }

        Commands::Project { action } => {
            let mut store = open_store(&database)?;
            match action {
                ProjectAction::Add { name, manager, task } => {
                    let start = Utc::now();
                    let project = Project {
                        name,
                        manager,
                        start_date: start,
                        tasks: task
                            .into_iter()
                            .map(|t| Task {
                                name: t,
                                deadline: start + Duration::days(30),
                                status: "open".to_string(),
                                ..Default::default()
                            })
                            .collect(),
                        ..Default::default()
                    };

                    let tx = store.connection_mut().transaction()?;
                    let written = GraphWriter::new(&tx).insert_graph(&project, InsertMode::Generated)?;
                    tx.commit()?;
                    println!("✅ Project {} with task(s) {:?}", written.root_id, written.child_ids);
                }
                ProjectAction::Show { id } => {
                    let spec = Project::graph_spec(settings.join)?;
                    match GraphReader::new(store.connection()).read_graph::<Project>(&spec, id)? {
                        Some(project) => println!("{}", serde_json::to_string_pretty(&project)?),
                        None => println!("∅ No project {}", id),
                    }
                }
            }
        }

        Commands::Link { task, resource } => {
            let mut store = open_store(&database)?;
            let tx = store.connection_mut().transaction()?;
            let written = LinkManager::new(&tx).replace_links(&TASK_RESOURCE, task, &resource)?;
            tx.commit()?;
            println!("🔗 Task {} now uses {} resource(s)", task, written);
        }

        Commands::Stats => {
            let store = open_store(&database)?;
            let stats = store.stats()?;

            println!("📊 sqlgraph Statistics ({:?})", database);
            println!("------------------------------------");
            println!("{}", stats);
        }

        Commands::Clear => {
            let store = open_store(&database)?;
            store.clear_all()?;
            println!("🧹 Cleared {:?}", database);
        }
    }

    Ok(())
}

fn open_store(database: &Path) -> anyhow::Result<SqliteStore> {
    tracing::debug!("Opening {}", database.display());
    Ok(SqliteStore::open(database)?)
}
