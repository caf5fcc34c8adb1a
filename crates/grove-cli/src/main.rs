//! Grove CLI - builds and queries a knowledge graph of your projects
//!
//! `grove build` walks a projects folder and syncs it into a memory
//! server; `grove query` reads it back.

use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

use commands::{BuildOptions, QuerySelector};
use config::GroveConfig;

#[derive(Parser)]
#[command(name = "grove")]
#[command(author = "Grove Contributors")]
#[command(version)]
#[command(about = "Project knowledge graphs for MCP memory servers", long_about = None)]
struct Cli {
    /// Enable verbose output (debug logs, all observations)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./.grove/config.json, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config to ./.grove/config.json
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Index projects and sync them into the knowledge graph
    Build {
        /// Only index this project (default: all projects)
        #[arg(short, long)]
        project: Option<String>,

        /// Delete every entity in the graph before indexing
        #[arg(long)]
        reset: bool,

        /// Print batches instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Override the configured projects directory
        #[arg(long)]
        projects_dir: Option<PathBuf>,
    },

    /// Query the knowledge graph (summary by type when no selector is given)
    #[command(group(ArgGroup::new("selector").args(["search", "entity", "list_projects"])))]
    Query {
        /// Search for entities matching the query
        #[arg(short, long)]
        search: Option<String>,

        /// Show one entity by exact name
        #[arg(short, long)]
        entity: Option<String>,

        /// List the projects in the graph
        #[arg(long)]
        list_projects: bool,

        /// With no selector, also print every entity
        #[arg(long)]
        all: bool,
    },

    /// Call a tool on the memory server
    Tool {
        /// Tool name, e.g. read_graph
        name: String,

        /// Parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,
    },

    /// List the tools the memory server exposes
    Tools,

    /// Handshake with the memory server and show its info
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { path } = &cli.command {
        return commands::init(path);
    }

    let (config, source) = GroveConfig::load(cli.config.as_deref())?;
    match &source {
        Some(path) => tracing::debug!("Loaded config from {}", path.display()),
        None => tracing::debug!("Using default config"),
    }

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Build {
            project,
            reset,
            dry_run,
            projects_dir,
        } => {
            commands::build(
                &config,
                BuildOptions {
                    project,
                    reset,
                    dry_run,
                    projects_dir,
                },
            )
            .await
        }
        Commands::Query {
            search,
            entity,
            list_projects,
            all,
        } => {
            let selector = match (search, entity) {
                (Some(text), _) => QuerySelector::Search(text),
                (_, Some(name)) => QuerySelector::Entity(name),
                _ if list_projects => QuerySelector::ListProjects,
                _ => QuerySelector::Summary { all },
            };
            commands::query(&config, selector, cli.verbose).await
        }
        Commands::Tool { name, params } => commands::tool(&config, &name, params.as_deref()).await,
        Commands::Tools => commands::tools(&config).await,
        Commands::Check => commands::check(&config).await,
    }
}
