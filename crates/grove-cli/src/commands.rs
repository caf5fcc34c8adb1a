//! CLI command implementations.

use crate::config::{GroveConfig, TransportConfig, TransportMode, CONFIG_DIR, CONFIG_FILE};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use grove_graph::{
    render_entity, render_summary, render_unresolved, BatchSynchronizer, GraphQuery,
    KnowledgeGraph,
};
use grove_mcp::{
    discover_container, DryRunInvoker, McpClient, SpawnTransport, StdioTransport, ToolInvoker,
    Transport,
};
use grove_walker::{discover_projects, find_project, index_project, project_name};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Writes a default config to `<path>/.grove/config.json`.
pub fn init(path: &Path) -> Result<()> {
    let grove_dir = path.join(CONFIG_DIR);
    let config_path = grove_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(&grove_dir)
        .with_context(|| format!("failed to create {}", grove_dir.display()))?;
    fs::write(&config_path, GroveConfig::default().to_json()?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("{} Initialized Grove in {}", "✓".green(), path.display());
    println!("  Edit {} to point at your projects", config_path.display());
    println!("  Run {} to build the graph", "grove build".cyan());

    Ok(())
}

/// Resolves the process that serves the store.
async fn launch_command(transport: &TransportConfig) -> Result<(String, Vec<String>)> {
    if !transport.uses_container() {
        let (program, args) = transport
            .server_command
            .split_first()
            .ok_or_else(|| anyhow!("transport.server_command is empty"))?;
        return Ok((program.clone(), args.to_vec()));
    }

    let container = match &transport.container {
        Some(container) => container.clone(),
        None => {
            let id = discover_container(&transport.runtime, &transport.image)
                .await
                .context("is the memory server container running?")?;
            info!("Found memory container: {}", id);
            id
        }
    };

    let mut args = vec!["exec".to_string(), "-i".to_string(), container];
    args.extend(transport.server_command.iter().cloned());
    Ok((transport.runtime.clone(), args))
}

async fn connect(transport: &TransportConfig) -> Result<McpClient> {
    let (program, args) = launch_command(transport).await?;
    let timeout = transport.timeout();

    let channel: Box<dyn Transport> = match transport.mode {
        TransportMode::Spawn => Box::new(SpawnTransport::new(program, args).with_timeout(timeout)),
        TransportMode::Stdio => Box::new(StdioTransport::spawn(&program, &args)?.with_timeout(timeout)),
    };

    let client = McpClient::new(channel, transport.wire_shape());
    info!("Connected via {}", client.describe());
    Ok(client)
}

fn spinner(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub struct BuildOptions {
    pub project: Option<String>,
    pub reset: bool,
    pub dry_run: bool,
    pub projects_dir: Option<PathBuf>,
}

/// Walks the selected projects and syncs each into the store.
pub async fn build(config: &GroveConfig, opts: BuildOptions) -> Result<()> {
    let projects_dir = opts
        .projects_dir
        .unwrap_or_else(|| config.projects_dir.clone());

    // Resolve targets before any destructive reset.
    let projects = match &opts.project {
        Some(name) => vec![find_project(&projects_dir, name)
            .with_context(|| format!("project not found: {}", name))?],
        None => discover_projects(&projects_dir, &config.policy)?,
    };

    let invoker: Box<dyn ToolInvoker> = if opts.dry_run {
        println!(
            "{}",
            "Dry run: batches are logged, nothing is sent to the store".yellow()
        );
        Box::new(DryRunInvoker)
    } else {
        Box::new(connect(&config.transport).await?)
    };
    let sync = BatchSynchronizer::new(invoker.as_ref(), config.batch_size);
    info!("Submitting in batches of {}", sync.batch_size());

    if opts.reset {
        println!("{}", "Resetting knowledge graph...".cyan());
        let deleted = sync.reset().await?;
        println!("{} Reset complete ({} entities deleted)", "✓".green(), deleted);
    }

    if projects.is_empty() {
        println!("No projects found in {}", projects_dir.display());
        return Ok(());
    }

    for path in &projects {
        let name = project_name(path);
        let spinner = spinner(opts.dry_run)?;
        spinner.set_message(format!("Indexing {}...", name));

        let result = index_project(path, &config.policy)?;

        spinner.set_message(format!(
            "Syncing {} ({} entities)...",
            name,
            result.batch.entities.len()
        ));
        let report = sync
            .sync(&result.batch)
            .await
            .with_context(|| format!("failed to sync {}", name))?;
        spinner.finish_and_clear();

        println!(
            "{} {}: {} entities, {} relations ({} files, {} directories) in {}ms",
            "✓".green(),
            name.cyan(),
            report.entities.to_string().cyan(),
            report.relations.to_string().cyan(),
            result.files_indexed,
            result.dirs_indexed,
            result.duration_ms
        );

        if !result.errors.is_empty() {
            println!("  {} {} paths could not be read:", "⚠".yellow(), result.errors.len());
            for (path, error) in result.errors.iter().take(5) {
                println!("    {} - {}", path.red(), error);
            }
            if result.errors.len() > 5 {
                println!("    ... and {} more", result.errors.len() - 5);
            }
        }
    }

    println!("{} Indexing complete", "✓".green());
    Ok(())
}

pub enum QuerySelector {
    Search(String),
    Entity(String),
    ListProjects,
    Summary { all: bool },
}

/// Reads from the store and prints the result.
pub async fn query(config: &GroveConfig, selector: QuerySelector, verbose: bool) -> Result<()> {
    let client = connect(&config.transport).await?;
    let query = GraphQuery::new(&client);

    match selector {
        QuerySelector::ListProjects => {
            let projects = query.list_projects().await?;
            if projects.is_empty() {
                println!("No projects found in the knowledge graph");
            } else {
                println!("{}", "Projects in the knowledge graph:".cyan());
                for project in projects {
                    println!("- {}", project.name);
                }
            }
        }

        QuerySelector::Search(text) => {
            let view = query.search(&text).await?;
            if view.is_empty() {
                println!("No entities found matching '{}'", text);
                return Ok(());
            }
            println!(
                "{}",
                format!("Found {} entities matching '{}':", view.entities.len(), text).cyan()
            );
            for entity in &view.entities {
                let relations: Vec<_> = view.relations_of(&entity.name).cloned().collect();
                println!("{}", render_entity(entity, &relations, verbose));
            }
        }

        QuerySelector::Entity(name) => {
            let graph = KnowledgeGraph::from_view(query.open(std::slice::from_ref(&name)).await?);
            let Some(entity) = graph.get(&name).or_else(|| graph.entities().next()) else {
                println!("Entity not found: {}", name);
                return Ok(());
            };
            println!("{}", format!("Details for entity '{}':", name).cyan());
            let relations = graph.relations_of(&entity.name);
            println!("{}", render_entity(entity, &relations, verbose));
        }

        QuerySelector::Summary { all } => {
            let graph = KnowledgeGraph::from_view(query.read_all().await?);
            print!("{}", render_summary(&graph));
            if all {
                println!();
                for entity in graph.entities() {
                    let relations = graph.relations_of(&entity.name);
                    println!("{}", render_entity(entity, &relations, verbose));
                }
                let unresolved = render_unresolved(graph.unresolved());
                if !unresolved.is_empty() {
                    print!("{}", unresolved.yellow());
                }
            }
        }
    }

    Ok(())
}

/// Calls a single tool with raw JSON parameters.
pub async fn tool(config: &GroveConfig, name: &str, params: Option<&str>) -> Result<()> {
    let params: Value = match params {
        Some(text) => serde_json::from_str(text).context("--params must be a JSON object")?,
        None => Value::Object(Default::default()),
    };
    if !params.is_object() {
        return Err(anyhow!("--params must be a JSON object"));
    }

    let client = connect(&config.transport).await?;
    let result = client
        .call_tool(name, params)
        .await
        .with_context(|| format!("{} failed", name))?;
    print_json(&result)
}

/// Lists the tools the server exposes.
pub async fn tools(config: &GroveConfig) -> Result<()> {
    let client = connect(&config.transport).await?;
    let tools = client.list_tools().await.context("listTools failed")?;
    print_json(&tools)
}

/// Handshake and server info, for checking the connection.
pub async fn check(config: &GroveConfig) -> Result<()> {
    let client = connect(&config.transport).await?;
    println!("{} Transport: {}", "→".cyan(), client.describe());

    let handshake = client.handshake().await.context("handshake failed")?;
    println!("{} Handshake", "✓".green());
    print_json(&handshake)?;

    let info = client
        .server_info()
        .await
        .context("server_info_request failed")?;
    println!("{} Server info", "✓".green());
    print_json(&info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempdir().unwrap();
        init(dir.path()).unwrap();

        let path = dir.path().join(CONFIG_DIR).join(CONFIG_FILE);
        let config = GroveConfig::read(&path).unwrap();
        assert_eq!(config, GroveConfig::default());

        // Second run leaves the file alone.
        fs::write(&path, r#"{"batch_size": 4}"#).unwrap();
        init(dir.path()).unwrap();
        assert_eq!(GroveConfig::read(&path).unwrap().batch_size, 4);
    }

    #[tokio::test]
    async fn test_launch_command_with_container() {
        let transport = TransportConfig {
            container: Some("abc123".into()),
            ..Default::default()
        };
        let (program, args) = launch_command(&transport).await.unwrap();

        assert_eq!(program, "docker");
        assert_eq!(args, vec!["exec", "-i", "abc123", "node", "dist/index.js"]);
    }

    #[tokio::test]
    async fn test_launch_command_without_runtime() {
        let transport = TransportConfig {
            runtime: String::new(),
            server_command: vec!["memory-server".into(), "--stdio".into()],
            ..Default::default()
        };
        let (program, args) = launch_command(&transport).await.unwrap();

        assert_eq!(program, "memory-server");
        assert_eq!(args, vec!["--stdio"]);
    }

    #[tokio::test]
    async fn test_dry_run_build() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("demo-dir");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("README.md"), "# Demo\n").unwrap();

        let config = GroveConfig {
            projects_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let opts = BuildOptions {
            project: Some("demo-dir".into()),
            reset: true,
            dry_run: true,
            projects_dir: None,
        };
        build(&config, opts).await.unwrap();
    }

    #[tokio::test]
    async fn test_build_unknown_project() {
        let dir = tempdir().unwrap();
        let config = GroveConfig {
            projects_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let opts = BuildOptions {
            project: Some("ghost".into()),
            reset: false,
            dry_run: true,
            projects_dir: None,
        };

        let err = build(&config, opts).await.unwrap_err();
        assert!(err.to_string().contains("project not found: ghost"));
    }
}
