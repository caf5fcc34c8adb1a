//! Grove Walker - project discovery and tree traversal
//!
//! Finds the projects under a projects directory and walks each one into
//! a [`GraphBatch`](grove_core::GraphBatch) ready for synchronization.

mod walker;

pub use walker::{IndexResult, TreeWalker};

use grove_core::ExtractionPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("directory not found: {0}")]
    NotFound(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entity name for a project: the directory's basename.
pub fn project_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn ensure_dir(path: &Path) -> Result<(), WalkError> {
    if !path.exists() {
        return Err(WalkError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(WalkError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Lists project directories directly under `projects_dir`, sorted by name.
///
/// Hidden directories and excluded directory names are skipped.
pub fn discover_projects(
    projects_dir: &Path,
    policy: &ExtractionPolicy,
) -> Result<Vec<PathBuf>, WalkError> {
    ensure_dir(projects_dir)?;

    let io_err = |source| WalkError::Io {
        path: projects_dir.to_path_buf(),
        source,
    };

    let mut projects = Vec::new();
    for entry in fs::read_dir(projects_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !path.is_dir() || name.starts_with('.') || policy.is_excluded_dir(&name) {
            continue;
        }
        projects.push(path);
    }
    projects.sort();

    info!("Found {} projects in {}", projects.len(), projects_dir.display());
    Ok(projects)
}

/// Resolves a single project by name under `projects_dir`.
pub fn find_project(projects_dir: &Path, name: &str) -> Result<PathBuf, WalkError> {
    let path = projects_dir.join(name);
    ensure_dir(&path)?;
    Ok(path)
}

/// Indexes one project: its entity followed by everything beneath it.
pub fn index_project(path: &Path, policy: &ExtractionPolicy) -> Result<IndexResult, WalkError> {
    ensure_dir(path)?;
    let name = project_name(path);
    let walker = TreeWalker::new(policy, path);
    Ok(walker.index_project(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discover_projects_skips_hidden_and_excluded() {
        let dir = tempdir().unwrap();
        for d in ["web", "api", ".config", "node_modules"] {
            fs::create_dir(dir.path().join(d)).unwrap();
        }
        fs::write(dir.path().join("loose.txt"), "x").unwrap();

        let policy = ExtractionPolicy::default();
        let projects = discover_projects(dir.path(), &policy).unwrap();
        let names: Vec<_> = projects.iter().map(|p| project_name(p)).collect();

        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn test_find_project_missing() {
        let dir = tempdir().unwrap();
        let err = find_project(dir.path(), "ghost").unwrap_err();
        assert!(matches!(err, WalkError::NotFound(_)));
    }

    #[test]
    fn test_index_project_names_by_basename() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("shop");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("app.ts"), "export {}").unwrap();

        let result = index_project(&root, &ExtractionPolicy::default()).unwrap();
        assert_eq!(result.batch.entities[0].name, "shop");
        assert_eq!(result.batch.entities[1].name, "shop/app.ts");
        assert_eq!(result.files_indexed, 1);
    }
}
