//! Recursive tree walker.
//!
//! Walks a project depth-first and hands every path to the
//! [`EntityBuilder`]. Siblings are visited directories first, then files,
//! each group sorted by name, so output is deterministic and a directory's
//! entity always precedes the entities nested under it.

use grove_core::{EntityBuilder, ExtractionPolicy, GraphBatch};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Result of indexing one project.
#[derive(Debug, Default)]
pub struct IndexResult {
    /// Entities and relations in submission order.
    pub batch: GraphBatch,
    pub files_indexed: usize,
    pub dirs_indexed: usize,
    /// Paths pruned by policy, gitignore or cycle detection.
    pub skipped: usize,
    /// Non-fatal problems as (path, message).
    pub errors: Vec<(String, String)>,
    pub duration_ms: u64,
}

/// Applies the builder across a directory hierarchy.
pub struct TreeWalker<'a> {
    builder: EntityBuilder<'a>,
    gitignore: Option<Gitignore>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(policy: &'a ExtractionPolicy, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let gitignore = if policy.respect_gitignore {
            load_gitignore(root)
        } else {
            None
        };

        Self {
            builder: EntityBuilder::new(policy, root),
            gitignore,
        }
    }

    /// Builds the project entity and everything beneath the root.
    pub fn index_project(&self, project_name: &str) -> IndexResult {
        let start = Instant::now();
        let project = self.builder.build_project(project_name);

        let mut result = self.walk(project_name);
        result.batch.entities.insert(0, project.entity);
        let root = self.builder.root().display().to_string();
        result.errors.extend(
            project
                .manifest_errors
                .into_iter()
                .map(|e| (root.clone(), e.to_string())),
        );
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Walks everything beneath the root, attaching top-level entries to
    /// `root_entity_name`. The root itself produces no entity.
    pub fn walk(&self, root_entity_name: &str) -> IndexResult {
        let start = Instant::now();
        let root = self.builder.root().to_path_buf();
        let mut result = IndexResult::default();

        let mut names: HashSet<String> = HashSet::new();
        names.insert(root_entity_name.to_string());

        let mut visited: HashSet<PathBuf> = HashSet::new();
        if let Ok(canonical) = fs::canonicalize(&root) {
            visited.insert(canonical);
        }

        let mut entries = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(true)
            .sort_by(dirs_first)
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    if e.loop_ancestor().is_some() {
                        warn!("Symlink cycle at {}, not descending", path);
                        result.skipped += 1;
                    } else {
                        warn!("Failed to read entry {}: {}", path, e);
                        result.errors.push((path, e.to_string()));
                    }
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            if self.builder.is_excluded(path) || self.is_gitignored(path, is_dir) {
                debug!("Pruned: {}", path.display());
                if is_dir {
                    entries.skip_current_dir();
                }
                result.skipped += 1;
                continue;
            }

            if is_dir {
                let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                if !visited.insert(canonical) {
                    warn!("Already visited {}, not descending", path.display());
                    entries.skip_current_dir();
                    result.skipped += 1;
                    continue;
                }
            }

            let parent = self.parent_entity_name(&root, root_entity_name, path);
            let built = self.builder.build_for_path(path, &parent);

            if built.entities.is_empty() {
                // Nothing below a directory without an entity may be emitted.
                if is_dir {
                    entries.skip_current_dir();
                    result.skipped += 1;
                }
                continue;
            }

            if built.entities.iter().any(|e| names.contains(&e.name)) {
                warn!("Duplicate entity name for {}, skipping", path.display());
                if is_dir {
                    entries.skip_current_dir();
                }
                result.skipped += 1;
                continue;
            }
            names.extend(built.entities.iter().map(|e| e.name.clone()));

            if is_dir {
                result.dirs_indexed += 1;
            } else {
                result.files_indexed += 1;
            }
            result.batch.extend(built);
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Entity name of the directory containing `path`.
    fn parent_entity_name(&self, root: &Path, root_entity_name: &str, path: &Path) -> String {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let Some(parent) = rel.parent() else {
            return root_entity_name.to_string();
        };

        parent
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .fold(root_entity_name.to_string(), |acc, seg| {
                self.builder.policy().child_name(&acc, seg)
            })
    }

    fn is_gitignored(&self, path: &Path, is_dir: bool) -> bool {
        self.gitignore
            .as_ref()
            .map(|gi| gi.matched_path_or_any_parents(path, is_dir).is_ignore())
            .unwrap_or(false)
    }
}

fn dirs_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir
        .cmp(&a_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn load_gitignore(root: &Path) -> Option<Gitignore> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Some(e) = builder.add(&path) {
        warn!("Ignoring unreadable {}: {}", path.display(), e);
        return None;
    }
    match builder.build() {
        Ok(gi) => Some(gi),
        Err(e) => {
            warn!("Invalid {}: {}", path.display(), e);
            None
        }
    }
}
