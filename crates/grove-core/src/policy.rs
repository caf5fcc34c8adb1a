//! Inclusion and extraction policy.
//!
//! Decides which paths become entities and how much of their content is
//! kept. The defaults mirror the set of build artifacts and caches that show
//! up in typical JS, Python and Rust projects.

use crate::content::ContentReader;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy applied by the builder and the walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    /// Directory names pruned wherever they appear as a path segment.
    pub excluded_dirs: Vec<String>,

    /// File names to skip. A leading `*` matches by suffix.
    pub excluded_files: Vec<String>,

    /// File extensions (with dot) that become `File` entities.
    pub included_extensions: Vec<String>,

    /// Files that are always included and read under the key-file ceiling.
    pub key_files: Vec<String>,

    /// Directories promoted to `Component` entities.
    pub component_dirs: Vec<String>,

    /// Character cap for ordinary file content.
    pub max_content_chars: usize,

    /// Size ceiling for ordinary files.
    pub max_file_bytes: u64,

    /// Size ceiling for key files and project metadata reads.
    pub key_file_max_bytes: u64,

    /// Prune paths matched by the project's root `.gitignore`.
    pub respect_gitignore: bool,

    /// Joins a parent entity name and a path segment.
    pub separator: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            excluded_dirs: strings(&[
                ".git",
                "node_modules",
                ".vscode",
                ".vscode-test",
                "out",
                "dist",
                "build",
                "coverage",
                ".cache",
                "__pycache__",
                "target",
            ]),
            excluded_files: strings(&[
                ".DS_Store",
                "*.pyc",
                "*.pyo",
                "*.pyd",
                "*.so",
                "*.dll",
                "*.class",
            ]),
            included_extensions: strings(&[
                ".py", ".js", ".ts", ".tsx", ".jsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs",
                ".go", ".rb", ".php", ".rs", ".swift", ".kt", ".md", ".json", ".yaml", ".yml",
                ".xml", ".html", ".css", ".scss", ".sass", ".sh", ".bash", ".txt", ".toml",
            ]),
            key_files: strings(&[
                "package.json",
                "Cargo.toml",
                "README.md",
                ".augment-guidelines",
                "tsconfig.json",
                "docker-compose.yml",
                "Dockerfile",
                "devcontainer.json",
            ]),
            component_dirs: strings(&[".devcontainer"]),
            max_content_chars: 1000,
            max_file_bytes: 1024 * 1024,
            key_file_max_bytes: 5000,
            respect_gitignore: false,
            separator: "/".to_string(),
        }
    }
}

impl ExtractionPolicy {
    /// True if any segment of `rel` is an excluded directory name.
    ///
    /// Matching is by whole segment, so `builder` or `distribution` are
    /// not caught by `build` or `dist`.
    pub fn is_excluded_path(&self, rel: &Path) -> bool {
        rel.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|seg| self.is_excluded_dir(seg))
                .unwrap_or(false)
        })
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }

    pub fn is_excluded_file(&self, name: &str) -> bool {
        self.excluded_files.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == pattern,
        })
    }

    pub fn is_key_file(&self, name: &str) -> bool {
        self.key_files.iter().any(|k| k == name)
    }

    pub fn is_component_dir(&self, name: &str) -> bool {
        self.component_dirs.iter().any(|d| d == name)
    }

    pub fn has_included_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.included_extensions
            .iter()
            .any(|e| e.to_lowercase() == dotted)
    }

    /// Whether a file with this name and path becomes an entity.
    pub fn includes_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.is_excluded_file(name) {
            return false;
        }
        self.is_key_file(name) || self.has_included_extension(path)
    }

    /// Reader for ordinary files.
    pub fn content_reader(&self) -> ContentReader {
        ContentReader::new(self.max_file_bytes, self.max_content_chars)
    }

    /// Reader for key files and project metadata.
    pub fn key_file_reader(&self) -> ContentReader {
        ContentReader::new(self.key_file_max_bytes, usize::MAX)
    }

    /// Joins a parent entity name and a path segment.
    pub fn child_name(&self, parent: &str, segment: &str) -> String {
        format!("{}{}{}", parent, self.separator, segment)
    }
}
