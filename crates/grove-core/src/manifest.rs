//! Light structured extraction from project manifests.

use crate::error::ManifestError;
use std::fs;
use std::path::Path;

/// The manifest formats Grove understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    PackageJson,
    CargoToml,
}

impl ManifestKind {
    pub const ALL: [ManifestKind; 2] = [ManifestKind::PackageJson, ManifestKind::CargoToml];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::PackageJson => "package.json",
            Self::CargoToml => "Cargo.toml",
        }
    }
}

/// Selected manifest fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestInfo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
}

impl ManifestInfo {
    /// Observations in the fixed order name, description, version.
    pub fn observations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(name) = &self.name {
            out.push(format!("Name: {}", name));
        }
        if let Some(description) = &self.description {
            out.push(format!("Description: {}", description));
        }
        if let Some(version) = &self.version {
            out.push(format!("Version: {}", version));
        }
        out
    }
}

/// Reads and parses a manifest of the given kind.
pub fn read_manifest(
    kind: ManifestKind,
    path: &Path,
    max_bytes: u64,
) -> Result<ManifestInfo, ManifestError> {
    let text = read_bounded(path, max_bytes)?;
    match kind {
        ManifestKind::PackageJson => parse_package_json(&text, path),
        ManifestKind::CargoToml => parse_cargo_toml(&text, path),
    }
}

fn read_bounded(path: &Path, max_bytes: u64) -> Result<String, ManifestError> {
    let read_err = |message: String| ManifestError::Read {
        path: path.to_path_buf(),
        message,
    };

    let size = fs::metadata(path).map_err(|e| read_err(e.to_string()))?.len();
    if size > max_bytes {
        return Err(read_err(format!("file too large ({} bytes)", size)));
    }
    fs::read_to_string(path).map_err(|e| read_err(e.to_string()))
}

fn parse_package_json(text: &str, path: &Path) -> Result<ManifestInfo, ManifestError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let field = |key: &str| {
        value.get(key).map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    Ok(ManifestInfo {
        name: field("name"),
        description: field("description"),
        version: field("version"),
    })
}

fn parse_cargo_toml(text: &str, path: &Path) -> Result<ManifestInfo, ManifestError> {
    let value: toml::Value = toml::from_str(text).map_err(|source| ManifestError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    // Workspace-only manifests have no [package] table.
    let Some(package) = value.get("package") else {
        return Ok(ManifestInfo::default());
    };

    let field = |key: &str| {
        package.get(key).map(|v| match v {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    Ok(ManifestInfo {
        name: field("name"),
        description: field("description"),
        version: field("version"),
    })
}
