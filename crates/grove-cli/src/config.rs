//! Configuration file handling.

use anyhow::{bail, Context, Result};
use grove_core::ExtractionPolicy;
use grove_mcp::{WireShape, DEFAULT_DISPATCH_METHOD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".grove";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// One process per request.
    #[default]
    Spawn,
    /// One long-lived process.
    Stdio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    #[default]
    Direct,
    Dispatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,

    /// Container runtime. Empty runs `server_command` directly.
    pub runtime: String,

    /// Container id or name. Discovered from `image` when unset.
    pub container: Option<String>,

    pub image: String,
    pub server_command: Vec<String>,
    pub wire: WireKind,
    pub dispatch_method: String,
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Spawn,
            runtime: "docker".to_string(),
            container: None,
            image: "mcp/memory".to_string(),
            server_command: vec!["node".to_string(), "dist/index.js".to_string()],
            wire: WireKind::Direct,
            dispatch_method: DEFAULT_DISPATCH_METHOD.to_string(),
            timeout_secs: 60,
        }
    }
}

impl TransportConfig {
    pub fn wire_shape(&self) -> WireShape {
        match self.wire {
            WireKind::Direct => WireShape::Direct,
            WireKind::Dispatch => WireShape::Dispatch {
                method: self.dispatch_method.clone(),
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn uses_container(&self) -> bool {
        !self.runtime.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroveConfig {
    pub projects_dir: PathBuf,
    pub batch_size: usize,
    pub transport: TransportConfig,
    pub policy: ExtractionPolicy,
}

impl Default for GroveConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs::home_dir()
                .map(|home| home.join("projects"))
                .unwrap_or_else(|| PathBuf::from("projects")),
            batch_size: grove_graph::DEFAULT_BATCH_SIZE,
            transport: TransportConfig::default(),
            policy: ExtractionPolicy::default(),
        }
    }
}

impl GroveConfig {
    /// Loads from `explicit`, else the first of `./.grove/config.json` and
    /// the user config file that exists, else defaults.
    ///
    /// Returns the file used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let user = dirs::config_dir().map(|d| d.join("grove").join(CONFIG_FILE));
        Self::load_from(explicit, &cwd, user)
    }

    pub fn load_from(
        explicit: Option<&Path>,
        cwd: &Path,
        user: Option<PathBuf>,
    ) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::read(path)?, Some(path.to_path_buf())));
        }

        let candidates = std::iter::once(cwd.join(CONFIG_DIR).join(CONFIG_FILE)).chain(user);
        for path in candidates {
            if path.is_file() {
                return Ok((Self::read(&path)?, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.transport.server_command.is_empty() {
            bail!("transport.server_command must not be empty");
        }
        if self.transport.timeout_secs == 0 {
            bail!("transport.timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = GroveConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.transport.mode, TransportMode::Spawn);
        assert_eq!(config.transport.runtime, "docker");
        assert_eq!(config.transport.image, "mcp/memory");
        assert_eq!(config.transport.wire_shape(), WireShape::Direct);
        assert_eq!(config.transport.timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(
            &path,
            r#"{"batch_size": 3, "transport": {"wire": "dispatch", "container": "abc"}}"#,
        )
        .unwrap();

        let config = GroveConfig::read(&path).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.transport.container.as_deref(), Some("abc"));
        assert_eq!(config.transport.runtime, "docker");
        assert_eq!(config.transport.wire_shape(), WireShape::dispatch());
        assert_eq!(config.policy, ExtractionPolicy::default());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, r#"{"batch_size": 0}"#).unwrap();

        let err = GroveConfig::read(&path).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_lookup_order() {
        let cwd = tempdir().unwrap();
        let home = tempdir().unwrap();
        let user = home.path().join("config.json");
        fs::write(&user, r#"{"batch_size": 7}"#).unwrap();

        // Only the user file exists.
        let (config, used) = GroveConfig::load_from(None, cwd.path(), Some(user.clone())).unwrap();
        assert_eq!(config.batch_size, 7);
        assert_eq!(used, Some(user.clone()));

        // The project file wins over the user file.
        fs::create_dir(cwd.path().join(CONFIG_DIR)).unwrap();
        let local = cwd.path().join(CONFIG_DIR).join(CONFIG_FILE);
        fs::write(&local, r#"{"batch_size": 2}"#).unwrap();
        let (config, used) = GroveConfig::load_from(None, cwd.path(), Some(user.clone())).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(used, Some(local));

        // An explicit path wins over both.
        let explicit = home.path().join("other.json");
        fs::write(&explicit, r#"{"batch_size": 9}"#).unwrap();
        let (config, _) =
            GroveConfig::load_from(Some(explicit.as_path()), cwd.path(), Some(user)).unwrap();
        assert_eq!(config.batch_size, 9);
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let cwd = tempdir().unwrap();
        let (config, used) = GroveConfig::load_from(None, cwd.path(), None).unwrap();
        assert_eq!(config, GroveConfig::default());
        assert!(used.is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let cwd = tempdir().unwrap();
        let missing = cwd.path().join("nope.json");
        assert!(GroveConfig::load_from(Some(missing.as_path()), cwd.path(), None).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = GroveConfig::default();
        let parsed: GroveConfig = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
