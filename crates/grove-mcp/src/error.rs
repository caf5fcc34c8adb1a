use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request/response exchange.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The remote process could not be started or written to.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote process exited unsuccessfully or closed its output early.
    #[error("{message} (status: {status}){}", diagnostics(.stdout, .stderr))]
    Transport {
        message: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// No response within the per-call deadline.
    #[error("{method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// The response was missing or malformed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The store reported an application-level error.
    #[error("tool {tool} failed: {payload}")]
    Tool { tool: String, payload: Value },

    #[error("no running container for image {image}")]
    ContainerNotFound { image: String },
}

fn diagnostics(stdout: &str, stderr: &str) -> String {
    let mut out = String::new();
    if !stdout.trim().is_empty() {
        out.push_str(&format!("\nstdout: {}", stdout.trim()));
    }
    if !stderr.trim().is_empty() {
        out.push_str(&format!("\nstderr: {}", stderr.trim()));
    }
    out
}

impl ClientError {
    /// True for failures reported by the store rather than the channel.
    pub fn is_tool_error(&self) -> bool {
        matches!(self, Self::Tool { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_includes_output() {
        let err = ClientError::Transport {
            message: "docker exec failed".into(),
            status: "exit status: 1".into(),
            stdout: "".into(),
            stderr: "No such container: abc\n".into(),
        };
        let text = err.to_string();

        assert!(text.starts_with("docker exec failed (status: exit status: 1)"));
        assert!(text.contains("stderr: No such container: abc"));
        assert!(!text.contains("stdout:"));
    }
}
