//! Transports that carry one request line to the store and bring back the
//! response object.
//!
//! Two implementations:
//! - [`SpawnTransport`] launches a fresh process per request (typically
//!   `docker exec -i <container> node dist/index.js`), writes the request to
//!   its stdin and scans its stdout for the first JSON object.
//! - [`StdioTransport`] keeps one server process alive and correlates
//!   responses to requests by id.
//!
//! Both apply a per-call deadline.

use crate::error::ClientError;
use crate::protocol::{first_json_object, JsonRpcRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Carries a request to the store and returns the raw response object.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<Value, ClientError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

fn status_string(status: Option<ExitStatus>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Spawn-per-call
// ─────────────────────────────────────────────────────────────────────────────

/// Launches a fresh process for every request.
#[derive(Debug, Clone)]
pub struct SpawnTransport {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SpawnTransport {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, line: &str) -> Result<std::process::Output, ClientError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ClientError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A server that exits before reading surfaces through its status.
            if let Err(e) = stdin.write_all(format!("{}\n", line).as_bytes()).await {
                debug!("Write to {} failed: {}", self.program, e);
            }
        }

        child
            .wait_with_output()
            .await
            .map_err(|source| ClientError::Launch {
                program: self.program.clone(),
                source,
            })
    }
}

#[async_trait]
impl Transport for SpawnTransport {
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<Value, ClientError> {
        let line = request.to_line()?;
        debug!("→ {} id={} via {}", request.method, request.id, self.program);

        let output = tokio::time::timeout(self.timeout, self.run(&line))
            .await
            .map_err(|_| ClientError::Timeout {
                method: request.method.clone(),
                timeout: self.timeout,
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(ClientError::Transport {
                message: format!("{} exited unsuccessfully", self.program),
                status: status_string(Some(output.status)),
                stdout: stdout.into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        first_json_object(&stdout).ok_or_else(|| {
            ClientError::Protocol(format!(
                "no JSON object in output of {}: {}",
                request.method,
                stdout.trim()
            ))
        })
    }

    fn describe(&self) -> String {
        format!("spawn: {} {}", self.program, self.args.join(" "))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistent stdio
// ─────────────────────────────────────────────────────────────────────────────

struct StdioChannel {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Keeps one server process and exchanges lines over its stdio.
///
/// Requests are serialized through a mutex, so at most one call is in
/// flight on the channel.
pub struct StdioTransport {
    program: String,
    channel: Mutex<StdioChannel>,
    timeout: Duration,
}

impl StdioTransport {
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, ClientError> {
        let launch_err = |source| ClientError::Launch {
            program: program.to_string(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_err)?;

        let missing = |what: &str| {
            launch_err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("missing {}", what),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            let name = program.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{}] {}", name, line);
                }
            });
        }

        info!("Started persistent server: {} {}", program, args.join(" "));
        Ok(Self {
            program: program.to_string(),
            channel: Mutex::new(StdioChannel {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exchange(
        &self,
        channel: &mut StdioChannel,
        request: &JsonRpcRequest,
    ) -> Result<Value, ClientError> {
        let line = request.to_line()?;
        let written = async {
            channel.stdin.write_all(line.as_bytes()).await?;
            channel.stdin.write_all(b"\n").await?;
            channel.stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            return Err(ClientError::Transport {
                message: format!("failed to write to {}: {}", self.program, e),
                status: status_string(channel.child.try_wait().ok().flatten()),
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        loop {
            let next = channel.stdout.next_line().await;
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    return Err(ClientError::Transport {
                        message: format!("{} closed its output", self.program),
                        status: status_string(channel.child.try_wait().ok().flatten()),
                        stdout: String::new(),
                        stderr: String::new(),
                    })
                }
                Err(e) => {
                    return Err(ClientError::Transport {
                        message: format!("failed to read from {}: {}", self.program, e),
                        status: status_string(channel.child.try_wait().ok().flatten()),
                        stdout: String::new(),
                        stderr: String::new(),
                    })
                }
            };

            let Some(value) = first_json_object(&line) else {
                debug!("Skipping non-JSON line: {}", line);
                continue;
            };

            match value.get("id").and_then(Value::as_u64) {
                Some(id) if id == request.id => return Ok(value),
                Some(id) => warn!("Dropping response for stale id {}", id),
                // An uncorrelated error (e.g. a parse error) answers the
                // only request in flight.
                None if value.get("error").is_some_and(|e| !e.is_null()) => return Ok(value),
                None => debug!("Skipping message without id: {}", line),
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<Value, ClientError> {
        let mut channel = self.channel.lock().await;
        debug!("→ {} id={} via {}", request.method, request.id, self.program);

        tokio::time::timeout(self.timeout, self.exchange(&mut channel, request))
            .await
            .map_err(|_| ClientError::Timeout {
                method: request.method.clone(),
                timeout: self.timeout,
            })?
    }

    fn describe(&self) -> String {
        format!("stdio: {}", self.program)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Container discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Finds the id of a running container started from `image`.
pub async fn discover_container(runtime: &str, image: &str) -> Result<String, ClientError> {
    let output = Command::new(runtime)
        .args(["ps", "--filter", &format!("ancestor={}", image), "--format", "{{.ID}}"])
        .output()
        .await
        .map_err(|source| ClientError::Launch {
            program: runtime.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ClientError::Transport {
            message: format!("{} ps failed", runtime),
            status: status_string(Some(output.status)),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClientError::ContainerNotFound {
            image: image.to_string(),
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn sh(script: &str) -> SpawnTransport {
        SpawnTransport::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_spawn_returns_first_object() {
        let t = sh(r#"read line; echo "booting"; echo '{"id":0,"result":{"ok":true}}'"#);
        let req = JsonRpcRequest::new(0, "read_graph", Some(json!({})));

        let resp = t.round_trip(&req).await.unwrap();
        assert_eq!(resp["result"]["ok"], true);
    }

    #[tokio::test]
    async fn test_spawn_passes_request_on_stdin() {
        let t = sh("read line; printf '%s\\n' \"$line\"");
        let req = JsonRpcRequest::new(4, "open_nodes", Some(json!({"names": ["a"]})));

        let resp = t.round_trip(&req).await.unwrap();
        assert_eq!(resp["id"], 4);
        assert_eq!(resp["method"], "open_nodes");
    }

    #[tokio::test]
    async fn test_spawn_non_json_is_protocol_error() {
        let t = sh("read line; echo 'Error: not ready'");
        let req = JsonRpcRequest::new(0, "read_graph", None);

        let err = t.round_trip(&req).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_spawn_nonzero_exit_is_transport_error() {
        let t = sh("read line; echo oops >&2; exit 3");
        let req = JsonRpcRequest::new(0, "read_graph", None);

        match t.round_trip(&req).await.unwrap_err() {
            ClientError::Transport { stderr, .. } => assert!(stderr.contains("oops")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_launch_error() {
        let t = SpawnTransport::new("grove-definitely-not-installed", vec![]);
        let req = JsonRpcRequest::new(0, "read_graph", None);

        let err = t.round_trip(&req).await.unwrap_err();
        assert!(matches!(err, ClientError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_spawn_deadline() {
        let t = sh("sleep 5").with_timeout(Duration::from_millis(100));
        let req = JsonRpcRequest::new(0, "read_graph", None);

        let err = t.round_trip(&req).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_stdio_correlates_ids() {
        // Emits a stale response and a notification before the real one.
        let script = r#"
            while read line; do
                id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
                echo '{"id":999,"result":{}}'
                echo '{"method":"notice"}'
                echo "{\"id\":$id,\"result\":{\"echo\":$id}}"
            done
        "#;
        let t = StdioTransport::spawn("sh", &["-c".to_string(), script.to_string()]).unwrap();

        for id in [1u64, 2, 3] {
            let req = JsonRpcRequest::new(id, "read_graph", Some(json!({})));
            let resp = t.round_trip(&req).await.unwrap();
            assert_eq!(resp["result"]["echo"], id);
        }
    }

    #[tokio::test]
    async fn test_stdio_null_id_error_is_returned() {
        let script = r#"
            while read line; do
                echo '{"jsonrpc":"2.0","method":"notice"}'
                echo '{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}'
            done
        "#;
        let t = StdioTransport::spawn("sh", &["-c".to_string(), script.to_string()])
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        let req = JsonRpcRequest::new(1, "read_graph", Some(json!({})));

        let resp = t.round_trip(&req).await.unwrap();
        assert_eq!(resp["error"]["code"], -32700);

        let err = crate::protocol::unwrap_envelope("read_graph", resp).unwrap_err();
        assert!(err.is_tool_error());
    }

    #[tokio::test]
    async fn test_stdio_closed_output_is_transport_error() {
        let t = StdioTransport::spawn("sh", &["-c".to_string(), "read line".to_string()]).unwrap();
        let req = JsonRpcRequest::new(1, "read_graph", None);

        let err = t.round_trip(&req).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }
}
