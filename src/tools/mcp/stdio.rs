//! MCP servers running as child processes, one JSON-RPC message per line

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::transport::{await_response, Inbox, McpTransport};
use super::McpError;

/// Host variables every server inherits; everything else must be configured
const INHERITED_ENV: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER", "LANG"];

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Line-delimited JSON-RPC over a pair of byte streams
pub struct StdioTransport {
    server: String,
    writer: Mutex<Writer>,
    inbox: Arc<Inbox>,
    reader: JoinHandle<()>,
    child: Mutex<Option<Child>>,
}

impl StdioTransport {
    /// Spawn `command` with a cleared environment plus `env`
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env_clear();
        for key in INHERITED_ENV {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        cmd.envs(env);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::SpawnFailed(format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::SpawnFailed("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::SpawnFailed("failed to capture stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            let server = server.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "{}", line);
                }
            });
        }

        Ok(Self::connect(server, stdout, stdin, Some(child)))
    }

    /// Speak to a server over arbitrary streams
    pub fn from_streams<R, W>(server: &str, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect(server, reader, writer, None)
    }

    fn connect<R, W>(server: &str, reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let inbox = Arc::new(Inbox::default());
        let reader = tokio::spawn(read_loop(server.to_string(), reader, inbox.clone()));
        Self {
            server: server.to_string(),
            writer: Mutex::new(Box::new(writer)),
            inbox,
            reader,
            child: Mutex::new(child),
        }
    }

    async fn write_line(&self, message: &impl Serialize) -> Result<(), McpError> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

async fn read_loop<R: AsyncRead + Unpin>(server: String, reader: R, inbox: Arc<Inbox>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match JsonRpcResponse::parse(line) {
                    Some(response) => inbox.deliver(response),
                    None => debug!(server = %server, line, "ignoring non-response line"),
                }
            }
            Ok(None) => {
                inbox.close(format!("server '{}' closed its output", server));
                break;
            }
            Err(e) => {
                inbox.close(format!("reading from server '{}' failed: {}", server, e));
                break;
            }
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let id = request.id;
        let rx = self.inbox.expect(id)?;
        if let Err(e) = self.write_line(&request).await {
            self.inbox.forget(id);
            return Err(e);
        }
        await_response(rx).await
    }

    async fn notify(&self, notification: JsonRpcNotification) -> Result<(), McpError> {
        self.write_line(&notification).await
    }

    async fn close(&self) {
        self.reader.abort();
        self.inbox.close(format!("server '{}' was shut down", self.server));
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
