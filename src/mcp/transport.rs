//! Byte-level channels for MCP communication.
//!
//! Three transports cover the server shapes seen in practice:
//!
//! - **HTTP** - each request is one POST; the natural fit for stateless
//!   MCP-over-HTTP servers
//! - **WebSocket** - one persistent connection, messages exchanged as
//!   text frames
//! - **Stdio** - a locally spawned server process, line-delimited JSON
//!   over stdin/stdout
//!
//! All transports operate lock-step: send one request, read until its
//! correlated response arrives. Server-initiated notifications received
//! while waiting are logged and skipped. The client layer serializes
//! access, so a transport never sees interleaved requests.

use crate::error::ToolUniverseError;
use crate::mcp::types::{McpNotification, McpRequest, McpResponse};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

/// A lock-step MCP message channel
#[async_trait]
pub trait McpTransport: Send + Sync + std::fmt::Debug {
    /// Establish the underlying connection
    async fn connect(&mut self) -> Result<(), ToolUniverseError>;

    /// Send a request and wait for its correlated response
    async fn roundtrip(&mut self, request: &McpRequest) -> Result<McpResponse, ToolUniverseError>;

    /// Send a notification, expecting no reply
    async fn notify(&mut self, notification: &McpNotification) -> Result<(), ToolUniverseError>;

    /// Close the connection and release resources
    async fn close(&mut self) -> Result<(), ToolUniverseError>;

    fn is_connected(&self) -> bool;

    /// Endpoint description for logs and error messages
    fn endpoint(&self) -> String;
}

/// Builds a transport from an endpoint description
pub struct TransportFactory;

impl TransportFactory {
    /// Pick a transport from a URL scheme: `http(s)` or `ws(s)`
    pub fn from_url(server_url: &str) -> Result<Box<dyn McpTransport>, ToolUniverseError> {
        let parsed = Url::parse(server_url).map_err(|e| {
            ToolUniverseError::configuration(format!("invalid server_url '{}': {}", server_url, e))
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(Box::new(HttpTransport::new(server_url))),
            "ws" | "wss" => Ok(Box::new(WebSocketTransport::new(server_url))),
            other => Err(ToolUniverseError::configuration(format!(
                "unsupported server_url scheme '{}' (expected http, https, ws or wss)",
                other
            ))),
        }
    }

    /// Transport for a locally spawned server process
    pub fn stdio(
        command: impl Into<String>,
        args: Vec<String>,
        env_vars: HashMap<String, String>,
    ) -> Box<dyn McpTransport> {
        Box::new(StdioTransport::new(command, args, env_vars))
    }
}

/// One POST per request against a stateless MCP endpoint
#[derive(Debug)]
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    connected: bool,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            connected: false,
        }
    }

    async fn post(&self, body: &impl serde::Serialize) -> Result<reqwest::Response, ToolUniverseError> {
        self.client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| ToolUniverseError::transport(format!("POST {}: {}", self.url, e)))
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn connect(&mut self) -> Result<(), ToolUniverseError> {
        // Stateless; each roundtrip carries its own connection
        self.connected = true;
        Ok(())
    }

    async fn roundtrip(&mut self, request: &McpRequest) -> Result<McpResponse, ToolUniverseError> {
        let response = self.post(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolUniverseError::transport(format!(
                "POST {} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }
        response
            .json::<McpResponse>()
            .await
            .map_err(|e| ToolUniverseError::transport(format!("decoding response: {}", e)))
    }

    async fn notify(&mut self, notification: &McpNotification) -> Result<(), ToolUniverseError> {
        self.post(notification).await.map(|_| ())
    }

    async fn close(&mut self) -> Result<(), ToolUniverseError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent WebSocket connection exchanging text frames
#[derive(Debug)]
pub struct WebSocketTransport {
    url: String,
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    fn stream_mut(&mut self) -> Result<&mut WsStream, ToolUniverseError> {
        self.stream
            .as_mut()
            .ok_or_else(|| ToolUniverseError::transport("websocket not connected"))
    }
}

#[async_trait]
impl McpTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), ToolUniverseError> {
        let (stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| ToolUniverseError::transport(format!("connecting {}: {}", self.url, e)))?;
        debug!("websocket connected to {}", self.url);
        self.stream = Some(stream);
        Ok(())
    }

    async fn roundtrip(&mut self, request: &McpRequest) -> Result<McpResponse, ToolUniverseError> {
        let payload = serde_json::to_string(request)?;
        let expected_id = request.id;
        let stream = self.stream_mut()?;

        stream
            .send(WsMessage::Text(payload))
            .await
            .map_err(|e| ToolUniverseError::transport(format!("sending frame: {}", e)))?;

        // Read until the correlated response; skip notifications
        loop {
            let frame = stream
                .next()
                .await
                .ok_or_else(|| ToolUniverseError::transport("connection closed by server"))?
                .map_err(|e| ToolUniverseError::transport(format!("receiving frame: {}", e)))?;

            let text = match frame {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => {
                    return Err(ToolUniverseError::transport("connection closed by server"))
                }
                _ => continue,
            };

            match serde_json::from_str::<McpResponse>(&text) {
                Ok(response) if response.id == expected_id => return Ok(response),
                Ok(response) => {
                    warn!("dropping response for stale request id {}", response.id)
                }
                Err(_) => debug!("skipping non-response frame"),
            }
        }
    }

    async fn notify(&mut self, notification: &McpNotification) -> Result<(), ToolUniverseError> {
        let payload = serde_json::to_string(notification)?;
        self.stream_mut()?
            .send(WsMessage::Text(payload))
            .await
            .map_err(|e| ToolUniverseError::transport(format!("sending frame: {}", e)))
    }

    async fn close(&mut self) -> Result<(), ToolUniverseError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

/// Locally spawned server process, line-delimited JSON over stdio
#[derive(Debug)]
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    env_vars: HashMap<String, String>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
}

impl StdioTransport {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        env_vars: HashMap<String, String>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            env_vars,
            child: None,
            stdin: None,
            stdout: None,
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ToolUniverseError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ToolUniverseError::transport("server process not spawned"))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolUniverseError::transport(format!("writing to server: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| ToolUniverseError::transport(format!("writing to server: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| ToolUniverseError::transport(format!("flushing to server: {}", e)))
    }

    /// OS pid of the spawned server, if running
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn connect(&mut self) -> Result<(), ToolUniverseError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(&self.env_vars)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            // The server must not outlive a transport dropped without close()
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolUniverseError::transport(format!("spawning '{}': {}", self.command, e))
            })?;

        self.stdin = child.stdin.take();
        self.stdout = child
            .stdout
            .take()
            .map(|stdout| BufReader::new(stdout).lines());
        self.child = Some(child);
        debug!("spawned MCP server process '{}'", self.command);
        Ok(())
    }

    async fn roundtrip(&mut self, request: &McpRequest) -> Result<McpResponse, ToolUniverseError> {
        let payload = serde_json::to_string(request)?;
        self.write_line(&payload).await?;

        let expected_id = request.id;
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| ToolUniverseError::transport("server process not spawned"))?;

        loop {
            let line = stdout
                .next_line()
                .await
                .map_err(|e| ToolUniverseError::transport(format!("reading from server: {}", e)))?
                .ok_or_else(|| ToolUniverseError::transport("server process closed stdout"))?;

            match serde_json::from_str::<McpResponse>(&line) {
                Ok(response) if response.id == expected_id => return Ok(response),
                Ok(_) | Err(_) => debug!("skipping non-matching line from server"),
            }
        }
    }

    async fn notify(&mut self, notification: &McpNotification) -> Result<(), ToolUniverseError> {
        let payload = serde_json::to_string(notification)?;
        self.write_line(&payload).await
    }

    async fn close(&mut self) -> Result<(), ToolUniverseError> {
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.child.is_some()
    }

    fn endpoint(&self) -> String {
        format!("stdio:{}", self.command)
    }
}
