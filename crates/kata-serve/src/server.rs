//! Agent HTTP server — exposes one agent to peers over plain HTTP
//!
//! Endpoints:
//! - GET  /.well-known/agent.json  — Agent card
//! - POST /v1/chat                 — Run one chat task against the agent
//!
//! Each task runs on a fresh thread; the surface is stateless by design.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};
use uuid::Uuid;

use kata_core::Agent;
use kata_core::thread::ConversationThread;

use crate::protocol::{AgentCard, ChatTask, ChatTaskReply, ErrorBody};

/// Maximum request body size (1MB) to prevent OOM from oversized payloads
const MAX_REQUEST_BODY_SIZE: usize = 1_048_576;

pub struct AgentServer {
    agent: Arc<Agent>,
    card: AgentCard,
    auth_token: Option<String>,
}

impl AgentServer {
    pub fn new(agent: Arc<Agent>, card: AgentCard, auth_token: Option<String>) -> Self {
        Self {
            agent,
            card,
            auth_token,
        }
    }

    /// Bind and serve until the process exits
    pub async fn serve(self: Arc<Self>, bind: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind(format!("{}:{}", bind, port)).await?;
        info!("agent server listening on {}", listener.local_addr()?);
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve_on(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, _addr) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                server.handle_connection(stream).await;
            });
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream) {
        let (reader, mut writer) = stream.into_split();
        let mut buf_reader = BufReader::new(reader);

        let mut request_line = String::new();
        if buf_reader.read_line(&mut request_line).await.is_err() {
            return;
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        // Read headers
        let mut content_length: usize = 0;
        let mut authorization = String::new();
        loop {
            let mut line = String::new();
            if buf_reader.read_line(&mut line).await.is_err() {
                return;
            }
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                if key == "content-length" {
                    content_length = value.parse().unwrap_or(0);
                } else if key == "authorization" {
                    authorization = value.to_string();
                }
            }
        }

        // Enforce max request body size (check BEFORE allocation)
        if content_length > MAX_REQUEST_BODY_SIZE {
            warn!(
                "request body too large: {} bytes (max {})",
                content_length, MAX_REQUEST_BODY_SIZE
            );
            write_response(
                &mut writer,
                "413 Payload Too Large",
                &ErrorBody::json("request body too large"),
            )
            .await;
            return;
        }

        let mut body = vec![0u8; content_length];
        if content_length > 0 && buf_reader.read_exact(&mut body).await.is_err() {
            return;
        }

        match (method.as_str(), path.as_str()) {
            ("GET", "/.well-known/agent.json") => {
                let json = serde_json::to_string(&self.card)
                    .unwrap_or_else(|_| ErrorBody::json("card serialization failed"));
                write_response(&mut writer, "200 OK", &json).await;
            }
            ("POST", "/v1/chat") => {
                if !self.authorized(&authorization) {
                    write_response(
                        &mut writer,
                        "401 Unauthorized",
                        &ErrorBody::json("missing or invalid bearer token"),
                    )
                    .await;
                    return;
                }

                let task: ChatTask = match serde_json::from_slice(&body) {
                    Ok(task) => task,
                    Err(e) => {
                        write_response(
                            &mut writer,
                            "400 Bad Request",
                            &ErrorBody::json(format!("invalid request body: {}", e)),
                        )
                        .await;
                        return;
                    }
                };

                info!("chat task: {} chars", task.message.len());
                let mut thread = ConversationThread::new();
                match self.agent.send(&mut thread, &task.message).await {
                    Ok(reply) => {
                        let response = ChatTaskReply {
                            id: Uuid::new_v4().to_string(),
                            text: reply.text,
                            input_tokens: reply.usage.input_tokens,
                            output_tokens: reply.usage.output_tokens,
                        };
                        let json = serde_json::to_string(&response)
                            .unwrap_or_else(|_| ErrorBody::json("serialization failed"));
                        write_response(&mut writer, "200 OK", &json).await;
                    }
                    Err(e) => {
                        warn!("chat task failed: {}", e);
                        write_response(
                            &mut writer,
                            "500 Internal Server Error",
                            &ErrorBody::json(e.to_string()),
                        )
                        .await;
                    }
                }
            }
            _ => {
                write_response(&mut writer, "404 Not Found", &ErrorBody::json("no such route"))
                    .await;
            }
        }
    }

    fn authorized(&self, authorization: &str) -> bool {
        let Some(expected) = &self.auth_token else {
            return true;
        };
        let Some(presented) = authorization.strip_prefix("Bearer ") else {
            return false;
        };
        constant_time_eq(presented.as_bytes(), expected.as_bytes())
    }
}

/// Compare tokens without short-circuiting on the first mismatched byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn write_response(
    writer: &mut (impl AsyncWriteExt + Unpin),
    status: &str,
    body: &str,
) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = writer.write_all(response.as_bytes()).await;
    let _ = writer.shutdown().await;
}
