//! Token streams: SSE decoding and caller-driven cancellation
//!
//! Streaming replies arrive as server-sent events, one `data:` line per
//! chunk, terminated by `data: [DONE]`. The decoder buffers raw bytes and
//! yields text fragments as complete lines become available, so fragments
//! split across network chunks reassemble correctly.

use std::pin::Pin;

use anyhow::{Result, anyhow};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// A lazy, finite, non-restartable sequence of generated text fragments
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Extract the text fragment from one SSE `data:` payload, if it carries one.
/// Role-only deltas, finish markers, and unparseable chunks yield nothing.
fn decode_data_payload(payload: &str) -> Option<String> {
    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty())
}

/// Decode a streaming chat-completions response into a [`TokenStream`]
pub(crate) fn sse_token_stream(response: reqwest::Response) -> TokenStream {
    decode_sse(response.bytes_stream().boxed())
}

fn decode_sse<B, C, E>(bytes: B) -> TokenStream
where
    B: Stream<Item = std::result::Result<C, E>> + Send + Unpin + 'static,
    C: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let stream = futures::stream::try_unfold(
        (bytes, Vec::new()),
        |(mut bytes, mut buf)| async move {
            loop {
                while let Some(line_end) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();
                    if payload == "[DONE]" {
                        return Ok(None);
                    }
                    if let Some(fragment) = decode_data_payload(payload) {
                        return Ok(Some((fragment, (bytes, buf))));
                    }
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => return Err(anyhow!("error reading response stream: {}", e)),
                    None => return Ok(None),
                }
            }
        },
    );
    Box::pin(stream)
}

/// Wrap a stream so it ends as soon as the caller's token fires. The token is
/// checked between fragments; an in-flight network read races the signal.
pub fn cancellable(inner: TokenStream, cancel: CancellationToken) -> TokenStream {
    let stream = futures::stream::unfold((inner, cancel), |(mut inner, cancel)| async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = inner.next() => item.map(|item| (item, (inner, cancel))),
        }
    });
    Box::pin(stream)
}
