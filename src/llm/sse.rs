//! Server-Sent Events decoding for streamed generation responses.
//!
//! Gemini's `alt=sse` mode sends one JSON document per `data:` line. Lines
//! may be split across network reads, so bytes are buffered until a newline
//! arrives.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use tracing::debug;

use super::{LLMError, StreamChunk};

/// Incremental line decoder for an SSE body
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every chunk completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, LLMError>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<Result<StreamChunk, LLMError>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(raw: &[u8]) -> Option<Result<StreamChunk, LLMError>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);

    // Comments, event names, ids and blank separators carry no payload
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(chunk_from_value(&value)),
        Err(e) => {
            debug!("Unparseable SSE payload ({}), treating as empty chunk", e);
            Some(Ok(StreamChunk::empty()))
        }
    }
}

/// Pull the text fragment out of one `GenerateContentResponse` document
pub fn chunk_from_value(value: &Value) -> Result<StreamChunk, LLMError> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown upstream error")
            .to_string();
        let status = error.get("code").and_then(Value::as_u64).unwrap_or(500) as u16;
        return Err(LLMError::Api { status, message });
    }

    let parts = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array);

    let Some(parts) = parts else {
        return Ok(StreamChunk::empty());
    };

    let fragments: Vec<&str> = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if fragments.is_empty() {
        Ok(StreamChunk::empty())
    } else {
        Ok(StreamChunk::text(fragments.concat()))
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<StreamChunk, LLMError>>,
    done: bool,
}

/// Turn a body byte stream into a stream of chunks. A transport error ends
/// the stream after being yielded.
pub fn sse_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamChunk, LLMError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    state.pending.clear();
                    return Some((Err(LLMError::Network(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
}
