//! Server-sent events decoding for streaming completions.
//!
//! Both wire protocols deliver fragments as `data: <json>` lines. The
//! decoder buffers raw bytes so that multi-byte characters and lines split
//! across network chunks come out whole.

use council_application::{BackendError, TextStream};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;

const DONE_MARKER: &str = "[DONE]";

/// Incremental `text/event-stream` decoder yielding `data:` payloads
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body; returns every complete payload in it.
    ///
    /// Nothing is returned once `[DONE]` has been seen.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = self.decode_line(&line) {
                payloads.push(payload);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        payloads
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        if self.done || line.is_empty() {
            return Vec::new();
        }
        self.decode_line(&line).into_iter().collect()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);

        // Comments, `event:`/`id:` fields and blank separators carry no text
        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_MARKER {
            self.done = true;
            return None;
        }
        if data.is_empty() {
            return None;
        }
        Some(data.to_string())
    }
}

struct DecodeState<S, F> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    extract: F,
    idle: Duration,
    finished: bool,
}

/// Turn an SSE body into a stream of text fragments.
///
/// `extract` maps one `data:` payload to its text, `Ok(None)` for events
/// that carry none. The first error ends the stream. A body that stays
/// silent for `idle` ends it with [`BackendError::Timeout`]; the stream as a
/// whole has no deadline.
pub fn decode_text_stream<S, B, F>(body: S, idle: Duration, extract: F) -> TextStream
where
    S: Stream<Item = Result<B, BackendError>> + Send + 'static,
    B: AsRef<[u8]>,
    F: FnMut(&str) -> Result<Option<String>, BackendError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        extract,
        idle,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.pending.pop_front() {
                match (state.extract)(&data) {
                    Ok(Some(text)) if !text.is_empty() => return Some((Ok(text), state)),
                    Ok(_) => continue,
                    Err(e) => {
                        state.pending.clear();
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }

            if state.finished || state.decoder.is_done() {
                return None;
            }

            let Ok(next) = timeout(state.idle, state.body.next()).await else {
                state.finished = true;
                return Some((Err(BackendError::Timeout), state));
            };
            match next {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(chunk.as_ref());
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    let payloads = state.decoder.finish();
                    state.pending.extend(payloads);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
