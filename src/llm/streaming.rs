//! Streaming response handling
//!
//! Ollama streams newline-delimited JSON. Network chunks do not line up with
//! record boundaries, so bytes are buffered until a full line is available.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream;
use futures::Stream;
use futures::StreamExt;

use crate::errors::Result;
use crate::errors::TopgoError;

/// Streaming response from LLM
pub struct StreamingResponse {
    stream: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl StreamingResponse {
    pub fn new(stream: Pin<Box<dyn Stream<Item = Result<String>> + Send>>) -> Self {
        Self { stream }
    }

    /// Collect all chunks into a single string
    pub async fn collect_all(mut self) -> Result<String> {
        let mut result = String::new();
        while let Some(chunk) = self.stream.next().await {
            result.push_str(&chunk?);
        }
        Ok(result)
    }

    /// Get the underlying stream
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = Result<String>> + Send>> {
        self.stream
    }
}

/// Accumulates bytes and hands out complete, non-blank lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = Self::decode(&line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Whatever is left once the input ends without a trailing newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        Self::decode(&rest)
    }

    fn decode(raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Split a byte stream into text lines
pub fn ndjson_lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<TopgoError> + Send,
{
    let state = (bytes, LineBuffer::default(), VecDeque::<String>::new(), false);

    stream::unfold(state, |(mut bytes, mut buffer, mut ready, mut finished)| async move {
        loop {
            if let Some(line) = ready.pop_front() {
                return Some((Ok(line), (bytes, buffer, ready, finished)));
            }
            if finished {
                return None;
            }
            match bytes.next().await {
                Some(Ok(data)) => ready.extend(buffer.push(data.as_ref())),
                Some(Err(e)) => return Some((Err(e.into()), (bytes, buffer, ready, true))),
                None => {
                    finished = true;
                    ready.extend(buffer.finish());
                }
            }
        }
    })
}
