//! Decoding of Ollama's newline-delimited JSON generation stream

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use tracing::debug;

use pagent_core::{Error, TextStream};

#[derive(Deserialize)]
struct StreamLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

struct DecoderState<S> {
    chunks: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> DecoderState<S> {
    /// Consume every complete line in the buffer
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line);
            if self.finished {
                self.buffer.clear();
                return;
            }
        }
    }

    /// Decode one line; blank and malformed lines are skipped
    fn decode_line(&mut self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match serde_json::from_str::<StreamLine>(text) {
            Ok(parsed) => {
                if let Some(fragment) = parsed.response.filter(|f| !f.is_empty()) {
                    self.pending.push_back(fragment);
                }
                if parsed.done {
                    self.finished = true;
                }
            }
            Err(e) => debug!("Skipping malformed stream line: {}", e),
        }
    }
}

/// Turn a byte-chunk stream into a stream of text fragments.
///
/// Lines may be split across chunks. The sequence ends at the first object
/// with `"done": true` or when the byte stream ends; a transport error is
/// yielded once and ends the sequence.
pub fn decode_fragments<S, B, E>(chunks: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecoderState {
        chunks: Box::pin(chunks),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(bytes.as_ref());
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((
                        Err(Error::Network(format!("Generation stream interrupted: {}", e))),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    state.decode_line(&rest);
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, String>> + Send + 'static {
        let owned: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    async fn collect(parts: &[&str]) -> Vec<String> {
        decode_fragments(chunks(parts)).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_fragments_in_order() {
        let fragments = collect(&[
            "{\"response\":\"Hel\",\"done\":false}\n",
            "{\"response\":\"lo\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
        ])
        .await;
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let fragments = collect(&[
            "{\"respon",
            "se\":\"a\"}\n{\"response\":",
            "\"b\"}\n",
        ])
        .await;
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let fragments = collect(&[
            "{\"response\":\"one\"}\n",
            "this is not json\n",
            "\n",
            "{\"response\":\"two\"}\n",
        ])
        .await;
        assert_eq!(fragments, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_stops_at_done_marker() {
        let fragments = collect(&[
            "{\"response\":\"last\",\"done\":true}\n{\"response\":\"ignored\"}\n",
        ])
        .await;
        assert_eq!(fragments, vec!["last"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let fragments = collect(&["{\"response\":\"x\"}\n{\"response\":\"y\"}"]).await;
        assert_eq!(fragments, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"response\":\"partial\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"{\"response\":\"never\"}\n".to_vec()),
        ];
        let items: Vec<_> = decode_fragments(stream::iter(parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(Error::Network(_))));
    }
}
