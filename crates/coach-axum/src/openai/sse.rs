//! Server-Sent Events decoding for streamed chat completions.
//!
//! Upstream format, one event per `data:` line:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"},"index":0}]}
//!
//! data: {"choices":[{"delta":{},"finish_reason":"stop","index":0}]}
//!
//! data: [DONE]
//! ```

use bytes::{Bytes, BytesMut};
use coach_core::{CompletionError, TokenStream};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<UpstreamError>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct UpstreamError {
    message: String,
}

/// State threaded through the `unfold` stream.
struct SseState<S> {
    stream: S,
    buf: BytesMut,
    /// A choice reported `finish_reason`; EOF after this is a clean end.
    finished_reason: bool,
    done: bool,
}

fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|i| i + 1)
}

/// Decode an upstream SSE byte stream into text deltas.
pub fn delta_stream<S, E>(byte_stream: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        finished_reason: false,
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                let line_str = String::from_utf8_lossy(&line);
                let trimmed = line_str.trim();

                // Blank separators, comments and non-data fields.
                let Some(data) = trimmed.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();

                if data == "[DONE]" {
                    st.done = true;
                    return None;
                }

                let chunk: Chunk = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        st.done = true;
                        return Some((
                            Err(CompletionError::Protocol(format!("{e}: {data}"))),
                            st,
                        ));
                    }
                };

                if let Some(error) = chunk.error {
                    st.done = true;
                    return Some((Err(CompletionError::Interrupted(error.message)), st));
                }

                let mut text = String::new();
                for choice in chunk.choices {
                    if choice.finish_reason.is_some() {
                        st.finished_reason = true;
                    }
                    if let Some(content) = choice.delta.content {
                        text.push_str(&content);
                    }
                }
                if text.is_empty() {
                    continue;
                }
                return Some((Ok(text), st));
            }

            match st.stream.next().await {
                Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(CompletionError::Network(e.to_string())), st));
                }
                None => {
                    if st.buf.iter().any(|b| !b.is_ascii_whitespace()) {
                        st.buf.extend_from_slice(b"\n");
                        continue;
                    }
                    st.done = true;
                    if st.finished_reason {
                        return None;
                    }
                    tracing::warn!("Upstream stream closed without a finish marker");
                    return Some((
                        Err(CompletionError::Interrupted(
                            "upstream closed the stream early".to_string(),
                        )),
                        st,
                    ));
                }
            }
        }
    })
    .boxed()
}
