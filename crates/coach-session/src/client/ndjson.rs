//! Decoding of the chat relay's NDJSON stream into text deltas.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use coach_core::{CompletionError, StreamFrame, TokenStream};
use futures_util::{Stream, StreamExt};

struct DecodeState<S> {
    stream: S,
    buf: BytesMut,
    finished: bool,
}

/// Turn a byte stream of [`StreamFrame`] lines into a [`TokenStream`].
///
/// Empty deltas are skipped. A `done` frame ends the stream, an `error`
/// frame ends it with [`CompletionError::Interrupted`], and a connection
/// that closes without either also counts as interrupted.
pub(crate) fn token_stream<S, E>(byte_stream: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            if let Some(line_end) = st.buf.iter().position(|b| *b == b'\n') {
                let line = st.buf.split_to(line_end + 1);
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }

                match serde_json::from_str::<StreamFrame>(text) {
                    Ok(StreamFrame::Delta { content }) => {
                        if content.is_empty() {
                            continue;
                        }
                        return Some((Ok(content), st));
                    }
                    Ok(StreamFrame::Done) => {
                        st.finished = true;
                        return None;
                    }
                    Ok(StreamFrame::Error { message }) => {
                        st.finished = true;
                        return Some((Err(CompletionError::Interrupted(message)), st));
                    }
                    Err(e) => {
                        st.finished = true;
                        return Some((
                            Err(CompletionError::Protocol(format!("{e}: {text}"))),
                            st,
                        ));
                    }
                }
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(CompletionError::Network(e.to_string())), st));
                }
                None => {
                    // Last line without a trailing newline.
                    if st.buf.iter().any(|b| !b.is_ascii_whitespace()) {
                        st.buf.extend_from_slice(b"\n");
                        continue;
                    }
                    st.finished = true;
                    return Some((
                        Err(CompletionError::Interrupted(
                            "connection closed before the response finished".to_string(),
                        )),
                        st,
                    ));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    async fn collect(parts: &[&'static str]) -> Vec<Result<String, CompletionError>> {
        let chunks: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        token_stream(stream::iter(chunks)).collect().await
    }

    #[tokio::test]
    async fn deltas_arrive_in_order() {
        let items = collect(&[
            "{\"type\":\"delta\",\"content\":\"Hel\"}\n{\"type\":\"del",
            "ta\",\"content\":\"lo\"}\n",
            "{\"type\":\"delta\",\"content\":\"\"}\n",
            "{\"type\":\"done\"}\n",
        ])
        .await;
        assert_eq!(items, vec![Ok("Hel".to_string()), Ok("lo".to_string())]);
    }

    #[tokio::test]
    async fn error_frame_ends_the_stream() {
        let items = collect(&[
            "{\"type\":\"delta\",\"content\":\"Hi\"}\n",
            "{\"type\":\"error\",\"message\":\"rate limited\"}\n",
            "{\"type\":\"delta\",\"content\":\"ignored\"}\n",
        ])
        .await;
        assert_eq!(
            items,
            vec![
                Ok("Hi".to_string()),
                Err(CompletionError::Interrupted("rate limited".into()))
            ]
        );
    }

    #[tokio::test]
    async fn final_frame_without_newline_is_read() {
        let items = collect(&["{\"type\":\"delta\",\"content\":\"A\"}\n{\"type\":\"done\"}"]).await;
        assert_eq!(items, vec![Ok("A".to_string())]);
    }

    #[tokio::test]
    async fn truncated_stream_is_interrupted() {
        let items = collect(&["{\"type\":\"delta\",\"content\":\"A\"}\n"]).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(CompletionError::Interrupted(_))));
    }

    #[tokio::test]
    async fn garbage_is_a_protocol_error() {
        let items = collect(&["not json\n"]).await;
        assert!(matches!(
            items.as_slice(),
            [Err(CompletionError::Protocol(_))]
        ));
    }
}
