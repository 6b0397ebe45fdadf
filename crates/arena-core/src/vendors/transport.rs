use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;

use crate::catalog::ProviderFamily;
use crate::decoder::SseLineDecoder;
use crate::errors::ProviderError;
use crate::provider::{ProviderEvent, ProviderStream};

pub(crate) type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Upper bound on how much of a provider error body is embedded in messages.
const ERROR_BODY_PREFIX_CHARS: usize = 300;

/// Truncates an error body to a bounded prefix, on a character boundary.
pub(crate) fn error_body_prefix(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_PREFIX_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Passes a 2xx response through; otherwise reads the error body and fails
/// with its bounded prefix embedded.
pub(crate) async fn ensure_success(
    family: ProviderFamily,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ProviderError::provider(
        family,
        format!("{}: {}", status.as_u16(), error_body_prefix(&body)),
        Some(status.as_u16()),
    ))
}

/// Turns a raw response byte stream into provider events using a per-family
/// frame mapper.
///
/// Payload lines that fail to parse as JSON are skipped: providers interleave
/// keep-alive and metadata frames this engine does not need to understand.
/// An `Err` from the mapper (an in-band provider error) terminates the stream.
pub(crate) fn frame_event_stream<F>(
    family: ProviderFamily,
    bytes_stream: ByteStream,
    map_frame: F,
) -> ProviderStream
where
    F: Fn(&serde_json::Value) -> Result<Vec<ProviderEvent>, ProviderError> + Send + 'static,
{
    struct State<F> {
        family: ProviderFamily,
        bytes_stream: ByteStream,
        decoder: SseLineDecoder,
        pending: VecDeque<ProviderEvent>,
        done: bool,
        map_frame: F,
    }

    fn queue_payload<F>(state: &mut State<F>, payload: &str) -> Result<(), ProviderError>
    where
        F: Fn(&serde_json::Value) -> Result<Vec<ProviderEvent>, ProviderError>,
    {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
            return Ok(());
        };
        for event in (state.map_frame)(&value)? {
            state.pending.push_back(event);
        }
        Ok(())
    }

    Box::pin(stream::try_unfold(
        State {
            family,
            bytes_stream,
            decoder: SseLineDecoder::default(),
            pending: VecDeque::new(),
            done: false,
            map_frame,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for payload in state.decoder.push_chunk(&chunk) {
                            queue_payload(&mut state, &payload)?;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(
                            state.family,
                            format!("streaming read failed: {e}"),
                        ));
                    }
                    None => {
                        if let Some(payload) = state.decoder.finish() {
                            queue_payload(&mut state, &payload)?;
                        }
                        state.done = true;
                    }
                }
            }
        },
    ))
}
