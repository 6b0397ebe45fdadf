//! The run endpoint: fan one prompt out and stream canonical events back.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::{Sse, sse::Event},
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use arena_core::{ArenaEvent, RunParams, run_fanout};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub prompt: String,
    /// Requested model ids; unknown ids are silently dropped.
    pub models: Vec<String>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub web_search: bool,
}

fn default_max_tokens() -> u32 {
    4096
}

/// Fires the cancellation signal when the caller goes away.
///
/// The guard lives inside the response stream, so dropping the response —
/// including on client disconnect — cancels every in-flight provider call.
/// Sending twice is safe; a completed run ignores the signal.
struct DisconnectGuard {
    cancel: watch::Sender<bool>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}

pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt must not be empty"));
    }

    let catalog = state.load_catalog()?;
    let models = catalog.resolve(&req.models);
    debug!(
        requested = req.models.len(),
        resolved = models.len(),
        "starting arena run"
    );

    let params = RunParams {
        prompt: req.prompt,
        system_prompt: Some(req.system_prompt)
            .filter(|s| !s.trim().is_empty()),
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        web_search: req.web_search,
    };

    let (event_tx, mut event_rx) = mpsc::channel::<ArenaEvent>(128);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(run_fanout(
        state.engine.clone(),
        models,
        params,
        event_tx,
        cancel_rx,
    ));

    let guard = DisconnectGuard { cancel: cancel_tx };
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = event_rx.recv().await {
            let done = matches!(event, ArenaEvent::Done);
            let payload = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().data(payload));
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default()))
}
