use std::time::Instant;

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::catalog::ModelDescriptor;
use crate::engine::ArenaEngine;
use crate::events::ArenaEvent;
use crate::metrics;
use crate::provider::{ProviderEvent, ProviderRequest, ProviderStream, StreamTotals};

/// Generation parameters shared by every model of one run.
#[derive(Clone, Debug)]
pub struct RunParams {
    /// User prompt.
    pub prompt: String,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
    /// Maximum output tokens per model.
    pub max_tokens: u32,
    /// Sampling temperature; dropped for models flagged `no_temperature`.
    pub temperature: f64,
    /// Enables each provider's web-search tool.
    pub web_search: bool,
}

/// Runs every resolved model concurrently, pushing canonical events onto
/// `events` as they arrive, and emits `Done` once all runs have settled.
///
/// Events from one model never reorder relative to each other; interleaving
/// across models is whatever the runtime produces. A cancelled run emits no
/// terminal event. Sends after the receiver is gone are no-ops.
pub async fn run_fanout(
    engine: ArenaEngine,
    models: Vec<ModelDescriptor>,
    params: RunParams,
    events: mpsc::Sender<ArenaEvent>,
    cancel: watch::Receiver<bool>,
) {
    let run_id = uuid::Uuid::new_v4();
    debug!(run_id = %run_id, models = models.len(), "starting fan-out run");

    let mut tasks = Vec::with_capacity(models.len());
    for model in models {
        tasks.push(tokio::spawn(model_task(
            run_id,
            engine.clone(),
            model,
            params.clone(),
            events.clone(),
            cancel.clone(),
        )));
    }
    for task in tasks {
        let _ = task.await;
    }

    debug!(run_id = %run_id, "fan-out run settled");
    let _ = events.send(ArenaEvent::Done).await;
}

enum Outcome {
    Success(StreamTotals),
    Failed(String),
    Cancelled,
}

async fn model_task(
    run_id: uuid::Uuid,
    engine: ArenaEngine,
    model: ModelDescriptor,
    params: RunParams,
    events: mpsc::Sender<ArenaEvent>,
    mut cancel: watch::Receiver<bool>,
) {
    let model_id = model.id.clone();
    if !send_event(
        &events,
        ArenaEvent::Start {
            model_id: model_id.clone(),
        },
    )
    .await
    {
        return;
    }

    match stream_model(run_id, &engine, model.clone(), &params, &events, &mut cancel).await {
        Outcome::Success(totals) => {
            let metrics = metrics::compute(&totals, &model);
            debug!(
                run_id = %run_id,
                model = %model_id,
                total_ms = totals.total_ms,
                output_tokens = totals.output_tokens,
                "model run completed"
            );
            let _ = send_event(&events, ArenaEvent::Complete { model_id, metrics }).await;
        }
        Outcome::Failed(error) => {
            debug!(run_id = %run_id, model = %model_id, error = %error, "model run failed");
            let _ = send_event(&events, ArenaEvent::Error { model_id, error }).await;
        }
        Outcome::Cancelled => {
            debug!(run_id = %run_id, model = %model_id, "model run cancelled");
        }
    }
}

async fn stream_model(
    run_id: uuid::Uuid,
    engine: &ArenaEngine,
    model: ModelDescriptor,
    params: &RunParams,
    events: &mpsc::Sender<ArenaEvent>,
    cancel: &mut watch::Receiver<bool>,
) -> Outcome {
    let Some(adapter) = engine.adapter(model.provider) else {
        return Outcome::Failed(format!(
            "no adapter registered for provider {}",
            model.provider
        ));
    };

    let model_id = model.id.clone();
    let temperature = if model.no_temperature {
        None
    } else {
        Some(params.temperature)
    };
    let request = ProviderRequest {
        model,
        prompt: params.prompt.clone(),
        system_prompt: params.system_prompt.clone(),
        max_tokens: params.max_tokens,
        temperature,
        web_search: params.web_search,
    };

    debug!(run_id = %run_id, model = %model_id, "opening provider stream");
    let started = Instant::now();
    let opened = tokio::select! {
        _ = cancelled(cancel) => return Outcome::Cancelled,
        opened = adapter.open_stream(&request) => opened,
    };
    let stream = match opened {
        Ok(stream) => stream,
        Err(err) => return Outcome::Failed(err.to_string()),
    };

    drive_stream(&model_id, stream, started, events, cancel).await
}

async fn drive_stream(
    model_id: &str,
    mut stream: ProviderStream,
    started: Instant,
    events: &mpsc::Sender<ArenaEvent>,
    cancel: &mut watch::Receiver<bool>,
) -> Outcome {
    let mut totals = StreamTotals::default();
    let mut first_fragment_ms: Option<u64> = None;

    loop {
        let next = tokio::select! {
            _ = cancelled(cancel) => return Outcome::Cancelled,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(ProviderEvent::TextDelta { text })) => {
                if text.is_empty() {
                    continue;
                }
                first_fragment_ms.get_or_insert_with(|| elapsed_ms(started));
                totals.output.push_str(&text);
                let sent = send_event(
                    events,
                    ArenaEvent::Chunk {
                        model_id: model_id.to_string(),
                        content: text,
                    },
                )
                .await;
                if !sent {
                    return Outcome::Cancelled;
                }
            }
            Some(Ok(ProviderEvent::InputTokens(count))) => totals.input_tokens = count,
            Some(Ok(ProviderEvent::OutputTokens(count))) => totals.output_tokens = count,
            Some(Err(err)) => return Outcome::Failed(err.to_string()),
            None => {
                totals.ttft_ms = first_fragment_ms.unwrap_or(0);
                totals.total_ms = elapsed_ms(started);
                return Outcome::Success(totals);
            }
        }
    }
}

/// Resolves once cancellation is requested.
///
/// A closed channel counts as cancellation: the sender is owned by the
/// outbound stream writer, so its disappearance means the caller is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

async fn send_event(events: &mpsc::Sender<ArenaEvent>, event: ArenaEvent) -> bool {
    events.send(event).await.is_ok()
}
