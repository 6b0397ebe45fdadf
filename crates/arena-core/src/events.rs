use serde::Serialize;

use crate::metrics::RunMetrics;

/// Canonical, protocol-agnostic stream event.
///
/// Every per-model run emits exactly one `Start`, zero or more `Chunk`s, and
/// exactly one of `Complete`/`Error`; a single `Done` trails the whole run.
/// Serialized externally as `{"type": "...", ...}` records with camelCase
/// field names.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArenaEvent {
    /// Emitted once per model before any provider bytes arrive.
    #[serde(rename_all = "camelCase")]
    Start { model_id: String },
    /// One fragment of generated text, in generation order.
    #[serde(rename_all = "camelCase")]
    Chunk { model_id: String, content: String },
    /// Terminal success event carrying the derived metrics.
    #[serde(rename_all = "camelCase")]
    Complete {
        model_id: String,
        #[serde(flatten)]
        metrics: RunMetrics,
    },
    /// Terminal failure event with a human-readable message.
    #[serde(rename_all = "camelCase")]
    Error { model_id: String, error: String },
    /// Emitted exactly once after all per-model outcomes have resolved.
    Done,
}
