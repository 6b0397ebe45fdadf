//! Streaming arena engine: fan one prompt out to several model backends,
//! normalize their incremental wire protocols into one canonical event
//! stream, and measure latency/token/cost metrics uniformly.
//!
//! The serving layer (HTTP, SSE out, static assets) lives in `arena-server`;
//! this crate owns everything between the run request and the ordered
//! canonical event sequence.

/// Model catalogue types and request-time id resolution.
pub mod catalog;
/// Incremental decoder from raw SSE bytes to `data:` payload lines.
pub mod decoder;
/// Adapter registry keyed by provider family.
pub mod engine;
/// Public error types used by the engine API.
pub mod errors;
/// Canonical stream events written to the caller.
pub mod events;
/// Fan-out orchestrator merging per-model runs onto one event sink.
pub mod fanout;
/// Pure latency/token/cost metrics computation.
pub mod metrics;
/// Provider adapter contracts shared by all vendor integrations.
pub mod provider;
/// Vendor-specific wire protocol adapters.
pub mod vendors;

pub use catalog::{Catalog, ModelDescriptor, ProviderFamily, ProviderInfo};
pub use engine::{ArenaEngine, EngineBuilder};
pub use errors::{CatalogError, EngineError, ProviderError};
pub use events::ArenaEvent;
pub use fanout::{RunParams, run_fanout};
pub use metrics::RunMetrics;
pub use provider::{
    ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStream, StreamTotals,
};
