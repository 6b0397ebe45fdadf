use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::ProviderFamily;
use crate::errors::EngineError;
use crate::provider::ProviderAdapter;

pub(crate) struct EngineInner {
    adapters: HashMap<ProviderFamily, Arc<dyn ProviderAdapter>>,
}

/// Registry of provider adapters, selected per model at orchestration time.
#[derive(Clone)]
pub struct ArenaEngine {
    inner: Arc<EngineInner>,
}

impl ArenaEngine {
    /// Starts a builder for registering adapters.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Returns the adapter for a family, if one is registered.
    pub fn adapter(&self, family: ProviderFamily) -> Option<Arc<dyn ProviderAdapter>> {
        self.inner.adapters.get(&family).cloned()
    }
}

/// Builder used to register adapters before creating an `ArenaEngine`.
#[derive(Default)]
pub struct EngineBuilder {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl EngineBuilder {
    /// Registers one adapter. Register at most one adapter per family.
    pub fn register(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Builds the engine, rejecting duplicate family registrations.
    pub fn build(self) -> Result<ArenaEngine, EngineError> {
        let mut map: HashMap<ProviderFamily, Arc<dyn ProviderAdapter>> = HashMap::new();
        for adapter in self.adapters {
            let family = adapter.family();
            if map.insert(family, adapter).is_some() {
                return Err(EngineError::Config(format!(
                    "duplicate adapter registration: {family}"
                )));
            }
        }
        Ok(ArenaEngine {
            inner: Arc::new(EngineInner { adapters: map }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::{ProviderRequest, ProviderStream};

    struct DummyAdapter;

    #[async_trait::async_trait]
    impl ProviderAdapter for DummyAdapter {
        fn family(&self) -> ProviderFamily {
            ProviderFamily::OpenAi
        }

        async fn open_stream(
            &self,
            _req: &ProviderRequest,
        ) -> Result<ProviderStream, ProviderError> {
            unreachable!("not used in this test")
        }
    }

    #[test]
    fn build_rejects_duplicate_family_registrations() {
        let result = ArenaEngine::builder()
            .register(Arc::new(DummyAdapter))
            .register(Arc::new(DummyAdapter))
            .build();
        assert!(
            matches!(result, Err(EngineError::Config(message)) if message.contains("duplicate adapter"))
        );
    }

    #[test]
    fn adapter_lookup_misses_unregistered_families() {
        let engine = ArenaEngine::builder()
            .register(Arc::new(DummyAdapter))
            .build()
            .expect("build engine");
        assert!(engine.adapter(ProviderFamily::OpenAi).is_some());
        assert!(engine.adapter(ProviderFamily::Google).is_none());
    }
}
