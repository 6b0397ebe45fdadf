//! Shared application state.

use std::path::PathBuf;

use arena_core::{ArenaEngine, Catalog, CatalogError};

/// Shared state handed to every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Adapter registry, one adapter per provider family.
    pub engine: ArenaEngine,
    /// Path to the model catalogue file.
    pub catalog_path: PathBuf,
}

impl AppState {
    pub fn new(engine: ArenaEngine, catalog_path: PathBuf) -> Self {
        Self {
            engine,
            catalog_path,
        }
    }

    /// Loads the catalogue fresh for one request, so edits to the file are
    /// picked up without a restart.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::load(&self.catalog_path)
    }
}
