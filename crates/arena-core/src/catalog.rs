use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Backend protocol dialect a model is reached through.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// Anthropic message-stream protocol.
    Anthropic,
    /// OpenAI response-object protocol.
    OpenAi,
    /// Google candidate-stream protocol.
    Google,
}

impl ProviderFamily {
    /// Returns the catalogue key for this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the model catalogue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Provider-side model identifier, also the tag on every stream event.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Protocol family the model is served through.
    pub provider: ProviderFamily,
    /// Dollars per million input tokens.
    #[serde(rename = "inputCostPer1M")]
    pub input_cost_per_1m: f64,
    /// Dollars per million output tokens.
    #[serde(rename = "outputCostPer1M")]
    pub output_cost_per_1m: f64,
    /// Set for models that reject a temperature parameter.
    #[serde(default)]
    pub no_temperature: bool,
}

/// Display metadata for a provider family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    /// Display name.
    pub name: String,
    /// Environment variable holding the family's credential.
    pub env_key: String,
}

/// Static model catalogue, loaded per request from a JSON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// Provider display metadata keyed by family.
    pub providers: HashMap<ProviderFamily, ProviderInfo>,
    /// All known models.
    pub models: Vec<ModelDescriptor>,
}

impl Catalog {
    /// Reads and parses a catalogue file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves requested model ids against the catalogue.
    ///
    /// Unknown ids are silently dropped and duplicate ids collapse to their
    /// first occurrence; request order is preserved otherwise.
    pub fn resolve(&self, ids: &[String]) -> Vec<ModelDescriptor> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut resolved = Vec::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(model) = self.models.iter().find(|m| m.id == *id) {
                resolved.push(model.clone());
            }
        }
        resolved
    }
}
