use std::path::PathBuf;

use crate::catalog::ProviderFamily;

/// Errors raised by a provider adapter for one model run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The family's credential is absent from the environment. Raised before
    /// any network call is attempted.
    #[error("{env_key} not configured")]
    MissingCredential { env_key: &'static str },
    /// Transport or stream I/O failed.
    #[error("transport error ({family}): {message}")]
    Transport {
        family: ProviderFamily,
        message: String,
    },
    /// Provider returned an application-level failure (HTTP status or an
    /// in-band error frame).
    #[error("provider error ({family}): {message}")]
    Provider {
        family: ProviderFamily,
        message: String,
        status_code: Option<u16>,
    },
}

impl ProviderError {
    /// Creates a missing-credential error.
    pub fn missing_credential(env_key: &'static str) -> Self {
        Self::MissingCredential { env_key }
    }

    /// Creates a transport-level error.
    pub fn transport(family: ProviderFamily, message: impl Into<String>) -> Self {
        Self::Transport {
            family,
            message: message.into(),
        }
    }

    /// Creates a provider-level error.
    pub fn provider(
        family: ProviderFamily,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            family,
            message: message.into(),
            status_code,
        }
    }
}

/// Errors from building the engine's adapter registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Invalid adapter registration.
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from loading the model catalogue file.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalogue file could not be read.
    #[error("failed to read model catalogue at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The catalogue file is not valid JSON for the expected shape.
    #[error("failed to parse model catalogue at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
