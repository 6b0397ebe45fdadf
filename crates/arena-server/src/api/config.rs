//! The config endpoint: provider credential status and the model catalogue.

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde::Serialize;

use arena_core::{ModelDescriptor, ProviderFamily, ProviderInfo};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    #[serde(flatten)]
    pub info: ProviderInfo,
    /// Whether the family's credential is present in the environment. The
    /// value itself is never echoed back.
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub providers: HashMap<ProviderFamily, ProviderStatus>,
    pub models: Vec<ModelDescriptor>,
}

pub async fn config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, ApiError> {
    let catalog = state.load_catalog()?;
    let providers = catalog
        .providers
        .into_iter()
        .map(|(family, info)| {
            let configured = std::env::var(&info.env_key)
                .is_ok_and(|value| !value.trim().is_empty());
            (family, ProviderStatus { info, configured })
        })
        .collect();
    Ok(Json(ConfigResponse {
        providers,
        models: catalog.models,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_flattens_info_and_adds_configured() {
        let status = ProviderStatus {
            info: ProviderInfo {
                name: "Anthropic".to_string(),
                env_key: "ANTHROPIC_API_KEY".to_string(),
            },
            configured: false,
        };
        let value = serde_json::to_value(&status).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "name": "Anthropic",
                "envKey": "ANTHROPIC_API_KEY",
                "configured": false
            })
        );
    }
}
