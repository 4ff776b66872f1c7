//! # Model Catalog Handler
//!
//! Read-only listing of the model sizes and language selectors the UI
//! offers, plus which sizes are already resident in the cache.

use crate::state::AppState;
use crate::transcription::engine::SUPPORTED_LANGUAGES;
use crate::transcription::ModelSize;
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

/// List available model sizes and language selectors.
///
/// ## Endpoint: `GET /api/v1/models`
///
/// "loaded" reflects the cache at the time of the call: a size becomes
/// loaded after the first transcription that selects it and stays loaded
/// for the process lifetime.
pub async fn list_models(state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = state.get_config();
    let loaded = state.transcriber.loaded_sizes().await;

    let models: Vec<_> = ModelSize::ALL
        .iter()
        .map(|size| {
            json!({
                "name": size.to_string(),
                "description": size.description(),
                "size_mb": size.size_mb(),
                "loaded": loaded.contains(size),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "models": models,
        "languages": SUPPORTED_LANGUAGES,
        "defaults": {
            "model_size": config.models.default_size,
            "language": config.models.default_language,
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_size_has_catalog_metadata() {
        for size in ModelSize::ALL {
            assert!(!size.description().is_empty());
            assert!(size.size_mb() > 0);
        }
    }

    #[test]
    fn test_language_selectors_start_with_auto() {
        assert_eq!(SUPPORTED_LANGUAGES[0], "auto");
        assert_eq!(SUPPORTED_LANGUAGES.len(), 7);
    }
}
