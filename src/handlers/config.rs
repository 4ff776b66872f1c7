//! # Configuration Handlers
//!
//! Read and update the running configuration over HTTP. Updates are
//! partial: only the fields present in the request body change.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Get the current application configuration.
///
/// ## Endpoint: `GET /api/v1/config`
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port,
        },
        "models": {
            "default_size": config.models.default_size,
            "default_language": config.models.default_language,
            "device": config.models.device,
        },
        "audio": {
            "temp_dir": config.audio.temp_dir,
            "temp_file": config.audio.temp_file,
            "max_clip_bytes": config.audio.max_clip_bytes,
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Update the application configuration at runtime.
///
/// ## Endpoint: `PUT /api/v1/config`
///
/// Accepts a partial configuration, e.g.
/// `{"models": {"default_size": "small"}}`. The merged result is
/// validated before it replaces the live configuration; an invalid
/// update leaves the running configuration untouched.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let mut config = state.get_config();

    let json_str = serde_json::to_string(&body.into_inner())?;
    config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(config.clone())
        .map_err(AppError::ValidationError)?;

    tracing::info!(
        "Configuration updated: default_size={}, default_language={}",
        config.models.default_size,
        config.models.default_language
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Configuration updated",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
