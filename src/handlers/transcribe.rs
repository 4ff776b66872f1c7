//! # Transcription Handler
//!
//! The one endpoint that runs the whole pipeline: recorded clip in,
//! transcript out. One explicit request per user "Transcribe" action.

use crate::audio::clip::AudioClip;
use crate::error::AppError;
use crate::state::AppState;
use crate::transcription::{LanguageHint, ModelSize};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;

/// Transcribe a recorded audio clip.
///
/// ## Endpoint: `POST /api/v1/transcribe`
///
/// ## Request:
/// Multipart form data with:
/// - `audio`: the recorded clip (WAV container, or raw PCM16 with an
///   "audio/pcm" content type)
/// - `model_size` (optional): one of tiny/base/small/medium/large
/// - `language` (optional): "auto" or a language code
///
/// Missing selector fields fall back to the configured defaults.
///
/// ## Response:
/// ```json
/// {
///   "success": true,
///   "transcription": {
///     "text": "Hello, this is a test.",
///     "language": "en",
///     "model": "base",
///     "audio_duration_seconds": 3.2,
///     "processing_time_ms": 1500
///   }
/// }
/// ```
///
/// ## Failure modes:
/// - Empty or oversized clip → 400 before anything is decoded
/// - Undecodable audio → 400, the user must re-record
/// - Model load or inference failure → 500, nothing is retried
pub async fn transcribe(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    let mut audio_bytes: Option<Vec<u8>> = None;
    let mut audio_content_type: Option<String> = None;
    let mut model_size_field: Option<String> = None;
    let mut language_field: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .ok_or_else(|| AppError::BadRequest("Missing field name".to_string()))?
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
            bytes.extend_from_slice(&chunk);

            if field_name == "audio" && bytes.len() > config.audio.max_clip_bytes {
                return Err(AppError::ValidationError(format!(
                    "Clip too large (max: {} bytes)",
                    config.audio.max_clip_bytes
                )));
            }
        }

        match field_name.as_str() {
            "audio" => {
                audio_content_type = field.content_type().map(|mime| mime.to_string());
                audio_bytes = Some(bytes);
            }
            "model_size" => model_size_field = Some(text_field(&field_name, bytes)?),
            "language" => language_field = Some(text_field(&field_name, bytes)?),
            _ => {} // unknown fields are ignored
        }
    }

    let clip = AudioClip::new(
        audio_bytes.ok_or_else(|| AppError::BadRequest("No audio field provided".to_string()))?,
        audio_content_type,
    );

    // A zero-length recording must never reach the invoker
    if clip.is_empty() {
        return Err(AppError::BadRequest("Nothing recorded yet".to_string()));
    }

    let size: ModelSize = model_size_field
        .unwrap_or_else(|| config.models.default_size.clone())
        .parse()
        .map_err(|e| AppError::ValidationError(format!("Invalid model size: {}", e)))?;

    let hint = LanguageHint::parse(
        &language_field.unwrap_or_else(|| config.models.default_language.clone()),
    );

    tracing::info!(
        "Transcribe request: {} byte clip, model={}, language={}",
        clip.len(),
        size,
        hint
    );

    state.transcription_started();
    let result = state
        .transcriber
        .transcribe_clip(&clip, size, &hint, &config.audio.temp_path())
        .await;
    state.transcription_finished();

    let outcome = result?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "transcription": outcome,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Decode a multipart text field as UTF-8.
fn text_field(name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
    String::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_trims_whitespace() {
        let value = text_field("language", b" en \n".to_vec()).unwrap();
        assert_eq!(value, "en");
    }

    #[test]
    fn test_text_field_rejects_invalid_utf8() {
        assert!(text_field("language", vec![0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_empty_clip_is_rejected_before_invocation() {
        let clip = AudioClip::new(Vec::new(), Some("audio/wav".to_string()));
        assert!(clip.is_empty());
    }
}
