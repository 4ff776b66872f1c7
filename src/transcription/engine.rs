//! # Transcription Invoker
//!
//! Drives one transcription attempt end to end: decode the recorded clip,
//! write the temp waveform, obtain the model from the cache, build the
//! options structure, and call the model's inference entry point.
//!
//! ## Failure modes:
//! Each stage maps onto the error taxonomy: decode problems abort with
//! `Decode`, loader problems with `ModelLoad`, and anything raised by the
//! model call itself with `Inference`. Nothing is retried.

use candle_core::Device;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::audio::bridge;
use crate::audio::clip::AudioClip;
use crate::error::{AppError, AppResult};
use crate::transcription::cache::ModelCache;
use crate::transcription::model::{ModelSize, WhisperModel};

/// The seven language selector values offered by the UI.
pub const SUPPORTED_LANGUAGES: [&str; 7] = ["auto", "en", "hi", "fr", "de", "es", "zh"];

/// Language hint attached to a transcription request.
///
/// Either a code passed through to the model verbatim, or the `auto`
/// sentinel requesting automatic detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageHint {
    /// Let the model detect the spoken language
    Auto,
    /// Expect this language code
    Code(String),
}

impl LanguageHint {
    /// Parse a selector value; "auto" (any case) is the detection sentinel,
    /// everything else is treated as a code and passed through verbatim.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("auto") {
            LanguageHint::Auto
        } else {
            LanguageHint::Code(s.to_string())
        }
    }
}

impl std::str::FromStr for LanguageHint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LanguageHint::parse(s))
    }
}

impl std::fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageHint::Auto => write!(f, "auto"),
            LanguageHint::Code(code) => write!(f, "{}", code),
        }
    }
}

/// Explicit options passed to the model's transcription entry point.
///
/// The `auto` hint omits the language field entirely; any other hint is
/// carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscribeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TranscribeOptions {
    pub fn from_hint(hint: &LanguageHint) -> Self {
        match hint {
            LanguageHint::Auto => Self { language: None },
            LanguageHint::Code(code) => Self {
                language: Some(code.clone()),
            },
        }
    }
}

/// Result of one transcription attempt, shaped for the API response.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionOutcome {
    /// The transcribed text (may be empty for silent audio)
    pub text: String,

    /// Language hint that was applied ("auto" when detection was requested)
    pub language: String,

    /// Model size that produced the transcript
    pub model: String,

    /// Duration of the decoded clip in seconds
    pub audio_duration_seconds: f64,

    /// Wall-clock time of the whole attempt in milliseconds
    pub processing_time_ms: u64,
}

/// High-level transcriber owning the model cache and the inference device.
///
/// One instance lives in the application state for the process lifetime;
/// every transcribe request flows through it serially from the UI's point
/// of view, though the cache itself tolerates concurrent first loads.
pub struct Transcriber {
    cache: ModelCache<Mutex<WhisperModel>>,
    device: Device,
}

impl Transcriber {
    pub fn new(device: Device) -> Self {
        Self {
            cache: ModelCache::new(),
            device,
        }
    }

    /// Model sizes currently loaded in this session.
    pub async fn loaded_sizes(&self) -> Vec<ModelSize> {
        self.cache.cached_sizes().await
    }

    /// Run one full transcription attempt for a recorded clip.
    ///
    /// ## Steps:
    /// 1. Decode the clip to raw samples plus sample rate (format bridge)
    /// 2. Write the decoded waveform to `temp_path`, creating directories
    /// 3. Load-or-get the model for `size` (memoized, single-flight)
    /// 4. Build options from the hint and invoke the model with the path
    ///
    /// An empty clip never reaches the model: the bridge rejects it during
    /// decoding even if the caller's own check was skipped.
    pub async fn transcribe_clip(
        &self,
        clip: &AudioClip,
        size: ModelSize,
        hint: &LanguageHint,
        temp_path: &Path,
    ) -> AppResult<TranscriptionOutcome> {
        let start_time = Instant::now();

        let decoded = bridge::decode_clip(clip)?;
        tracing::debug!(
            "Decoded clip: {} samples at {} Hz ({:.2}s)",
            decoded.samples.len(),
            decoded.sample_rate,
            decoded.duration_seconds()
        );

        bridge::write_temp(&decoded, temp_path)?;

        let device = self.device.clone();
        let model = self
            .cache
            .get_or_load(size, || async move {
                WhisperModel::load(size, device).await.map(Mutex::new)
            })
            .await
            .map_err(|e| AppError::ModelLoad(e.to_string()))?;

        let options = TranscribeOptions::from_hint(hint);
        let output = {
            let mut model = model.lock().await;
            model
                .transcribe(temp_path, &options)
                .map_err(|e| AppError::Inference(e.to_string()))?
        };

        let outcome = TranscriptionOutcome {
            text: output.text,
            language: hint.to_string(),
            model: size.to_string(),
            audio_duration_seconds: decoded.duration_seconds(),
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Transcription completed: {:.2}s audio -> {} chars in {}ms ({} model)",
            outcome.audio_duration_seconds,
            outcome.text.len(),
            outcome.processing_time_ms,
            outcome.model
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_hint_omits_language() {
        let options = TranscribeOptions::from_hint(&LanguageHint::Auto);
        assert_eq!(options.language, None);

        // The serialized options mapping must not contain a language key
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_code_hint_passes_through_verbatim() {
        let hint: LanguageHint = "en".parse().unwrap();
        let options = TranscribeOptions::from_hint(&hint);
        assert_eq!(options.language.as_deref(), Some("en"));

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json, serde_json::json!({"language": "en"}));
    }

    #[test]
    fn test_hint_parsing() {
        assert_eq!("auto".parse::<LanguageHint>().unwrap(), LanguageHint::Auto);
        assert_eq!("AUTO".parse::<LanguageHint>().unwrap(), LanguageHint::Auto);
        assert_eq!(
            "hi".parse::<LanguageHint>().unwrap(),
            LanguageHint::Code("hi".to_string())
        );
    }

    #[test]
    fn test_hint_display() {
        assert_eq!(LanguageHint::Auto.to_string(), "auto");
        assert_eq!(LanguageHint::Code("fr".into()).to_string(), "fr");
    }

    #[test]
    fn test_supported_language_selector() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 7);
        assert_eq!(SUPPORTED_LANGUAGES[0], "auto");
    }
}
