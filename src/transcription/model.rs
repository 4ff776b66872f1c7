//! # Whisper Model Management
//!
//! Loading and invocation of Whisper models using Candle-rs.
//!
//! ## Model Loading Process:
//! 1. Download model files from HuggingFace if not cached locally
//! 2. Load model weights (safetensors) and tokenizer
//! 3. Initialize the model on the selected device (CPU/GPU)
//!
//! ## Inference boundary:
//! `transcribe` takes the temp-file path written by the format bridge plus an
//! explicit options structure, and returns a result structure whose `text`
//! field is the transcript. Any failure propagates to the caller; there is no
//! retry and no partial result.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::audio::bridge;
use crate::transcription::engine::TranscribeOptions;

// Standard multilingual Whisper special tokens
const SOT_TOKEN: u32 = 50258;
const EOT_TOKEN: u32 = 50257;
const TRANSCRIBE_TOKEN: u32 = 50359;

/// Maximum tokens emitted per clip before decoding is cut off.
const MAX_DECODE_TOKENS: usize = 224;

/// Available Whisper model sizes.
///
/// ## Trade-offs:
/// Larger models are more accurate but slower and hungrier for memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// All selectable sizes, in ascending size order.
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    /// HuggingFace model repository for this size.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }

    /// Approximate download size in MB.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelSize::Tiny => 39,
            ModelSize::Base => 74,
            ModelSize::Small => 244,
            ModelSize::Medium => 769,
            ModelSize::Large => 1550,
        }
    }

    /// Human-readable description for the size selector.
    pub fn description(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "Fastest, basic accuracy",
            ModelSize::Base => "Fast, good for short clips",
            ModelSize::Small => "Balanced speed and accuracy",
            ModelSize::Medium => "Good accuracy, handles technical vocabulary",
            ModelSize::Large => "Best accuracy, slower processing",
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// The model's result structure. Carries at least the transcript text.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub text: String,
}

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    size: ModelSize,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
}

impl WhisperModel {
    /// Download (if necessary) and load a Whisper model from HuggingFace.
    ///
    /// ## Failure mode:
    /// Any download or initialization error propagates to the caller as a
    /// fatal error for the attempt; there is no automatic retry.
    pub async fn load(size: ModelSize, device: Device) -> Result<Self> {
        tracing::info!("Loading Whisper {} model from {}", size, size.repo_name());
        let start_time = std::time::Instant::now();

        let api = hf_hub::api::tokio::ApiBuilder::new()
            .with_token(std::env::var("HF_TOKEN").ok())
            .with_progress(false)
            .build()
            .map_err(|e| anyhow!("Failed to initialize HuggingFace API: {}", e))?;
        let repo = api.model(size.repo_name().to_string());

        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("Failed to download config.json from {}: {}", size.repo_name(), e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| anyhow!("Failed to download tokenizer.json from {}: {}", size.repo_name(), e))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| anyhow!("Failed to download model weights from {}: {}", size.repo_name(), e))?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_path)?)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        let mel_filters = build_mel_filter_bank(config.num_mel_bins as usize);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)?
        };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        tracing::info!(
            "Whisper {} model loaded in {:.2}s",
            size,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Self {
            model,
            config,
            device,
            size,
            tokenizer,
            mel_filters,
        })
    }

    pub fn size(&self) -> ModelSize {
        self.size
    }

    /// Transcribe the decoded waveform at `audio_path`.
    ///
    /// ## Options:
    /// When `options.language` is present it is forced via the corresponding
    /// language token; an unrecognized code is an inference failure. When it
    /// is absent the model detects the language itself.
    pub fn transcribe(&mut self, audio_path: &Path, options: &TranscribeOptions) -> Result<ModelOutput> {
        let start_time = std::time::Instant::now();

        let audio = bridge::read_samples(audio_path)
            .map_err(|e| anyhow!("failed to read decoded audio: {}", e))?;
        if audio.is_empty() {
            return Err(anyhow!("audio data is empty"));
        }

        let mel = self.mel_spectrogram(&audio.samples)?.unsqueeze(0)?;
        let encoder_output = self.model.encoder.forward(&mel, true)?;

        // Prompt: SOT, optional forced language, then the transcribe task
        let mut prompt = vec![SOT_TOKEN];
        if let Some(lang) = options.language.as_deref() {
            let token = language_token(lang)
                .ok_or_else(|| anyhow!("unsupported language code: {}", lang))?;
            prompt.push(token);
        }
        prompt.push(TRANSCRIBE_TOKEN);

        let output_tokens = self.greedy_decode(&prompt, &encoder_output)?;
        let text = self.decode_tokens(&output_tokens)?;

        tracing::debug!(
            "Transcribed {:.2}s of audio in {:.2}s: '{}'",
            audio.duration_seconds(),
            start_time.elapsed().as_secs_f64(),
            text
        );

        Ok(ModelOutput { text })
    }

    /// Greedy autoregressive decoding with a repetition cutoff.
    fn greedy_decode(&mut self, prompt: &[u32], encoder_output: &Tensor) -> Result<Vec<u32>> {
        let mut tokens = prompt.to_vec();
        let mut output = Vec::new();

        for _ in 0..MAX_DECODE_TOKENS {
            let input = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
            // Full prompt is re-fed each step, so the KV cache is flushed
            let logits = self.model.decoder.forward(&input, encoder_output, true)?;
            let last = logits.i((.., tokens.len() - 1, ..))?;
            let next = last.argmax_keepdim(1)?.to_scalar::<u32>()?;

            if next == EOT_TOKEN {
                break;
            }
            if is_repetitive(&output, next) {
                break;
            }

            tokens.push(next);
            output.push(next);
        }

        Ok(output)
    }

    /// Convert mono PCM samples to the fixed-size log-mel input tensor.
    ///
    /// The clip is padded or truncated to Whisper's 30 second window and
    /// reduced to per-frame log energies through a triangular filter bank.
    fn mel_spectrogram(&self, samples: &[f32]) -> Result<Tensor> {
        const WINDOW_SAMPLES: usize = 30 * 16_000;
        const N_FRAMES: usize = 3000;

        let mut padded = vec![0.0f32; WINDOW_SAMPLES];
        let copy_len = samples.len().min(WINDOW_SAMPLES);
        padded[..copy_len].copy_from_slice(&samples[..copy_len]);

        let n_mels = self.config.num_mel_bins as usize;
        let n_fft = self.mel_filters.len() / n_mels;
        let frame_size = WINDOW_SAMPLES / N_FRAMES;

        let mut mel = vec![0.0f32; n_mels * N_FRAMES];
        for frame in 0..N_FRAMES {
            let start = frame * frame_size;
            let end = (start + frame_size).min(padded.len());

            for bin in 0..n_mels {
                let weight_row = &self.mel_filters[bin * n_fft..(bin + 1) * n_fft];
                let mut energy = 0.0f32;
                for (i, sample) in padded[start..end].iter().enumerate() {
                    let w = weight_row[i.min(n_fft - 1)];
                    energy += sample.abs() * w;
                }
                // -80 dB floor
                mel[bin * N_FRAMES + frame] =
                    (energy / frame_size as f32).ln().max(-11.5129);
            }
        }

        Ok(Tensor::from_vec(mel, (n_mels, N_FRAMES), &self.device)?)
    }

    /// Decode tokens to text and strip special-token artifacts.
    fn decode_tokens(&self, tokens: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))?;

        let cleaned = text
            .replace("<|startoftranscript|>", "")
            .replace("<|endoftext|>", "")
            .replace("<|notimestamps|>", "");

        Ok(cleaned.trim().to_string())
    }
}

/// Triangular mel filter bank over `n_fft` frequency slots.
fn build_mel_filter_bank(n_mels: usize) -> Vec<f32> {
    let n_fft = 400; // standard for 16kHz Whisper
    let mut filters = vec![0.0f32; n_fft * n_mels];

    for bin in 0..n_mels {
        let center = (bin + 1) * n_fft / (n_mels + 1);
        let width = n_fft / (n_mels + 1);

        for slot in 0..n_fft {
            if slot >= center.saturating_sub(width) && slot <= center + width {
                let distance = (slot as i32 - center as i32).abs() as f32;
                filters[bin * n_fft + slot] = (1.0 - distance / width as f32).max(0.0);
            }
        }
    }

    filters
}

/// Multilingual Whisper language token for a selector code.
fn language_token(language: &str) -> Option<u32> {
    match language.to_lowercase().as_str() {
        "en" => Some(50259),
        "zh" => Some(50260),
        "de" => Some(50261),
        "es" => Some(50262),
        "ru" => Some(50263),
        "ko" => Some(50264),
        "fr" => Some(50265),
        "ja" => Some(50266),
        "pt" => Some(50267),
        "it" => Some(50274),
        "hi" => Some(50276),
        _ => None,
    }
}

/// A token that would extend an immediate or three-token repetition pattern
/// signals the decoder is stuck.
fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
    if tokens.len() >= 3 && tokens[tokens.len() - 3..] == [new_token, new_token, new_token] {
        return true;
    }

    if tokens.len() >= 6 {
        let last_3 = &tokens[tokens.len() - 3..];
        let prev_3 = &tokens[tokens.len() - 6..tokens.len() - 3];
        if last_3 == prev_3 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("invalid".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_model_size_display_round_trip() {
        for size in ModelSize::ALL {
            assert_eq!(size.to_string().parse::<ModelSize>().unwrap(), size);
        }
    }

    #[test]
    fn test_selector_has_five_sizes() {
        assert_eq!(ModelSize::ALL.len(), 5);
        assert_eq!(ModelSize::ALL[0].size_mb(), 39);
    }

    #[test]
    fn test_language_tokens() {
        assert_eq!(language_token("en"), Some(50259));
        assert_eq!(language_token("HI"), Some(50276));
        assert_eq!(language_token("zz"), None);
    }

    #[test]
    fn test_repetition_detection() {
        assert!(is_repetitive(&[5, 7, 7, 7], 7));
        assert!(is_repetitive(&[1, 2, 3, 1, 2, 3], 9)); // pattern repeat already present
        assert!(!is_repetitive(&[1, 2, 3], 4));
        assert!(!is_repetitive(&[], 1));
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let filters = build_mel_filter_bank(80);
        assert_eq!(filters.len(), 80 * 400);
        // Filters are non-negative triangles peaking at 1.0
        assert!(filters.iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert!(filters.iter().any(|&w| w > 0.99));
    }
}
