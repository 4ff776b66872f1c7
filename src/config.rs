//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::transcription::model::ModelSize;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, models, audio)
/// makes it easier to understand and maintain as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub audio: AudioConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Model configuration settings.
///
/// ## Fields:
/// - `default_size`: Whisper model the UI preselects ("tiny", "base", "small", "medium", "large")
/// - `default_language`: language hint the UI preselects ("auto" or an ISO code)
/// - `device`: compute device preference ("auto", "cpu", "cuda", "metal")
///
/// ## Model size trade-offs:
/// - Smaller models: faster processing, less memory, lower accuracy
/// - Larger models: slower processing, more memory, higher accuracy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub default_size: String,
    pub default_language: String,
    pub device: String,
}

/// Audio handling configuration.
///
/// ## Fields:
/// - `temp_dir`: working-directory-relative directory holding the decoded waveform
/// - `temp_file`: file name of the decoded waveform inside `temp_dir`
/// - `max_clip_bytes`: upload size ceiling for a recorded clip
///
/// Only one clip is processed at a time, so a single overwrite-in-place
/// temp path is sufficient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub temp_dir: String,
    pub temp_file: String,
    pub max_clip_bytes: usize,
}

impl AudioConfig {
    /// Full path of the decoded-waveform temp file.
    pub fn temp_path(&self) -> PathBuf {
        PathBuf::from(&self.temp_dir).join(&self.temp_file)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            models: ModelsConfig {
                default_size: "base".to_string(),     // Good balance for interactive use
                default_language: "auto".to_string(), // Let the model detect the language
                device: "auto".to_string(),
            },
            audio: AudioConfig {
                temp_dir: "audio".to_string(),
                temp_file: "temp_audio.wav".to_string(),
                max_clip_bytes: 50 * 1024 * 1024, // 50MB is generous for a short clip
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_MODELS_DEFAULT_SIZE=small`: Override the preselected model
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be bound)
    /// - Default model size parses to a known Whisper size
    /// - Temp directory/file names are not empty
    /// - Clip size ceiling is not zero
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        self.models
            .default_size
            .parse::<ModelSize>()
            .map_err(|e| anyhow::anyhow!("Invalid default model size: {}", e))?;

        if self.audio.temp_dir.is_empty() || self.audio.temp_file.is_empty() {
            return Err(anyhow::anyhow!("Audio temp path cannot be empty"));
        }

        if self.audio.max_clip_bytes == 0 {
            return Err(anyhow::anyhow!("Max clip size must be greater than 0"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// Only the fields present in the JSON are changed. For example,
    /// `{"models": {"default_size": "small"}}` switches the preselected model
    /// and leaves everything else alone. The updated configuration is
    /// re-validated before it is accepted.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(models) = partial_config.get("models") {
            if let Some(size) = models.get("default_size").and_then(|v| v.as_str()) {
                self.models.default_size = size.to_string();
            }
            if let Some(language) = models.get("default_language").and_then(|v| v.as_str()) {
                self.models.default_language = language.to_string();
            }
            if let Some(device) = models.get("device").and_then(|v| v.as_str()) {
                self.models.device = device.to_string();
            }
        }

        if let Some(audio) = partial_config.get("audio") {
            if let Some(dir) = audio.get("temp_dir").and_then(|v| v.as_str()) {
                self.audio.temp_dir = dir.to_string();
            }
            if let Some(file) = audio.get("temp_file").and_then(|v| v.as_str()) {
                self.audio.temp_file = file.to_string();
            }
            if let Some(max) = audio.get("max_clip_bytes").and_then(|v| v.as_u64()) {
                self.audio.max_clip_bytes = max as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.models.default_size, "base");
        assert_eq!(config.models.default_language, "auto");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.models.default_size = "gigantic".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.temp_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"models": {"default_size": "small"}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.models.default_size, "small");
        // Other fields should remain unchanged
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"models": {"default_size": "gigantic"}}"#;
        assert!(config.update_from_json(json).is_err());
    }

    #[test]
    fn test_temp_path() {
        let config = AppConfig::default();
        assert_eq!(
            config.audio.temp_path(),
            PathBuf::from("audio").join("temp_audio.wav")
        );
    }
}
