//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler.
//!
//! ## The Arc<RwLock<T>> Pattern:
//! - **Arc**: multiple handlers hold a reference to the same data
//! - **RwLock**: many concurrent readers or exactly one writer
//! - Reading the config is the hot path; updating it is rare
//!
//! The transcriber (model cache included) lives here too, so loaded models
//! survive for the process lifetime and a size switch within a session
//! triggers exactly one reload per size.

use crate::config::AppConfig;
use crate::transcription::Transcriber;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (updated by every request)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Transcriber owning the per-size model cache
    pub transcriber: Arc<Transcriber>,

    /// When the server started (never changes, so no lock needed)
    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Transcription attempts currently running
    pub transcriptions_in_flight: u32,

    /// Detailed metrics per API endpoint, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance metrics for a single API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, transcriber: Transcriber) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            transcriber: Arc::new(transcriber),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other requests are not
    /// blocked while the caller works with the snapshot.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Mark a transcription attempt as started.
    pub fn transcription_started(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.transcriptions_in_flight += 1;
    }

    /// Mark a transcription attempt as finished.
    ///
    /// Guards against underflow so an unbalanced call cannot panic.
    pub fn transcription_finished(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.transcriptions_in_flight > 0 {
            metrics.transcriptions_in_flight -= 1;
        }
    }

    /// Get a consistent snapshot of current metrics (used for /metrics).
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            transcriptions_in_flight: metrics.transcriptions_in_flight,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time in milliseconds for this endpoint.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn test_state() -> AppState {
        AppState::new(AppConfig::default(), Transcriber::new(Device::Cpu))
    }

    #[test]
    fn test_request_counters() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn test_transcription_in_flight_tracking() {
        let state = test_state();
        state.transcription_started();
        assert_eq!(state.get_metrics_snapshot().transcriptions_in_flight, 1);

        state.transcription_finished();
        state.transcription_finished(); // unbalanced call must not panic
        assert_eq!(state.get_metrics_snapshot().transcriptions_in_flight, 0);
    }

    #[test]
    fn test_endpoint_metrics() {
        let state = test_state();
        state.record_endpoint_request("POST /api/v1/transcribe", 120, false);
        state.record_endpoint_request("POST /api/v1/transcribe", 80, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/v1/transcribe"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.average_duration_ms(), 100.0);
        assert_eq!(metric.error_rate(), 0.5);
    }

    #[test]
    fn test_config_update_validation() {
        let state = test_state();
        let mut bad_config = AppConfig::default();
        bad_config.server.port = 0;
        assert!(state.update_config(bad_config).is_err());

        let mut good_config = AppConfig::default();
        good_config.server.port = 9090;
        assert!(state.update_config(good_config).is_ok());
        assert_eq!(state.get_config().server.port, 9090);
    }
}
