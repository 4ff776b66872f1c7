//! # Transcription Module
//!
//! Speech-to-text via Whisper models running on the Candle-rs framework,
//! without FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Model**: downloading and loading Whisper weights, plus the inference
//!   entry point (file path in, text out)
//! - **Cache**: per-size memoization with single-flight load-or-get so each
//!   model size is loaded at most once per process
//! - **Engine**: the invoker that bridges a recorded clip through the temp
//!   file into a model call with an explicit options structure
//!
//! ## Whisper Model Sizes:
//! - **tiny**: ~39MB, fastest but least accurate
//! - **base**: ~74MB, good balance for interactive use
//! - **small**: ~244MB, better accuracy
//! - **medium**: ~769MB, good technical vocabulary
//! - **large**: ~1550MB, best accuracy but slowest

pub mod cache;
pub mod engine;
pub mod model;

pub use cache::ModelCache;
pub use engine::{LanguageHint, TranscribeOptions, Transcriber, TranscriptionOutcome};
pub use model::ModelSize;
