//! # Audio Module
//!
//! Handles the recorded clip on its way from the browser to the model:
//!
//! - **Clip**: the in-memory byte buffer produced by the recorder widget
//! - **Bridge**: container decoding, raw-PCM fallback, and the temp-file
//!   write the model inference boundary reads from
//!
//! ## Audio Format:
//! Whisper wants 16kHz mono 32-bit float samples in [-1.0, 1.0]. The bridge
//! accepts WAV (int or float, mono or stereo) and raw little-endian 16-bit
//! PCM, and normalizes everything to that shape.

pub mod bridge;
pub mod clip;
