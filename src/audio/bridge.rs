//! # Format Bridge
//!
//! Converts between the recorder's container formats and the sample shape
//! the model accepts, and owns the single temp file the inference boundary
//! reads from.
//!
//! ## Pipeline position:
//! recorded clip bytes → `decode_clip` → `DecodedAudio` → `write_temp` →
//! temp WAV path → model (which reads it back via `read_samples`).
//!
//! ## Policy:
//! Overwrite-in-place on the temp path is fine because exactly one clip is
//! processed at a time; the directory is created on demand.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::path::Path;

use crate::audio::clip::AudioClip;
use crate::error::{AppError, AppResult};

/// Sample rate Whisper models expect.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// A decoded waveform: mono float samples plus their sample rate.
///
/// This is the shape constructed immediately before invoking the model and
/// discarded after the call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Samples per second
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration of the decoded waveform in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode a recorded clip into raw samples plus sample rate.
///
/// ## Dispatch:
/// Raw PCM content types ("audio/pcm", "audio/l16") go through the PCM16
/// fallback at the Whisper rate; everything else is treated as a WAV
/// container. Decode failures abort the transcription attempt.
pub fn decode_clip(clip: &AudioClip) -> AppResult<DecodedAudio> {
    if clip.is_empty() {
        return Err(AppError::Decode("audio buffer is empty".to_string()));
    }

    match clip.content_type() {
        Some("audio/pcm") | Some("audio/l16") => decode_pcm16(clip.bytes(), WHISPER_SAMPLE_RATE),
        _ => decode_wav(clip.bytes()),
    }
}

/// Decode a WAV container from an in-memory byte buffer.
///
/// Handles both integer and float sample formats and downmixes stereo to
/// mono by averaging channel pairs.
pub fn decode_wav(bytes: &[u8]) -> AppResult<DecodedAudio> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let mono = match spec.channels {
        1 => samples,
        2 => samples
            .chunks(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect(),
        n => {
            return Err(AppError::Decode(format!(
                "unsupported channel count: {}",
                n
            )))
        }
    };

    Ok(DecodedAudio {
        samples: mono,
        sample_rate: spec.sample_rate,
    })
}

/// Decode raw little-endian 16-bit PCM at a known sample rate.
///
/// Samples are scaled from [-32768, 32767] to [-1.0, 1.0].
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32) -> AppResult<DecodedAudio> {
    if bytes.len() % 2 != 0 {
        return Err(AppError::Decode(
            "PCM data length must be even for 16-bit samples".to_string(),
        ));
    }

    let mut cursor = Cursor::new(bytes);
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample as f32 / 32768.0);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Write a decoded waveform to the temp path as 16-bit mono WAV, creating
/// the directory structure if absent.
pub fn write_temp(audio: &DecodedAudio, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Internal(format!("failed to create temp dir: {}", e)))?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Read a previously written temp file back into decoded samples.
///
/// The model inference boundary takes a file path, so the invoker uses this
/// to feed the model exactly what the bridge wrote.
pub fn read_samples(path: &Path) -> AppResult<DecodedAudio> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Decode(format!("failed to read {}: {}", path.display(), e)))?;
    decode_wav(&bytes)
}

/// Encode a waveform into an in-memory WAV buffer.
///
/// Used by tests to synthesize clips the way the recorder widget would.
pub fn encode_wav(audio: &DecodedAudio) -> AppResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)?;
        for &sample in &audio.samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize()?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wave(duration_secs: f64, sample_rate: u32, freq: f32) -> DecodedAudio {
        let count = (duration_secs * sample_rate as f64) as usize;
        let samples = (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5
            })
            .collect();
        DecodedAudio {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let original = sine_wave(1.5, 16_000, 440.0);
        let encoded = encode_wav(&original).unwrap();
        let decoded = decode_wav(&encoded).unwrap();

        assert_eq!(decoded.samples.len(), original.samples.len());
        assert_eq!(decoded.sample_rate, original.sample_rate);

        // Values survive within 16-bit quantization tolerance
        for (a, b) in original.samples.iter().zip(decoded.samples.iter()) {
            assert!((a - b).abs() < 1.0 / 16384.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_two_second_silent_clip() {
        // 2 seconds of silence at 16kHz must decode to exactly 32000 samples
        let silent = DecodedAudio {
            samples: vec![0.0; 32_000],
            sample_rate: 16_000,
        };
        let encoded = encode_wav(&silent).unwrap();
        let decoded = decode_wav(&encoded).unwrap();

        assert_eq!(decoded.samples.len(), 32_000);
        assert_eq!(decoded.sample_rate, 16_000);
        assert!((decoded.duration_seconds() - 2.0).abs() < f64::EPSILON);
        assert!(decoded.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stereo_downmix() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
            // 4 frames: left = 1000, right = 3000 → mono average of 2000
            for _ in 0..4 {
                writer.write_sample(1000i16).unwrap();
                writer.write_sample(3000i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = decode_wav(&buffer.into_inner()).unwrap();
        assert_eq!(decoded.samples.len(), 4);
        let expected = 2000.0 / 32768.0;
        for &s in &decoded.samples {
            assert!((s - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_pcm16_fallback() {
        let mut bytes = Vec::new();
        for sample in [0i16, 16384, -16384, 32767] {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }

        let decoded = decode_pcm16(&bytes, WHISPER_SAMPLE_RATE).unwrap();
        assert_eq!(decoded.samples.len(), 4);
        assert_eq!(decoded.sample_rate, 16_000);
        assert!((decoded.samples[1] - 0.5).abs() < 1e-4);
        assert!((decoded.samples[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_pcm16_rejects_odd_length() {
        assert!(decode_pcm16(&[0u8; 3], WHISPER_SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let clip = crate::audio::clip::AudioClip::new(vec![0xde, 0xad, 0xbe, 0xef], None);
        assert!(decode_clip(&clip).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_clip() {
        let clip = crate::audio::clip::AudioClip::new(Vec::new(), Some("audio/wav".to_string()));
        assert!(decode_clip(&clip).is_err());
    }

    #[test]
    fn test_write_temp_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("temp_audio.wav");

        let audio = sine_wave(0.25, 16_000, 220.0);
        write_temp(&audio, &path).unwrap();
        assert!(path.exists());

        let read_back = read_samples(&path).unwrap();
        assert_eq!(read_back.samples.len(), audio.samples.len());
        assert_eq!(read_back.sample_rate, audio.sample_rate);
    }

    #[test]
    fn test_write_temp_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_audio.wav");

        let first = sine_wave(1.0, 16_000, 220.0);
        write_temp(&first, &path).unwrap();

        let second = sine_wave(0.5, 16_000, 330.0);
        write_temp(&second, &path).unwrap();

        let read_back = read_samples(&path).unwrap();
        assert_eq!(read_back.samples.len(), second.samples.len());
    }
}
