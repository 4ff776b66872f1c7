//! # Recorded Clip
//!
//! The transient in-memory representation of "the most recent recording".
//! A clip is created when the browser finishes a capture and uploads the
//! buffer; it lives for exactly one transcription attempt and is never
//! persisted beyond the temp file written by the bridge.

/// An in-memory recorded audio buffer.
///
/// ## Lifetime:
/// Single-use. Zero byte length means "nothing recorded yet" and must be
/// rejected before the transcription invoker is ever reached.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

impl AudioClip {
    /// Wrap an uploaded buffer together with the content type the recorder
    /// declared for it (e.g. "audio/wav").
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self { bytes, content_type }
    }

    /// Raw container bytes as received from the recorder.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the recording. Zero means nothing was captured.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content type declared by the recorder, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_clip() {
        let clip = AudioClip::new(Vec::new(), None);
        assert!(clip.is_empty());
        assert_eq!(clip.len(), 0);
    }

    #[test]
    fn test_clip_metadata() {
        let clip = AudioClip::new(vec![1, 2, 3, 4], Some("audio/wav".to_string()));
        assert_eq!(clip.len(), 4);
        assert_eq!(clip.content_type(), Some("audio/wav"));
        assert!(!clip.is_empty());
    }
}
