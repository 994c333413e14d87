use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;

/// One request to turn text into an audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Container format; the engine default when absent
    pub audio_format: Option<String>,
    pub use_cache: bool,
}

impl SynthesisRequest {
    /// Request in the default format with the cache enabled
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio_format: None,
            use_cache: true,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = Some(format.into());
        self
    }

    #[must_use]
    pub const fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

/// Outcome of a synthesis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    /// Whether the file was reused rather than generated
    pub from_cache: bool,
    pub text: String,
    pub audio_format: AudioFormat,
    pub audio_filename: String,
    /// When the file was created
    pub audio_timestamp: Timestamp,
    pub audio_mimetype: String,
}
