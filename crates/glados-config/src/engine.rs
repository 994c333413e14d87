use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Synthesis engine and audio cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory where generated audio files are cached
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    /// Container format used when a request does not ask for one
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// Prefix prepended to every generated filename
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
    /// Run warm-up inference at startup instead of on the first request
    #[serde(default)]
    pub eager_load: bool,
    /// Execution device, probed when `auto`
    #[serde(default)]
    pub device: DeviceSetting,
    /// Upper bound for a single synthesis request (e.g. "120s", "2m")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    /// Directory holding the voice model and vocoder weights
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            audio_format: default_audio_format(),
            filename_prefix: default_filename_prefix(),
            eager_load: false,
            device: DeviceSetting::default(),
            request_timeout: default_request_timeout(),
            model_dir: default_model_dir(),
        }
    }
}

impl EngineConfig {
    /// Parse the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the duration string is malformed or zero
    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        let timeout = duration_str::parse(&self.request_timeout)
            .map_err(|e| anyhow::anyhow!("invalid engine.request_timeout '{}': {e}", self.request_timeout))?;

        if timeout.is_zero() {
            anyhow::bail!("engine.request_timeout must be greater than 0");
        }

        Ok(timeout)
    }
}

/// Execution device selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSetting {
    /// Probe for the best available device
    #[default]
    Auto,
    /// Force the specialized accelerator
    Accelerator,
    /// Force the general-purpose GPU
    Gpu,
    /// Force CPU execution
    Cpu,
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio/")
}

fn default_audio_format() -> String {
    "wav".to_string()
}

fn default_filename_prefix() -> String {
    "GLaDOS-".to_string()
}

fn default_request_timeout() -> String {
    "120s".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models/")
}
