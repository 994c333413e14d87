//! Seam between the engine and the neural voice model
//!
//! The engine treats the model as two opaque stateful steps: `encode` turns
//! tokens into acoustic features (a mel spectrogram), `vocode` turns those
//! into a waveform in `[-1.0, 1.0]`.

#[cfg(feature = "onnx")]
pub mod onnx;

use std::path::Path;

use crate::{
    device::{AcceleratorProbe, DeviceKind},
    error::{EngineError, Result},
    normalize::{EnglishNormalizer, TextNormalizer, Tokens},
};

/// Acoustic features, row-major `[channels, frames]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcousticFeatures {
    pub data: Vec<f32>,
    pub channels: usize,
}

impl AcousticFeatures {
    pub fn frames(&self) -> usize {
        if self.channels == 0 { 0 } else { self.data.len() / self.channels }
    }
}

/// A loaded voice model bound to one device
///
/// Calls are not assumed to be thread-safe; the engine serializes them.
pub trait InferenceBackend: Send {
    /// # Errors
    ///
    /// Returns an inference error if the model rejects the input
    fn encode(&mut self, tokens: &Tokens) -> Result<AcousticFeatures>;

    /// # Errors
    ///
    /// Returns an inference error if the vocoder fails
    fn vocode(&mut self, features: &AcousticFeatures) -> Result<Vec<f32>>;
}

/// Loads backend handles onto a device
pub trait BackendLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns a backend load error if model files are missing or corrupt
    fn load(&self, device: DeviceKind) -> Result<Box<dyn InferenceBackend>>;

    /// Normalizer matching the model's symbol table
    fn normalizer(&self) -> Box<dyn TextNormalizer> {
        Box::new(EnglishNormalizer)
    }
}

/// Loader for builds without an inference runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRuntime;

impl BackendLoader for NoRuntime {
    fn load(&self, _device: DeviceKind) -> Result<Box<dyn InferenceBackend>> {
        Err(EngineError::BackendLoad(
            "built without an inference runtime, rebuild with `--features onnx`".to_string(),
        ))
    }
}

/// Accelerator probe of the compiled-in runtime
pub fn default_probe() -> Box<dyn AcceleratorProbe> {
    #[cfg(feature = "onnx")]
    {
        Box::new(onnx::OrtProbe)
    }

    #[cfg(not(feature = "onnx"))]
    {
        Box::new(crate::device::CpuOnly)
    }
}

/// Loader of the compiled-in runtime for models under `model_dir`
#[cfg_attr(not(feature = "onnx"), allow(unused_variables))]
pub fn default_loader(model_dir: &Path) -> Box<dyn BackendLoader> {
    #[cfg(feature = "onnx")]
    {
        Box::new(onnx::OnnxLoader::new(model_dir))
    }

    #[cfg(not(feature = "onnx"))]
    {
        Box::new(NoRuntime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_from_channels() {
        let features = AcousticFeatures {
            data: vec![0.0; 80 * 12],
            channels: 80,
        };
        assert_eq!(features.frames(), 12);
        assert_eq!(AcousticFeatures::default().frames(), 0);
    }

    #[test]
    fn missing_runtime_is_load_error() {
        let err = NoRuntime.load(DeviceKind::Cpu).err().unwrap();
        assert!(matches!(err, EngineError::BackendLoad(_)));
    }
}
