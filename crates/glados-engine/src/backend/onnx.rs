//! ONNX Runtime backend
//!
//! Expects two exported graphs in the model directory: `glados.onnx`
//! (token ids `[1, T]` to mel `[1, n_mels, frames]`) and `vocoder.onnx`
//! (mel to waveform).

use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
    TensorRTExecutionProvider,
};
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;

use super::{AcousticFeatures, BackendLoader, InferenceBackend};
use crate::{
    device::{AcceleratorProbe, DeviceKind},
    error::{EngineError, Result},
    normalize::Tokens,
};

const ENCODER_FILE: &str = "glados.onnx";
const VOCODER_FILE: &str = "vocoder.onnx";

const ENCODER_INPUT: &str = "tokens";
const VOCODER_INPUT: &str = "mel";

/// TensorRT counts as the specialized accelerator, CUDA as the GPU
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtProbe;

impl AcceleratorProbe for OrtProbe {
    fn has_accelerator(&self) -> bool {
        TensorRTExecutionProvider::default().is_available().unwrap_or(false)
    }

    fn has_gpu(&self) -> bool {
        CUDAExecutionProvider::default().is_available().unwrap_or(false)
    }
}

/// Loads the voice model and vocoder graphs from a directory
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    model_dir: PathBuf,
}

impl OnnxLoader {
    pub fn new(model_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
        }
    }
}

impl BackendLoader for OnnxLoader {
    fn load(&self, device: DeviceKind) -> Result<Box<dyn InferenceBackend>> {
        let encoder = open_session(&self.model_dir.join(ENCODER_FILE), device)?;
        let vocoder = open_session(&self.model_dir.join(VOCODER_FILE), device)?;

        tracing::info!(model_dir = %self.model_dir.display(), %device, "loaded onnx voice model");

        Ok(Box::new(OnnxBackend { encoder, vocoder }))
    }
}

struct OnnxBackend {
    encoder: Session,
    vocoder: Session,
}

impl InferenceBackend for OnnxBackend {
    fn encode(&mut self, tokens: &Tokens) -> Result<AcousticFeatures> {
        let ids = Array2::from_shape_vec((1, tokens.len()), tokens.as_slice().to_vec()).map_err(inference)?;

        let outputs = self
            .encoder
            .run(inputs![ENCODER_INPUT => TensorRef::from_array_view(ids.view()).map_err(inference)?])
            .map_err(inference)?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| EngineError::Inference("encoder produced no output".to_string()))?;
        let mel = value.try_extract_array::<f32>().map_err(inference)?;

        let shape = mel.shape();
        if shape.len() < 2 {
            return Err(EngineError::Inference(format!("unexpected mel shape {shape:?}")));
        }

        Ok(AcousticFeatures {
            channels: shape[shape.len() - 2],
            data: mel.iter().copied().collect(),
        })
    }

    fn vocode(&mut self, features: &AcousticFeatures) -> Result<Vec<f32>> {
        let mel = Array3::from_shape_vec((1, features.channels, features.frames()), features.data.clone())
            .map_err(inference)?;

        let outputs = self
            .vocoder
            .run(inputs![VOCODER_INPUT => TensorRef::from_array_view(mel.view()).map_err(inference)?])
            .map_err(inference)?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| EngineError::Inference("vocoder produced no output".to_string()))?;
        let waveform = value.try_extract_array::<f32>().map_err(inference)?;

        Ok(waveform.iter().copied().collect())
    }
}

fn open_session(path: &Path, device: DeviceKind) -> Result<Session> {
    if !path.is_file() {
        return Err(EngineError::BackendLoad(format!("model file not found: {}", path.display())));
    }

    Session::builder()
        .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|builder| builder.with_execution_providers(providers(device)))
        .and_then(|mut builder| builder.commit_from_file(path))
        .map_err(|e| EngineError::BackendLoad(format!("failed to load {}: {e}", path.display())))
}

fn providers(device: DeviceKind) -> Vec<ExecutionProviderDispatch> {
    match device {
        DeviceKind::Accelerator => vec![
            TensorRTExecutionProvider::default().build(),
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        DeviceKind::Gpu => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        DeviceKind::Cpu => vec![CPUExecutionProvider::default().build()],
    }
}

#[allow(clippy::needless_pass_by_value)]
fn inference(err: impl std::fmt::Display) -> EngineError {
    EngineError::Inference(err.to_string())
}
