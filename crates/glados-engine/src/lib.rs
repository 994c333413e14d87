#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

pub mod audio;
pub mod backend;
pub mod device;
mod engine;
mod error;
mod inflight;
pub mod key;
pub mod normalize;
pub mod store;
mod types;

pub use audio::AudioFormat;
pub use backend::{AcousticFeatures, BackendLoader, InferenceBackend, NoRuntime, default_loader, default_probe};
pub use device::{AcceleratorProbe, CpuOnly, DeviceKind, select_device};
pub use engine::{Engine, EngineSettings};
pub use error::{EngineError, Result};
pub use key::CacheKey;
pub use normalize::{EnglishNormalizer, TextNormalizer, Tokens};
pub use store::{AudioStore, CachedAudioFile};
pub use types::{SynthesisRequest, SynthesisResult};
