//! Stub inference backend that counts vocoder runs

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use glados_engine::{AcousticFeatures, BackendLoader, DeviceKind, InferenceBackend, Result, Tokens};

/// Loader handing out stub backends that share one call counter
#[derive(Clone, Default)]
pub struct StubLoader {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl StubLoader {
    /// Every vocoder run sleeps for `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Vocoder runs so far, warm-up included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BackendLoader for StubLoader {
    fn load(&self, _device: DeviceKind) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(StubBackend {
            calls: Arc::clone(&self.calls),
            delay: self.delay,
        }))
    }
}

struct StubBackend {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl InferenceBackend for StubBackend {
    fn encode(&mut self, tokens: &Tokens) -> Result<AcousticFeatures> {
        Ok(AcousticFeatures {
            data: vec![0.0; tokens.len() * 4],
            channels: 4,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn vocode(&mut self, features: &AcousticFeatures) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        Ok((0..features.frames() * 256)
            .map(|i| (i as f32 / 16.0).sin() * 0.5)
            .collect())
    }
}
