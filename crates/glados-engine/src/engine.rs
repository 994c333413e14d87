use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use glados_config::EngineConfig;

use crate::{
    audio::{AudioFormat, SAMPLE_RATE, quantize},
    backend::{BackendLoader, InferenceBackend, default_probe},
    device::{AcceleratorProbe, DeviceKind, select_device},
    error::{EngineError, Result},
    inflight::KeyedLocks,
    key::CacheKey,
    normalize::TextNormalizer,
    store::AudioStore,
    types::{SynthesisRequest, SynthesisResult},
};

/// Texts run once through the model before the first real request
const WARM_UP_TEXTS: [&str; 4] = ["0", "1", "2", "3"];

static ENGINE: OnceLock<Arc<Engine>> = OnceLock::new();

/// Settings bound by [`Engine::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub audio_dir: PathBuf,
    pub audio_format: AudioFormat,
    pub filename_prefix: String,
    pub eager_load: bool,
    /// Forced execution device; the probed one when `None`
    pub device: Option<DeviceKind>,
    pub request_timeout: Duration,
    pub sample_rate: u32,
}

impl EngineSettings {
    /// Settings for a given output directory, everything else default
    pub fn new(audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            audio_format: AudioFormat::Wav,
            filename_prefix: "GLaDOS-".to_string(),
            eager_load: false,
            device: None,
            request_timeout: Duration::from_secs(120),
            sample_rate: SAMPLE_RATE,
        }
    }

    /// # Errors
    ///
    /// Returns an input error for an unknown audio format or a bad timeout
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let request_timeout = config
            .request_timeout()
            .map_err(|e| EngineError::Input(e.to_string()))?;

        Ok(Self {
            audio_dir: config.audio_dir.clone(),
            audio_format: AudioFormat::parse(&config.audio_format)?,
            filename_prefix: config.filename_prefix.clone(),
            eager_load: config.eager_load,
            device: DeviceKind::from_setting(config.device),
            request_timeout,
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Text-to-speech engine backed by an on-disk audio cache
///
/// One instance per process is reachable through [`Engine::global`];
/// [`Engine::new`] builds isolated instances. Nothing can be synthesized
/// until [`Engine::start`] has bound the settings and loaded the backend.
pub struct Engine {
    probed: DeviceKind,
    running: Mutex<Option<Arc<Running>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("device", &self.device())
            .field("started", &self.is_started())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Engine {
    pub fn new(probe: &dyn AcceleratorProbe) -> Self {
        Self {
            probed: select_device(probe),
            running: Mutex::new(None),
        }
    }

    /// Process-wide instance, created on first access
    pub fn global() -> Arc<Self> {
        Arc::clone(ENGINE.get_or_init(|| Arc::new(Self::new(default_probe().as_ref()))))
    }

    /// Device the backend runs on, or would run on if started now
    pub fn device(&self) -> DeviceKind {
        self.current()
            .map_or(self.probed, |running| running.device)
    }

    pub fn is_started(&self) -> bool {
        self.current().is_some()
    }

    /// Whether warm-up has completed
    pub fn is_loaded(&self) -> bool {
        self.current()
            .is_some_and(|running| running.warmed.load(Ordering::Acquire))
    }

    pub fn settings(&self) -> Option<EngineSettings> {
        self.current().map(|running| running.settings.clone())
    }

    /// Bind settings and load the backend
    ///
    /// Starting again with identical settings keeps the running backend.
    /// This blocks while the model loads; call it from a blocking context.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the output directory cannot be created,
    /// a backend load error if the model cannot be loaded or warmed up, and
    /// `AlreadyStarted` if the engine runs with different settings
    pub fn start(&self, settings: EngineSettings, loader: &dyn BackendLoader) -> Result<()> {
        let mut slot = self.running.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = slot.as_ref() {
            if running.settings == settings {
                tracing::info!("engine already started with the same settings");
                return Ok(());
            }
            return Err(EngineError::AlreadyStarted);
        }

        let device = settings.device.unwrap_or(self.probed);
        let store = AudioStore::open(&settings.audio_dir)?;
        let backend = loader.load(device)?;

        let running = Arc::new(Running {
            device,
            store,
            pipeline: Mutex::new(Pipeline {
                backend,
                normalizer: loader.normalizer(),
            }),
            warmed: AtomicBool::new(false),
            locks: Arc::new(KeyedLocks::new()),
            settings,
        });

        if running.settings.eager_load {
            running.warm_up()?;
        }

        tracing::info!(
            %device,
            audio_dir = %running.settings.audio_dir.display(),
            audio_format = %running.settings.audio_format,
            eager_load = running.settings.eager_load,
            "engine started"
        );

        *slot = Some(running);

        Ok(())
    }

    /// Run warm-up now if it has not run yet
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before [`Engine::start`], or a backend load error
    pub fn warm_up(&self) -> Result<()> {
        self.current().ok_or(EngineError::NotStarted)?.warm_up()
    }

    /// Produce or reuse the audio file for a request
    ///
    /// Concurrent requests for the same file wait for each other, so the
    /// second one finds the first one's output in the cache.
    ///
    /// # Errors
    ///
    /// Returns an input error for empty text or an unknown format,
    /// `NotStarted` before [`Engine::start`], `Timeout` when the request
    /// outlives the configured bound, and backend or storage errors
    pub async fn synthesize_to_file(&self, request: SynthesisRequest) -> Result<SynthesisResult> {
        if request.text.trim().is_empty() {
            return Err(EngineError::Input("text must not be empty".to_string()));
        }

        let running = self.current().ok_or(EngineError::NotStarted)?;

        let format = match request.audio_format.as_deref() {
            Some(name) => AudioFormat::parse(name)?,
            None => running.settings.audio_format,
        };

        let key = CacheKey::derive(&running.settings.filename_prefix, &request.text, format.extension());
        let timeout = running.settings.request_timeout;

        let work = async {
            let guard = running.locks.lock(key.filename()).await;
            let running = Arc::clone(&running);
            let key = key.clone();

            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                running.produce(&request.text, &key, format, request.use_cache)
            })
            .await
            .map_err(|e| EngineError::Inference(format!("synthesis task failed: {e}")))?
        };

        tokio::time::timeout(timeout, work).await.unwrap_or_else(|_| {
            tracing::warn!(filename = key.filename(), label = key.label(), ?timeout, "synthesis timed out");
            Err(EngineError::Timeout(timeout))
        })
    }

    /// Path of a stored file, `None` if no such file is served
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before [`Engine::start`]
    pub fn lookup(&self, filename: &str) -> Result<Option<PathBuf>> {
        let running = self.current().ok_or(EngineError::NotStarted)?;
        Ok(running.store.lookup(filename))
    }

    /// Path of a file this engine produced, without the checks of [`Engine::lookup`]
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` before [`Engine::start`]
    pub fn audio_path(&self, filename: &str) -> Result<PathBuf> {
        let running = self.current().ok_or(EngineError::NotStarted)?;
        Ok(running.store.path_for(filename))
    }

    fn current(&self) -> Option<Arc<Running>> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct Pipeline {
    backend: Box<dyn InferenceBackend>,
    normalizer: Box<dyn TextNormalizer>,
}

impl Pipeline {
    fn render(&mut self, text: &str) -> Result<Vec<f32>> {
        let tokens = self.normalizer.prepare(text);
        if tokens.is_empty() {
            return Err(EngineError::Input("text contains nothing speakable".to_string()));
        }

        let features = self.backend.encode(&tokens)?;
        self.backend.vocode(&features)
    }
}

/// State of a started engine
struct Running {
    settings: EngineSettings,
    device: DeviceKind,
    store: AudioStore,
    pipeline: Mutex<Pipeline>,
    warmed: AtomicBool,
    locks: Arc<KeyedLocks>,
}

impl Running {
    fn pipeline(&self) -> MutexGuard<'_, Pipeline> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn warm_up(&self) -> Result<()> {
        let mut pipeline = self.pipeline();

        if self.warmed.load(Ordering::Acquire) {
            return Ok(());
        }

        let started = Instant::now();
        for text in WARM_UP_TEXTS {
            pipeline
                .render(text)
                .map_err(|e| EngineError::BackendLoad(format!("warm-up failed: {e}")))?;
        }
        self.warmed.store(true, Ordering::Release);

        tracing::info!(
            device = %self.device,
            elapsed_ms = started.elapsed().as_millis(),
            "backend warmed up"
        );

        Ok(())
    }

    fn produce(&self, text: &str, key: &CacheKey, format: AudioFormat, use_cache: bool) -> Result<SynthesisResult> {
        let filename = key.filename();
        // housekeeping may delete the file between the check and the touch
        let from_cache = use_cache && self.store.exists(filename) && self.store.touch(filename)?;

        if from_cache {
            tracing::debug!(filename, label = key.label(), "cache hit");
        } else {
            self.warm_up()?;

            let started = Instant::now();
            let waveform = self.pipeline().render(text)?;
            let samples = quantize(&waveform);
            self.store
                .write(filename, &samples, self.settings.sample_rate, format)?;

            tracing::info!(
                filename,
                label = key.label(),
                samples = samples.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "synthesized audio"
            );
        }

        let file = self.store.stat(filename, format)?;

        Ok(SynthesisResult {
            from_cache,
            text: text.to_string(),
            audio_format: format,
            audio_filename: filename.to_string(),
            audio_timestamp: file.created,
            audio_mimetype: file.mime_type.to_string(),
        })
    }
}
