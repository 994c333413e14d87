//! Test server wrapper that starts GLaDOS on a random port

use std::{net::SocketAddr, path::Path, sync::Arc};

use glados_config::Config;
use glados_engine::{CpuOnly, Engine, EngineSettings};
use glados_server::Server;
use tokio_util::sync::CancellationToken;

use super::backend::StubLoader;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    loader: StubLoader,
    baseline: usize,
    audio_dir: tempfile::TempDir,
}

impl TestServer {
    /// Start a test server backed by a fast stub model
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        Self::start_with(config, StubLoader::default()).await
    }

    /// Start a test server whose engine is started with `loader`
    ///
    /// Binds to port 0 for automatic port assignment. Each server gets its
    /// own engine instance and audio directory.
    pub async fn start_with(mut config: Config, loader: StubLoader) -> anyhow::Result<Self> {
        let audio_dir = tempfile::tempdir()?;
        config.engine.audio_dir = audio_dir.path().to_path_buf();

        let engine = Arc::new(Engine::new(&CpuOnly));
        engine.start(EngineSettings::from_config(&config.engine)?, &loader)?;

        let mut server = Self::serve(Server::new(&config, engine)).await?;
        server.baseline = loader.calls();
        server.loader = loader;
        server.audio_dir = audio_dir;

        Ok(server)
    }

    /// Start a test server whose engine was never started
    pub async fn start_unstarted(config: Config) -> anyhow::Result<Self> {
        let engine = Arc::new(Engine::new(&CpuOnly));
        Self::serve(Server::new(&config, engine)).await
    }

    async fn serve(server: Server) -> anyhow::Result<Self> {
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
            loader: StubLoader::default(),
            baseline: 0,
            audio_dir: tempfile::tempdir()?,
        })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Model invocations since startup, warm-up excluded
    pub fn synthesis_count(&self) -> usize {
        self.loader.calls() - self.baseline
    }

    /// Directory holding the generated audio files
    pub fn audio_dir(&self) -> &Path {
        self.audio_dir.path()
    }

    /// Names of the files in the audio directory
    pub fn audio_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.audio_dir())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
