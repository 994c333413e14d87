#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod health;
mod mary;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use glados_config::Config;
use glados_engine::Engine;
use glados_telemetry::SynthesisMetrics;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub use error::{Result, ServerError};
pub use routes::{CACHE_HEADER, TtsParams};

/// Shared handler state
#[derive(Clone)]
pub(crate) struct AppState {
    engine: Arc<Engine>,
    metrics: SynthesisMetrics,
    root_path: String,
}

/// HTTP front of the synthesis engine
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the router around a started (or soon to be started) engine
    pub fn new(config: &Config, engine: Arc<Engine>) -> Self {
        let state = AppState {
            engine,
            metrics: SynthesisMetrics::new(),
            root_path: config.server.root_path.clone(),
        };

        let mut app = Router::new()
            .route("/", get(routes::index))
            .route("/tts", get(routes::tts_query).post(routes::tts_json))
            .route("/say", get(routes::say))
            .route("/say.{format}", get(routes::say_as))
            .route("/audio/{filename}", get(routes::audio_file))
            .route("/mary/process", post(mary::process));

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, get(health::health_handler));
        }

        let router = app.with_state(state).layer(TraceLayer::new_for_http());

        Self {
            router,
            listen_address: config.server.listen_address(),
        }
    }

    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Router with every route and layer applied, for callers that own the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind the listen address and serve until `shutdown` fires
    ///
    /// In-flight requests are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_address)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", self.listen_address))?;

        tracing::info!(local_addr = %listener.local_addr()?, "glados listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("draining connections");
            })
            .await?;

        Ok(())
    }
}
