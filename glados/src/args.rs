use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use glados_config::Config;

/// GLaDOS text-to-speech server
#[derive(Debug, Parser)]
#[command(name = "glados", about = "Local text-to-speech server with an on-disk audio cache")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "glados.toml", env = "GLADOS_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "GLADOS_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Override the audio cache directory
    #[arg(long, env = "GLADOS_AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Override the default audio format
    #[arg(long, env = "GLADOS_AUDIO_FORMAT")]
    pub audio_format: Option<String>,

    /// Warm up the model at startup
    #[arg(long, env = "GLADOS_EAGER_LOAD")]
    pub eager_load: bool,

    /// Log filter, e.g. "debug" or "glados_engine=trace"
    #[arg(long, env = "GLADOS_LOG")]
    pub log_level: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of the file configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(listen) = self.listen {
            config.server.listen_address = Some(listen);
        }
        if let Some(ref audio_dir) = self.audio_dir {
            config.engine.audio_dir.clone_from(audio_dir);
        }
        if let Some(ref audio_format) = self.audio_format {
            config.engine.audio_format.clone_from(audio_format);
        }
        if self.eager_load {
            config.engine.eager_load = true;
        }
    }
}
