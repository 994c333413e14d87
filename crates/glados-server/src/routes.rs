use std::time::Instant;

use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Response,
};
use glados_engine::{SynthesisRequest, SynthesisResult};
use http::header;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::{
    AppState,
    error::{Result, ServerError},
};

/// Response header telling whether the audio came from the cache
pub const CACHE_HEADER: &str = "x-glados-cache";

/// Parameters shared by `/tts` and `/say`
#[derive(Debug, Deserialize)]
pub struct TtsParams {
    /// Missing text is treated like empty text
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub audio_format: Option<String>,
}

const fn default_use_cache() -> bool {
    true
}

impl From<TtsParams> for SynthesisRequest {
    fn from(params: TtsParams) -> Self {
        Self {
            text: params.text,
            audio_format: params.audio_format,
            use_cache: params.use_cache,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Index {
    info: &'static str,
    root_path: String,
}

pub async fn index(State(state): State<AppState>) -> Json<Index> {
    Json(Index {
        info: "GLaDOS tts",
        root_path: state.root_path.clone(),
    })
}

pub async fn tts_query(
    State(state): State<AppState>,
    params: std::result::Result<Query<TtsParams>, QueryRejection>,
) -> Result<Json<SynthesisResult>> {
    let Query(params) = params?;
    Ok(Json(synthesize(&state, params.into()).await?))
}

pub async fn tts_json(
    State(state): State<AppState>,
    params: std::result::Result<Json<TtsParams>, JsonRejection>,
) -> Result<Json<SynthesisResult>> {
    let Json(params) = params?;
    Ok(Json(synthesize(&state, params.into()).await?))
}

pub async fn say(
    State(state): State<AppState>,
    params: std::result::Result<Query<TtsParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    let result = synthesize(&state, params.into()).await?;
    audio_response(&state, &result).await
}

/// `/say.{format}`; the path extension overrides `audio_format`
pub async fn say_as(
    State(state): State<AppState>,
    Path(format): Path<String>,
    params: std::result::Result<Query<TtsParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params?;
    let request = SynthesisRequest::from(params).with_format(format);
    let result = synthesize(&state, request).await?;
    audio_response(&state, &result).await
}

pub async fn audio_file(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let path = state
        .engine
        .lookup(&filename)?
        .ok_or_else(|| ServerError::NotFound(filename.clone()))?;

    let mime_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => glados_engine::AudioFormat::parse(ext).map_or("application/octet-stream", |f| f.mime_type()),
        None => "application/octet-stream",
    };

    stream_file(&path, &filename, mime_type, None).await
}

pub(crate) async fn synthesize(state: &AppState, request: SynthesisRequest) -> Result<SynthesisResult> {
    let start = Instant::now();
    let result = state.engine.synthesize_to_file(request).await?;

    state.metrics.record(result.from_cache, start);

    Ok(result)
}

/// Stream the file behind a synthesis result
pub(crate) async fn audio_response(state: &AppState, result: &SynthesisResult) -> Result<Response> {
    let path = state.engine.audio_path(&result.audio_filename)?;
    let cache = if result.from_cache { "hit" } else { "miss" };

    stream_file(&path, &result.audio_filename, &result.audio_mimetype, Some(cache)).await
}

async fn stream_file(
    path: &std::path::Path,
    filename: &str,
    mime_type: &str,
    cache: Option<&'static str>,
) -> Result<Response> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to open {filename}: {e}")))?;

    let length = file
        .metadata()
        .await
        .map_err(|e| ServerError::Internal(format!("failed to stat {filename}: {e}")))?
        .len();

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, format!("inline; filename=\"{filename}\""));

    if let Some(cache) = cache {
        builder = builder.header(CACHE_HEADER, cache);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ServerError::Internal(format!("failed to build response: {e}")))
}
