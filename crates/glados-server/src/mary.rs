//! MaryTTS-compatible endpoint
//!
//! Lets clients built for a MaryTTS server (home automation voice
//! integrations, mostly) use this service unchanged. Only `INPUT_TEXT`
//! matters; the other MARY fields are accepted and ignored. Output is
//! always WAV with the cache enabled.

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    response::Response,
};
use glados_engine::{AudioFormat, SynthesisRequest};
use http::header;
use serde::Deserialize;

use crate::{
    AppState,
    error::{Result, ServerError},
    routes::{audio_response, synthesize},
};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct MaryRequest {
    #[serde(rename = "INPUT_TEXT", default)]
    input_text: String,
    #[serde(rename = "INPUT_TYPE", default)]
    input_type: Option<String>,
    #[serde(rename = "OUTPUT_TYPE", default)]
    output_type: Option<String>,
    #[serde(rename = "LOCALE", default)]
    locale: Option<String>,
    #[serde(rename = "AUDIO", default)]
    audio: Option<String>,
    #[serde(rename = "VOICE", default)]
    voice: Option<String>,
}

/// Body extractor accepting either a URL-encoded form or JSON
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned + Send + 'static,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_json = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<T>::from_request(request, state).await?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<T>::from_request(request, state).await?;
            Ok(Self(body))
        }
    }
}

pub async fn process(State(state): State<AppState>, FormOrJson(body): FormOrJson<MaryRequest>) -> Result<Response> {
    let request = SynthesisRequest::new(body.input_text).with_format(AudioFormat::Wav.extension());

    let result = synthesize(&state, request).await?;
    audio_response(&state, &result).await
}
