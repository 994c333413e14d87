//! `/tts` endpoint: JSON synthesis results and cache behavior

mod harness;

use std::time::Duration;

use harness::backend::StubLoader;
use harness::config::ConfigBuilder;
use harness::server::TestServer;
use serde_json::{Value, json};

async fn tts(server: &TestServer, query: &[(&str, &str)]) -> reqwest::Response {
    server
        .client()
        .get(server.url("/tts"))
        .query(query)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn get_returns_synthesis_result() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = tts(&server, &[("text", "Hello, this is a test of the emergency broadcast system")]).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["from_cache"], false);
    assert_eq!(body["text"], "Hello, this is a test of the emergency broadcast system");
    assert_eq!(body["audio_format"], "wav");
    assert_eq!(body["audio_mimetype"], "audio/x-wav");
    assert!(body["audio_timestamp"].is_string());

    let filename = body["audio_filename"].as_str().unwrap();
    assert!(filename.starts_with("GLaDOS-Hello_this_is_a_test_of_the_"));
    assert!(filename.ends_with(".wav"));
    assert_eq!(server.audio_files(), vec![filename.to_string()]);
}

#[tokio::test]
async fn post_accepts_json_body() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/tts"))
        .json(&json!({ "text": "The cake is a lie", "audio_format": "pcm" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["audio_format"], "pcm");
    assert_eq!(body["audio_mimetype"], "audio/L16");
    assert!(body["audio_filename"].as_str().unwrap().ends_with(".pcm"));
}

#[tokio::test]
async fn repeated_text_is_served_from_cache() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let first: Value = tts(&server, &[("text", "Still alive")]).await.json().await.unwrap();
    let second: Value = tts(&server, &[("text", "Still alive")]).await.json().await.unwrap();

    assert_eq!(first["from_cache"], false);
    assert_eq!(second["from_cache"], true);
    assert_eq!(first["audio_filename"], second["audio_filename"]);
    assert_eq!(server.synthesis_count(), 1);
}

#[tokio::test]
async fn cache_can_be_bypassed() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    for _ in 0..2 {
        let body: Value = tts(&server, &[("text", "Still alive"), ("use_cache", "false")])
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["from_cache"], false);
    }

    assert_eq!(server.synthesis_count(), 2);
    assert_eq!(server.audio_files().len(), 1);
}

#[tokio::test]
async fn configured_default_format_applies() {
    let config = ConfigBuilder::new().with_audio_format("pcm").build();
    let server = TestServer::start(config).await.unwrap();

    let body: Value = tts(&server, &[("text", "raw")]).await.json().await.unwrap();
    assert_eq!(body["audio_format"], "pcm");
}

#[tokio::test]
async fn formats_share_digest_not_file() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let wav: Value = tts(&server, &[("text", "Same words")]).await.json().await.unwrap();
    let pcm: Value = tts(&server, &[("text", "Same words"), ("audio_format", "pcm")])
        .await
        .json()
        .await
        .unwrap();

    let wav = wav["audio_filename"].as_str().unwrap();
    let pcm = pcm["audio_filename"].as_str().unwrap();
    assert_eq!(wav.trim_end_matches(".wav"), pcm.trim_end_matches(".pcm"));
    assert_eq!(server.synthesis_count(), 2);
}

#[tokio::test]
async fn wav_and_mp3_are_cached_separately() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let wav: Value = tts(&server, &[("text", "Same words"), ("audio_format", "wav")])
        .await
        .json()
        .await
        .unwrap();
    let resp = tts(&server, &[("text", "Same words"), ("audio_format", "mp3")]).await;
    assert_eq!(resp.status(), 200);
    let mp3: Value = resp.json().await.unwrap();

    assert_eq!(mp3["audio_format"], "mp3");
    assert_eq!(mp3["audio_mimetype"], "audio/mpeg");

    let wav = wav["audio_filename"].as_str().unwrap();
    let mp3 = mp3["audio_filename"].as_str().unwrap();
    assert_eq!(wav.trim_end_matches(".wav"), mp3.trim_end_matches(".mp3"));
    assert_eq!(server.audio_files(), vec![mp3.to_string(), wav.to_string()]);
}

#[tokio::test]
async fn long_word_gets_a_usable_filename() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();
    let word = "a".repeat(300);

    let resp = tts(&server, &[("text", word.as_str())]).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert!(body["audio_filename"].as_str().unwrap().len() < 255);
    assert_eq!(server.audio_files().len(), 1);
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = tts(&server, &[("text", "hello"), ("audio_format", "ogg")]).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["code"], 400);
    assert_eq!(server.synthesis_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/tts"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn concurrent_identical_requests_synthesize_once() {
    let server = TestServer::start_with(ConfigBuilder::new().build(), StubLoader::slow(Duration::from_millis(50)))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let request = server
                .client()
                .get(server.url("/tts"))
                .query(&[("text", "All together now")]);
            tokio::spawn(request.send())
        })
        .collect();

    let mut filenames = Vec::new();
    for task in tasks {
        let resp = task.await.unwrap().unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        filenames.push(body["audio_filename"].as_str().unwrap().to_string());
    }

    filenames.dedup();
    assert_eq!(filenames.len(), 1);
    assert_eq!(server.synthesis_count(), 1);
}

#[tokio::test]
async fn slow_synthesis_times_out() {
    let config = ConfigBuilder::new().lazy().with_request_timeout("100ms").build();
    let server = TestServer::start_with(config, StubLoader::slow(Duration::from_millis(400)))
        .await
        .unwrap();

    let resp = tts(&server, &[("text", "too slow")]).await;
    assert_eq!(resp.status(), 504);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "timeout_error");
}
