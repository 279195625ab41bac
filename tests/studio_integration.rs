//! Integration tests for the submission pipeline: form to video on disk.
//!
//! Runs a `Studio` backed by the real `VeoClient` against a mock Gemini API,
//! with a clock that never sleeps.

use std::path::Path;
use std::time::Duration;

use cinegen::form::{AudioSourceKind, FormError, FormState, Submission};
use cinegen::options::{Mood, Style};
use cinegen::params::GenerationParameters;
use cinegen::studio::{output_stem, AudioTrackKind, GenerationResult, Studio, StudioError};
use cinegen::veo::{Clock, PollState, VeoClient, VeoError};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBMIT_PATH: &str = "/v1beta/models/veo-2.0-generate-001:predictLongRunning";
const ANALYZE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
const OPERATION_NAME: &str = "models/veo-2.0-generate-001/operations/op-1";
const DOWNLOAD_PATH: &str = "/v1beta/files/op-1:download";

#[derive(Clone, Copy)]
struct InstantClock;

impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {}
}

fn create_studio(server: &MockServer, output_dir: &Path) -> Studio<VeoClient, InstantClock> {
    let client = VeoClient::with_base_url("test-api-key".to_string(), server.uri())
        .expect("Failed to create test client");
    Studio::new(client, InstantClock, output_dir.to_path_buf())
}

fn pending_operation() -> serde_json::Value {
    serde_json::json!({ "name": OPERATION_NAME })
}

fn done_operation(server: &MockServer) -> serde_json::Value {
    serde_json::json!({
        "name": OPERATION_NAME,
        "done": true,
        "response": {
            "generateVideoResponse": {
                "generatedSamples": [{
                    "video": { "uri": format!("{}{}?alt=media", server.uri(), DOWNLOAD_PATH) }
                }]
            }
        }
    })
}

async fn mount_submit(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DOWNLOAD_PATH))
        .and(query_param("key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4-bytes".to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

async fn status_queries(server: &MockServer) -> usize {
    let operation_path = format!("/v1beta/{}", OPERATION_NAME);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == operation_path)
        .count()
}

/// Three pending answers then a finished one: exactly four status checks,
/// and the clip is saved under a name derived from the prompt.
#[tokio::test]
async fn test_generation_polls_until_done_and_downloads() {
    let server = MockServer::start().await;
    mount_submit(&server, pending_operation()).await;

    // Limited mock first; once used up, the finished answer takes over.
    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{}", OPERATION_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{}", OPERATION_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_operation(&server)))
        .expect(1)
        .mount(&server)
        .await;
    mount_download(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let studio = create_studio(&server, temp_dir.path());

    let mut form = FormState::default();
    form.prompt = "a lighthouse in a storm".to_string();
    form.mood = Mood::Dramatic;

    let mut states = Vec::new();
    let result = studio
        .run(form.submission().unwrap(), |state| states.push(state.clone()))
        .await
        .unwrap();

    assert_eq!(status_queries(&server).await, 4);
    assert_eq!(
        &states[..4],
        &[
            PollState::Submitted,
            PollState::Polling { attempts: 1 },
            PollState::Polling { attempts: 2 },
            PollState::Polling { attempts: 3 },
        ]
    );
    assert!(matches!(states.last(), Some(PollState::Done { .. })));

    assert!(result.prompt.contains("a lighthouse in a storm"));
    assert!(result.prompt.contains("Dramatic"));
    assert_eq!(std::fs::read(&result.video_path).unwrap(), b"fake-mp4-bytes");
    assert!(result.video_path.is_absolute());

    let file_name = result.video_path.file_name().unwrap().to_string_lossy();
    let hash = output_stem(&result.prompt, 0);
    let hash = hash.split('-').next().unwrap();
    assert!(file_name.starts_with(hash));
    assert!(file_name.ends_with(".mp4"));

    let manifest = GenerationResult::manifest_path(&result.video_path);
    assert_eq!(GenerationResult::load(&manifest).unwrap(), result);
}

/// Nothing to generate from: rejected before any request is made.
#[tokio::test]
async fn test_empty_request_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let studio = create_studio(&server, temp_dir.path());

    let params = GenerationParameters {
        prompt: "   ".to_string(),
        ..Default::default()
    };
    let result = studio.generate(&params, |_| {}).await;
    assert!(matches!(result, Err(StudioError::Form(FormError::MissingInput))));

    let form = FormState::default();
    assert!(matches!(form.submission(), Err(FormError::MissingInput)));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

/// A failed operation surfaces its message and leaves no files behind.
#[tokio::test]
async fn test_operation_error_is_reported() {
    let server = MockServer::start().await;
    mount_submit(
        &server,
        serde_json::json!({
            "name": OPERATION_NAME,
            "done": true,
            "error": { "code": 3, "message": "Prompt could not be processed" }
        }),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let studio = create_studio(&server, temp_dir.path());
    let params = GenerationParameters {
        prompt: "anything".to_string(),
        ..Default::default()
    };

    let result = studio.generate(&params, |_| {}).await;
    match result {
        Err(StudioError::Generation(VeoError::OperationFailed { code, message })) => {
            assert_eq!(code, 3);
            assert_eq!(message, "Prompt could not be processed");
        }
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

/// A finished operation without a video link is a failure.
#[tokio::test]
async fn test_missing_video_link() {
    let server = MockServer::start().await;
    mount_submit(
        &server,
        serde_json::json!({ "name": OPERATION_NAME, "done": true, "response": {} }),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let studio = create_studio(&server, temp_dir.path());
    let params = GenerationParameters {
        prompt: "anything".to_string(),
        ..Default::default()
    };

    let err = studio.generate(&params, |_| {}).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to generate video: Video generation failed. No download link found."
    );
}

/// Preset with an image and analysis: the analyzed prompt is what gets
/// submitted, alongside the image.
#[tokio::test]
async fn test_preset_with_image_analysis() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ANALYZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{
                    "text": r#"{"prompt": "Fog rolls over a quiet harbor", "mood": "Serene", "style": "Art Deco"}"#
                }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUBMIT_PATH))
        .and(body_string_contains("Fog rolls over a quiet harbor"))
        .and(body_string_contains("bytesBase64Encoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_operation(&server)))
        .expect(1)
        .mount(&server)
        .await;
    mount_download(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("harbor.png");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
    let preset = temp_dir.path().join("harbor.toml");
    std::fs::write(
        &preset,
        format!(
            "image = {:?}\nanalyze = true\naspect_ratio = \"9:16\"\n\n[overlay]\ntext = \"ignored\"\n",
            image.display().to_string()
        ),
    )
    .unwrap();

    let form = FormState::load(&preset).unwrap();
    let submission = form.submission().unwrap();
    assert!(matches!(submission, Submission::Analyze { .. }));

    let output_dir = temp_dir.path().join("out");
    let studio = create_studio(&server, &output_dir);
    let params = studio.resolve(submission).await.unwrap();
    assert_eq!(params.mood, Mood::Serene);
    assert_eq!(params.style, Style::ArtDeco);
    assert!(params.active_overlay().is_none());

    let result = studio.generate(&params, |_| {}).await.unwrap();
    assert!(result.prompt.contains("9:16"));
    assert!(!result.prompt.contains("ignored"));
    assert_eq!(status_queries(&server).await, 0);
    assert!(result.video_path.starts_with(std::path::absolute(&output_dir).unwrap()));
}

/// Uploaded audio is copied next to the video and recorded in the manifest.
#[tokio::test]
async fn test_uploaded_audio_is_saved_with_volume() {
    let server = MockServer::start().await;
    mount_submit(&server, done_operation(&server)).await;
    mount_download(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let song = temp_dir.path().join("song.mp3");
    std::fs::write(&song, b"ID3-fake-mp3").unwrap();

    let mut form = FormState::default();
    form.prompt = "city lights".to_string();
    form.audio.file = Some(song);
    form.audio.volume = 70;
    form.select_audio(AudioSourceKind::Upload);

    let output_dir = temp_dir.path().join("out");
    let studio = create_studio(&server, &output_dir);
    let result = studio.run(form.submission().unwrap(), |_| {}).await.unwrap();

    let audio = result.audio.clone().expect("audio track");
    assert_eq!(audio.kind, AudioTrackKind::Upload);
    assert!(audio.path.to_string_lossy().ends_with("-audio.mp3"));
    assert_eq!(std::fs::read(&audio.path).unwrap(), b"ID3-fake-mp3");
    assert_eq!(result.audio_volume, Some(70));
    assert!(result.speech_text.is_none());

    let loaded = GenerationResult::load(&GenerationResult::manifest_path(&result.video_path)).unwrap();
    assert_eq!(loaded.audio, Some(audio));
}
