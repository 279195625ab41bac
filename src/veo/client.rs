//! VeoClient - handles communication with the Gemini API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::media::MediaAsset;

/// The environment variable name for the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback variable name, read when `GEMINI_API_KEY` is not set.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Default base URL for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for video generation.
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

/// Default model for image analysis.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";

/// Default timeout for HTTP requests (120 seconds, downloads included).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP status code for rate limiting.
const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status code for bad request (often content policy).
const HTTP_STATUS_BAD_REQUEST: u16 = 400;

/// HTTP status code for forbidden (content policy violation).
const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Keywords that indicate a content policy violation in error messages.
const CONTENT_POLICY_KEYWORDS: &[&str] = &[
    "content policy",
    "policy violation",
    "safety",
    "responsible ai",
    "prohibited",
    "blocked",
    "violates",
];

/// Check if an error message indicates a content policy violation.
fn is_content_policy_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    CONTENT_POLICY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Parse the Retry-After header value in seconds.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Read the API key from `GEMINI_API_KEY`, falling back to `API_KEY`.
pub fn api_key_from_env() -> Option<String> {
    [API_KEY_ENV, FALLBACK_API_KEY_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| !key.trim().is_empty())
}

/// Append the API key to a download URI as a query parameter.
pub fn with_key_param(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, api_key)
}

/// Request body for `predictLongRunning`.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
}

/// A long-running operation as returned by submission and status queries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    /// Resource name, e.g. `models/veo-2.0-generate-001/operations/abc`.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OperationResponse>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default, alias = "generatedVideos")]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoRef {
    #[serde(default)]
    pub uri: Option<String>,
}

/// Error attached to a finished operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Download link of the first generated video, if present.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
    }
}

/// Client for the Gemini video generation and content APIs.
pub struct VeoClient {
    api_key: String,
    base_url: String,
    video_model: String,
    analysis_model: String,
    pub(crate) http_client: reqwest::Client,
}

impl VeoClient {
    /// Create a new VeoClient by reading the API key from the environment.
    ///
    /// Reads `GEMINI_API_KEY`, falling back to `API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::MissingApiKey` if neither variable is set.
    pub fn new() -> Result<Self, VeoError> {
        let api_key = api_key_from_env().ok_or(VeoError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new VeoClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, VeoError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Create a new VeoClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, VeoError> {
        if api_key.is_empty() {
            return Err(VeoError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            http_client,
        })
    }

    /// Use a different video generation model.
    pub fn with_video_model(mut self, model: impl Into<String>) -> Self {
        self.video_model = model.into();
        self
    }

    /// Use a different image analysis model.
    pub fn with_analysis_model(mut self, model: impl Into<String>) -> Self {
        self.analysis_model = model.into();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn video_model(&self) -> &str {
        &self.video_model
    }

    pub fn analysis_model(&self) -> &str {
        &self.analysis_model
    }

    /// URL of a model method, e.g. `.../v1beta/models/veo:predictLongRunning`.
    pub(crate) fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Map a non-success response to a `VeoError`.
    pub(crate) async fn error_from_response(response: reqwest::Response) -> VeoError {
        let status = response.status();

        if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
            let retry_after_secs = parse_retry_after(&response);
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Rate limit exceeded".to_string());
            log::warn!(
                "Rate limited by Gemini API. Retry-After: {:?} seconds",
                retry_after_secs
            );
            return VeoError::RateLimit {
                message,
                retry_after_secs,
            };
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if (status.as_u16() == HTTP_STATUS_BAD_REQUEST || status.as_u16() == HTTP_STATUS_FORBIDDEN)
            && is_content_policy_error(&error_text)
        {
            log::warn!("Prompt rejected by content policy: {}", error_text);
            return VeoError::ContentPolicyViolation {
                message: error_text,
            };
        }

        VeoError::ApiError(format!(
            "API request failed with status {}: {}",
            status, error_text
        ))
    }

    /// Submit a video generation request.
    ///
    /// Sends the assembled prompt, plus the optional source image as inline
    /// base64 data, and asks for exactly one video. Returns the long-running
    /// operation handle to poll.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::EmptyPrompt` if the prompt is blank,
    /// `VeoError::ContentPolicyViolation` if the API rejects the prompt,
    /// `VeoError::RateLimit` on 429, `VeoError::ApiError` for other error
    /// responses, or `VeoError::HttpError` if the request fails.
    pub async fn submit_generation(
        &self,
        prompt: &str,
        image: Option<&MediaAsset>,
    ) -> Result<Operation, VeoError> {
        if prompt.trim().is_empty() {
            return Err(VeoError::EmptyPrompt);
        }

        let url = self.model_url(&self.video_model, "predictLongRunning");
        let request_body = GenerateRequest {
            instances: vec![Instance {
                prompt,
                image: image.map(|asset| InlineImage {
                    bytes_base64_encoded: asset.to_base64(),
                    mime_type: asset.mime_type.clone(),
                }),
            }],
            parameters: Parameters { sample_count: 1 },
        };

        log::debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let operation: Operation = response.json().await?;
        log::info!("Generation submitted, operation: {}", operation.name);
        Ok(operation)
    }

    /// Query the current state of a long-running operation.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, VeoError> {
        let url = format!("{}/v1beta/{}", self.base_url, name);

        let response = self
            .http_client
            .get(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VeoError::ApiError(format!(
                "Status check failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }

    /// Download a finished video to disk.
    ///
    /// The API key is appended to the URI as the `key` query parameter. The
    /// body is streamed to `dest`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::Download` for a non-success status,
    /// `VeoError::HttpError` if the request fails, or `VeoError::IoError` if
    /// writing fails.
    pub async fn download_video(&self, uri: &str, dest: &Path) -> Result<PathBuf, VeoError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .http_client
            .get(with_key_param(uri, &self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VeoError::Download {
                status: response.status().to_string(),
            });
        }

        if let Err(e) = write_body(response, dest).await {
            log::warn!("Download to {} failed, removing partial file", dest.display());
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        Ok(dest.to_path_buf())
    }
}

/// Stream a response body into a new file at `dest`.
async fn write_body(response: reqwest::Response, dest: &Path) -> Result<(), VeoError> {
    use futures_util::StreamExt;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Errors that can occur during Gemini API operations.
#[derive(Debug, thiserror::Error)]
pub enum VeoError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Content policy violation: {message}")]
    ContentPolicyViolation { message: String },

    #[error("Empty prompt")]
    EmptyPrompt,

    #[error("Operation failed (code {code}): {message}")]
    OperationFailed { code: i32, message: String },

    #[error("Video generation failed. No download link found.")]
    MissingVideoLink,

    #[error("Failed to fetch video: {status}")]
    Download { status: String },

    #[error("Generation did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },
}
