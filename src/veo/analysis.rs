//! Image analysis: ask a Gemini model to describe an image as a video prompt.

use serde::{Deserialize, Serialize};

use super::client::{VeoClient, VeoError};
use crate::media::MediaAsset;
use crate::options::{joined_labels, Mood, Style};

/// A prompt suggested by the analysis model, with mood and style picked from
/// the same option sets as the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedPrompt {
    pub prompt: String,
    pub mood: Mood,
    pub style: Style,
}

/// Errors that can occur during image analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The model answered, but not with the expected JSON object.
    #[error("AI analysis returned an invalid format. Please try again.")]
    InvalidFormat {
        /// Raw model output, kept for logging.
        raw: String,
    },

    #[error("Failed to analyze image for video prompt.")]
    Failed(#[source] VeoError),
}

/// Instruction sent alongside the image.
pub fn analysis_instruction() -> String {
    format!(
        "Analyze the provided image and generate a JSON object containing a detailed prompt for a video generation model like VEO. The JSON object must have three keys:\n\
         1. \"prompt\": A detailed string describing the scene, subjects, atmosphere, and suggesting cinematic motion (e.g., slow pan, zoom in, subtle movement).\n\
         2. \"mood\": Choose the most fitting mood from this list: {}.\n\
         3. \"style\": Choose the most fitting artistic style from this list: {}.\n\
         \n\
         Your entire response must be only the raw JSON object, without any markdown formatting or extra text.",
        joined_labels(Mood::ALL),
        joined_labels(Style::ALL)
    )
}

/// Response schema restricting mood and style to the known labels.
fn response_schema() -> serde_json::Value {
    let moods: Vec<&str> = Mood::ALL.iter().map(|m| m.label()).collect();
    let styles: Vec<&str> = Style::ALL.iter().map(|s| s.label()).collect();
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "prompt": { "type": "STRING" },
            "mood": { "type": "STRING", "enum": moods },
            "style": { "type": "STRING", "enum": styles },
        },
        "required": ["prompt", "mood", "style"],
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Parse the model's text answer into an `AnalyzedPrompt`.
///
/// Both malformed JSON and a mood or style outside the option sets count as
/// an invalid format.
pub fn parse_analysis(text: &str) -> Result<AnalyzedPrompt, AnalysisError> {
    serde_json::from_str(text.trim()).map_err(|e| {
        log::warn!("Analysis returned unparsable output ({}): {}", e, text);
        AnalysisError::InvalidFormat {
            raw: text.to_string(),
        }
    })
}

impl VeoClient {
    /// Ask the analysis model to turn an image into a prompt, mood and style.
    ///
    /// Makes a single request; there is no retry.
    pub async fn analyze_image(&self, image: &MediaAsset) -> Result<AnalyzedPrompt, AnalysisError> {
        let url = self.model_url(self.analysis_model(), "generateContent");
        let request_body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": analysis_instruction() },
                    { "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() } },
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        });

        log::info!("Analyzing image {} with {}", image.file_name, self.analysis_model());
        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", self.api_key())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AnalysisError::Failed(e.into()))?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            log::error!("Error analyzing image: {}", error);
            return Err(AnalysisError::Failed(error));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Failed(e.into()))?;

        let text = body.text().ok_or_else(|| AnalysisError::InvalidFormat {
            raw: String::new(),
        })?;
        parse_analysis(&text)
    }
}
