//! The submission pipeline.
//!
//! A [`Studio`] turns a validated [`Submission`] into a video on disk:
//! optional image analysis, prompt assembly, submission, polling, and
//! download. The outcome is a [`GenerationResult`], also written next to the
//! video as a JSON manifest so the clip can be played again later.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::form::{FormError, Submission};
use crate::media::MediaAsset;
use crate::params::{AudioSource, GenerationParameters};
use crate::prompt::assemble_prompt;
use crate::veo::{
    AnalysisError, AnalyzedPrompt, Clock, Operation, OperationSource, PollConfig, PollState,
    Poller, VeoClient, VeoError,
};

/// The remote operations a studio needs.
pub trait GenerationBackend: OperationSource {
    fn submit(
        &self,
        prompt: &str,
        image: Option<&MediaAsset>,
    ) -> impl Future<Output = Result<Operation, VeoError>> + Send;

    fn download(&self, uri: &str, dest: &Path)
        -> impl Future<Output = Result<PathBuf, VeoError>> + Send;

    fn analyze(
        &self,
        image: &MediaAsset,
    ) -> impl Future<Output = Result<AnalyzedPrompt, AnalysisError>> + Send;
}

impl GenerationBackend for VeoClient {
    async fn submit(&self, prompt: &str, image: Option<&MediaAsset>) -> Result<Operation, VeoError> {
        self.submit_generation(prompt, image).await
    }

    async fn download(&self, uri: &str, dest: &Path) -> Result<PathBuf, VeoError> {
        self.download_video(uri, dest).await
    }

    async fn analyze(&self, image: &MediaAsset) -> Result<AnalyzedPrompt, AnalysisError> {
        self.analyze_image(image).await
    }
}

/// Where the audio accompanying a clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioTrackKind {
    Upload,
    Recording,
    SoundEffect,
}

/// An audio file played alongside the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub kind: AudioTrackKind,
}

/// A finished generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub video_path: PathBuf,
    /// The assembled prompt that was submitted.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_volume: Option<u8>,
}

impl GenerationResult {
    /// Path of the JSON manifest that belongs to `video_path`.
    pub fn manifest_path(video_path: &Path) -> PathBuf {
        video_path.with_extension("json")
    }

    /// Read a result manifest.
    pub fn load(path: &Path) -> Result<Self, StudioError> {
        let content = std::fs::read_to_string(path).map_err(|e| StudioError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Errors that can occur while running a submission.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to generate video: {0}")]
    Generation(#[source] VeoError),

    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid result manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Output file stem: the first 16 bytes of the prompt's SHA-256 in hex,
/// followed by a unix timestamp.
pub fn output_stem(prompt: &str, timestamp: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    format!("{}-{}", hex::encode(&digest[..16]), timestamp)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Parameters for an analysis-mode submission.
///
/// Only prompt, mood, style, framing, and the image are carried over; every
/// other option keeps its default.
pub fn analyzed_parameters(
    analyzed: AnalyzedPrompt,
    image: MediaAsset,
    aspect_ratio: crate::options::AspectRatio,
    resolution: crate::options::Resolution,
) -> GenerationParameters {
    GenerationParameters {
        prompt: analyzed.prompt,
        mood: analyzed.mood,
        style: analyzed.style,
        aspect_ratio,
        resolution: Some(resolution),
        image: Some(image),
        ..Default::default()
    }
}

/// Runs submissions against a backend.
pub struct Studio<S, C> {
    backend: S,
    clock: C,
    poll: PollConfig,
    output_dir: PathBuf,
    sound_effects_dir: Option<PathBuf>,
}

impl<S: GenerationBackend, C: Clock + Clone> Studio<S, C> {
    pub fn new(backend: S, clock: C, output_dir: PathBuf) -> Self {
        Self {
            backend,
            clock,
            poll: PollConfig::default(),
            output_dir,
            sound_effects_dir: None,
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_sound_effects_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.sound_effects_dir = dir;
        self
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Turn a submission into the parameters to generate from.
    ///
    /// Analysis mode calls the analysis model once; its failure ends the run.
    pub async fn resolve(&self, submission: Submission) -> Result<GenerationParameters, StudioError> {
        match submission {
            Submission::Manual(params) => Ok(params),
            Submission::Analyze {
                image,
                aspect_ratio,
                resolution,
            } => {
                let analyzed = self.backend.analyze(&image).await?;
                log::info!(
                    "Analysis suggested mood {} and style {}",
                    analyzed.mood,
                    analyzed.style
                );
                Ok(analyzed_parameters(analyzed, image, aspect_ratio, resolution))
            }
        }
    }

    /// Run a submission end to end.
    pub async fn run<F>(&self, submission: Submission, on_progress: F) -> Result<GenerationResult, StudioError>
    where
        F: FnMut(&PollState),
    {
        let params = self.resolve(submission).await?;
        self.generate(&params, on_progress).await
    }

    /// Generate a video from parameters and write it to the output directory.
    pub async fn generate<F>(
        &self,
        params: &GenerationParameters,
        on_progress: F,
    ) -> Result<GenerationResult, StudioError>
    where
        F: FnMut(&PollState),
    {
        if params.is_empty() {
            return Err(FormError::MissingInput.into());
        }

        let prompt = assemble_prompt(params);
        log::debug!("Assembled prompt: {}", prompt);

        let operation = self
            .backend
            .submit(&prompt, params.image.as_ref())
            .await
            .map_err(StudioError::Generation)?;

        let poller = Poller::new(&self.backend, self.clock.clone(), self.poll);
        let video_uri = poller
            .run(operation, on_progress)
            .await
            .map_err(StudioError::Generation)?;

        let output_dir = absolute_dir(&self.output_dir)?;
        let stem = output_stem(&prompt, unix_timestamp());
        let video_path = self
            .backend
            .download(&video_uri, &output_dir.join(format!("{}.mp4", stem)))
            .await
            .map_err(StudioError::Generation)?;
        log::info!("Video saved to {}", video_path.display());

        let audio = self.place_audio(&params.audio, &output_dir, &stem).await?;
        // Sound effects play at full volume; intensity only shapes the prompt.
        let audio_volume = audio.as_ref().and_then(|_| params.audio.volume());

        let result = GenerationResult {
            video_path,
            prompt,
            audio,
            speech_text: params.audio.narration().map(str::to_string),
            audio_volume,
        };
        self.write_manifest(&result).await?;
        Ok(result)
    }

    /// Put the accompanying audio next to the video, if there is any.
    async fn place_audio(
        &self,
        source: &AudioSource,
        output_dir: &Path,
        stem: &str,
    ) -> Result<Option<AudioTrack>, StudioError> {
        if let Some(asset) = source.asset() {
            let path = output_dir.join(format!("{}-audio.{}", stem, asset.extension()));
            tokio::fs::write(&path, &asset.bytes)
                .await
                .map_err(|e| StudioError::Io {
                    path: path.clone(),
                    source: e,
                })?;
            let kind = match source {
                AudioSource::Recording { .. } => AudioTrackKind::Recording,
                _ => AudioTrackKind::Upload,
            };
            return Ok(Some(AudioTrack { path, kind }));
        }

        if let Some((effect, _)) = source.sound_effect() {
            let Some(dir) = &self.sound_effects_dir else {
                return Ok(None);
            };
            let path = dir.join(format!("{}.mp3", effect.file_stem()));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(Some(AudioTrack {
                    path,
                    kind: AudioTrackKind::SoundEffect,
                }));
            }
            log::warn!("No sound file for {} at {}", effect, path.display());
        }

        Ok(None)
    }

    async fn write_manifest(&self, result: &GenerationResult) -> Result<(), StudioError> {
        let path = GenerationResult::manifest_path(&result.video_path);
        let json = serde_json::to_string_pretty(result)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StudioError::Io { path, source: e })
    }
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, StudioError> {
    std::fs::create_dir_all(dir).map_err(|e| StudioError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    std::path::absolute(dir).map_err(|e| StudioError::Io {
        path: dir.to_path_buf(),
        source: e,
    })
}
