//! Form state: every user choice as a flat, serializable record.
//!
//! A `FormState` is what a scene preset file contains and what CLI flags
//! edit. `FormState::default()` is the reset state. Calling
//! [`FormState::submission`] validates the form and builds the immutable
//! request for one generation run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::media::{MediaAsset, MediaError};
use crate::options::{
    AspectRatio, ImageFilter, IntroType, Mood, ParticleType, Resolution, SoundEffect, Style,
    TextAnimationSpeed, TextAnimationStyle,
};
use crate::params::{
    percent, AudioSource, GenerationParameters, ParticleEffect, TextBackground, TextOverlay,
    VisualEffects,
};

/// Shown when a submission has neither a description nor an image.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide a prompt or an image to generate a video.";

/// Which audio source the form has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSourceKind {
    #[default]
    None,
    SoundEffect,
    Upload,
    Tts,
    Record,
}

/// Text overlay fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayForm {
    pub text: String,
    pub color: String,
    pub background_color: String,
    pub background_opacity: u32,
    pub background_blur: u32,
    pub animation: TextAnimationStyle,
    pub speed: TextAnimationSpeed,
    /// Seconds, in half-second steps in the form.
    pub duration: f32,
}

impl Default for OverlayForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: "#FFFFFF".to_string(),
            background_color: "#000000".to_string(),
            background_opacity: 50,
            background_blur: 5,
            animation: TextAnimationStyle::default(),
            speed: TextAnimationSpeed::default(),
            duration: 3.0,
        }
    }
}

/// Audio fields. Only the fields of the selected `source` are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioForm {
    pub source: AudioSourceKind,
    /// Uploaded MP3 or recorded WebM clip.
    pub file: Option<PathBuf>,
    pub volume: u32,
    pub sound_effect: SoundEffect,
    pub intensity: u32,
    pub tts_text: String,
}

impl Default for AudioForm {
    fn default() -> Self {
        Self {
            source: AudioSourceKind::None,
            file: None,
            volume: 50,
            sound_effect: SoundEffect::None,
            intensity: 50,
            tts_text: String::new(),
        }
    }
}

/// Visual effect fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsForm {
    pub motion_blur: bool,
    pub vignette: bool,
    pub film_grain: bool,
    pub particles: ParticleType,
    pub particle_density: u32,
    pub filter: ImageFilter,
}

impl Default for EffectsForm {
    fn default() -> Self {
        Self {
            motion_blur: false,
            vignette: false,
            film_grain: false,
            particles: ParticleType::None,
            particle_density: 50,
            filter: ImageFilter::None,
        }
    }
}

/// The complete form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormState {
    pub prompt: String,
    pub image: Option<PathBuf>,
    /// Let the analysis model write the prompt, mood and style from the image.
    pub analyze: bool,
    pub mood: Mood,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub intro: IntroType,
    pub overlay: OverlayForm,
    pub audio: AudioForm,
    pub effects: EffectsForm,
}

/// A validated request, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Parameters chosen by hand.
    Manual(GenerationParameters),
    /// Prompt, mood and style come from analyzing the image.
    Analyze {
        image: MediaAsset,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
    },
}

/// Errors that can occur while loading or validating the form.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("Failed to read preset '{}': {source}", path.display())]
    PresetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse preset '{}': {source}", path.display())]
    PresetParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl FormState {
    /// Load a scene preset from a TOML file.
    pub fn load(path: &Path) -> Result<Self, FormError> {
        let content = std::fs::read_to_string(path).map_err(|e| FormError::PresetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|e| FormError::PresetParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize the form as a preset file.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Select a different audio source.
    ///
    /// Fields of the other sources are left alone; they are ignored when the
    /// submission is built.
    pub fn select_audio(&mut self, source: AudioSourceKind) {
        self.audio.source = source;
    }

    /// Check that there is something to generate from.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.prompt.trim().is_empty() && self.image.is_none() {
            return Err(FormError::MissingInput);
        }
        Ok(())
    }

    /// Whether the run goes through image analysis, which drops the audio.
    pub fn will_analyze(&self) -> bool {
        self.analyze && self.image.is_some()
    }

    /// Validate the form and build the request for one run.
    ///
    /// Fails with [`FormError::MissingInput`] before touching any file when
    /// both the prompt and the image are missing.
    pub fn submission(&self) -> Result<Submission, FormError> {
        self.validate()?;

        let image = self
            .image
            .as_deref()
            .map(MediaAsset::load_image)
            .transpose()?;

        if self.will_analyze() {
            if let Some(image) = image {
                return Ok(Submission::Analyze {
                    image,
                    aspect_ratio: self.aspect_ratio,
                    resolution: self.resolution,
                });
            }
        }

        Ok(Submission::Manual(GenerationParameters {
            prompt: self.prompt.clone(),
            mood: self.mood,
            style: self.style,
            aspect_ratio: self.aspect_ratio,
            resolution: Some(self.resolution),
            intro: self.intro,
            overlay: self.text_overlay(),
            image,
            audio: self.audio_source()?,
            effects: self.visual_effects(),
        }))
    }

    fn text_overlay(&self) -> TextOverlay {
        let form = &self.overlay;
        TextOverlay {
            text: form.text.clone(),
            color: Some(form.color.clone()),
            background: Some(TextBackground {
                color: form.background_color.clone(),
                opacity: percent(form.background_opacity),
                blur: form.background_blur,
            }),
            animation_style: Some(form.animation),
            animation_speed: Some(form.speed),
            duration_secs: form.duration,
        }
    }

    fn audio_source(&self) -> Result<AudioSource, FormError> {
        let form = &self.audio;
        let source = match form.source {
            AudioSourceKind::None => AudioSource::None,
            AudioSourceKind::SoundEffect if form.sound_effect.is_none() => AudioSource::None,
            AudioSourceKind::SoundEffect => AudioSource::SoundEffect {
                effect: form.sound_effect,
                intensity: percent(form.intensity),
            },
            AudioSourceKind::Upload | AudioSourceKind::Record => match &form.file {
                Some(path) => {
                    let asset = MediaAsset::load_audio(path)?;
                    let volume = percent(form.volume);
                    if form.source == AudioSourceKind::Upload {
                        AudioSource::Upload { asset, volume }
                    } else {
                        AudioSource::Recording { asset, volume }
                    }
                }
                None => {
                    log::warn!("Audio source {:?} selected without a file, ignoring", form.source);
                    AudioSource::None
                }
            },
            AudioSourceKind::Tts if form.tts_text.trim().is_empty() => AudioSource::None,
            AudioSourceKind::Tts => AudioSource::TextToSpeech {
                text: form.tts_text.clone(),
            },
        };
        Ok(source)
    }

    fn visual_effects(&self) -> VisualEffects {
        let form = &self.effects;
        VisualEffects {
            motion_blur: form.motion_blur,
            vignette: form.vignette,
            film_grain: form.film_grain,
            particles: (!form.particles.is_none()).then(|| ParticleEffect {
                kind: form.particles,
                density: percent(form.particle_density),
            }),
            filter: form.filter,
        }
    }
}
