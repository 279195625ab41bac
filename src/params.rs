//! The immutable parameter record assembled into a prompt.
//!
//! A `GenerationParameters` value is built fresh for every submission and
//! dropped once the request finishes. Values that only matter for some
//! combinations of choices (overlay styling, audio volume, narration) are
//! derived on read instead of being reset when another field changes.

use crate::media::MediaAsset;
use crate::options::{
    AspectRatio, ImageFilter, IntroType, Mood, ParticleType, Resolution, SoundEffect, Style,
    TextAnimationSpeed, TextAnimationStyle,
};

/// Clamp a percentage to 0..=100.
pub fn percent(value: u32) -> u8 {
    value.min(100) as u8
}

/// Which audio accompanies the clip. Only one source can be active.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AudioSource {
    #[default]
    None,
    SoundEffect {
        effect: SoundEffect,
        intensity: u8,
    },
    Upload {
        asset: MediaAsset,
        volume: u8,
    },
    Recording {
        asset: MediaAsset,
        volume: u8,
    },
    TextToSpeech {
        text: String,
    },
}

impl AudioSource {
    /// The uploaded or recorded clip, if any.
    pub fn asset(&self) -> Option<&MediaAsset> {
        match self {
            AudioSource::Upload { asset, .. } | AudioSource::Recording { asset, .. } => Some(asset),
            _ => None,
        }
    }

    /// Playback volume; only meaningful for uploaded or recorded audio.
    pub fn volume(&self) -> Option<u8> {
        match self {
            AudioSource::Upload { volume, .. } | AudioSource::Recording { volume, .. } => {
                Some(*volume)
            }
            _ => None,
        }
    }

    /// Narration text, when text-to-speech is active and non-blank.
    pub fn narration(&self) -> Option<&str> {
        match self {
            AudioSource::TextToSpeech { text } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }

    /// The selected sound effect, unless it is `None`.
    pub fn sound_effect(&self) -> Option<(SoundEffect, u8)> {
        match self {
            AudioSource::SoundEffect { effect, intensity } if !effect.is_none() => {
                Some((*effect, *intensity))
            }
            _ => None,
        }
    }
}

/// Background box drawn behind overlay text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBackground {
    pub color: String,
    pub opacity: u8,
    /// Blur radius in pixels.
    pub blur: u32,
}

/// Animated text rendered on top of the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub color: Option<String>,
    pub background: Option<TextBackground>,
    pub animation_style: Option<TextAnimationStyle>,
    pub animation_speed: Option<TextAnimationSpeed>,
    /// Zero leaves the duration to the model.
    pub duration_secs: f32,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: Some("#FFFFFF".to_string()),
            background: Some(TextBackground {
                color: "#000000".to_string(),
                opacity: 50,
                blur: 5,
            }),
            animation_style: Some(TextAnimationStyle::default()),
            animation_speed: Some(TextAnimationSpeed::default()),
            duration_secs: 3.0,
        }
    }
}

impl TextOverlay {
    /// Overlay text with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

/// Particle layer and its density percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleEffect {
    pub kind: ParticleType,
    pub density: u8,
}

/// Post-processing toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualEffects {
    pub motion_blur: bool,
    pub vignette: bool,
    pub film_grain: bool,
    pub particles: Option<ParticleEffect>,
    pub filter: ImageFilter,
}

impl VisualEffects {
    /// Particle layer, unless the selection is `None`.
    pub fn active_particles(&self) -> Option<ParticleEffect> {
        self.particles.filter(|p| !p.kind.is_none())
    }
}

/// Everything the user chose for one generation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationParameters {
    pub prompt: String,
    pub mood: Mood,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
    pub resolution: Option<Resolution>,
    pub intro: IntroType,
    pub overlay: TextOverlay,
    pub image: Option<MediaAsset>,
    pub audio: AudioSource,
    pub effects: VisualEffects,
}

impl GenerationParameters {
    /// Overlay settings, only when there is text to render.
    pub fn active_overlay(&self) -> Option<&TextOverlay> {
        if self.overlay.trimmed_text().is_empty() {
            None
        } else {
            Some(&self.overlay)
        }
    }

    /// The scene description with surrounding whitespace removed.
    pub fn trimmed_prompt(&self) -> &str {
        self.prompt.trim()
    }

    /// True when the request carries neither a description nor an image.
    pub fn is_empty(&self) -> bool {
        self.trimmed_prompt().is_empty() && self.image.is_none()
    }
}
