//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use super::enums::AudioChoice;
use crate::options::{
    AspectRatio, ImageFilter, IntroType, Mood, ParticleType, Resolution, SoundEffect, Style,
    TextAnimationSpeed, TextAnimationStyle,
};

/// Parse and validate a percentage (0-100)
fn parse_percent(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid percentage", s))?;
    if value > 100 {
        return Err(format!("Percentage must be between 0 and 100, got {}", value));
    }
    Ok(value)
}

/// Parse and validate an overlay duration (0-10 seconds)
fn parse_seconds(s: &str) -> Result<f32, String> {
    let secs: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if !(0.0..=10.0).contains(&secs) {
        return Err(format!("Duration must be between 0 and 10 seconds, got {}", secs));
    }
    Ok(secs)
}

/// Parse an option label, e.g. `--style "pixel art"`.
fn parse_label<T>(s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(s).map_err(|e| e.to_string())
}

/// Generate short cinematic video clips from a prompt or an image
#[derive(Parser, Debug)]
#[command(name = "cinegen")]
#[command(version, about = "Generate cinematic video clips with Veo", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video clip
    Generate(GenerateArgs),
    /// Print the assembled prompt without calling the API
    Prompt(GenerateArgs),
    /// Suggest a prompt, mood and style for an image
    Analyze {
        /// Image to analyze (PNG, JPEG, WebP or GIF)
        image: PathBuf,
    },
    /// Record a voice clip from the microphone
    Record {
        /// Directory for voice_recording.webm (default: output dir)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Play a generated clip from its result manifest
    Play {
        /// Manifest (.json) or video (.mp4) written by `generate`
        manifest: PathBuf,
    },
    /// List valid values for an option
    Options {
        /// Option set, e.g. mood, style, intro (default: list option sets)
        kind: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Everything the generator form offers, as flags.
///
/// Flags override the values loaded from `--preset`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Scene preset file (TOML) to start from
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Scene description
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Source image to animate
    #[arg(long, short)]
    pub image: Option<PathBuf>,

    /// Let the model write prompt, mood and style from the image
    #[arg(long)]
    pub analyze: bool,

    #[arg(long, value_parser = parse_label::<Mood>)]
    pub mood: Option<Mood>,

    #[arg(long, value_parser = parse_label::<Style>)]
    pub style: Option<Style>,

    /// Aspect ratio, e.g. 16:9 or 9:16
    #[arg(long, value_parser = parse_label::<AspectRatio>)]
    pub aspect_ratio: Option<AspectRatio>,

    /// SD, HD or 4K
    #[arg(long, value_parser = parse_label::<Resolution>)]
    pub resolution: Option<Resolution>,

    /// Intro effect, e.g. "Title Card"
    #[arg(long, value_parser = parse_label::<IntroType>)]
    pub intro: Option<IntroType>,

    /// Overlay text rendered on the clip
    #[arg(long)]
    pub text: Option<String>,

    #[arg(long)]
    pub text_color: Option<String>,

    /// Overlay background color
    #[arg(long)]
    pub text_bg: Option<String>,

    /// Overlay background opacity (0-100)
    #[arg(long, value_parser = parse_percent)]
    pub text_bg_opacity: Option<u32>,

    /// Overlay background blur in pixels
    #[arg(long)]
    pub text_bg_blur: Option<u32>,

    #[arg(long, value_parser = parse_label::<TextAnimationStyle>)]
    pub text_animation: Option<TextAnimationStyle>,

    #[arg(long, value_parser = parse_label::<TextAnimationSpeed>)]
    pub text_speed: Option<TextAnimationSpeed>,

    /// How long the overlay stays visible, in seconds (e.g. 2.5)
    #[arg(long, value_parser = parse_seconds)]
    pub text_duration: Option<f32>,

    /// Audio source (inferred from the other audio flags when omitted)
    #[arg(long, value_enum)]
    pub audio: Option<AudioChoice>,

    /// MP3 to play alongside the clip
    #[arg(long)]
    pub audio_file: Option<PathBuf>,

    /// Record a voice clip before generating
    #[arg(long)]
    pub record: bool,

    /// Volume for uploaded or recorded audio (0-100)
    #[arg(long, value_parser = parse_percent)]
    pub audio_volume: Option<u32>,

    #[arg(long, value_parser = parse_label::<SoundEffect>)]
    pub sound_effect: Option<SoundEffect>,

    /// Sound effect intensity (0-100)
    #[arg(long, value_parser = parse_percent)]
    pub sound_intensity: Option<u32>,

    /// Narration spoken during playback
    #[arg(long)]
    pub tts: Option<String>,

    #[arg(long)]
    pub motion_blur: bool,

    #[arg(long)]
    pub vignette: bool,

    #[arg(long)]
    pub film_grain: bool,

    #[arg(long, value_parser = parse_label::<ParticleType>)]
    pub particles: Option<ParticleType>,

    /// Particle density (0-100)
    #[arg(long, value_parser = parse_percent)]
    pub particle_density: Option<u32>,

    #[arg(long, value_parser = parse_label::<ImageFilter>)]
    pub filter: Option<ImageFilter>,

    /// Play the clip when it is ready
    #[arg(long)]
    pub play: bool,

    /// Where to write the clip (default: from config)
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,
}
