//! Subcommand helpers: building the form from flags, listing options, and
//! config actions.

use std::io::Write;
use std::path::Path;

use super::args::{ConfigAction, GenerateArgs};
use crate::config::{default_path, Config};
use crate::form::{AudioSourceKind, FormError, FormState};
use crate::options::{labels_for_kind, OPTION_KINDS};
use crate::veo::PollState;

/// Load the preset (if any) and apply the flags on top of it.
pub fn build_form(args: &GenerateArgs) -> Result<FormState, FormError> {
    let mut form = match &args.preset {
        Some(path) => FormState::load(path)?,
        None => FormState::default(),
    };
    apply_flags(args, &mut form);
    Ok(form)
}

/// Copy every flag that was given onto the form.
pub fn apply_flags(args: &GenerateArgs, form: &mut FormState) {
    if let Some(prompt) = &args.prompt {
        form.prompt = prompt.clone();
    }
    if let Some(image) = &args.image {
        form.image = Some(image.clone());
    }
    form.analyze |= args.analyze;

    if let Some(mood) = args.mood {
        form.mood = mood;
    }
    if let Some(style) = args.style {
        form.style = style;
    }
    if let Some(ratio) = args.aspect_ratio {
        form.aspect_ratio = ratio;
    }
    if let Some(resolution) = args.resolution {
        form.resolution = resolution;
    }
    if let Some(intro) = args.intro {
        form.intro = intro;
    }

    let overlay = &mut form.overlay;
    if let Some(text) = &args.text {
        overlay.text = text.clone();
    }
    if let Some(color) = &args.text_color {
        overlay.color = color.clone();
    }
    if let Some(bg) = &args.text_bg {
        overlay.background_color = bg.clone();
    }
    if let Some(opacity) = args.text_bg_opacity {
        overlay.background_opacity = opacity;
    }
    if let Some(blur) = args.text_bg_blur {
        overlay.background_blur = blur;
    }
    if let Some(animation) = args.text_animation {
        overlay.animation = animation;
    }
    if let Some(speed) = args.text_speed {
        overlay.speed = speed;
    }
    if let Some(duration) = args.text_duration {
        overlay.duration = duration;
    }

    let audio = &mut form.audio;
    if let Some(file) = &args.audio_file {
        audio.file = Some(file.clone());
    }
    if let Some(volume) = args.audio_volume {
        audio.volume = volume;
    }
    if let Some(effect) = args.sound_effect {
        audio.sound_effect = effect;
    }
    if let Some(intensity) = args.sound_intensity {
        audio.intensity = intensity;
    }
    if let Some(text) = &args.tts {
        audio.tts_text = text.clone();
    }
    if let Some(kind) = selected_audio(args) {
        form.select_audio(kind);
    }

    let effects = &mut form.effects;
    effects.motion_blur |= args.motion_blur;
    effects.vignette |= args.vignette;
    effects.film_grain |= args.film_grain;
    if let Some(particles) = args.particles {
        effects.particles = particles;
    }
    if let Some(density) = args.particle_density {
        effects.particle_density = density;
    }
    if let Some(filter) = args.filter {
        effects.filter = filter;
    }
}

/// `--audio` wins; otherwise the source is inferred from the audio flags.
fn selected_audio(args: &GenerateArgs) -> Option<AudioSourceKind> {
    if let Some(choice) = args.audio {
        return Some(choice.into());
    }
    if args.record {
        Some(AudioSourceKind::Record)
    } else if args.audio_file.is_some() {
        Some(AudioSourceKind::Upload)
    } else if args.sound_effect.is_some() {
        Some(AudioSourceKind::SoundEffect)
    } else if args.tts.is_some() {
        Some(AudioSourceKind::Tts)
    } else {
        None
    }
}

/// Print the valid values of an option set, or the set names.
pub fn list_options(kind: Option<&str>) -> Result<(), String> {
    match kind {
        None => {
            println!("Option sets:");
            for kind in OPTION_KINDS {
                println!("  {}", kind);
            }
            println!();
            println!("Use `cinegen options <set>` to list its values.");
            Ok(())
        }
        Some(kind) => {
            let labels = labels_for_kind(kind).ok_or_else(|| {
                format!(
                    "Unknown option set '{}'. Available: {}",
                    kind,
                    OPTION_KINDS.join(", ")
                )
            })?;
            for label in labels {
                println!("{}", label);
            }
            Ok(())
        }
    }
}

/// Print progress while a generation is polled.
pub fn print_progress(state: &PollState) {
    match state {
        PollState::Submitted => print!("Generating"),
        PollState::Polling { .. } => print!("."),
        PollState::Done { .. } => println!(" done"),
        PollState::Failed { .. } => println!(" failed"),
    }
    std::io::stdout().flush().ok();
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config_path: Option<&Path>,
    config: &Config,
) -> Result<(), String> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            if path.exists() {
                println!("# Config file: {} (exists)", path.display());
            } else {
                println!("# Config file: {} (not found, using defaults)", path.display());
            }
            println!("# Output dir: {}", config.output.resolved_dir().display());
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            Ok(())
        }
        ConfigAction::Init { force } => {
            Config::write_default(&path, force).map_err(|e| e.to_string())?;
            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}
