//! Prompt assembly: turns a parameter record into one instruction string.
//!
//! Clauses are appended in a fixed order and joined with single spaces:
//! intro, scene, style/mood, framing, visual effects, audio, text overlay.

use crate::options::IntroType;
use crate::params::{AudioSource, GenerationParameters, TextOverlay};

/// Scene clause used when only an image was supplied.
pub const IMAGE_ONLY_SCENE: &str = "Animate the provided image into a beautiful video clip.";

/// Fixed sentence for every intro except `None` and `Title Card`.
fn fixed_intro_clause(intro: IntroType) -> Option<&'static str> {
    let clause = match intro {
        IntroType::None | IntroType::TitleCard => return None,
        IntroType::LogoAnimation => "Start the video with a short, professional, and abstract logo animation reveal before the main scene begins.",
        IntroType::FadeInOut => "Start the video with a simple, elegant fade-in from black.",
        IntroType::DynamicTransition => "Begin the video with a creative and dynamic transition into the main scene.",
        IntroType::GlitchIntro => "Start the video with a high-energy, digital glitch effect transition into the main scene.",
        IntroType::LensFlare => "Begin the video with a dramatic and cinematic lens flare effect sweeping across the screen.",
        IntroType::InkReveal => "Start the video with an artistic ink bleed or watercolor reveal of the first frame.",
        IntroType::ParticleBurst => "Begin the video with an explosion of particles that resolves into the main scene.",
        IntroType::Wipe => "Begin the video with a clean, cinematic wipe transition (e.g., left-to-right, top-to-bottom, or a creative shape) into the main scene.",
        IntroType::Slide => "Start the video with the first frame sliding smoothly into view from off-screen (e.g., from the left, right, top, or bottom).",
        IntroType::Zoom => "Begin the video with a rapid zoom-in from a black or white screen, or a blur, that resolves into the main scene.",
        IntroType::Crossfade => "Begin the video with a smooth crossfade transition from a black screen into the main scene.",
        IntroType::Iris => "Start the video with a classic iris wipe transition (a circle that expands or contracts) to reveal the main scene.",
        IntroType::ClockWipe => "Begin the video with a clock wipe transition, where a radial line sweeps around the screen to reveal the main scene, like the hand of a clock.",
        IntroType::CurtainOpen => "Begin the video with a theatrical curtain-opening effect, where two black bars or a simulated curtain part to reveal the main scene.",
        IntroType::FocusPull => "Start the video with a cinematic focus pull, where the camera racks focus from a blurry foreground or background element to reveal the main subject in sharp detail.",
        IntroType::Shatter => "Begin the video with the first frame appearing as if it's shattering into pieces, which then reassemble to form the complete scene.",
        IntroType::HandDrawnReveal => "Begin the video with a creative hand-drawn scribble animation that reveals the first frame of the main scene.",
        IntroType::PixelateIn => "Start the video with a heavily pixelated image that gradually resolves into the sharp, clear first frame of the main scene.",
        IntroType::StopMotionReveal => "Begin the video with a stop-motion animation effect where elements of the scene build up frame-by-frame to reveal the full first scene.",
        IntroType::BookOpen => "Begin the video with an animation of a book opening, with the first frame of the scene appearing on one of its pages before transitioning to the full video.",
        IntroType::DigitalScanlines => "Start the video with a retro digital scanline effect, like an old CRT monitor powering on, that resolves into the main scene.",
        IntroType::OldFilmProjector => "Begin the video with the effect of an old film projector starting up, complete with film leader, a countdown, and the sound of a projector, before transitioning into the main scene.",
        IntroType::Kaleidoscope => "Begin the video with a beautiful, unfolding kaleidoscope effect that resolves into the main scene.",
        IntroType::LiquidMetal => "Start the video with a fluid, liquid metal or mercury-like animation that forms into the first frame.",
        IntroType::TimeLapseReveal => "Begin the video with a fast-paced time-lapse sequence (e.g., clouds moving, a flower blooming) that transitions into the main scene.",
    };
    Some(clause)
}

/// The opening clause for the selected intro, if any.
///
/// `Title Card` quotes the overlay text, falling back to the scene prompt.
pub fn intro_clause(params: &GenerationParameters) -> Option<String> {
    if params.intro == IntroType::TitleCard {
        let title = match params.overlay.trimmed_text() {
            "" => params.trimmed_prompt(),
            text => text,
        };
        return Some(if title.is_empty() {
            "Begin the video with a stylish, animated title card.".to_string()
        } else {
            format!(
                "Begin the video with a stylish, animated title card that creatively displays the text: \"{}\".",
                title
            )
        });
    }
    fixed_intro_clause(params.intro).map(str::to_string)
}

fn audio_clause(audio: &AudioSource) -> Option<String> {
    match audio {
        AudioSource::Upload { volume, .. } | AudioSource::Recording { volume, .. } => {
            Some(format!(
                "The video's motion, pacing, and emotional tone should be directly inspired by and synchronized with an accompanying audio track. \
                 The intended volume of this audio is {}%, which should influence the video's intensity. \
                 A lower volume suggests a more subtle, atmospheric role for the music, while a higher volume suggests the music is a dominant, driving force in the scene.",
                volume
            ))
        }
        AudioSource::SoundEffect { .. } => {
            let (effect, intensity) = audio.sound_effect()?;
            Some(format!(
                "The video should be thematically appropriate for an accompanying sound effect described as: \"{}\". \
                 The thematic influence of this sound should be at {}% intensity. \
                 A lower intensity means a more subtle connection, while a higher intensity means the video's theme is strongly dominated by the sound effect. \
                 The video should NOT generate its own audio.",
                effect.label(),
                intensity
            ))
        }
        AudioSource::TextToSpeech { .. } => audio.narration().map(|text| {
            format!(
                "The video's mood, theme, and pacing should be appropriate for a voiceover narration that says: \"{}\". \
                 The video should NOT generate its own audio or voiceover.",
                text
            )
        }),
        AudioSource::None => None,
    }
}

fn overlay_clause(overlay: &TextOverlay) -> String {
    let mut clause = format!(
        "CRITICAL INSTRUCTION: Render the exact text \"{}\" as an animated overlay.",
        overlay.trimmed_text()
    );
    if let Some(color) = &overlay.color {
        clause.push_str(&format!(" The text color should be {}.", color));
    }
    if let Some(background) = &overlay.background {
        clause.push_str(&format!(
            " The text should have a background color of {}. Make the background a simple, clean rectangle behind the text.",
            background.color
        ));
        clause.push_str(&format!(
            " The background should have an opacity of approximately {}%.",
            background.opacity
        ));
        if background.blur > 0 {
            clause.push_str(&format!(
                " Apply a blur effect of roughly {}px to the background.",
                background.blur
            ));
        }
    }
    if let Some(style) = overlay.animation_style {
        clause.push_str(&format!(
            " The text should animate using a '{}' effect.",
            style
        ));
    }
    if let Some(speed) = overlay.animation_speed {
        clause.push_str(&format!(" The animation speed should be {}.", speed));
    }
    if overlay.duration_secs > 0.0 {
        clause.push_str(&format!(
            " The animation should last for approximately {} seconds.",
            overlay.duration_secs
        ));
    }
    clause.push_str(" The text must be clearly visible and integrated aesthetically into the scene.");
    clause
}

/// Build the full prompt for a parameter record.
pub fn assemble_prompt(params: &GenerationParameters) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(intro) = intro_clause(params) {
        parts.push(intro);
    }

    let scene = params.trimmed_prompt();
    if !scene.is_empty() {
        parts.push(scene.to_string());
    } else if params.image.is_some() {
        parts.push(IMAGE_ONLY_SCENE.to_string());
    }

    parts.push(format!(
        "The animation style should be {}, evoking a {} mood.",
        params.style, params.mood
    ));
    parts.push(format!(
        "The video must be in a {} aspect ratio.",
        params.aspect_ratio
    ));
    if let Some(resolution) = params.resolution {
        parts.push(format!(
            "The final video quality should be {}. For example, 'HD' is 1080p and '4K' is 2160p.",
            resolution
        ));
    }

    let effects = &params.effects;
    if effects.motion_blur {
        parts.push("Apply a cinematic motion blur effect to enhance the sense of movement and create a more dynamic look.".to_string());
    }
    if effects.vignette {
        parts.push("Apply a dark, subtle vignette effect to the edges of the video to create a more focused and dramatic cinematic feel.".to_string());
    }
    if effects.film_grain {
        parts.push("Add a subtle, realistic film grain effect over the entire video to give it an authentic, cinematic, celluloid look.".to_string());
    }
    if !effects.filter.is_none() {
        parts.push(format!(
            "Apply a '{}' image filter to the entire video for a stylized, post-processed look.",
            effects.filter
        ));
    }
    if let Some(particles) = effects.active_particles() {
        parts.push(format!(
            "Incorporate a visual particle effect of '{}' into the scene. \
             The density of these particles should be approximately {}%. \
             A lower percentage means a subtle effect, while a higher percentage means a more prominent effect.",
            particles.kind, particles.density
        ));
    }

    if let Some(audio) = audio_clause(&params.audio) {
        parts.push(audio);
    }

    if let Some(overlay) = params.active_overlay() {
        parts.push(overlay_clause(overlay));
    }

    parts.join(" ")
}
