//! Playing a generated clip with its audio.
//!
//! The video is handed to an external player (mpv by default). Audio tracks
//! are attached with `--audio-file` rather than muxed into the file. Narration
//! is spoken by a separate text-to-speech process that starts with playback
//! and is stopped when the player exits.

use std::process::{Child, Command, ExitStatus, Stdio};

use crate::config::PlaybackConfig;
use crate::studio::GenerationResult;

/// Errors that can occur during playback.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("{player} not found. Please install it with:\n\n    brew install {player}\n")]
    PlayerNotFound { player: String },

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A text-to-speech invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// The processes to start for one playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackPlan {
    pub player: String,
    pub player_args: Vec<String>,
    pub speech: Option<SpeechCommand>,
}

impl PlaybackPlan {
    /// Build the plan for a generation result.
    ///
    /// The clip loops unless there is narration, so speech and video end
    /// together.
    pub fn from_result(result: &GenerationResult, config: &PlaybackConfig) -> Self {
        let mut player_args = Vec::new();

        let speech = result
            .speech_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| SpeechCommand {
                program: config.resolved_speech_command(),
                args: vec![text.to_string()],
            });

        if speech.is_none() {
            player_args.push("--loop-file=inf".to_string());
        }

        if let Some(track) = &result.audio {
            player_args.push(format!("--audio-file={}", track.path.display()));
            if let Some(volume) = result.audio_volume {
                player_args.push(format!("--volume={}", volume));
            }
        }

        player_args.push(result.video_path.to_string_lossy().into_owned());

        Self {
            player: config.player.clone(),
            player_args,
            speech,
        }
    }

    /// The player invocation as a single line, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.player.as_str())
            .chain(self.player_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Play the clip, blocking until the player exits.
///
/// Speech starts once the player is running. It is killed when the player
/// exits, whether the clip ended or the window was closed.
pub fn play(plan: &PlaybackPlan) -> Result<ExitStatus, PlaybackError> {
    log::debug!("Starting player: {}", plan.command_line());
    let mut player = Command::new(&plan.player)
        .args(&plan.player_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlaybackError::PlayerNotFound {
                    player: plan.player.clone(),
                }
            } else {
                PlaybackError::SpawnFailed {
                    program: plan.player.clone(),
                    source: e,
                }
            }
        })?;

    let mut speech = plan.speech.as_ref().and_then(|cmd| match spawn_speech(cmd) {
        Ok(child) => Some(child),
        Err(e) => {
            log::warn!("Narration unavailable: {}", e);
            None
        }
    });

    let status = player.wait()?;

    if let Some(child) = speech.as_mut() {
        stop_speech(child);
    }

    Ok(status)
}

fn spawn_speech(cmd: &SpeechCommand) -> Result<Child, PlaybackError> {
    Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PlaybackError::SpawnFailed {
            program: cmd.program.clone(),
            source: e,
        })
}

fn stop_speech(child: &mut Child) {
    if matches!(child.try_wait(), Ok(None)) {
        let _ = child.kill();
    }
    let _ = child.wait();
}
