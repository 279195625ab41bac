//! CLI enum types.

use clap::ValueEnum;

use crate::form::AudioSourceKind;

/// Audio source selectable with `--audio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AudioChoice {
    #[default]
    None,
    SoundEffect,
    Upload,
    Tts,
    Record,
}

impl From<AudioChoice> for AudioSourceKind {
    fn from(choice: AudioChoice) -> Self {
        match choice {
            AudioChoice::None => AudioSourceKind::None,
            AudioChoice::SoundEffect => AudioSourceKind::SoundEffect,
            AudioChoice::Upload => AudioSourceKind::Upload,
            AudioChoice::Tts => AudioSourceKind::Tts,
            AudioChoice::Record => AudioSourceKind::Record,
        }
    }
}
