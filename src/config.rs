//! Configuration file handling for cinegen.
//!
//! Loads configuration from `<config dir>/cinegen/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::recorder::{default_device, default_input_format, RecorderConfig, DEFAULT_MAX_RECORDING};
use crate::veo::{PollConfig, DEFAULT_ANALYSIS_MODEL, DEFAULT_BASE_URL, DEFAULT_VIDEO_MODEL};

/// Configuration file structure for cinegen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub video_model: String,
    pub analysis_model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// Unset means poll until the operation finishes.
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_attempts: None,
        }
    }
}

impl PollingConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
}

impl OutputConfig {
    /// Where generated videos are written.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_output_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub player: String,
    /// Text-to-speech program, e.g. `say` or `espeak`.
    pub speech_command: Option<String>,
    /// Directory holding `<effect>.mp3` files for sound effects.
    pub sound_effects_dir: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player: "mpv".to_string(),
            speech_command: None,
            sound_effects_dir: None,
        }
    }
}

impl PlaybackConfig {
    /// Configured speech command, or the platform default.
    pub fn resolved_speech_command(&self) -> String {
        self.speech_command
            .clone()
            .unwrap_or_else(|| default_speech_command().to_string())
    }
}

pub fn default_speech_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingConfig {
    pub max_secs: u64,
    pub input_format: Option<String>,
    pub device: Option<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_secs: DEFAULT_MAX_RECORDING.as_secs(),
            input_format: None,
            device: None,
        }
    }
}

impl RecordingConfig {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            max_duration: Duration::from_secs(self.max_secs),
            input_format: self
                .input_format
                .clone()
                .unwrap_or_else(|| default_input_format().to_string()),
            device: self
                .device
                .clone()
                .unwrap_or_else(|| default_device().to_string()),
            ..RecorderConfig::default()
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// With no explicit path, the default location is used and a missing
    /// file yields the defaults. An explicit path must exist. A file that
    /// exists but cannot be parsed is always an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config file at {}, using defaults", path.display());
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write a commented default configuration file.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Template written by `cinegen config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# cinegen configuration

[api]
base_url = "https://generativelanguage.googleapis.com"
video_model = "veo-2.0-generate-001"
analysis_model = "gemini-2.5-flash"

[polling]
interval_secs = 10
# Give up after this many status checks. Unset polls until done.
# max_attempts = 60

[output]
# dir = "/path/to/videos"

[playback]
player = "mpv"
# speech_command = "say"
# sound_effects_dir = "/path/to/sound-effects"

[recording]
max_secs = 8
# input_format = "avfoundation"
# device = ":0"
"#;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    SerializeError(toml::ser::Error),

    #[error("Config file '{}' already exists (use --force to overwrite)", path.display())]
    AlreadyExists { path: PathBuf },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("cinegen").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/cinegen/config.toml")
        })
}

/// Default directory for generated videos.
pub fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .map(|d| d.join("cinegen"))
        .unwrap_or_else(|| PathBuf::from("cinegen-output"))
}
