//! Image and audio payloads attached to a submission.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};

/// Accepted source image types.
pub const IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Accepted audio types (MP3 uploads and WebM voice recordings).
pub const AUDIO_MIME_TYPES: &[&str] = &["audio/mpeg", "audio/webm"];

/// Errors that can occur while loading media files.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{}' is not a supported image. Use PNG, JPEG, WEBP or GIF", path.display())]
    UnsupportedImage { path: PathBuf },

    #[error("'{}' is not a supported audio file. Please select a valid MP3 or WEBM file", path.display())]
    UnsupportedAudio { path: PathBuf },

    #[error("'{}' is empty", path.display())]
    Empty { path: PathBuf },
}

/// An in-memory file with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAsset")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Guess a MIME type from the file extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        _ => return None,
    };
    Some(mime)
}

impl MediaAsset {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Load a source image from disk.
    pub fn load_image(path: &Path) -> Result<Self, MediaError> {
        match mime_type_for(path) {
            Some(mime) if IMAGE_MIME_TYPES.contains(&mime) => Self::load(path, mime),
            _ => Err(MediaError::UnsupportedImage {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load an MP3 or WebM audio clip from disk.
    pub fn load_audio(path: &Path) -> Result<Self, MediaError> {
        match mime_type_for(path) {
            Some(mime) if AUDIO_MIME_TYPES.contains(&mime) => Self::load(path, mime),
            _ => Err(MediaError::UnsupportedAudio {
                path: path.to_path_buf(),
            }),
        }
    }

    fn load(path: &Path, mime: &str) -> Result<Self, MediaError> {
        let bytes = std::fs::read(path).map_err(|e| MediaError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        if bytes.is_empty() {
            return Err(MediaError::Empty {
                path: path.to_path_buf(),
            });
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, mime, bytes))
    }

    /// Base64 payload for inline request data.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "audio/mpeg" => "mp3",
            "audio/webm" => "webm",
            _ => "bin",
        }
    }
}
