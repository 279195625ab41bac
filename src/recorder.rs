//! Voice recording through FFmpeg.
//!
//! Records the default microphone into an Opus/WebM clip. Recording stops
//! when the time limit is reached or when Ctrl+C is pressed, whichever comes
//! first. FFmpeg gets a SIGINT on stop so it can finalize the container.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// File name of the recorded clip.
pub const RECORDING_FILE_NAME: &str = "voice_recording.webm";

/// Hard recording limit.
pub const DEFAULT_MAX_RECORDING: Duration = Duration::from_secs(8);

/// Shown when the microphone cannot be opened for lack of permission.
pub const MICROPHONE_PERMISSION_MESSAGE: &str =
    "Microphone access is required to record audio. Please enable it in your system settings and try again.";

/// How often the stop flag is checked while FFmpeg runs.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Time FFmpeg gets to finalize the file after SIGINT before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Errors that can occur while recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("{}", MICROPHONE_PERMISSION_MESSAGE)]
    PermissionDenied,

    #[error("FFmpeg not found. Please install it with:\n\n    brew install ffmpeg\n")]
    FfmpegNotFound,

    #[error("Failed to spawn FFmpeg: {0}")]
    SpawnFailed(std::io::Error),

    #[error("FFmpeg exited with code {exit_code:?}\n{stderr}")]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("No audio was recorded")]
    EmptyRecording,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Input device settings for the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub program: String,
    pub max_duration: Duration,
    /// FFmpeg input format, e.g. `avfoundation` or `pulse`.
    pub input_format: String,
    /// FFmpeg input device, e.g. `:0` or `default`.
    pub device: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            max_duration: DEFAULT_MAX_RECORDING,
            input_format: default_input_format().to_string(),
            device: default_device().to_string(),
        }
    }
}

pub fn default_input_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "pulse"
    }
}

pub fn default_device() -> &'static str {
    if cfg!(target_os = "macos") {
        ":0"
    } else if cfg!(target_os = "windows") {
        "audio=default"
    } else {
        "default"
    }
}

/// Build the FFmpeg arguments for recording into `output`.
pub fn build_ffmpeg_args(config: &RecorderConfig, output: &Path) -> Vec<String> {
    let secs = config.max_duration.as_secs_f64();
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        config.input_format.clone(),
        "-i".to_string(),
        config.device.clone(),
        "-t".to_string(),
        format!("{}", secs),
        "-vn".to_string(),
        "-c:a".to_string(),
        "libopus".to_string(),
        "-b:a".to_string(),
        "64k".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Whether FFmpeg's stderr indicates that microphone access was refused.
pub fn is_permission_denied(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("permission denied")
        || lower.contains("not authorized")
        || lower.contains("access denied")
}

/// Shared stop request, set from a Ctrl+C handler.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal that is triggered by Ctrl+C.
    ///
    /// The handler can only be installed once per process.
    pub fn ctrlc() -> Result<Self, ctrlc::Error> {
        let signal = Self::new();
        let flag = signal.flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })?;
        Ok(signal)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub path: PathBuf,
    pub elapsed: Duration,
    /// True when stopped by the user before the limit.
    pub stopped_early: bool,
}

/// Records the microphone with FFmpeg.
pub struct VoiceRecorder {
    config: RecorderConfig,
}

impl VoiceRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Record into `dir/voice_recording.webm`.
    ///
    /// Returns when FFmpeg reaches its `-t` limit, when `stop` is triggered,
    /// or when the limit plus a grace period has elapsed, whichever is first.
    pub async fn record(&self, dir: &Path, stop: &StopSignal) -> Result<Recording, RecordingError> {
        tokio::fs::create_dir_all(dir).await?;
        let output = dir.join(RECORDING_FILE_NAME);
        let args = build_ffmpeg_args(&self.config, &output);
        log::debug!("Recording with: {} {}", self.config.program, args.join(" "));

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecordingError::FfmpegNotFound
                } else {
                    RecordingError::SpawnFailed(e)
                }
            })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let started = Instant::now();
        let deadline = self.config.max_duration + SHUTDOWN_GRACE;
        let outcome = tokio::time::timeout(deadline, wait_or_stop(&mut child, stop)).await;
        let (status, stopped_early) = match outcome {
            Ok(Ok(Some(status))) => (status, false),
            Ok(Ok(None)) => {
                log::info!("Recording stopped by user");
                (interrupt(&mut child).await?, true)
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                log::warn!("FFmpeg did not stop at the time limit, interrupting");
                (interrupt(&mut child).await?, false)
            }
        };
        let elapsed = started.elapsed();

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if is_permission_denied(&stderr) {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(RecordingError::PermissionDenied);
        }

        if !status.success() && !stopped_early && !has_content(&output).await {
            return Err(RecordingError::ProcessFailed {
                exit_code: status.code(),
                stderr,
            });
        }

        if !has_content(&output).await {
            return Err(RecordingError::EmptyRecording);
        }

        log::info!("Recorded {:.1}s to {}", elapsed.as_secs_f64(), output.display());
        Ok(Recording {
            path: output,
            elapsed,
            stopped_early,
        })
    }
}

/// Wait for the child to exit, or return `None` once a stop is requested.
async fn wait_or_stop(child: &mut Child, stop: &StopSignal) -> std::io::Result<Option<ExitStatus>> {
    loop {
        tokio::select! {
            status = child.wait() => return status.map(Some),
            _ = tokio::time::sleep(STOP_CHECK_INTERVAL) => {
                if stop.is_triggered() {
                    return Ok(None);
                }
            }
        }
    }
}

/// Ask FFmpeg to finish the file, killing it if it does not exit in time.
async fn interrupt(child: &mut Child) -> Result<ExitStatus, RecordingError> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(pid as i32, libc::SIGINT);
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
        Ok(status) => Ok(status?),
        Err(_) => {
            child.kill().await?;
            Ok(child.wait().await?)
        }
    }
}

async fn has_content(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_ffmpeg_args() {
        let config = RecorderConfig {
            program: "ffmpeg".to_string(),
            max_duration: Duration::from_secs(8),
            input_format: "pulse".to_string(),
            device: "default".to_string(),
        };
        let args = build_ffmpeg_args(&config, Path::new("/tmp/out/voice_recording.webm"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-f") + 1], "pulse");
        assert_eq!(args[pos("-i") + 1], "default");
        assert_eq!(args[pos("-t") + 1], "8");
        assert_eq!(args[pos("-c:a") + 1], "libopus");
        assert_eq!(args.last().unwrap(), "/tmp/out/voice_recording.webm");
        assert!(args.contains(&"-vn".to_string()));
    }

    #[test]
    fn test_build_ffmpeg_args_fractional_limit() {
        let config = RecorderConfig {
            max_duration: Duration::from_millis(2500),
            ..Default::default()
        };
        let args = build_ffmpeg_args(&config, Path::new("out.webm"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "2.5");
    }

    #[test]
    fn test_default_config() {
        let config = RecorderConfig::default();
        assert_eq!(config.max_duration, Duration::from_secs(8));
        assert_eq!(config.program, "ffmpeg");
        assert!(!config.input_format.is_empty());
    }

    #[test]
    fn test_permission_detection() {
        assert!(is_permission_denied(
            "[avfoundation @ 0x1] Failed to open device: Permission denied"
        ));
        assert!(is_permission_denied("Microphone access not authorized"));
        assert!(!is_permission_denied("Input #0, pulse, from 'default':"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RecordingError::PermissionDenied.to_string(),
            MICROPHONE_PERMISSION_MESSAGE
        );
        assert!(RecordingError::FfmpegNotFound
            .to_string()
            .contains("FFmpeg not found"));
    }

    #[test]
    fn test_stop_signal_is_shared() {
        let signal = StopSignal::new();
        let clone = signal.clone();
        assert!(!signal.is_triggered());
        clone.trigger();
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let recorder = VoiceRecorder::new(RecorderConfig {
            program: "definitely-not-ffmpeg-xyz".to_string(),
            ..Default::default()
        });
        let result = recorder.record(dir.path(), &StopSignal::new()).await;
        assert!(matches!(result, Err(RecordingError::FfmpegNotFound)));
    }

    /// Write an executable stand-in for ffmpeg. `$out` is the output path.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        let script = format!("#!/bin/sh\nfor a; do out=\"$a\"; done\n{}\n", body);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    fn fake_recorder(program: String, max_duration: Duration) -> VoiceRecorder {
        VoiceRecorder::new(RecorderConfig {
            program,
            max_duration,
            ..Default::default()
        })
    }

    /// Writes some audio, then waits for SIGINT like ffmpeg does.
    #[cfg(unix)]
    const RECORD_UNTIL_INTERRUPTED: &str =
        "printf 'opus' > \"$out\"\ntrap 'kill $! 2>/dev/null; exit 0' INT\nsleep 30 &\nwait $!";

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recording_ends_at_time_limit() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(dir.path(), "printf 'opus' > \"$out\"\nsleep 0.3");
        let recorder = fake_recorder(program, Duration::from_millis(300));

        let recording = recorder
            .record(&dir.path().join("out"), &StopSignal::new())
            .await
            .unwrap();

        assert!(!recording.stopped_early);
        assert!(recording.elapsed < SHUTDOWN_GRACE);
        assert_eq!(recording.path, dir.path().join("out").join(RECORDING_FILE_NAME));
        assert_eq!(std::fs::read(&recording.path).unwrap(), b"opus");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recording_interrupted_when_limit_ignored() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(dir.path(), RECORD_UNTIL_INTERRUPTED);
        let recorder = fake_recorder(program, Duration::from_millis(200));

        let recording = recorder
            .record(dir.path(), &StopSignal::new())
            .await
            .unwrap();

        assert!(!recording.stopped_early);
        assert!(recording.elapsed >= Duration::from_millis(200) + SHUTDOWN_GRACE);
        assert!(recording.elapsed < Duration::from_millis(200) + SHUTDOWN_GRACE * 2);
        assert!(recording.path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_signal_ends_recording_early() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(dir.path(), RECORD_UNTIL_INTERRUPTED);
        let recorder = fake_recorder(program, DEFAULT_MAX_RECORDING);

        let stop = StopSignal::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.trigger();
        });

        let recording = recorder.record(dir.path(), &stop).await.unwrap();

        assert!(recording.stopped_early);
        assert!(recording.elapsed >= Duration::from_millis(300));
        assert!(recording.elapsed < Duration::from_secs(2));
        assert_eq!(std::fs::read(&recording.path).unwrap(), b"opus");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nothing_written_is_empty_recording() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(dir.path(), "exit 0");
        let recorder = fake_recorder(program, Duration::from_millis(300));

        let result = recorder.record(dir.path(), &StopSignal::new()).await;
        assert!(matches!(result, Err(RecordingError::EmptyRecording)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_process_reports_stderr() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(dir.path(), "echo 'Unknown input format' >&2\nexit 1");
        let recorder = fake_recorder(program, Duration::from_millis(300));

        match recorder.record(dir.path(), &StopSignal::new()).await {
            Err(RecordingError::ProcessFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("Unknown input format"));
            }
            other => panic!("Expected ProcessFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_denied_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let program = fake_ffmpeg(
            dir.path(),
            "printf 'x' > \"$out\"\necho 'Failed to open device: Permission denied' >&2\nexit 1",
        );
        let recorder = fake_recorder(program, Duration::from_millis(300));

        let result = recorder.record(dir.path(), &StopSignal::new()).await;
        assert!(matches!(result, Err(RecordingError::PermissionDenied)));
        assert!(!dir.path().join(RECORDING_FILE_NAME).exists());
    }
}
