//! Polling a long-running generation until it finishes.
//!
//! The poller is a small state machine:
//!
//! ```text
//! Submitted -> Polling { attempts } -> Done { video_uri }
//!                                   -> Failed { reason }
//! ```
//!
//! Sleeping and querying are injected through [`Clock`] and
//! [`OperationSource`] so the loop can be driven without a network or a
//! wall clock.

use std::future::Future;
use std::time::Duration;

use super::client::{Operation, VeoClient, VeoError};

/// Default time between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Something that can wait.
pub trait Clock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Something that can report the state of an operation by name.
pub trait OperationSource {
    fn query(&self, name: &str) -> impl Future<Output = Result<Operation, VeoError>> + Send;
}

impl OperationSource for VeoClient {
    async fn query(&self, name: &str) -> Result<Operation, VeoError> {
        self.get_operation(name).await
    }
}

/// Poll interval and optional attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up after this many status checks. `None` polls until done.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Where a generation is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling { attempts: u32 },
    Done { video_uri: String },
    Failed { reason: String },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Done { .. } | PollState::Failed { .. })
    }
}

/// Drives an operation to completion.
pub struct Poller<'a, S, C> {
    source: &'a S,
    clock: C,
    config: PollConfig,
}

impl<'a, S: OperationSource, C: Clock> Poller<'a, S, C> {
    pub fn new(source: &'a S, clock: C, config: PollConfig) -> Self {
        Self {
            source,
            clock,
            config,
        }
    }

    /// Poll until the operation reports `done`, returning the video URI.
    ///
    /// Each iteration sleeps the configured interval and then queries once,
    /// so an operation that needs N status checks costs exactly N queries.
    /// Every state change is passed to `on_progress`.
    pub async fn run<F>(&self, initial: Operation, mut on_progress: F) -> Result<String, VeoError>
    where
        F: FnMut(&PollState),
    {
        on_progress(&PollState::Submitted);

        let name = initial.name.clone();
        let mut operation = initial;
        let mut attempts = 0u32;

        while !operation.done {
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    let error = VeoError::Timeout { attempts };
                    on_progress(&PollState::Failed {
                        reason: error.to_string(),
                    });
                    return Err(error);
                }
            }

            self.clock.sleep(self.config.interval).await;
            operation = match self.source.query(&name).await {
                Ok(op) => op,
                Err(e) => {
                    on_progress(&PollState::Failed {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            };
            attempts += 1;
            log::debug!("Operation {} status check {}: done={}", name, attempts, operation.done);

            if !operation.done {
                on_progress(&PollState::Polling { attempts });
            }
        }

        let outcome = finished(&operation);
        match &outcome {
            Ok(video_uri) => on_progress(&PollState::Done {
                video_uri: video_uri.clone(),
            }),
            Err(e) => on_progress(&PollState::Failed {
                reason: e.to_string(),
            }),
        }
        outcome
    }
}

/// Interpret a finished operation.
fn finished(operation: &Operation) -> Result<String, VeoError> {
    if let Some(error) = &operation.error {
        log::error!(
            "Operation {} failed: {} ({})",
            operation.name,
            error.message,
            error.code
        );
        return Err(VeoError::OperationFailed {
            code: error.code,
            message: error.message.clone(),
        });
    }

    operation
        .video_uri()
        .map(str::to_string)
        .ok_or(VeoError::MissingVideoLink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veo::client::OperationError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingClock {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl Clock for RecordingClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct ScriptedSource {
        responses: Mutex<VecDeque<Operation>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Operation>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    impl OperationSource for ScriptedSource {
        async fn query(&self, name: &str) -> Result<Operation, VeoError> {
            self.queries.lock().unwrap().push(name.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| VeoError::ApiError("script exhausted".to_string()))
        }
    }

    fn pending() -> Operation {
        serde_json::from_value(serde_json::json!({"name": "operations/abc"})).unwrap()
    }

    fn done_with_video() -> Operation {
        serde_json::from_value(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://files.example/v1/video.mp4?alt=media"}}
            ]}}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_three_pending_then_done_makes_four_queries() {
        let source = ScriptedSource::new(vec![pending(), pending(), pending(), done_with_video()]);
        let clock = RecordingClock::default();
        let poller = Poller::new(&source, clock.clone(), PollConfig::default());

        let mut states = Vec::new();
        let uri = poller
            .run(pending(), |s| states.push(s.clone()))
            .await
            .unwrap();

        assert_eq!(uri, "https://files.example/v1/video.mp4?alt=media");
        assert_eq!(source.query_count(), 4);
        assert!(source
            .queries
            .lock()
            .unwrap()
            .iter()
            .all(|n| n == "operations/abc"));
        assert_eq!(*clock.sleeps.lock().unwrap(), vec![DEFAULT_POLL_INTERVAL; 4]);
        assert_eq!(
            states,
            vec![
                PollState::Submitted,
                PollState::Polling { attempts: 1 },
                PollState::Polling { attempts: 2 },
                PollState::Polling { attempts: 3 },
                PollState::Done {
                    video_uri: uri.clone()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_already_done_makes_no_queries() {
        let source = ScriptedSource::new(vec![]);
        let clock = RecordingClock::default();
        let poller = Poller::new(&source, clock.clone(), PollConfig::default());

        let uri = poller.run(done_with_video(), |_| {}).await.unwrap();
        assert!(uri.ends_with("video.mp4?alt=media"));
        assert_eq!(source.query_count(), 0);
        assert!(clock.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operation_error_fails() {
        let mut failed = pending();
        failed.done = true;
        failed.error = Some(OperationError {
            code: 3,
            message: "prompt rejected".to_string(),
        });
        let source = ScriptedSource::new(vec![failed]);
        let poller = Poller::new(&source, RecordingClock::default(), PollConfig::default());

        let mut last = None;
        let result = poller.run(pending(), |s| last = Some(s.clone())).await;
        assert!(matches!(
            result,
            Err(VeoError::OperationFailed { code: 3, .. })
        ));
        assert!(matches!(last, Some(PollState::Failed { .. })));
    }

    #[tokio::test]
    async fn test_done_without_link() {
        let mut done = pending();
        done.done = true;
        let source = ScriptedSource::new(vec![done]);
        let poller = Poller::new(&source, RecordingClock::default(), PollConfig::default());

        let err = poller.run(pending(), |_| {}).await.unwrap_err();
        assert!(matches!(err, VeoError::MissingVideoLink));
        assert_eq!(
            err.to_string(),
            "Video generation failed. No download link found."
        );
    }

    #[tokio::test]
    async fn test_max_attempts_times_out() {
        let source = ScriptedSource::new(vec![pending(), pending(), pending()]);
        let config = PollConfig {
            interval: Duration::from_millis(5),
            max_attempts: Some(2),
        };
        let poller = Poller::new(&source, RecordingClock::default(), config);

        let result = poller.run(pending(), |_| {}).await;
        assert!(matches!(result, Err(VeoError::Timeout { attempts: 2 })));
        assert_eq!(source.query_count(), 2);
    }

    #[tokio::test]
    async fn test_query_error_is_propagated() {
        let source = ScriptedSource::new(vec![pending()]);
        let poller = Poller::new(&source, RecordingClock::default(), PollConfig::default());

        let result = poller.run(pending(), |_| {}).await;
        assert!(matches!(result, Err(VeoError::ApiError(_))));
        assert_eq!(source.query_count(), 2);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PollState::Submitted.is_terminal());
        assert!(!PollState::Polling { attempts: 1 }.is_terminal());
        assert!(PollState::Done {
            video_uri: String::new()
        }
        .is_terminal());
        assert!(PollState::Failed {
            reason: String::new()
        }
        .is_terminal());
    }
}
