use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a cleanup job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

/// One progress report emitted by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub state: JobState,
    pub status: String,
    /// Percentage, `0..=100`.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl ProgressEvent {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            status: "Task is pending or not yet started.".into(),
            progress: 0,
            result_filename: None,
            error_details: None,
        }
    }

    pub fn progress(status: impl Into<String>, progress: u8) -> Self {
        Self {
            state: JobState::Progress,
            status: status.into(),
            progress: progress.min(100),
            result_filename: None,
            error_details: None,
        }
    }

    pub fn success(status: impl Into<String>, result_filename: impl Into<String>) -> Self {
        Self {
            state: JobState::Success,
            status: status.into(),
            progress: 100,
            result_filename: Some(result_filename.into()),
            error_details: None,
        }
    }

    pub fn failure(status: impl Into<String>, progress: u8, error_details: impl Into<String>) -> Self {
        Self {
            state: JobState::Failure,
            status: status.into(),
            progress: progress.min(100),
            result_filename: None,
            error_details: Some(error_details.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Receives progress events for a single job, synchronously and in order.
pub trait ProgressSink {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent),
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards events over a channel, e.g. to a UI or polling thread.
#[derive(Clone, Debug)]
pub struct ChannelSink(pub Sender<ProgressEvent>);

impl ChannelSink {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self(sender)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A consumer that hung up no longer cares about progress.
        let _ = self.0.send(event);
    }
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}
