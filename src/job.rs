//! Job state model and the runner that drives one cleanup job.
//!
//! A job starts PENDING, moves to PROGRESS on the first progress event and
//! ends in SUCCESS or FAILURE. Terminal jobs never change again, so every
//! later snapshot of a finished job is identical.

use std::{fs, path::PathBuf, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    core::pipeline::cleanup,
    error::{JobError, Result},
    io::progress::{JobState, ProgressEvent, ProgressSink},
    options::CleanupOptions,
    paths::JobPaths,
    types::OutputFormat,
};

/// Unique job identifier.
pub type JobId = Uuid;

pub const PROGRESS_INITIALIZING: u8 = 1;

/// Read-only view of a job, suitable for a status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub status: String,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
}

impl JobSnapshot {
    /// Name of the downloadable artifact. Only a successful job that reported
    /// a result file has one.
    pub fn download_filename(&self) -> Option<&str> {
        match self.state {
            JobState::Success => self.result_filename.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Job {
    id: JobId,
    state: JobState,
    latest: ProgressEvent,
    result_filename: Option<String>,
    original_filename: Option<String>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Pending,
            latest: ProgressEvent::pending(),
            result_filename: None,
            original_filename: None,
        }
    }

    pub fn with_original_filename(mut self, name: impl Into<String>) -> Self {
        self.set_original_filename(name);
        self
    }

    pub fn set_original_filename(&mut self, name: impl Into<String>) {
        self.original_filename = Some(name.into());
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn latest(&self) -> &ProgressEvent {
        &self.latest
    }

    pub fn result_filename(&self) -> Option<&str> {
        self.result_filename.as_deref()
    }

    /// Apply one event. Rejected events leave the job untouched.
    pub fn apply(&mut self, event: ProgressEvent) -> std::result::Result<(), JobError> {
        if self.state.is_terminal() {
            return Err(JobError::AlreadyTerminal(self.state));
        }

        match (self.state, event.state) {
            (JobState::Pending, JobState::Progress)
            | (JobState::Progress, JobState::Progress)
            | (JobState::Progress, JobState::Success)
            | (JobState::Progress, JobState::Failure) => {}
            (from, to) => return Err(JobError::InvalidTransition { from, to }),
        }

        if event.state != JobState::Failure && event.progress < self.latest.progress {
            return Err(JobError::ProgressRegressed {
                from: self.latest.progress,
                to: event.progress,
            });
        }

        if event.state == JobState::Success {
            self.result_filename = event.result_filename.clone();
        }
        self.state = event.state;
        self.latest = event;
        Ok(())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            state: self.state,
            status: self.latest.status.clone(),
            progress: self.latest.progress,
            result_filename: self.result_filename.clone(),
            error_details: self.latest.error_details.clone(),
            original_filename: self.original_filename.clone(),
        }
    }
}

/// Shared handle: the runner writes through it, status readers take
/// snapshots from any thread.
#[derive(Clone, Debug)]
pub struct JobHandle {
    inner: Arc<RwLock<Job>>,
}

impl JobHandle {
    /// New PENDING job with a random id.
    pub fn new() -> Self {
        Self::from_job(Job::new(Uuid::new_v4()))
    }

    pub fn from_job(job: Job) -> Self {
        Self {
            inner: Arc::new(RwLock::new(job)),
        }
    }

    pub fn id(&self) -> JobId {
        self.inner.read().id()
    }

    pub fn state(&self) -> JobState {
        self.inner.read().state()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.inner.read().snapshot()
    }

    pub fn apply(&self, event: ProgressEvent) -> std::result::Result<(), JobError> {
        self.inner.write().apply(event)
    }

    pub fn set_original_filename(&self, name: impl Into<String>) {
        self.inner.write().set_original_filename(name);
    }
}

impl Default for JobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for JobHandle {
    fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.apply(event) {
            warn!(job_id = %self.id(), error = %e, "Rejected job state transition");
        }
    }
}

/// Everything a worker needs to run one job.
#[derive(Clone, Debug)]
pub struct JobRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
    pub original_filename: String,
    pub options: CleanupOptions,
}

impl JobRequest {
    pub fn new(
        paths: &JobPaths,
        original_filename: impl Into<String>,
        output_format: OutputFormat,
        options: CleanupOptions,
    ) -> Self {
        Self {
            input_path: paths.input_path.clone(),
            output_path: paths.output_path.clone(),
            output_format,
            original_filename: original_filename.into(),
            options,
        }
    }
}

/// Run a job to completion, recording every event on `handle`.
///
/// The input file belongs to the job and is deleted afterwards whether the
/// cleanup succeeded or not. The output is left in place on success.
pub fn run_job(handle: &JobHandle, request: &JobRequest) -> Result<String> {
    let job_id = handle.id();
    let span = info_span!(
        "job",
        id = %job_id,
        original_filename = request.original_filename.as_str()
    );
    let _enter = span.enter();

    handle.set_original_filename(request.original_filename.as_str());
    info!(
        input = %request.input_path.display(),
        format = %request.output_format,
        "Starting cleanup job"
    );
    handle.emit(ProgressEvent::progress(
        "Initializing audio cleanup...",
        PROGRESS_INITIALIZING,
    ));

    let result = cleanup(
        &request.input_path,
        &request.output_path,
        request.output_format,
        &request.options,
        handle,
    );

    match &result {
        Ok(name) => info!(result = %name, "Cleanup job finished"),
        Err(e) => error!(error = %e, "Cleanup job failed"),
    }

    remove_input(&request.input_path);
    result
}

fn remove_input(path: &std::path::Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "Cleaned up input file"),
        Err(e) => error!(path = %path.display(), error = %e, "Error cleaning up input file"),
    }
}
