//! End-to-end cleanup of a single file: decode, run the enabled steps in
//! order, encode, and report progress along the way.

use std::{
    any::Any,
    fs,
    panic::{catch_unwind, AssertUnwindSafe},
    path::Path,
};

use tracing::{debug, error, info, info_span};

use crate::{
    core::{codec, dsp, filter, noise, normalize, silence},
    error::{CleanupError, Result},
    io::progress::{ProgressEvent, ProgressSink},
    options::{CleanupOptions, PipelineStep},
    types::{AudioBuffer, OutputFormat},
};

pub const PROGRESS_LOADING: u8 = 5;
pub const PROGRESS_STEPS_START: u8 = 10;
pub const PROGRESS_STEPS_END: u8 = 80;
pub const PROGRESS_EXPORTING: u8 = 90;

/// Run one enabled step over `audio`.
pub fn apply_step(step: &PipelineStep, audio: &AudioBuffer) -> Result<AudioBuffer> {
    match step {
        PipelineStep::NoiseReduce(p) => noise::reduce_noise(audio, p),
        PipelineStep::HighPass(p) => filter::high_pass(audio, p),
        PipelineStep::Normalize(p) => normalize::normalize(audio, p),
        PipelineStep::TrimSilence(p) => silence::trim_silence(audio, p),
    }
}

/// Progress value at which each of `count` enabled steps starts.
pub fn step_progress(count: usize) -> Vec<u8> {
    if count == 0 {
        return Vec::new();
    }
    let span = (PROGRESS_STEPS_END - PROGRESS_STEPS_START) as f64;
    let increment = span / count as f64;
    (0..count)
        .map(|i| (PROGRESS_STEPS_START as f64 + i as f64 * increment).floor() as u8)
        .collect()
}

/// Clean `input_path` into `output_path`.
///
/// Emits PROGRESS events at 5 (loading), 10 (loaded), the start of every
/// enabled step, and 90 (exporting), then a SUCCESS event at 100 carrying the
/// output basename, which is also returned.
///
/// On any failure a single FAILURE event is emitted, a partially written
/// output is removed, and the error is returned. The input file is never
/// touched. Panics inside a step are reported as [`CleanupError::Internal`].
/// A sink that panics on the final SUCCESS or FAILURE event is logged and
/// does not change the returned result.
pub fn cleanup<S>(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    output_format: OutputFormat,
    options: &CleanupOptions,
    progress: &S,
) -> Result<String>
where
    S: ProgressSink + ?Sized,
{
    let input = input_path.as_ref();
    let output = output_path.as_ref();

    let span = info_span!(
        "cleanup",
        input = %input.display(),
        output = %output.display(),
        format = %output_format
    );
    let _enter = span.enter();
    info!(options = %options.to_value(), "Audio cleanup started");

    let mut reporter = Reporter::new(progress);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run(input, output, output_format, options, &mut reporter)
    }));
    let result = outcome.unwrap_or_else(|panic| {
        Err(CleanupError::Internal(format!(
            "processing panicked: {}",
            panic_message(panic.as_ref())
        )))
    });

    match result {
        Ok(name) => {
            info!(result = %name, "Audio cleaned successfully");
            reporter.success(&name);
            Ok(name)
        }
        Err(e) => {
            error!(error = %e, "Error during cleanup");
            reporter.failure(&e);
            remove_partial_output(output);
            Err(e)
        }
    }
}

fn run<S>(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    options: &CleanupOptions,
    reporter: &mut Reporter<'_, S>,
) -> Result<String>
where
    S: ProgressSink + ?Sized,
{
    reporter.progress("Loading audio...", PROGRESS_LOADING);
    let mut audio = codec::decode(input)?;
    reporter.progress("Audio loaded.", PROGRESS_STEPS_START);

    let steps = options.steps();
    for (step, start) in steps.iter().zip(step_progress(steps.len())) {
        reporter.progress(step.status(), start);
        audio = apply_step(step, &audio)?;
        debug!(
            step = step.key(),
            frames = audio.frames(),
            format = ?audio.format,
            rms_dbfs = dsp::linear_to_db(dsp::rms(&audio.samples) as f64),
            "Step applied"
        );
    }

    reporter.progress("Exporting file...", PROGRESS_EXPORTING);
    codec::encode(&audio, output, output_format)?;

    Ok(output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

fn remove_partial_output(output: &Path) {
    if !output.exists() {
        return;
    }
    match fs::remove_file(output) {
        Ok(()) => info!(path = %output.display(), "Removed partial output file"),
        Err(e) => error!(path = %output.display(), error = %e, "Error removing partial output file"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Forwards events to the sink and keeps reported progress non-decreasing.
struct Reporter<'a, S: ProgressSink + ?Sized> {
    sink: &'a S,
    last: u8,
}

impl<'a, S: ProgressSink + ?Sized> Reporter<'a, S> {
    fn new(sink: &'a S) -> Self {
        Self { sink, last: 0 }
    }

    fn progress(&mut self, status: &str, progress: u8) {
        let progress = progress.max(self.last);
        self.last = progress;
        debug!(progress, status, "Progress");
        self.sink.emit(ProgressEvent::progress(status, progress));
    }

    fn success(&mut self, result_filename: &str) {
        self.last = 100;
        self.terminal(ProgressEvent::success(
            "Audio cleaned successfully!",
            result_filename,
        ));
    }

    fn failure(&mut self, err: &CleanupError) {
        self.terminal(ProgressEvent::failure(
            format!("Error during cleanup: {err}"),
            self.last,
            err.to_string(),
        ));
    }

    fn terminal(&self, event: ProgressEvent) {
        let sink = self.sink;
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
            error!(
                panic = %panic_message(panic.as_ref()),
                "Progress sink panicked on final event"
            );
        }
    }
}
