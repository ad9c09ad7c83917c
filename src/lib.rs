//! # audio-cleanup-core
//!
//! Cleanup pipeline for recorded speech and music: decode a file, run
//! noise reduction, a high-pass filter, peak normalization and silence
//! trimming in that order, then encode the result while reporting progress
//! to a job.

pub mod core;
pub mod error;
pub mod io;
pub mod job;
pub mod options;
pub mod paths;
pub mod types;

pub use crate::{
    core::{
        codec::{decode, encode},
        pipeline::{apply_step, cleanup},
    },
    error::{CleanupError, JobError, Result},
    io::progress::{ChannelSink, JobState, NoProgress, ProgressEvent, ProgressSink},
    job::{run_job, Job, JobHandle, JobId, JobRequest, JobSnapshot},
    options::{
        CleanupOptions, CleanupOptionsBuilder, HighPassParams, NoiseReduceParams,
        NormalizeParams, PipelineStep, RawParam, TrimSilenceParams, TrimSilenceRaw,
    },
    paths::{JobPaths, StorageConfig},
    types::{AudioBuffer, OutputFormat, SampleFormat},
};
