//! Silence detection and trimming.
//!
//! Long silent gaps are cut out and every retained segment is preceded by a
//! fixed stretch of inserted silence. Nothing is appended after the last
//! segment. When nothing survives detection the result is a single stretch of
//! inserted silence.

use tracing::{info, warn};

use crate::{
    core::dsp::db_to_linear,
    error::{CleanupError, Result},
    options::TrimSilenceParams,
    types::{ms_to_frames, AudioBuffer},
};

/// Energy scan step.
pub const SEEK_STEP_MS: u64 = 25;

const STEP: &str = "Silence trimming";

/// Frame ranges `[start, end)` where the windowed RMS stays at or below
/// `silence_thresh_db` for at least `min_silence_ms`. Overlapping or adjacent
/// windows merge into one range.
pub fn detect_silence(
    audio: &AudioBuffer,
    min_silence_ms: u64,
    silence_thresh_db: f64,
) -> Vec<(usize, usize)> {
    let len = audio.frames();
    let min_len = ms_to_frames(min_silence_ms, audio.sample_rate).max(1);
    let step = ms_to_frames(SEEK_STEP_MS, audio.sample_rate).max(1);

    if len < min_len {
        return Vec::new();
    }

    let ch = audio.channels.max(1) as usize;
    let thresh = db_to_linear(silence_thresh_db);

    // Prefix sums of per-frame energy make every window O(1).
    let mut energy = Vec::with_capacity(len + 1);
    energy.push(0.0f64);
    let mut acc = 0.0f64;
    for frame in audio.samples.chunks_exact(ch) {
        acc += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
        energy.push(acc);
    }
    let window_rms = |start: usize| {
        let sum = (energy[start + min_len] - energy[start]).max(0.0);
        (sum / (min_len * ch) as f64).sqrt()
    };

    let last_start = len - min_len;
    let mut starts: Vec<usize> = (0..=last_start).step_by(step).collect();
    if last_start % step != 0 {
        starts.push(last_start);
    }

    let silence_starts: Vec<usize> = starts
        .into_iter()
        .filter(|&i| window_rms(i) <= thresh)
        .collect();

    let Some((&first, rest)) = silence_starts.split_first() else {
        return Vec::new();
    };

    let mut ranges = Vec::new();
    let mut range_start = first;
    let mut prev = first;
    for &start in rest {
        let continuous = start == prev + step;
        let has_gap = start > prev + min_len;
        if !continuous && has_gap {
            ranges.push((range_start, prev + min_len));
            range_start = start;
        }
        prev = start;
    }
    ranges.push((range_start, prev + min_len));
    ranges
}

/// Complement of [`detect_silence`]: the candidate non-silent segments.
pub fn detect_nonsilent(
    audio: &AudioBuffer,
    min_silence_ms: u64,
    silence_thresh_db: f64,
) -> Vec<(usize, usize)> {
    let len = audio.frames();
    let silent = detect_silence(audio, min_silence_ms, silence_thresh_db);

    if silent.is_empty() {
        return vec![(0, len)];
    }
    if silent[0] == (0, len) {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity(silent.len() + 1);
    let mut prev_end = 0;
    for &(start, end) in &silent {
        segments.push((prev_end, start));
        prev_end = end;
    }
    if prev_end != len {
        segments.push((prev_end, len));
    }
    if segments.first() == Some(&(0, 0)) {
        segments.remove(0);
    }
    segments
}

pub fn trim_silence(audio: &AudioBuffer, params: &TrimSilenceParams) -> Result<AudioBuffer> {
    info!(
        min_silence_ms = params.min_silence_ms,
        insert_silence_ms = params.insert_silence_ms,
        chunk_min_duration_ms = params.chunk_min_duration_ms,
        silence_thresh_db = params.silence_thresh_db,
        "Applying silence trimming"
    );

    let segments = detect_nonsilent(audio, params.min_silence_ms, params.silence_thresh_db);
    if segments.is_empty() {
        warn!("No non-silent parts detected. Outputting standard inserted silence.");
        return inserted_silence(audio, params.insert_silence_ms);
    }

    info!(count = segments.len(), "Found potential non-silent parts");

    let min_chunk = ms_to_frames(params.chunk_min_duration_ms, audio.sample_rate);
    let rate = audio.sample_rate.max(1) as f64;
    let kept: Vec<(usize, usize)> = segments
        .iter()
        .enumerate()
        .filter_map(|(i, &(start, end))| {
            let secs = (end - start) as f64 / rate;
            if end - start >= min_chunk {
                info!(chunk = i + 1, seconds = secs, "Keeping chunk");
                Some((start, end))
            } else {
                info!(chunk = i + 1, seconds = secs, "Discarding small chunk");
                None
            }
        })
        .collect();

    if kept.is_empty() {
        warn!("All detected chunks were below minimum duration. Outputting standard inserted silence.");
        return inserted_silence(audio, params.insert_silence_ms);
    }

    let gap = inserted_silence(audio, params.insert_silence_ms)?;
    let ch = audio.channels.max(1) as usize;
    let kept_samples = kept.iter().map(|(s, e)| (e - s) * ch).sum::<usize>();
    let total = gap
        .samples
        .len()
        .checked_mul(kept.len())
        .and_then(|gaps| gaps.checked_add(kept_samples))
        .ok_or_else(|| too_long(params.insert_silence_ms))?;

    let mut samples = Vec::new();
    samples
        .try_reserve_exact(total)
        .map_err(|_| too_long(params.insert_silence_ms))?;
    for &(start, end) in &kept {
        samples.extend_from_slice(&gap.samples);
        samples.extend_from_slice(&audio.samples[start * ch..end * ch]);
    }

    info!(
        kept = kept.len(),
        frames = samples.len() / ch,
        "Audio reconstructed with standardized silences"
    );

    Ok(AudioBuffer::new(
        samples,
        audio.sample_rate,
        audio.channels,
        audio.format,
    ))
}

fn inserted_silence(audio: &AudioBuffer, duration_ms: u64) -> Result<AudioBuffer> {
    audio
        .silent_like(duration_ms)
        .ok_or_else(|| too_long(duration_ms))
}

fn too_long(insert_silence_ms: u64) -> CleanupError {
    CleanupError::transform(
        STEP,
        format!("cannot allocate output with {insert_silence_ms} ms of inserted silence"),
    )
}
