//! High-pass filtering.
//!
//! Second-order Butterworth section per channel (12 dB/octave), run in
//! Direct Form I. Channels keep independent filter state.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F32};
use tracing::{info, warn};

use crate::{
    error::{CleanupError, Result},
    options::HighPassParams,
    types::AudioBuffer,
};

const STEP: &str = "High-pass filter";

pub fn high_pass(audio: &AudioBuffer, params: &HighPassParams) -> Result<AudioBuffer> {
    let cutoff_hz = params.cutoff_hz;
    let nyquist = audio.sample_rate as f32 / 2.0;

    if cutoff_hz >= nyquist {
        warn!(
            cutoff_hz,
            sample_rate = audio.sample_rate,
            "High-pass cutoff is too high for the sample rate. Skipping filter."
        );
        return Ok(audio.clone());
    }

    info!(cutoff_hz, "Applying high-pass filter");

    let coeffs = Coefficients::<f32>::from_params(
        Type::HighPass,
        (audio.sample_rate as f32).hz(),
        cutoff_hz.hz(),
        Q_BUTTERWORTH_F32,
    )
    .map_err(|e| CleanupError::transform(STEP, format!("bad coefficients: {e:?}")))?;

    let ch = audio.channels.max(1) as usize;
    let mut filters: Vec<DirectForm1<f32>> = (0..ch).map(|_| DirectForm1::<f32>::new(coeffs)).collect();

    let mut samples = audio.samples.clone();
    for frame in samples.chunks_exact_mut(ch) {
        for (sample, filter) in frame.iter_mut().zip(filters.iter_mut()) {
            *sample = filter.run(*sample);
        }
    }

    if samples.iter().any(|s| !s.is_finite()) {
        return Err(CleanupError::transform(STEP, "filter produced non-finite samples"));
    }

    Ok(AudioBuffer::new(
        samples,
        audio.sample_rate,
        audio.channels,
        audio.format,
    ))
}
