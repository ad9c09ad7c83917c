//! Stationary spectral-gating noise reduction.
//!
//! Each channel is analysed on its own: a noise threshold per frequency bin
//! is derived from the statistics of that channel's dB spectrogram, cells
//! above the threshold count as signal, the resulting mask is smoothed over
//! frequency and time, and the noise cells are attenuated by `strength`.

use ndarray::{Array2, Axis};
use tracing::{debug, info};

use crate::{
    core::dsp::{self, HOP, N_FFT},
    error::{CleanupError, Result},
    options::NoiseReduceParams,
    types::{AudioBuffer, SampleFormat},
};

/// Standard deviations above the mean dB level before a cell counts as signal.
const N_STD_THRESH: f32 = 1.5;
/// Mask smoothing span over frequency.
const FREQ_MASK_SMOOTH_HZ: f32 = 500.0;
/// Mask smoothing span over time.
const TIME_MASK_SMOOTH_MS: f32 = 50.0;

const STEP: &str = "Noise reduction";

pub fn reduce_noise(audio: &AudioBuffer, params: &NoiseReduceParams) -> Result<AudioBuffer> {
    info!(
        strength = params.strength,
        channels = audio.channels,
        "Applying noise reduction"
    );

    if audio.samples.iter().any(|s| !s.is_finite()) {
        return Err(CleanupError::transform(
            STEP,
            "input contains non-finite samples",
        ));
    }

    let strength = params.strength;
    let sample_rate = audio.sample_rate;

    let planes = dsp::deinterleave(&audio.samples, audio.channels);
    let reduced =
        dsp::map_channels_parallel(planes, |plane| reduce_channel(plane, sample_rate, strength));

    let out_format = if audio.format.is_float() {
        SampleFormat::I16
    } else {
        audio.format
    };

    let samples: Vec<f32> = dsp::interleave(&reduced)
        .into_iter()
        .map(|s| out_format.quantize(s))
        .collect();

    if samples.len() != audio.samples.len() {
        return Err(CleanupError::transform(
            STEP,
            format!(
                "sample count changed from {} to {}",
                audio.samples.len(),
                samples.len()
            ),
        ));
    }

    debug!(format = ?out_format, "Noise reduction complete");

    Ok(AudioBuffer::new(
        samples,
        audio.sample_rate,
        audio.channels,
        out_format,
    ))
}

fn reduce_channel(signal: Vec<f32>, sample_rate: u32, strength: f32) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return signal;
    }

    let mut spec = dsp::stft_centered(&signal);
    let db = spec.mapv(|c| dsp::linear_to_db(c.norm() as f64) as f32);

    let (Some(mean), std) = (db.mean_axis(Axis(1)), db.std_axis(Axis(1), 0.0)) else {
        return signal;
    };
    let thresh = mean + std * N_STD_THRESH;

    let mut mask = Array2::<f32>::zeros(db.dim());
    for ((fi, fr), m) in mask.indexed_iter_mut() {
        if db[(fi, fr)] > thresh[fi] {
            *m = 1.0;
        }
    }

    let bin_hz = sample_rate as f32 / N_FFT as f32;
    let frame_ms = HOP as f32 * 1000.0 / sample_rate as f32;
    let freq_radius = (FREQ_MASK_SMOOTH_HZ / bin_hz).ceil() as usize;
    let time_radius = (TIME_MASK_SMOOTH_MS / frame_ms).ceil() as usize;

    let mask = smooth_axis(&mask, Axis(0), freq_radius);
    let mask = smooth_axis(&mask, Axis(1), time_radius);

    for (c, &m) in spec.iter_mut().zip(mask.iter()) {
        *c *= 1.0 - strength * (1.0 - m);
    }

    dsp::istft(&spec, n)
}

/// Triangular moving average along one axis, renormalised at the edges.
fn smooth_axis(input: &Array2<f32>, axis: Axis, radius: usize) -> Array2<f32> {
    if radius == 0 {
        return input.clone();
    }

    let weights: Vec<f32> = (0..=2 * radius)
        .map(|k| (radius + 1 - k.abs_diff(radius)) as f32)
        .collect();

    let mut output = Array2::<f32>::zeros(input.dim());
    for (lane_in, mut lane_out) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        let len = lane_in.len();
        for i in 0..len {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(len - 1);
            let mut acc = 0.0;
            let mut norm = 0.0;
            for j in lo..=hi {
                let w = weights[j + radius - i];
                acc += lane_in[j] * w;
                norm += w;
            }
            lane_out[i] = acc / norm;
        }
    }
    output
}
