use ndarray::Array2;
use once_cell::sync::Lazy;
use rustfft::{num_complex::Complex32, num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// STFT window length used by the noise reducer.
pub const N_FFT: usize = 2048;
/// STFT hop length used by the noise reducer.
pub const HOP: usize = 512;

struct FftCache {
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    hann_window: Vec<f32>,
}

static FFT_CACHE_2048: Lazy<FftCache> = Lazy::new(|| {
    let mut planner = FftPlanner::new();
    FftCache {
        fft_forward: planner.plan_fft_forward(N_FFT),
        fft_inverse: planner.plan_fft_inverse(N_FFT),
        hann_window: compute_hann(N_FFT),
    }
});

fn compute_hann(n_fft: usize) -> Vec<f32> {
    if n_fft <= 1 {
        return vec![1.0];
    }
    // Periodic Hann so that squared windows at hop n/4 sum to a constant.
    let denom = n_fft as f32;
    (0..n_fft)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * (i as f32) / denom).cos())
        .collect()
}

/// Split interleaved samples into one vector per channel.
pub fn deinterleave(interleaved: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let ch = channels.max(1) as usize;
    let frames = interleaved.len() / ch;
    let mut out = vec![Vec::with_capacity(frames); ch];
    for frame in interleaved.chunks_exact(ch) {
        for (c, &s) in frame.iter().enumerate() {
            out[c].push(s);
        }
    }
    out
}

/// Inverse of [`deinterleave`]. All planes must have the same length.
pub fn interleave(planes: &[Vec<f32>]) -> Vec<f32> {
    let frames = planes.first().map(Vec::len).unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planes.len());
    for i in 0..frames {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}

/// Complex spectrogram of one channel with center padding.
/// Shape is `[F, Frames]` with `F = N_FFT / 2 + 1` and
/// `Frames = 1 + len / HOP`.
pub fn stft_centered(signal: &[f32]) -> Array2<Complex32> {
    let t = signal.len();
    let pad = N_FFT / 2;

    let mut padded = vec![0.0f32; pad + t + pad];
    padded[pad..pad + t].copy_from_slice(signal);

    let frames = 1 + t / HOP;
    let f_bins = N_FFT / 2 + 1;

    let cache = &*FFT_CACHE_2048;
    let fft = &cache.fft_forward;
    let window = &cache.hann_window;

    let mut out = Array2::<Complex32>::zeros((f_bins, frames));
    let mut buf = vec![Complex32::zero(); N_FFT];

    for fr in 0..frames {
        let start = fr * HOP;
        let frame = &padded[start..start + N_FFT];
        for i in 0..N_FFT {
            buf[i] = Complex32::new(frame[i] * window[i], 0.0);
        }

        fft.process(&mut buf);

        for fi in 0..f_bins {
            out[(fi, fr)] = buf[fi];
        }
    }

    out
}

/// Inverse of [`stft_centered`] by weighted overlap-add, cropped to
/// `target_length` samples.
pub fn istft(spec: &Array2<Complex32>, target_length: usize) -> Vec<f32> {
    let (f_bins, frames) = spec.dim();
    debug_assert_eq!(f_bins, N_FFT / 2 + 1);

    let cache = &*FFT_CACHE_2048;
    let ifft = &cache.fft_inverse;
    let window = &cache.hann_window;

    let pad = N_FFT / 2;
    let padded_length = target_length + 2 * pad;

    let mut out = vec![0.0f32; padded_length];
    let mut window_sum = vec![0.0f32; padded_length];
    let mut buf = vec![Complex32::zero(); N_FFT];

    let scale = 1.0 / (N_FFT as f32);

    for fr in 0..frames {
        buf.fill(Complex32::zero());

        for fi in 0..f_bins {
            buf[fi] = spec[(fi, fr)];
        }
        // Negative frequencies mirror the positive half.
        for fi in 1..N_FFT / 2 {
            buf[N_FFT - fi] = buf[fi].conj();
        }
        buf[0].im = 0.0;
        buf[N_FFT / 2].im = 0.0;

        ifft.process(&mut buf);

        let start = fr * HOP;
        for i in 0..N_FFT {
            let pos = start + i;
            if pos < padded_length {
                let w = window[i];
                out[pos] += buf[i].re * w * scale;
                window_sum[pos] += w * w;
            }
        }
    }

    for (sample, &sum) in out.iter_mut().zip(&window_sum) {
        if sum > 1e-10 {
            *sample /= sum;
        }
    }

    out[pad..pad + target_length].to_vec()
}

/// Run `f` on every channel in parallel. Each call sees only its own channel.
pub fn map_channels_parallel<F>(planes: Vec<Vec<f32>>, f: F) -> Vec<Vec<f32>>
where
    F: Fn(Vec<f32>) -> Vec<f32> + Sync + Send,
{
    use rayon::prelude::*;

    planes.into_par_iter().map(f).collect()
}

pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(1e-12).log10()
}

/// Root mean square over every sample of the slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}
