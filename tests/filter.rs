use std::f32::consts::PI;

use approx::assert_abs_diff_eq;
use audio_cleanup_core::{
    core::{dsp::rms, filter::high_pass},
    AudioBuffer, HighPassParams, SampleFormat,
};

fn sine(frames: usize, sr: u32, freq: f32, amp: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| amp * (2.0 * PI * freq * i as f32 / sr as f32).sin())
        .collect()
}

#[test]
fn cutoff_at_or_above_nyquist_is_a_no_op() {
    let audio = AudioBuffer::new(sine(4410, 44_100, 50.0, 0.5), 44_100, 1, SampleFormat::I16);
    let out = high_pass(&audio, &HighPassParams::new(30_000.0)).unwrap();
    assert_eq!(out, audio);

    let out = high_pass(&audio, &HighPassParams::new(22_050.0)).unwrap();
    assert_eq!(out, audio);
}

#[test]
fn attenuates_below_cutoff_and_passes_above() {
    let sr = 44_100;
    let frames = sr as usize;
    let low = AudioBuffer::new(sine(frames, sr, 20.0, 0.5), sr, 1, SampleFormat::F32);
    let high = AudioBuffer::new(sine(frames, sr, 1000.0, 0.5), sr, 1, SampleFormat::F32);
    let params = HighPassParams::new(200.0);

    let low_out = high_pass(&low, &params).unwrap();
    let high_out = high_pass(&high, &params).unwrap();

    // Skip the start-up transient.
    let tail = frames / 2..;
    assert!(rms(&low_out.samples[tail.clone()]) < 0.05 * rms(&low.samples[tail.clone()]));
    assert_abs_diff_eq!(
        rms(&high_out.samples[tail.clone()]),
        rms(&high.samples[tail]),
        epsilon = 0.02
    );
}

#[test]
fn removes_dc_offset_per_channel() {
    let frames = 8000;
    let mut samples = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        samples.push(0.3);
        samples.push(0.0);
    }
    let audio = AudioBuffer::new(samples, 8000, 2, SampleFormat::I16);
    let out = high_pass(&audio, &HighPassParams::default()).unwrap();

    assert_eq!(out.channels, 2);
    assert_eq!(out.format, SampleFormat::I16);
    let left_tail = out.samples[(frames - 100) * 2];
    assert!(left_tail.abs() < 1e-3, "left tail {left_tail}");
    assert!(out.samples.iter().skip(1).step_by(2).all(|&s| s == 0.0));
}
