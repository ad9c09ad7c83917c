use std::f32::consts::PI;

use audio_cleanup_core::{
    core::{dsp::rms, noise::reduce_noise},
    AudioBuffer, CleanupError, NoiseReduceParams, SampleFormat,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn white_noise(frames: usize, amp: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames).map(|_| rng.random_range(-amp..amp)).collect()
}

#[test]
fn reduces_stationary_noise() {
    let sr = 16_000;
    let noise = white_noise(sr as usize * 2, 0.1, 7);
    let audio = AudioBuffer::new(noise.clone(), sr, 1, SampleFormat::I16);

    let out = reduce_noise(&audio, &NoiseReduceParams::new(0.8)).unwrap();
    assert_eq!(out.samples.len(), noise.len());
    assert!(
        rms(&out.samples) < 0.6 * rms(&noise),
        "rms before {} after {}",
        rms(&noise),
        rms(&out.samples)
    );
}

#[test]
fn keeps_layout_and_leaves_silent_channel_silent() {
    let sr = 22_050;
    let frames = sr as usize;
    let noise = white_noise(frames, 0.05, 11);

    let mut interleaved = Vec::with_capacity(frames * 2);
    for (i, n) in noise.iter().enumerate() {
        let t = i as f32 / sr as f32;
        interleaved.push(0.4 * (2.0 * PI * 440.0 * t).sin() + n);
        interleaved.push(0.0);
    }
    let audio = AudioBuffer::new(interleaved, sr, 2, SampleFormat::I16);

    let out = reduce_noise(&audio, &NoiseReduceParams::default()).unwrap();
    assert_eq!(out.channels, 2);
    assert_eq!(out.sample_rate, sr);
    assert_eq!(out.frames(), frames);
    assert_eq!(out.format, SampleFormat::I16);
    assert!(out.samples.iter().skip(1).step_by(2).all(|&s| s == 0.0));
    assert!(rms(&out.samples) > 0.0);
}

#[test]
fn float_input_comes_back_as_16_bit() {
    let audio = AudioBuffer::new(white_noise(8000, 0.2, 3), 8000, 1, SampleFormat::F32);
    let out = reduce_noise(&audio, &NoiseReduceParams::default()).unwrap();
    assert_eq!(out.format, SampleFormat::I16);
    for &s in &out.samples {
        let code = s * 32_768.0;
        assert!((code - code.round()).abs() < 1e-3, "{s} is not a 16-bit value");
    }
}

#[test]
fn lighter_strength_removes_less() {
    let noise = white_noise(16_000, 0.1, 5);
    let audio = AudioBuffer::new(noise, 16_000, 1, SampleFormat::I16);
    let light = reduce_noise(&audio, &NoiseReduceParams::new(0.2)).unwrap();
    let heavy = reduce_noise(&audio, &NoiseReduceParams::new(1.0)).unwrap();
    assert!(rms(&light.samples) > rms(&heavy.samples));
}

#[test]
fn non_finite_input_fails() {
    let mut samples = vec![0.0f32; 4000];
    samples[100] = f32::NAN;
    let audio = AudioBuffer::new(samples, 8000, 1, SampleFormat::F32);
    let err = reduce_noise(&audio, &NoiseReduceParams::default()).unwrap_err();
    assert!(matches!(err, CleanupError::Transform { .. }), "{err:?}");
}
