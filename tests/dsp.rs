use approx::assert_abs_diff_eq;
use audio_cleanup_core::core::dsp::{
    db_to_linear, deinterleave, interleave, istft, linear_to_db, rms, stft_centered, HOP, N_FFT,
};

#[test]
fn deinterleave_splits_channels() {
    let stereo_inter = vec![0.1, 0.2, -0.3, -0.4, 1.0, 0.5, 0.0, -1.0];
    let planes = deinterleave(&stereo_inter, 2);
    assert_eq!(planes.len(), 2);
    assert_eq!(planes[0], vec![0.1, -0.3, 1.0, 0.0]);
    assert_eq!(planes[1], vec![0.2, -0.4, 0.5, -1.0]);
    assert_eq!(interleave(&planes), stereo_inter);
}

#[test]
fn deinterleave_mono_is_identity() {
    let mono = vec![0.1, -0.2, 0.3, -0.4];
    let planes = deinterleave(&mono, 1);
    assert_eq!(planes.len(), 1);
    assert_eq!(planes[0], mono);
}

#[test]
fn stft_istft_roundtrip() {
    let t = 16_384usize;

    let mut signal = vec![0.0f32; t];
    signal[3000] = 1.0;
    for (i, s) in signal.iter_mut().enumerate() {
        *s += (i as f32 * 0.01).cos() * 0.1 + (i as f32 * 0.13).sin() * 0.05;
    }

    let spec = stft_centered(&signal);
    let back = istft(&spec, t);
    assert_eq!(back.len(), t);

    for i in N_FFT..(t - N_FFT) {
        assert_abs_diff_eq!(back[i], signal[i], epsilon = 1e-3);
    }
}

#[test]
fn stft_dims() {
    let t = 44_100usize;
    let spec = stft_centered(&vec![0.0f32; t]);
    assert_eq!(spec.dim(), (N_FFT / 2 + 1, 1 + t / HOP));
}

#[test]
fn stft_handles_signal_shorter_than_window() {
    let signal = vec![0.25f32; 100];
    let spec = stft_centered(&signal);
    assert_eq!(spec.dim().1, 1);
    assert_eq!(istft(&spec, signal.len()).len(), 100);
}

#[test]
fn db_helpers() {
    assert_abs_diff_eq!(db_to_linear(0.0), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(linear_to_db(0.5), -6.0206, epsilon = 1e-3);
    // Zero is floored rather than -inf.
    assert!(linear_to_db(0.0).is_finite());
    assert_abs_diff_eq!(rms(&[0.5, -0.5, 0.5, -0.5]), 0.5, epsilon = 1e-7);
    assert_eq!(rms(&[]), 0.0);
}
