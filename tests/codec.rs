use std::{f32::consts::PI, fs, path::Path, process::Command};

use approx::assert_abs_diff_eq;
use audio_cleanup_core::{decode, encode, AudioBuffer, CleanupError, OutputFormat, SampleFormat};
use tempfile::tempdir;

fn tone(frames: usize, channels: u16, sample_rate: u32, freq: f32, amp: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let s = amp * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
        for _ in 0..channels {
            out.push(s);
        }
    }
    out
}

fn write_i16_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        w.write_sample((s * 32767.0).round() as i16).unwrap();
    }
    w.finalize().unwrap();
}

#[test]
fn decodes_16_bit_wav() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("in.wav");
    let samples = tone(4410, 2, 44_100, 440.0, 0.5);
    write_i16_wav(&path, 2, 44_100, &samples);

    let audio = decode(&path).unwrap();
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.sample_rate, 44_100);
    assert_eq!(audio.format, SampleFormat::I16);
    assert_eq!(audio.frames(), 4410);
    for (a, b) in audio.samples.iter().zip(&samples) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn wav_roundtrip_keeps_16_bit_samples_exact() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("in.wav");
    let dst = dir.path().join("out.wav");
    write_i16_wav(&src, 1, 16_000, &tone(1600, 1, 16_000, 300.0, 0.8));

    let audio = decode(&src).unwrap();
    encode(&audio, &dst, OutputFormat::Wav).unwrap();

    let a: Vec<i16> = hound::WavReader::open(&src)
        .unwrap()
        .samples::<i16>()
        .map(|s| s.unwrap())
        .collect();
    let reader = hound::WavReader::open(&dst).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.spec().sample_rate, 16_000);
    let b: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(a, b);
}

#[test]
fn eight_bit_wav_keeps_its_width() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("u8.wav");
    let dst = dir.path().join("u8_out.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(&src, spec).unwrap();
    let codes: Vec<i8> = (0..800).map(|i| ((i % 200) as i16 - 100) as i8).collect();
    for &c in &codes {
        w.write_sample(c).unwrap();
    }
    w.finalize().unwrap();

    let audio = decode(&src).unwrap();
    assert_eq!(audio.format, SampleFormat::U8);
    assert_abs_diff_eq!(audio.samples[0], -100.0 / 128.0, epsilon = 1e-6);

    encode(&audio, &dst, OutputFormat::Wav).unwrap();
    let reader = hound::WavReader::open(&dst).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 8);
    let back: Vec<i8> = reader.into_samples::<i8>().map(|s| s.unwrap()).collect();
    assert_eq!(back, codes);
}

#[test]
fn float_wav_decodes_as_f32() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("f32.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22_050,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut w = hound::WavWriter::create(&src, spec).unwrap();
    for s in tone(2205, 1, 22_050, 1000.0, 0.25) {
        w.write_sample(s).unwrap();
    }
    w.finalize().unwrap();

    let audio = decode(&src).unwrap();
    assert_eq!(audio.format, SampleFormat::F32);
    assert_eq!(audio.frames(), 2205);
    assert!(audio.peak() <= 0.25 + 1e-6);
}

#[test]
fn missing_file_is_decode_error() {
    let dir = tempdir().unwrap();
    let err = decode(dir.path().join("nope.wav")).unwrap_err();
    assert!(matches!(err, CleanupError::Decode(_)), "{err:?}");
}

#[test]
fn garbage_is_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.wav");
    fs::write(&path, b"definitely not a RIFF file, just some bytes").unwrap();
    let err = decode(&path).unwrap_err();
    assert!(matches!(err, CleanupError::Decode(_)), "{err:?}");
}

#[test]
fn encode_creates_missing_parent_dirs() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("a").join("b").join("out.wav");
    let audio = AudioBuffer::new(vec![0.0; 800], 8000, 1, SampleFormat::I16);
    encode(&audio, &out, OutputFormat::Wav).unwrap();
    assert!(out.exists());
}

#[test]
fn mp3_roundtrip_stereo() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.mp3");
    let frames = 44_100;
    let audio = AudioBuffer::new(
        tone(frames, 2, 44_100, 440.0, 0.5),
        44_100,
        2,
        SampleFormat::I16,
    );
    encode(&audio, &out, OutputFormat::Mp3).unwrap();
    assert!(fs::metadata(&out).unwrap().len() > 0);

    let back = decode(&out).unwrap();
    assert_eq!(back.channels, 2);
    assert_eq!(back.sample_rate, 44_100);
    assert!(back.frames() >= frames * 9 / 10, "frames = {}", back.frames());
}

#[test]
fn mp3_rejects_more_than_two_channels() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.mp3");
    let audio = AudioBuffer::new(vec![0.0; 3 * 1000], 44_100, 3, SampleFormat::I16);
    let err = encode(&audio, &out, OutputFormat::Mp3).unwrap_err();
    assert!(matches!(err, CleanupError::Encode(_)), "{err:?}");
}

#[test]
fn m4a_needs_ffmpeg() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.m4a");
    let audio = AudioBuffer::new(tone(8000, 1, 16_000, 440.0, 0.3), 16_000, 1, SampleFormat::I16);

    let have_ffmpeg = Command::new("ffmpeg").arg("-version").output().is_ok();
    let result = encode(&audio, &out, OutputFormat::M4a);
    if have_ffmpeg {
        result.unwrap();
        assert!(fs::metadata(&out).unwrap().len() > 0);
    } else {
        assert!(matches!(result, Err(CleanupError::Encode(_))));
    }
}
