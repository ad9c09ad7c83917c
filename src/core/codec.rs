//! Decoding input files into [`AudioBuffer`]s and writing them back out.

use std::{
    fs::{self, File},
    io::ErrorKind,
    path::Path,
    process::Command,
};

use anyhow::{anyhow, bail, Context};
use hound::WavWriter;
use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tempfile::tempdir;
use tracing::{debug, info, warn};

use crate::{
    core::dsp::deinterleave,
    error::{CleanupError, Result},
    types::{AudioBuffer, OutputFormat, SampleFormat},
};

/// Fixed MP3 bitrate, kbps.
pub const MP3_BITRATE_KBPS: u32 = 192;

/// Decode any supported container into a normalized buffer.
///
/// Partial results are never returned: any failure yields
/// [`CleanupError::Decode`].
pub fn decode<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    decode_inner(path).map_err(|e| CleanupError::Decode(format!("{e:#}")))
}

fn decode_inner(path: &Path) -> anyhow::Result<AudioBuffer> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported or corrupt audio container")?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;
    let track_id = track.id;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = 0;
    let mut channels: u16 = 0;
    let mut native: Option<SampleFormat> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to read audio packet")),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(reason = msg, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to decode audio packet")),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;
        native.get_or_insert_with(|| native_format(&decoded));

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if channels == 0 || sample_rate == 0 || samples.is_empty() {
        bail!("No audio frames could be decoded from {}", path.display());
    }

    let format = native.unwrap_or(SampleFormat::I16);
    let ch = channels as usize;
    samples.truncate(samples.len() / ch * ch);

    let audio = AudioBuffer::new(samples, sample_rate, channels, format);
    info!(
        duration_s = audio.duration(),
        channels,
        sample_rate,
        format = ?format,
        "Loaded audio"
    );
    Ok(audio)
}

fn native_format(decoded: &AudioBufferRef<'_>) -> SampleFormat {
    match decoded {
        AudioBufferRef::U8(_) => SampleFormat::U8,
        AudioBufferRef::S16(_) => SampleFormat::I16,
        AudioBufferRef::S24(_) | AudioBufferRef::S32(_) => SampleFormat::I32,
        AudioBufferRef::F32(_) | AudioBufferRef::F64(_) => SampleFormat::F32,
        _ => SampleFormat::I16,
    }
}

/// Write `audio` to `path` in the requested container, creating the parent
/// directory when needed.
pub fn encode<P: AsRef<Path>>(audio: &AudioBuffer, path: P, format: OutputFormat) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CleanupError::Encode(format!(
                "Failed to create output directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    info!(path = %path.display(), format = %format, "Exporting cleaned audio");

    let written = match format {
        OutputFormat::Wav => write_wav(audio, path, audio.format),
        OutputFormat::Mp3 => write_mp3(audio, path),
        OutputFormat::M4a => write_m4a(audio, path),
    };
    written.map_err(|e| CleanupError::Encode(format!("{e:#}")))
}

fn write_wav(audio: &AudioBuffer, path: &Path, sample_format: SampleFormat) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: sample_format.bits_per_sample(),
        sample_format: if sample_format.is_float() {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    match sample_format {
        // hound stores 8-bit as unsigned and takes it as i8 centred on zero.
        SampleFormat::U8 => {
            for &s in &audio.samples {
                writer.write_sample(sample_format.to_code(s) as i8)?;
            }
        }
        SampleFormat::I16 => {
            for &s in &audio.samples {
                writer.write_sample(sample_format.to_code(s) as i16)?;
            }
        }
        SampleFormat::I32 => {
            for &s in &audio.samples {
                writer.write_sample(sample_format.to_code(s) as i32)?;
            }
        }
        SampleFormat::F32 => {
            for &s in &audio.samples {
                writer.write_sample(s)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

fn write_mp3(audio: &AudioBuffer, path: &Path) -> anyhow::Result<()> {
    use mp3lame_encoder::{Bitrate, Builder, DualPcm, FlushNoGap, Quality};

    if audio.channels > 2 {
        bail!("MP3 output supports at most 2 channels, got {}", audio.channels);
    }

    let mut builder = Builder::new().context("LAME encoder init failed")?;
    builder
        .set_num_channels(audio.channels as u8)
        .map_err(|e| anyhow!("LAME set channels failed: {e:?}"))?;
    builder
        .set_sample_rate(audio.sample_rate)
        .map_err(|e| anyhow!("LAME set sample rate failed: {e:?}"))?;
    builder
        .set_brate(Bitrate::Kbps192)
        .map_err(|e| anyhow!("LAME set bitrate failed: {e:?}"))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| anyhow!("LAME set quality failed: {e:?}"))?;
    let mut encoder = builder
        .build()
        .map_err(|e| anyhow!("LAME build failed: {e:?}"))?;

    let to_i16 = |plane: &Vec<f32>| -> Vec<i16> {
        plane
            .iter()
            .map(|&s| SampleFormat::I16.to_code(s) as i16)
            .collect()
    };
    let planes = deinterleave(&audio.samples, audio.channels);
    let left = planes.first().map(to_i16).unwrap_or_default();
    let right = match planes.get(1) {
        Some(plane) => to_i16(plane),
        None => left.clone(),
    };

    let mut mp3_out: Vec<u8> =
        Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));
    let encoded = encoder
        .encode(
            DualPcm {
                left: &left,
                right: &right,
            },
            mp3_out.spare_capacity_mut(),
        )
        .map_err(|e| anyhow!("LAME encode failed: {e:?}"))?;
    // SAFETY: the encoder initialised `encoded` bytes of spare capacity.
    unsafe {
        mp3_out.set_len(encoded);
    }

    mp3_out.reserve(7200);
    let flushed = encoder
        .flush::<FlushNoGap>(mp3_out.spare_capacity_mut())
        .map_err(|e| anyhow!("LAME flush failed: {e:?}"))?;
    // SAFETY: the encoder initialised `flushed` bytes of spare capacity.
    unsafe {
        mp3_out.set_len(mp3_out.len() + flushed);
    }

    debug!(bytes = mp3_out.len(), kbps = MP3_BITRATE_KBPS, "Encoded MP3");
    fs::write(path, &mp3_out).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// AAC in an MP4 (iPod) container via ffmpeg.
fn write_m4a(audio: &AudioBuffer, path: &Path) -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let tmp_wav = tmp.path().join("export.wav");
    let tmp_m4a = tmp.path().join("export.m4a");

    write_wav(audio, &tmp_wav, SampleFormat::I16)?;

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(&tmp_wav)
        .arg("-c:a")
        .arg("aac")
        .arg("-b:a")
        .arg(format!("{MP3_BITRATE_KBPS}k"))
        .arg("-f")
        .arg("ipod")
        .arg(&tmp_m4a)
        .output()
        .context("Failed to run ffmpeg (required for m4a output)")?;

    if !output.status.success() {
        bail!(
            "ffmpeg AAC encoding failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    fs::copy(&tmp_m4a, path).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
