use tracing::{info, warn};

use crate::{
    core::dsp::{db_to_linear, linear_to_db},
    error::{CleanupError, Result},
    options::NormalizeParams,
    types::AudioBuffer,
};

const STEP: &str = "Normalization";

/// Peak normalization: scale so the loudest sample sits at `target_dbfs`,
/// leaving `|target_dbfs|` dB of headroom below full scale.
pub fn normalize(audio: &AudioBuffer, params: &NormalizeParams) -> Result<AudioBuffer> {
    let headroom = params.target_dbfs.abs();
    info!(target_dbfs = params.target_dbfs, headroom, "Normalizing audio");

    if audio.samples.iter().any(|s| !s.is_finite()) {
        return Err(CleanupError::transform(STEP, "peak level is not finite"));
    }
    let peak = audio.peak();
    if peak == 0.0 {
        warn!("Audio is silent; normalization leaves it unchanged");
        return Ok(audio.clone());
    }

    let target_peak = db_to_linear(-headroom);
    let gain = target_peak / peak as f64;
    info!(
        current_dbfs = linear_to_db(peak as f64),
        gain_db = linear_to_db(gain),
        "Applying normalization gain"
    );

    let samples = audio
        .samples
        .iter()
        .map(|&s| (s as f64 * gain) as f32)
        .collect();

    Ok(AudioBuffer::new(
        samples,
        audio.sample_rate,
        audio.channels,
        audio.format,
    ))
}
