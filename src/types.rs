use serde::{Deserialize, Serialize};

/// Native sample representation of a decoded clip.
///
/// Samples are always held as interleaved `f32` in `[-1, 1]`; the format
/// records the width the clip is written back at and how floats map onto it:
/// - `U8`:  `(v - 128) / 128`
/// - `I16`: `v / 32768`
/// - `I32`: `v / 2147483648`
/// - `F32`: identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    U8,
    I16,
    I32,
    F32,
}

impl SampleFormat {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::U8 => 8,
            SampleFormat::I16 => 16,
            SampleFormat::I32 | SampleFormat::F32 => 32,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32)
    }

    /// Divisor between the integer code and the normalized float.
    fn scale(self) -> Option<f64> {
        match self {
            SampleFormat::U8 => Some(128.0),
            SampleFormat::I16 => Some(32_768.0),
            SampleFormat::I32 => Some(2_147_483_648.0),
            SampleFormat::F32 => None,
        }
    }

    /// Signed integer code for a normalized sample, rounded to nearest and
    /// clamped to the representable range. For `U8` the code is centred on
    /// zero (`-128..=127`); add 128 for the unsigned byte.
    pub(crate) fn to_code(self, sample: f32) -> i64 {
        match self.scale() {
            Some(scale) => {
                let max = (scale - 1.0) as i64;
                let min = -(scale as i64);
                ((sample as f64) * scale).round().clamp(min as f64, max as f64) as i64
            }
            None => 0,
        }
    }

    pub(crate) fn from_code(self, code: i64) -> f32 {
        match self.scale() {
            Some(scale) => (code as f64 / scale) as f32,
            None => 0.0,
        }
    }

    /// Round a normalized sample to the nearest value this format can hold.
    pub fn quantize(self, sample: f32) -> f32 {
        if self.is_float() {
            sample
        } else {
            self.from_code(self.to_code(sample))
        }
    }
}

/// Decoded, fully buffered audio clip.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, `len() % channels == 0`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16, format: SampleFormat) -> Self {
        debug_assert!(channels >= 1);
        debug_assert_eq!(samples.len() % channels.max(1) as usize, 0);
        Self {
            samples,
            sample_rate,
            channels,
            format,
        }
    }

    /// Buffer of digital silence with the same layout as `self`.
    ///
    /// `None` when the sample count does not fit in memory.
    pub fn silent_like(&self, duration_ms: u64) -> Option<Self> {
        let frames = ms_to_frames(duration_ms, self.sample_rate);
        let len = frames.checked_mul(self.channels.max(1) as usize)?;
        let mut samples = Vec::new();
        samples.try_reserve_exact(len).ok()?;
        samples.resize(len, 0.0);
        Some(Self::new(
            samples,
            self.sample_rate,
            self.channels,
            self.format,
        ))
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.duration() * 1000.0).round() as u64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Frame count for `ms` milliseconds, saturating at `usize::MAX`.
pub(crate) fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    let frames = ms as u128 * sample_rate as u128 / 1000;
    usize::try_from(frames).unwrap_or(usize::MAX)
}

/// Output container requested for the cleaned file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
    M4a,
}

impl OutputFormat {
    /// Unrecognised names fall back to WAV.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mp3" => OutputFormat::Mp3,
            "m4a" => OutputFormat::M4a,
            _ => OutputFormat::Wav,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
