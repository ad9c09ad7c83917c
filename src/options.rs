//! Typed cleanup configuration.
//!
//! Every parameter passes through a pure validation function that returns the
//! value to use plus an optional note describing any substitution. Invalid
//! input is never an error; the documented default is used instead and the
//! note is logged by whoever builds the parameter set.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{CleanupError, Result};

pub const DEFAULT_NOISE_REDUCTION_STRENGTH: f32 = 0.8;
pub const DEFAULT_HPF_CUTOFF_HZ: f32 = 80.0;
pub const DEFAULT_NORMALIZATION_TARGET_DBFS: f64 = -16.0;
pub const DEFAULT_TRIM_MIN_SILENCE_MS: u64 = 3000;
pub const DEFAULT_SILENCE_THRESH_DB: f64 = -40.0;
pub const DEFAULT_TRIM_CHUNK_MIN_DURATION_MS: u64 = 500;
pub const DEFAULT_TRIM_INSERT_SILENCE_MS: u64 = 500;

/// A parameter as supplied by the caller, before validation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum RawParam {
    /// Not supplied; the default applies without comment.
    #[default]
    Missing,
    Number(f64),
    /// Supplied but not numeric.
    Invalid,
}

impl From<f64> for RawParam {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            RawParam::Invalid
        } else {
            RawParam::Number(v)
        }
    }
}

impl From<f32> for RawParam {
    fn from(v: f32) -> Self {
        RawParam::from(v as f64)
    }
}

impl From<i64> for RawParam {
    fn from(v: i64) -> Self {
        RawParam::Number(v as f64)
    }
}

impl From<Option<&Value>> for RawParam {
    fn from(v: Option<&Value>) -> Self {
        match v {
            None | Some(Value::Null) => RawParam::Missing,
            Some(Value::Number(n)) => n.as_f64().map(RawParam::from).unwrap_or(RawParam::Invalid),
            Some(_) => RawParam::Invalid,
        }
    }
}

/// Result of validating one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub note: Option<String>,
}

impl<T> Validated<T> {
    fn accepted(value: T) -> Self {
        Self { value, note: None }
    }

    fn substituted(value: T, note: String) -> Self {
        Self {
            value,
            note: Some(note),
        }
    }

    fn logged(self, param: &'static str) -> T {
        if let Some(note) = &self.note {
            warn!(param, "{note}");
        }
        self.value
    }
}

fn describe(raw: RawParam) -> String {
    match raw {
        RawParam::Number(v) => v.to_string(),
        RawParam::Invalid => "non-numeric value".to_string(),
        RawParam::Missing => "missing value".to_string(),
    }
}

/// Noise reduction strength must lie in `(0, 1]`.
pub fn validate_strength(raw: impl Into<RawParam>) -> Validated<f32> {
    let raw = raw.into();
    match raw {
        RawParam::Missing => Validated::accepted(DEFAULT_NOISE_REDUCTION_STRENGTH),
        RawParam::Number(v) if v > 0.0 && v <= 1.0 => Validated::accepted(v as f32),
        _ => Validated::substituted(
            DEFAULT_NOISE_REDUCTION_STRENGTH,
            format!(
                "Invalid noise reduction strength: {}. Must be > 0 and <= 1.0. Using default {}.",
                describe(raw),
                DEFAULT_NOISE_REDUCTION_STRENGTH
            ),
        ),
    }
}

/// High-pass cutoff must be a positive, finite frequency.
pub fn validate_cutoff_hz(raw: impl Into<RawParam>) -> Validated<f32> {
    let raw = raw.into();
    match raw {
        RawParam::Missing => Validated::accepted(DEFAULT_HPF_CUTOFF_HZ),
        RawParam::Number(v) if v.is_finite() && v > 0.0 => Validated::accepted(v as f32),
        _ => Validated::substituted(
            DEFAULT_HPF_CUTOFF_HZ,
            format!(
                "Invalid high-pass cutoff: {}. Must be positive. Using default {} Hz.",
                describe(raw),
                DEFAULT_HPF_CUTOFF_HZ
            ),
        ),
    }
}

/// Normalization target must be finite and `<= 0` dBFS.
pub fn validate_target_dbfs(raw: impl Into<RawParam>) -> Validated<f64> {
    let raw = raw.into();
    match raw {
        RawParam::Missing => Validated::accepted(DEFAULT_NORMALIZATION_TARGET_DBFS),
        RawParam::Number(v) if v.is_finite() && v <= 0.0 => Validated::accepted(v),
        _ => Validated::substituted(
            DEFAULT_NORMALIZATION_TARGET_DBFS,
            format!(
                "Invalid target_dbfs: {}. Must be 0 or negative. Using default {}.",
                describe(raw),
                DEFAULT_NORMALIZATION_TARGET_DBFS
            ),
        ),
    }
}

/// Millisecond durations must be numeric and non-negative; fractions are
/// truncated.
pub fn validate_duration_ms(raw: impl Into<RawParam>, default: u64) -> Validated<u64> {
    let raw = raw.into();
    match raw {
        RawParam::Missing => Validated::accepted(default),
        RawParam::Number(v) if v.is_finite() && v >= 0.0 => Validated::accepted(v.trunc() as u64),
        _ => Validated::substituted(
            default,
            format!(
                "Invalid duration: {}. Must be >= 0 ms. Using default {default} ms.",
                describe(raw)
            ),
        ),
    }
}

/// Silence threshold only has to be numeric.
pub fn validate_silence_thresh_db(raw: impl Into<RawParam>) -> Validated<f64> {
    let raw = raw.into();
    match raw {
        RawParam::Missing => Validated::accepted(DEFAULT_SILENCE_THRESH_DB),
        RawParam::Number(v) if v.is_finite() => Validated::accepted(v.trunc()),
        _ => Validated::substituted(
            DEFAULT_SILENCE_THRESH_DB,
            format!(
                "Invalid silence threshold: {}. Using default {} dB.",
                describe(raw),
                DEFAULT_SILENCE_THRESH_DB
            ),
        ),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseReduceParams {
    /// Proportion of the estimated noise removed, `(0, 1]`.
    pub strength: f32,
}

impl NoiseReduceParams {
    pub fn new(strength: impl Into<RawParam>) -> Self {
        Self {
            strength: validate_strength(strength).logged("noise_reduce.strength"),
        }
    }
}

impl Default for NoiseReduceParams {
    fn default() -> Self {
        Self {
            strength: DEFAULT_NOISE_REDUCTION_STRENGTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighPassParams {
    pub cutoff_hz: f32,
}

impl HighPassParams {
    pub fn new(cutoff_hz: impl Into<RawParam>) -> Self {
        Self {
            cutoff_hz: validate_cutoff_hz(cutoff_hz).logged("high_pass.cutoff_hz"),
        }
    }
}

impl Default for HighPassParams {
    fn default() -> Self {
        Self {
            cutoff_hz: DEFAULT_HPF_CUTOFF_HZ,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizeParams {
    pub target_dbfs: f64,
}

impl NormalizeParams {
    pub fn new(target_dbfs: impl Into<RawParam>) -> Self {
        Self {
            target_dbfs: validate_target_dbfs(target_dbfs).logged("normalize.target_dbfs"),
        }
    }
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            target_dbfs: DEFAULT_NORMALIZATION_TARGET_DBFS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimSilenceParams {
    pub min_silence_ms: u64,
    pub silence_thresh_db: f64,
    pub chunk_min_duration_ms: u64,
    pub insert_silence_ms: u64,
}

/// Unvalidated silence trimming parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrimSilenceRaw {
    pub min_silence_ms: RawParam,
    pub silence_thresh_db: RawParam,
    pub chunk_min_duration_ms: RawParam,
    pub insert_silence_ms: RawParam,
}

impl TrimSilenceParams {
    pub fn new(raw: TrimSilenceRaw) -> Self {
        Self {
            min_silence_ms: validate_duration_ms(raw.min_silence_ms, DEFAULT_TRIM_MIN_SILENCE_MS)
                .logged("trim_silence.min_silence_ms"),
            silence_thresh_db: validate_silence_thresh_db(raw.silence_thresh_db)
                .logged("trim_silence.silence_thresh_db"),
            chunk_min_duration_ms: validate_duration_ms(
                raw.chunk_min_duration_ms,
                DEFAULT_TRIM_CHUNK_MIN_DURATION_MS,
            )
            .logged("trim_silence.chunk_min_duration_ms"),
            insert_silence_ms: validate_duration_ms(
                raw.insert_silence_ms,
                DEFAULT_TRIM_INSERT_SILENCE_MS,
            )
            .logged("trim_silence.insert_ms"),
        }
    }
}

impl Default for TrimSilenceParams {
    fn default() -> Self {
        Self {
            min_silence_ms: DEFAULT_TRIM_MIN_SILENCE_MS,
            silence_thresh_db: DEFAULT_SILENCE_THRESH_DB,
            chunk_min_duration_ms: DEFAULT_TRIM_CHUNK_MIN_DURATION_MS,
            insert_silence_ms: DEFAULT_TRIM_INSERT_SILENCE_MS,
        }
    }
}

/// One transform with its validated parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineStep {
    NoiseReduce(NoiseReduceParams),
    HighPass(HighPassParams),
    Normalize(NormalizeParams),
    TrimSilence(TrimSilenceParams),
}

impl PipelineStep {
    /// Key used in the option bag.
    pub fn key(&self) -> &'static str {
        match self {
            PipelineStep::NoiseReduce(_) => "noise_reduce",
            PipelineStep::HighPass(_) => "high_pass",
            PipelineStep::Normalize(_) => "normalize",
            PipelineStep::TrimSilence(_) => "trim_silence",
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            PipelineStep::NoiseReduce(_) => "Applying Noise Reduction...",
            PipelineStep::HighPass(_) => "Applying High-Pass Filter...",
            PipelineStep::Normalize(_) => "Normalizing Volume...",
            PipelineStep::TrimSilence(_) => "Trimming Silences...",
        }
    }
}

/// Which steps run, and with what parameters. `None` disables a step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupOptions {
    pub noise_reduce: Option<NoiseReduceParams>,
    pub high_pass: Option<HighPassParams>,
    pub normalize: Option<NormalizeParams>,
    pub trim_silence: Option<TrimSilenceParams>,
}

impl CleanupOptions {
    pub fn builder() -> CleanupOptionsBuilder {
        CleanupOptionsBuilder::default()
    }

    /// Every step enabled with default parameters.
    pub fn all_defaults() -> Self {
        Self {
            noise_reduce: Some(NoiseReduceParams::default()),
            high_pass: Some(HighPassParams::default()),
            normalize: Some(NormalizeParams::default()),
            trim_silence: Some(TrimSilenceParams::default()),
        }
    }

    /// Enabled steps in execution order.
    pub fn steps(&self) -> Vec<PipelineStep> {
        let mut steps = Vec::with_capacity(4);
        if let Some(p) = self.noise_reduce {
            steps.push(PipelineStep::NoiseReduce(p));
        }
        if let Some(p) = self.high_pass {
            steps.push(PipelineStep::HighPass(p));
        }
        if let Some(p) = self.normalize {
            steps.push(PipelineStep::Normalize(p));
        }
        if let Some(p) = self.trim_silence {
            steps.push(PipelineStep::TrimSilence(p));
        }
        steps
    }

    /// Parse an option bag such as
    /// `{"normalize": {"enabled": true, "target_dbfs": -20}}`.
    ///
    /// Malformed entries disable their step; bad parameters fall back to
    /// defaults. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            warn!("Cleanup options are not a mapping; all steps disabled");
            return Self::default();
        };

        let mut builder = Self::builder();
        if let Some(entry) = enabled_entry(map, "noise_reduce") {
            builder = builder.noise_reduce(RawParam::from(entry.get("strength")));
        }
        if let Some(entry) = enabled_entry(map, "high_pass") {
            builder = builder.high_pass(RawParam::from(entry.get("cutoff_hz")));
        }
        if let Some(entry) = enabled_entry(map, "normalize") {
            builder = builder.normalize(RawParam::from(entry.get("target_dbfs")));
        }
        if let Some(entry) = enabled_entry(map, "trim_silence") {
            let insert = entry
                .get("insert_ms")
                .or_else(|| entry.get("insert_silence_ms"));
            builder = builder.trim_silence(TrimSilenceRaw {
                min_silence_ms: RawParam::from(entry.get("min_silence_ms")),
                silence_thresh_db: RawParam::from(entry.get("silence_thresh_db")),
                chunk_min_duration_ms: RawParam::from(entry.get("chunk_min_duration_ms")),
                insert_silence_ms: RawParam::from(insert),
            });
        }

        for key in map.keys() {
            if !matches!(
                key.as_str(),
                "noise_reduce" | "high_pass" | "normalize" | "trim_silence"
            ) {
                debug!(key = key.as_str(), "Ignoring unknown cleanup option");
            }
        }

        builder.build()
    }

    /// Parse a JSON document. Only a document that is not a JSON object is
    /// rejected.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        if !value.is_object() {
            return Err(CleanupError::Options(
                "Cleanup options must be a dictionary.".into(),
            ));
        }
        Ok(Self::from_value(&value))
    }

    /// Render back into option-bag form.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "noise_reduce".into(),
            match self.noise_reduce {
                Some(p) => json!({ "enabled": true, "strength": p.strength }),
                None => json!({ "enabled": false }),
            },
        );
        map.insert(
            "high_pass".into(),
            match self.high_pass {
                Some(p) => json!({ "enabled": true, "cutoff_hz": p.cutoff_hz }),
                None => json!({ "enabled": false }),
            },
        );
        map.insert(
            "normalize".into(),
            match self.normalize {
                Some(p) => json!({ "enabled": true, "target_dbfs": p.target_dbfs }),
                None => json!({ "enabled": false }),
            },
        );
        map.insert(
            "trim_silence".into(),
            match self.trim_silence {
                Some(p) => json!({
                    "enabled": true,
                    "min_silence_ms": p.min_silence_ms,
                    "silence_thresh_db": p.silence_thresh_db,
                    "chunk_min_duration_ms": p.chunk_min_duration_ms,
                    "insert_ms": p.insert_silence_ms,
                }),
                None => json!({ "enabled": false }),
            },
        );
        Value::Object(map)
    }
}

fn enabled_entry<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    let entry = map.get(key)?;
    let Some(obj) = entry.as_object() else {
        warn!(key, "Cleanup option entry is not a mapping; step disabled");
        return None;
    };
    match obj.get("enabled") {
        Some(Value::Bool(true)) => Some(obj),
        Some(Value::Bool(false)) | None => None,
        Some(other) => {
            warn!(key, enabled = %other, "Non-boolean `enabled`; step disabled");
            None
        }
    }
}

/// Validating builder for [`CleanupOptions`]. Setters take raw values;
/// `build` substitutes defaults for anything out of range.
#[derive(Clone, Debug, Default)]
pub struct CleanupOptionsBuilder {
    noise_reduce: Option<RawParam>,
    high_pass: Option<RawParam>,
    normalize: Option<RawParam>,
    trim_silence: Option<TrimSilenceRaw>,
}

impl CleanupOptionsBuilder {
    pub fn noise_reduce(mut self, strength: impl Into<RawParam>) -> Self {
        self.noise_reduce = Some(strength.into());
        self
    }

    pub fn high_pass(mut self, cutoff_hz: impl Into<RawParam>) -> Self {
        self.high_pass = Some(cutoff_hz.into());
        self
    }

    pub fn normalize(mut self, target_dbfs: impl Into<RawParam>) -> Self {
        self.normalize = Some(target_dbfs.into());
        self
    }

    pub fn trim_silence(mut self, raw: TrimSilenceRaw) -> Self {
        self.trim_silence = Some(raw);
        self
    }

    pub fn min_silence_ms(mut self, v: impl Into<RawParam>) -> Self {
        self.trim_silence.get_or_insert_with(Default::default).min_silence_ms = v.into();
        self
    }

    pub fn silence_thresh_db(mut self, v: impl Into<RawParam>) -> Self {
        self.trim_silence.get_or_insert_with(Default::default).silence_thresh_db = v.into();
        self
    }

    pub fn chunk_min_duration_ms(mut self, v: impl Into<RawParam>) -> Self {
        self.trim_silence
            .get_or_insert_with(Default::default)
            .chunk_min_duration_ms = v.into();
        self
    }

    pub fn insert_silence_ms(mut self, v: impl Into<RawParam>) -> Self {
        self.trim_silence.get_or_insert_with(Default::default).insert_silence_ms = v.into();
        self
    }

    pub fn build(self) -> CleanupOptions {
        CleanupOptions {
            noise_reduce: self.noise_reduce.map(NoiseReduceParams::new),
            high_pass: self.high_pass.map(HighPassParams::new),
            normalize: self.normalize.map(NormalizeParams::new),
            trim_silence: self.trim_silence.map(TrimSilenceParams::new),
        }
    }
}
