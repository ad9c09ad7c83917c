use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{error::Result, types::OutputFormat};

pub const UPLOAD_DIR_ENV: &str = "AUDIO_CLEANUP_UPLOAD_DIR";
pub const PROCESSED_DIR_ENV: &str = "AUDIO_CLEANUP_PROCESSED_DIR";

/// Where uploaded inputs and cleaned outputs live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(upload_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Roots from the environment, falling back to `./uploads` and
    /// `./processed`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var_os(key))
    }

    /// Same as [`StorageConfig::from_env`], reading variables through
    /// `lookup`. Unset or empty values use the local fallback.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let dir = |key: &str, fallback: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| Path::new(".").join(fallback))
        };
        Self::new(dir(UPLOAD_DIR_ENV, "uploads"), dir(PROCESSED_DIR_ENV, "processed"))
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)?;
        fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Per-job file locations. Every name embeds the job id, so concurrent jobs
/// never share a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPaths {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub output_filename: String,
}

impl JobPaths {
    pub fn derive(
        storage: &StorageConfig,
        job_id: Uuid,
        original_filename: &str,
        format: OutputFormat,
    ) -> Self {
        let id = job_id.simple().to_string();
        let safe = sanitize_filename(original_filename);
        let (stem, ext) = split_extension(&safe);

        let input_name = match ext {
            Some(ext) => format!("{id}_input.{}", ext.to_ascii_lowercase()),
            None => format!("{id}_input"),
        };
        let stem = if stem.is_empty() { "audio" } else { stem };
        let output_filename = format!("cleaned_{id}_{stem}.{}", format.extension());

        Self {
            input_path: storage.upload_dir.join(input_name),
            output_path: storage.processed_dir.join(&output_filename),
            output_filename,
        }
    }
}

/// Reduce an uploaded name to `[A-Za-z0-9._-]`, dropping any directory part.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
