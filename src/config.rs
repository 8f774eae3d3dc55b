use std::path::Path;

use crate::cli::{SimilarityArgs, SimilarityMetric};
use crate::error::ConfigurationError;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const SIMILARITY_THRESHOLD_ENV: &str = "TOURNOTES_SIMILARITY_THRESHOLD";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityConfig {
    pub threshold: f64,
    pub metric: SimilarityMetric,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            metric: SimilarityMetric::Jaccard,
        }
    }
}

impl SimilarityConfig {
    pub fn from_args(args: &SimilarityArgs) -> Result<Self, ConfigurationError> {
        let env_value = std::env::var(SIMILARITY_THRESHOLD_ENV).ok();
        Ok(Self {
            threshold: resolve_threshold(args.threshold, env_value.as_deref())?,
            metric: args.metric,
        })
    }
}

/// Flag first, then the environment, then the default. The result must lie in
/// `[0, 1]`.
pub fn resolve_threshold(flag: Option<f64>, env_value: Option<&str>) -> Result<f64, ConfigurationError> {
    let threshold = match (flag, env_value.map(str::trim).filter(|value| !value.is_empty())) {
        (Some(value), _) => value,
        (None, Some(raw)) => raw
            .parse::<f64>()
            .map_err(|_| ConfigurationError::ThresholdNotANumber {
                value: raw.to_string(),
                source_name: SIMILARITY_THRESHOLD_ENV.to_string(),
            })?,
        (None, None) => DEFAULT_SIMILARITY_THRESHOLD,
    };

    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigurationError::ThresholdOutOfRange(threshold));
    }

    Ok(threshold)
}

pub fn ensure_notes_dir(path: &Path) -> Result<(), ConfigurationError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ConfigurationError::NotesDirMissing(path.to_path_buf()))
    }
}

pub fn ensure_index_file(path: &Path) -> Result<(), ConfigurationError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigurationError::IndexFileMissing(path.to_path_buf()))
    }
}
