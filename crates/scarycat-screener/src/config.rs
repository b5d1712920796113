//! Screener configuration

use crate::disambiguator::Disambiguator;
use crate::scorer::EnsembleScorer;
use scarycat_core::{Error, EventSink, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default probability threshold for flagging an image
pub const DEFAULT_PROBABILITY_THRESHOLD: f32 = 0.95;

/// Configuration for model loading and screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// Directory scanned for model sources
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Extension of model sources, without the dot
    #[serde(default = "default_model_extension")]
    pub model_extension: String,

    /// Threshold used when the caller does not pass one
    #[serde(default = "default_threshold")]
    pub probability_threshold: f32,

    /// Upper bound on models loaded at the same time
    #[serde(default = "default_load_concurrency")]
    pub load_concurrency: usize,

    /// Mouth-open / safe disambiguation
    #[serde(default)]
    pub disambiguation: DisambiguationConfig,

    /// Labels dropped in addition to `rest` and `safe` (case-insensitive)
    #[serde(default)]
    pub excluded_labels: Vec<String>,

    /// What a batch does when one image fails to score
    #[serde(default)]
    pub on_image_error: OnImageError,
}

/// Disambiguation rule settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisambiguationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Substring identifying the one-vs-one model by name
    #[serde(default = "default_model_pattern")]
    pub model_pattern: String,

    #[serde(default = "default_target_label")]
    pub target_label: String,

    #[serde(default = "default_safe_label")]
    pub safe_label: String,
}

/// Batch policy for per-image scoring errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnImageError {
    /// Stop the batch and return the error
    #[default]
    Abort,
    /// Record the failure and keep screening the remaining images
    Continue,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            model_extension: default_model_extension(),
            probability_threshold: default_threshold(),
            load_concurrency: default_load_concurrency(),
            disambiguation: DisambiguationConfig::default(),
            excluded_labels: Vec::new(),
            on_image_error: OnImageError::default(),
        }
    }
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_pattern: default_model_pattern(),
            target_label: default_target_label(),
            safe_label: default_safe_label(),
        }
    }
}

impl DisambiguationConfig {
    /// The configured rule, or `None` when disabled
    pub fn to_disambiguator(&self) -> Option<Disambiguator> {
        self.enabled.then(|| {
            Disambiguator::new(&self.model_pattern, &self.target_label, &self.safe_label)
        })
    }
}

impl ScreenerConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid screener config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings that would make screening meaningless
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.probability_threshold)?;

        if self.load_concurrency == 0 {
            return Err(Error::config("load_concurrency must be at least 1"));
        }
        if self.model_extension.trim_start_matches('.').is_empty() {
            return Err(Error::config("model_extension must not be empty"));
        }
        if self.disambiguation.enabled && self.disambiguation.model_pattern.is_empty() {
            return Err(Error::config(
                "disambiguation.model_pattern must not be empty when disambiguation is enabled",
            ));
        }
        Ok(())
    }

    /// Build the ensemble scorer described by this configuration
    pub fn build_scorer(&self, events: Arc<dyn EventSink>) -> EnsembleScorer {
        EnsembleScorer::new(events)
            .with_excluded_labels(self.excluded_labels.iter().cloned())
            .with_disambiguator(self.disambiguation.to_disambiguator())
    }
}

/// Check that a threshold is a finite value in [0, 1]
pub fn validate_threshold(threshold: f32) -> Result<f32> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidThreshold(threshold))
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_model_extension() -> String {
    "safetensors".to_string()
}

fn default_threshold() -> f32 {
    DEFAULT_PROBABILITY_THRESHOLD
}

fn default_load_concurrency() -> usize {
    num_cpus::get().max(1)
}

fn default_model_pattern() -> String {
    "OvO_mouth_open_vs_safe".to_string()
}

fn default_target_label() -> String {
    "mouth_open".to_string()
}

fn default_safe_label() -> String {
    "safe".to_string()
}

fn default_true() -> bool {
    true
}
