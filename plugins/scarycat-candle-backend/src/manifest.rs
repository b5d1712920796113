//! Sidecar manifest describing a ViT classifier's labels and preprocessing

use candle_transformers::models::vit;
use scarycat_core::BackendError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// `<stem>.json` next to a `<stem>.safetensors` weight file
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    /// Class labels in logit order
    pub labels: Vec<String>,

    /// Square input edge in pixels
    #[serde(default = "default_image_size")]
    pub image_size: usize,

    /// Per-channel normalization applied after scaling pixels to [0, 1]
    #[serde(default = "default_mean")]
    pub mean: f32,

    #[serde(default = "default_std")]
    pub std: f32,

    /// ViT hyperparameters; defaults to ViT-Base/16 at 224px
    #[serde(default = "default_architecture")]
    pub architecture: vit::Config,
}

impl ModelManifest {
    /// Sidecar path for a weight file
    pub fn sidecar_path(weights: &Path) -> PathBuf {
        weights.with_extension("json")
    }

    /// Read and validate the sidecar manifest for `weights`
    pub fn for_weights(weights: &Path) -> Result<Self, BackendError> {
        let path = Self::sidecar_path(weights);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BackendError::wrap(format!("cannot read manifest {}", path.display()), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| BackendError::wrap("invalid model manifest", e))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        if self.labels.is_empty() {
            return Err(BackendError::msg("model manifest lists no labels"));
        }
        if self.image_size == 0 {
            return Err(BackendError::msg("image_size must be positive"));
        }
        if !self.std.is_finite() || self.std == 0.0 {
            return Err(BackendError::msg("std must be a finite non-zero value"));
        }
        if self.architecture.image_size != self.image_size {
            return Err(BackendError::msg(format!(
                "image_size {} does not match architecture.image_size {}",
                self.image_size, self.architecture.image_size
            )));
        }
        Ok(())
    }
}

fn default_image_size() -> usize {
    224
}

fn default_mean() -> f32 {
    0.5
}

fn default_std() -> f32 {
    0.5
}

fn default_architecture() -> vit::Config {
    vit::Config::vit_base_patch16_224()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_uses_defaults() {
        let manifest = ModelManifest::from_json(r#"{"labels": ["hissing", "rest"]}"#).unwrap();

        assert_eq!(manifest.labels, vec!["hissing", "rest"]);
        assert_eq!(manifest.image_size, 224);
        assert_eq!(manifest.mean, 0.5);
        assert_eq!(manifest.std, 0.5);
        assert_eq!(manifest.architecture.patch_size, 16);
    }

    #[test]
    fn test_rejects_bad_manifests() {
        assert!(ModelManifest::from_json(r#"{"labels": []}"#).is_err());
        assert!(ModelManifest::from_json(r#"{"labels": ["a"], "std": 0.0}"#).is_err());
        assert!(ModelManifest::from_json(r#"{"labels": ["a"], "image_size": 384}"#).is_err());
        assert!(ModelManifest::from_json("not json").is_err());
    }

    #[test]
    fn test_sidecar_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("ears_back.safetensors");
        assert_eq!(
            ModelManifest::sidecar_path(&weights),
            dir.path().join("ears_back.json")
        );

        assert!(ModelManifest::for_weights(&weights).is_err());

        std::fs::write(
            dir.path().join("ears_back.json"),
            r#"{"labels": ["ears_back", "rest"], "mean": 0.45}"#,
        )
        .unwrap();
        let manifest = ModelManifest::for_weights(&weights).unwrap();
        assert_eq!(manifest.mean, 0.45);
    }
}
