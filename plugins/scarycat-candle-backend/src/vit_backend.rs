//! ViT image classifiers on Candle

use crate::manifest::ModelManifest;
use crate::preprocess::image_tensor;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::vit;
use scarycat_core::{BackendError, InferenceOutput, Observation};
use scarycat_screener::InferenceBackend;
use std::path::Path;

/// A loaded classifier and the manifest it was built from
pub struct VitClassifier {
    model: vit::Model,
    manifest: ModelManifest,
}

impl VitClassifier {
    pub fn labels(&self) -> &[String] {
        &self.manifest.labels
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }
}

/// Runs `.safetensors` ViT classifiers described by sidecar manifests
pub struct CandleVitBackend {
    device: Device,
}

impl CandleVitBackend {
    /// Backend on the best device enabled at build time, falling back to CPU
    pub fn new() -> Self {
        #[cfg(feature = "metal")]
        let device = Device::new_metal(0).unwrap_or(Device::Cpu);
        #[cfg(all(feature = "cuda", not(feature = "metal")))]
        let device = Device::new_cuda(0).unwrap_or(Device::Cpu);
        #[cfg(not(any(feature = "metal", feature = "cuda")))]
        let device = Device::Cpu;

        Self::with_device(device)
    }

    pub fn with_device(device: Device) -> Self {
        tracing::debug!(?device, "candle backend device selected");
        Self { device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Default for CandleVitBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for CandleVitBackend {
    type Handle = VitClassifier;

    fn load(&self, source: &Path) -> Result<VitClassifier, BackendError> {
        let manifest = ModelManifest::for_weights(source)?;

        // Memory-mapped; the file must not change while the model is loaded.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[source], DType::F32, &self.device)
        }
        .map_err(|e| BackendError::wrap(format!("cannot map {}", source.display()), e))?;

        let model = vit::Model::new(&manifest.architecture, manifest.labels.len(), vb)
            .map_err(|e| BackendError::wrap("cannot build ViT model", e))?;

        tracing::debug!(
            source = %source.display(),
            labels = manifest.labels.len(),
            "loaded ViT classifier"
        );
        Ok(VitClassifier { model, manifest })
    }

    fn infer(
        &self,
        handle: &mut VitClassifier,
        image: &[u8],
    ) -> Result<InferenceOutput, BackendError> {
        let manifest = &handle.manifest;
        let input = image_tensor(
            image,
            manifest.image_size,
            manifest.mean,
            manifest.std,
            &self.device,
        )?;

        let logits = handle
            .model
            .forward(&input)
            .map_err(|e| BackendError::wrap("forward pass failed", e))?;

        // Guard only: the head is built with one output per label, so this
        // trips only if a future architecture reshapes the logits.
        let width = logits.dims().last().copied().unwrap_or(0);
        if width != manifest.labels.len() {
            return Ok(InferenceOutput::unrecognized(format!(
                "{} logits for {} labels",
                width,
                manifest.labels.len()
            )));
        }

        let probabilities = softmax_row(&logits)
            .map_err(|e| BackendError::wrap("cannot read class probabilities", e))?;

        Ok(manifest
            .labels
            .iter()
            .zip(probabilities)
            .map(|(label, confidence)| Observation::new(label.clone(), confidence))
            .collect::<Vec<_>>()
            .into())
    }

    fn name(&self) -> &str {
        "candle-vit"
    }
}

fn softmax_row(logits: &Tensor) -> candle_core::Result<Vec<f32>> {
    candle_nn::ops::softmax(logits, candle_core::D::Minus1)?
        .flatten_all()?
        .to_vec1::<f32>()
}
