//! Mouth-open / safe disambiguation
//!
//! An open mouth is easily read as a scary signal by the one-vs-rest
//! ensemble. When that is the ensemble's only finding, a dedicated
//! one-vs-one model decides between the target label and "safe".

use crate::backend::InferenceBackend;
use crate::catalog::ModelCatalog;
use scarycat_core::{ConfidenceMap, EventSink};
use std::sync::Arc;

/// Outcome of a disambiguation pass
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No catalog entry matches the disambiguation model pattern
    ModelMissing,

    /// The disambiguation model failed to run
    Failed,

    /// The model's output lacked one of the two labels
    Incomplete,

    /// Safe won: the target label's confidence was set to zero
    Suppressed { safe: f32, target: f32 },

    /// Target won or tied: the map was left unchanged
    Kept { safe: f32, target: f32 },
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelMissing => "model_missing",
            Self::Failed => "failed",
            Self::Incomplete => "incomplete",
            Self::Suppressed { .. } => "suppressed",
            Self::Kept { .. } => "kept",
        }
    }
}

/// Resolves a lone target-label finding with a one-vs-one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disambiguator {
    model_pattern: String,
    target_label: String,
    safe_label: String,
}

impl Disambiguator {
    pub fn new(
        model_pattern: impl Into<String>,
        target_label: impl Into<String>,
        safe_label: impl Into<String>,
    ) -> Self {
        Self {
            model_pattern: model_pattern.into(),
            target_label: target_label.into(),
            safe_label: safe_label.into(),
        }
    }

    /// The `OvO_mouth_open_vs_safe` rule
    pub fn mouth_open() -> Self {
        Self::new("OvO_mouth_open_vs_safe", "mouth_open", "safe")
    }

    pub fn model_pattern(&self) -> &str {
        &self.model_pattern
    }

    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    pub fn safe_label(&self) -> &str {
        &self.safe_label
    }

    /// True iff the map holds exactly one entry and it is the target label
    pub fn applies_to(&self, confidences: &ConfidenceMap) -> bool {
        matches!(confidences.single(), Some((label, _)) if label == self.target_label)
    }

    /// Run the one-vs-one model and zero the target label if safe wins.
    ///
    /// Never fails: a missing model, an inference error, or an incomplete
    /// output leave `confidences` untouched. A tie keeps the target label.
    pub fn resolve<B: InferenceBackend>(
        &self,
        confidences: &mut ConfidenceMap,
        image: &[u8],
        catalog: &ModelCatalog<B>,
        events: &Arc<dyn EventSink>,
    ) -> Resolution {
        let resolution = self.run(confidences, image, catalog, events);
        metrics::counter!("scarycat_disambiguations_total", "outcome" => resolution.as_str())
            .increment(1);
        resolution
    }

    fn run<B: InferenceBackend>(
        &self,
        confidences: &mut ConfidenceMap,
        image: &[u8],
        catalog: &ModelCatalog<B>,
        events: &Arc<dyn EventSink>,
    ) -> Resolution {
        let Some(entry) = catalog.find_by_name_fragment(&self.model_pattern) else {
            events.debug(format!(
                "no {} model loaded; keeping {} as is",
                self.model_pattern, self.target_label
            ));
            return Resolution::ModelMissing;
        };

        let output = match catalog.infer(entry, image) {
            Ok(output) => output,
            Err(e) => {
                events.warning(format!(
                    "disambiguation with {} failed: {}",
                    entry.name(),
                    e
                ));
                return Resolution::Failed;
            }
        };

        let (Some(safe), Some(target)) = (
            output.find(&self.safe_label).map(|o| o.confidence),
            output.find(&self.target_label).map(|o| o.confidence),
        ) else {
            events.debug(format!(
                "{} did not report both {} and {}",
                entry.name(),
                self.safe_label,
                self.target_label
            ));
            return Resolution::Incomplete;
        };

        if safe > target {
            confidences.insert(self.target_label.clone(), 0.0);
            events.info(format!(
                "{} judged the image {} ({:.3} > {:.3}); {} confidence set to 0",
                entry.name(),
                self.safe_label,
                safe,
                target,
                self.target_label
            ));
            Resolution::Suppressed { safe, target }
        } else {
            Resolution::Kept { safe, target }
        }
    }
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::mouth_open()
    }
}
