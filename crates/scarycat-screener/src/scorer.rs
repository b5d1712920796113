//! Ensemble scoring of a single image

use crate::backend::InferenceBackend;
use crate::catalog::ModelCatalog;
use crate::disambiguator::Disambiguator;
use scarycat_core::{ConfidenceMap, Error, EventSink, InferenceOutput, Observation, Result};
use std::sync::Arc;

/// Housekeeping labels emitted by one-vs-rest models
pub const DEFAULT_EXCLUDED_LABELS: [&str; 2] = ["rest", "safe"];

/// Runs every catalog model on an image and merges their findings
pub struct EnsembleScorer {
    extra_excluded_labels: Vec<String>,
    disambiguator: Option<Disambiguator>,
    events: Arc<dyn EventSink>,
}

impl EnsembleScorer {
    /// Scorer with the default exclusions and the mouth_open rule
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            extra_excluded_labels: Vec::new(),
            disambiguator: Some(Disambiguator::mouth_open()),
            events,
        }
    }

    /// Labels dropped in addition to `rest` and `safe` (case-insensitive)
    pub fn with_excluded_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_excluded_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Replace or disable (`None`) the disambiguation rule
    pub fn with_disambiguator(mut self, disambiguator: Option<Disambiguator>) -> Self {
        self.disambiguator = disambiguator;
        self
    }

    pub fn disambiguator(&self) -> Option<&Disambiguator> {
        self.disambiguator.as_ref()
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// `rest` and `safe` are always excluded; extra labels only add to them
    pub fn is_excluded(&self, label: &str) -> bool {
        DEFAULT_EXCLUDED_LABELS
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(label))
            || self
                .extra_excluded_labels
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(label))
    }

    /// Score one image against every model in the catalog.
    ///
    /// Models run one after another in catalog order; a later model's
    /// confidence for a label overwrites an earlier one. A backend error
    /// fails the whole image. An output that is not a classification result
    /// only drops that model's contribution.
    pub fn score_image<B: InferenceBackend>(
        &self,
        catalog: &ModelCatalog<B>,
        image: &[u8],
    ) -> Result<ConfidenceMap> {
        let mut confidences = ConfidenceMap::new();

        for entry in catalog.entries() {
            let output = catalog.infer(entry, image).map_err(|e| {
                self.events
                    .error(format!("inference with model {} failed: {}", entry.name(), e));
                metrics::counter!("scarycat_prediction_failures_total").increment(1);
                Error::prediction_failed(entry.name(), e)
            })?;

            match output {
                InferenceOutput::Classifications(observations) => {
                    self.merge(&mut confidences, &observations);
                }
                InferenceOutput::Unrecognized { description } => {
                    self.events.warning(format!(
                        "model {} returned an unrecognized result ({}); skipping it",
                        entry.name(),
                        description
                    ));
                }
            }
        }

        if let Some(disambiguator) = &self.disambiguator {
            if disambiguator.applies_to(&confidences) {
                disambiguator.resolve(&mut confidences, image, catalog, &self.events);
            }
        }

        Ok(confidences)
    }

    /// Insert observations, skipping excluded labels
    pub fn merge(&self, confidences: &mut ConfidenceMap, observations: &[Observation]) {
        for observation in observations {
            if !self.is_excluded(&observation.label) {
                confidences.insert(observation.label.clone(), observation.confidence);
            }
        }
    }
}

impl std::fmt::Debug for EnsembleScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleScorer")
            .field("extra_excluded_labels", &self.extra_excluded_labels)
            .field("disambiguator", &self.disambiguator)
            .finish_non_exhaustive()
    }
}
