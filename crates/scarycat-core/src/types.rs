//! Core types for ScaryCat

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single (label, confidence) pair produced by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Class label as reported by the model
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl Observation {
    /// Create a new observation
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Case-insensitive label comparison
    pub fn is_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}

/// Output of one backend inference call
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    /// Classification observations, one per class the model knows
    Classifications(Vec<Observation>),

    /// The model produced something that is not a classification result
    Unrecognized {
        /// Short description of what was produced instead
        description: String,
    },
}

impl InferenceOutput {
    /// Create an unrecognized output
    pub fn unrecognized(description: impl Into<String>) -> Self {
        Self::Unrecognized {
            description: description.into(),
        }
    }

    /// Observations, if the output was a classification result
    pub fn observations(&self) -> Option<&[Observation]> {
        match self {
            Self::Classifications(observations) => Some(observations),
            Self::Unrecognized { .. } => None,
        }
    }

    /// First observation whose label matches case-insensitively
    pub fn find(&self, label: &str) -> Option<&Observation> {
        self.observations()?.iter().find(|o| o.is_label(label))
    }
}

impl From<Vec<Observation>> for InferenceOutput {
    fn from(observations: Vec<Observation>) -> Self {
        Self::Classifications(observations)
    }
}

/// Label to confidence map accumulated across the ensemble for one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfidenceMap(BTreeMap<String, f32>);

impl ConfidenceMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a label's confidence
    pub fn insert(&mut self, label: impl Into<String>, confidence: f32) -> Option<f32> {
        self.0.insert(label.into(), confidence)
    }

    /// Confidence for an exact label
    pub fn get(&self, label: &str) -> Option<f32> {
        self.0.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate labels and confidences in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, confidence)| (label.as_str(), *confidence))
    }

    /// The only entry, if the map has exactly one
    pub fn single(&self) -> Option<(&str, f32)> {
        if self.0.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Highest confidence in the map
    pub fn max(&self) -> Option<(&str, f32)> {
        self.iter()
            .fold(None, |best: Option<(&str, f32)>, (label, confidence)| match best {
                Some((_, best_confidence)) if best_confidence >= confidence => best,
                _ => Some((label, confidence)),
            })
    }

    /// Labels whose confidence is strictly above `threshold`, highest first
    pub fn above(&self, threshold: f32) -> Vec<(&str, f32)> {
        let mut hits: Vec<_> = self.iter().filter(|(_, c)| *c > threshold).collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hits
    }

    pub fn into_inner(self) -> BTreeMap<String, f32> {
        self.0
    }
}

impl<L: Into<String>> FromIterator<(L, f32)> for ConfidenceMap {
    fn from_iter<I: IntoIterator<Item = (L, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, c)| (l.into(), c)).collect())
    }
}
