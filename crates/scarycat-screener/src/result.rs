//! Screening results for single images and whole batches

use bytes::Bytes;
use scarycat_core::{ConfidenceMap, Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Result of screening one image
#[derive(Debug, Clone, Serialize)]
pub struct IndividualScreeningResult {
    /// The input buffer; serialized as its length only
    #[serde(rename = "image_size_bytes", serialize_with = "serialize_len")]
    pub image_data: Bytes,

    /// Merged ensemble confidences
    pub confidences: ConfidenceMap,

    /// Threshold this image was evaluated against
    pub probability_threshold: f32,

    /// Position in the input batch
    pub original_index: usize,
}

impl IndividualScreeningResult {
    pub fn new(
        image_data: Bytes,
        confidences: ConfidenceMap,
        probability_threshold: f32,
        original_index: usize,
    ) -> Self {
        Self {
            image_data,
            confidences,
            probability_threshold,
            original_index,
        }
    }

    /// True if any confidence is strictly above the threshold
    pub fn is_flagged(&self) -> bool {
        self.confidences
            .iter()
            .any(|(_, confidence)| confidence > self.probability_threshold)
    }

    /// Labels above the threshold, highest confidence first
    pub fn flagged_labels(&self) -> Vec<(&str, f32)> {
        self.confidences.above(self.probability_threshold)
    }

    /// Highest confidence of any label
    pub fn max_confidence(&self) -> Option<(&str, f32)> {
        self.confidences.max()
    }
}

/// An image that could not be scored, kept when the batch continues past errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningFailure {
    pub original_index: usize,
    pub error: String,
}

impl ScreeningFailure {
    pub fn new(original_index: usize, error: &Error) -> Self {
        Self {
            original_index,
            error: error.to_string(),
        }
    }
}

/// Results for a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverallScreeningResult {
    results: Vec<IndividualScreeningResult>,
    failures: Vec<ScreeningFailure>,
}

/// Batch totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningSummary {
    pub screened: usize,
    pub flagged: usize,
    pub safe: usize,
    pub failed: usize,
    pub worst_case_confidences: BTreeMap<String, f32>,
}

impl OverallScreeningResult {
    pub fn new(results: Vec<IndividualScreeningResult>, failures: Vec<ScreeningFailure>) -> Self {
        Self { results, failures }
    }

    /// Scored images in input order.
    ///
    /// Under the `abort` policy `results()[i].original_index == i`. Under
    /// `continue`, failed images are absent here and listed in
    /// [`failures`](Self::failures), so positions shift after the first
    /// failure; use [`by_original_index`](Self::by_original_index) to look
    /// an image up by its batch position.
    pub fn results(&self) -> &[IndividualScreeningResult] {
        &self.results
    }

    /// Images that failed to score (empty unless the batch continued past errors)
    pub fn failures(&self) -> &[ScreeningFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&IndividualScreeningResult> {
        self.results.get(index)
    }

    /// Result for the image at `original_index` in the input batch
    pub fn by_original_index(&self, original_index: usize) -> Option<&IndividualScreeningResult> {
        self.results
            .binary_search_by_key(&original_index, |r| r.original_index)
            .ok()
            .map(|position| &self.results[position])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndividualScreeningResult> {
        self.results.iter()
    }

    pub fn flagged(&self) -> impl Iterator<Item = &IndividualScreeningResult> {
        self.results.iter().filter(|r| r.is_flagged())
    }

    pub fn safe(&self) -> impl Iterator<Item = &IndividualScreeningResult> {
        self.results.iter().filter(|r| !r.is_flagged())
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }

    pub fn has_flagged(&self) -> bool {
        self.results.iter().any(IndividualScreeningResult::is_flagged)
    }

    /// Highest confidence seen for each label across the batch
    pub fn worst_case_confidences(&self) -> BTreeMap<String, f32> {
        let mut worst: BTreeMap<String, f32> = BTreeMap::new();
        for (label, confidence) in self.results.iter().flat_map(|r| r.confidences.iter()) {
            worst
                .entry(label.to_string())
                .and_modify(|c| *c = c.max(confidence))
                .or_insert(confidence);
        }
        worst
    }

    pub fn summary(&self) -> ScreeningSummary {
        let flagged = self.flagged_count();
        ScreeningSummary {
            screened: self.results.len(),
            flagged,
            safe: self.results.len() - flagged,
            failed: self.failures.len(),
            worst_case_confidences: self.worst_case_confidences(),
        }
    }

    /// Summary, per-image results and failures as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            summary: ScreeningSummary,
            results: &'a [IndividualScreeningResult],
            failures: &'a [ScreeningFailure],
        }

        serde_json::to_string_pretty(&Document {
            summary: self.summary(),
            results: &self.results,
            failures: &self.failures,
        })
        .map_err(Error::from)
    }
}

impl<'a> IntoIterator for &'a OverallScreeningResult {
    type Item = &'a IndividualScreeningResult;
    type IntoIter = std::slice::Iter<'a, IndividualScreeningResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

fn serialize_len<S: Serializer>(data: &Bytes, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, threshold: f32, pairs: &[(&str, f32)]) -> IndividualScreeningResult {
        IndividualScreeningResult::new(
            Bytes::from_static(b"\x89PNG"),
            pairs.iter().map(|(l, c)| (*l, *c)).collect(),
            threshold,
            index,
        )
    }

    #[test]
    fn test_flagged_is_strictly_above_threshold() {
        assert!(result(0, 0.95, &[("hissing", 0.96)]).is_flagged());
        assert!(!result(0, 0.95, &[("hissing", 0.95)]).is_flagged());
        assert!(!result(0, 0.95, &[]).is_flagged());
    }

    #[test]
    fn test_flagged_labels_sorted() {
        let r = result(0, 0.5, &[("ears_back", 0.6), ("hissing", 0.9), ("tail_up", 0.1)]);
        assert_eq!(r.flagged_labels(), vec![("hissing", 0.9), ("ears_back", 0.6)]);
        assert_eq!(r.max_confidence(), Some(("hissing", 0.9)));
    }

    #[test]
    fn test_worst_case_per_label() {
        let overall = OverallScreeningResult::new(
            vec![
                result(0, 0.95, &[("ears_back", 0.2), ("hissing", 0.97)]),
                result(1, 0.95, &[("ears_back", 0.7)]),
            ],
            Vec::new(),
        );

        let worst = overall.worst_case_confidences();
        assert_eq!(worst.get("ears_back"), Some(&0.7));
        assert_eq!(worst.get("hissing"), Some(&0.97));
        assert_eq!(overall.flagged_count(), 1);
        assert_eq!(overall.safe().count(), 1);
        assert!(overall.has_flagged());
    }

    #[test]
    fn test_summary_counts_failures() {
        let overall = OverallScreeningResult::new(
            vec![result(1, 0.95, &[])],
            vec![ScreeningFailure::new(0, &Error::internal("decoder crashed"))],
        );

        let summary = overall.summary();
        assert_eq!(summary.screened, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.safe, 1);
    }

    #[test]
    fn test_json_omits_image_bytes() {
        let overall = OverallScreeningResult::new(vec![result(0, 0.95, &[("hissing", 0.5)])], vec![]);
        let json: serde_json::Value = serde_json::from_str(&overall.to_json_pretty().unwrap()).unwrap();

        let first = &json["results"][0];
        assert_eq!(first["image_size_bytes"], 4);
        assert_eq!(first["original_index"], 0);
        assert_eq!(json["summary"]["screened"], 1);
    }
}
