//! Human-readable screening report

use crate::result::{IndividualScreeningResult, OverallScreeningResult, ScreeningFailure};
use std::fmt::Write;

const RULE: &str = "----------------------------------------";

enum Line<'a> {
    Screened(&'a IndividualScreeningResult),
    Failed(&'a ScreeningFailure),
}

impl Line<'_> {
    fn index(&self) -> usize {
        match self {
            Self::Screened(r) => r.original_index,
            Self::Failed(f) => f.original_index,
        }
    }
}

impl OverallScreeningResult {
    /// Render a report of already-computed results.
    ///
    /// Lists every image in input order with its verdict and the labels that
    /// crossed its threshold, then batch totals and the worst-case
    /// confidence per label.
    pub fn generate_report(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_report(&mut out);
        out
    }

    fn write_report(&self, out: &mut String) -> std::fmt::Result {
        let summary = self.summary();

        writeln!(out, "===== ScaryCat Screening Report =====")?;
        writeln!(
            out,
            "Images: {} | Flagged: {} | Safe: {} | Failed: {}",
            summary.screened + summary.failed,
            summary.flagged,
            summary.safe,
            summary.failed
        )?;
        writeln!(out, "{RULE}")?;

        let mut lines: Vec<Line<'_>> = self
            .results()
            .iter()
            .map(Line::Screened)
            .chain(self.failures().iter().map(Line::Failed))
            .collect();
        lines.sort_by_key(Line::index);

        if lines.is_empty() {
            writeln!(out, "No images were screened.")?;
        }

        for line in &lines {
            match line {
                Line::Screened(result) => write_result(out, result)?,
                Line::Failed(failure) => {
                    writeln!(out, "[#{}] FAILED: {}", failure.original_index, failure.error)?;
                }
            }
        }

        if !summary.worst_case_confidences.is_empty() {
            writeln!(out, "{RULE}")?;
            writeln!(out, "Worst-case confidence per label:")?;
            let width = summary
                .worst_case_confidences
                .keys()
                .map(String::len)
                .max()
                .unwrap_or(0);
            for (label, confidence) in &summary.worst_case_confidences {
                writeln!(out, "  {label:<width$}  {confidence:.3}")?;
            }
        }

        writeln!(out, "=====================================")
    }
}

fn write_result(out: &mut String, result: &IndividualScreeningResult) -> std::fmt::Result {
    let flagged = result.flagged_labels();

    if flagged.is_empty() {
        write!(
            out,
            "[#{}] SAFE (threshold {:.3})",
            result.original_index, result.probability_threshold
        )?;
        match result.max_confidence() {
            Some((label, confidence)) => writeln!(out, " - highest: {label} {confidence:.3}"),
            None => writeln!(out, " - no findings"),
        }
    } else {
        writeln!(
            out,
            "[#{}] FLAGGED (threshold {:.3})",
            result.original_index, result.probability_threshold
        )?;
        for (label, confidence) in flagged {
            writeln!(out, "      - {label}: {confidence:.3}")?;
        }
        Ok(())
    }
}
