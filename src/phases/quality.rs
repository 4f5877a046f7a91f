//! Phase 6: post-hoc quality gating.
//!
//! Every surviving boundary is scored on content length, emptiness, item
//! count, type-specific keyword confidence, and noise. Sections that fail
//! eligibility are excluded from the boundary list handed back to the
//! caller but retained in the assessment log, so the decision is always
//! auditable.

use crate::config::ExtractionThresholds;
use crate::types::{SectionBoundary, SectionType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Issues a section can be flagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    /// Content length below the type-specific floor.
    TooShort,
    /// Empty-line ratio above the threshold.
    MostlyEmpty,
    /// Keyword confidence below the floor.
    LowConfidence,
    /// No countable items. Always critical.
    NoItems,
}

impl QualityIssue {
    /// Critical issues veto display eligibility regardless of score.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(self, QualityIssue::NoItems)
    }
}

/// Quality verdict for one boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Assessed section type.
    pub section: SectionType,
    /// Boundary start line.
    pub start_line: usize,
    /// Boundary end line.
    pub end_line: usize,
    /// Combined quality score in [0, 1].
    pub quality_score: f64,
    /// Flagged issues.
    pub issues: Vec<QualityIssue>,
    /// Human-readable remediation hints.
    pub recommendations: Vec<String>,
    /// Final eligibility decision.
    pub display_eligible: bool,
    /// Non-whitespace character count.
    pub content_length: usize,
    /// Type-specific item count.
    pub items_count: usize,
    /// Keyword-density confidence in [0, 1].
    pub confidence_score: f64,
    /// Punctuation-run / repeated-symbol ratio in [0, 1].
    pub noise_ratio: f64,
    /// Ratio of empty lines.
    pub empty_lines_ratio: f64,
}

static NOISE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[[:punct:]]{3,}").unwrap());

/// A single repeated symbol dominating the line (e.g. "— — — — —").
fn has_repeated_symbol(line: &str) -> bool {
    let mut counts: std::collections::HashMap<char, usize> = std::collections::HashMap::new();
    let mut total = 0usize;
    for c in line.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if !c.is_alphanumeric() {
            *counts.entry(c).or_insert(0) += 1;
        }
    }
    total >= 5
        && counts
            .values()
            .any(|&n| n >= 5 && n * 2 >= total)
}

static EXPERIENCE_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:développeurs?|developers?|ingénieurs?|engineers?|consultants?|managers?|stages?|alternance|missions?|chez|at|company|société|entreprise)\b|\d{4}",
    )
    .unwrap()
});
static EDUCATION_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:université|university|école|school|master|licence|bachelor|diplôme|degree|formation|bts|doctorat|phd)\b|\d{4}",
    )
    .unwrap()
});
static SKILLS_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:compétences?|skills?|maîtrise|proficien(?:t|cy)|avancé|advanced|expert|notions)\b|,").unwrap()
});
static GENERIC_KW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}{4,}").unwrap());

/// Quality gate over refined boundaries.
#[derive(Debug, Clone)]
pub struct QualityGate {
    config: ExtractionThresholds,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl QualityGate {
    /// Create a gate with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Assess every boundary and split eligible from gated.
    ///
    /// Returns the eligible boundaries plus the full assessment log
    /// (including gated sections).
    #[must_use]
    pub fn assess_all(
        &self,
        boundaries: &[SectionBoundary],
        lines: &[String],
    ) -> (Vec<SectionBoundary>, Vec<QualityAssessment>) {
        let mut eligible = Vec::with_capacity(boundaries.len());
        let mut assessments = Vec::with_capacity(boundaries.len());

        for boundary in boundaries {
            let assessment = self.assess(boundary, lines);
            if assessment.display_eligible {
                eligible.push(boundary.clone());
            } else {
                log::info!(
                    "quality: gated {} [{}:{}] score={:.2} issues={:?}",
                    boundary.section,
                    boundary.start_line,
                    boundary.end_line,
                    assessment.quality_score,
                    assessment.issues
                );
            }
            assessments.push(assessment);
        }
        (eligible, assessments)
    }

    /// Assess one boundary.
    #[must_use]
    pub fn assess(&self, boundary: &SectionBoundary, lines: &[String]) -> QualityAssessment {
        let start = boundary.start_line.min(lines.len());
        let end = boundary.end_line.min(lines.len());
        let window = &lines[start..end];

        let content_length: usize = window
            .iter()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).count())
            .sum();
        let empty_lines_ratio = if window.is_empty() {
            1.0
        } else {
            window.iter().filter(|l| l.trim().is_empty()).count() as f64 / window.len() as f64
        };
        let items_count = count_items(boundary.section, window);
        let confidence_score = keyword_confidence(boundary.section, window);
        let noise_ratio = noise_ratio(window);

        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if content_length < min_length_for(boundary.section) {
            issues.push(QualityIssue::TooShort);
            recommendations.push("section content is unusually short".to_string());
        }
        if empty_lines_ratio > self.config.mostly_empty_ratio {
            issues.push(QualityIssue::MostlyEmpty);
            recommendations.push("section is mostly empty lines".to_string());
        }
        if confidence_score < self.config.low_confidence_floor {
            issues.push(QualityIssue::LowConfidence);
            recommendations.push("content does not read like this section type".to_string());
        }
        if items_count == 0 {
            issues.push(QualityIssue::NoItems);
            recommendations.push("no extractable items found".to_string());
        }

        let quality_score = combine_scores(
            content_length,
            empty_lines_ratio,
            items_count,
            confidence_score,
            noise_ratio,
        );

        let floor = if boundary.section.is_essential() {
            self.config.quality_floor_essential
        } else {
            self.config.quality_floor
        };
        let has_critical = issues.iter().any(QualityIssue::is_critical);
        let display_eligible = quality_score >= floor && !has_critical;

        QualityAssessment {
            section: boundary.section,
            start_line: boundary.start_line,
            end_line: boundary.end_line,
            quality_score,
            issues,
            recommendations,
            display_eligible,
            content_length,
            items_count,
            confidence_score,
            noise_ratio,
            empty_lines_ratio,
        }
    }
}

/// Weighted quality combination.
///
/// Weights are calibration points, not contract: length 0.25, items 0.20,
/// confidence 0.30, cleanliness 0.15, fill 0.10.
fn combine_scores(
    content_length: usize,
    empty_lines_ratio: f64,
    items_count: usize,
    confidence_score: f64,
    noise_ratio: f64,
) -> f64 {
    let length_score = (content_length as f64 / 200.0).min(1.0);
    let items_score = (items_count as f64 / 3.0).min(1.0);
    let score = 0.25 * length_score
        + 0.20 * items_score
        + 0.30 * confidence_score
        + 0.15 * (1.0 - noise_ratio)
        + 0.10 * (1.0 - empty_lines_ratio);
    score.clamp(0.0, 1.0)
}

fn min_length_for(section: SectionType) -> usize {
    match section {
        SectionType::Experiences | SectionType::Education => 30,
        SectionType::Skills | SectionType::Languages => 10,
        _ => 15,
    }
}

/// Type-specific item counting.
fn count_items(section: SectionType, window: &[String]) -> usize {
    match section {
        // Comma/bullet-separated lists.
        SectionType::Skills | SectionType::Languages | SectionType::Interests => {
            crate::phases::skills::extract_items(window).len()
        }
        // Blank-line-separated blocks.
        SectionType::Experiences | SectionType::Education | SectionType::Projects => {
            let mut blocks = 0usize;
            let mut in_block = false;
            for line in window {
                let blank = line.trim().is_empty();
                if !blank && !in_block {
                    blocks += 1;
                }
                in_block = !blank;
            }
            blocks
        }
        _ => window.iter().filter(|l| !l.trim().is_empty()).count(),
    }
}

fn keyword_confidence(section: SectionType, window: &[String]) -> f64 {
    let non_empty: Vec<&String> = window.iter().filter(|l| !l.trim().is_empty()).collect();
    if non_empty.is_empty() {
        return 0.0;
    }
    let pattern: &Regex = match section {
        SectionType::Experiences => &EXPERIENCE_KW,
        SectionType::Education => &EDUCATION_KW,
        SectionType::Skills | SectionType::Languages => &SKILLS_KW,
        _ => &GENERIC_KW,
    };
    let hits = non_empty.iter().filter(|l| pattern.is_match(l)).count();
    hits as f64 / non_empty.len() as f64
}

fn noise_ratio(window: &[String]) -> f64 {
    let non_empty: Vec<&String> = window.iter().filter(|l| !l.trim().is_empty()).collect();
    if non_empty.is_empty() {
        return 0.0;
    }
    let noisy = non_empty
        .iter()
        .filter(|l| NOISE_RUNS.is_match(l) || has_repeated_symbol(l))
        .count();
    noisy as f64 / non_empty.len() as f64
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quality_score_bounded(lines in proptest::collection::vec(".{0,60}", 0..20)) {
            let boundary = SectionBoundary::new(0, lines.len(), SectionType::Experiences);
            let a = QualityGate::default().assess(&boundary, &lines);
            prop_assert!((0.0..=1.0).contains(&a.quality_score));
            prop_assert!((0.0..=1.0).contains(&a.noise_ratio));
            prop_assert!((0.0..=1.0).contains(&a.confidence_score));
        }
    }
}
