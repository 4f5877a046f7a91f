//! Phase 2: education/experience arbiter.
//!
//! Items filed under an education header are not always education:
//! internships, apprenticeships, and work-study entries ("alternance")
//! carry strong employment signal while sitting inside the FORMATION
//! block. Each blank-line-separated item inside an education boundary is
//! scored on both axes; items whose employment signal strictly dominates
//! move to `experiences`, unless education dominance is overwhelming;
//! the override protects internships described academically.

use crate::config::ExtractionThresholds;
use crate::types::{SectionBoundary, SectionType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EDUCATION_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:université|university|école|school|institut|institute|lycée|collège|college|iut|campus|faculté)\b
        | \b(?:master|licence|bachelor|doctorat|phd|mba|bts|dut|diplôme|diplome|degree|bac)\b
        | \b(?:formation|études|studies|academic|scolarité|cursus|mémoire|thèse|thesis)\b",
    )
    .unwrap()
});

static EMPLOYMENT_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:stage|stagiaire|alternance|alternant|apprentissage|apprenti|cdi|cdd|interim|freelance)\b
        | \b(?:mission|missions|client|clients|équipe|team|projet\s+pro|salaire|rémunération|salary)\b
        | \b(?:développeur|developer|ingénieur|engineer|consultant|manager|responsable)\b
        | \b(?:chez|at)\s+[A-ZÀ-Þ]",
    )
    .unwrap()
});

/// Scored education item and the arbiter's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationClassification {
    /// Item start line (inclusive).
    pub start_line: usize,
    /// Item end line (exclusive).
    pub end_line: usize,
    /// Education-axis score in [0, 1].
    pub education_score: f64,
    /// Employment-axis score in [0, 1].
    pub employment_score: f64,
    /// Count of distinct employment cue hits.
    pub employment_cues: usize,
    /// Arbiter decision.
    pub should_move_to_experience: bool,
}

/// Education/experience arbiter.
#[derive(Debug, Clone)]
pub struct EduExpArbiter {
    config: ExtractionThresholds,
}

impl Default for EduExpArbiter {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl EduExpArbiter {
    /// Create an arbiter with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Decide whether an already-scored item moves to experience.
    ///
    /// Employment must strictly dominate with enough distinct cues; the
    /// education-dominance override always wins.
    #[must_use]
    pub fn should_move(
        &self,
        education_score: f64,
        employment_score: f64,
        employment_cues: usize,
    ) -> bool {
        if education_score >= self.config.edu_override_threshold {
            return false;
        }
        employment_score > education_score
            && employment_cues >= self.config.exp_employment_signals_min
    }

    /// Score one item's lines on both axes.
    #[must_use]
    pub fn score_item(&self, item_lines: &[String]) -> (f64, f64, usize) {
        let text = item_lines.join(" ");
        let non_empty = item_lines.iter().filter(|l| !l.trim().is_empty()).count();
        if non_empty == 0 {
            return (0.0, 0.0, 0);
        }

        let edu_hits = EDUCATION_TOKENS.find_iter(&text).count();
        let emp_matches: std::collections::BTreeSet<String> = EMPLOYMENT_TOKENS
            .find_iter(&text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let emp_cues = emp_matches.len();

        // Keyword density, saturating at 3 hits per line.
        let cap = (non_empty * 3) as f64;
        let education_score = (edu_hits as f64 / cap).min(1.0);
        let employment_score = (emp_cues as f64 / cap).min(1.0);
        (education_score, employment_score, emp_cues)
    }

    /// Re-arbitrate every education boundary.
    ///
    /// Moved items become new `experiences` boundaries; each education
    /// boundary shrinks to its remaining items. Returns the updated
    /// boundary list plus the per-item classification log.
    #[must_use]
    pub fn arbitrate(
        &self,
        boundaries: &[SectionBoundary],
        lines: &[String],
    ) -> (Vec<SectionBoundary>, Vec<EducationClassification>) {
        let mut out = Vec::with_capacity(boundaries.len());
        let mut log = Vec::new();

        for boundary in boundaries {
            if boundary.section != SectionType::Education {
                out.push(boundary.clone());
                continue;
            }

            let items = split_items(lines, boundary.start_line, boundary.end_line);
            if items.is_empty() {
                out.push(boundary.clone());
                continue;
            }

            let mut kept: Vec<(usize, usize)> = Vec::new();
            let mut moved: Vec<(usize, usize)> = Vec::new();

            for (item_start, item_end) in items {
                let item_lines = &lines[item_start..item_end];
                let (education_score, employment_score, employment_cues) =
                    self.score_item(item_lines);
                let should_move_to_experience =
                    self.should_move(education_score, employment_score, employment_cues);

                log.push(EducationClassification {
                    start_line: item_start,
                    end_line: item_end,
                    education_score,
                    employment_score,
                    employment_cues,
                    should_move_to_experience,
                });

                if should_move_to_experience {
                    log::info!(
                        "edu_exp: routing [{item_start}:{item_end}] education→experiences \
                         (edu={education_score:.2} emp={employment_score:.2} cues={employment_cues})"
                    );
                    moved.push((item_start, item_end));
                } else {
                    kept.push((item_start, item_end));
                }
            }

            if moved.is_empty() {
                out.push(boundary.clone());
            } else {
                if let (Some(&(first_start, _)), Some(&(_, last_end))) =
                    (kept.first(), kept.last())
                {
                    // Keep the header line attached to the surviving span.
                    let start = boundary.start_line.min(first_start);
                    out.push(SectionBoundary::new(start, last_end, SectionType::Education));
                }
                for (start, end) in moved {
                    out.push(SectionBoundary::new(start, end, SectionType::Experiences));
                }
            }
        }

        out.sort_by_key(|b| (b.start_line, b.end_line));
        (out, log)
    }
}

/// Split a boundary's lines into blank-line-separated items.
///
/// The boundary's first line is skipped when it is a bare header (no
/// digits, short, header-cased); items are `(start, end)` line ranges.
fn split_items(lines: &[String], start: usize, end: usize) -> Vec<(usize, usize)> {
    let end = end.min(lines.len());
    if start >= end {
        return Vec::new();
    }

    let mut content_start = start;
    if let Some(first) = lines.get(start) {
        let trimmed = first.trim();
        let header_like = !trimmed.is_empty()
            && trimmed.chars().count() < 60
            && !trimmed.chars().any(|c| c.is_ascii_digit())
            && crate::layout::caps_ratio(trimmed) >= 0.6;
        if header_like {
            content_start = start + 1;
        }
    }

    let mut items = Vec::new();
    let mut item_start: Option<usize> = None;
    for i in content_start..end {
        let blank = lines[i].trim().is_empty();
        match (blank, item_start) {
            (false, None) => item_start = Some(i),
            (true, Some(s)) => {
                items.push((s, i));
                item_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = item_start {
        items.push((s, end));
    }
    items
}
