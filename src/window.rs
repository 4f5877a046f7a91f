//! Header-aware section windowing with anti-contamination guards.
//!
//! Experience windows are the contamination-prone case: contact blocks
//! above them, skill/education lists below them, and sidebar fragments
//! between them all leak in when boundaries are taken at face value. Five
//! ordered guards shrink, reject, or split a candidate window before any
//! extension is attempted; extension then grows the window toward the next
//! header under the same guards. Non-experience sections pass through
//! unchanged.

use crate::config::ExtractionThresholds;
use crate::error::Outcome;
use crate::headers::{is_disallowed_in_experience, normalize_header, strip_header_decoration};
use crate::layout::caps_ratio;
use crate::types::{LayoutStructure, SectionType};
use once_cell::sync::Lazy;
use regex::Regex;

static EXP_SIGNALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:développeur|developer|ingénieur|engineer|consultant|manager|chef|lead|senior|junior)\b
        | \b(?:stage|stagiaire|alternance|apprenti|cdi|cdd|freelance)\b
        | \b(?:société|entreprise|company|corp|startup|cabinet|groupe)\b
        | \b(?:chez|at)\s+[A-ZÀ-Þ]
        | \d{4}\s*[-–—]\s*(?:\d{4}|present|présent|actuel|ongoing)",
    )
    .unwrap()
});

/// How a guard resolved a candidate window; logged for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardReport {
    /// Final window size in lines.
    pub size: usize,
    /// Non-empty-line ratio of the final window.
    pub density: f64,
    /// Foreign-header density of the final window.
    pub foreign_density: f64,
}

/// True when the line is formatted like a header (colon, caps, rule line).
#[must_use]
pub fn is_header_format(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.ends_with(':')
        || caps_ratio(trimmed) >= 0.9 && trimmed.chars().filter(|c| c.is_alphabetic()).count() >= 3
}

/// True for strong non-experience headers that extension must not cross.
#[must_use]
pub fn is_strong_foreign_header(line: &str) -> bool {
    if !is_header_format(line) {
        return false;
    }
    let content = strip_header_decoration(line.trim());
    is_disallowed_in_experience(&content)
}

/// Ratio of non-empty lines in `lines[start..end]`.
#[must_use]
pub fn window_density(lines: &[String], start: usize, end: usize) -> f64 {
    if start >= end || start >= lines.len() {
        return 0.0;
    }
    let end = end.min(lines.len());
    let window = &lines[start..end];
    window.iter().filter(|l| !l.trim().is_empty()).count() as f64 / window.len() as f64
}

/// Experience-signal density: role/company/employment-token/date hits per line.
#[must_use]
pub fn exp_signal_density(lines: &[String], start: usize, end: usize) -> f64 {
    if start >= end || start >= lines.len() {
        return 0.0;
    }
    let end = end.min(lines.len());
    let window = &lines[start..end];
    let hits = window.iter().filter(|l| EXP_SIGNALS.is_match(l)).count();
    hits as f64 / window.len() as f64
}

/// Foreign-header density: disallowed-header lines per non-empty line.
#[must_use]
pub fn foreign_header_density(lines: &[String], start: usize, end: usize) -> f64 {
    if start >= end || start >= lines.len() {
        return 0.0;
    }
    let end = end.min(lines.len());
    let mut foreign = 0usize;
    let mut non_empty = 0usize;
    for line in &lines[start..end] {
        if line.trim().is_empty() {
            continue;
        }
        non_empty += 1;
        if line_is_foreign_header(line) {
            foreign += 1;
        }
    }
    if non_empty == 0 {
        0.0
    } else {
        foreign as f64 / non_empty as f64
    }
}

fn line_is_foreign_header(line: &str) -> bool {
    is_header_format(line) && {
        let content = normalize_header(&strip_header_decoration(line.trim()));
        is_disallowed_in_experience(&content)
    }
}

/// Last foreign-header line in `[start, end)`, if the overall density
/// reaches the split threshold.
fn foreign_header_split_point(
    lines: &[String],
    start: usize,
    end: usize,
    threshold: f64,
) -> Option<usize> {
    let end = end.min(lines.len());
    if foreign_header_density(lines, start, end) < threshold {
        return None;
    }
    (start..end).rev().find(|&i| line_is_foreign_header(&lines[i]))
}

/// Header-aware window mapper.
#[derive(Debug, Clone)]
pub struct BoundaryMapper {
    config: ExtractionThresholds,
}

impl Default for BoundaryMapper {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl BoundaryMapper {
    /// Create a mapper with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Compute the guarded window for a `(start, end)` candidate.
    ///
    /// Experience sections run the full guard/extension sequence and may be
    /// rejected; other sections pass through as `Ok((start, end))`.
    pub fn window_for_section(
        &self,
        lines: &[String],
        start: usize,
        end: usize,
        section: SectionType,
        headers: &[(usize, SectionType)],
        layout: &LayoutStructure,
    ) -> Outcome<(usize, usize)> {
        if section != SectionType::Experiences {
            return Outcome::Ok((start, end.min(lines.len())));
        }

        let end = end.min(lines.len());

        // Guard 1: density.
        let density = window_density(lines, start, end);
        if density < self.config.density_min_experience {
            log::debug!(
                "window: density guard rejected [{start}:{end}] (density={density:.3})"
            );
            return Outcome::Rejected(format!(
                "density {density:.3} below {:.3}",
                self.config.density_min_experience
            ));
        }

        // Guard 2: disallowed header within 2 lines of the bounds.
        if self.has_conflicting_header(lines, start, end) {
            log::debug!("window: conflicting header near [{start}:{end}]");
            return Outcome::Rejected("conflicting section header near window bounds".into());
        }

        // Guard 3: foreign-header density split.
        if let Some(split) = foreign_header_split_point(
            lines,
            start,
            end,
            self.config.foreign_header_split_density,
        ) {
            let report = self.report(lines, start, split);
            log::info!(
                "window: foreign-header split at {split} (size={} foreign={:.3})",
                report.size,
                report.foreign_density
            );
            return Outcome::Degraded((start, split), "foreign header density split".into());
        }

        // Guard 4: extension toward the next header, capped.
        let next_header = headers
            .iter()
            .map(|&(idx, _)| idx)
            .filter(|&idx| idx >= end)
            .min()
            .unwrap_or(lines.len());
        let cap = (start + self.config.max_window_size).min(next_header).min(lines.len());

        let mut extended = end;
        let mut degraded: Option<String> = None;
        for i in end..cap {
            if is_strong_foreign_header(&lines[i]) {
                break;
            }
            if self.has_conflicting_header(lines, start, i + 1) {
                degraded = Some("extension stopped by conflicting header".into());
                break;
            }
            if let Some(split) = foreign_header_split_point(
                lines,
                start,
                i + 1,
                self.config.foreign_header_split_density,
            ) {
                extended = split;
                degraded = Some("extension stopped by foreign header density".into());
                break;
            }
            extended = i + 1;
        }

        // Guard 5: minimum-size backfill on strong experience signal.
        if extended - start < self.config.min_experience_window
            && exp_signal_density(lines, start, extended) >= self.config.exp_signal_density_min
        {
            let target = (start + self.config.min_experience_window).min(lines.len());
            for i in extended..target {
                if is_strong_foreign_header(&lines[i]) {
                    break;
                }
                extended = i + 1;
            }
        }

        // Date-first layouts keep their content below the dates; look
        // ahead, still stopping at strong foreign headers.
        if layout.date_position == crate::types::DatePosition::BeforeContent {
            let target = (extended + self.config.exp_lookahead).min(lines.len());
            for i in extended..target {
                if is_strong_foreign_header(&lines[i]) {
                    break;
                }
                extended = i + 1;
            }
        }

        let final_end = extended.max(start);
        let report = self.report(lines, start, final_end);
        log::info!(
            "window: experience [{start}:{final_end}] size={} density={:.2} foreign={:.3}",
            report.size,
            report.density,
            report.foreign_density
        );

        match degraded {
            Some(reason) => Outcome::Degraded((start, final_end), reason),
            None => Outcome::Ok((start, final_end)),
        }
    }

    // Disallowed headers just above the window or inside it contaminate the
    // span. A foreign header at or past `end` is the next section's own
    // header; the extension loop stops there instead of rejecting here.
    fn has_conflicting_header(&self, lines: &[String], start: usize, end: usize) -> bool {
        let scan_start = start.saturating_sub(2);
        let scan_end = end.min(lines.len());
        for line in &lines[scan_start..scan_end] {
            if line_is_foreign_header(line) {
                return true;
            }
        }
        false
    }

    fn report(&self, lines: &[String], start: usize, end: usize) -> GuardReport {
        GuardReport {
            size: end.saturating_sub(start),
            density: window_density(lines, start, end),
            foreign_density: foreign_header_density(lines, start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatePosition;

    fn doc(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn layout() -> LayoutStructure {
        LayoutStructure::default()
    }

    #[test]
    fn sparse_window_is_rejected() {
        // 1 non-empty line out of 8: density 0.125 < 0.18.
        let lines = doc(&["Développeur", "", "", "", "", "", "", ""]);
        let outcome = BoundaryMapper::default().window_for_section(
            &lines,
            0,
            8,
            SectionType::Experiences,
            &[],
            &layout(),
        );
        assert!(outcome.is_rejected());
    }

    #[test]
    fn conflicting_header_near_bounds_rejects() {
        let lines = doc(&[
            "FORMATION",
            "Développeur Senior - TechCorp",
            "2020-2023",
            "Missions clients",
        ]);
        // Window starts right after an education header: contaminated.
        let outcome = BoundaryMapper::default().window_for_section(
            &lines,
            1,
            4,
            SectionType::Experiences,
            &[],
            &layout(),
        );
        assert!(outcome.is_rejected());
    }

    #[test]
    fn dense_clean_window_extends_toward_next_header() {
        let lines = doc(&[
            "Développeur Senior - TechCorp",
            "2020-2023",
            "Missions de développement",
            "Encadrement technique",
            "Livraison continue",
            "Architecture des services",
        ]);
        let outcome = BoundaryMapper::default().window_for_section(
            &lines,
            0,
            2,
            SectionType::Experiences,
            &[],
            &layout(),
        );
        let (start, end) = outcome.value().unwrap();
        assert_eq!(start, 0);
        assert!(end >= 6, "backfill should reach the full block, got {end}");
    }

    #[test]
    fn extension_stops_at_strong_foreign_header() {
        let mut raw = vec![
            "Développeur Senior - TechCorp".to_string(),
            "2020-2023".to_string(),
            "Missions de développement".to_string(),
            "COMPÉTENCES:".to_string(),
        ];
        raw.extend((0..10).map(|i| format!("Compétence {i}")));
        let headers = vec![(3usize, SectionType::Skills)];
        let outcome = BoundaryMapper::default().window_for_section(
            &raw,
            0,
            3,
            SectionType::Experiences,
            &headers,
            &layout(),
        );
        let (_, end) = outcome.value().unwrap();
        assert!(end <= 3, "must not cross the skills header, got {end}");
    }

    #[test]
    fn non_experience_sections_pass_through() {
        let lines = doc(&["FORMATION", "Master", "Université"]);
        let outcome = BoundaryMapper::default().window_for_section(
            &lines,
            0,
            3,
            SectionType::Education,
            &[],
            &layout(),
        );
        assert_eq!(outcome, Outcome::Ok((0, 3)));
    }

    #[test]
    fn date_first_layout_gets_lookahead() {
        let mut raw: Vec<String> = vec![
            "2020 - 2023".to_string(),
            "Développeur senior chez TechCorp".to_string(),
        ];
        raw.extend((0..30).map(|i| format!("Ligne de description {i}")));
        let mut l = layout();
        l.date_position = DatePosition::BeforeContent;
        let outcome = BoundaryMapper::default().window_for_section(
            &raw,
            0,
            2,
            SectionType::Experiences,
            &[],
            &l,
        );
        let (_, end) = outcome.value().unwrap();
        assert!(end > 12, "lookahead should extend past the backfill, got {end}");
    }

    #[test]
    fn signal_density_sees_roles_and_dates() {
        let lines = doc(&[
            "Développeur Senior - TechCorp",
            "2020-2023",
            "texte neutre",
        ]);
        let density = exp_signal_density(&lines, 0, 3);
        assert!(density > 0.6, "got {density}");
    }
}
