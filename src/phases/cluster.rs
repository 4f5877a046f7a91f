//! Phase 1: experience cluster builder.
//!
//! One logical CV entry is frequently split across physically separate
//! blocks: a date line in a sidebar, the role/company pair in the main
//! column, a description paragraph further down. This phase groups
//! experience boundaries that belong to one entry, merging them when they
//! sit close enough together with no disallowed header in between, and
//! binds dates to role/company pairs only when a composite association
//! score clears the threshold.

use crate::config::ExtractionThresholds;
use crate::phases::dates;
use crate::types::{LayoutStructure, SectionBoundary, SectionType};
use crate::window::is_strong_foreign_header;
use once_cell::sync::Lazy;
use regex::Regex;

static ORG_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \b(?i:inc|corp|ltd|llc|gmbh|sarl|sas|spa|plc|bv)\.?\b
        | \b(?i:société|entreprise|company|startup|cabinet|groupe|group)\b
        | \b(?i:chez|at)\s+[A-ZÀ-Þ][\w&-]+",
    )
    .unwrap()
});

static ROLE_CUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:senior|junior|lead|principal|chef|head)\b
        | \b(?:développeur|developer|ingénieur|engineer|consultant|manager|analyste|analyst|architecte|architect|designer|directeur|director|responsable)\b",
    )
    .unwrap()
});

static EMPLOYMENT_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:stage|stagiaire|alternance|apprentissage|apprenti|cdi|cdd|mission|missions|freelance|interim|contrat)\b",
    )
    .unwrap()
});

/// Per-line extraction signals inside an experience region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineSignals {
    /// Line carries a date or date range.
    pub has_date: bool,
    /// Line carries an organization cue.
    pub has_org: bool,
    /// Line carries a role/title cue.
    pub has_role: bool,
    /// Line carries an employment keyword.
    pub has_employment_kw: bool,
}

/// Scan a line for clustering signals.
#[must_use]
pub fn line_signals(line: &str) -> LineSignals {
    LineSignals {
        has_date: dates::parse_enhanced_date(line).confidence > 0.0,
        has_org: ORG_CUES.is_match(line),
        has_role: ROLE_CUES.is_match(line),
        has_employment_kw: EMPLOYMENT_KW.is_match(line),
    }
}

/// Composite association score binding a date to a role/company pair.
///
/// `0.30·has_org + 0.35·has_role + 0.20·employment_kw + 0.15·header_distance`
/// where `header_distance` is 1.0 when no disallowed header separates the
/// signals and decays with the line gap otherwise.
#[must_use]
pub fn association_score(signals: &LineSignals, header_distance: f64) -> f64 {
    let mut score = 0.0;
    if signals.has_org {
        score += 0.30;
    }
    if signals.has_role {
        score += 0.35;
    }
    if signals.has_employment_kw {
        score += 0.20;
    }
    score + 0.15 * header_distance.clamp(0.0, 1.0)
}

/// A group of boundaries representing one logical experience entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceCluster {
    /// Merged line span.
    pub boundary: SectionBoundary,
    /// Number of physical blocks merged into this cluster.
    pub merged_blocks: usize,
    /// Whether a date was bound to a role/company pair inside the cluster.
    pub date_associated: bool,
}

/// Cluster builder for experience boundaries.
#[derive(Debug, Clone)]
pub struct ClusterBuilder {
    config: ExtractionThresholds,
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl ClusterBuilder {
    /// Create a builder with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Merge experience boundaries into logical clusters.
    ///
    /// Non-experience boundaries pass through untouched, in order. In
    /// multi-column layouts, merges are forbidden unless
    /// `max_cross_column_distance` is positive, and then only within that
    /// line distance.
    #[must_use]
    pub fn build(
        &self,
        boundaries: &[SectionBoundary],
        lines: &[String],
        layout: &LayoutStructure,
    ) -> (Vec<SectionBoundary>, Vec<ExperienceCluster>) {
        let mut out: Vec<SectionBoundary> = Vec::with_capacity(boundaries.len());
        let mut clusters = Vec::new();

        let mut sorted: Vec<&SectionBoundary> = boundaries.iter().collect();
        sorted.sort_by_key(|b| (b.start_line, b.end_line));

        let mut pending: Option<(SectionBoundary, usize)> = None;
        for boundary in sorted {
            if boundary.section != SectionType::Experiences {
                out.push(boundary.clone());
                continue;
            }

            match pending.take() {
                None => pending = Some((boundary.clone(), 1)),
                Some((current, blocks)) => {
                    if self.should_merge(&current, boundary, lines, layout) {
                        let merged = SectionBoundary::new(
                            current.start_line,
                            boundary.end_line.max(current.end_line),
                            SectionType::Experiences,
                        );
                        log::debug!(
                            "cluster: merged [{}:{}] + [{}:{}]",
                            current.start_line,
                            current.end_line,
                            boundary.start_line,
                            boundary.end_line
                        );
                        pending = Some((merged, blocks + 1));
                    } else {
                        clusters.push(self.finish(current, blocks, lines));
                        pending = Some((boundary.clone(), 1));
                    }
                }
            }
        }
        if let Some((current, blocks)) = pending {
            clusters.push(self.finish(current, blocks, lines));
        }

        out.extend(clusters.iter().map(|c| c.boundary.clone()));
        out.sort_by_key(|b| (b.start_line, b.end_line));
        (out, clusters)
    }

    fn should_merge(
        &self,
        current: &SectionBoundary,
        next: &SectionBoundary,
        lines: &[String],
        layout: &LayoutStructure,
    ) -> bool {
        if next.start_line < current.end_line {
            return true; // overlapping blocks always belong together
        }
        let gap = next.start_line - current.end_line;
        if gap < self.config.window_base || gap > self.config.window_max {
            return false;
        }
        // Separate blocks in a multi-column layout sit in different
        // columns until proven otherwise.
        if layout.columns > 1 {
            let max = self.config.max_cross_column_distance;
            if max == 0 || gap > max {
                return false;
            }
        }
        // No disallowed header may separate the blocks.
        let between = &lines[current.end_line.min(lines.len())..next.start_line.min(lines.len())];
        !between.iter().any(|l| is_strong_foreign_header(l))
    }

    fn finish(
        &self,
        boundary: SectionBoundary,
        merged_blocks: usize,
        lines: &[String],
    ) -> ExperienceCluster {
        let date_associated = self.associate_dates(&boundary, lines);
        ExperienceCluster {
            boundary,
            merged_blocks,
            date_associated,
        }
    }

    /// True when some date line in the cluster binds to a role/company pair
    /// with an association score at or above the threshold.
    fn associate_dates(&self, boundary: &SectionBoundary, lines: &[String]) -> bool {
        let start = boundary.start_line.min(lines.len());
        let end = boundary.end_line.min(lines.len());
        let window = &lines[start..end];

        let signals: Vec<LineSignals> = window.iter().map(|l| line_signals(l)).collect();
        let date_lines: Vec<usize> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.has_date)
            .map(|(i, _)| i)
            .collect();

        for date_idx in date_lines {
            // Search role/company context within the association window.
            let lo = date_idx.saturating_sub(self.config.window_max);
            let hi = (date_idx + self.config.window_max + 1).min(window.len());
            let mut combined = LineSignals {
                has_date: true,
                ..LineSignals::default()
            };
            let mut nearest: Option<usize> = None;
            for (offset, sig) in signals[lo..hi].iter().enumerate() {
                let i = lo + offset;
                if i == date_idx {
                    continue;
                }
                if sig.has_org || sig.has_role || sig.has_employment_kw {
                    combined.has_org |= sig.has_org;
                    combined.has_role |= sig.has_role;
                    combined.has_employment_kw |= sig.has_employment_kw;
                    let dist = date_idx.abs_diff(i);
                    nearest = Some(nearest.map_or(dist, |d: usize| d.min(dist)));
                }
            }
            // Same-line signals count too.
            let own = &signals[date_idx];
            combined.has_org |= own.has_org;
            combined.has_role |= own.has_role;
            combined.has_employment_kw |= own.has_employment_kw;
            if own.has_org || own.has_role || own.has_employment_kw {
                nearest = Some(0);
            }

            let header_distance = match nearest {
                None => 0.0,
                Some(d) => 1.0 - (d as f64 / self.config.window_max.max(1) as f64),
            };
            let score = association_score(&combined, header_distance);
            if score >= self.config.date_assoc_min_score {
                return true;
            }
        }
        false
    }
}
