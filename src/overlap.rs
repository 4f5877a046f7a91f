//! Boundary overlap resolution.
//!
//! Canonicalizes free-form section labels, merges adjacent same-type
//! sections separated by small gaps, then resolves remaining overlaps by
//! the fixed section-priority order. Overlapping spans are trimmed, never
//! duplicated: after resolution, no two boundaries of the same canonical
//! type overlap.

use crate::config::ExtractionThresholds;
use crate::types::{SectionBoundary, SectionType};

/// Count pairwise overlaps in a boundary list.
#[must_use]
pub fn count_overlaps(boundaries: &[SectionBoundary]) -> usize {
    let mut sorted: Vec<&SectionBoundary> = boundaries.iter().collect();
    sorted.sort_by_key(|b| (b.start_line, b.end_line));
    sorted
        .windows(2)
        .filter(|pair| pair[0].end_line > pair[1].start_line)
        .count()
}

/// Overlap resolver.
#[derive(Debug, Clone)]
pub struct OverlapResolver {
    config: ExtractionThresholds,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl OverlapResolver {
    /// Create a resolver with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Resolve a boundary list into a non-overlapping, sorted set.
    ///
    /// Returns the resolved boundaries plus `(overlaps_before,
    /// overlaps_after)` for the metrics collector.
    #[must_use]
    pub fn resolve(&self, boundaries: &[SectionBoundary]) -> (Vec<SectionBoundary>, (usize, usize)) {
        let mut work: Vec<SectionBoundary> = boundaries
            .iter()
            .filter(|b| !b.is_empty())
            .cloned()
            .collect();
        work.sort_by_key(|b| (b.start_line, b.end_line));

        let before = count_overlaps(&work);
        let merged = self.merge_adjacent(work);
        let resolved = resolve_overlaps(merged);
        let after = count_overlaps(&resolved);

        log::info!(
            "overlap: {} boundaries, overlaps {before}→{after}",
            resolved.len()
        );
        (resolved, (before, after))
    }

    /// Merge same-type sections separated by at most `merge_adjacent_gap`
    /// lines.
    fn merge_adjacent(&self, boundaries: Vec<SectionBoundary>) -> Vec<SectionBoundary> {
        let mut merged: Vec<SectionBoundary> = Vec::with_capacity(boundaries.len());
        for boundary in boundaries {
            match merged.last_mut() {
                Some(last)
                    if last.section == boundary.section
                        && boundary.start_line >= last.end_line
                        && boundary.start_line - last.end_line <= self.config.merge_adjacent_gap =>
                {
                    last.end_line = last.end_line.max(boundary.end_line);
                }
                _ => merged.push(boundary),
            }
        }
        merged
    }
}

/// Trim overlapping spans by priority; equal priority keeps the larger span.
fn resolve_overlaps(sorted: Vec<SectionBoundary>) -> Vec<SectionBoundary> {
    let mut out: Vec<SectionBoundary> = Vec::with_capacity(sorted.len());

    for boundary in sorted {
        let mut current = boundary;
        let mut keep = true;

        loop {
            let Some(prev) = out.last() else { break };
            if prev.end_line <= current.start_line {
                break;
            }
            // Overlap between prev and current.
            let prev_priority = (prev.section.priority(), prev.len());
            let curr_priority = (current.section.priority(), current.len());
            let prev_end = prev.end_line;
            let prev_start = prev.start_line;

            if prev_priority >= curr_priority {
                // Trim current's head to start after prev.
                if prev_end >= current.end_line {
                    keep = false;
                } else {
                    current = SectionBoundary::new(prev_end, current.end_line, current.section);
                }
                break;
            }
            // Current wins: trim prev's tail.
            let new_end = current.start_line;
            if new_end <= prev_start {
                out.pop();
                continue;
            }
            if let Some(last) = out.last_mut() {
                last.end_line = new_end;
            }
            break;
        }

        if keep {
            out.push(current);
        }
    }

    out.sort_by_key(|b| (b.start_line, b.end_line));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(start: usize, end: usize, section: SectionType) -> SectionBoundary {
        SectionBoundary::new(start, end, section)
    }

    #[test]
    fn disjoint_boundaries_are_untouched() {
        let boundaries = vec![
            b(0, 4, SectionType::Experiences),
            b(4, 8, SectionType::Education),
        ];
        let (resolved, (before, after)) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(resolved, boundaries);
        assert_eq!((before, after), (0, 0));
    }

    #[test]
    fn higher_priority_wins_overlap() {
        // Experience (9) overlaps Other (1): the other section is trimmed.
        let boundaries = vec![
            b(0, 6, SectionType::Experiences),
            b(4, 10, SectionType::Other),
        ];
        let (resolved, (before, after)) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(before, 1);
        assert_eq!(after, 0);
        assert_eq!(resolved[0], b(0, 6, SectionType::Experiences));
        assert_eq!(resolved[1], b(6, 10, SectionType::Other));
    }

    #[test]
    fn experience_outranks_education() {
        let boundaries = vec![
            b(0, 8, SectionType::Education),
            b(5, 12, SectionType::Experiences),
        ];
        let (resolved, _) = OverlapResolver::default().resolve(&boundaries);
        let edu = resolved
            .iter()
            .find(|x| x.section == SectionType::Education)
            .unwrap();
        let exp = resolved
            .iter()
            .find(|x| x.section == SectionType::Experiences)
            .unwrap();
        assert!(!edu.overlaps(exp));
        assert_eq!(exp.len(), 7, "winner keeps its full span");
    }

    #[test]
    fn contained_lower_priority_span_is_dropped() {
        let boundaries = vec![
            b(0, 10, SectionType::Experiences),
            b(2, 8, SectionType::Other),
        ];
        let (resolved, _) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].section, SectionType::Experiences);
    }

    #[test]
    fn adjacent_same_type_sections_merge() {
        let boundaries = vec![
            b(0, 4, SectionType::Experiences),
            b(6, 10, SectionType::Experiences),
        ];
        let (resolved, _) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(resolved, vec![b(0, 10, SectionType::Experiences)]);
    }

    #[test]
    fn distant_same_type_sections_stay_separate() {
        let boundaries = vec![
            b(0, 4, SectionType::Experiences),
            b(20, 24, SectionType::Experiences),
        ];
        let (resolved, _) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn empty_boundaries_are_dropped() {
        let boundaries = vec![
            b(3, 3, SectionType::Experiences),
            b(0, 4, SectionType::Education),
        ];
        let (resolved, _) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(resolved, vec![b(0, 4, SectionType::Education)]);
    }

    #[test]
    fn same_type_overlaps_never_survive() {
        let boundaries = vec![
            b(0, 6, SectionType::Skills),
            b(3, 9, SectionType::Skills),
            b(5, 14, SectionType::Skills),
        ];
        let (resolved, (_, after)) = OverlapResolver::default().resolve(&boundaries);
        assert_eq!(after, 0);
        for pair in resolved.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_section() -> impl Strategy<Value = SectionType> {
        prop_oneof![
            Just(SectionType::Experiences),
            Just(SectionType::Education),
            Just(SectionType::Skills),
            Just(SectionType::Other),
        ]
    }

    proptest! {
        #[test]
        fn resolution_leaves_no_overlaps(
            spans in proptest::collection::vec((0usize..60, 1usize..20, arb_section()), 0..12)
        ) {
            let boundaries: Vec<SectionBoundary> = spans
                .into_iter()
                .map(|(start, len, section)| SectionBoundary::new(start, start + len, section))
                .collect();
            let (resolved, (_, after)) = OverlapResolver::default().resolve(&boundaries);
            prop_assert_eq!(after, 0);
            for pair in resolved.windows(2) {
                prop_assert!(pair[0].end_line <= pair[1].start_line);
            }
        }
    }
}
