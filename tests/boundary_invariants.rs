//! Property-based invariants over the whole pipeline.

use cvstruct::{SectionBoundary, SectionType, StructureExtractor};
use proptest::prelude::*;

fn arb_section() -> impl Strategy<Value = SectionType> {
    prop_oneof![
        Just(SectionType::Experiences),
        Just(SectionType::Education),
        Just(SectionType::Skills),
        Just(SectionType::Languages),
        Just(SectionType::Interests),
        Just(SectionType::Other),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Returned boundaries are always within the document and sorted, and
    /// same-type boundaries never overlap.
    #[test]
    fn extract_boundaries_are_valid(
        lines in proptest::collection::vec("[ -~éèàçêôûÉÈ]{0,60}", 0..40)
    ) {
        let result = StructureExtractor::default().extract(&lines, None);
        for boundary in &result.boundaries {
            prop_assert!(boundary.start_line <= boundary.end_line);
            prop_assert!(boundary.end_line <= lines.len());
        }
        for pair in result.boundaries.windows(2) {
            prop_assert!(pair[0].start_line <= pair[1].start_line);
            if pair[0].section == pair[1].section {
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
        }
        prop_assert_eq!(result.metrics.boundary_overlaps_after, 0);
    }

    /// Arbitrary seed boundaries refine into valid output without panics.
    #[test]
    fn refine_accepts_arbitrary_seeds(
        lines in proptest::collection::vec(".{0,50}", 0..30),
        seeds in proptest::collection::vec((0usize..40, 0usize..20, arb_section()), 0..8)
    ) {
        let boundaries: Vec<SectionBoundary> = seeds
            .into_iter()
            .map(|(start, len, section)| SectionBoundary::new(start, start + len, section))
            .collect();
        let result = StructureExtractor::default().refine(&boundaries, &lines, None);
        for boundary in &result.boundaries {
            prop_assert!(boundary.end_line <= lines.len());
        }
        prop_assert_eq!(result.metrics.boundary_overlaps_after, 0);
    }

    /// The pipeline is a pure function of its input.
    #[test]
    fn extraction_is_deterministic(
        lines in proptest::collection::vec("[ -~]{0,40}", 0..20)
    ) {
        let a = StructureExtractor::default().extract(&lines, None);
        let b = StructureExtractor::default().extract(&lines, None);
        prop_assert_eq!(a.boundaries, b.boundaries);
        prop_assert_eq!(a.date_annotations.len(), b.date_annotations.len());
    }
}
