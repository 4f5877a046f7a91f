//! The document-level extraction pipeline.
//!
//! Control flow is a strict, one-directional pipeline:
//!
//! ```text
//! raw lines → layout analyzer → boundary mapper
//!           → phase 1 (clusters) → phase 2 (edu/exp) → phase 3 (entities)
//!           → phase 4 (skills)   → phase 5 (dates)   → phase 6 (quality)
//!           → overlap resolver   → phase 7 (metrics + CI gates)
//! ```
//!
//! The whole run is a pure function of `(lines, coordinates, config)`; the
//! oracle is required to be deterministic, and an oracle failure degrades
//! to the built-in [`HeuristicOracle`](crate::oracle::HeuristicOracle)
//! rather than aborting the run.

use crate::config::ExtractionThresholds;
use crate::error::Outcome;
use crate::layout::LayoutAnalyzer;
use crate::oracle::{ClassifierCache, HeuristicOracle, Oracle};
use std::sync::Arc;
use crate::overlap::OverlapResolver;
use crate::phases::cluster::{ClusterBuilder, ExperienceCluster};
use crate::phases::dates::{self, DateParseResult};
use crate::phases::edu_exp::{EduExpArbiter, EducationClassification};
use crate::phases::entities::{EntityDenoiser, EntityLabel, NerEntity, OrganizationCandidate};
use crate::phases::metrics::{evaluate_ci_gates, CiGateReport, ExtractionMetrics, MetricsCollector};
use crate::phases::quality::{QualityAssessment, QualityGate};
use crate::phases::skills::{self, SkillInterestClassification};
use crate::types::{LayoutStructure, LineCoordinate, SectionBoundary, SectionType};
use crate::window::BoundaryMapper;

/// Everything a document run produces.
#[derive(Debug)]
pub struct ExtractionResult {
    /// Final, non-overlapping, quality-gated boundaries.
    pub boundaries: Vec<SectionBoundary>,
    /// Quality assessments for every boundary, gated ones included.
    pub assessments: Vec<QualityAssessment>,
    /// `(line, parse)` annotations for date-bearing lines.
    pub date_annotations: Vec<(usize, DateParseResult)>,
    /// Oracle entities annotated by the de-noiser.
    pub entities: Vec<NerEntity>,
    /// Validated organization candidates.
    pub organizations: Vec<OrganizationCandidate>,
    /// Skill/interest classifications from mixed lists.
    pub skill_classifications: Vec<SkillInterestClassification>,
    /// Phase-2 per-item decisions.
    pub education_log: Vec<EducationClassification>,
    /// Phase-1 clusters.
    pub clusters: Vec<ExperienceCluster>,
    /// Layout structure inferred for the document.
    pub layout: LayoutStructure,
    /// Metrics snapshot.
    pub metrics: ExtractionMetrics,
    /// CI gate verdicts over the snapshot.
    pub gates: CiGateReport,
    /// Name of the oracle that actually served the run; degraded when the
    /// configured oracle failed and the mock substituted.
    pub oracle_used: Outcome<String>,
}

/// Document-structure extractor.
///
/// Owns the configured thresholds and an oracle; both default to the
/// offline deterministic setup.
pub struct StructureExtractor {
    config: ExtractionThresholds,
    oracle: Box<dyn Oracle>,
    cache: Option<Arc<ClassifierCache>>,
}

impl Default for StructureExtractor {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl StructureExtractor {
    /// Create an extractor with the given thresholds and the mock oracle.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self {
            config,
            oracle: Box::new(HeuristicOracle::new()),
            cache: None,
        }
    }

    /// Replace the oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn Oracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Route oracle classifications through a caller-owned cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ClassifierCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run the full pipeline, deriving seed boundaries from detected
    /// headers.
    #[must_use]
    pub fn extract(&self, lines: &[String], coordinates: Option<&[LineCoordinate]>) -> ExtractionResult {
        let (lines, coordinates) = self.prepare(lines, coordinates);
        let layout = LayoutAnalyzer::new(self.config.clone()).analyze(&lines, coordinates.as_deref());
        let seeds = seed_boundaries(&layout, lines.len());
        self.run(&lines, layout, seeds)
    }

    /// Run the refinement phases over caller-provided seed boundaries.
    ///
    /// Useful when an upstream segmenter already produced candidate
    /// windows; the same guards and phases apply.
    #[must_use]
    pub fn refine(
        &self,
        boundaries: &[SectionBoundary],
        lines: &[String],
        coordinates: Option<&[LineCoordinate]>,
    ) -> ExtractionResult {
        let (lines, coordinates) = self.prepare(lines, coordinates);
        let layout = LayoutAnalyzer::new(self.config.clone()).analyze(&lines, coordinates.as_deref());
        let seeds: Vec<SectionBoundary> =
            boundaries.iter().map(|b| b.clamped(lines.len())).collect();
        self.run(&lines, layout, seeds)
    }

    /// Truncate over-long documents and drop mismatched coordinates.
    fn prepare(
        &self,
        lines: &[String],
        coordinates: Option<&[LineCoordinate]>,
    ) -> (Vec<String>, Option<Vec<LineCoordinate>>) {
        let cap = self.config.max_document_lines;
        let truncated: Vec<String> = lines.iter().take(cap).cloned().collect();
        if lines.len() > cap {
            log::warn!(
                "pipeline: document truncated from {} to {cap} lines",
                lines.len()
            );
        }
        let coords = match coordinates {
            Some(c) if c.len() == lines.len() => Some(c.iter().take(cap).copied().collect()),
            Some(_) => {
                log::warn!("pipeline: coordinate count mismatch, ignoring coordinates");
                None
            }
            None => None,
        };
        (truncated, coords)
    }

    fn run(
        &self,
        lines: &[String],
        layout: LayoutStructure,
        seeds: Vec<SectionBoundary>,
    ) -> ExtractionResult {
        let mut collector = MetricsCollector::new();
        collector.sections_processed(seeds.len());
        collector.memory_estimate(lines.iter().map(|l| l.len() as u64).sum());

        // Unlabeled regions get one shot at an oracle classification.
        let seeds: Vec<SectionBoundary> = seeds
            .into_iter()
            .map(|boundary| {
                if !matches!(
                    boundary.section,
                    SectionType::Other | SectionType::Unknown
                ) {
                    return boundary;
                }
                let window =
                    &lines[boundary.start_line.min(lines.len())..boundary.end_line.min(lines.len())];
                match self.classify_section(window) {
                    Some((section, score)) => {
                        log::info!(
                            "pipeline: oracle classified [{}:{}] as {section} ({score:.2})",
                            boundary.start_line,
                            boundary.end_line
                        );
                        SectionBoundary::new(boundary.start_line, boundary.end_line, section)
                    }
                    None => boundary,
                }
            })
            .collect();

        // Boundary mapper: guards + quarantine, experience sections only.
        let mapper = BoundaryMapper::new(self.config.clone());
        let headers: Vec<(usize, SectionType)> = layout
            .header_spans
            .iter()
            .filter(|h| h.section != SectionType::Unknown)
            .map(|h| (h.start_line, h.section))
            .collect();

        let mut windowed: Vec<SectionBoundary> = Vec::with_capacity(seeds.len());
        for boundary in &seeds {
            let quarantined = self.apply_quarantine(boundary, &layout);
            let Some(boundary) = quarantined else {
                collector.warn(format!(
                    "experience window [{}:{}] dropped by contact quarantine",
                    boundary.start_line, boundary.end_line
                ));
                continue;
            };
            match mapper.window_for_section(
                lines,
                boundary.start_line,
                boundary.end_line,
                boundary.section,
                &headers,
                &layout,
            ) {
                Outcome::Ok((start, end)) => {
                    windowed.push(SectionBoundary::new(start, end, boundary.section));
                }
                Outcome::Degraded((start, end), reason) => {
                    collector.warn(format!("window degraded: {reason}"));
                    windowed.push(SectionBoundary::new(start, end, boundary.section));
                }
                Outcome::Rejected(reason) => {
                    collector.warn(format!(
                        "window [{}:{}] rejected: {reason}",
                        boundary.start_line, boundary.end_line
                    ));
                }
            }
        }

        // Phase 1: cluster experience blocks.
        let (clustered, clusters) = ClusterBuilder::new(self.config.clone()).build(&windowed, lines, &layout);
        collector.clusters_built(clusters.len());

        // Phase 2: education/experience arbitration.
        let (arbitrated, education_log) =
            EduExpArbiter::new(self.config.clone()).arbitrate(&clustered, lines);
        let moved = education_log
            .iter()
            .filter(|c| c.should_move_to_experience)
            .count();
        collector.routed(SectionType::Education, SectionType::Experiences, moved);

        // Phase 3: oracle NER + de-noising. Oracle failure degrades to the
        // deterministic mock; logged once per run.
        let (raw_spans, oracle_used) = match self.oracle.tag_entities(lines) {
            Ok(spans) => (spans, Outcome::Ok(self.oracle.name().to_string())),
            Err(e) => {
                log::warn!("pipeline: oracle '{}' failed ({e}); using mock", self.oracle.name());
                collector.warn(format!("oracle failure: {e}"));
                let mock = HeuristicOracle::new();
                let spans = mock.tag_entities(lines).unwrap_or_default();
                (
                    spans,
                    Outcome::Degraded("heuristic-mock".to_string(), e.to_string()),
                )
            }
        };
        let denoiser = EntityDenoiser::new(self.config.clone());
        let raw_entities: Vec<NerEntity> = raw_spans
            .iter()
            .flatten()
            .map(|span| NerEntity {
                text: span.word.clone(),
                label: span.label,
                start: span.start,
                end: span.end,
                confidence: span.score,
                is_noise: false,
                context_score: 0.0,
            })
            .collect();
        let entities = denoiser.filter_ner_noise(raw_entities, lines);
        let clean = entities.iter().filter(|e| !e.is_noise).count();
        collector.entities(clean, entities.len() - clean);

        let org_names: Vec<String> = entities
            .iter()
            .filter(|e| !e.is_noise && e.label == EntityLabel::Org)
            .map(|e| e.text.clone())
            .collect();
        let organizations = denoiser.validate_organizations(&org_names, lines);

        // Phase 4: skill/interest separation over list-shaped sections.
        let mut skill_classifications = Vec::new();
        for boundary in &arbitrated {
            if !matches!(
                boundary.section,
                SectionType::Skills | SectionType::Interests
            ) {
                continue;
            }
            let window =
                &lines[boundary.start_line.min(lines.len())..boundary.end_line.min(lines.len())];
            let items = skills::extract_items(window);
            for item in &items {
                skill_classifications
                    .push(skills::classify_skill_or_interest(item, Some(window)));
            }
        }

        // Phase 5: date annotation.
        let date_annotations = dates::annotate_dates(&arbitrated, lines);
        for (_, parse) in &date_annotations {
            collector.date_parse(!parse.validation_errors.is_empty());
        }

        // Phase 6: quality gate.
        let (eligible, assessments) = QualityGate::new(self.config.clone()).assess_all(&arbitrated, lines);
        for assessment in &assessments {
            collector.quality(
                assessment.quality_score,
                assessment.confidence_score,
                !assessment.display_eligible,
            );
        }

        // Overlap resolution.
        let (boundaries, (before, after)) = OverlapResolver::new(self.config.clone()).resolve(&eligible);
        collector.overlaps(before, after);

        // Phase 7: metrics snapshot + CI gates.
        let metrics = collector.finish(boundaries.len());
        let gates = evaluate_ci_gates(&metrics, &self.config);

        ExtractionResult {
            boundaries,
            assessments,
            date_annotations,
            entities,
            organizations,
            skill_classifications,
            education_log,
            clusters,
            layout,
            metrics,
            gates,
            oracle_used,
        }
    }

    /// Classify an unlabeled window through the oracle (cached when a
    /// cache was injected). Returns the winning known label when its mean
    /// score clears 0.5; oracle failure falls back to the mock.
    fn classify_section(&self, window: &[String]) -> Option<(SectionType, f64)> {
        let sample: Vec<String> = window
            .iter()
            .filter(|l| !l.trim().is_empty())
            .take(5)
            .cloned()
            .collect();
        if sample.is_empty() {
            return None;
        }

        let predictions = match &self.cache {
            Some(cache) => cache.classify_cached(self.oracle.as_ref(), &sample),
            None => self.oracle.classify_lines(&sample),
        };
        let predictions = match predictions {
            Ok(p) => p,
            Err(e) => {
                log::warn!("pipeline: classify fallback to mock ({e})");
                HeuristicOracle::new().classify_lines(&sample).ok()?
            }
        };

        let mut totals: std::collections::HashMap<SectionType, f64> =
            std::collections::HashMap::new();
        for prediction in &predictions {
            *totals.entry(prediction.label).or_insert(0.0) += prediction.score;
        }
        let (section, total) = totals
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))?;
        let mean = total / predictions.len() as f64;
        if matches!(section, SectionType::Other | SectionType::Unknown) || mean < 0.5 {
            return None;
        }
        Some((section, mean))
    }

    /// Keep experience windows out of contact quarantine zones.
    fn apply_quarantine(
        &self,
        boundary: &SectionBoundary,
        layout: &LayoutStructure,
    ) -> Option<SectionBoundary> {
        if boundary.section != SectionType::Experiences
            || layout.contact_quarantine_zones.is_empty()
        {
            return Some(boundary.clone());
        }
        let mut start = boundary.start_line;
        for &(zone_start, zone_end) in &layout.contact_quarantine_zones {
            if start >= zone_start && start <= zone_end {
                start = zone_end + 1;
            }
        }
        if start >= boundary.end_line {
            return None;
        }
        Some(SectionBoundary::new(start, boundary.end_line, boundary.section))
    }
}

/// Derive seed boundaries from detected headers: each classified header
/// opens a section that runs to the next header (or end of document).
fn seed_boundaries(layout: &LayoutStructure, len: usize) -> Vec<SectionBoundary> {
    let mut classified: Vec<(usize, SectionType)> = layout
        .header_spans
        .iter()
        .filter(|h| h.section != SectionType::Unknown)
        .map(|h| (h.start_line, h.section))
        .collect();
    classified.sort_unstable_by_key(|&(line, _)| line);
    classified.dedup_by_key(|&mut (line, _)| line);

    if classified.is_empty() {
        if len == 0 {
            return Vec::new();
        }
        return vec![SectionBoundary::new(0, len, SectionType::Other)];
    }

    let mut seeds = Vec::with_capacity(classified.len());
    for (i, &(start, section)) in classified.iter().enumerate() {
        let end = classified
            .get(i + 1)
            .map_or(len, |&(next_start, _)| next_start);
        seeds.push(SectionBoundary::new(start, end, section));
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seeds_follow_headers() {
        let lines = doc(&[
            "EXPÉRIENCES",
            "Développeur - TechCorp",
            "2020-2023",
            "FORMATION",
            "Master Informatique",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        let seeds = seed_boundaries(&layout, lines.len());
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0], SectionBoundary::new(0, 3, SectionType::Experiences));
        assert_eq!(seeds[1], SectionBoundary::new(3, 5, SectionType::Education));
    }

    #[test]
    fn headerless_document_seeds_other() {
        let lines = doc(&["du texte", "encore du texte"]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        let seeds = seed_boundaries(&layout, lines.len());
        assert_eq!(seeds, vec![SectionBoundary::new(0, 2, SectionType::Other)]);
    }

    #[test]
    fn empty_document_is_graceful() {
        let result = StructureExtractor::default().extract(&[], None);
        assert!(result.boundaries.is_empty());
        assert!(result.assessments.is_empty());
        assert!((result.metrics.parsing_success_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn truncation_never_rejects() {
        let mut config = ExtractionThresholds::default();
        config.max_document_lines = 5;
        let lines: Vec<String> = (0..50).map(|i| format!("ligne {i}")).collect();
        let result = StructureExtractor::new(config).extract(&lines, None);
        for boundary in &result.boundaries {
            assert!(boundary.end_line <= 5);
        }
    }

    #[test]
    fn quarantined_experience_start_is_pushed_past_zone() {
        let extractor = StructureExtractor::default();
        let layout = LayoutStructure {
            contact_quarantine_zones: vec![(0, 5)],
            ..LayoutStructure::default()
        };
        let boundary = SectionBoundary::new(2, 12, SectionType::Experiences);
        let adjusted = extractor.apply_quarantine(&boundary, &layout).unwrap();
        assert_eq!(adjusted.start_line, 6);

        let swallowed = SectionBoundary::new(2, 5, SectionType::Experiences);
        assert!(extractor.apply_quarantine(&swallowed, &layout).is_none());
    }

    #[test]
    fn unlabeled_sections_get_oracle_classification() {
        let lines = doc(&["Développeur senior 2020-2023", "Consultant 2018-2020"]);
        let result = StructureExtractor::default().extract(&lines, None);
        assert!(
            result
                .boundaries
                .iter()
                .any(|b| b.section == SectionType::Experiences),
            "boundaries: {:?}",
            result.boundaries
        );
    }

    #[test]
    fn injected_cache_is_populated() {
        let cache = Arc::new(ClassifierCache::default());
        let extractor = StructureExtractor::default().with_cache(Arc::clone(&cache));
        let lines = doc(&["Développeur senior 2020-2023", "Consultant 2018-2020"]);
        let first = extractor.extract(&lines, None);
        let second = extractor.extract(&lines, None);
        assert_eq!(first.boundaries, second.boundaries);
        assert!(!cache.is_empty());
    }

    #[test]
    fn oracle_failure_degrades_to_mock() {
        struct FailingOracle;
        impl Oracle for FailingOracle {
            fn classify_lines(
                &self,
                _lines: &[String],
            ) -> crate::error::Result<Vec<crate::oracle::SectionPrediction>> {
                Err(crate::error::Error::oracle("backend offline"))
            }
            fn tag_entities(
                &self,
                _lines: &[String],
            ) -> crate::error::Result<Vec<Vec<crate::oracle::TaggedSpan>>> {
                Err(crate::error::Error::oracle("backend offline"))
            }
            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let lines = doc(&["EXPÉRIENCES", "Développeur chez TechCorp", "2020-2023"]);
        let result = StructureExtractor::default()
            .with_oracle(Box::new(FailingOracle))
            .extract(&lines, None);
        assert!(result.oracle_used.is_degraded());
        assert!(!result.boundaries.is_empty());
    }

    #[test]
    fn pipeline_is_deterministic() {
        let lines = doc(&[
            "EXPÉRIENCES",
            "Développeur Senior chez TechCorp",
            "2020 - présent",
            "",
            "FORMATION",
            "Master Informatique, Université de Lyon",
            "2018-2020",
        ]);
        let a = StructureExtractor::default().extract(&lines, None);
        let b = StructureExtractor::default().extract(&lines, None);
        assert_eq!(a.boundaries, b.boundaries);
        assert_eq!(a.date_annotations, b.date_annotations);
        assert_eq!(a.entities, b.entities);
    }
}
