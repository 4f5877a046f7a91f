//! Phase 7: metrics collection and CI gate evaluation.
//!
//! A collector accumulates per-phase counters across a document run into
//! one [`ExtractionMetrics`] snapshot; a fixed gate table evaluates
//! pass/fail booleans over the snapshot. Gate evaluation is a reporting
//! and CI signal only; it never blocks extraction.

use crate::config::ExtractionThresholds;
use crate::types::SectionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Aggregate counters for one document run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetrics {
    /// Wall-clock processing time, seconds.
    pub processing_time_secs: f64,
    /// Estimated peak working-set attributable to the document, bytes.
    pub memory_usage_bytes: u64,
    /// Boundaries entering the refinement phases.
    pub sections_processed: usize,
    /// Boundaries surviving to the final output.
    pub sections_extracted: usize,
    /// Boundaries removed by the quality gate.
    pub sections_gated: usize,
    /// Mean quality score over assessed sections.
    pub average_quality_score: f64,
    /// Mean confidence score over assessed sections.
    pub average_confidence_score: f64,
    /// Date expressions parsed successfully.
    pub date_parsing_success: usize,
    /// Date expressions with validation findings.
    pub date_parsing_errors: usize,
    /// Total parse attempts (dates and otherwise).
    pub parsing_attempts: usize,
    /// Parse attempts with findings.
    pub parsing_errors: usize,
    /// `successes / attempts`, 1.0 when nothing was attempted.
    pub parsing_success_rate: f64,
    /// Experience clusters built in phase 1.
    pub clusters_built: usize,
    /// Items re-routed between sections in phase 2, keyed "from→to".
    pub routed_items: BTreeMap<String, usize>,
    /// NER entities marked as noise in phase 3.
    pub entities_noise: usize,
    /// NER entities surviving phase 3.
    pub entities_clean: usize,
    /// Boundary overlaps before the resolver ran.
    pub boundary_overlaps_before: usize,
    /// Boundary overlaps after the resolver ran. Target: 0.
    pub boundary_overlaps_after: usize,
    /// Non-fatal warnings accumulated across phases.
    pub warnings: Vec<String>,
    /// Run start, seconds since the Unix epoch.
    pub started_at_epoch_secs: u64,
    /// Run end, seconds since the Unix epoch.
    pub finished_at_epoch_secs: u64,
}

impl ExtractionMetrics {
    /// Serialize the snapshot to a nested JSON value.
    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// One evaluated CI gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    /// Gate name.
    pub name: &'static str,
    /// Pass/fail verdict.
    pub passed: bool,
    /// Observed value.
    pub actual: f64,
    /// Threshold the gate compares against.
    pub threshold: f64,
}

/// Results of evaluating the fixed gate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiGateReport {
    /// Individual gate verdicts.
    pub gates: Vec<GateResult>,
}

impl CiGateReport {
    /// True when every gate passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.gates.iter().all(|g| g.passed)
    }

    /// Names of failed gates.
    #[must_use]
    pub fn failures(&self) -> Vec<&'static str> {
        self.gates
            .iter()
            .filter(|g| !g.passed)
            .map(|g| g.name)
            .collect()
    }
}

/// Evaluate the fixed CI gate table over a metrics snapshot.
///
/// Each gate is monotonic in its input: moving the observed value further
/// past the threshold can only keep the gate failed, never flip it back.
#[must_use]
pub fn evaluate_ci_gates(metrics: &ExtractionMetrics, config: &ExtractionThresholds) -> CiGateReport {
    let gated_ratio = if metrics.sections_processed == 0 {
        0.0
    } else {
        metrics.sections_gated as f64 / metrics.sections_processed as f64
    };

    let gates = vec![
        GateResult {
            name: "processing_time",
            passed: metrics.processing_time_secs < config.gate_processing_time_secs,
            actual: metrics.processing_time_secs,
            threshold: config.gate_processing_time_secs,
        },
        GateResult {
            name: "memory_usage",
            passed: metrics.memory_usage_bytes < config.gate_memory_bytes,
            actual: metrics.memory_usage_bytes as f64,
            threshold: config.gate_memory_bytes as f64,
        },
        GateResult {
            name: "average_quality",
            passed: metrics.average_quality_score >= config.gate_avg_quality_min,
            actual: metrics.average_quality_score,
            threshold: config.gate_avg_quality_min,
        },
        GateResult {
            name: "average_confidence",
            passed: metrics.average_confidence_score >= config.gate_avg_confidence_min,
            actual: metrics.average_confidence_score,
            threshold: config.gate_avg_confidence_min,
        },
        GateResult {
            name: "parsing_success_rate",
            passed: metrics.parsing_success_rate >= config.gate_parsing_success_min,
            actual: metrics.parsing_success_rate,
            threshold: config.gate_parsing_success_min,
        },
        GateResult {
            name: "gated_sections",
            passed: gated_ratio <= config.gate_max_gated_ratio,
            actual: gated_ratio,
            threshold: config.gate_max_gated_ratio,
        },
    ];

    let report = CiGateReport { gates };
    if !report.all_passed() {
        log::warn!("metrics: CI gates failed: {:?}", report.failures());
    }
    report
}

/// Accumulates counters across phases for one document run.
#[derive(Debug)]
pub struct MetricsCollector {
    metrics: ExtractionMetrics,
    started: std::time::Instant,
    quality_scores: Vec<f64>,
    confidence_scores: Vec<f64>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Start a collector; timestamps begin now.
    #[must_use]
    pub fn new() -> Self {
        let started_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        Self {
            metrics: ExtractionMetrics {
                started_at_epoch_secs: started_at,
                ..ExtractionMetrics::default()
            },
            started: std::time::Instant::now(),
            quality_scores: Vec::new(),
            confidence_scores: Vec::new(),
        }
    }

    /// Record the sections entering refinement.
    pub fn sections_processed(&mut self, count: usize) {
        self.metrics.sections_processed = count;
    }

    /// Record phase-1 cluster count.
    pub fn clusters_built(&mut self, count: usize) {
        self.metrics.clusters_built = count;
    }

    /// Record a phase-2 routing decision.
    pub fn routed(&mut self, from: SectionType, to: SectionType, count: usize) {
        if count == 0 {
            return;
        }
        *self
            .metrics
            .routed_items
            .entry(format!("{from}→{to}"))
            .or_insert(0) += count;
    }

    /// Record phase-3 entity verdicts.
    pub fn entities(&mut self, clean: usize, noise: usize) {
        self.metrics.entities_clean += clean;
        self.metrics.entities_noise += noise;
    }

    /// Record one date parse attempt.
    pub fn date_parse(&mut self, had_errors: bool) {
        self.metrics.parsing_attempts += 1;
        if had_errors {
            self.metrics.date_parsing_errors += 1;
            self.metrics.parsing_errors += 1;
        } else {
            self.metrics.date_parsing_success += 1;
        }
    }

    /// Record one quality assessment.
    pub fn quality(&mut self, quality_score: f64, confidence_score: f64, gated: bool) {
        self.quality_scores.push(quality_score);
        self.confidence_scores.push(confidence_score);
        if gated {
            self.metrics.sections_gated += 1;
        }
    }

    /// Record overlap counts around the resolver.
    pub fn overlaps(&mut self, before: usize, after: usize) {
        self.metrics.boundary_overlaps_before = before;
        self.metrics.boundary_overlaps_after = after;
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.metrics.warnings.push(message.into());
    }

    /// Set the memory estimate for the document.
    pub fn memory_estimate(&mut self, bytes: u64) {
        self.metrics.memory_usage_bytes = bytes;
    }

    /// Finalize the snapshot.
    #[must_use]
    pub fn finish(mut self, sections_extracted: usize) -> ExtractionMetrics {
        self.metrics.sections_extracted = sections_extracted;
        self.metrics.processing_time_secs = self.started.elapsed().as_secs_f64();
        self.metrics.finished_at_epoch_secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();

        if !self.quality_scores.is_empty() {
            self.metrics.average_quality_score =
                self.quality_scores.iter().sum::<f64>() / self.quality_scores.len() as f64;
        }
        if !self.confidence_scores.is_empty() {
            self.metrics.average_confidence_score =
                self.confidence_scores.iter().sum::<f64>() / self.confidence_scores.len() as f64;
        }
        self.metrics.parsing_success_rate = if self.metrics.parsing_attempts == 0 {
            1.0
        } else {
            (self.metrics.parsing_attempts - self.metrics.parsing_errors) as f64
                / self.metrics.parsing_attempts as f64
        };
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_metrics() -> ExtractionMetrics {
        ExtractionMetrics {
            processing_time_secs: 1.0,
            memory_usage_bytes: 1024,
            sections_processed: 4,
            sections_extracted: 4,
            sections_gated: 0,
            average_quality_score: 0.8,
            average_confidence_score: 0.7,
            parsing_success_rate: 0.9,
            ..ExtractionMetrics::default()
        }
    }

    #[test]
    fn healthy_run_passes_all_gates() {
        let report = evaluate_ci_gates(&passing_metrics(), &ExtractionThresholds::default());
        assert!(report.all_passed(), "{:?}", report.failures());
        assert_eq!(report.gates.len(), 6);
    }

    #[test]
    fn processing_time_gate_is_monotonic() {
        let config = ExtractionThresholds::default();
        let mut metrics = passing_metrics();

        let mut last_passed = true;
        for secs in [1.0, 10.0, 29.9, 30.0, 31.0, 300.0] {
            metrics.processing_time_secs = secs;
            let report = evaluate_ci_gates(&metrics, &config);
            let passed = report
                .gates
                .iter()
                .find(|g| g.name == "processing_time")
                .unwrap()
                .passed;
            // Pass can flip to fail as time grows, never the reverse.
            assert!(!(passed && !last_passed), "gate un-failed at {secs}s");
            last_passed = passed;
        }
        assert!(!last_passed);
    }

    #[test]
    fn quality_gate_fails_below_threshold() {
        let mut metrics = passing_metrics();
        metrics.average_quality_score = 0.5;
        let report = evaluate_ci_gates(&metrics, &ExtractionThresholds::default());
        assert!(report.failures().contains(&"average_quality"));
    }

    #[test]
    fn collector_aggregates_averages_and_rates() {
        let mut collector = MetricsCollector::new();
        collector.sections_processed(3);
        collector.quality(0.8, 0.6, false);
        collector.quality(0.6, 0.8, true);
        collector.date_parse(false);
        collector.date_parse(false);
        collector.date_parse(true);
        collector.routed(SectionType::Education, SectionType::Experiences, 2);

        let metrics = collector.finish(2);
        assert_eq!(metrics.sections_extracted, 2);
        assert_eq!(metrics.sections_gated, 1);
        assert!((metrics.average_quality_score - 0.7).abs() < 1e-9);
        assert!((metrics.average_confidence_score - 0.7).abs() < 1e-9);
        assert!((metrics.parsing_success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.routed_items.get("education→experiences"), Some(&2));
    }

    #[test]
    fn empty_run_has_perfect_parse_rate() {
        let metrics = MetricsCollector::new().finish(0);
        assert!((metrics.parsing_success_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let metrics = passing_metrics();
        let json = metrics.to_json().unwrap();
        assert!(json.get("processing_time_secs").is_some());
        assert!(json.get("routed_items").is_some());
    }

    #[test]
    fn gate_evaluation_never_blocks() {
        // A catastrophically bad run still yields a report, not an error.
        let metrics = ExtractionMetrics {
            processing_time_secs: 1e9,
            memory_usage_bytes: u64::MAX,
            ..ExtractionMetrics::default()
        };
        let report = evaluate_ci_gates(&metrics, &ExtractionThresholds::default());
        assert!(!report.all_passed());
    }
}
