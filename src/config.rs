//! Extraction thresholds and their environment-style overrides.
//!
//! Every numeric or boolean knob in the pipeline lives here as a flat,
//! documented field. Defaults are the contractual values; each can be
//! overridden with a `CVSTRUCT_`-prefixed key (upper-cased field name),
//! either from the process environment or an explicit key/value iterator.
//! Malformed values keep the default and log a warning; unknown keys are
//! ignored.

use serde::{Deserialize, Serialize};

/// Flat set of named thresholds controlling the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionThresholds {
    /// Documents longer than this are truncated, never rejected.
    pub max_document_lines: usize,
    /// Cap on iterative boundary-refinement passes.
    pub max_extraction_passes: usize,

    // Layout analyzer
    /// Contact-token density for a 5-line window to qualify as a contact block.
    pub contact_density_threshold: f64,
    /// Lines appended after a contact block when building quarantine zones.
    pub contact_post_buffer_lines: usize,
    /// Contact blocks are only searched within this many leading lines.
    pub header_detection_window: usize,
    /// Combined date+connector line density for timeline classification.
    pub timeline_density_threshold: f64,
    /// X-coordinate clustering tolerance for column detection.
    pub column_cluster_tolerance: f32,

    // Boundary mapper
    /// Minimum non-empty-line ratio for an experience window.
    pub density_min_experience: f64,
    /// Foreign-header density above which an experience window is split.
    pub foreign_header_split_density: f64,
    /// Hard cap on window extension past its start.
    pub max_window_size: usize,
    /// Minimum experience window size the backfill step targets.
    pub min_experience_window: usize,
    /// Experience-signal density required to trigger the backfill.
    pub exp_signal_density_min: f64,
    /// Extra lookahead lines when dates precede content.
    pub exp_lookahead: usize,

    // Phase 1: clustering
    /// Minimum gap (lines) for two windows to be merge candidates.
    pub window_base: usize,
    /// Maximum gap (lines) for two windows to be merge candidates.
    pub window_max: usize,
    /// Association score required to bind a date to a role/company pair.
    pub date_assoc_min_score: f64,
    /// Cross-column merge distance; 0 forbids cross-column merges.
    pub max_cross_column_distance: usize,

    // Phase 2: education/experience arbiter
    /// Distinct employment cues required to move an item to experience.
    pub exp_employment_signals_min: usize,
    /// Education score at which the item stays education regardless of cues.
    pub edu_override_threshold: f64,

    // Phase 3: entity de-noising
    /// NER confidence floor below which stopword-like entities are noise.
    pub ner_confidence_floor: f64,
    /// Organization validation score required for acceptance.
    pub org_validation_min: f64,
    /// Organization noise score at which candidates are rejected.
    pub org_noise_max: f64,

    // Phase 6: quality gate
    /// Global quality floor for display eligibility.
    pub quality_floor: f64,
    /// Lower floor granted to essential sections.
    pub quality_floor_essential: f64,
    /// Empty-line ratio above which a section is mostly empty.
    pub mostly_empty_ratio: f64,
    /// Confidence below which a section is flagged low-confidence.
    pub low_confidence_floor: f64,

    // Phase 7: CI gates
    /// Processing-time gate, seconds.
    pub gate_processing_time_secs: f64,
    /// Memory gate, bytes.
    pub gate_memory_bytes: u64,
    /// Average-quality gate.
    pub gate_avg_quality_min: f64,
    /// Average-confidence gate.
    pub gate_avg_confidence_min: f64,
    /// Parsing success-rate gate.
    pub gate_parsing_success_min: f64,
    /// Maximum tolerated ratio of quality-gated sections.
    pub gate_max_gated_ratio: f64,

    // Overlap resolver
    /// Maximum gap when merging adjacent same-type sections.
    pub merge_adjacent_gap: usize,
}

impl Default for ExtractionThresholds {
    fn default() -> Self {
        Self {
            max_document_lines: 10_000,
            max_extraction_passes: 3,
            contact_density_threshold: 0.6,
            contact_post_buffer_lines: 8,
            header_detection_window: 10,
            timeline_density_threshold: 0.45,
            column_cluster_tolerance: 30.0,
            density_min_experience: 0.18,
            foreign_header_split_density: 0.08,
            max_window_size: 40,
            min_experience_window: 12,
            exp_signal_density_min: 0.35,
            exp_lookahead: 25,
            window_base: 1,
            window_max: 12,
            date_assoc_min_score: 0.60,
            max_cross_column_distance: 0,
            exp_employment_signals_min: 2,
            edu_override_threshold: 0.80,
            ner_confidence_floor: 0.70,
            org_validation_min: 0.6,
            org_noise_max: 0.4,
            quality_floor: 0.3,
            quality_floor_essential: 0.25,
            mostly_empty_ratio: 0.7,
            low_confidence_floor: 0.2,
            gate_processing_time_secs: 30.0,
            gate_memory_bytes: 1 << 30,
            gate_avg_quality_min: 0.6,
            gate_avg_confidence_min: 0.5,
            gate_parsing_success_min: 0.7,
            gate_max_gated_ratio: 0.5,
            merge_adjacent_gap: 3,
        }
    }
}

/// Key prefix for environment overrides.
const ENV_PREFIX: &str = "CVSTRUCT_";

impl ExtractionThresholds {
    /// Defaults overridden from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(std::env::vars())
    }

    /// Apply `CVSTRUCT_*` key/value overrides on top of `self`.
    ///
    /// Keys are matched case-insensitively against field names; values that
    /// fail to parse keep the current setting.
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let key = key.as_ref();
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            if !self.apply_override(&name.to_lowercase(), value) {
                log::warn!("config: ignoring override {key}={value}");
            }
        }
        self
    }

    fn apply_override(&mut self, field: &str, value: &str) -> bool {
        fn set<T: std::str::FromStr>(slot: &mut T, value: &str) -> bool {
            match value.parse() {
                Ok(v) => {
                    *slot = v;
                    true
                }
                Err(_) => false,
            }
        }
        match field {
            "max_document_lines" => set(&mut self.max_document_lines, value),
            "max_extraction_passes" => set(&mut self.max_extraction_passes, value),
            "contact_density_threshold" => set(&mut self.contact_density_threshold, value),
            "contact_post_buffer_lines" => set(&mut self.contact_post_buffer_lines, value),
            "header_detection_window" => set(&mut self.header_detection_window, value),
            "timeline_density_threshold" => set(&mut self.timeline_density_threshold, value),
            "column_cluster_tolerance" => set(&mut self.column_cluster_tolerance, value),
            "density_min_experience" => set(&mut self.density_min_experience, value),
            "foreign_header_split_density" => set(&mut self.foreign_header_split_density, value),
            "max_window_size" => set(&mut self.max_window_size, value),
            "min_experience_window" => set(&mut self.min_experience_window, value),
            "exp_signal_density_min" => set(&mut self.exp_signal_density_min, value),
            "exp_lookahead" => set(&mut self.exp_lookahead, value),
            "window_base" => set(&mut self.window_base, value),
            "window_max" => set(&mut self.window_max, value),
            "date_assoc_min_score" => set(&mut self.date_assoc_min_score, value),
            "max_cross_column_distance" => set(&mut self.max_cross_column_distance, value),
            "exp_employment_signals_min" => set(&mut self.exp_employment_signals_min, value),
            "edu_override_threshold" => set(&mut self.edu_override_threshold, value),
            "ner_confidence_floor" => set(&mut self.ner_confidence_floor, value),
            "org_validation_min" => set(&mut self.org_validation_min, value),
            "org_noise_max" => set(&mut self.org_noise_max, value),
            "quality_floor" => set(&mut self.quality_floor, value),
            "quality_floor_essential" => set(&mut self.quality_floor_essential, value),
            "mostly_empty_ratio" => set(&mut self.mostly_empty_ratio, value),
            "low_confidence_floor" => set(&mut self.low_confidence_floor, value),
            "gate_processing_time_secs" => set(&mut self.gate_processing_time_secs, value),
            "gate_memory_bytes" => set(&mut self.gate_memory_bytes, value),
            "gate_avg_quality_min" => set(&mut self.gate_avg_quality_min, value),
            "gate_avg_confidence_min" => set(&mut self.gate_avg_confidence_min, value),
            "gate_parsing_success_min" => set(&mut self.gate_parsing_success_min, value),
            "gate_max_gated_ratio" => set(&mut self.gate_max_gated_ratio, value),
            "merge_adjacent_gap" => set(&mut self.merge_adjacent_gap, value),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cfg = ExtractionThresholds::default();
        assert_eq!(cfg.max_document_lines, 10_000);
        assert!((cfg.density_min_experience - 0.18).abs() < f64::EPSILON);
        assert!((cfg.contact_density_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.contact_post_buffer_lines, 8);
        assert!((cfg.edu_override_threshold - 0.80).abs() < f64::EPSILON);
        assert!((cfg.date_assoc_min_score - 0.60).abs() < f64::EPSILON);
        assert_eq!(cfg.max_cross_column_distance, 0);
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let cfg = ExtractionThresholds::default().with_overrides(vec![
            ("CVSTRUCT_DENSITY_MIN_EXPERIENCE", "0.25"),
            ("CVSTRUCT_MAX_WINDOW_SIZE", "60"),
            ("CVSTRUCT_MAX_WINDOW_SIZE_TYPO", "60"),
            ("CVSTRUCT_EXP_LOOKAHEAD", "not-a-number"),
            ("UNRELATED_KEY", "1"),
        ]);
        assert!((cfg.density_min_experience - 0.25).abs() < f64::EPSILON);
        assert_eq!(cfg.max_window_size, 60);
        assert_eq!(cfg.exp_lookahead, 25);
    }
}
