//! # cvstruct
//!
//! Deterministic CV document-structure extraction.
//!
//! Turns an unstructured, possibly multilingual, possibly multi-column
//! raw-text document (plain lines, optionally with per-line x/y
//! coordinates) into a set of classified, bounded, quality-scored
//! *sections* (experience, education, skills, languages, and friends)
//! ready for downstream field extraction.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Layout Analyzer    columns · reading order · contact         │
//! │                    quarantine · headers · timeline/table     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Boundary Mapper    header-aware windows, 5 ordered guards    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Phase 1  experience cluster builder                          │
//! │ Phase 2  education/experience arbiter                        │
//! │ Phase 3  entity & organization de-noiser                     │
//! │ Phase 4  skill vs. interest separator                        │
//! │ Phase 5  multilingual date parser                            │
//! │ Phase 6  quality gate                                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Overlap Resolver   priority-trimmed, non-overlapping output  │
//! │ Phase 7  metrics snapshot + CI gates                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage consumes and returns the same artifact, an ordered list of
//! [`SectionBoundary`] values, plus side tables (entities, date
//! annotations, quality assessments), so stages compose without bespoke
//! state.
//!
//! ## Quick start
//!
//! ```rust
//! use cvstruct::StructureExtractor;
//!
//! let lines: Vec<String> = [
//!     "EXPÉRIENCES",
//!     "Développeur Senior - TechCorp",
//!     "2020 - présent",
//!     "",
//!     "FORMATION",
//!     "Master Informatique, Université de Lyon",
//! ]
//! .iter()
//! .map(|s| s.to_string())
//! .collect();
//!
//! let result = StructureExtractor::default().extract(&lines, None);
//! for boundary in &result.boundaries {
//!     println!("{} [{}:{}]", boundary.section, boundary.start_line, boundary.end_line);
//! }
//! assert!(result.metrics.processing_time_secs < 30.0);
//! ```
//!
//! ## Design
//!
//! - **Deterministic**: the run is a pure function of
//!   `(lines, coordinates, config)`. The ML oracle is consumed through the
//!   narrow [`Oracle`] trait, required to be deterministic, and replaced by
//!   the offline [`HeuristicOracle`] when unavailable.
//! - **Fail closed, never raise**: input anomalies truncate or fall back;
//!   validation findings are recorded as data; resource caps stop loops.
//!   Fallback paths are visible in [`Outcome`], not hidden in handlers.
//! - **No global state**: the classifier cache is an explicit, injected,
//!   bounded [`ClassifierCache`] owned by the caller. Documents can be
//!   processed in parallel with no shared mutable state in the core.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod headers;
pub mod lang;
pub mod layout;
pub mod oracle;
pub mod overlap;
pub mod phases;
pub mod pipeline;
pub mod types;
pub mod window;

pub use config::ExtractionThresholds;
pub use error::{Error, Outcome, Result};
pub use layout::LayoutAnalyzer;
pub use oracle::{ClassifierCache, HeuristicOracle, Oracle, SectionPrediction, TaggedSpan};
pub use overlap::OverlapResolver;
pub use phases::cluster::{ClusterBuilder, ExperienceCluster};
pub use phases::dates::{parse_enhanced_date, DateParseResult, ParsingMethod};
pub use phases::edu_exp::{EduExpArbiter, EducationClassification};
pub use phases::entities::{
    EntityDenoiser, EntityLabel, NerEntity, OrganizationCandidate, OrgType,
};
pub use phases::metrics::{
    evaluate_ci_gates, CiGateReport, ExtractionMetrics, GateResult, MetricsCollector,
};
pub use phases::quality::{QualityAssessment, QualityGate, QualityIssue};
pub use phases::skills::{
    classify_skill_or_interest, separate_skills_and_interests, SkillCategory,
    SkillInterestClassification,
};
pub use pipeline::{ExtractionResult, StructureExtractor};
pub use types::{
    ContactBlock, ContactKind, DatePosition, HeaderSpan, LayoutStructure, LineCoordinate,
    ReadingOrder, SectionBoundary, SectionType,
};
pub use window::BoundaryMapper;
