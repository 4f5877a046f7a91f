//! Core data-model types shared across the pipeline.
//!
//! The single artifact threaded through every stage is the ordered list of
//! [`SectionBoundary`] values; everything else (layout, entities, date
//! annotations, quality assessments) rides alongside as side tables.

use serde::{Deserialize, Serialize};

/// Canonical section vocabulary.
///
/// Aliases observed in documents ("experience", "work", "formation", …)
/// normalize to one of these via [`SectionType::canonical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    /// Professional experience entries.
    Experiences,
    /// Education / academic background.
    Education,
    /// Technical or soft skills.
    Skills,
    /// Spoken languages.
    Languages,
    /// Personal or professional projects.
    Projects,
    /// Certifications and qualifications.
    Certifications,
    /// Hobbies and interests.
    Interests,
    /// Contact / identity block.
    PersonalInfo,
    /// References.
    References,
    /// Classified but non-canonical content.
    Other,
    /// Could not be classified.
    Unknown,
}

impl SectionType {
    /// Canonicalize a free-form section label.
    ///
    /// Matching is case-insensitive and tolerant of the singular/plural and
    /// multilingual aliases that appear in real documents.
    #[must_use]
    pub fn canonical(label: &str) -> Self {
        let l = label.trim().to_lowercase();
        match l.as_str() {
            "experience" | "experiences" | "work" | "employment" | "career"
            | "work experience" | "professional experience" | "expérience"
            | "expériences" | "emplois" => SectionType::Experiences,
            "education" | "formation" | "formations" | "academic" | "studies"
            | "études" | "etudes" | "éducation" => SectionType::Education,
            "skills" | "skill" | "competences" | "compétences" | "abilities" => {
                SectionType::Skills
            }
            "languages" | "langues" | "idiomas" | "sprachen" => SectionType::Languages,
            "projects" | "projets" | "realisations" | "réalisations" => SectionType::Projects,
            "certifications" | "certificates" | "qualifications" => SectionType::Certifications,
            "interests" | "interets" | "intérêts" | "hobbies" | "loisirs"
            | "centres d'intérêt" => SectionType::Interests,
            "personal_info" | "contact" | "personal information" => SectionType::PersonalInfo,
            "references" | "références" => SectionType::References,
            "other" => SectionType::Other,
            _ => SectionType::Unknown,
        }
    }

    /// Priority used by the overlap resolver. Higher wins.
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            SectionType::Experiences => 9,
            SectionType::Education => 8,
            SectionType::Skills => 7,
            SectionType::Projects => 6,
            SectionType::Certifications => 5,
            SectionType::Languages => 4,
            SectionType::Interests => 3,
            SectionType::PersonalInfo | SectionType::References => 2,
            SectionType::Other | SectionType::Unknown => 1,
        }
    }

    /// Essential sections get a lower display-eligibility floor.
    #[must_use]
    pub fn is_essential(&self) -> bool {
        matches!(
            self,
            SectionType::Experiences | SectionType::Education | SectionType::Skills
        )
    }

    /// Stable lowercase label.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            SectionType::Experiences => "experiences",
            SectionType::Education => "education",
            SectionType::Skills => "skills",
            SectionType::Languages => "languages",
            SectionType::Projects => "projects",
            SectionType::Certifications => "certifications",
            SectionType::Interests => "interests",
            SectionType::PersonalInfo => "personal_info",
            SectionType::References => "references",
            SectionType::Other => "other",
            SectionType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// A classified region of the document.
///
/// `start_line` is inclusive, `end_line` exclusive; both are line indices
/// into the truncated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBoundary {
    /// First line of the region (inclusive).
    pub start_line: usize,
    /// One past the last line of the region (exclusive).
    pub end_line: usize,
    /// Section classification.
    pub section: SectionType,
}

impl SectionBoundary {
    /// Create a boundary. `start_line` is clamped to `end_line` if inverted.
    #[must_use]
    pub fn new(start_line: usize, end_line: usize, section: SectionType) -> Self {
        Self {
            start_line: start_line.min(end_line),
            end_line,
            section,
        }
    }

    /// Number of lines covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_line - self.start_line
    }

    /// True when the boundary covers no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Check line-range overlap with another boundary.
    #[must_use]
    pub fn overlaps(&self, other: &SectionBoundary) -> bool {
        !(self.end_line <= other.start_line || other.end_line <= self.start_line)
    }

    /// Clamp the boundary to a document of `len` lines.
    #[must_use]
    pub fn clamped(&self, len: usize) -> Self {
        let end = self.end_line.min(len);
        Self {
            start_line: self.start_line.min(end),
            end_line: end,
            section: self.section,
        }
    }
}

/// Per-line token coordinate, when the ingestion layer provides layout info.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineCoordinate {
    /// Horizontal position of the line's first token.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

/// Document reading order inferred from script composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingOrder {
    /// Left-to-right (Latin and most scripts).
    #[default]
    Ltr,
    /// Right-to-left (Arabic, Hebrew).
    Rtl,
    /// Mixed-script document.
    Mixed,
}

/// Where dates sit relative to the content they describe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePosition {
    /// Dates precede descriptive content.
    BeforeContent,
    /// Dates follow descriptive content.
    AfterContent,
    /// No dominant pattern.
    #[default]
    Mixed,
}

/// A detected section header line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderSpan {
    /// Line the header starts on.
    pub start_line: usize,
    /// Line the header ends on (headers are single lines today).
    pub end_line: usize,
    /// Raw header text, trimmed.
    pub text: String,
    /// Classified section type, or `Unknown`.
    pub section: SectionType,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
    /// ISO-639-1 language code of the matched alias, or "unknown".
    pub language: String,
}

/// Kind of contact information found in a contact block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// URL.
    Url,
    /// Street address.
    Address,
}

/// A detected contact-information block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactBlock {
    /// First line of the block (inclusive).
    pub start_line: usize,
    /// Last line of the block (inclusive).
    pub end_line: usize,
    /// Ratio of contact-bearing lines in the block.
    pub density: f64,
    /// Kinds of contact data seen.
    pub types: std::collections::BTreeSet<ContactKind>,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
}

/// Layout structure inferred once per document, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutStructure {
    /// Script-level reading order.
    pub reading_order: ReadingOrder,
    /// Column count, at least 1.
    pub columns: usize,
    /// `(min_x, max_x)` ranges of each detected column.
    pub column_barriers: Vec<(f32, f32)>,
    /// Detected section headers.
    pub header_spans: Vec<HeaderSpan>,
    /// Dominant date placement.
    pub date_position: DatePosition,
    /// True when sections open with dates followed by descriptive content.
    pub is_inverted: bool,
    /// Main contact block range, if any.
    pub contact_block_range: Option<(usize, usize)>,
    /// Line ranges excluded from experience extraction.
    pub contact_quarantine_zones: Vec<(usize, usize)>,
    /// Timeline-shaped document.
    pub is_timeline: bool,
    /// Table-shaped document.
    pub is_table: bool,
    /// Overall structure-detection confidence in [0, 1].
    pub layout_confidence: f64,
}

impl Default for LayoutStructure {
    fn default() -> Self {
        Self {
            reading_order: ReadingOrder::Ltr,
            columns: 1,
            column_barriers: Vec::new(),
            header_spans: Vec::new(),
            date_position: DatePosition::Mixed,
            is_inverted: false,
            contact_block_range: None,
            contact_quarantine_zones: Vec::new(),
            is_timeline: false,
            is_table: false,
            layout_confidence: 0.0,
        }
    }
}

impl LayoutStructure {
    /// True when `line` falls inside a contact quarantine zone.
    #[must_use]
    pub fn is_quarantined(&self, line: usize) -> bool {
        self.contact_quarantine_zones
            .iter()
            .any(|&(start, end)| start <= line && line <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_aliases_collapse() {
        assert_eq!(SectionType::canonical("experience"), SectionType::Experiences);
        assert_eq!(SectionType::canonical("Experiences"), SectionType::Experiences);
        assert_eq!(SectionType::canonical("work"), SectionType::Experiences);
        assert_eq!(SectionType::canonical("formation"), SectionType::Education);
        assert_eq!(SectionType::canonical("compétences"), SectionType::Skills);
        assert_eq!(SectionType::canonical("loisirs"), SectionType::Interests);
        assert_eq!(SectionType::canonical("garbage"), SectionType::Unknown);
    }

    #[test]
    fn boundary_overlap_is_symmetric() {
        let a = SectionBoundary::new(0, 5, SectionType::Experiences);
        let b = SectionBoundary::new(4, 9, SectionType::Education);
        let c = SectionBoundary::new(5, 9, SectionType::Education);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn boundary_new_never_inverts() {
        let b = SectionBoundary::new(9, 3, SectionType::Other);
        assert!(b.start_line <= b.end_line);
        assert!(b.is_empty() || b.len() > 0);
    }

    #[test]
    fn quarantine_zone_membership() {
        let layout = LayoutStructure {
            contact_quarantine_zones: vec![(0, 8), (20, 25)],
            ..LayoutStructure::default()
        };
        assert!(layout.is_quarantined(0));
        assert!(layout.is_quarantined(8));
        assert!(!layout.is_quarantined(9));
        assert!(layout.is_quarantined(22));
    }

    #[test]
    fn priority_order_matches_resolver_contract() {
        assert!(SectionType::Experiences.priority() > SectionType::Education.priority());
        assert!(SectionType::Education.priority() > SectionType::Other.priority());
    }
}
