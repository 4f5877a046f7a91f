//! Phase 3: NER entity and organization de-noising.
//!
//! The oracle's raw NER output over CV text is noisy in predictable ways:
//! pronouns tagged PERSON, technology names tagged ORG, bare numbers, and
//! generic words ("équipe") promoted to organizations. This phase
//! annotates (never re-labels) the oracle output, and separately
//! validates free-text organization candidates against their surrounding
//! lines.

use crate::config::ExtractionThresholds;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Entity label vocabulary from the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    /// Organization.
    Org,
    /// Location.
    Loc,
    /// Date expression.
    Date,
    /// Person.
    Person,
    /// Everything else.
    Misc,
}

impl EntityLabel {
    /// Parse an oracle label string (`ORG`, `B-ORG`, `PER`, …).
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label
            .to_uppercase()
            .trim_start_matches("B-")
            .trim_start_matches("I-")
        {
            "ORG" | "ORGANIZATION" => EntityLabel::Org,
            "LOC" | "LOCATION" | "GPE" => EntityLabel::Loc,
            "DATE" | "TIME" => EntityLabel::Date,
            "PER" | "PERSON" => EntityLabel::Person,
            _ => EntityLabel::Misc,
        }
    }
}

/// An oracle-produced entity, annotated by the de-noiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NerEntity {
    /// Surface text.
    pub text: String,
    /// Oracle label (never re-labeled here).
    pub label: EntityLabel,
    /// Byte offset start.
    pub start: usize,
    /// Byte offset end (exclusive).
    pub end: usize,
    /// Oracle confidence in [0, 1].
    pub confidence: f64,
    /// De-noiser verdict.
    pub is_noise: bool,
    /// Contextual plausibility in [0, 1].
    pub context_score: f64,
}

/// Organization type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgType {
    /// Commercial organization.
    Business,
    /// Educational institution.
    School,
    /// Neither clearly business nor school.
    Other,
}

/// A validated organization candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationCandidate {
    /// Candidate name as extracted.
    pub name: String,
    /// Validation verdict.
    pub is_valid: bool,
    /// Organization type.
    pub org_type: OrgType,
    /// Validation score in [0, 1].
    pub confidence: f64,
    /// Noise score in [0, 1].
    pub noise_score: f64,
}

/// Pronouns and stopwords that low-confidence entities must not be.
static STOPWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:je|tu|il|elle|nous|vous|ils|elles|on|i|you|he|she|we|they|it|the|a|an|le|la|les|un|une|des|et|and|or|ou)$",
    )
    .unwrap()
});

/// Technology-stack words commonly mis-tagged as ORG.
static TECH_STACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:javascript|typescript|python|java|rust|go|php|ruby|html|css|sql|react|angular|vue|node|nodejs|docker|kubernetes|linux|git|aws|azure|gcp|api|rest|web|json|xml)$",
    )
    .unwrap()
});

/// Generic words that never denote an organization on their own.
static COMMON_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:équipe|equipe|team|projet|project|mission|missions|travail|work|groupe|service|département|department|direction|stage|client|clients|produit|product)$",
    )
    .unwrap()
});

static LEGAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:inc|corp|corporation|ltd|limited|llc|gmbh|ag|sarl|sas|sa|spa|plc|bv|company|co)\.?\s*$",
    )
    .unwrap()
});

static INSTITUTION_KW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:université|university|école|school|institut|institute|lycée|collège|college|faculté|academy|académie)\b",
    )
    .unwrap()
});

static EMPLOYMENT_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:chez|at|développeur|developer|ingénieur|engineer|consultant|manager|stage|stagiaire|alternance|poste|emploi|job|startup|société|entreprise|company)\b",
    )
    .unwrap()
});

/// NER and organization de-noiser.
#[derive(Debug, Clone)]
pub struct EntityDenoiser {
    config: ExtractionThresholds,
}

impl Default for EntityDenoiser {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl EntityDenoiser {
    /// Create a de-noiser with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Annotate raw NER entities with noise verdicts.
    ///
    /// Entities are kept and flagged, never silently dropped, so callers
    /// can audit the decisions.
    #[must_use]
    pub fn filter_ner_noise(&self, entities: Vec<NerEntity>, lines: &[String]) -> Vec<NerEntity> {
        let context = lines.join(" ");
        entities
            .into_iter()
            .map(|mut entity| {
                let (is_noise, context_score) = self.judge_entity(&entity, &context);
                entity.is_noise = is_noise;
                entity.context_score = context_score;
                if is_noise {
                    log::debug!("entities: noise '{}' ({:?})", entity.text, entity.label);
                }
                entity
            })
            .collect()
    }

    fn judge_entity(&self, entity: &NerEntity, context: &str) -> (bool, f64) {
        let text = entity.text.trim();

        // Spans too short to be meaningful, or purely numeric.
        if text.chars().count() < 3 {
            return (true, 0.0);
        }
        if text.chars().all(|c| !c.is_alphabetic()) {
            return (true, 0.0);
        }

        // Low-confidence stopwords/pronouns.
        if entity.confidence < self.config.ner_confidence_floor && STOPWORDS.is_match(text) {
            return (true, 0.1);
        }

        // ORG-specific false positives.
        if entity.label == EntityLabel::Org {
            if TECH_STACK.is_match(text) {
                return (true, 0.1);
            }
            if COMMON_WORDS.is_match(text) {
                return (true, 0.1);
            }
        }

        // Survivors get a contextual plausibility score.
        let mut score: f64 = 0.5;
        if text.chars().next().is_some_and(char::is_uppercase) {
            score += 0.2;
        }
        if EMPLOYMENT_CONTEXT.is_match(context) {
            score += 0.2;
        }
        if entity.confidence >= self.config.ner_confidence_floor {
            score += 0.1;
        }
        (false, score.min(1.0))
    }

    /// Validate free-text organization candidates against context lines.
    #[must_use]
    pub fn validate_organizations(
        &self,
        candidates: &[String],
        lines: &[String],
    ) -> Vec<OrganizationCandidate> {
        candidates
            .iter()
            .map(|name| self.validate_organization(name, lines))
            .collect()
    }

    /// Validate a single organization candidate.
    #[must_use]
    pub fn validate_organization(&self, name: &str, lines: &[String]) -> OrganizationCandidate {
        let validation_score = org_validation_score(name, lines);
        let noise_score = org_noise_score(name);
        let is_valid = validation_score >= self.config.org_validation_min
            && noise_score < self.config.org_noise_max;
        let org_type = classify_org_type(name, lines);

        log::debug!(
            "entities: org '{name}' valid={is_valid} score={validation_score:.2} noise={noise_score:.2}"
        );

        OrganizationCandidate {
            name: name.to_string(),
            is_valid,
            org_type,
            confidence: validation_score,
            noise_score,
        }
    }
}

/// Validation score: legal suffixes, institution keywords, employment
/// co-occurrence, and name shape all add evidence.
#[must_use]
pub fn org_validation_score(name: &str, context_lines: &[String]) -> f64 {
    let name = name.trim();
    if name.is_empty() {
        return 0.0;
    }
    let mut score: f64 = 0.0;

    if LEGAL_SUFFIX.is_match(name) {
        score += 0.4;
    }
    if INSTITUTION_KW.is_match(name) {
        score += 0.4;
    }

    // Capitalized multi-word names are organization-shaped.
    let words: Vec<&str> = name.split_whitespace().collect();
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    if capitalized >= 1 {
        score += 0.2;
    }
    if words.len() >= 2 && capitalized >= 2 {
        score += 0.1;
    }

    // Employment context around mentions of the name.
    let name_lower = name.to_lowercase();
    let mentioned_with_context = context_lines.iter().any(|line| {
        line.to_lowercase().contains(&name_lower) && EMPLOYMENT_CONTEXT.is_match(line)
    });
    if mentioned_with_context {
        score += 0.2;
    }

    score.min(1.0)
}

/// Noise score: generic words, context-free acronyms, lowercase shapes.
#[must_use]
pub fn org_noise_score(name: &str) -> f64 {
    let name = name.trim();
    if name.is_empty() {
        return 1.0;
    }
    let mut score: f64 = 0.0;

    let words: Vec<&str> = name.split_whitespace().collect();
    if words.iter().any(|w| COMMON_WORDS.is_match(w)) {
        // A generic word anywhere in the name is disqualifying on its own.
        score += if words.len() == 1 { 0.8 } else { 0.4 };
    }
    if words.iter().all(|w| TECH_STACK.is_match(w)) {
        score += 0.8;
    }
    if words.len() == 1 {
        let word = words[0];
        let len = word.chars().count();
        if len <= 4 && word.chars().all(char::is_uppercase) {
            score += 0.5; // bare acronym
        }
        if word.chars().next().is_some_and(char::is_lowercase) {
            score += 0.3;
        }
    }
    if name.chars().all(|c| !c.is_alphabetic()) {
        score = 1.0;
    }

    score.min(1.0)
}

/// Business/school/other classification from the same keyword evidence.
#[must_use]
pub fn classify_org_type(name: &str, context_lines: &[String]) -> OrgType {
    if INSTITUTION_KW.is_match(name) {
        return OrgType::School;
    }
    if LEGAL_SUFFIX.is_match(name) {
        return OrgType::Business;
    }
    let name_lower = name.to_lowercase();
    for line in context_lines {
        if !line.to_lowercase().contains(&name_lower) {
            continue;
        }
        if INSTITUTION_KW.is_match(line) {
            return OrgType::School;
        }
        if EMPLOYMENT_CONTEXT.is_match(line) {
            return OrgType::Business;
        }
    }
    OrgType::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn entity(text: &str, label: EntityLabel, confidence: f64) -> NerEntity {
        NerEntity {
            text: text.to_string(),
            label,
            start: 0,
            end: text.len(),
            confidence,
            is_noise: false,
            context_score: 0.0,
        }
    }

    #[test]
    fn noise_filtering_keeps_real_organizations() {
        let entities = vec![
            entity("Microsoft", EntityLabel::Org, 0.95),
            entity("Université de Paris", EntityLabel::Org, 0.88),
            entity("je", EntityLabel::Person, 0.60),
            entity("javascript", EntityLabel::Org, 0.80),
            entity("123", EntityLabel::Org, 0.90),
            entity("équipe", EntityLabel::Org, 0.85),
            entity("Google France", EntityLabel::Org, 0.76),
            entity("ab", EntityLabel::Org, 0.90),
        ];
        let lines = doc(&["Développeur senior chez Microsoft"]);
        let annotated = EntityDenoiser::default().filter_ner_noise(entities, &lines);

        let clean: Vec<&str> = annotated
            .iter()
            .filter(|e| !e.is_noise)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(clean, vec!["Microsoft", "Université de Paris", "Google France"]);

        for e in annotated.iter().filter(|e| !e.is_noise) {
            assert!(e.context_score > 0.5);
        }
    }

    #[test]
    fn labels_are_never_rewritten() {
        let entities = vec![entity("javascript", EntityLabel::Org, 0.80)];
        let annotated = EntityDenoiser::default().filter_ner_noise(entities, &[]);
        assert_eq!(annotated[0].label, EntityLabel::Org);
        assert!(annotated[0].is_noise);
    }

    #[test]
    fn corporate_name_with_employment_context_validates() {
        let lines = doc(&[
            "Développeur Senior chez Microsoft Corporation",
            "Équipe produit",
            "Missions clients",
        ]);
        let org = EntityDenoiser::default().validate_organization("Microsoft Corporation", &lines);
        assert!(org.is_valid);
        assert_eq!(org.org_type, OrgType::Business);
    }

    #[test]
    fn university_validates_as_school() {
        let lines = doc(&["Master Informatique", "Université de Lyon", "Formation académique"]);
        let org = EntityDenoiser::default().validate_organization("Université de Lyon", &lines);
        assert!(org.is_valid);
        assert_eq!(org.org_type, OrgType::School);
    }

    #[test]
    fn common_word_never_validates() {
        let denoiser = EntityDenoiser::default();
        for context in [
            doc(&["Travail en équipe", "Projet collaboratif"]),
            doc(&["Développeur chez équipe", "stage équipe mission"]),
            Vec::new(),
        ] {
            let org = denoiser.validate_organization("équipe", &context);
            assert!(!org.is_valid, "context: {context:?}");
        }
    }

    #[test]
    fn bare_acronym_without_context_is_rejected() {
        let lines = doc(&["Quelques tâches ABC"]);
        let org = EntityDenoiser::default().validate_organization("ABC", &lines);
        assert!(!org.is_valid);
    }

    #[test]
    fn legal_form_validates() {
        let lines = doc(&["Startup TechCorp SARL", "Société en croissance", "Équipe technique"]);
        let org = EntityDenoiser::default().validate_organization("TechCorp SARL", &lines);
        assert!(org.is_valid);
        assert_eq!(org.org_type, OrgType::Business);
    }

    #[test]
    fn entity_label_parsing() {
        assert_eq!(EntityLabel::from_label("ORG"), EntityLabel::Org);
        assert_eq!(EntityLabel::from_label("B-ORG"), EntityLabel::Org);
        assert_eq!(EntityLabel::from_label("person"), EntityLabel::Person);
        assert_eq!(EntityLabel::from_label("WHATEVER"), EntityLabel::Misc);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn scores_stay_bounded(name in ".{0,40}") {
            let v = org_validation_score(&name, &[]);
            let n = org_noise_score(&name);
            prop_assert!((0.0..=1.0).contains(&v));
            prop_assert!((0.0..=1.0).contains(&n));
        }
    }
}
