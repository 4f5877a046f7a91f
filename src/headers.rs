//! Multilingual section-header alias tables.
//!
//! Immutable lookup tables keyed by `(SectionType, language)`, loaded once
//! at startup and never mutated at runtime. Seven-plus languages per
//! canonical section type; lookups run over NFC + casefold normalized text.

use crate::types::SectionType;
use once_cell::sync::Lazy;
use unicode_normalization::UnicodeNormalization;

/// One alias entry: section type, ISO-639-1 language, alias text.
pub type AliasEntry = (SectionType, &'static str, &'static str);

/// Flat alias table. Aliases are stored pre-lowercased.
pub static HEADER_ALIASES: Lazy<Vec<AliasEntry>> = Lazy::new(|| {
    use SectionType::*;
    vec![
        // Experience
        (Experiences, "en", "experience"),
        (Experiences, "en", "experiences"),
        (Experiences, "en", "work experience"),
        (Experiences, "en", "professional experience"),
        (Experiences, "en", "employment history"),
        (Experiences, "fr", "expérience"),
        (Experiences, "fr", "expériences"),
        (Experiences, "fr", "expérience professionnelle"),
        (Experiences, "fr", "expériences professionnelles"),
        (Experiences, "fr", "parcours professionnel"),
        (Experiences, "es", "experiencia"),
        (Experiences, "es", "experiencia profesional"),
        (Experiences, "de", "berufserfahrung"),
        (Experiences, "de", "arbeitserfahrung"),
        (Experiences, "ar", "الخبرة"),
        (Experiences, "ar", "الخبرة المهنية"),
        (Experiences, "he", "ניסיון"),
        (Experiences, "he", "ניסיון מקצועי"),
        (Experiences, "zh", "工作经验"),
        (Experiences, "zh", "职业经历"),
        // Education
        (Education, "en", "education"),
        (Education, "en", "academic background"),
        (Education, "en", "qualifications"),
        (Education, "fr", "formation"),
        (Education, "fr", "formations"),
        (Education, "fr", "études"),
        (Education, "fr", "parcours académique"),
        (Education, "es", "educación"),
        (Education, "es", "formación"),
        (Education, "de", "ausbildung"),
        (Education, "de", "bildung"),
        (Education, "ar", "التعليم"),
        (Education, "he", "השכלה"),
        (Education, "zh", "教育背景"),
        (Education, "zh", "学历"),
        // Skills
        (Skills, "en", "skills"),
        (Skills, "en", "technical skills"),
        (Skills, "en", "competencies"),
        (Skills, "fr", "compétences"),
        (Skills, "fr", "savoir-faire"),
        (Skills, "es", "habilidades"),
        (Skills, "es", "competencias"),
        (Skills, "de", "fähigkeiten"),
        (Skills, "de", "kompetenzen"),
        (Skills, "ar", "المهارات"),
        (Skills, "he", "כישורים"),
        (Skills, "zh", "技能"),
        // Languages
        (Languages, "en", "languages"),
        (Languages, "fr", "langues"),
        (Languages, "es", "idiomas"),
        (Languages, "de", "sprachen"),
        (Languages, "it", "lingue"),
        (Languages, "ar", "اللغات"),
        (Languages, "zh", "语言"),
        // Projects
        (Projects, "en", "projects"),
        (Projects, "fr", "projets"),
        (Projects, "fr", "réalisations"),
        (Projects, "es", "proyectos"),
        (Projects, "de", "projekte"),
        (Projects, "zh", "项目"),
        (Projects, "ar", "المشاريع"),
        // Certifications
        (Certifications, "en", "certifications"),
        (Certifications, "en", "certificates"),
        (Certifications, "fr", "certifications"),
        (Certifications, "es", "certificaciones"),
        (Certifications, "de", "zertifikate"),
        (Certifications, "zh", "资格"),
        (Certifications, "ar", "المؤهلات"),
        // Interests
        (Interests, "en", "interests"),
        (Interests, "en", "hobbies"),
        (Interests, "fr", "centres d'intérêt"),
        (Interests, "fr", "loisirs"),
        (Interests, "es", "intereses"),
        (Interests, "de", "interessen"),
        (Interests, "it", "interessi"),
        // Personal info
        (PersonalInfo, "en", "personal information"),
        (PersonalInfo, "fr", "informations personnelles"),
        (PersonalInfo, "de", "persönliche daten"),
        (PersonalInfo, "es", "datos personales"),
        // References
        (References, "en", "references"),
        (References, "fr", "références"),
        (References, "es", "referencias"),
        (References, "de", "referenzen"),
    ]
});

/// Section headers that must not appear inside an experience window.
///
/// NFC + casefold normalized; used by the conflicting-header and
/// foreign-header guards.
pub static DISALLOWED_IN_EXPERIENCE: Lazy<Vec<String>> = Lazy::new(|| {
    HEADER_ALIASES
        .iter()
        .filter(|(section, _, _)| {
            !matches!(section, SectionType::Experiences | SectionType::PersonalInfo)
        })
        .map(|(_, _, alias)| normalize_header(alias))
        .collect()
});

/// NFC + casefold normalization for header comparisons.
#[must_use]
pub fn normalize_header(text: &str) -> String {
    text.trim().nfc().collect::<String>().to_lowercase()
}

/// Strip trailing header punctuation (`:`, `-`, `=`) and whitespace.
#[must_use]
pub fn strip_header_decoration(text: &str) -> String {
    text.trim_end_matches(|c: char| matches!(c, ':' | '-' | '=' | '–' | '—') || c.is_whitespace())
        .to_string()
}

/// Best alias match for a candidate header line.
///
/// Returns `(section, language, similarity)` where similarity is the
/// normalized length ratio between alias and candidate. Matches below the
/// caller's threshold should be treated as `Unknown`.
#[must_use]
pub fn best_alias_match(line: &str) -> Option<(SectionType, &'static str, f64)> {
    let normalized = normalize_header(&strip_header_decoration(line));
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<(SectionType, &'static str, f64)> = None;
    for (section, language, alias) in HEADER_ALIASES.iter() {
        let alias_norm = normalize_header(alias);
        if normalized.contains(&alias_norm) || alias_norm.contains(&normalized) {
            let shorter = alias_norm.chars().count().min(normalized.chars().count());
            let longer = alias_norm.chars().count().max(normalized.chars().count());
            if longer == 0 {
                continue;
            }
            let score = shorter as f64 / longer as f64;
            if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                best = Some((*section, language, score));
            }
        }
    }
    best
}

/// True when the normalized header content names a non-experience section.
#[must_use]
pub fn is_disallowed_in_experience(header_content: &str) -> bool {
    let normalized = normalize_header(header_content);
    if normalized.is_empty() {
        return false;
    }
    DISALLOWED_IN_EXPERIENCE
        .iter()
        .any(|alias| normalized == *alias || normalized.contains(alias.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_match_finds_exact_headers() {
        let (section, lang, score) = best_alias_match("EXPÉRIENCES").unwrap();
        assert_eq!(section, SectionType::Experiences);
        assert_eq!(lang, "fr");
        assert!(score > 0.5);
    }

    #[test]
    fn alias_match_handles_decorated_headers() {
        let (section, _, _) = best_alias_match("Formation:").unwrap();
        assert_eq!(section, SectionType::Education);
        let (section, _, _) = best_alias_match("SKILLS --").unwrap();
        assert_eq!(section, SectionType::Skills);
    }

    #[test]
    fn alias_match_is_multilingual() {
        assert_eq!(best_alias_match("工作经验").unwrap().0, SectionType::Experiences);
        assert_eq!(best_alias_match("المهارات").unwrap().0, SectionType::Skills);
        assert_eq!(best_alias_match("Berufserfahrung").unwrap().0, SectionType::Experiences);
    }

    #[test]
    fn disallowed_set_excludes_experience_aliases() {
        assert!(is_disallowed_in_experience("compétences"));
        assert!(is_disallowed_in_experience("FORMATION"));
        assert!(is_disallowed_in_experience("Skills"));
        assert!(!is_disallowed_in_experience("expérience professionnelle"));
    }

    #[test]
    fn normalization_is_casefold_and_nfc() {
        assert_eq!(normalize_header("  FORMATION "), "formation");
        // Decomposed é normalizes to the composed form.
        let decomposed = "e\u{0301}tudes";
        assert_eq!(normalize_header(decomposed), "études");
    }

    #[test]
    fn every_core_section_has_seven_languages() {
        use std::collections::HashSet;
        for section in [SectionType::Experiences, SectionType::Education, SectionType::Skills] {
            let langs: HashSet<_> = HEADER_ALIASES
                .iter()
                .filter(|(s, _, _)| *s == section)
                .map(|(_, l, _)| *l)
                .collect();
            assert!(langs.len() >= 7, "{section} has {} languages", langs.len());
        }
    }
}
