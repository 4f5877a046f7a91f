//! Phase 4: soft-skill / interest separation.
//!
//! Skill and interest lists arrive mixed: "communication, leadership,
//! football, cuisine" under one header. Two multilingual lexicons decide
//! the clear cases outright; ambiguous terms are resolved by the
//! surrounding context, and items neither lexicon nor context can place
//! remain `Ambiguous`, reported rather than silently dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Classification category for one extracted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    /// Workplace soft skill.
    SoftSkill,
    /// Personal hobby or interest.
    Interest,
    /// Unresolved by lexicon and context.
    Ambiguous,
}

/// One classified skill/interest item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInterestClassification {
    /// Item text as extracted.
    pub text: String,
    /// Category decision.
    pub category: SkillCategory,
    /// Decision confidence in [0, 1].
    pub confidence: f64,
}

static SOFT_SKILLS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // fr
        "communication",
        "leadership",
        "travail d'équipe",
        "travail d'equipe",
        "esprit d'équipe",
        "créativité",
        "creativite",
        "rigueur",
        "autonomie",
        "adaptabilité",
        "adaptabilite",
        "organisation",
        "gestion du temps",
        "esprit critique",
        "innovation",
        "négociation",
        "empathie",
        "pédagogie",
        // en
        "teamwork",
        "problem solving",
        "critical thinking",
        "time management",
        "creativity",
        "adaptability",
        "collaboration",
        "negotiation",
        "mentoring",
        "public speaking",
        // es / de
        "trabajo en equipo",
        "comunicación",
        "liderazgo",
        "teamfähigkeit",
        "kommunikation",
        "kreativität",
    ]
    .into_iter()
    .collect()
});

static INTERESTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // fr
        "football",
        "cuisine",
        "photographie",
        "voyage",
        "voyages",
        "lecture",
        "jardinage",
        "randonnée",
        "randonnee",
        "musique",
        "cinéma",
        "cinema",
        "théâtre",
        "theatre",
        "natation",
        "course à pied",
        "bénévolat",
        "benevolat",
        "échecs",
        "dessin",
        "peinture",
        // en
        "reading",
        "travel",
        "traveling",
        "photography",
        "cooking",
        "hiking",
        "gardening",
        "chess",
        "swimming",
        "running",
        "volunteering",
        "gaming",
        "music",
        // es / de
        "fútbol",
        "viajes",
        "fotografía",
        "reisen",
        "fotografie",
        "kochen",
        // sports
        "tennis",
        "basketball",
        "volleyball",
        "yoga",
        "escalade",
    ]
    .into_iter()
    .collect()
});

static PROFESSIONAL_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:compétences?|skills?|professionnel(?:les?)?|professional|management|équipe|team|projet|project|client|entreprise|qualités|aptitudes)\b",
    )
    .unwrap()
});

static PERSONAL_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:loisirs?|hobbies|hobby|centres?\s+d.int[ée]r[êe]ts?|interests?|passion|passions|temps\s+libre|week-?end|personnel(?:les?)?|personal)\b",
    )
    .unwrap()
});

static ITEM_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;•·]|^\s*[-+*]\s*").unwrap());

/// Context verdict used to resolve lexicon-ambiguous terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextLean {
    /// Surrounding text reads professional.
    Professional,
    /// Surrounding text reads personal/leisure.
    Personal,
    /// No usable signal.
    Neutral,
}

/// Analyze surrounding text for a professional-vs-personal lean.
#[must_use]
pub fn analyze_context(context: &str) -> ContextLean {
    let professional = PROFESSIONAL_CONTEXT.find_iter(context).count();
    let personal = PERSONAL_CONTEXT.find_iter(context).count();
    if professional > personal {
        ContextLean::Professional
    } else if personal > professional {
        ContextLean::Personal
    } else {
        ContextLean::Neutral
    }
}

/// Classify one item against the lexicons, with optional context lines.
///
/// A lexicon hit wins outright: "communication" stays a soft skill even
/// inside an interests section. Context only decides terms the lexicons
/// do not know.
#[must_use]
pub fn classify_skill_or_interest(
    text: &str,
    context_lines: Option<&[String]>,
) -> SkillInterestClassification {
    let normalized = text.trim().to_lowercase();
    let in_skills = SOFT_SKILLS.contains(normalized.as_str());
    let in_interests = INTERESTS.contains(normalized.as_str());

    let (category, confidence) = match (in_skills, in_interests) {
        (true, false) => (SkillCategory::SoftSkill, 0.9),
        (false, true) => (SkillCategory::Interest, 0.9),
        _ => {
            // Neither or both: fall back to context.
            let lean = context_lines
                .map(|lines| analyze_context(&lines.join(" ")))
                .unwrap_or(ContextLean::Neutral);
            match lean {
                ContextLean::Professional => (SkillCategory::SoftSkill, 0.6),
                ContextLean::Personal => (SkillCategory::Interest, 0.6),
                ContextLean::Neutral => (SkillCategory::Ambiguous, 0.3),
            }
        }
    };

    SkillInterestClassification {
        text: text.trim().to_string(),
        category,
        confidence,
    }
}

/// Separate a mixed item list into skills, interests, and ambiguous leftovers.
#[must_use]
pub fn separate_skills_and_interests(
    items: &[String],
    context_lines: &[String],
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut skills = Vec::new();
    let mut interests = Vec::new();
    let mut ambiguous = Vec::new();

    for item in items {
        let classification = classify_skill_or_interest(item, Some(context_lines));
        match classification.category {
            SkillCategory::SoftSkill => skills.push(classification.text),
            SkillCategory::Interest => interests.push(classification.text),
            SkillCategory::Ambiguous => ambiguous.push(classification.text),
        }
    }

    log::debug!(
        "skills: separated {} items → {} skills / {} interests / {} ambiguous",
        items.len(),
        skills.len(),
        interests.len(),
        ambiguous.len()
    );
    (skills, interests, ambiguous)
}

/// Extract individual items from a section's lines.
///
/// Splits on commas, semicolons, and bullet markers; header-formatted
/// lines are dropped.
#[must_use]
pub fn extract_items(lines: &[String]) -> Vec<String> {
    let mut items = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if crate::layout::caps_ratio(trimmed) >= 0.6 || trimmed.ends_with(':') {
            continue; // header line
        }
        for part in ITEM_SPLIT.split(trimmed) {
            let part = part.trim().trim_start_matches(['-', '+', '*', '•']).trim();
            if part.chars().count() > 1 {
                items.push(part.to_string());
            }
        }
    }
    items
}
