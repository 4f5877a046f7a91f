//! Classification oracle interface, deterministic mock, and result cache.
//!
//! The core consumes ML classifiers through this narrow interface only:
//! per-line zero-shot section classification and per-line NER tagging.
//! Implementations must be deterministic (same input, same output), which
//! makes results safe to cache and the pipeline a pure function of its
//! inputs. [`HeuristicOracle`] is the first-class offline substitute used
//! when no ML backend is available; the pipeline falls back to it when a
//! real oracle errors.

use crate::error::Result;
use crate::headers::best_alias_match;
use crate::phases::entities::EntityLabel;
use crate::types::SectionType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// One per-line section classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionPrediction {
    /// Best label.
    pub label: SectionType,
    /// Best label's score.
    pub score: f64,
    /// Full label distribution.
    pub scores: Vec<(SectionType, f64)>,
}

/// One tagged entity span within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSpan {
    /// Entity label.
    pub label: EntityLabel,
    /// Surface text.
    pub word: String,
    /// Byte offset start within the line.
    pub start: usize,
    /// Byte offset end (exclusive).
    pub end: usize,
    /// Model score in [0, 1].
    pub score: f64,
}

/// Narrow interface to the external classification service.
///
/// Implementations are required to be deterministic for identical input;
/// the caller may wrap them with its own cache or thread pool without
/// affecting core correctness.
pub trait Oracle: Send + Sync {
    /// Classify each line into the section vocabulary.
    fn classify_lines(&self, lines: &[String]) -> Result<Vec<SectionPrediction>>;

    /// Tag named entities per line.
    fn tag_entities(&self, lines: &[String]) -> Result<Vec<Vec<TaggedSpan>>>;

    /// Implementation name for logs.
    fn name(&self) -> &'static str;

    /// Whether the backend is usable right now.
    fn is_available(&self) -> bool {
        true
    }
}

static ORG_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:[A-ZÀ-Þ][\w&'-]+(?:\s+[A-ZÀ-Þ][\w&'-]+)*\s+(?i:inc|corp|corporation|ltd|llc|gmbh|sarl|sas|plc)\.?)|(?:(?i:université|university|école|institut|institute|college)\s+(?:[\w'-]+\s*)+)|(?:(?i:chez|at)\s+([A-ZÀ-Þ][\w&'-]+))",
    )
    .unwrap()
});

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}\s*[-–—]\s*(?:\d{4}|(?i:present|présent|actuel|ongoing))\b|\b\d{1,2}/\d{4}\b|\b(?:19|20)\d{2}\b")
        .unwrap()
});

static ROLE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)développeur|developer|ingénieur|engineer|consultant").unwrap()
});

/// Deterministic offline oracle built from the crate's own heuristics.
///
/// Section classification reuses the multilingual header tables plus
/// lightweight content cues; entity tagging extracts organization-shaped
/// and date-shaped spans. Scores are fixed functions of the input, so the
/// mock satisfies the determinism contract trivially.
#[derive(Debug, Clone, Default)]
pub struct HeuristicOracle;

impl HeuristicOracle {
    /// Create the mock oracle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn classify_line(&self, line: &str) -> SectionPrediction {
        if let Some((section, _, similarity)) = best_alias_match(line) {
            if similarity > 0.5 {
                let score = 0.6 + 0.3 * similarity;
                return SectionPrediction {
                    label: section,
                    score,
                    scores: vec![(section, score), (SectionType::Other, 1.0 - score)],
                };
            }
        }

        // Content cues, weakest-first fallbacks.
        let lower = line.to_lowercase();
        let (label, score) = if DATE_SHAPE.is_match(line) && ROLE_SHAPE.is_match(&lower) {
            (SectionType::Experiences, 0.55)
        } else if lower.contains("université") || lower.contains("university") {
            (SectionType::Education, 0.55)
        } else {
            (SectionType::Other, 0.4)
        };

        SectionPrediction {
            label,
            score,
            scores: vec![(label, score), (SectionType::Unknown, 1.0 - score)],
        }
    }
}

impl Oracle for HeuristicOracle {
    fn classify_lines(&self, lines: &[String]) -> Result<Vec<SectionPrediction>> {
        Ok(lines.iter().map(|l| self.classify_line(l)).collect())
    }

    fn tag_entities(&self, lines: &[String]) -> Result<Vec<Vec<TaggedSpan>>> {
        let tagged = lines
            .iter()
            .map(|line| {
                let mut spans = Vec::new();
                for m in ORG_SHAPE.find_iter(line) {
                    spans.push(TaggedSpan {
                        label: EntityLabel::Org,
                        word: m.as_str().to_string(),
                        start: m.start(),
                        end: m.end(),
                        score: 0.75,
                    });
                }
                for m in DATE_SHAPE.find_iter(line) {
                    let overlaps = spans
                        .iter()
                        .any(|s: &TaggedSpan| !(m.end() <= s.start || s.end <= m.start()));
                    if !overlaps {
                        spans.push(TaggedSpan {
                            label: EntityLabel::Date,
                            word: m.as_str().to_string(),
                            start: m.start(),
                            end: m.end(),
                            score: 0.9,
                        });
                    }
                }
                spans
            })
            .collect();
        Ok(tagged)
    }

    fn name(&self) -> &'static str {
        "heuristic-mock"
    }
}

/// Caller-owned, bounded LRU cache for oracle classifications.
///
/// Keyed by a hash of the input lines. Thread-safe; eviction is
/// least-recently-used with a small fixed capacity (default 3 entries, the
/// reference design's size). The cache is explicit and injected; the core
/// holds no process-wide state.
#[derive(Debug)]
pub struct ClassifierCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<u64, Vec<SectionPrediction>>,
    order: VecDeque<u64>,
}

impl Default for ClassifierCache {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ClassifierCache {
    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn key(lines: &[String]) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        lines.hash(&mut hasher);
        hasher.finish()
    }

    /// Fetch a cached classification, refreshing its recency.
    #[must_use]
    pub fn get(&self, lines: &[String]) -> Option<Vec<SectionPrediction>> {
        let key = Self::key(lines);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if let Some(value) = inner.entries.get(&key).cloned() {
            inner.order.retain(|k| *k != key);
            inner.order.push_back(key);
            return Some(value);
        }
        None
    }

    /// Insert a classification, evicting the least-recently-used entry.
    pub fn put(&self, lines: &[String], value: Vec<SectionPrediction>) {
        let key = Self::key(lines);
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| *k != key);
        } else if inner.entries.len() >= self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.entries.remove(&evicted);
            }
        }
        inner.entries.insert(key, value);
        inner.order.push_back(key);
    }

    /// Classify through the cache.
    pub fn classify_cached(
        &self,
        oracle: &dyn Oracle,
        lines: &[String],
    ) -> Result<Vec<SectionPrediction>> {
        if let Some(cached) = self.get(lines) {
            return Ok(cached);
        }
        let fresh = oracle.classify_lines(lines)?;
        self.put(lines, fresh.clone());
        Ok(fresh)
    }

    /// Current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    /// True when the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mock_is_deterministic() {
        let oracle = HeuristicOracle::new();
        let lines = doc(&["EXPÉRIENCES", "Développeur chez TechCorp", "2020-2023"]);
        let first = oracle.classify_lines(&lines).unwrap();
        let second = oracle.classify_lines(&lines).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            oracle.tag_entities(&lines).unwrap(),
            oracle.tag_entities(&lines).unwrap()
        );
    }

    #[test]
    fn mock_classifies_headers() {
        let oracle = HeuristicOracle::new();
        let predictions = oracle
            .classify_lines(&doc(&["EXPÉRIENCES", "FORMATION", "texte libre"]))
            .unwrap();
        assert_eq!(predictions[0].label, SectionType::Experiences);
        assert_eq!(predictions[1].label, SectionType::Education);
        assert_eq!(predictions[2].label, SectionType::Other);
    }

    #[test]
    fn mock_tags_org_and_date_spans() {
        let oracle = HeuristicOracle::new();
        let tagged = oracle
            .tag_entities(&doc(&["Développeur chez TechCorp, 2020-2023"]))
            .unwrap();
        let spans = &tagged[0];
        assert!(spans.iter().any(|s| s.label == EntityLabel::Org));
        assert!(spans.iter().any(|s| s.label == EntityLabel::Date));
    }

    #[test]
    fn cache_hits_and_evicts_lru() {
        let cache = ClassifierCache::new(2);
        let oracle = HeuristicOracle::new();

        let a = doc(&["EXPÉRIENCES"]);
        let b = doc(&["FORMATION"]);
        let c = doc(&["COMPÉTENCES"]);

        cache.classify_cached(&oracle, &a).unwrap();
        cache.classify_cached(&oracle, &b).unwrap();
        assert_eq!(cache.len(), 2);

        // Touch `a` so `b` is the LRU victim.
        assert!(cache.get(&a).is_some());
        cache.classify_cached(&oracle, &c).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
    }

    #[test]
    fn default_capacity_is_three() {
        let cache = ClassifierCache::default();
        let oracle = HeuristicOracle::new();
        for text in ["a", "b", "c", "d"] {
            cache.classify_cached(&oracle, &doc(&[text])).unwrap();
        }
        assert_eq!(cache.len(), 3);
    }
}
