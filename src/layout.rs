//! Layout structure analysis.
//!
//! Infers, once per document, everything later stages need to know about
//! the page: script direction, column count and barriers, header spans,
//! contact-block quarantine zones, dominant date position, and timeline or
//! table shape. Missing or empty input yields `LayoutStructure::default()`;
//! this module never errors.

use crate::config::ExtractionThresholds;
use crate::headers::{best_alias_match, strip_header_decoration};
use crate::lang::detect_reading_order;
use crate::types::{
    ContactBlock, ContactKind, DatePosition, HeaderSpan, LayoutStructure, LineCoordinate,
    SectionType,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{1,4}\)[\s.-]?)?\d{2,4}(?:[\s.-]?\d{2,4}){2,4}")
        .unwrap()
});
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+|\bwww\.\S+").unwrap());
static ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:street|avenue|road|lane|drive|boulevard|rue|chemin|place|str\.|ave\.|blvd)\b",
    )
    .unwrap()
});

/// Date patterns shared by position and timeline analysis.
static DATE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{4}\s*[-–—]\s*(?:\d{4}|present|présent|actuel|ongoing|current)\b
        | \b\d{1,2}/\d{4}\b
        | \b\d{1,2}/\d{1,2}/\d{4}\b
        | \b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec|janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)\w*\s+\d{4}\b
        | \b(?:19|20)\d{2}\b",
    )
    .unwrap()
});

static ACTION_VERBS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:managed|developed|created|designed|led|built|responsible|responsibilities|géré|développé|créé|conçu|dirigé|encadré|desarrolló|creó|gestionó)\b",
    )
    .unwrap()
});

static MULTI_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{3,}").unwrap());

/// True when a line contains any date-like pattern.
#[must_use]
pub fn contains_date(line: &str) -> bool {
    DATE_HINT.is_match(line)
}

/// Ratio of uppercase letters among the line's letters; headers are
/// caps-heavy at 0.6 and above.
#[must_use]
pub fn caps_ratio(line: &str) -> f64 {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return 0.0;
    }
    letters.iter().filter(|c| c.is_uppercase()).count() as f64 / letters.len() as f64
}

/// Layout analyzer over raw document lines and optional coordinates.
#[derive(Debug, Clone)]
pub struct LayoutAnalyzer {
    config: ExtractionThresholds,
}

impl Default for LayoutAnalyzer {
    fn default() -> Self {
        Self::new(ExtractionThresholds::default())
    }
}

impl LayoutAnalyzer {
    /// Create an analyzer with the given thresholds.
    #[must_use]
    pub fn new(config: ExtractionThresholds) -> Self {
        Self { config }
    }

    /// Analyze a document. Empty input yields the default structure.
    #[must_use]
    pub fn analyze(
        &self,
        lines: &[String],
        coordinates: Option<&[LineCoordinate]>,
    ) -> LayoutStructure {
        if lines.is_empty() {
            return LayoutStructure::default();
        }

        let reading_order = detect_reading_order(lines);
        let (columns, column_barriers) = self.detect_columns(lines, coordinates);
        let header_spans = self.detect_headers(lines);
        let date_position = self.analyze_date_position(lines);
        let is_inverted = self.detect_inversion(lines, &header_spans);
        let contact_blocks = self.detect_contact_blocks(lines);
        let contact_block_range = contact_blocks
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|b| (b.start_line, b.end_line));
        let contact_quarantine_zones = self.quarantine_zones(&contact_blocks);
        let is_timeline = self.detect_timeline(lines);
        let is_table = detect_table(lines);
        let layout_confidence = self.layout_confidence(lines, &header_spans, columns);

        if let Some((start, end)) = contact_block_range {
            log::info!("layout: contact block at lines {start}-{end}");
        }
        log::debug!(
            "layout: columns={columns} reading_order={reading_order:?} \
             date_position={date_position:?} headers={} confidence={layout_confidence:.3}",
            header_spans.len()
        );

        LayoutStructure {
            reading_order,
            columns,
            column_barriers,
            header_spans,
            date_position,
            is_inverted,
            contact_block_range,
            contact_quarantine_zones,
            is_timeline,
            is_table,
            layout_confidence,
        }
    }

    // ---- columns ----

    fn detect_columns(
        &self,
        lines: &[String],
        coordinates: Option<&[LineCoordinate]>,
    ) -> (usize, Vec<(f32, f32)>) {
        // Coordinates only count when they cover every line.
        if let Some(coords) = coordinates {
            if coords.len() == lines.len() && coords.len() >= 3 {
                let xs: Vec<f32> = coords.iter().map(|c| c.x).collect();
                let clusters = cluster_positions(&xs, self.config.column_cluster_tolerance);
                if clusters.len() > 1 {
                    let barriers = clusters
                        .iter()
                        .map(|c| {
                            let min = c.iter().copied().fold(f32::INFINITY, f32::min);
                            let max = c.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                            (min, max)
                        })
                        .collect();
                    return (clusters.len(), barriers);
                }
                return (1, Vec::new());
            }
        }
        (self.detect_columns_by_indentation(lines), Vec::new())
    }

    fn detect_columns_by_indentation(&self, lines: &[String]) -> usize {
        let mut counts: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        let mut non_empty = 0usize;
        for line in lines {
            let stripped = line.trim_start();
            if stripped.is_empty() {
                continue;
            }
            non_empty += 1;
            let indent = line.len() - stripped.len();
            *counts.entry(indent).or_insert(0) += 1;
        }
        if non_empty == 0 {
            return 1;
        }
        let floor = 3.max(non_empty / 10);
        let levels = counts.values().filter(|&&c| c >= floor).count();
        if levels >= 2 {
            levels.min(3)
        } else {
            1
        }
    }

    // ---- headers ----

    fn detect_headers(&self, lines: &[String]) -> Vec<HeaderSpan> {
        let mut headers = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.chars().count() > 100 {
                continue;
            }

            let caps_heavy = caps_ratio(trimmed) >= 0.6;
            let colon = trimmed.ends_with(':');
            let alias = best_alias_match(trimmed);
            let alias_ok = alias.as_ref().map_or(false, |(_, _, s)| *s > 0.5);

            if !(caps_heavy || colon || alias_ok) {
                continue;
            }

            let (section, language) = match &alias {
                Some((section, language, score)) if *score > 0.5 => {
                    (*section, (*language).to_string())
                }
                _ => (SectionType::Unknown, "unknown".to_string()),
            };

            let mut confidence: f64 = 0.1; // standalone line
            if caps_heavy {
                confidence += 0.3;
            }
            if colon {
                confidence += 0.2;
            }
            if alias_ok {
                confidence += 0.4;
            }
            if strip_header_decoration(trimmed).chars().count() > 50 {
                confidence -= 0.2;
            }

            headers.push(HeaderSpan {
                start_line: i,
                end_line: i,
                text: trimmed.to_string(),
                section,
                confidence: confidence.clamp(0.0, 1.0),
                language,
            });
        }

        headers
    }

    // ---- contact quarantine ----

    fn detect_contact_blocks(&self, lines: &[String]) -> Vec<ContactBlock> {
        const WINDOW: usize = 5;
        let scan_end = self.config.header_detection_window.min(lines.len());
        let mut blocks = Vec::new();

        let mut start = 0usize;
        while start < scan_end {
            let end = (start + WINDOW).min(scan_end);
            if let Some(block) = analyze_contact_window(lines, start, end) {
                if block.density >= self.config.contact_density_threshold {
                    blocks.push(block);
                }
            }
            start += WINDOW / 2; // overlapping windows
        }

        merge_contact_blocks(blocks)
    }

    fn quarantine_zones(&self, blocks: &[ContactBlock]) -> Vec<(usize, usize)> {
        let mut zones: Vec<(usize, usize)> = blocks
            .iter()
            .map(|b| (b.start_line, b.end_line + self.config.contact_post_buffer_lines))
            .collect();
        zones.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in zones {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end + 1 => {
                    *last_end = (*last_end).max(end);
                }
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    // ---- date position ----

    fn analyze_date_position(&self, lines: &[String]) -> DatePosition {
        let mut before = 0usize;
        let mut after = 0usize;

        for (i, line) in lines.iter().enumerate() {
            if !contains_date(line) {
                continue;
            }
            let context_before = lines[i.saturating_sub(2)..i].join(" ");
            let context_after = lines[(i + 1).min(lines.len())..(i + 4).min(lines.len())].join(" ");

            let before_score = content_likelihood(&context_before);
            let after_score = content_likelihood(&context_after);

            // Descriptive content after the date means the date leads its entry.
            if after_score > before_score {
                before += 1;
            } else if before_score > after_score {
                after += 1;
            }
        }

        let total = before + after;
        if total == 0 {
            return DatePosition::Mixed;
        }
        let ratio = before as f64 / total as f64;
        if ratio > 0.7 {
            DatePosition::BeforeContent
        } else if ratio < 0.3 {
            DatePosition::AfterContent
        } else {
            DatePosition::Mixed
        }
    }

    fn detect_inversion(&self, lines: &[String], headers: &[HeaderSpan]) -> bool {
        let mut inverted = 0usize;
        let mut sections = 0usize;

        for header in headers {
            let start = header.start_line + 1;
            let section_lines = &lines[start.min(lines.len())..(start + 5).min(lines.len())];
            if section_lines.len() < 3 {
                continue;
            }
            sections += 1;
            let first_has_date = contains_date(&section_lines[0]);
            let later_content = section_lines[1..3.min(section_lines.len())]
                .iter()
                .any(|l| l.trim().chars().count() > 20 && !contains_date(l));
            if first_has_date && later_content {
                inverted += 1;
            }
        }

        sections > 0 && inverted as f64 / sections as f64 > 0.6
    }

    // ---- timeline ----

    fn detect_timeline(&self, lines: &[String]) -> bool {
        if lines.is_empty() {
            return false;
        }
        let connectors = ['|', '→', '▶', '►', '●', '•'];
        let mut date_lines = 0usize;
        let mut connector_lines = 0usize;
        for line in lines {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if contains_date(text) {
                date_lines += 1;
            }
            if text.chars().any(|c| connectors.contains(&c)) {
                connector_lines += 1;
            }
        }
        let total = lines.len() as f64;
        let density = (date_lines as f64 / total + connector_lines as f64 / total) / 2.0;
        density >= self.config.timeline_density_threshold
    }

    // ---- confidence ----

    fn layout_confidence(&self, lines: &[String], headers: &[HeaderSpan], columns: usize) -> f64 {
        let mut confidence = 0.0;
        if !headers.is_empty() {
            confidence += 0.3;
            let avg: f64 =
                headers.iter().map(|h| h.confidence).sum::<f64>() / headers.len() as f64;
            confidence += avg * 0.3;
        }
        if columns > 1 {
            confidence += 0.2;
        }
        if lines.iter().filter(|l| !l.trim().is_empty()).count() > 10 {
            confidence += 0.2;
        }
        confidence.min(1.0)
    }
}

/// Content-likelihood score for date-position analysis.
///
/// Rewards length and action-verb vocabulary, penalizes header formatting.
fn content_likelihood(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    let mut score = (text.chars().count() as f64 / 100.0).min(0.5);
    score += 0.2 * ACTION_VERBS.find_iter(text).count().min(3) as f64;
    if caps_ratio(text) >= 0.6 || text.contains(':') {
        score -= 0.3;
    }
    score.max(0.0)
}

fn analyze_contact_window(lines: &[String], start: usize, end: usize) -> Option<ContactBlock> {
    let window = &lines[start..end];
    let mut contact_lines = 0usize;
    let mut total = 0usize;
    let mut types = BTreeSet::new();

    for line in window {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        total += 1;
        let mut hit = false;
        if EMAIL.is_match(text) {
            types.insert(ContactKind::Email);
            hit = true;
        }
        if PHONE.is_match(text) {
            types.insert(ContactKind::Phone);
            hit = true;
        }
        if URL.is_match(text) {
            types.insert(ContactKind::Url);
            hit = true;
        }
        if ADDRESS.is_match(text) {
            types.insert(ContactKind::Address);
            hit = true;
        }
        if hit {
            contact_lines += 1;
        }
    }

    if total == 0 {
        return None;
    }

    let density = contact_lines as f64 / total as f64;
    let confidence = (density * (types.len() as f64 / 4.0)).min(1.0);
    Some(ContactBlock {
        start_line: start,
        end_line: end - 1,
        density,
        types,
        confidence,
    })
}

fn merge_contact_blocks(mut blocks: Vec<ContactBlock>) -> Vec<ContactBlock> {
    if blocks.is_empty() {
        return blocks;
    }
    blocks.sort_by_key(|b| b.start_line);
    let mut merged: Vec<ContactBlock> = Vec::new();
    for block in blocks {
        match merged.last_mut() {
            Some(last) if block.start_line <= last.end_line + 1 => {
                last.end_line = last.end_line.max(block.end_line);
                last.density = last.density.max(block.density);
                last.confidence = last.confidence.max(block.confidence);
                last.types.extend(block.types.iter().copied());
            }
            _ => merged.push(block),
        }
    }
    merged
}

/// Cluster sorted scalar positions within `tolerance` of the cluster mean.
fn cluster_positions(values: &[f32], tolerance: f32) -> Vec<Vec<f32>> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mut clusters: Vec<Vec<f32>> = vec![vec![sorted[0]]];
    for &v in &sorted[1..] {
        let (idx, dist) = clusters
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let center = c.iter().sum::<f32>() / c.len() as f32;
                (i, (v - center).abs())
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .expect("at least one cluster");
        if dist <= tolerance {
            clusters[idx].push(v);
        } else {
            clusters.push(vec![v]);
        }
    }
    clusters
}

/// Table shape: at least 30% of lines carry 2+ tabs or 2+ long space runs.
fn detect_table(lines: &[String]) -> bool {
    if lines.is_empty() {
        return false;
    }
    let separated = lines
        .iter()
        .filter(|line| {
            line.matches('\t').count() >= 2 || MULTI_SPACE_RUN.find_iter(line).count() >= 2
        })
        .count();
    separated as f64 / lines.len() as f64 >= 0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_input_yields_default() {
        let layout = LayoutAnalyzer::default().analyze(&[], None);
        assert_eq!(layout, LayoutStructure::default());
    }

    #[test]
    fn detects_multilingual_headers() {
        let lines = doc(&[
            "EXPÉRIENCES PROFESSIONNELLES",
            "Développeur Senior - TechCorp",
            "",
            "FORMATION",
            "Master Informatique",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        let sections: Vec<_> = layout.header_spans.iter().map(|h| h.section).collect();
        assert!(sections.contains(&SectionType::Experiences));
        assert!(sections.contains(&SectionType::Education));
    }

    #[test]
    fn header_confidence_components() {
        let lines = doc(&["COMPÉTENCES:"]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        let header = &layout.header_spans[0];
        // caps (+0.3) + colon (+0.2) + alias (+0.4) + standalone (+0.1)
        assert!(header.confidence > 0.9);
        assert_eq!(header.language, "fr");
    }

    #[test]
    fn contact_block_is_quarantined_with_buffer() {
        let lines = doc(&[
            "Jean Dupont",
            "jean.dupont@example.com",
            "+33 6 12 34 56 78",
            "https://example.com/jean",
            "12 rue de la Paix, Paris",
            "",
            "EXPÉRIENCES",
            "Développeur - TechCorp",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        assert!(layout.contact_block_range.is_some());
        assert!(!layout.contact_quarantine_zones.is_empty());
        let (_, end) = layout.contact_quarantine_zones[0];
        // Post buffer extends 8 lines past the block end.
        assert!(end >= 4 + 8);
        assert!(layout.is_quarantined(2));
    }

    #[test]
    fn clean_document_has_no_quarantine() {
        let lines = doc(&[
            "EXPÉRIENCES",
            "Développeur Senior - TechCorp",
            "2020-2023",
            "Missions de développement web",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        assert!(layout.contact_quarantine_zones.is_empty());
    }

    #[test]
    fn coordinates_drive_column_detection() {
        let lines = doc(&["left a", "right a", "left b", "right b", "left c", "right c"]);
        let coords: Vec<LineCoordinate> = [10.0, 300.0, 12.0, 305.0, 11.0, 298.0]
            .iter()
            .map(|&x| LineCoordinate { x, y: 0.0 })
            .collect();
        let layout = LayoutAnalyzer::default().analyze(&lines, Some(&coords));
        assert_eq!(layout.columns, 2);
        assert_eq!(layout.column_barriers.len(), 2);
    }

    #[test]
    fn mismatched_coordinates_are_ignored() {
        let lines = doc(&["a", "b", "c", "d"]);
        let coords = vec![LineCoordinate { x: 0.0, y: 0.0 }];
        let layout = LayoutAnalyzer::default().analyze(&lines, Some(&coords));
        assert_eq!(layout.columns, 1);
    }

    #[test]
    fn date_before_content_detected() {
        let lines = doc(&[
            "2020 - 2023",
            "Développeur senior, géré une équipe de cinq personnes et développé",
            "une plateforme de traitement documentaire pour des clients grands comptes",
            "2018 - 2020",
            "Consultant, créé des outils internes et développé des intégrations",
            "pour les équipes support avec des responsabilités transverses",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        assert_eq!(layout.date_position, DatePosition::BeforeContent);
    }

    #[test]
    fn timeline_shape_detection() {
        let lines = doc(&[
            "2020 - 2021 | Developer",
            "2019 - 2020 | Intern",
            "2018 - 2019 | Student",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        assert!(layout.is_timeline);
    }

    #[test]
    fn table_shape_detection() {
        let lines = doc(&[
            "Skill\t\tLevel\t\tYears",
            "Rust\t\tExpert\t\t5",
            "Python\t\tAdvanced\t\t8",
        ]);
        let layout = LayoutAnalyzer::default().analyze(&lines, None);
        assert!(layout.is_table);
    }
}
