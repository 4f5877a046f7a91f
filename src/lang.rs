//! Script and reading-order detection utilities.

use crate::types::ReadingOrder;

/// True for characters in the Arabic/Hebrew (and related) RTL blocks.
#[must_use]
pub fn is_rtl_char(c: char) -> bool {
    matches!(c,
        '\u{0590}'..='\u{05FF}'   // Hebrew
        | '\u{0600}'..='\u{06FF}' // Arabic
        | '\u{0750}'..='\u{077F}' // Arabic Supplement
        | '\u{FB50}'..='\u{FDFF}' // Arabic Presentation Forms-A
    )
}

/// True for CJK ideographs and kana.
#[must_use]
pub fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3040}'..='\u{30FF}' // Hiragana + Katakana
        | '\u{AC00}'..='\u{D7AF}' // Hangul
    )
}

/// Infer reading order from the ratio of RTL-range characters to letters.
///
/// `Rtl` above 0.7, `Mixed` above 0.4, `Ltr` otherwise. Documents without
/// letters default to `Ltr`.
#[must_use]
pub fn detect_reading_order(lines: &[String]) -> ReadingOrder {
    let mut rtl = 0usize;
    let mut ltr = 0usize;

    for line in lines {
        for c in line.chars() {
            if is_rtl_char(c) {
                rtl += 1;
            } else if c.is_alphabetic() {
                ltr += 1;
            }
        }
    }

    let total = rtl + ltr;
    if total == 0 {
        return ReadingOrder::Ltr;
    }

    let ratio = rtl as f64 / total as f64;
    if ratio > 0.7 {
        ReadingOrder::Rtl
    } else if ratio > 0.4 {
        ReadingOrder::Mixed
    } else {
        ReadingOrder::Ltr
    }
}

/// Best-effort ISO-639-1 code for non-Latin script content in `text`.
///
/// Latin-script languages are not distinguished here; header alias matches
/// carry their own language tags.
#[must_use]
pub fn detect_script_language(text: &str) -> Option<&'static str> {
    for c in text.chars() {
        match c {
            '\u{0600}'..='\u{06FF}' => return Some("ar"),
            '\u{0590}'..='\u{05FF}' => return Some("he"),
            '\u{4E00}'..='\u{9FFF}' => return Some("zh"),
            '\u{3040}'..='\u{30FF}' => return Some("ja"),
            '\u{AC00}'..='\u{D7AF}' => return Some("ko"),
            '\u{0400}'..='\u{04FF}' => return Some("ru"),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn latin_text_is_ltr() {
        assert_eq!(
            detect_reading_order(&lines(&["Senior developer at TechCorp"])),
            ReadingOrder::Ltr
        );
    }

    #[test]
    fn arabic_text_is_rtl() {
        assert_eq!(
            detect_reading_order(&lines(&["الخبرة المهنية", "التعليم"])),
            ReadingOrder::Rtl
        );
    }

    #[test]
    fn balanced_script_is_mixed() {
        // Roughly half RTL, half Latin letters.
        assert_eq!(
            detect_reading_order(&lines(&["خبرة عمل", "work exp"])),
            ReadingOrder::Mixed
        );
    }

    #[test]
    fn empty_defaults_to_ltr() {
        assert_eq!(detect_reading_order(&[]), ReadingOrder::Ltr);
        assert_eq!(detect_reading_order(&lines(&["1234 --- !!!"])), ReadingOrder::Ltr);
    }

    #[test]
    fn script_language_detection() {
        assert_eq!(detect_script_language("工作经验"), Some("zh"));
        assert_eq!(detect_script_language("השכלה"), Some("he"));
        assert_eq!(detect_script_language("plain text"), None);
    }
}
