// Dimension-text classification for recognized drawing callouts

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::types::TextType;

static DIA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[⌀Φφ]\s*\d+(\.\d+)?\s*(mm|cm|m)?\s*$").expect("Invalid diameter regex")
});

static RADIUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[Rr]\s*\d+(\.\d+)?\s*(mm|cm|m)?\s*$").expect("Invalid radius regex")
});

static ANGLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+(\.\d+)?\s*°\s*$").expect("Invalid angle regex"));

static LENGTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+(\.\d+)?\s*(mm|cm|m)?\s*$").expect("Invalid length regex")
});

static ROUGHNESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(Ra|RA)\s*\d+(\.\d+)?\s*(μm|um|µm)?\s*$").expect("Invalid roughness regex")
});

// Anything after the size/pitch is a tolerance class or length ("M8x1.25-6H")
static THREAD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*M\d+(\.\d+)?([xX×]\d+(\.\d+)?)?.*$").expect("Invalid thread regex")
});

// Section labels like "A-A"
static SECTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]-[A-Z]$").expect("Invalid section label regex"));

static ALPHABETIC_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("Invalid word regex"));

static GRID_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]$").expect("Invalid grid letter regex"));

static GRID_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}$").expect("Invalid grid number regex"));

static SHORT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}$").expect("Invalid date regex"));

/// Classify a recognized string as a dimension callout.
///
/// Returns `None` for blank text, section labels, plain words, grid letters,
/// `d/d` dates and anything no dimension pattern accepts. Patterns are tried
/// in a fixed order, so "R5" is a radius and never a length.
pub fn classify_text(text: &str) -> Option<TextType> {
    let s = text.trim();
    if s.is_empty() || is_annotation_noise(s) {
        return None;
    }

    let patterns: [(&Lazy<Regex>, TextType); 6] = [
        (&DIA_PATTERN, TextType::Dia),
        (&RADIUS_PATTERN, TextType::R),
        (&ANGLE_PATTERN, TextType::Ang),
        (&LENGTH_PATTERN, TextType::Len),
        (&ROUGHNESS_PATTERN, TextType::Rough),
        (&THREAD_PATTERN, TextType::Thread),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| pattern.is_match(s))
        .map(|(_, text_type)| *text_type)
        .or_else(|| GRID_NUMBER.is_match(s).then_some(TextType::Len))
}

fn is_annotation_noise(s: &str) -> bool {
    SECTION_LABEL.is_match(s)
        || ALPHABETIC_WORD.is_match(s)
        || GRID_LETTER.is_match(s)
        || SHORT_DATE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_types() {
        assert_eq!(classify_text("⌀12"), Some(TextType::Dia));
        assert_eq!(classify_text("Φ 8.5 mm"), Some(TextType::Dia));
        assert_eq!(classify_text("R5"), Some(TextType::R));
        assert_eq!(classify_text("r 2.5mm"), Some(TextType::R));
        assert_eq!(classify_text("45°"), Some(TextType::Ang));
        assert_eq!(classify_text("12.5"), Some(TextType::Len));
        assert_eq!(classify_text("120 mm"), Some(TextType::Len));
        assert_eq!(classify_text("Ra 3.2"), Some(TextType::Rough));
        assert_eq!(classify_text("RA1.6µm"), Some(TextType::Rough));
        assert_eq!(classify_text("M8"), Some(TextType::Thread));
        assert_eq!(classify_text("M10x1.25-6H"), Some(TextType::Thread));
    }

    #[test]
    fn test_noise_is_rejected() {
        assert_eq!(classify_text(""), None);
        assert_eq!(classify_text("   "), None);
        assert_eq!(classify_text("A-A"), None);
        assert_eq!(classify_text("SECTION"), None);
        assert_eq!(classify_text("B"), None);
        assert_eq!(classify_text("12/05"), None);
        assert_eq!(classify_text("note: see detail"), None);
    }

    #[test]
    fn test_bare_letters_never_become_threads() {
        // "M" alone is a plain word, not a thread callout
        assert_eq!(classify_text("M"), None);
    }

    #[test]
    fn test_grid_numbers_are_lengths() {
        assert_eq!(classify_text("7"), Some(TextType::Len));
        assert_eq!(classify_text(" 42 "), Some(TextType::Len));
    }
}
