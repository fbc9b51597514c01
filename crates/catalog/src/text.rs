//! Text normalization shared by catalog input paths (forms and spreadsheet import).

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Remove diacritics: decompose (NFD), drop combining marks, recompose (NFC).
pub fn strip_accents(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Trim, turn hyphens into spaces, strip accents and collapse inner whitespace.
pub fn normalize_text(input: &str) -> String {
    let replaced = input.trim().replace('-', " ");
    strip_accents(&replaced)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First character upper-cased, the rest lower-cased ("el PRINCIPITO" -> "El principito").
pub fn sentence_case(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Every word capitalized ("  juan  PÉREZ " -> "Juan Pérez").
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(sentence_case)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical form of a subject or tag: normalized then sentence-cased.
pub fn canonical_tag(input: &str) -> String {
    sentence_case(&normalize_text(input))
}

/// Split a comma-separated cell or field into trimmed, non-empty parts.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case- and accent-insensitive containment, used by catalog search.
pub fn loosely_contains(haystack: &str, needle: &str) -> bool {
    let needle = strip_accents(needle.trim()).to_lowercase();
    if needle.is_empty() {
        return true;
    }
    strip_accents(haystack).to_lowercase().contains(&needle)
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_spanish_diacritics() {
        assert_eq!(strip_accents("Geográfico Ñandú pingüino"), "Geografico Nandu pinguino");
    }

    #[test]
    fn normalize_replaces_hyphens_and_collapses_spaces() {
        assert_eq!(normalize_text("  Ciencias-Naturales   y  Técnica "), "Ciencias Naturales y Tecnica");
    }

    #[test]
    fn sentence_case_lowers_the_tail() {
        assert_eq!(sentence_case("el PRINCIPITO"), "El principito");
        assert_eq!(sentence_case("   "), "");
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("  juan   PÉREZ "), "Juan Pérez");
    }

    #[test]
    fn canonical_tag_merges_spelling_variants() {
        assert_eq!(canonical_tag("MATEMÁTICA"), canonical_tag("matematica"));
        assert_eq!(canonical_tag("ciencias-sociales"), "Ciencias sociales");
    }

    #[test]
    fn split_list_drops_empty_parts() {
        assert_eq!(split_list("1°, 2°,, ,3°"), vec!["1°", "2°", "3°"]);
    }

    #[test]
    fn loose_match_ignores_case_and_accents() {
        assert!(loosely_contains("Atlas Geográfico Escolar", "geografico"));
        assert!(loosely_contains("anything", "  "));
        assert!(!loosely_contains("El principito", "atlas"));
    }
}
