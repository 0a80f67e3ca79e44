//! Text normalization.

use unicode_normalization::UnicodeNormalization;

/// Normalize free text: decompose (NFKD), drop everything outside ASCII
/// (diacritics included), then collapse whitespace runs to a single space.
///
/// ```
/// use boardsync::validation::normalize_text;
/// assert_eq!(normalize_text("Café   test"), "Cafe test");
/// ```
pub fn normalize_text(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    ascii.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics_and_collapses_spaces() {
        assert_eq!(normalize_text("Café   test"), "Cafe test");
        assert_eq!(normalize_text("  Ñandú\t\nrío "), "Nandu rio");
    }

    #[test]
    fn test_non_latin_becomes_empty() {
        assert_eq!(normalize_text("東京"), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_compatibility_forms() {
        // NFKD folds ligatures and full-width forms
        assert_eq!(normalize_text("ﬁne ＡＢＣ"), "fine ABC");
    }
}
