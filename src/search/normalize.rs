//! Text normalization for accent- and case-insensitive comparison

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, decompose (NFD) and drop combining marks.
///
/// Lowercasing happens before decomposition so characters whose lowercase
/// form carries a combining mark (e.g. `İ`) are stripped too, which keeps
/// the function idempotent.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(normalize("Técnica"), "tecnica");
        assert_eq!(normalize("tecnica"), "tecnica");
        assert_eq!(normalize("EDUCACIÓN"), "educacion");
        assert_eq!(normalize("Jardín de Infantes"), "jardin de infantes");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_keeps_number_signs() {
        // Neither sign has a canonical decomposition
        assert_eq!(normalize("N° 4"), "n° 4");
        assert_eq!(normalize("Nº4"), "nº4");
    }

    #[test]
    fn test_dotted_capital_i() {
        let once = normalize("İnstituto");
        assert_eq!(once, "instituto");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_precomposed_and_decomposed_agree() {
        assert_eq!(normalize("m\u{00FA}sica"), normalize("mu\u{0301}sica"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-ZÀ-ÿ0-9 °º.-]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_ignores_case(s in "[a-zA-Záéíóúñ ]{0,30}") {
            prop_assert_eq!(normalize(&s.to_uppercase()), normalize(&s.to_lowercase()));
        }
    }
}
