//! "<school type> <number>" shorthand recognition
//!
//! Turns queries such as `tecnica 4`, `Técnica N° 4` or `primaria numero 12`
//! into a structured type + number pair.

use super::normalize::normalize;
use super::vocabulary::SchoolTypeVocabulary;
use regex::Regex;

/// A recognized shorthand query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolPattern {
    /// Vocabulary word, normalized
    pub kind: String,
    /// Digits following the word; empty means "any school of this type"
    pub number: String,
}

impl SchoolPattern {
    pub fn has_number(&self) -> bool {
        !self.number.is_empty()
    }
}

/// Shorthand forms tried for every vocabulary word, in order.
/// `{w}` is replaced by the escaped word; group 1 captures the number.
const SHORTHAND_FORMS: &[&str] = &[
    r"^{w}\s+(\d+)$",
    r"^{w}\s+n°\s*(\d+)$",
    r"^{w}\s+nº\s*(\d+)$",
    r"^{w}\s+numero\s+(\d+)$",
    r"^{w}\s+n°(\d+)$",
    r"^{w}\s+nº(\d+)$",
];

/// Precompiled shorthand matcher for one vocabulary
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    rules: Vec<(String, Vec<Regex>)>,
}

impl PatternExtractor {
    /// Compile the shorthand forms for every word in the vocabulary
    pub fn new(vocabulary: &SchoolTypeVocabulary) -> Result<Self, regex::Error> {
        let rules = vocabulary
            .words()
            .iter()
            .map(|word| {
                let escaped = regex::escape(word);
                let forms = SHORTHAND_FORMS
                    .iter()
                    .map(|form| Regex::new(&format!("(?i){}", form.replace("{w}", &escaped))))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((word.clone(), forms))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { rules })
    }

    /// Recognize a shorthand query.
    ///
    /// Words are tried in vocabulary order and the first hit wins. A query
    /// that is exactly a vocabulary word yields that word with no number.
    pub fn extract(&self, query: &str) -> Option<SchoolPattern> {
        let term = normalize(query.trim());

        for (word, forms) in &self.rules {
            for form in forms {
                if let Some(number) = form.captures(&term).and_then(|c| c.get(1)) {
                    return Some(SchoolPattern {
                        kind: word.clone(),
                        number: number.as_str().to_string(),
                    });
                }
            }

            if term == *word {
                return Some(SchoolPattern {
                    kind: word.clone(),
                    number: String::new(),
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new(&SchoolTypeVocabulary::default()).unwrap()
    }

    fn pattern(kind: &str, number: &str) -> Option<SchoolPattern> {
        Some(SchoolPattern {
            kind: kind.to_string(),
            number: number.to_string(),
        })
    }

    #[test]
    fn test_type_and_number() {
        assert_eq!(extractor().extract("tecnica 4"), pattern("tecnica", "4"));
        assert_eq!(extractor().extract("primaria   12"), pattern("primaria", "12"));
    }

    #[test]
    fn test_number_sign_forms() {
        let ex = extractor();
        assert_eq!(ex.extract("técnica n° 1"), pattern("tecnica", "1"));
        assert_eq!(ex.extract("Técnica N°1"), pattern("tecnica", "1"));
        assert_eq!(ex.extract("secundaria nº5"), pattern("secundaria", "5"));
        assert_eq!(ex.extract("secundaria Nº 5"), pattern("secundaria", "5"));
        assert_eq!(ex.extract("media número 3"), pattern("media", "3"));
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(extractor().extract("  jardín 905  "), pattern("jardin", "905"));
    }

    #[test]
    fn test_type_only() {
        assert_eq!(extractor().extract("Técnica"), pattern("tecnica", ""));
        assert!(!extractor().extract("rural").unwrap().has_number());
    }

    #[test]
    fn test_not_a_pattern() {
        let ex = extractor();
        assert_eq!(ex.extract("escuela normal"), None);
        assert_eq!(ex.extract("tecnica 4 anexo"), None);
        assert_eq!(ex.extract("4 tecnica"), None);
        assert_eq!(ex.extract("universidad 2"), None);
        assert_eq!(ex.extract(""), None);
    }

    #[test]
    fn test_first_word_wins() {
        let vocab = SchoolTypeVocabulary::new(["media", "tecnica"]);
        let ex = PatternExtractor::new(&vocab).unwrap();
        assert_eq!(ex.extract("media 2"), pattern("media", "2"));
        assert_eq!(ex.extract("tecnica 2"), pattern("tecnica", "2"));
    }

    #[test]
    fn test_word_is_escaped() {
        let vocab = SchoolTypeVocabulary::new(["e.p."]);
        let ex = PatternExtractor::new(&vocab).unwrap();
        assert_eq!(ex.extract("e.p. 7"), pattern("e.p.", "7"));
        assert_eq!(ex.extract("exp. 7"), None);
    }
}
