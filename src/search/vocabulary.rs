//! Static search vocabulary: school-type words and accent spellings
//!
//! Both tables are plain data handed to the search engine at construction,
//! so tests and other regions can supply their own.

use super::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Institution-type words recognized in "<type> <number>" queries
const DEFAULT_SCHOOL_TYPES: &[&str] = &[
    "primaria",
    "secundaria",
    "jardin",
    "escuela",
    "colegio",
    "instituto",
    "tecnica",
    "media",
    "especial",
    "adultos",
    "bachillerato",
    "comercial",
    "industrial",
    "normal",
    "agropecuaria",
    "agrotecnica",
    "estetica",
    "artistica",
    "musical",
    "deportiva",
    "rural",
    "urbana",
];

/// Words commonly written both with and without their accent
const DEFAULT_ACCENT_VARIANTS: &[(&str, &[&str])] = &[
    ("tecnica", &["tecnica", "técnica"]),
    ("estetica", &["estetica", "estética"]),
    ("musica", &["musica", "música"]),
    ("educacion", &["educacion", "educación"]),
    ("matematica", &["matematica", "matemática"]),
    ("fisica", &["fisica", "física"]),
    ("quimica", &["quimica", "química"]),
    ("geografia", &["geografia", "geografía"]),
    ("filosofia", &["filosofia", "filosofía"]),
    ("artistica", &["artistica", "artística"]),
    ("agrotecnica", &["agrotecnica", "agrotécnica"]),
];

/// Ordered list of school-type words, stored normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolTypeVocabulary {
    words: Vec<String>,
}

impl SchoolTypeVocabulary {
    /// Build a vocabulary; words are normalized and empty entries dropped.
    /// Declaration order is kept because the first matching word wins.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .map(|w| normalize(w.as_ref().trim()))
            .filter(|w| !w.is_empty() && seen.insert(w.clone()))
            .collect();
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[cfg(test)]
    pub fn contains(&self, word: &str) -> bool {
        let word = normalize(word);
        self.words.iter().any(|w| *w == word)
    }
}

impl Default for SchoolTypeVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_SCHOOL_TYPES.iter().copied())
    }
}

/// A canonical (unaccented) word and its registered spellings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccentEntry {
    pub key: String,
    pub spellings: Vec<String>,
}

/// Mapping from canonical words to the spellings found in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccentVariantTable {
    entries: Vec<AccentEntry>,
}

impl AccentVariantTable {
    pub fn new(entries: Vec<AccentEntry>) -> Self {
        Self { entries }
    }

    /// Expand a token into every spelling worth probing an accent-sensitive
    /// store with.
    ///
    /// The result always holds the token itself, its lower/upper case forms
    /// and its normalized form (plain and uppercase). For each table key the
    /// normalized token contains, every registered spelling is added as
    /// registered, uppercased and capitalized. Duplicates are removed while
    /// keeping first-seen order.
    pub fn variants_of(&self, token: &str) -> Vec<String> {
        let mut variants = VariantSet::default();

        variants.add(token.to_string());
        variants.add(token.to_lowercase());
        variants.add(token.to_uppercase());

        let normalized = normalize(token);
        variants.add(normalized.to_uppercase());
        variants.add(normalized.clone());

        for entry in &self.entries {
            if !normalized.contains(&normalize(&entry.key)) {
                continue;
            }
            for spelling in &entry.spellings {
                variants.add(spelling.clone());
                variants.add(spelling.to_uppercase());
                variants.add(capitalize(spelling));
            }
        }

        variants.into_vec()
    }
}

impl Default for AccentVariantTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCENT_VARIANTS
                .iter()
                .map(|(key, spellings)| AccentEntry {
                    key: key.to_string(),
                    spellings: spellings.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        )
    }
}

/// Insertion-ordered set of strings
#[derive(Default)]
struct VariantSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl VariantSet {
    fn add(&mut self, value: String) {
        if self.seen.insert(value.clone()) {
            self.ordered.push(value);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Uppercase the first grapheme, leave the rest untouched
fn capitalize(word: &str) -> String {
    let mut graphemes = word.graphemes(true);
    match graphemes.next() {
        Some(first) => {
            let mut out = first.to_uppercase();
            out.push_str(graphemes.as_str());
            out
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_order() {
        let vocab = SchoolTypeVocabulary::default();
        assert_eq!(vocab.words().first().map(String::as_str), Some("primaria"));
        assert_eq!(vocab.words().len(), DEFAULT_SCHOOL_TYPES.len());
        assert!(vocab.contains("Técnica"));
        assert!(!vocab.contains("universidad"));
    }

    #[test]
    fn test_vocabulary_normalizes_and_dedups() {
        let vocab = SchoolTypeVocabulary::new(["Técnica", "tecnica", "  ", "Jardín"]);
        assert_eq!(vocab.words(), &["tecnica".to_string(), "jardin".to_string()]);
    }

    #[test]
    fn test_variants_always_include_base_forms() {
        let table = AccentVariantTable::default();
        let variants = table.variants_of("Colegio");
        for expected in ["Colegio", "colegio", "COLEGIO"] {
            assert!(variants.contains(&expected.to_string()), "missing {}", expected);
        }
        assert_eq!(variants.len(), 3);
    }

    #[test]
    fn test_variants_expand_known_word() {
        let table = AccentVariantTable::default();
        let variants = table.variants_of("tecnica");
        for expected in ["tecnica", "TECNICA", "técnica", "TÉCNICA", "Técnica", "Tecnica"] {
            assert!(variants.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_variants_match_accented_token() {
        let table = AccentVariantTable::default();
        let variants = table.variants_of("Técnica");
        assert!(variants.contains(&"tecnica".to_string()));
        assert!(variants.contains(&"técnica".to_string()));
    }

    #[test]
    fn test_variants_match_contained_key() {
        // "agrotecnica" contains both "tecnica" and "agrotecnica"
        let table = AccentVariantTable::default();
        let variants = table.variants_of("agrotecnica");
        assert!(variants.contains(&"agrotécnica".to_string()));
        assert!(variants.contains(&"técnica".to_string()));
    }

    #[test]
    fn test_variants_no_duplicates() {
        let table = AccentVariantTable::default();
        let variants = table.variants_of("tecnica");
        let unique: HashSet<_> = variants.iter().collect();
        assert_eq!(unique.len(), variants.len());
    }

    #[test]
    fn test_variants_never_empty() {
        let table = AccentVariantTable::default();
        assert!(!table.variants_of("").is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("técnica"), "Técnica");
        assert_eq!(capitalize("e\u{0301}tica"), "E\u{0301}tica");
        assert_eq!(capitalize(""), "");
    }
}
