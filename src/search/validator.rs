//! Exact type + number validation for candidate school names

use super::normalize::normalize;
use regex::Regex;
use std::sync::OnceLock;

fn whole_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+\b").expect("static regex"))
}

/// Every whole-number token in `text`, in order of appearance
pub fn whole_numbers(text: &str) -> Vec<&str> {
    whole_number_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .collect()
}

/// Whether `number` appears in `text` as a whole-number token
pub fn contains_whole_number(text: &str, number: &str) -> bool {
    whole_numbers(text).contains(&number)
}

/// Exact type + number check, compiled once per `(kind, number)`.
///
/// A name matches when the normalized type occurs in it and is followed by
/// the number in one of the shorthand forms. The number is then checked again
/// against the whole-number tokens of the raw name, so a search for `4` never
/// accepts a name that only carries `14` or `40`.
#[derive(Debug, Clone)]
pub struct ExactMatcher {
    kind: String,
    number: String,
    forms: Vec<Regex>,
}

impl ExactMatcher {
    /// `None` when either part is empty
    pub fn new(kind: &str, number: &str) -> Option<Self> {
        let kind = normalize(kind);
        if kind.is_empty() || number.is_empty() {
            return None;
        }

        let t = regex::escape(&kind);
        let n = regex::escape(number);
        let forms = [
            format!(r"\b{t}\s+{n}\b"),
            format!(r"\b{t}\s+n°\s*{n}\b"),
            format!(r"\b{t}\s+nº\s*{n}\b"),
            format!(r"\b{t}\s+n°{n}\b"),
            format!(r"\b{t}\s+nº{n}\b"),
            format!(r"\b{t}\s+numero\s+{n}\b"),
        ]
        .iter()
        .map(|form| Regex::new(&format!("(?i){}", form)))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

        Some(Self {
            kind,
            number: number.to_string(),
            forms,
        })
    }

    /// The normalized type this matcher looks for
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn matches(&self, candidate_name: &str) -> bool {
        let name = normalize(candidate_name);
        name.contains(&self.kind)
            && self.forms.iter().any(|re| re.is_match(&name))
            && contains_whole_number(candidate_name, &self.number)
    }
}
