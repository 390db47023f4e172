//! Search Engine Integration
//!
//! Classifies a raw query, runs the matching lookup strategy against the
//! record store, then deduplicates, ranks and enriches the results.

use super::pattern::{PatternExtractor, SchoolPattern};
use super::ranking;
use super::validator::{contains_whole_number, ExactMatcher};
use super::vocabulary::{AccentVariantTable, SchoolTypeVocabulary};
use crate::enrich::enrich_records;
use crate::error::{validate_query, AppError};
use crate::records::{Cue, Predio, SchoolRecord};
use crate::store::{decode_rows, RecordStore, Row, StoreError, Table, FIELD_CUE, FIELD_NAME, FIELD_PREDIO};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a query will be looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Eight digits: CUE equality
    Cue(Cue),
    /// Six digits: predio equality
    Predio(Predio),
    /// One to three digits: whole number inside the name
    ShortNumber(String),
    /// "<type> <number>" shorthand
    TypeWithNumber(SchoolPattern),
    /// A bare school-type word
    TypeOnly(SchoolPattern),
    FreeText(String),
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Cue(cue) => write!(f, "CUE {}", cue),
            QueryKind::Predio(predio) => write!(f, "predio {}", predio),
            QueryKind::ShortNumber(n) => write!(f, "number {}", n),
            QueryKind::TypeWithNumber(p) => write!(f, "type '{}' number {}", p.kind, p.number),
            QueryKind::TypeOnly(p) => write!(f, "type '{}'", p.kind),
            QueryKind::FreeText(t) => write!(f, "text '{}'", t),
        }
    }
}

impl QueryKind {
    /// Numeric shapes first, then shorthand patterns, then free text
    pub fn classify(query: &str, extractor: &PatternExtractor) -> Self {
        let query = query.trim();

        if !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(cue) = Cue::parse(query) {
                return QueryKind::Cue(cue);
            }
            if let Some(predio) = Predio::parse(query) {
                return QueryKind::Predio(predio);
            }
            if query.len() <= 3 {
                return QueryKind::ShortNumber(query.to_string());
            }
            return QueryKind::FreeText(query.to_string());
        }

        match extractor.extract(query) {
            Some(pattern) if pattern.has_number() => QueryKind::TypeWithNumber(pattern),
            Some(pattern) => QueryKind::TypeOnly(pattern),
            None => QueryKind::FreeText(query.to_string()),
        }
    }
}

/// Bookkeeping of store calls made for one request
#[derive(Debug, Default)]
struct Attempts {
    succeeded: bool,
    failures: Vec<String>,
}

impl Attempts {
    /// Decode a lookup result, or log and remember the failure
    fn record(&mut self, label: &str, result: Result<Vec<Row>, StoreError>) -> Option<Vec<SchoolRecord>> {
        match result {
            Ok(rows) => {
                self.succeeded = true;
                debug!("{} lookup returned {} rows", label, rows.len());
                Some(decode_rows(Table::Establecimientos, rows))
            }
            Err(e) => {
                warn!("{} lookup failed: {}", label, e);
                self.failures.push(format!("{}: {}", label, e));
                None
            }
        }
    }

    fn summary(&self) -> String {
        if self.failures.is_empty() {
            "no lookup was attempted".to_string()
        } else {
            self.failures.join("; ")
        }
    }
}

/// Search orchestrator over a record store
pub struct SearchEngine {
    store: Arc<dyn RecordStore>,
    extractor: PatternExtractor,
    variants: AccentVariantTable,
}

impl SearchEngine {
    /// Create a search engine with the built-in vocabulary
    pub fn new(store: Arc<dyn RecordStore>) -> Result<Self, AppError> {
        Self::with_vocabulary(store, &SchoolTypeVocabulary::default(), AccentVariantTable::default())
    }

    /// Create a search engine with custom vocabulary tables
    pub fn with_vocabulary(
        store: Arc<dyn RecordStore>,
        vocabulary: &SchoolTypeVocabulary,
        variants: AccentVariantTable,
    ) -> Result<Self, AppError> {
        Ok(Self {
            store,
            extractor: PatternExtractor::new(vocabulary)?,
            variants,
        })
    }

    /// The store this engine reads from
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Decide which lookup strategy a query takes
    pub fn classify(&self, query: &str) -> QueryKind {
        QueryKind::classify(query, &self.extractor)
    }

    /// Search the registry; see [`SearchEngine::search_limited`]
    pub async fn search(&self, query: &str) -> Result<Vec<SchoolRecord>, AppError> {
        self.search_limited(query, None).await
    }

    /// Search the registry and return at most `limit` ranked, enriched records.
    ///
    /// Blank queries fail before any store access. Store failures inside a
    /// strategy fall through where a fallback exists; only when no store
    /// call succeeded at all is a single aggregated error returned.
    pub async fn search_limited(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SchoolRecord>, AppError> {
        let query = validate_query(query)?;
        let kind = self.classify(query);
        info!("Searching for '{}' as {}", query, kind);

        let mut attempts = Attempts::default();
        let found = self.run_strategy(&kind, query, &mut attempts).await;

        if !attempts.succeeded {
            return Err(AppError::StoreUnavailable(attempts.summary()));
        }

        let mut records = ranking::finalize(found, query);
        if let Some(limit) = limit {
            records.truncate(limit);
        }

        let report = enrich_records(self.store(), &mut records).await;
        if report.failures > 0 {
            warn!(
                "Enrichment failed {} times across {} records",
                report.failures, report.records
            );
        }

        info!("Search for '{}' returned {} records", query, records.len());
        Ok(records)
    }

    /// Fetch one school by CUE for the detail view
    pub async fn get_by_cue(&self, cue: Cue) -> Result<SchoolRecord, AppError> {
        debug!("Detail lookup for CUE {}", cue);
        let rows = self
            .store
            .find_by_exact_field(Table::Establecimientos, FIELD_CUE, &Value::from(cue.0))
            .await?;

        let mut record = decode_rows::<SchoolRecord>(Table::Establecimientos, rows)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("No school with CUE {}", cue)))?;

        enrich_records(self.store(), std::slice::from_mut(&mut record)).await;
        Ok(record)
    }

    async fn run_strategy(
        &self,
        kind: &QueryKind,
        query: &str,
        attempts: &mut Attempts,
    ) -> Vec<SchoolRecord> {
        match kind {
            QueryKind::Cue(cue) => {
                let result = self
                    .store
                    .find_by_exact_field(Table::Establecimientos, FIELD_CUE, &Value::from(cue.0))
                    .await;
                attempts.record("CUE", result).unwrap_or_default()
            }
            QueryKind::Predio(predio) => {
                let result = self
                    .store
                    .find_by_exact_field(Table::Establecimientos, FIELD_PREDIO, &Value::from(predio.0))
                    .await;
                attempts.record("predio", result).unwrap_or_default()
            }
            QueryKind::ShortNumber(digits) => self.by_short_number(digits, attempts).await,
            QueryKind::TypeWithNumber(pattern) => {
                match self.by_type_and_number(pattern, attempts).await {
                    Some(found) => found,
                    None => self.by_free_text(query, attempts).await,
                }
            }
            QueryKind::TypeOnly(pattern) => {
                let variants = self.variants.variants_of(&pattern.kind);
                let result = self
                    .store
                    .find_by_field_substring_any_of(Table::Establecimientos, FIELD_NAME, &variants)
                    .await;
                match attempts.record("school type", result) {
                    Some(found) => found,
                    None => self.by_free_text(query, attempts).await,
                }
            }
            QueryKind::FreeText(text) => self.by_free_text(text, attempts).await,
        }
    }

    /// Names containing the digits as a whole number; the broad match is
    /// kept when no name carries the exact number.
    async fn by_short_number(&self, digits: &str, attempts: &mut Attempts) -> Vec<SchoolRecord> {
        let result = self
            .store
            .find_by_field_substring(Table::Establecimientos, FIELD_NAME, digits)
            .await;
        let Some(broad) = attempts.record("number in name", result) else {
            return Vec::new();
        };

        let total = broad.len();
        let exact: Vec<SchoolRecord> = broad
            .iter()
            .filter(|r| contains_whole_number(&r.nombre, digits))
            .cloned()
            .collect();
        debug!("{} of {} names carry the exact number {}", exact.len(), total, digits);

        if exact.is_empty() {
            broad
        } else {
            exact
        }
    }

    /// Narrow by the number on the store side, then validate type + exact
    /// number locally. `None` when the lookup itself failed.
    async fn by_type_and_number(
        &self,
        pattern: &SchoolPattern,
        attempts: &mut Attempts,
    ) -> Option<Vec<SchoolRecord>> {
        let result = self
            .store
            .find_by_field_substring(Table::Establecimientos, FIELD_NAME, &pattern.number)
            .await;
        let candidates = attempts.record("type and number", result)?;

        let matchers = self.exact_matchers(pattern);
        let validated: Vec<SchoolRecord> = candidates
            .into_iter()
            .filter(|r| matchers.iter().any(|m| m.matches(&r.nombre)))
            .collect();

        debug!(
            "{} records validated for type '{}' number {}",
            validated.len(),
            pattern.kind,
            pattern.number
        );
        Some(validated)
    }

    /// One matcher per distinct normalized spelling of the pattern's type
    fn exact_matchers(&self, pattern: &SchoolPattern) -> Vec<ExactMatcher> {
        let mut matchers: Vec<ExactMatcher> = Vec::new();
        for variant in self.variants.variants_of(&pattern.kind) {
            let Some(matcher) = ExactMatcher::new(&variant, &pattern.number) else {
                continue;
            };
            if matchers.iter().all(|m| m.kind() != matcher.kind()) {
                matchers.push(matcher);
            }
        }
        matchers
    }

    /// Accent-variant OR lookup, falling back to a plain substring lookup
    /// when it fails or finds nothing
    async fn by_free_text(&self, text: &str, attempts: &mut Attempts) -> Vec<SchoolRecord> {
        let variants = self.variants.variants_of(text);
        let result = self
            .store
            .find_by_field_substring_any_of(Table::Establecimientos, FIELD_NAME, &variants)
            .await;

        if let Some(found) = attempts.record("text variants", result) {
            if !found.is_empty() {
                return found;
            }
        }

        let result = self
            .store
            .find_by_field_substring(Table::Establecimientos, FIELD_NAME, text)
            .await;
        attempts.record("plain text", result).unwrap_or_default()
    }
}
