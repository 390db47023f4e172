//! Record store access
//!
//! The registry is a remote relational store. Search logic only needs a
//! handful of filtered reads, expressed by [`RecordStore`]. Rows travel as
//! JSON objects and are decoded by the caller.

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A single row as returned by the store
pub type Row = Value;

/// Column holding the school name
pub const FIELD_NAME: &str = "nombre";
pub const FIELD_CUE: &str = "cue";
pub const FIELD_PREDIO: &str = "predio";
pub const FIELD_ID: &str = "id";

/// Tables the registry exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// One row per school establishment
    Establecimientos,
    /// Educational programs keyed by CUE
    ProgramasPorCue,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Establecimientos => "establecimientos",
            Table::ProgramasPorCue => "programas_x_cue",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "establecimientos" => Some(Table::Establecimientos),
            "programas_x_cue" => Some(Table::ProgramasPorCue),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to record store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Record store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode store rows: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid API key header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// Upper bound on pages followed by one lookup
const MAX_PAGES: usize = 500;

/// Row predicate understood by every store
#[derive(Debug, Clone, Copy)]
pub enum Filter<'a> {
    /// `field` equals `value`
    Exact { field: &'a str, value: &'a Value },
    /// `field` contains `pattern`, ignoring case
    Substring { field: &'a str, pattern: &'a str },
    /// `field` contains any of `patterns`, ignoring case
    SubstringAnyOf { field: &'a str, patterns: &'a [String] },
    /// `field` equals `value`, minus the row whose id is `exclude_id`
    Related {
        field: &'a str,
        value: &'a Value,
        exclude_id: Option<&'a Value>,
    },
    /// Every row
    All,
}

impl Filter<'_> {
    /// Name-based filters come back ordered by name
    pub fn orders_by_name(&self) -> bool {
        matches!(self, Filter::Substring { .. } | Filter::SubstringAnyOf { .. })
    }
}

/// A window of rows within a filtered, ordered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Filtered reads against the registry
///
/// Stores serve rows one page at a time. The lookup methods follow pages
/// until a short one comes back, so callers always see the complete result
/// and can filter it further without losing rows to a server-side cap.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Largest number of rows one request returns
    fn page_size(&self) -> usize;

    /// One page of rows matching `filter`, in a stable order.
    /// `columns` restricts the returned fields; `None` means the table default.
    async fn fetch_page(
        &self,
        table: Table,
        filter: Filter<'_>,
        columns: Option<&[&str]>,
        page: Page,
    ) -> Result<Vec<Row>, StoreError>;

    /// Every row matching `filter`
    async fn fetch_all(
        &self,
        table: Table,
        filter: Filter<'_>,
        columns: Option<&[&str]>,
    ) -> Result<Vec<Row>, StoreError> {
        let limit = self.page_size().max(1);
        let mut rows = Vec::new();

        for index in 0..MAX_PAGES {
            let page = Page {
                offset: index.saturating_mul(limit),
                limit,
            };
            let batch = self.fetch_page(table, filter, columns, page).await?;
            let complete = batch.len() < limit;
            rows.extend(batch);
            if complete {
                return Ok(rows);
            }
        }

        tracing::warn!(
            "{} lookup stopped after {} pages ({} rows)",
            table,
            MAX_PAGES,
            rows.len()
        );
        Ok(rows)
    }

    /// Rows where `field` equals `value`
    async fn find_by_exact_field(
        &self,
        table: Table,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(table, Filter::Exact { field, value }, None)
            .await
    }

    /// Rows where `field` contains `pattern`, ignoring case
    async fn find_by_field_substring(
        &self,
        table: Table,
        field: &str,
        pattern: &str,
    ) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(table, Filter::Substring { field, pattern }, None)
            .await
    }

    /// Rows where `field` contains any of `patterns`, ignoring case
    async fn find_by_field_substring_any_of(
        &self,
        table: Table,
        field: &str,
        patterns: &[String],
    ) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(table, Filter::SubstringAnyOf { field, patterns }, None)
            .await
    }

    /// Rows where `filter_field` equals `filter_value`, minus the row whose
    /// id is `exclude_id`
    async fn find_related(
        &self,
        table: Table,
        filter_field: &str,
        filter_value: &Value,
        exclude_id: Option<&Value>,
    ) -> Result<Vec<Row>, StoreError> {
        let filter = Filter::Related {
            field: filter_field,
            value: filter_value,
            exclude_id,
        };
        self.fetch_all(table, filter, None).await
    }

    /// Every row of `table`, restricted to `columns`
    async fn scan(&self, table: Table, columns: &[&str]) -> Result<Vec<Row>, StoreError> {
        self.fetch_all(table, Filter::All, Some(columns)).await
    }
}

/// Decode rows into `T`, skipping (and logging) rows that do not fit
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Skipping malformed {} row: {}", table, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SchoolRecord;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves `total` numbered rows and remembers which pages were asked for
    struct NumberedStore {
        total: usize,
        size: usize,
        pages: Mutex<Vec<Page>>,
    }

    impl NumberedStore {
        fn new(total: usize, size: usize) -> Self {
            Self {
                total,
                size,
                pages: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<usize> {
            self.pages.lock().unwrap().iter().map(|p| p.offset).collect()
        }
    }

    #[async_trait]
    impl RecordStore for NumberedStore {
        fn page_size(&self) -> usize {
            self.size
        }

        async fn fetch_page(
            &self,
            _table: Table,
            _filter: Filter<'_>,
            _columns: Option<&[&str]>,
            page: Page,
        ) -> Result<Vec<Row>, StoreError> {
            self.pages.lock().unwrap().push(page);
            let end = (page.offset + page.limit).min(self.total);
            Ok((page.offset.min(end)..end).map(|i| json!({"id": i})).collect())
        }
    }

    #[tokio::test]
    async fn test_lookups_follow_pages_until_short() {
        let store = NumberedStore::new(5, 2);
        let rows = store
            .find_by_field_substring(Table::Establecimientos, FIELD_NAME, "1")
            .await
            .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4]["id"], 4);
        assert_eq!(store.offsets(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size_ends_on_empty_page() {
        let store = NumberedStore::new(4, 2);
        let rows = store.scan(Table::Establecimientos, &[]).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(store.offsets(), vec![0, 2, 4]);
    }

    #[test]
    fn test_name_filters_are_ordered_by_name() {
        assert!(Filter::Substring { field: FIELD_NAME, pattern: "x" }.orders_by_name());
        assert!(!Filter::All.orders_by_name());
    }

    #[test]
    fn test_table_names_round_trip() {
        for table in [Table::Establecimientos, Table::ProgramasPorCue] {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("contactos"), None);
    }

    #[test]
    fn test_decode_rows_skips_malformed() {
        let rows = vec![
            json!({"id": "1", "cue": 10234567, "nombre": "EP N°4"}),
            json!({"id": "2", "nombre": "missing cue"}),
        ];
        let records: Vec<SchoolRecord> = decode_rows(Table::Establecimientos, rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nombre, "EP N°4");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Status {
            status: 401,
            body: "JWT expired".into(),
        };
        assert_eq!(err.to_string(), "Record store returned 401: JWT expired");

        let err = StoreError::UnknownTable("contactos".into());
        assert_eq!(err.to_string(), "Unknown table: contactos");
    }
}
