//! In-process record store
//!
//! Holds registry tables as JSON rows. Backs the `--fixture` offline mode and
//! the test suite. Substring matching lowercases but keeps accents, the same
//! way `ILIKE` behaves on the real store. An optional row limit makes it serve
//! short pages like a capped server does.

use super::{Filter, Page, RecordStore, Row, StoreError, Table, FIELD_ID, FIELD_NAME};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Store operations, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Exact,
    Substring,
    SubstringAnyOf,
    Related,
    Scan,
}

impl Operation {
    fn of(filter: &Filter<'_>) -> Self {
        match filter {
            Filter::Exact { .. } => Operation::Exact,
            Filter::Substring { .. } => Operation::Substring,
            Filter::SubstringAnyOf { .. } => Operation::SubstringAnyOf,
            Filter::Related { .. } => Operation::Related,
            Filter::All => Operation::Scan,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<Table, Vec<Row>>,
    failing: Mutex<HashSet<Operation>>,
    calls: AtomicUsize,
    row_limit: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object mapping table names to row arrays
    pub fn from_json(value: Value) -> Result<Self> {
        let object = value
            .as_object()
            .context("Fixture must be a JSON object keyed by table name")?;

        let mut store = Self::new();
        for (name, rows) in object {
            let table =
                Table::from_name(name).ok_or_else(|| StoreError::UnknownTable(name.clone()))?;
            let rows = rows
                .as_array()
                .with_context(|| format!("Table {} must be an array of rows", name))?;
            store.tables.insert(table, rows.clone());
        }
        Ok(store)
    }

    /// Load a fixture file (see [`MemoryStore::from_json`])
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let value: Value = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        let store = Self::from_json(value)?;
        debug!(
            "Loaded fixture {} ({} tables)",
            path.display(),
            store.tables.len()
        );
        Ok(store)
    }

    pub fn with_rows(mut self, table: Table, rows: Vec<Row>) -> Self {
        self.tables.entry(table).or_default().extend(rows);
        self
    }

    /// Serve at most `limit` rows per request
    #[cfg(test)]
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }

    /// Make every call of `operation` fail
    #[cfg(test)]
    pub fn fail(&self, operation: Operation) {
        self.failing_set().insert(operation);
    }

    #[cfg(test)]
    pub fn fail_all(&self) {
        let mut failing = self.failing_set();
        for op in [
            Operation::Exact,
            Operation::Substring,
            Operation::SubstringAnyOf,
            Operation::Related,
            Operation::Scan,
        ] {
            failing.insert(op);
        }
    }

    /// Number of store requests made so far
    #[cfg(test)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn failing_set(&self) -> std::sync::MutexGuard<'_, HashSet<Operation>> {
        self.failing.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, operation: Operation) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_set().contains(&operation) {
            return Err(StoreError::Unavailable(format!(
                "{:?} lookups are failing",
                operation
            )));
        }
        Ok(())
    }

    fn rows(&self, table: Table) -> &[Row] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn matching(&self, table: Table, filter: &Filter<'_>) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .rows(table)
            .iter()
            .filter(|row| row_matches(row, filter))
            .cloned()
            .collect();
        if filter.orders_by_name() {
            sort_by_name(&mut rows);
        }
        rows
    }
}

fn row_matches(row: &Row, filter: &Filter<'_>) -> bool {
    match *filter {
        Filter::Exact { field, value } => field_equals(row, field, value),
        Filter::Substring { field, pattern } => field_contains(row, field, &pattern.to_lowercase()),
        Filter::SubstringAnyOf { field, patterns } => patterns
            .iter()
            .any(|p| field_contains(row, field, &p.to_lowercase())),
        Filter::Related {
            field,
            value,
            exclude_id,
        } => {
            let excluded = match (exclude_id, row.get(FIELD_ID)) {
                (Some(excluded), Some(id)) => values_equal(id, excluded),
                _ => false,
            };
            field_equals(row, field, value) && !excluded
        }
        Filter::All => true,
    }
}

fn field_equals(row: &Row, field: &str, value: &Value) -> bool {
    row.get(field).map(|v| values_equal(v, value)).unwrap_or(false)
}

fn project(row: Row, columns: Option<&[&str]>) -> Row {
    match columns {
        Some(columns) if !columns.is_empty() => Value::Object(
            columns
                .iter()
                .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                .collect(),
        ),
        _ => row,
    }
}

/// Equality with numbers and numeric strings treated alike
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.trim() == n.to_string()
        }
        _ => a == b,
    }
}

fn field_contains(row: &Row, field: &str, needle_lower: &str) -> bool {
    row.get(field)
        .and_then(Value::as_str)
        .map(|text| text.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

fn sort_by_name(rows: &mut [Row]) {
    rows.sort_by(|a, b| {
        let a = a.get(FIELD_NAME).and_then(Value::as_str).unwrap_or("");
        let b = b.get(FIELD_NAME).and_then(Value::as_str).unwrap_or("");
        a.cmp(b)
    });
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn page_size(&self) -> usize {
        self.row_limit.unwrap_or(usize::MAX)
    }

    async fn fetch_page(
        &self,
        table: Table,
        filter: Filter<'_>,
        columns: Option<&[&str]>,
        page: Page,
    ) -> Result<Vec<Row>, StoreError> {
        self.begin(Operation::of(&filter))?;
        let limit = page.limit.min(self.page_size());
        Ok(self
            .matching(table, &filter)
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .map(|row| project(row, columns))
            .collect())
    }
}
