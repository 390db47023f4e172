//! Registry-wide statistics: totals, districts, FED load and enrollment

use crate::error::AppError;
use crate::store::{decode_rows, RecordStore, Table};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Label for schools with no FED in charge
pub const UNASSIGNED_FED: &str = "Sin FED asignado";

const STATS_COLUMNS: &[&str] = &["id", "distrito", "fed_a_cargo", "matricula", "varones", "mujeres"];

/// One school as seen by the aggregation. Columns of an unexpected type read
/// as missing, so the row still counts toward districts and FEDs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsRow {
    #[serde(deserialize_with = "lenient_text")]
    distrito: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    fed_a_cargo: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    matricula: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    varones: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    mujeres: Option<i64>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Integers as-is, fractional numbers rounded, anything else missing
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictCount {
    pub distrito: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FedCount {
    pub fed_a_cargo: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentByGender {
    pub varones: i64,
    pub mujeres: i64,
    pub total: i64,
}

/// Aggregated registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_establishments: usize,
    pub total_districts: usize,
    /// Boys plus girls when any are recorded, otherwise the sum of `matricula`
    pub total_enrollment: i64,
    pub enrollment_by_gender: EnrollmentByGender,
    /// Largest district first
    pub districts: Vec<DistrictCount>,
    /// Busiest FED first
    pub feds: Vec<FedCount>,
}

/// Count occurrences, most frequent first, ties by name
fn ranked_counts(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a_name, a_count), (b_name, b_count)| {
        b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
    });
    ranked
}

impl RegistryStats {
    fn from_rows(total: usize, rows: &[StatsRow]) -> Self {
        let districts: Vec<DistrictCount> = ranked_counts(
            rows.iter()
                .filter_map(|r| r.distrito.as_deref())
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        )
        .into_iter()
        .map(|(distrito, count)| DistrictCount { distrito, count })
        .collect();

        let feds: Vec<FedCount> = ranked_counts(rows.iter().map(|r| {
            match r.fed_a_cargo.as_deref().map(str::trim) {
                Some(fed) if !fed.is_empty() => fed.to_string(),
                _ => UNASSIGNED_FED.to_string(),
            }
        }))
        .into_iter()
        .map(|(fed_a_cargo, count)| FedCount { fed_a_cargo, count })
        .collect();

        let matricula: i64 = rows.iter().filter_map(|r| r.matricula).filter(|m| *m > 0).sum();
        let varones: i64 = rows.iter().filter_map(|r| r.varones).filter(|v| *v >= 0).sum();
        let mujeres: i64 = rows.iter().filter_map(|r| r.mujeres).filter(|m| *m >= 0).sum();

        let by_gender = varones + mujeres;
        let total_enrollment = if by_gender > 0 { by_gender } else { matricula };

        Self {
            total_establishments: total,
            total_districts: districts.len(),
            total_enrollment,
            enrollment_by_gender: EnrollmentByGender {
                varones,
                mujeres,
                total: total_enrollment,
            },
            districts,
            feds,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Registry statistics\n\n");
        md.push_str(&format!("- **Establishments:** {}\n", self.total_establishments));
        md.push_str(&format!("- **Districts:** {}\n", self.total_districts));
        md.push_str(&format!("- **Enrollment:** {}\n", self.total_enrollment));
        md.push_str(&format!(
            "  - Boys: {}, girls: {}\n",
            self.enrollment_by_gender.varones, self.enrollment_by_gender.mujeres
        ));

        if !self.districts.is_empty() {
            md.push_str("\n## Districts\n\n");
            for d in &self.districts {
                md.push_str(&format!("- {}: {}\n", d.distrito, d.count));
            }
        }

        if !self.feds.is_empty() {
            md.push_str("\n## FED in charge\n\n");
            for f in &self.feds {
                md.push_str(&format!("- {}: {}\n", f.fed_a_cargo, f.count));
            }
        }

        md
    }
}

/// Scan the school table and aggregate it
pub async fn load_stats(store: &dyn RecordStore) -> Result<RegistryStats, AppError> {
    let rows = store.scan(Table::Establecimientos, STATS_COLUMNS).await?;
    let decoded: Vec<StatsRow> = decode_rows(Table::Establecimientos, rows);
    debug!("Aggregating statistics over {} rows", decoded.len());
    Ok(RegistryStats::from_rows(decoded.len(), &decoded))
}
