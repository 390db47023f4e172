//! Per-record enrichment: contact, educational programs, shared-predio siblings
//!
//! Every record gets each attachment attempted on its own. A failed lookup
//! is logged and leaves that attachment empty; it never aborts the rest.

use crate::error::AppError;
use crate::records::{EducationalProgram, SchoolRecord, SharedSchool};
use crate::store::{decode_rows, RecordStore, Table, FIELD_CUE, FIELD_PREDIO};
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome counters for one enrichment pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub records: usize,
    pub failures: usize,
}

async fn load_programs(
    store: &dyn RecordStore,
    record: &SchoolRecord,
) -> Result<Vec<EducationalProgram>, AppError> {
    let rows = store
        .find_related(Table::ProgramasPorCue, FIELD_CUE, &Value::from(record.cue.0), None)
        .await
        .map_err(|e| AppError::Enrichment(format!("programs for CUE {}: {}", record.cue, e)))?;
    Ok(decode_rows(Table::ProgramasPorCue, rows))
}

async fn load_siblings(
    store: &dyn RecordStore,
    record: &SchoolRecord,
) -> Result<Vec<SharedSchool>, AppError> {
    let Some(predio) = record.predio else {
        return Ok(Vec::new());
    };

    let rows = store
        .find_related(
            Table::Establecimientos,
            FIELD_PREDIO,
            &Value::from(predio.0),
            Some(&Value::from(record.id.clone())),
        )
        .await
        .map_err(|e| AppError::Enrichment(format!("predio {} siblings: {}", predio, e)))?;

    // Guard against stores that ignore the id exclusion
    Ok(decode_rows::<SharedSchool>(Table::Establecimientos, rows)
        .into_iter()
        .filter(|s| s.cue != record.cue)
        .collect())
}

/// Attach contact, programs and shared-predio siblings to every record
pub async fn enrich_records(
    store: &dyn RecordStore,
    records: &mut [SchoolRecord],
) -> EnrichmentReport {
    let mut report = EnrichmentReport {
        records: records.len(),
        failures: 0,
    };

    for record in records.iter_mut() {
        record.reset_enrichment();

        match load_programs(store, record).await {
            Ok(programs) => {
                debug!("CUE {} has {} programs", record.cue, programs.len());
                record.programas_educativos = programs;
            }
            Err(e) => {
                warn!("{}", e);
                report.failures += 1;
            }
        }

        match load_siblings(store, record).await {
            Ok(siblings) => {
                if !siblings.is_empty() {
                    debug!(
                        "\"{}\" shares predio with {} other schools",
                        record.nombre,
                        siblings.len()
                    );
                }
                record.shared_predio_schools = siblings;
            }
            Err(e) => {
                warn!("{}", e);
                report.failures += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Cue, Predio};
    use crate::store::memory::Operation;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_rows(
                Table::Establecimientos,
                vec![
                    json!({"id": "a", "cue": 10000001, "predio": 900123, "nombre": "EP N°1"}),
                    json!({"id": "b", "cue": 10000002, "predio": 900123, "nombre": "ES N°2"}),
                    json!({"id": "c", "cue": 10000003, "predio": null, "nombre": "Jardín 903"}),
                ],
            )
            .with_rows(
                Table::ProgramasPorCue,
                vec![
                    json!({"cue": 10000001, "programa": "Conectar Igualdad"}),
                    json!({"cue": 10000001, "programa": "Plan FinEs"}),
                ],
            )
    }

    fn school(id: &str, cue: u32, predio: Option<u32>) -> SchoolRecord {
        let mut record = SchoolRecord::new(id, Cue(cue), format!("School {}", cue));
        record.predio = predio.map(Predio);
        record
    }

    #[tokio::test]
    async fn test_programs_and_siblings_attached() {
        let store = store();
        let mut records = vec![school("a", 10000001, Some(900123)), school("c", 10000003, None)];

        let report = enrich_records(&store, &mut records).await;
        assert_eq!(report, EnrichmentReport { records: 2, failures: 0 });

        assert_eq!(records[0].programas_educativos.len(), 2);
        assert_eq!(records[0].shared_predio_schools.len(), 1);
        assert_eq!(records[0].shared_predio_schools[0].cue, Cue(10000002));

        assert!(records[1].programas_educativos.is_empty());
        assert!(records[1].shared_predio_schools.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let store = store();
        store.fail(Operation::Related);
        let mut records = vec![school("a", 10000001, Some(900123)), school("b", 10000002, Some(900123))];
        records[0].programas_educativos.push(EducationalProgram {
            programa: "stale".into(),
        });

        let report = enrich_records(&store, &mut records).await;
        assert_eq!(report.records, 2);
        assert_eq!(report.failures, 4);
        for record in &records {
            assert!(record.programas_educativos.is_empty());
            assert!(record.shared_predio_schools.is_empty());
        }
    }

    #[tokio::test]
    async fn test_contact_from_embedded_relation() {
        let store = store();
        let mut record = school("c", 10000003, None);
        record.contactos.push(crate::records::Contact {
            id: "k".into(),
            nombre: Some("Ana".into()),
            ..Default::default()
        });

        enrich_records(&store, std::slice::from_mut(&mut record)).await;
        assert_eq!(record.contacto.as_ref().map(|c| c.id.as_str()), Some("k"));
    }
}
