//! PostgREST (Supabase REST) record store
//!
//! Filters map onto PostgREST query operators:
//! - exact: `field=eq.value`
//! - substring: `field=ilike.*pattern*`
//! - any-of: `or=(field.ilike."*a*",field.ilike."*b*")`
//! - related: `field=eq.value&id=neq.excluded`
//!
//! Every request carries an `order` plus `limit`/`offset`, so results can be
//! read page by page without rows shifting between pages.

use super::{Filter, Page, RecordStore, Row, StoreError, Table, FIELD_ID, FIELD_NAME};
use crate::config::StoreConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Columns fetched for school rows, including the embedded contact relation
const SCHOOL_COLUMNS: &str = "id,cue,predio,nombre,distrito,ciudad,direccion,\
tipo_establecimiento,ambito,nivel,modalidad,matricula,varones,mujeres,secciones,turnos,\
fed_a_cargo,lat,lon,tipo,cue_anterior,access_id,listado_conexion_internet,plan_enlace,\
subplan_enlace,recurso_primario,fecha_inicio_conectividad,reclamos_grupo_1_ani,\
proveedor_asignado_pba,observaciones,proveedor_internet_pnce,fecha_instalacion_pnce,\
pnce_tipo_mejora,pnce_fecha_mejora,pnce_estado,mb,pba_2019_proveedor_internet,\
pba_2019_fecha_instalacion,pba_2019_estado,pba_grupo_1_proveedor_internet,\
pba_grupo_1_fecha_instalacion,pba_grupo_1_estado,pba_grupo_2_a_proveedor_internet,\
pba_grupo_2_a_fecha_instalacion,pba_grupo_2_a_tipo_mejora,pba_grupo_2_a_fecha_mejora,\
pba_grupo_2_a_estado,estado_instalacion_pba,plan_piso_tecnologico,tipo_piso_instalado,\
proveedor_piso_tecnologico_cue,fecha_terminado_piso_tecnologico_cue,tipo_mejora,fecha_mejora,\
contactos!left(id,nombre,apellido,cargo,telefono,correo)";

/// Record store backed by a PostgREST endpoint
pub struct PostgrestStore {
    client: Client,
    rest_url: Url,
    page_size: usize,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let base_url = config
            .store_url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("No store URL configured".to_string()))?;

        let client = crate::http::store_client(
            Duration::from_secs(config.timeout_secs),
            config.api_key.as_deref(),
        )?;

        Ok(Self {
            client,
            rest_url: rest_endpoint(base_url)?,
            page_size: config.row_limit,
        })
    }

    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        Ok(self.rest_url.join(table.name())?)
    }

    async fn get(&self, table: Table, params: Vec<(String, String)>) -> Result<Vec<Row>, StoreError> {
        let url = self.table_url(table)?;
        debug!("GET {} {:?}", url, params);

        let response = self.client.get(url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let rows: Vec<Row> = serde_json::from_slice(&bytes)?;
        debug!("{} returned {} rows", table, rows.len());
        Ok(rows)
    }
}

/// Query parameters for one page of `filter` on `table`
fn page_params(
    table: Table,
    filter: &Filter<'_>,
    columns: Option<&[&str]>,
    page: Page,
) -> Vec<(String, String)> {
    let select = match (columns, table) {
        (Some(columns), _) if !columns.is_empty() => columns.join(","),
        (Some(_), _) => "*".to_string(),
        (None, Table::Establecimientos) => SCHOOL_COLUMNS.to_string(),
        (None, Table::ProgramasPorCue) => "programa".to_string(),
    };
    let mut params = vec![("select".to_string(), select)];

    match *filter {
        Filter::Exact { field, value } => {
            params.push((field.to_string(), format!("eq.{}", render_value(value))));
        }
        Filter::Substring { field, pattern } => {
            params.push((field.to_string(), ilike_filter(pattern)));
        }
        Filter::SubstringAnyOf { field, patterns } => {
            params.push(("or".to_string(), ilike_any_filter(field, patterns)));
        }
        Filter::Related {
            field,
            value,
            exclude_id,
        } => {
            params.push((field.to_string(), format!("eq.{}", render_value(value))));
            if let Some(id) = exclude_id {
                params.push((FIELD_ID.to_string(), format!("neq.{}", render_value(id))));
            }
        }
        Filter::All => {}
    }

    let order = match table {
        Table::Establecimientos if filter.orders_by_name() => format!("{},{}", FIELD_NAME, FIELD_ID),
        Table::Establecimientos => FIELD_ID.to_string(),
        Table::ProgramasPorCue => "programa".to_string(),
    };
    params.push(("order".to_string(), order));
    params.push(("limit".to_string(), page.limit.to_string()));
    params.push(("offset".to_string(), page.offset.to_string()));
    params
}

/// `{base}/rest/v1/`, tolerating a trailing slash or an already-suffixed base
fn rest_endpoint(base_url: &str) -> Result<Url, StoreError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let with_rest = if trimmed.ends_with("/rest/v1") {
        format!("{}/", trimmed)
    } else {
        format!("{}/rest/v1/", trimmed)
    };
    Ok(Url::parse(&with_rest)?)
}

/// Render a filter value for `eq` / `neq`
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape LIKE metacharacters so user text matches literally
pub(crate) fn like_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            // `*` is PostgREST's wildcard alias
            '*' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// `ilike.*pattern*` for a single-column filter
pub(crate) fn ilike_filter(pattern: &str) -> String {
    format!("ilike.*{}*", like_literal(pattern))
}

/// `(field.ilike."*a*",field.ilike."*b*")` for the `or` parameter.
/// Values are double-quoted so commas and parentheses stay literal.
pub(crate) fn ilike_any_filter(field: &str, patterns: &[String]) -> String {
    let conditions: Vec<String> = patterns
        .iter()
        .map(|p| {
            let quoted = like_literal(p).replace('\\', "\\\\").replace('"', "\\\"");
            format!("{}.ilike.\"*{}*\"", field, quoted)
        })
        .collect();
    format!("({})", conditions.join(","))
}

#[async_trait]
impl RecordStore for PostgrestStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(
        &self,
        table: Table,
        filter: Filter<'_>,
        columns: Option<&[&str]>,
        page: Page,
    ) -> Result<Vec<Row>, StoreError> {
        self.get(table, page_params(table, &filter, columns, page))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rest_endpoint() {
        let url = rest_endpoint("https://abc.supabase.co").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/");

        let url = rest_endpoint("https://abc.supabase.co/rest/v1/").unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/rest/v1/");

        assert!(rest_endpoint("not a url").is_err());
    }

    #[test]
    fn test_table_url_join() {
        let store = PostgrestStore::new(&StoreConfig {
            store_url: Some("https://abc.supabase.co".into()),
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(
            store.table_url(Table::ProgramasPorCue).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/programas_x_cue"
        );
    }

    #[test]
    fn test_missing_url_is_unavailable() {
        let err = PostgrestStore::new(&StoreConfig::default()).err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(10234567)), "10234567");
        assert_eq!(render_value(&json!("abc")), "abc");
    }

    #[test]
    fn test_like_literal_escapes_metacharacters() {
        assert_eq!(like_literal("100%"), "100\\%");
        assert_eq!(like_literal("a_b"), "a\\_b");
        assert_eq!(like_literal("a*b"), "a b");
    }

    #[test]
    fn test_ilike_filters() {
        assert_eq!(ilike_filter("técnica"), "ilike.*técnica*");
        assert_eq!(
            ilike_any_filter("nombre", &["tecnica".into(), "técnica".into()]),
            "(nombre.ilike.\"*tecnica*\",nombre.ilike.\"*técnica*\")"
        );
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_substring_page_params() {
        let filter = Filter::Substring {
            field: FIELD_NAME,
            pattern: "1",
        };
        let params = page_params(
            Table::Establecimientos,
            &filter,
            None,
            Page {
                offset: 400,
                limit: 200,
            },
        );
        assert_eq!(param(&params, "nombre"), Some("ilike.*1*"));
        assert_eq!(param(&params, "order"), Some("nombre,id"));
        assert_eq!(param(&params, "limit"), Some("200"));
        assert_eq!(param(&params, "offset"), Some("400"));
        assert!(param(&params, "select").unwrap().contains("contactos!left"));
    }

    #[test]
    fn test_related_and_scan_page_params() {
        let value = json!(900123);
        let id = json!("1");
        let filter = Filter::Related {
            field: "predio",
            value: &value,
            exclude_id: Some(&id),
        };
        let page = Page { offset: 0, limit: 50 };
        let params = page_params(Table::Establecimientos, &filter, None, page);
        assert_eq!(param(&params, "predio"), Some("eq.900123"));
        assert_eq!(param(&params, "id"), Some("neq.1"));
        assert_eq!(param(&params, "order"), Some("id"));

        let params = page_params(Table::Establecimientos, &Filter::All, Some(&["id", "distrito"][..]), page);
        assert_eq!(param(&params, "select"), Some("id,distrito"));
        assert_eq!(param(&params, "offset"), Some("0"));
    }

    #[test]
    fn test_page_size_follows_row_limit() {
        let store = PostgrestStore::new(&StoreConfig {
            store_url: Some("https://abc.supabase.co".into()),
            api_key: Some("anon-key".into()),
            row_limit: 75,
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(store.page_size(), 75);
    }

    #[test]
    fn test_ilike_any_quotes_reserved_characters() {
        let filter = ilike_any_filter("nombre", &["San José, \"Anexo\"".into()]);
        assert_eq!(filter, "(nombre.ilike.\"*San José, \\\"Anexo\\\"*\")");
    }
}
