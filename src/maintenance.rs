//! Batch maintenance over physical tables: distinct-value choice lists for
//! choiceable fields and the full-text search vector. Both are full-table scans,
//! meant for administrative or scheduled runs, never the request path.

use tracing::{debug, info};

use crate::catalog::{Field, FieldChoices, MetadataStore};
use crate::db::Connection;
use crate::descriptor::{TableDescriptor, SEARCH_COLUMN};
use crate::error::{EngineError, EngineResult};
use crate::ident::{quote_ident, quote_literal};

pub fn distinct_values_sql(desc: &TableDescriptor, column: &str) -> String {
    let col = quote_ident(column);
    format!(
        "SELECT v::text FROM (SELECT DISTINCT {col} AS v FROM {table} WHERE {col} IS NOT NULL) AS d ORDER BY d.v",
        col = col,
        table = quote_ident(&desc.db_table),
    )
}

/// Recompute and store the choices of one field. Fields that are not both
/// `has_choices` and `show_on_frontend` are skipped and yield `None`.
/// Values are sorted by the column's own type, then rendered as text.
/// NULL is never a choice; a nullable column yields only its non-null values.
pub fn update_choices(
    conn: &mut dyn Connection,
    store: &dyn MetadataStore,
    desc: &TableDescriptor,
    field: &Field,
) -> EngineResult<Option<FieldChoices>> {
    if !field.is_choiceable() {
        debug!(target: "dyntables::maintenance", "field '{}' is not choiceable, skipping", field.name);
        return Ok(None);
    }
    if field.table_id != desc.table_id || desc.column(&field.name).is_none() {
        return Err(EngineError::invalid_metadata(&desc.db_table, format!("field '{}' does not belong to this table", field.name)));
    }
    let rows = conn
        .query(&distinct_values_sql(desc, &field.name), &[])
        .map_err(|e| EngineError::query(&desc.db_table, e))?;
    let choices = FieldChoices { data: rows.into_iter().filter_map(|r| r.into_iter().next().flatten()).collect() };
    store.set_field_choices(field.id, choices.clone())?;
    info!(target: "dyntables::maintenance", "field '{}.{}': {} choices", desc.db_table, field.name, choices.data.len());
    Ok(Some(choices))
}

/// Refresh choices for every choiceable field of the table. Returns how many fields were updated.
pub fn update_table_choices(conn: &mut dyn Connection, store: &dyn MetadataStore, desc: &TableDescriptor) -> EngineResult<usize> {
    let mut updated = 0;
    for field in store.choiceable_fields(desc.table_id)? {
        if update_choices(conn, store, desc, &field)?.is_some() { updated += 1; }
    }
    Ok(updated)
}

pub fn search_update_sql(desc: &TableDescriptor, search_config: Option<&str>) -> Option<String> {
    if !desc.is_searchable() { return None; }
    let document: Vec<String> = desc.config.search.iter().map(|c| format!("COALESCE({}::text, '')", quote_ident(c))).collect();
    let document = document.join(" || ' ' || ");
    let vector = match search_config {
        Some(cfg) => format!("to_tsvector({}::regconfig, {})", quote_literal(cfg), document),
        None => format!("to_tsvector({})", document),
    };
    Some(format!("UPDATE {} SET {} = {}", quote_ident(&desc.db_table), quote_ident(SEARCH_COLUMN), vector))
}

/// Rebuild the search vector of every row. Rows written since the last run are not
/// searchable until this runs again. Returns the number of rows updated; tables
/// without search columns are left alone.
pub fn update_search_index(conn: &mut dyn Connection, desc: &TableDescriptor, search_config: Option<&str>) -> EngineResult<u64> {
    let Some(sql) = search_update_sql(desc, search_config) else {
        debug!(target: "dyntables::maintenance", "'{}' has no search columns", desc.db_table);
        return Ok(0);
    };
    let n = conn.execute(&sql, &[]).map_err(|e| EngineError::query(&desc.db_table, e))?;
    info!(target: "dyntables::maintenance", "rebuilt search vector of {} rows in '{}'", n, desc.db_table);
    Ok(n)
}
