//! Compiled table descriptors.
//!
//! A `TableDescriptor` is the resolved, immutable view of one catalog table: physical
//! name, typed column list (implicit `id` primary key, one column per field, and the
//! synthetic search vector when the table is searchable), the derived index set and
//! the query configuration. `compile` is pure; caching lives in `registry`.

use std::collections::HashSet;

use crate::catalog::{Dataset, Field, FieldId, Table, TableId};
use crate::error::{EngineError, EngineResult};
use crate::ident::{self, split_order_term};
use crate::types::{ColumnType, FieldType};

pub const PRIMARY_KEY_COLUMN: &str = "id";
pub const SEARCH_COLUMN: &str = "search_data";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnSource {
    PrimaryKey,
    Field { field_id: FieldId, field_type: FieldType },
    SearchVector,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub source: ColumnSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Gin,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexColumn {
    pub name: String,
    pub descending: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexDef {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
}

impl IndexDef {
    pub fn references(&self, column: &str) -> bool { self.columns.iter().any(|c| c.name == column) }
}

/// Query-facing configuration of a table. Ordering terms keep their `-` marker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryConfig {
    pub ordering: Vec<String>,
    pub filtering: Vec<String>,
    pub search: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableDescriptor {
    pub table_id: TableId,
    pub db_table: String,
    pub model_name: String,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
    pub config: QueryConfig,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> { self.columns.iter().find(|c| c.name == name) }

    /// Columns backed by catalog fields, in field order.
    pub fn field_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| matches!(c.source, ColumnSource::Field { .. }))
    }

    pub fn is_searchable(&self) -> bool { !self.config.search.is_empty() }
}

/// Resolve a table and its fields into a descriptor.
pub fn compile(dataset: &Dataset, table: &Table, fields: &[Field]) -> EngineResult<TableDescriptor> {
    let db_table = table.db_table(dataset);
    let mut columns: Vec<ColumnDef> = Vec::with_capacity(fields.len() + 2);
    columns.push(ColumnDef {
        name: PRIMARY_KEY_COLUMN.to_string(),
        column_type: ColumnType::Serial,
        nullable: false,
        unique: false,
        source: ColumnSource::PrimaryKey,
    });
    let mut seen: HashSet<&str> = HashSet::new();
    for f in fields {
        if !ident::is_valid_identifier(&f.name) {
            return Err(EngineError::invalid_metadata(&db_table, format!("field name '{}' is not a valid column name", f.name)));
        }
        if f.name == PRIMARY_KEY_COLUMN || f.name == SEARCH_COLUMN {
            return Err(EngineError::invalid_metadata(&db_table, format!("field name '{}' is reserved", f.name)));
        }
        if !seen.insert(f.name.as_str()) {
            return Err(EngineError::invalid_metadata(&db_table, format!("duplicate field name '{}'", f.name)));
        }
        let field_type = FieldType::from_tag(&f.type_tag)
            .ok_or_else(|| EngineError::UnknownFieldType { field: f.name.clone(), type_name: f.type_tag.clone() })?;
        let resolved = field_type
            .resolve(f.options.as_ref())
            .map_err(|message| EngineError::InvalidFieldOptions { field: f.name.clone(), message })?;
        columns.push(ColumnDef {
            name: f.name.clone(),
            column_type: resolved.column_type,
            nullable: f.null,
            unique: resolved.unique,
            source: ColumnSource::Field { field_id: f.id, field_type },
        });
    }

    let config = QueryConfig { ordering: table.ordering.clone(), filtering: table.filtering.clone(), search: table.search.clone() };
    for (list, names) in [("ordering", &config.ordering), ("filtering", &config.filtering), ("search", &config.search)] {
        for term in names {
            let (name, descending) = split_order_term(term);
            if descending && list != "ordering" {
                return Err(EngineError::invalid_metadata(&db_table, format!("{} entry '{}' cannot be descending", list, term)));
            }
            if !seen.contains(name) {
                return Err(EngineError::invalid_metadata(&db_table, format!("{} references unknown field '{}'", list, name)));
            }
        }
    }

    if !config.search.is_empty() {
        columns.push(ColumnDef {
            name: SEARCH_COLUMN.to_string(),
            column_type: ColumnType::TsVector,
            nullable: true,
            unique: false,
            source: ColumnSource::SearchVector,
        });
    }

    Ok(TableDescriptor {
        table_id: table.id,
        model_name: ident::model_name(&dataset.slug, &table.name),
        indexes: derive_indexes(&db_table, &config),
        db_table,
        columns,
        config,
    })
}

/// Index set for a table: one composite index over `ordering`, one single-column
/// index per `filtering` column (skipped when `ordering` is exactly that column),
/// and a GIN index over the search vector when the table is searchable.
pub fn derive_indexes(db_table: &str, config: &QueryConfig) -> Vec<IndexDef> {
    let mut out: Vec<IndexDef> = Vec::new();
    if !config.ordering.is_empty() {
        let columns: Vec<IndexColumn> = config
            .ordering
            .iter()
            .map(|term| {
                let (name, descending) = split_order_term(term);
                IndexColumn { name: name.to_string(), descending }
            })
            .collect();
        out.push(btree(db_table, columns));
    }
    for name in &config.filtering {
        if config.ordering.len() == 1 && config.ordering[0] == *name { continue; }
        out.push(btree(db_table, vec![IndexColumn { name: name.clone(), descending: false }]));
    }
    if !config.search.is_empty() {
        out.push(IndexDef {
            name: ident::index_name(db_table, &[SEARCH_COLUMN], "gin"),
            kind: IndexKind::Gin,
            columns: vec![IndexColumn { name: SEARCH_COLUMN.to_string(), descending: false }],
        });
    }
    out
}

fn btree(db_table: &str, columns: Vec<IndexColumn>) -> IndexDef {
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    IndexDef { name: ident::index_name(db_table, &names, "idx"), kind: IndexKind::BTree, columns }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod descriptor_tests;
