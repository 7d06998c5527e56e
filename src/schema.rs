//! Schema synthesis: DDL for the physical tables behind catalog tables.
//!
//! DDL runs inside a `SchemaEditor`, a transaction guard. Statements are executed
//! in order, deferred statements (index creation during `create_table`) run just
//! before COMMIT, and a guard dropped without `finish` issues ROLLBACK, so an
//! error at any step leaves the transaction closed. The synthesizer assumes a
//! single writer per table; it takes no locks of its own.

use tracing::{info, warn};

use crate::db::{Connection, DbError};
use crate::descriptor::{ColumnSource, IndexDef, IndexKind, TableDescriptor};
use crate::error::{EngineError, EngineResult};
use crate::ident::quote_ident;

pub struct SchemaEditor<'c> {
    conn: &'c mut dyn Connection,
    table: String,
    deferred: Vec<String>,
    open: bool,
}

impl<'c> SchemaEditor<'c> {
    pub fn begin(conn: &'c mut dyn Connection, table: &str) -> EngineResult<Self> {
        conn.batch_execute("BEGIN").map_err(|e| EngineError::schema(table, e))?;
        Ok(Self { conn, table: table.to_string(), deferred: Vec::new(), open: true })
    }

    pub fn execute(&mut self, sql: &str) -> EngineResult<()> {
        self.conn.batch_execute(sql).map_err(|e| EngineError::schema(&self.table, e))
    }

    /// Queue a statement to run right before commit.
    pub fn defer(&mut self, sql: String) { self.deferred.push(sql); }

    pub fn finish(mut self) -> EngineResult<()> {
        for sql in std::mem::take(&mut self.deferred) {
            self.execute(&sql)?;
        }
        self.open = false;
        self.conn.batch_execute("COMMIT").map_err(|e| EngineError::schema(&self.table, e))
    }
}

impl Drop for SchemaEditor<'_> {
    fn drop(&mut self) {
        if !self.open { return; }
        warn!(target: "dyntables::schema", "rolling back schema change on '{}'", self.table);
        if let Err(e) = self.conn.batch_execute("ROLLBACK") {
            warn!(target: "dyntables::schema", "rollback on '{}' failed: {}", self.table, e);
        }
    }
}

pub fn create_table_sql(desc: &TableDescriptor) -> String {
    let cols: Vec<String> = desc
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), c.column_type.sql());
            if c.source == ColumnSource::PrimaryKey {
                def.push_str(" NOT NULL PRIMARY KEY");
                return def;
            }
            def.push_str(if c.nullable { " NULL" } else { " NOT NULL" });
            if c.unique { def.push_str(" UNIQUE"); }
            def
        })
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(&desc.db_table), cols.join(", "))
}

pub fn create_index_sql(desc: &TableDescriptor, index: &IndexDef) -> String {
    let cols: Vec<String> = index
        .columns
        .iter()
        .map(|c| if c.descending { format!("{} DESC", quote_ident(&c.name)) } else { quote_ident(&c.name) })
        .collect();
    let method = match index.kind {
        IndexKind::BTree => "",
        IndexKind::Gin => " USING gin",
    };
    format!("CREATE INDEX {} ON {}{} ({})", quote_ident(&index.name), quote_ident(&desc.db_table), method, cols.join(", "))
}

pub fn drop_table_sql(desc: &TableDescriptor) -> String { format!("DROP TABLE {}", quote_ident(&desc.db_table)) }

pub fn analyse_sql(desc: &TableDescriptor) -> String { format!("VACUUM ANALYZE {}", quote_ident(&desc.db_table)) }

/// Create the physical table. With `create_indexes == false` no index is built, so
/// bulk loads run against a bare heap; call `create_indexes` afterwards.
pub fn create_table(conn: &mut dyn Connection, desc: &TableDescriptor, create_indexes: bool) -> EngineResult<()> {
    let mut editor = SchemaEditor::begin(conn, &desc.db_table)?;
    editor.execute(&create_table_sql(desc))?;
    if create_indexes {
        for index in &desc.indexes { editor.defer(create_index_sql(desc, index)); }
    }
    editor.finish()?;
    info!(
        target: "dyntables::schema",
        "created table '{}' ({} columns, {} indexes)",
        desc.db_table,
        desc.columns.len(),
        if create_indexes { desc.indexes.len() } else { 0 }
    );
    Ok(())
}

pub fn create_indexes(conn: &mut dyn Connection, desc: &TableDescriptor) -> EngineResult<()> {
    let mut editor = SchemaEditor::begin(conn, &desc.db_table)?;
    for index in &desc.indexes {
        editor.execute(&create_index_sql(desc, index))?;
    }
    editor.finish()?;
    info!(target: "dyntables::schema", "created {} indexes on '{}'", desc.indexes.len(), desc.db_table);
    Ok(())
}

/// Refresh planner statistics, including the row estimate read by unfiltered counts.
/// VACUUM cannot run inside a transaction block, so this bypasses `SchemaEditor`.
pub fn analyse_table(conn: &mut dyn Connection, desc: &TableDescriptor) -> EngineResult<()> {
    conn.batch_execute(&analyse_sql(desc)).map_err(|e| EngineError::schema(&desc.db_table, e))?;
    info!(target: "dyntables::schema", "analysed '{}'", desc.db_table);
    Ok(())
}

/// Drop the physical table. A missing table is an error, not a no-op.
pub fn delete_table(conn: &mut dyn Connection, desc: &TableDescriptor) -> EngineResult<()> {
    let mut editor = SchemaEditor::begin(conn, &desc.db_table)?;
    editor.execute(&drop_table_sql(desc))?;
    editor.finish()?;
    info!(target: "dyntables::schema", "dropped table '{}'", desc.db_table);
    Ok(())
}

/// Whether the physical table currently exists in the connected database.
pub fn table_exists(conn: &mut dyn Connection, desc: &TableDescriptor) -> Result<bool, DbError> {
    let found = conn.query_scalar("SELECT to_regclass($1)::text", &[quote_ident(&desc.db_table)])?;
    Ok(found.is_some())
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod schema_tests;
