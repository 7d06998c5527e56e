//! Query builder over a compiled table descriptor.
//!
//! `TableQuery` accumulates equality predicates, an optional full-text predicate and
//! an ORDER BY list, all restricted to what the descriptor allows. Caller input that
//! does not fit (unknown filter keys, order fields outside ordering/filtering) is
//! dropped instead of rejected. Counting uses the planner's row estimate for the
//! unfiltered table and an exact COUNT(*) otherwise.

pub mod params;

pub use params::{FilterParams, SEARCH_PARAM};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::{Connection, DbError};
use crate::descriptor::{TableDescriptor, SEARCH_COLUMN};
use crate::error::{EngineError, EngineResult};
use crate::ident::{quote_ident, quote_literal, split_order_term};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals { column: String, value: String },
    Search { query: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub descending: bool,
}

impl OrderTerm {
    fn parse(term: &str) -> Self {
        let (column, descending) = split_order_term(term);
        Self { column: column.to_string(), descending }
    }

    pub fn sql(&self) -> String {
        if self.descending { format!("{} DESC", quote_ident(&self.column)) } else { quote_ident(&self.column) }
    }
}

#[derive(Debug, Clone)]
pub struct TableQuery {
    descriptor: Arc<TableDescriptor>,
    predicates: Vec<Predicate>,
    ordering: Vec<OrderTerm>,
    search_config: Option<String>,
    count: Option<u64>,
}

impl TableQuery {
    /// Base query: no predicates, ordered by the table's default ordering.
    pub fn new(descriptor: Arc<TableDescriptor>) -> Self {
        let ordering = descriptor.config.ordering.iter().map(|t| OrderTerm::parse(t)).collect();
        Self { descriptor, predicates: Vec::new(), ordering, search_config: None, count: None }
    }

    /// Text-search configuration passed to `plainto_tsquery`.
    pub fn with_search_config(mut self, config: Option<String>) -> Self {
        self.search_config = config;
        self
    }

    pub fn descriptor(&self) -> &TableDescriptor { &self.descriptor }
    pub fn predicates(&self) -> &[Predicate] { &self.predicates }
    pub fn ordering(&self) -> &[OrderTerm] { &self.ordering }
    pub fn is_filtered(&self) -> bool { !self.predicates.is_empty() }

    /// Add one equality predicate per filterable column with a non-null value in
    /// `params`, plus a full-text predicate for a non-empty `search` parameter when
    /// the table is searchable. Other keys are ignored.
    pub fn apply_filters(mut self, params: &FilterParams) -> Self {
        let desc = Arc::clone(&self.descriptor);
        for column in &desc.config.filtering {
            if let Some(value) = params.get(column) {
                self.predicates.push(Predicate::Equals { column: column.clone(), value: value.to_string() });
            }
        }
        if desc.is_searchable() {
            if let Some(q) = params.get(SEARCH_PARAM).filter(|q| !q.is_empty()) {
                self.predicates.push(Predicate::Search { query: q.to_string() });
            }
        }
        self.count = None;
        self
    }

    /// Order by the requested fields that belong to ordering ∪ filtering (matched
    /// case-insensitively, `-` prefix kept as descending). When none survive, the
    /// default ordering applies; an empty default means no ORDER BY at all.
    pub fn apply_ordering<S: AsRef<str>>(mut self, requested: &[S]) -> Self {
        let cfg = &self.descriptor.config;
        let mut allowed: HashMap<String, String> = HashMap::new();
        for term in cfg.ordering.iter().chain(cfg.filtering.iter()) {
            let (name, _) = split_order_term(term);
            allowed.insert(name.to_lowercase(), name.to_string());
        }
        let picked: Vec<OrderTerm> = requested
            .iter()
            .filter_map(|r| {
                let (name, descending) = split_order_term(r.as_ref());
                allowed.get(&name.to_lowercase()).map(|column| OrderTerm { column: column.clone(), descending })
            })
            .collect();
        self.ordering = if picked.is_empty() { cfg.ordering.iter().map(|t| OrderTerm::parse(t)).collect() } else { picked };
        self
    }

    /// WHERE clause (with leading space, empty when unfiltered) and its text parameters.
    pub fn where_clause(&self) -> (String, Vec<String>) {
        let mut parts: Vec<String> = Vec::with_capacity(self.predicates.len());
        let mut params: Vec<String> = Vec::with_capacity(self.predicates.len());
        for p in &self.predicates {
            let n = params.len() + 1;
            match p {
                Predicate::Equals { column, value } => {
                    let cast = self.descriptor.column(column).map(|c| c.column_type.param_cast()).unwrap_or("text");
                    let rhs = if cast == "text" { format!("${}::text", n) } else { format!("${}::text::{}", n, cast) };
                    parts.push(format!("{} = {}", quote_ident(column), rhs));
                    params.push(value.clone());
                }
                Predicate::Search { query } => {
                    let tsquery = match &self.search_config {
                        Some(cfg) => format!("plainto_tsquery({}::regconfig, ${}::text)", quote_literal(cfg), n),
                        None => format!("plainto_tsquery(${}::text)", n),
                    };
                    parts.push(format!("{} @@ {}", quote_ident(SEARCH_COLUMN), tsquery));
                    params.push(query.clone());
                }
            }
        }
        if parts.is_empty() { (String::new(), params) } else { (format!(" WHERE {}", parts.join(" AND ")), params) }
    }

    pub fn order_clause(&self) -> String {
        if self.ordering.is_empty() { return String::new(); }
        let terms: Vec<String> = self.ordering.iter().map(OrderTerm::sql).collect();
        format!(" ORDER BY {}", terms.join(", "))
    }

    pub fn count_sql(&self) -> (String, Vec<String>) {
        let (where_sql, params) = self.where_clause();
        (format!("SELECT COUNT(*)::text FROM {}{}", quote_ident(&self.descriptor.db_table), where_sql), params)
    }

    /// Rows as JSON objects; the search vector column is left out.
    pub fn select_sql(&self, limit: Option<u64>, offset: u64) -> (String, Vec<String>) {
        let (where_sql, params) = self.where_clause();
        let row = if self.descriptor.is_searchable() { format!("(to_jsonb(t) - {})::text", quote_literal(SEARCH_COLUMN)) } else { "to_jsonb(t)::text".to_string() };
        let mut sql = format!("SELECT {} FROM {} AS t{}{}", row, quote_ident(&self.descriptor.db_table), where_sql, self.order_clause());
        if let Some(n) = limit { sql.push_str(&format!(" LIMIT {}", n)); }
        if offset > 0 { sql.push_str(&format!(" OFFSET {}", offset)); }
        (sql, params)
    }

    /// Row count, computed once per query value. Unfiltered queries read the planner
    /// estimate (`pg_class.reltuples`, refreshed by ANALYZE) and fall back to an exact
    /// count when it is missing; any predicate forces an exact count.
    pub fn count(&mut self, conn: &mut dyn Connection) -> EngineResult<u64> {
        if let Some(n) = self.count { return Ok(n); }
        let n = if self.is_filtered() {
            self.exact_count(conn)?
        } else {
            match self.estimated_count(conn) {
                Ok(Some(n)) => n,
                Ok(None) => {
                    debug!(target: "dyntables::query", "no row estimate for '{}', counting", self.descriptor.db_table);
                    self.exact_count(conn)?
                }
                Err(e) => {
                    warn!(target: "dyntables::query", "row estimate lookup for '{}' failed ({}), counting", self.descriptor.db_table, e);
                    self.exact_count(conn)?
                }
            }
        };
        self.count = Some(n);
        Ok(n)
    }

    pub fn exact_count(&self, conn: &mut dyn Connection) -> EngineResult<u64> {
        let (sql, params) = self.count_sql();
        let value = conn.query_scalar(&sql, &params).map_err(|e| EngineError::query(&self.descriptor.db_table, e))?;
        parse_count(value.as_deref()).ok_or_else(|| {
            EngineError::query(&self.descriptor.db_table, DbError::new(format!("unexpected COUNT result {:?}", value)))
        })
    }

    /// Planner row estimate; `None` when the table has never been analysed.
    pub fn estimated_count(&self, conn: &mut dyn Connection) -> Result<Option<u64>, DbError> {
        let value = conn.query_scalar(
            "SELECT reltuples::bigint::text FROM pg_class WHERE relname = $1",
            &[self.descriptor.db_table.clone()],
        )?;
        Ok(value.as_deref().and_then(|v| v.trim().parse::<i64>().ok()).filter(|n| *n >= 0).map(|n| n as u64))
    }

    pub fn fetch(&self, conn: &mut dyn Connection, limit: Option<u64>, offset: u64) -> EngineResult<Vec<serde_json::Value>> {
        let (sql, params) = self.select_sql(limit, offset);
        let rows = conn.query(&sql, &params).map_err(|e| EngineError::query(&self.descriptor.db_table, e))?;
        rows.into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .map(|text| {
                serde_json::from_str(&text)
                    .map_err(|e| EngineError::query(&self.descriptor.db_table, DbError::new(format!("bad row json: {}", e))))
            })
            .collect()
    }
}

fn parse_count(value: Option<&str>) -> Option<u64> { value.and_then(|v| v.trim().parse::<u64>().ok()) }
