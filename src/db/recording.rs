//! In-process connection that records statements and answers from scripted rules.
//!
//! It tracks which tables exist (CREATE TABLE / DROP TABLE / CREATE INDEX ... ON) with
//! transaction rollback, mirroring the PostgreSQL errors for duplicate and missing
//! relations. Everything else returns empty results unless a rule matches.

use std::collections::BTreeSet;

use super::{Connection, DbError, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(DbError),
}

#[derive(Debug, Default)]
pub struct RecordingConnection {
    log: Vec<Statement>,
    rules: Vec<(String, Response)>,
    tables: BTreeSet<String>,
    /// Table set at BEGIN, restored on ROLLBACK.
    savepoint: Option<BTreeSet<String>>,
}

fn quoted_name_after<'a>(sql: &'a str, marker: &str) -> Option<&'a str> {
    let start = sql.find(marker)? + marker.len();
    let rest = sql[start..].trim_start().strip_prefix('"')?;
    rest.find('"').map(|end| &rest[..end])
}

impl RecordingConnection {
    pub fn new() -> Self { Self::default() }

    pub fn with_table(mut self, name: &str) -> Self {
        self.tables.insert(name.to_string());
        self
    }

    /// Answer queries whose SQL contains `pattern` with `rows`. Later rules win.
    pub fn respond(&mut self, pattern: &str, rows: Vec<Row>) -> &mut Self {
        self.rules.push((pattern.to_string(), Response::Rows(rows)));
        self
    }

    /// Answer statements containing `pattern` with an affected-row count.
    pub fn affect(&mut self, pattern: &str, count: u64) -> &mut Self {
        self.rules.push((pattern.to_string(), Response::Affected(count)));
        self
    }

    pub fn fail(&mut self, pattern: &str, err: DbError) -> &mut Self {
        self.rules.push((pattern.to_string(), Response::Fail(err)));
        self
    }

    pub fn statements(&self) -> &[Statement] { &self.log }

    pub fn sql_log(&self) -> Vec<&str> { self.log.iter().map(|s| s.sql.as_str()).collect() }

    pub fn clear_log(&mut self) { self.log.clear(); }

    pub fn has_table(&self, name: &str) -> bool { self.tables.contains(name) }

    pub fn in_transaction(&self) -> bool { self.savepoint.is_some() }

    fn rule_for(&self, sql: &str) -> Option<Response> {
        self.rules.iter().rev().find(|(p, _)| sql.contains(p.as_str())).map(|(_, r)| r.clone())
    }

    fn record(&mut self, sql: &str, params: &[String]) -> Result<Option<Response>, DbError> {
        self.log.push(Statement { sql: sql.to_string(), params: params.to_vec() });
        match self.rule_for(sql) {
            Some(Response::Fail(e)) => Err(e),
            other => Ok(other),
        }
    }

    /// `to_regclass` over the tracked tables: the name when it exists, NULL otherwise.
    fn regclass(&self, params: &[String]) -> Option<String> {
        let name = params.first()?.trim_matches('"');
        self.tables.contains(name).then(|| name.to_string())
    }

    fn apply_ddl(&mut self, sql: &str) -> Result<(), DbError> {
        let trimmed = sql.trim_start();
        match trimmed {
            "BEGIN" => { self.savepoint = Some(self.tables.clone()); }
            "COMMIT" => { self.savepoint = None; }
            "ROLLBACK" => {
                if let Some(saved) = self.savepoint.take() { self.tables = saved; }
            }
            _ if trimmed.starts_with("CREATE TABLE") => {
                let name = quoted_name_after(trimmed, "CREATE TABLE").unwrap_or_default().to_string();
                if !self.tables.insert(name.clone()) {
                    return Err(DbError::with_code(format!("relation \"{}\" already exists", name), "42P07"));
                }
            }
            _ if trimmed.starts_with("DROP TABLE") => {
                let name = quoted_name_after(trimmed, "DROP TABLE").unwrap_or_default();
                if !self.tables.remove(name) {
                    return Err(DbError::with_code(format!("table \"{}\" does not exist", name), "42P01"));
                }
            }
            _ if trimmed.starts_with("CREATE INDEX") || trimmed.starts_with("VACUUM") => {
                let marker = if trimmed.starts_with("VACUUM") { "ANALYZE" } else { " ON" };
                let name = quoted_name_after(trimmed, marker).unwrap_or_default();
                if !self.tables.contains(name) {
                    return Err(DbError::with_code(format!("relation \"{}\" does not exist", name), "42P01"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Connection for RecordingConnection {
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.record(sql, &[])?;
        self.apply_ddl(sql)
    }

    fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, DbError> {
        match self.record(sql, params)? {
            Some(Response::Affected(n)) => Ok(n),
            Some(Response::Rows(rows)) => Ok(rows.len() as u64),
            _ => Ok(0),
        }
    }

    fn query(&mut self, sql: &str, params: &[String]) -> Result<Vec<Row>, DbError> {
        match self.record(sql, params)? {
            Some(Response::Rows(rows)) => Ok(rows),
            _ if sql.contains("to_regclass(") => Ok(vec![vec![self.regclass(params)]]),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_tables_and_rolls_back() {
        let mut c = RecordingConnection::new();
        c.batch_execute("BEGIN").unwrap();
        c.batch_execute("CREATE TABLE \"t1\" (\"id\" serial)").unwrap();
        assert!(c.has_table("t1"));
        c.batch_execute("ROLLBACK").unwrap();
        assert!(!c.has_table("t1"));
        let err = c.batch_execute("DROP TABLE \"t1\"").unwrap_err();
        assert_eq!(err.code.as_deref(), Some("42P01"));
    }

    #[test]
    fn later_rules_win() {
        let mut c = RecordingConnection::new();
        c.respond("SELECT", vec![vec![Some("1".into())]]);
        c.respond("SELECT COUNT", vec![vec![Some("9".into())]]);
        assert_eq!(c.query_scalar("SELECT COUNT(*) FROM x", &[]).unwrap().as_deref(), Some("9"));
        assert_eq!(c.query_scalar("SELECT 1", &[]).unwrap().as_deref(), Some("1"));
        c.fail("SELECT 1", DbError::new("nope"));
        assert!(c.query("SELECT 1", &[]).is_err());
        assert_eq!(c.statements().len(), 3);
    }
}
