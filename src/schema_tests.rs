use super::*;
use crate::catalog::MemoryCatalog;
use crate::db::RecordingConnection;
use crate::fixtures::*;
use crate::registry::DescriptorRegistry;
use std::sync::Arc;

fn issues_descriptor() -> Arc<TableDescriptor> {
    let store = MemoryCatalog::new(issues_catalog());
    DescriptorRegistry::new().get_descriptor(&store, 100, true).unwrap()
}

#[test]
fn create_table_sql_lists_typed_columns() {
    let d = issues_descriptor();
    assert_eq!(
        create_table_sql(&d),
        "CREATE TABLE \"data_issuetracker_issues\" (\"id\" serial NOT NULL PRIMARY KEY, \
         \"created_at\" timestamp with time zone NULL, \"status\" varchar(16) NULL, \
         \"title\" varchar(255) NULL, \"body\" text NULL, \"search_data\" tsvector NULL)"
    );
}

#[test]
fn index_sql_keeps_direction_and_method() {
    let d = issues_descriptor();
    let ordering = create_index_sql(&d, &d.indexes[0]);
    assert!(ordering.ends_with("ON \"data_issuetracker_issues\" (\"created_at\" DESC)"), "{}", ordering);
    let gin = create_index_sql(&d, &d.indexes[2]);
    assert!(gin.ends_with("ON \"data_issuetracker_issues\" USING gin (\"search_data\")"), "{}", gin);
}

#[test]
fn create_with_indexes_runs_in_one_transaction() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new();
    create_table(&mut conn, &d, true).unwrap();
    let log = conn.sql_log();
    assert_eq!(log.first(), Some(&"BEGIN"));
    assert!(log[1].starts_with("CREATE TABLE"));
    assert_eq!(log.iter().filter(|s| s.starts_with("CREATE INDEX")).count(), 3);
    assert_eq!(log.last(), Some(&"COMMIT"));
    assert!(conn.has_table("data_issuetracker_issues"));
}

#[test]
fn create_without_indexes_then_index_later() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new();
    create_table(&mut conn, &d, false).unwrap();
    assert!(conn.sql_log().iter().all(|s| !s.starts_with("CREATE INDEX")));
    conn.clear_log();
    create_indexes(&mut conn, &d).unwrap();
    assert_eq!(conn.sql_log().iter().filter(|s| s.starts_with("CREATE INDEX")).count(), 3);
}

#[test]
fn failed_index_rolls_back_the_table() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new();
    conn.fail("USING gin", DbError::with_code("access method \"gin\" does not exist", "42704"));
    let err = create_table(&mut conn, &d, true).unwrap_err();
    assert!(matches!(err, EngineError::Schema { ref table, .. } if table == "data_issuetracker_issues"));
    assert_eq!(err.sqlstate(), "42704");
    assert_eq!(conn.sql_log().last(), Some(&"ROLLBACK"));
    assert!(!conn.in_transaction());
    assert!(!conn.has_table("data_issuetracker_issues"));
}

#[test]
fn create_then_delete_leaves_nothing_and_second_delete_fails() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new();
    create_table(&mut conn, &d, true).unwrap();
    delete_table(&mut conn, &d).unwrap();
    assert!(!conn.has_table("data_issuetracker_issues"));
    let err = delete_table(&mut conn, &d).unwrap_err();
    assert_eq!(err.sqlstate(), "42P01");
    assert!(!conn.in_transaction());
}

#[test]
fn analyse_runs_outside_a_transaction() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new().with_table("data_issuetracker_issues");
    analyse_table(&mut conn, &d).unwrap();
    assert_eq!(conn.sql_log(), vec!["VACUUM ANALYZE \"data_issuetracker_issues\""]);
}

#[test]
fn editor_dropped_without_finish_rolls_back() {
    let mut conn = RecordingConnection::new();
    {
        let mut editor = SchemaEditor::begin(&mut conn, "t").unwrap();
        editor.execute("CREATE TABLE \"t\" (\"id\" serial)").unwrap();
    }
    assert_eq!(conn.sql_log().last(), Some(&"ROLLBACK"));
    assert!(!conn.has_table("t"));
}

#[test]
fn drop_does_not_cascade_and_dependency_errors_surface() {
    let d = issues_descriptor();
    assert_eq!(drop_table_sql(&d), "DROP TABLE \"data_issuetracker_issues\"");
    let mut conn = RecordingConnection::new().with_table("data_issuetracker_issues");
    conn.fail(
        "DROP TABLE",
        DbError::with_code("cannot drop table data_issuetracker_issues because other objects depend on it", "2BP01"),
    );
    let err = delete_table(&mut conn, &d).unwrap_err();
    assert!(matches!(err, EngineError::Schema { .. }));
    assert_eq!(err.sqlstate(), "2BP01");
    assert_eq!(conn.sql_log().last(), Some(&"ROLLBACK"));
    assert!(conn.has_table("data_issuetracker_issues"));
}

#[test]
fn table_exists_follows_create_and_delete() {
    let d = issues_descriptor();
    let mut conn = RecordingConnection::new();
    assert!(!table_exists(&mut conn, &d).unwrap());
    create_table(&mut conn, &d, false).unwrap();
    assert!(table_exists(&mut conn, &d).unwrap());
    assert_eq!(conn.statements().last().unwrap().params, vec!["\"data_issuetracker_issues\""]);
    delete_table(&mut conn, &d).unwrap();
    assert!(!table_exists(&mut conn, &d).unwrap());
}
