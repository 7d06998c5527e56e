//! Runs against a real PostgreSQL server when DYNTABLES_TEST_DATABASE_URL is set;
//! otherwise every test returns early.

use std::sync::Arc;

use dyntables::catalog::{MemoryCatalog, MetadataStore};
use dyntables::db::{Connection, PgConnection};
use dyntables::{DescriptorRegistry, Engine, EngineConfig, EngineError, FilterParams};

fn database_url() -> Option<String> {
    match std::env::var("DYNTABLES_TEST_DATABASE_URL") {
        Ok(u) if !u.trim().is_empty() => Some(u),
        _ => {
            eprintln!("DYNTABLES_TEST_DATABASE_URL not set; skipping live postgres test");
            None
        }
    }
}

fn catalog(slug: &str) -> MemoryCatalog {
    let json = format!(
        r#"{{
          "datasets": [{{"id": 1, "slug": "{slug}", "name": "Live", "author_name": "tests", "source_name": "tests"}}],
          "versions": [{{"id": 1, "dataset_id": 1, "name": "v1", "collected_at": "2024-01-01", "download_url": "", "order": 1}}],
          "tables": [{{"id": 1, "dataset_id": 1, "version_id": 1, "name": "places", "default": true,
                       "ordering": ["-confirmed"], "filtering": ["state", "is_last"], "search": ["city"]}}],
          "fields": [
            {{"id": 1, "dataset_id": 1, "table_id": 1, "name": "state", "type": "string", "order": 1,
              "options": {{"max_length": 2}}, "has_choices": true, "show_on_frontend": true}},
            {{"id": 2, "dataset_id": 1, "table_id": 1, "name": "city", "type": "text", "order": 2}},
            {{"id": 3, "dataset_id": 1, "table_id": 1, "name": "is_last", "type": "bool", "order": 3}},
            {{"id": 4, "dataset_id": 1, "table_id": 1, "name": "confirmed", "type": "integer", "order": 4,
              "has_choices": true, "show_on_frontend": true}}
          ]
        }}"#,
        slug = slug
    );
    MemoryCatalog::from_json_str(&json).expect("inline catalog")
}

#[test]
fn table_lifecycle_against_postgres() {
    let Some(url) = database_url() else { return; };
    let slug = format!("live-{}", std::process::id());
    let store = Arc::new(catalog(&slug));
    let config = EngineConfig { search_config: Some("simple".to_string()), ..EngineConfig::default() };
    let engine = Engine::with_registry(store.clone(), Arc::new(DescriptorRegistry::new()), config);
    let mut conn = PgConnection::connect(&url).expect("connect");
    let desc = engine.descriptor(1).unwrap();

    assert!(!engine.table_exists(&mut conn, 1).unwrap());
    engine.create_table(&mut conn, 1, false).unwrap();
    assert!(engine.table_exists(&mut conn, 1).unwrap());
    let insert = format!(
        "INSERT INTO \"{}\" (\"state\", \"city\", \"is_last\", \"confirmed\") VALUES ($1::text, $2::text, $3::text::boolean, $4::text::integer)",
        desc.db_table
    );
    for (state, city, last, confirmed) in [("a", "Campinas", "true", "10"), ("a", "Santos", "false", "7"), ("b", "Niteroi", "true", "3")] {
        let n = conn.execute(&insert, &[state.into(), city.into(), last.into(), confirmed.into()]).unwrap();
        assert_eq!(n, 1);
    }
    engine.create_indexes(&mut conn, 1).unwrap();
    engine.analyse_table(&mut conn, 1).unwrap();

    let q = engine.query(1).unwrap();
    assert_eq!(q.estimated_count(&mut conn).unwrap(), Some(3));
    assert_eq!(q.exact_count(&mut conn).unwrap(), 3);

    let mut a_last = engine.query(1).unwrap().apply_filters(&FilterParams::new().set("state", "a").set("is_last", "true"));
    assert_eq!(a_last.count(&mut conn).unwrap(), 1);

    let rows = engine.query(1).unwrap().fetch(&mut conn, None, 0).unwrap();
    let confirmed: Vec<i64> = rows.iter().map(|r| r["confirmed"].as_i64().unwrap()).collect();
    assert_eq!(confirmed, vec![10, 7, 3]);
    assert!(rows[0].get("search_data").is_none());

    assert_eq!(engine.update_search_index(&mut conn, 1).unwrap(), 3);
    let mut found = engine.query(1).unwrap().apply_filters(&FilterParams::new().set("search", "santos"));
    assert_eq!(found.count(&mut conn).unwrap(), 1);

    let choices = engine.update_choices(&mut conn, 1).unwrap().unwrap();
    assert_eq!(choices.data, vec!["a", "b"]);
    assert_eq!(store.field(1).unwrap().choices.unwrap().data, vec!["a", "b"]);
    // numeric order, not text order
    let numbers = engine.update_choices(&mut conn, 4).unwrap().unwrap();
    assert_eq!(numbers.data, vec!["3", "7", "10"]);

    engine.delete_table(&mut conn, 1).unwrap();
    assert!(!engine.table_exists(&mut conn, 1).unwrap());
    let err = engine.delete_table(&mut conn, 1).unwrap_err();
    assert!(matches!(err, EngineError::Schema { .. }));
    assert_eq!(err.sqlstate(), "42P01");
    // connection is usable after the failed transaction
    assert_eq!(conn.query_scalar("SELECT 1::text", &[]).unwrap().as_deref(), Some("1"));
}

#[test]
fn dependent_view_blocks_delete() {
    let Some(url) = database_url() else { return; };
    let slug = format!("dep-{}", std::process::id());
    let store = Arc::new(catalog(&slug));
    let engine = Engine::with_registry(store, Arc::new(DescriptorRegistry::new()), EngineConfig::default());
    let mut conn = PgConnection::connect(&url).expect("connect");
    let desc = engine.descriptor(1).unwrap();

    engine.create_table(&mut conn, 1, false).unwrap();
    let view = format!("\"{}_v\"", desc.db_table);
    conn.batch_execute(&format!("CREATE VIEW {} AS SELECT \"state\" FROM \"{}\"", view, desc.db_table)).unwrap();
    let err = engine.delete_table(&mut conn, 1).unwrap_err();
    assert_eq!(err.sqlstate(), "2BP01");
    assert!(engine.table_exists(&mut conn, 1).unwrap());

    conn.batch_execute(&format!("DROP VIEW {}", view)).unwrap();
    engine.delete_table(&mut conn, 1).unwrap();
    assert!(!engine.table_exists(&mut conn, 1).unwrap());
}

#[test]
fn never_analysed_table_falls_back_to_exact_count() {
    let Some(url) = database_url() else { return; };
    let slug = format!("fresh-{}", std::process::id());
    let store = Arc::new(catalog(&slug));
    let engine = Engine::with_registry(store, Arc::new(DescriptorRegistry::new()), EngineConfig::default());
    let mut conn = PgConnection::connect(&url).expect("connect");

    engine.create_table(&mut conn, 1, true).unwrap();
    let mut q = engine.query(1).unwrap();
    let counted = q.count(&mut conn);
    engine.delete_table(&mut conn, 1).unwrap();
    assert_eq!(counted.unwrap(), 0);
}
