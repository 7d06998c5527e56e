//! Catalog rows shared by unit tests.

use chrono::NaiveDate;

use crate::catalog::*;

pub fn dataset(id: DatasetId, slug: &str) -> Dataset {
    Dataset {
        id,
        slug: slug.to_string(),
        name: format!("{} dataset", slug),
        description: String::new(),
        icon: "table".to_string(),
        author_name: "Open Data Team".to_string(),
        author_url: None,
        code_url: "https://example.org/code".to_string(),
        license_name: "CC BY-SA 4.0".to_string(),
        license_url: "https://creativecommons.org/licenses/by-sa/4.0/".to_string(),
        source_name: "Public Records".to_string(),
        source_url: "https://example.org/source".to_string(),
        show: true,
    }
}

pub fn version(id: VersionId, dataset_id: DatasetId, name: &str, order: u32) -> Version {
    Version {
        id,
        dataset_id,
        name: name.to_string(),
        collected_at: NaiveDate::from_ymd_opt(2020, 1, order.clamp(1, 28)).unwrap(),
        download_url: format!("https://example.org/{}.csv.gz", name),
        order,
    }
}

pub fn table(id: TableId, dataset_id: DatasetId, version_id: VersionId, name: &str) -> Table {
    Table {
        id,
        dataset_id,
        version_id,
        name: name.to_string(),
        default: false,
        options: None,
        ordering: Vec::new(),
        filtering: Vec::new(),
        search: Vec::new(),
        last_update: None,
    }
}

pub fn field(id: FieldId, table: &Table, name: &str, type_tag: &str, order: u32) -> Field {
    Field {
        id,
        dataset_id: table.dataset_id,
        table_id: table.id,
        version_id: Some(table.version_id),
        name: name.to_string(),
        title: name.replace('_', " "),
        description: None,
        type_tag: type_tag.to_string(),
        order,
        null: true,
        choices: None,
        has_choices: false,
        show_on_frontend: false,
        frontend_filter: false,
        obfuscate: false,
        show: true,
        options: None,
        link_template: None,
    }
}

fn strings(items: &[&str]) -> Vec<String> { items.iter().map(|s| s.to_string()).collect() }

/// Issue tracker table: filter on `status`, newest first, search over title/body.
pub fn issues_catalog() -> CatalogData {
    let ds = dataset(1, "issue-tracker");
    let v1 = version(10, 1, "2020-01", 1);
    let v2 = version(11, 1, "2020-02", 2);
    let mut old = table(99, 1, 10, "issues");
    old.default = true;
    let mut t = table(100, 1, 11, "issues");
    t.default = true;
    t.filtering = strings(&["status"]);
    t.ordering = strings(&["-created_at"]);
    t.search = strings(&["title", "body"]);
    let mut status = field(1001, &t, "status", "string", 2);
    status.options = Some(serde_json::json!({"max_length": 16}).as_object().cloned().unwrap());
    status.has_choices = true;
    status.show_on_frontend = true;
    let fields = vec![
        field(1000, &t, "created_at", "datetime", 1),
        status,
        field(1002, &t, "title", "string", 3),
        field(1003, &t, "body", "text", 4),
    ];
    let attachments = table(101, 1, 11, "attachments");
    CatalogData { datasets: vec![ds], versions: vec![v1, v2], tables: vec![old, t, attachments], fields }
}
