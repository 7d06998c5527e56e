//! Human-readable declaration of a compiled table, for documentation and handoff.
//! Pure rendering; nothing here is executed.

use std::fmt::Write;

use crate::descriptor::{ColumnSource, IndexKind, TableDescriptor};

pub fn declaration(desc: &TableDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "model {} (table {})", desc.model_name, desc.db_table);
    let _ = writeln!(out, "  columns:");
    let width = desc.columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for c in &desc.columns {
        let kind = match c.source {
            ColumnSource::PrimaryKey => "primary key".to_string(),
            ColumnSource::Field { field_type, .. } => field_type.tag().to_string(),
            ColumnSource::SearchVector => "search vector".to_string(),
        };
        let mut flags: Vec<&str> = Vec::new();
        if c.source != ColumnSource::PrimaryKey { flags.push(if c.nullable { "null" } else { "not null" }); }
        if c.unique { flags.push("unique"); }
        let flags = if flags.is_empty() { String::new() } else { format!(", {}", flags.join(", ")) };
        let _ = writeln!(out, "    {:width$}  {} ({}{})", c.name, c.column_type.sql(), kind, flags, width = width);
    }
    let _ = writeln!(out, "  indexes:");
    if desc.indexes.is_empty() { let _ = writeln!(out, "    (none)"); }
    for idx in &desc.indexes {
        let method = match idx.kind { IndexKind::BTree => "btree", IndexKind::Gin => "gin" };
        let cols: Vec<String> = idx.columns.iter().map(|c| if c.descending { format!("-{}", c.name) } else { c.name.clone() }).collect();
        let _ = writeln!(out, "    {} {} [{}]", idx.name, method, cols.join(", "));
    }
    let _ = writeln!(out, "  ordering: [{}]", desc.config.ordering.join(", "));
    let _ = writeln!(out, "  filtering: [{}]", desc.config.filtering.join(", "));
    let _ = writeln!(out, "  search: [{}]", desc.config.search.join(", "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::fixtures::*;
    use crate::registry::DescriptorRegistry;

    #[test]
    fn renders_columns_indexes_and_config() {
        let store = MemoryCatalog::new(issues_catalog());
        let desc = DescriptorRegistry::new().get_descriptor(&store, 100, true).unwrap();
        let text = declaration(&desc);
        assert!(text.starts_with("model IssueTrackerIssues (table data_issuetracker_issues)\n"), "{}", text);
        assert!(text.contains("    status       varchar(16) (string, null)\n"), "{}", text);
        assert!(text.contains("    id           serial (primary key)\n"), "{}", text);
        assert!(text.contains(" btree [-created_at]\n"), "{}", text);
        assert!(text.contains(" gin [search_data]\n"), "{}", text);
        assert!(text.contains("  ordering: [-created_at]\n  filtering: [status]\n  search: [title, body]\n"), "{}", text);
        // pure: same input, same text
        assert_eq!(text, declaration(&desc));
    }

    #[test]
    fn table_without_config() {
        let store = MemoryCatalog::new(issues_catalog());
        let desc = DescriptorRegistry::new().get_descriptor(&store, 101, true).unwrap();
        let text = declaration(&desc);
        assert!(text.contains("  indexes:\n    (none)\n"), "{}", text);
        assert!(text.contains("  ordering: []\n"), "{}", text);
    }
}
