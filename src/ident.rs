//! Identifier naming and quoting utilities
//! ---------------------------------------
//! Single source of truth for physical table names, model names, index names and
//! SQL quoting of identifiers/literals.

use once_cell::sync::Lazy;
use regex::Regex;
use xxhash_rust::xxh3::xxh3_64;

/// PostgreSQL truncates identifiers longer than this.
pub const MAX_IDENT_LEN: usize = 63;

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Physical table name for a dataset table: `data_<slug without hyphens>_<name without underscores>`.
pub fn physical_table_name(dataset_slug: &str, table_name: &str) -> String {
    format!("data_{}_{}", dataset_slug.replace('-', ""), table_name.replace('_', ""))
}

/// CamelCase model name from slug and table name: `covid-19` + `caso_full` -> `Covid19CasoFull`.
pub fn model_name(dataset_slug: &str, table_name: &str) -> String {
    let joined = format!("{}-{}", dataset_slug, table_name.replace('_', "-"));
    joined.split('-').map(capitalize).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Plain column/table identifier: letters, digits and underscores, not starting with a digit.
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENT_LEN && IDENT_RE.is_match(name)
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Split an ordering term into (column, descending). Only a leading `-` marks descending.
pub fn split_order_term(term: &str) -> (&str, bool) {
    let t = term.trim();
    match t.strip_prefix('-') {
        Some(rest) => (rest.trim(), true),
        None => (t, false),
    }
}

/// Deterministic index name `<table>_<cols>_<hash>_<suffix>`, shortened to fit `MAX_IDENT_LEN`.
/// The hash covers the full table and column list so truncation never produces collisions
/// between different index definitions on the same table.
pub fn index_name(db_table: &str, columns: &[&str], suffix: &str) -> String {
    let key = format!("{}|{}|{}", db_table, columns.join(","), suffix);
    let hash = format!("{:08x}", xxh3_64(key.as_bytes()) as u32);
    let tail = format!("_{}_{}", hash, suffix);
    let mut head = format!("{}_{}", db_table, columns.join("_"));
    let budget = MAX_IDENT_LEN - tail.len();
    if head.len() > budget {
        let mut cut = budget;
        while !head.is_char_boundary(cut) { cut -= 1; }
        head.truncate(cut);
    }
    format!("{}{}", head, tail)
}
