//!
//! dyntables-admin
//! ---------------
//! Administrative front end for the dynamic table engine: creates, indexes,
//! analyses and drops physical tables described by a JSON catalog snapshot,
//! refreshes choices and search vectors, and runs ad-hoc counts/row fetches.

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dyntables::catalog::{MemoryCatalog, MetadataStore};
use dyntables::{Engine, EngineConfig, FilterParams, PgConnection};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <command> [flags]\n\nCommands:\n  create-table --table <id> [--no-indexes]\n  create-indexes --table <id>\n  analyse --table <id>\n  delete-table --table <id>\n  update-choices (--table <id> | --field <id>)\n  update-search-index --table <id>\n  declaration --table <id>\n  dataset-declaration --dataset <slug>\n  count --table <id> [--filter k=v]... [--search <q>]\n  rows --table <id> [--filter k=v]... [--search <q>] [--order <field>]... [--limit <n>] [--offset <n>]\n\nFlags:\n  --catalog <path>         JSON catalog snapshot (default: $DYNTABLES_CATALOG or catalog.json)\n  --database-url <url>     PostgreSQL URL (default: $DYNTABLES_DATABASE_URL)\n  -h, --help               Show this help"
    );
}

#[derive(Debug, Default)]
struct Args {
    command: String,
    table: Option<i64>,
    field: Option<i64>,
    dataset: Option<String>,
    no_indexes: bool,
    filters: Vec<String>,
    search: Option<String>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: u64,
    catalog: Option<String>,
    database_url: Option<String>,
}

fn parse_args(mut args: Vec<String>) -> Result<Args> {
    let mut out = Args::default();
    if args.is_empty() { bail!("missing command"); }
    out.command = args.remove(0);
    let mut i = 0;
    let value = |i: usize, flag: &str| -> Result<String> {
        args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} requires a value", flag))
    };
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--table" => { out.table = Some(value(i, flag)?.parse().context("--table expects an id")?); i += 2; }
            "--field" => { out.field = Some(value(i, flag)?.parse().context("--field expects an id")?); i += 2; }
            "--dataset" => { out.dataset = Some(value(i, flag)?); i += 2; }
            "--no-indexes" => { out.no_indexes = true; i += 1; }
            "--filter" => { out.filters.push(value(i, flag)?); i += 2; }
            "--search" => { out.search = Some(value(i, flag)?); i += 2; }
            "--order" => { out.order.push(value(i, flag)?); i += 2; }
            "--limit" => { out.limit = Some(value(i, flag)?.parse().context("--limit expects a number")?); i += 2; }
            "--offset" => { out.offset = value(i, flag)?.parse().context("--offset expects a number")?; i += 2; }
            "--catalog" => { out.catalog = Some(value(i, flag)?); i += 2; }
            "--database-url" => { out.database_url = Some(value(i, flag)?); i += 2; }
            other => bail!("unknown flag '{}'", other),
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    let mut argv: Vec<String> = env::args().collect();
    let program = argv.remove(0);
    if argv.is_empty() || argv.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(&program);
        return Ok(());
    }

    let mut config = EngineConfig::from_env()?;
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    fmt().with_env_filter(filter).init();

    let args = match parse_args(argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    };
    if let Some(p) = &args.catalog { config.catalog_path = p.into(); }
    if let Some(u) = &args.database_url { config.database_url = Some(u.clone()); }

    let catalog = Arc::new(MemoryCatalog::from_json_file(&config.catalog_path)?);
    info!(target: "dyntables", "dyntables-admin: command='{}', catalog='{}'", args.command, config.catalog_path.display());
    let engine = Engine::new(catalog.clone(), config.clone());

    let table = || args.table.ok_or_else(|| anyhow!("--table is required for '{}'", args.command));
    let connect = || -> Result<PgConnection> {
        let url = config.require_database_url()?;
        PgConnection::connect(url).context("connecting to postgres")
    };

    match args.command.as_str() {
        "declaration" => print!("{}", engine.declaration(table()?)?),
        "dataset-declaration" => {
            let slug = args.dataset.as_deref().ok_or_else(|| anyhow!("--dataset is required"))?;
            let dataset = catalog.dataset_by_slug(slug)?;
            print!("{}", engine.dataset_declaration(dataset.id)?);
        }
        "create-table" => engine.create_table(&mut connect()?, table()?, !args.no_indexes)?,
        "create-indexes" => engine.create_indexes(&mut connect()?, table()?)?,
        "analyse" => engine.analyse_table(&mut connect()?, table()?)?,
        "delete-table" => engine.delete_table(&mut connect()?, table()?)?,
        "update-search-index" => {
            let n = engine.update_search_index(&mut connect()?, table()?)?;
            println!("{} rows updated", n);
        }
        "update-choices" => {
            let mut conn = connect()?;
            match (args.field, args.table) {
                (Some(field_id), _) => {
                    let choices = engine.update_choices(&mut conn, field_id)?;
                    println!("{}", choices.map(|c| c.data.len().to_string()).unwrap_or_else(|| "field is not choiceable".into()));
                }
                (None, Some(table_id)) => println!("{} fields updated", engine.update_table_choices(&mut conn, table_id)?),
                (None, None) => bail!("update-choices needs --table or --field"),
            }
            catalog.write_json_file(&config.catalog_path)?;
        }
        "count" | "rows" => {
            let mut params = FilterParams::from_pairs(args.filters.iter().map(String::as_str)).map_err(|e| anyhow!(e))?;
            if let Some(q) = &args.search { params.insert("search", Some(q.clone())); }
            let mut query = engine.query(table()?)?.apply_filters(&params).apply_ordering(&args.order[..]);
            let mut conn = connect()?;
            if args.command == "count" {
                println!("{}", query.count(&mut conn)?);
            } else {
                for row in query.fetch(&mut conn, args.limit.or(Some(20)), args.offset)? {
                    println!("{}", row);
                }
            }
        }
        other => {
            eprintln!("unknown command '{}'", other);
            print_usage(&program);
            std::process::exit(2);
        }
    }
    Ok(())
}
