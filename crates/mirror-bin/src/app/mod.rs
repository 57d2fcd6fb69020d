//! Command implementations.

mod commands;
mod watch;

use std::sync::Arc;

use log_mirror::{DrainReport, EngineOptions, JsonSchema, Row, SqliteLogStore, SyncEngine};
use mirror_config_and_utils::{Config, Paths};
use serde_json::{Map, Value};
use tracing::info;

pub use commands::{append_records, dump, init_store};
pub use watch::watch;

pub type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Records handled by the CLI: any JSON object.
pub type Record = Map<String, Value>;

pub type RecordEngine = SyncEngine<JsonSchema<Record>, SqliteLogStore>;

/// Opens the configured database, provisions the table, and loads the mirror.
pub async fn open_engine(config: &Config, paths: &Paths) -> AppResult<RecordEngine> {
    let db_path = paths.database_file(&config.database_file);
    let store = SqliteLogStore::open(&db_path, &config.table).await?;
    store.ensure_table().await?;
    info!(database = %db_path.display(), table = %config.table, "Opened log");

    let options = EngineOptions {
        catch_up_on_append: config.catch_up_on_append,
    };
    let engine = SyncEngine::create_with_options(Arc::new(store), JsonSchema::new(), options).await?;
    Ok(engine)
}

/// Parses command-line arguments as JSON objects.
pub fn parse_records(args: &[String]) -> AppResult<Vec<Record>> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| -> AppResult<Record> {
            match serde_json::from_str::<Value>(arg) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(format!("record {} is not a JSON object", i + 1).into()),
                Err(e) => Err(format!("record {} is not valid JSON: {}", i + 1, e).into()),
            }
        })
        .collect()
}

pub fn format_row(row: &Row<Record>) -> String {
    format!("{}\t{}", row.seq, Value::Object(row.data.clone()))
}

pub fn format_report(report: &DrainReport) -> String {
    let mut line = format!(
        "drain: signals={} pollables={} appended={}",
        report.signals, report.pollables, report.appended
    );
    for failure in &report.failures {
        line.push_str(&format!(" failed[{}]={}", failure.pollable, failure.error));
    }
    line
}
