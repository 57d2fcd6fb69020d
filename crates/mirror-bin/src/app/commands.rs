//! One-shot commands: init, append, dump.

use std::sync::Arc;

use log_mirror::{Channel, LocalChannels, Notifier, NullReactor, Row, SqliteLogStore};
use mirror_config_and_utils::{Config, Paths};
use tracing::{debug, info};

use super::{format_row, open_engine, parse_records, AppResult, Record};

/// Creates the base directory, writes a default config if none exists, and
/// provisions the log table.
pub async fn init_store(config: &Config, paths: &Paths) -> AppResult<()> {
    paths.ensure_dirs()?;
    if !paths.config_file().exists() {
        config.save(paths)?;
        println!("Wrote {}", paths.config_file().display());
    }

    let db_path = paths.database_file(&config.database_file);
    let store = SqliteLogStore::open(&db_path, &config.table).await?;
    store.ensure_table().await?;
    store.database().health_check().await?;

    let rows = store.count().await?;

    info!(database = %db_path.display(), table = %config.table, rows, "Initialized log");
    println!("Log table {} ready in {} ({} rows)", config.table, db_path.display(), rows);
    Ok(())
}

/// Validates every argument, appends them as one batch, then signals the
/// change channel.
///
/// The signal only reaches listeners in this process. Watchers in other
/// processes pick the rows up on their next timed drain.
pub async fn append_records(config: &Config, paths: &Paths, args: &[String]) -> AppResult<()> {
    let rows = append_and_notify(config, paths, args, Arc::new(LocalChannels::new())).await?;
    for row in &rows {
        println!("{}", format_row(row));
    }
    Ok(())
}

async fn append_and_notify(
    config: &Config,
    paths: &Paths,
    args: &[String],
    channel: Arc<dyn Channel>,
) -> AppResult<Vec<Row<Record>>> {
    let records = parse_records(args)?;
    let engine = open_engine(config, paths).await?;
    let rows = engine.append_many(&records).await?;

    let notifier = Notifier::new(channel, config.channel.clone(), NullReactor);
    notifier.notify().await?;
    debug!(channel = %config.channel, rows = rows.len(), "Signalled change");
    Ok(rows)
}

/// Loads the whole log and prints it in seq order.
pub async fn dump(config: &Config, paths: &Paths) -> AppResult<()> {
    let engine = open_engine(config, paths).await?;
    for row in engine.snapshot().iter() {
        println!("{}", format_row(row));
    }
    info!(rows = engine.len(), frontier = %engine.frontier(), "Dumped log");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log_mirror::Seq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_then_append_then_reload() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config::default();

        init_store(&config, &paths).await.unwrap();
        assert!(paths.config_file().exists());
        assert!(paths.database_file(&config.database_file).exists());

        let args = vec![r#"{"value": 1}"#.to_string(), r#"{"value": 2}"#.to_string()];
        append_records(&config, &paths, &args).await.unwrap();

        let engine = open_engine(&config, &paths).await.unwrap();
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.frontier(), Seq(2));
        assert_eq!(engine.snapshot()[1].data["value"], 2);
    }

    #[tokio::test]
    async fn invalid_argument_writes_nothing() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config::default();
        init_store(&config, &paths).await.unwrap();

        let args = vec![r#"{"value": 1}"#.to_string(), "42".to_string()];
        assert!(append_records(&config, &paths, &args).await.is_err());

        let engine = open_engine(&config, &paths).await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn append_signals_the_configured_channel() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config {
            channel: "readings_changed".to_string(),
            ..Config::default()
        };
        let channels = LocalChannels::new();
        let mut changes = channels.subscribe("readings_changed").await.unwrap();
        let mut other = channels.subscribe("records_changed").await.unwrap();

        let args = vec![r#"{"value": 1}"#.to_string(), r#"{"value": 2}"#.to_string()];
        let rows = append_and_notify(&config, &paths, &args, Arc::new(channels.clone()))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(changes.drain_pending(), 1);
        assert_eq!(other.drain_pending(), 0);
    }

    #[tokio::test]
    async fn rejected_append_sends_no_signal() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config::default();
        let channels = LocalChannels::new();
        let mut changes = channels.subscribe(&config.channel).await.unwrap();

        let args = vec!["not json".to_string()];
        assert!(append_and_notify(&config, &paths, &args, Arc::new(channels.clone()))
            .await
            .is_err());

        assert_eq!(changes.drain_pending(), 0);
    }

    #[tokio::test]
    async fn tables_are_independent() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let readings = Config {
            table: "readings".to_string(),
            ..Config::default()
        };
        let labels = Config {
            table: "labels".to_string(),
            ..Config::default()
        };

        append_records(&readings, &paths, &[r#"{"value": 1}"#.to_string()])
            .await
            .unwrap();

        assert_eq!(open_engine(&readings, &paths).await.unwrap().len(), 1);
        assert!(open_engine(&labels, &paths).await.unwrap().is_empty());
    }
}
