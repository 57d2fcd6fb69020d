//! Follow mode.
//!
//! Listens on the change channel and also drains on a timer, so rows written
//! by other processes (whose signals never reach this one) still show up
//! within one poll interval. New rows go to stdout; every drain report goes to
//! stderr.

use std::sync::Arc;

use log_mirror::{Channel, FnReactor, LocalChannels, Notifier};
use mirror_config_and_utils::{Config, Paths};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{format_report, format_row, open_engine, AppResult};

pub async fn watch(config: &Config, paths: &Paths) -> AppResult<()> {
    let engine = Arc::new(open_engine(config, paths).await?);
    for row in engine.snapshot().iter() {
        println!("{}", format_row(row));
    }

    let mut tail = engine.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(batch) = tail.recv().await {
            for row in &batch {
                println!("{}", format_row(row));
            }
        }
    });

    let reactor = {
        let engine = Arc::clone(&engine);
        FnReactor::new(move || debug!(rows = engine.len(), frontier = %engine.frontier(), "Mirror stepped"))
    };
    let channels: Arc<dyn Channel> = Arc::new(LocalChannels::new());
    let notifier = Notifier::new(channels, config.channel.clone(), reactor);
    notifier.register(engine.clone());

    let mut reports = notifier.reports();
    let reporter = tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => eprintln!("{}", format_report(&report)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Report printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    notifier.start().await?;

    info!(
        table = %config.table,
        interval_ms = config.poll_interval_ms,
        "Watching for new rows"
    );

    let mut ticker = tokio::time::interval(config.poll_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received interrupt, stopping");
                break;
            }
            _ = ticker.tick() => {
                notifier.drain_now().await;
            }
        }
    }

    notifier.stop().await;
    printer.abort();
    reporter.abort();
    Ok(())
}
