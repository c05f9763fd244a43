use std::collections::BTreeMap;

use tracing::{info, warn};

use mentorbook::config::EngineConfig;
use mentorbook::engine::BookingStore;
use mentorbook::model::BookingStatus;
use mentorbook::observability;
use mentorbook::wal::Wal;

/// Offline maintenance: rebuild the booking store from the journal, report
/// what it holds, and compact the journal if it has outgrown the live state.
///
/// With `MENTORBOOK_METRICS_PORT` set, the process stays up after the run and
/// serves the resulting gauges until SIGTERM or ctrl-c.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::from_env();
    observability::init(config.metrics_port)?;

    let wal_path = config.wal_path();
    std::fs::create_dir_all(&config.data_dir)?;
    info!("mentorbook maintenance");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  compact_threshold: {}", config.compact_threshold);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let events = Wal::recover(&wal_path)?;
    let store = BookingStore::recover(&events);
    let summary = report(&store);
    info!(
        "journal holds {} events for {} bookings: {}",
        events.len(),
        store.len(),
        serde_json::to_string(&summary)?
    );

    let live = store.snapshot_events();
    if compaction_due(events.len(), live.len(), config.compact_threshold) {
        let mut wal = Wal::open(&wal_path)?;
        if let Err(e) = wal.compact(&live) {
            warn!("compaction failed: {e}");
            return Err(e.into());
        }
        metrics::counter!(observability::WAL_COMPACTIONS_TOTAL).increment(1);
        info!("compacted journal from {} to {} events", events.len(), live.len());
    } else {
        info!(
            "{} superseded events; compaction not needed",
            events.len().saturating_sub(live.len())
        );
    }

    if config.metrics_port.is_some() {
        info!("serving metrics until shutdown");
        shutdown_signal().await?;
    }
    Ok(())
}

/// Per-status counts, also published as the bookings gauge.
fn report(store: &BookingStore) -> BTreeMap<&'static str, usize> {
    let counts = store.count_by_status();
    BookingStatus::ALL
        .into_iter()
        .map(|status| {
            let n = counts.get(&status).copied().unwrap_or(0);
            metrics::gauge!(observability::BOOKINGS, "status" => status.as_str()).set(n as f64);
            (status.as_str(), n)
        })
        .collect()
}

/// A threshold of 0 disables compaction, as it does for the engine.
fn compaction_due(journal_events: usize, live_events: usize, threshold: u64) -> bool {
    let superseded = journal_events.saturating_sub(live_events) as u64;
    threshold > 0 && superseded > 0 && superseded >= threshold
}

async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = ctrl_c => r?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }
    Ok(())
}
