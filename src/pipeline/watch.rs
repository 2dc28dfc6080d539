//! Periodic update monitoring.
//!
//! Runs `check_updates` on a fixed interval forever. A failing cycle is
//! logged and the loop carries on at the next tick; only cancellation (or
//! process shutdown) stops it. Sleeping happens in short increments so a
//! cancellation request is observed within about a second rather than at
//! the next period boundary.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::pipeline::sync::SyncEngine;

/// Granularity of cancellation checks while idling between cycles.
const TICK: Duration = Duration::from_secs(1);

/// Run the watch loop until the token is cancelled.
pub async fn watch(
    engine: &SyncEngine,
    interval: Duration,
    auto_download: bool,
    shutdown: CancellationToken,
) {
    log::info!(
        "Watch started: checking every {}s (auto download: {})",
        interval.as_secs(),
        auto_download
    );

    loop {
        if let Err(e) = check_cycle(engine, auto_download).await {
            log::error!("Update check failed: {}", e);
        }

        let mut remaining = interval;
        while !remaining.is_zero() {
            let step = remaining.min(TICK);
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Watch stopped");
                    return;
                }
                _ = tokio::time::sleep(step) => {}
            }
            remaining -= step;
        }
    }
}

/// One check cycle: detect updates and optionally download them.
async fn check_cycle(engine: &SyncEngine, auto_download: bool) -> crate::error::Result<()> {
    if engine.check_updates().await? {
        if auto_download {
            log::info!("Update detected, downloading new articles...");
            let saved = engine.sync(false).await?;
            log::info!("Downloaded {} new articles", saved.len());
        } else {
            log::info!("Update detected, auto download disabled");
        }
    }
    Ok(())
}
