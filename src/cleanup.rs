//! Background removal of session directories.
//!
//! Two independent mechanisms, neither coordinated with the other nor with
//! in-flight downloads:
//!
//! * [`schedule_removal`]: one timer per successful request; deletes that
//!   request's directory after a fixed delay whether or not the result was
//!   ever fetched.
//! * [`spawn_periodic_sweep`]: a recurring walk over the uploads root that
//!   deletes every session directory older than a threshold. It also catches
//!   directories whose timer was lost to a process restart.
//!
//! Errors never reach a client: they are logged and counted.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delete `dir` recursively after `delay`. Fire-and-forget.
pub fn schedule_removal(dir: PathBuf, delay: Duration) -> JoinHandle<()> {
    debug!("Removal of {} scheduled in {:?}", dir.display(), delay);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        remove_dir_logged(&dir).await;
    })
}

async fn remove_dir_logged(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            info!("Removed expired session {}", dir.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", dir.display(), e);
            false
        }
    }
}

/// Outcome of one sweep over the uploads root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Subdirectories examined.
    pub scanned: usize,
    /// Subdirectories removed for being older than the threshold.
    pub removed: usize,
    /// Entries that could not be inspected or removed.
    pub errors: usize,
}

/// Remove every direct subdirectory of `root` last modified more than
/// `max_age` ago.
///
/// Regular files directly under `root` are left alone and `root` itself is
/// never removed. A missing root yields an empty report.
pub async fn sweep_stale(root: &Path, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let now = SystemTime::now();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!("Sweep could not read {}: {}", root.display(), e);
            report.errors += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Sweep stopped reading {}: {}", root.display(), e);
                report.errors += 1;
                break;
            }
        };
        let path = entry.path();
        let meta = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                debug!("Sweep skipped {}: {}", path.display(), e);
                report.errors += 1;
                continue;
            }
        };
        if !meta.is_dir() {
            continue;
        }
        report.scanned += 1;

        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!("Sweep removed {} (age {:?})", path.display(), age);
                report.removed += 1;
            }
            // Already gone, most likely by its own delayed removal.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Sweep failed to remove {}: {}", path.display(), e);
                report.errors += 1;
            }
        }
    }

    if report.removed > 0 || report.errors > 0 {
        info!(
            "Sweep of {}: {} scanned, {} removed, {} errors",
            root.display(),
            report.scanned,
            report.removed,
            report.errors
        );
    }
    report
}

/// Run [`sweep_stale`] every `interval`, starting one interval from now.
pub fn spawn_periodic_sweep(root: PathBuf, interval: Duration, max_age: Duration) -> JoinHandle<()> {
    info!(
        "Periodic sweep of {} every {:?} (max age {:?})",
        root.display(),
        interval,
        max_age
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_stale(&root, max_age).await;
        }
    })
}
