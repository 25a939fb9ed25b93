use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use plclog_core::DataLogClient;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::event_log::{EventLog, LogEvent};
use super::paths::file_name_of;
use super::registry::{DownloadRegistry, local_file_timestamp};
use super::transfer::download_to_path;

/// How the scheduling loop treats a tick that outlives the interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickMode {
    /// Each tick is awaited before the next one may start; late ticks are skipped.
    #[default]
    Sequential,
    /// Every interval spawns a tick, even if earlier ones are still running.
    Overlapping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub listed: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub listing_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    AlreadyKnown,
    Skipped,
    Downloaded,
    Failed,
}

pub struct Poller {
    client: DataLogClient,
    data_dir: PathBuf,
    log: EventLog,
    registry: Mutex<DownloadRegistry>,
}

impl Poller {
    pub fn new(client: DataLogClient, data_dir: PathBuf, log: EventLog) -> Self {
        Self {
            client,
            data_dir,
            log,
            registry: Mutex::new(DownloadRegistry::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub async fn is_registered(&self, remote_path: &str) -> bool {
        self.registry.lock().await.contains(remote_path)
    }

    pub async fn registered_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// One poll cycle. Never fails: every error ends up in the event log.
    pub async fn tick(&self) -> TickReport {
        let listing = match self.client.fetch_listing().await {
            Ok(listing) => listing,
            Err(err) => {
                self.log
                    .record(&LogEvent::GeneralError {
                        error: err.to_string(),
                    })
                    .await;
                return TickReport {
                    listing_failed: true,
                    ..TickReport::default()
                };
            }
        };

        let mut report = TickReport {
            listed: listing.len(),
            ..TickReport::default()
        };
        for remote_path in &listing {
            match self.process_entry(remote_path).await {
                EntryOutcome::AlreadyKnown => {}
                EntryOutcome::Skipped => report.skipped += 1,
                EntryOutcome::Downloaded => report.downloaded += 1,
                EntryOutcome::Failed => report.failed += 1,
            }
        }
        report
    }

    async fn process_entry(&self, remote_path: &str) -> EntryOutcome {
        let file_name = match file_name_of(remote_path) {
            Ok(name) => name,
            Err(err) => {
                self.log
                    .record(&LogEvent::DownloadFailed {
                        file_name: remote_path.to_string(),
                        error: err.to_string(),
                    })
                    .await;
                return EntryOutcome::Failed;
            }
        };
        let local_path = self.data_dir.join(file_name);

        let existing = tokio::fs::metadata(&local_path)
            .await
            .ok()
            .filter(|metadata| metadata.is_file());
        if let Some(metadata) = existing {
            let created = local_file_timestamp(&metadata);
            let inserted = self
                .registry
                .lock()
                .await
                .insert_if_absent(remote_path, created);
            if !inserted {
                return EntryOutcome::AlreadyKnown;
            }
            self.log
                .record(&LogEvent::Skipped {
                    file_name: file_name.to_string(),
                })
                .await;
            return EntryOutcome::Skipped;
        }

        match download_to_path(&self.client, remote_path, &local_path).await {
            Ok(_) => {
                self.registry
                    .lock()
                    .await
                    .record(remote_path, OffsetDateTime::now_utc());
                self.log
                    .record(&LogEvent::Downloaded {
                        file_name: file_name.to_string(),
                    })
                    .await;
                EntryOutcome::Downloaded
            }
            Err(err) => {
                self.log
                    .record(&LogEvent::DownloadFailed {
                        file_name: file_name.to_string(),
                        error: err.to_string(),
                    })
                    .await;
                EntryOutcome::Failed
            }
        }
    }

    /// Drives ticks every `interval` until `shutdown` resolves and returns how
    /// many ticks were started. In-flight ticks are dropped on shutdown.
    pub async fn run<F>(self: Arc<Self>, interval: Duration, mode: TickMode, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = JoinSet::new();
        let mut started = 0usize;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
                _ = ticker.tick() => {}
            }
            started += 1;
            match mode {
                TickMode::Sequential => {
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = self.tick() => {}
                    }
                }
                TickMode::Overlapping => {
                    let poller = Arc::clone(&self);
                    in_flight.spawn(async move {
                        poller.tick().await;
                    });
                }
            }
        }

        in_flight.abort_all();
        started
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
