use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use plclog_core::{ClientOptions, DEFAULT_BASE_URL, DataLogClient};
use time::UtcOffset;
use tokio::sync::oneshot;

use crate::sync::event_log::{EventLog, LogEvent};
use crate::sync::poller::{Poller, TickMode};

const DEFAULT_DATA_DIR_NAME: &str = "CSV";
const DEFAULT_LOG_FILE_NAME: &str = "log.txt";
const DEFAULT_POLL_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct DaemonConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub poll_interval: Duration,
    pub accept_invalid_certs: bool,
    pub tick_mode: TickMode,
    pub request_timeout: Option<Duration>,
    pub utc_offset: UtcOffset,
}

impl DaemonConfig {
    /// Must run before any other thread is spawned, or the local offset falls back to UTC.
    pub fn from_env() -> anyhow::Result<Self> {
        let exe_dir = binary_dir()?;
        let home = dirs::home_dir();
        let mut config = Self::from_lookup(&exe_dir, home.as_deref(), |name| {
            std::env::var(name).ok()
        });
        config.utc_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Ok(config)
    }

    /// Builds the config from an arbitrary variable source; unset or invalid values use defaults.
    pub fn from_lookup<F>(exe_dir: &Path, home: Option<&Path>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PLCLOG_BASE_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let data_dir = lookup("PLCLOG_DATA_DIR")
            .map(|value| expand_with_home(&value, home))
            .unwrap_or_else(|| exe_dir.join(DEFAULT_DATA_DIR_NAME));
        let log_file = lookup("PLCLOG_LOG_FILE")
            .map(|value| expand_with_home(&value, home))
            .unwrap_or_else(|| exe_dir.join(DEFAULT_LOG_FILE_NAME));
        let poll_interval = Duration::from_millis(read_u64(
            &lookup,
            "PLCLOG_POLL_MS",
            DEFAULT_POLL_MS,
        ));
        let accept_invalid_certs = read_bool(&lookup, "PLCLOG_ACCEPT_INVALID_CERTS", true);
        let tick_mode = if read_bool(&lookup, "PLCLOG_OVERLAPPING_TICKS", false) {
            TickMode::Overlapping
        } else {
            TickMode::Sequential
        };
        let request_timeout = lookup("PLCLOG_REQUEST_TIMEOUT_SECS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            base_url,
            data_dir,
            log_file,
            poll_interval,
            accept_invalid_certs,
            tick_mode,
            request_timeout,
            utc_offset: UtcOffset::UTC,
        }
    }

    fn client_options(&self) -> ClientOptions {
        ClientOptions {
            accept_invalid_certs: self.accept_invalid_certs,
            timeout: self.request_timeout,
        }
    }
}

pub struct DaemonRuntime {
    config: DaemonConfig,
    poller: Arc<Poller>,
}

impl DaemonRuntime {
    pub async fn bootstrap(config: DaemonConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("failed to create data dir at {:?}", config.data_dir))?;

        let log = EventLog::new(config.log_file.clone()).with_offset(config.utc_offset);
        log.write_start_marker().await;

        let client = DataLogClient::with_options(&config.base_url, config.client_options())
            .with_context(|| format!("invalid controller url {:?}", config.base_url))?;
        let poller = Arc::new(Poller::new(client, config.data_dir.clone(), log));

        Ok(Self { config, poller })
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub async fn run(self) -> anyhow::Result<()> {
        eprintln!(
            "[plclogd] started: base_url={}, data_dir={}, log_file={}, interval={}ms, ticks={}",
            self.config.base_url,
            self.config.data_dir.display(),
            self.config.log_file.display(),
            self.config.poll_interval.as_millis(),
            tick_mode_label(self.config.tick_mode),
        );

        self.poller
            .log()
            .record(&LogEvent::Monitoring {
                base_url: self.config.base_url.clone(),
            })
            .await;
        println!("Press Enter to exit.");

        let started = Arc::clone(&self.poller)
            .run(
                self.config.poll_interval,
                self.config.tick_mode,
                wait_for_exit(spawn_enter_listener()),
            )
            .await;
        eprintln!("[plclogd] stopped after {started} ticks");

        Ok(())
    }
}

include!("daemon_helpers.rs");

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
