use std::collections::HashMap;
use std::time::SystemTime;

use time::OffsetDateTime;

/// Remote paths already accounted for in this process, keyed by listed path.
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    entries: HashMap<String, OffsetDateTime>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, remote_path: &str) -> bool {
        self.entries.contains_key(remote_path)
    }

    pub fn get(&self, remote_path: &str) -> Option<OffsetDateTime> {
        self.entries.get(remote_path).copied()
    }

    /// Returns `false` and keeps the existing timestamp if the path is already present.
    pub fn insert_if_absent(&mut self, remote_path: &str, at: OffsetDateTime) -> bool {
        if self.entries.contains_key(remote_path) {
            return false;
        }
        self.entries.insert(remote_path.to_string(), at);
        true
    }

    pub fn record(&mut self, remote_path: &str, at: OffsetDateTime) {
        self.entries.insert(remote_path.to_string(), at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Creation time of a local file, falling back to mtime and then to now.
pub fn local_file_timestamp(metadata: &std::fs::Metadata) -> OffsetDateTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(OffsetDateTime::from)
        .unwrap_or_else(|_| OffsetDateTime::from(SystemTime::now()))
}
