//! Session locator — finds the agent's most recently updated session.
//!
//! The agent persists each session as `<dir>/<prefix><id>.json` with at least
//! `{"id": "...", "time": {"updated": <int>}}`. The store belongs to the
//! agent; this module only reads it. Files that cannot be read or parsed are
//! skipped.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

const SESSION_SUFFIX: &str = ".json";

/// One persisted session, as far as the relay cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub updated: i64,
}

#[derive(Deserialize)]
struct SessionFile {
    id: String,
    #[serde(default)]
    time: SessionTime,
}

#[derive(Default, Deserialize)]
struct SessionTime {
    #[serde(default)]
    updated: i64,
}

#[derive(Debug, Clone)]
pub struct SessionLocator {
    dir: PathBuf,
    prefix: String,
}

impl SessionLocator {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The record with the greatest `time.updated`.
    ///
    /// Files are visited in file-name order and only a strictly newer record
    /// replaces the current pick, so ties go to the first file listed.
    /// Records with `updated <= 0` are never picked.
    pub async fn latest(&self) -> Option<SessionRecord> {
        let mut best: Option<SessionRecord> = None;

        for path in self.session_files().await {
            let Some(record) = read_record(&path).await else {
                continue;
            };
            let best_updated = best.as_ref().map_or(0, |b| b.updated);
            if record.updated > best_updated {
                best = Some(record);
            }
        }

        if let Some(record) = &best {
            debug!(session_id = %record.id, updated = record.updated, "Latest session");
        }
        best
    }

    /// Matching files, sorted by name. A missing directory yields nothing.
    async fn session_files(&self) -> Vec<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "Session directory not readable");
                return vec![];
            }
        };

        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if name.starts_with(&self.prefix) && name.ends_with(SESSION_SUFFIX) {
                        files.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Session directory listing interrupted");
                    break;
                }
            }
        }

        files.sort();
        files
    }
}

async fn read_record(path: &Path) -> Option<SessionRecord> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable session file");
            return None;
        }
    };

    match serde_json::from_slice::<SessionFile>(&raw) {
        Ok(file) => Some(SessionRecord {
            id: file.id,
            updated: file.time.updated,
        }),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping malformed session file");
            None
        }
    }
}
