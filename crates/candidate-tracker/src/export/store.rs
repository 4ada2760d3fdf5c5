//! In-memory registry of finished exports.
//!
//! Entries carry an absolute expiry computed from the store's clock at `put`
//! time. Reads check the expiry themselves, so an entry that outlived its window
//! is never served even if the sweeper has not visited it yet.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::format::ExportFormat;

/// Opaque identifier handed out for every submitted export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(Uuid);

impl ExportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ExportId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Encoded bytes plus what a client needs to download them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub format: ExportFormat,
    pub rows: usize,
    pub sections: Vec<usize>,
}

impl ExportArtifact {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone)]
pub struct StoredExport {
    pub artifact: Arc<ExportArtifact>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredExport {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Concurrent id → artifact map with a fixed time-to-live per entry.
pub struct ResultStore {
    entries: DashMap<ExportId, StoredExport>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Store `artifact` under `id`, replacing whatever was there.
    pub fn put(&self, id: ExportId, artifact: ExportArtifact) -> StoredExport {
        let created_at = self.now();
        let stored = StoredExport {
            artifact: Arc::new(artifact),
            created_at,
            expires_at: created_at + self.ttl,
        };
        self.entries.insert(id, stored.clone());
        stored
    }

    pub fn get(&self, id: &ExportId) -> Option<Arc<ExportArtifact>> {
        self.entry(id).map(|stored| stored.artifact)
    }

    /// Live entry for `id`. An expired entry found here is dropped on the spot.
    pub fn entry(&self, id: &ExportId) -> Option<StoredExport> {
        let now = self.now();
        let stored = self.entries.get(id).map(|entry| entry.value().clone())?;
        if stored.is_live_at(now) {
            return Some(stored);
        }

        self.entries
            .remove_if(id, |_, current| !current.is_live_at(now));
        None
    }

    pub fn remove(&self, id: &ExportId) -> Option<Arc<ExportArtifact>> {
        self.entries.remove(id).map(|(_, stored)| stored.artifact)
    }

    /// Evict every entry whose expiry has passed; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.now();
        let mut removed = 0;
        self.entries.retain(|_, stored| {
            let live = stored.is_live_at(now);
            if !live {
                removed += 1;
            }
            live
        });
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "expired exports evicted");
        }
        removed
    }

    /// Entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
