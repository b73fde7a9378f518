//! Feeding record storage and optional file persistence.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::executor::simulation::most_frequent;
use crate::executor::FeedingRecord;
use crate::store::validation::NewFeeding;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored feeding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingEntry {
    pub id: u64,
    pub bird_type: String,
    pub food_type: String,
    pub quantity: i64,
    pub location: String,
    pub notes: String,
    pub feeding_time: DateTime<Utc>,
}

impl FeedingEntry {
    /// Analysis view of this entry.
    pub fn to_record(&self) -> FeedingRecord {
        FeedingRecord {
            bird_type: self.bird_type.clone(),
            food_type: self.food_type.clone(),
            quantity: self.quantity,
            location: self.location.clone(),
            notes: self.notes.clone(),
            feeding_time: self.feeding_time.to_rfc3339(),
        }
    }
}

/// Aggregate statistics over all stored feedings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedingStats {
    pub total_feedings: usize,
    pub most_common_bird: Option<String>,
    pub most_common_food: Option<String>,
    pub total_food_quantity: i64,
}

/// Sum of quantities, saturating at `i64::MAX`.
pub fn total_quantity(entries: &[FeedingEntry]) -> i64 {
    entries
        .iter()
        .fold(0i64, |total, e| total.saturating_add(e.quantity))
}

/// A thread-safe store of feeding records.
#[derive(Clone)]
pub struct FeedingStore {
    inner: Arc<DashMap<u64, FeedingEntry>>,
    next_id: Arc<AtomicU64>,
    persistence_path: Option<String>,
    save_lock: Arc<Mutex<()>>,
}

impl FeedingStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            persistence_path,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open a store backed by `path`, loading existing records if the file exists.
    pub fn load_from_file(path: &str) -> StoreResult<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let entries: Vec<FeedingEntry> = serde_json::from_reader(reader)?;

            let max_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
            for entry in entries {
                store.inner.insert(entry.id, entry);
            }
            store.next_id.store(max_id + 1, Ordering::SeqCst);
            tracing::info!(records = store.inner.len(), path = %path, "Loaded feeding records");
        }
        Ok(store)
    }

    /// Write all records to the persistence file, if one is configured.
    ///
    /// Saves are serialized and the snapshot is taken under the lock, so the
    /// last writer always sees every record inserted before it. The file is
    /// replaced by rename; readers never observe a partial write.
    pub fn save_to_file(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut entries: Vec<FeedingEntry> =
            self.inner.iter().map(|r| r.value().clone()).collect();
        entries.sort_by_key(|e| e.id);

        let target = Path::new(path);
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            serde_json::to_writer(&mut writer, &entries)?;
            writer.flush()?;
        }
        staged.persist(target).map_err(|e| e.error)?;

        tracing::debug!(records = entries.len(), path = %path, "Saved feeding records");
        Ok(())
    }

    /// Insert a validated feeding and return the stored entry.
    pub fn insert(&self, feeding: NewFeeding) -> StoreResult<FeedingEntry> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = FeedingEntry {
            id,
            bird_type: feeding.bird_type,
            food_type: feeding.food_type,
            quantity: feeding.quantity,
            location: feeding.location,
            notes: feeding.notes,
            feeding_time: Utc::now(),
        };
        self.inner.insert(id, entry.clone());
        self.save_to_file()?;
        Ok(entry)
    }

    /// [`insert`](Self::insert) on the blocking pool, for async callers.
    pub async fn insert_async(&self, feeding: NewFeeding) -> StoreResult<FeedingEntry> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.insert(feeding)).await?
    }

    /// Newest records first, at most `limit`.
    pub fn list(&self, limit: usize) -> Vec<FeedingEntry> {
        let mut entries = self.all();
        entries.reverse();
        entries.truncate(limit);
        entries
    }

    /// All records, oldest first.
    pub fn all(&self) -> Vec<FeedingEntry> {
        let mut entries: Vec<FeedingEntry> = self.inner.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.feeding_time.cmp(&b.feeding_time).then(a.id.cmp(&b.id)));
        entries
    }

    /// All records in analysis form, oldest first.
    pub fn records(&self) -> Vec<FeedingRecord> {
        self.all().iter().map(FeedingEntry::to_record).collect()
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    pub fn stats(&self) -> FeedingStats {
        let entries = self.all();
        FeedingStats {
            total_feedings: entries.len(),
            most_common_bird: most_frequent(entries.iter().map(|e| e.bird_type.as_str()))
                .map(str::to_string),
            most_common_food: most_frequent(entries.iter().map(|e| e.food_type.as_str()))
                .map(str::to_string),
            total_food_quantity: total_quantity(&entries),
        }
    }
}

impl Default for FeedingStore {
    fn default() -> Self {
        Self::new(None)
    }
}
