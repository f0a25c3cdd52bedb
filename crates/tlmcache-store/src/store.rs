//! Persistent sample store backed by redb.
//!
//! All writes are synchronous (write txn + commit). The covered range set is
//! rewritten in full on every update. This module only handles persistence;
//! the in-memory coverage index lives in the cache crate.

use crate::record::{FrameSampleRecord, IntervalRecord};
use crate::tables;
use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tlmcache_common::time::{self, format_utc};
use tlmcache_common::{FrameSample, TimeInterval};
use tracing::debug;

/// Error type for sample store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("a frame sample with ERT {ert} is already stored")]
    DuplicateErt { ert: String },
    #[error(transparent)]
    Model(#[from] tlmcache_common::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl StoreError {
    /// Check if this error is a uniqueness violation on sample write
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateErt { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const METADATA_VERSION_KEY: &str = "TLMCACHE_VERSION";
pub const METADATA_VERSION_STRING_KEY: &str = "TLMCACHE_VERSION_STRING";
pub const METADATA_CREATED_KEY: &str = "CREATED_AT";

/// Persistent store for frame samples, covered ranges and cache metadata.
pub struct SampleStore {
    db: Database,
    path: PathBuf,
    created: bool,
}

impl SampleStore {
    /// Open the cache file at the given path, creating it if needed.
    ///
    /// Tables and metadata are only written when the file did not exist
    /// before this call.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let existed = path.exists();
        let db = Database::create(path)?;
        let store = Self {
            db,
            path: path.to_path_buf(),
            created: !existed,
        };

        if store.created {
            store.create_schema()?;
            debug!("Created cache schema at {:?}", store.path);
        } else {
            debug!("Opened existing telemetry cache at {:?}", store.path);
        }
        Ok(store)
    }

    /// Whether this call to [`SampleStore::open`] created the file
    #[must_use]
    pub const fn created(&self) -> bool {
        self.created
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_schema(&self) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::FRAME_SAMPLES)?;
            let _t = write_txn.open_table(tables::COVERED_RANGES)?;
            let mut meta = write_txn.open_table(tables::CACHE_METADATA)?;
            let version = env!("CARGO_PKG_VERSION");
            let version_string = format!("{} {}", env!("CARGO_PKG_NAME"), version);
            let created_at = format_utc(&Utc::now());
            meta.insert(METADATA_VERSION_KEY, version)?;
            meta.insert(METADATA_VERSION_STRING_KEY, version_string.as_str())?;
            meta.insert(METADATA_CREATED_KEY, created_at.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ---- Frame samples (bincode) ----

    /// Insert samples in one transaction.
    ///
    /// Fails without writing anything if any sample's ERT is already stored
    /// or repeats within the batch.
    pub fn write_samples(&self, samples: &[FrameSample]) -> StoreResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::FRAME_SAMPLES)?;
            for sample in samples {
                let record = FrameSampleRecord::from_sample(sample)?;
                let key = record.key();
                let exists = table.get(key)?.is_some();
                if exists {
                    // dropping the uncommitted txn discards the batch
                    return Err(StoreError::DuplicateErt {
                        ert: record.ert_utc,
                    });
                }
                let bytes = bincode::serialize(&record)?;
                table.insert(key, bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        debug!("Stored {} frame samples", samples.len());
        Ok(())
    }

    /// Read all samples with an ERT in `[start, stop)`, ordered by ERT.
    pub fn read_samples(&self, interval: &TimeInterval) -> StoreResult<Vec<FrameSample>> {
        // Scan on millisecond bounds, with the upper bound widened by one
        // millisecond, then filter on the full-precision ERT
        let lo = time::epoch_key_millis(&interval.start());
        let (stop_secs, stop_nanos) = time::epoch_key_millis(&interval.stop());
        let hi = (stop_secs, stop_nanos + 2 * time::NANOS_PER_MILLI);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::FRAME_SAMPLES)?;
        let mut result = Vec::new();
        for entry in table.range(lo..hi)? {
            let entry = entry?;
            let record: FrameSampleRecord = bincode::deserialize(entry.1.value())?;
            let ert = time::parse_utc(&record.ert_utc)?;
            if interval.contains(&ert) {
                result.push(record.to_sample()?);
            }
        }
        Ok(result)
    }

    /// Number of stored samples
    pub fn count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::FRAME_SAMPLES)?;
        Ok(table.len()?)
    }

    // ---- Covered ranges ----

    pub fn read_coverage(&self) -> StoreResult<Vec<TimeInterval>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::COVERED_RANGES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let record = IntervalRecord::from_row(entry.0.value(), entry.1.value());
            result.push(record.to_interval()?);
        }
        Ok(result)
    }

    /// Replace the whole covered range table in one transaction
    pub fn write_coverage(&self, intervals: &[TimeInterval]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::COVERED_RANGES)?;
            table.retain(|_, _| false)?;
            for interval in intervals {
                let record = IntervalRecord::from_interval(interval);
                table.insert(record.key(), record.value())?;
            }
        }
        write_txn.commit()?;
        debug!("Persisted {} covered ranges", intervals.len());
        Ok(())
    }

    // ---- Metadata ----

    pub fn read_metadata(&self) -> StoreResult<BTreeMap<String, String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::CACHE_METADATA)?;
        let mut result = BTreeMap::new();
        for entry in table.iter()? {
            let entry = entry?;
            result.insert(entry.0.value().to_string(), entry.1.value().to_string());
        }
        Ok(result)
    }

    /// Size of the cache file on disk
    pub fn file_size_bytes(&self) -> StoreResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}
