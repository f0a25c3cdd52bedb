//! Telemetry cache store - durable storage for the range cache
//!
//! One redb file holds three tables: frame samples indexed by ERT, the set of
//! time ranges that have been fetched, and metadata written at creation.

pub mod record;
pub mod store;
pub mod tables;

// Re-exports
pub use record::{FrameSampleRecord, IntervalRecord};
pub use store::{SampleStore, StoreError, StoreResult};
