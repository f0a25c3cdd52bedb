//! Redb table definitions for the cache file.

use redb::TableDefinition;

// Key: (ERT secs since Unix epoch, nanos within second), Value: bincode-encoded FrameSampleRecord
pub const FRAME_SAMPLES: TableDefinition<(i64, u32), &[u8]> =
    TableDefinition::new("frame_samples");

// Key: (start secs, start nanos), Value: (stop secs, stop nanos)
pub const COVERED_RANGES: TableDefinition<(i64, u32), (i64, u32)> =
    TableDefinition::new("frame_sample_query_range_history");

// Written once when the file is created
pub const CACHE_METADATA: TableDefinition<&str, &str> = TableDefinition::new("cache_metadata");
