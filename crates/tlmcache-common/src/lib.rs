//! Telemetry cache common - shared types and utilities
//!
//! This crate provides the time codecs, the time interval value type, the
//! frame sample model and the error type used by the cache crates.

pub mod config;
pub mod error;
pub mod interval;
pub mod sample;
pub mod time;

pub use config::CacheConfig;
pub use error::{Error, Result};
pub use interval::TimeInterval;
pub use sample::{Ert, FrameSample, SupplementalFields, TkFields, TkValidity};
pub use time::CdsTimeCode;
