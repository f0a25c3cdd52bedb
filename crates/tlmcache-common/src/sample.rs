//! Frame sample model
//!
//! A [`FrameSample`] holds the timekeeping-relevant fields of one downlinked
//! telemetry frame. Later frames carry precise timing about earlier ones, so a
//! sample combines fields from the target frame with "tk" fields reported by
//! a subsequent frame and "supplemental" fields of that subsequent frame.
//!
//! Samples are created once by a telemetry source and never mutated.

use crate::error::{Error, Result};
use crate::time::{self, CdsTimeCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Earth Receipt Time, either as a CDS time code or as a raw UTC string.
///
/// The raw string form may carry more precision than the CDS code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ert {
    #[default]
    Unset,
    Cds(CdsTimeCode),
    Utc(String),
}

impl Ert {
    /// Whether either form has been set
    #[must_use]
    pub const fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Full-precision UTC string, derived from the CDS code if needed
    pub fn utc_string(&self) -> Result<String> {
        match self {
            Self::Unset => Err(Error::MissingErt),
            Self::Cds(cds) => cds.to_utc_string(),
            Self::Utc(s) => Ok(s.clone()),
        }
    }

    /// Parse the ERT into a UTC time
    pub fn to_datetime(&self) -> Result<DateTime<Utc>> {
        match self {
            Self::Unset => Err(Error::MissingErt),
            Self::Cds(cds) => cds.to_datetime(),
            Self::Utc(s) => time::parse_utc(s),
        }
    }
}

/// Validity of a sample as reported by a subsequent frame.
///
/// `Unset` means no report has been seen and is distinct from `Invalid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TkValidity {
    #[default]
    Unset,
    Valid,
    Invalid,
}

impl From<bool> for TkValidity {
    fn from(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

/// Timekeeping fields about this frame, reported by a subsequent frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TkFields {
    /// Coarse SCLK at which this frame was radiated
    pub sclk_coarse: Option<u32>,
    /// Fine SCLK at which this frame was radiated
    pub sclk_fine: Option<u32>,
    pub vcid: Option<u32>,
    pub vcfc: Option<u32>,
    /// Downlink data rate in bits per second
    pub data_rate_bps: Option<f64>,
    pub rf_encoding: Option<String>,
    #[serde(default)]
    pub valid: TkValidity,
}

/// Identifiers of the subsequent ("supplemental") frame used for bridging
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplementalFields {
    pub vcid: Option<u32>,
    pub vcfc: Option<u32>,
    pub mcfc: Option<u32>,
    #[serde(default)]
    pub ert: Ert,
}

/// Timekeeping data about a single downlinked frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub sclk_coarse: u32,
    pub sclk_fine: u32,
    #[serde(default)]
    pub ert: Ert,
    /// Spacecraft event time as computed by ground systems
    pub scet: Option<String>,
    /// Ground station (path) identifier
    pub path_id: Option<u32>,
    /// Virtual channel ID
    pub vcid: Option<u32>,
    /// Virtual channel frame count
    pub vcfc: Option<u32>,
    /// Master channel frame count
    pub mcfc: Option<u32>,
    #[serde(default)]
    pub tk: TkFields,
    #[serde(default)]
    pub supp: SupplementalFields,
    pub frame_size_bits: Option<u32>,
}

impl FrameSample {
    /// Create a sample with SCLK and ERT set and everything else unset
    #[must_use]
    pub fn new(sclk_coarse: u32, sclk_fine: u32, ert: Ert) -> Self {
        Self {
            sclk_coarse,
            sclk_fine,
            ert,
            ..Self::default()
        }
    }

    /// ERT as a UTC time
    pub fn ert_time(&self) -> Result<DateTime<Utc>> {
        self.ert.to_datetime()
    }

    /// Storage key: ERT seconds since the Unix epoch, plus nanoseconds
    /// within the second (leap seconds included)
    pub fn storage_key(&self) -> Result<(i64, u32)> {
        Ok(time::epoch_key(&self.ert_time()?))
    }
}
