//! Stored row types.
//!
//! These types are serialized to redb via bincode. They mirror the domain
//! model but keep the derived index values (ERT key, full-precision ERT
//! string) alongside it, so reads can filter without re-deriving them.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tlmcache_common::time::{self, CdsTimeCode};
use tlmcache_common::{Ert, FrameSample, SupplementalFields, TimeInterval, TkFields, TkValidity};

/// Which ERT form a sample was created with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredErt {
    Unset,
    /// CDS text form `day::ms::sub_ms`
    Cds(String),
    Utc(String),
}

impl StoredErt {
    fn from_ert(ert: &Ert) -> Self {
        match ert {
            Ert::Unset => Self::Unset,
            Ert::Cds(cds) => Self::Cds(cds.to_string()),
            Ert::Utc(s) => Self::Utc(s.clone()),
        }
    }

    fn to_ert(&self) -> tlmcache_common::Result<Ert> {
        Ok(match self {
            Self::Unset => Ert::Unset,
            Self::Cds(s) => Ert::Cds(s.parse::<CdsTimeCode>()?),
            Self::Utc(s) => Ert::Utc(s.clone()),
        })
    }
}

/// Validity flag as stored; kept separate from the model enum so the file
/// format does not change if the model enum grows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredValidity {
    Unset,
    Valid,
    Invalid,
}

impl From<TkValidity> for StoredValidity {
    fn from(v: TkValidity) -> Self {
        match v {
            TkValidity::Unset => Self::Unset,
            TkValidity::Valid => Self::Valid,
            TkValidity::Invalid => Self::Invalid,
        }
    }
}

impl From<StoredValidity> for TkValidity {
    fn from(v: StoredValidity) -> Self {
        match v {
            StoredValidity::Unset => Self::Unset,
            StoredValidity::Valid => Self::Valid,
            StoredValidity::Invalid => Self::Invalid,
        }
    }
}

/// One row of the frame sample table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameSampleRecord {
    /// ERT as whole seconds since the Unix epoch (index value)
    pub ert_epoch_secs: i64,
    /// Nanoseconds within the second, past 999_999_999 during a leap second
    pub ert_nanos: u32,
    /// Full-precision ERT string, used to post-filter range reads
    pub ert_utc: String,
    pub ert: StoredErt,
    pub sclk_coarse: u32,
    pub sclk_fine: u32,
    pub scet: Option<String>,
    pub path_id: Option<u32>,
    pub vcid: Option<u32>,
    pub vcfc: Option<u32>,
    pub mcfc: Option<u32>,
    pub tk_sclk_coarse: Option<u32>,
    pub tk_sclk_fine: Option<u32>,
    pub tk_vcid: Option<u32>,
    pub tk_vcfc: Option<u32>,
    pub tk_data_rate_bps: Option<f64>,
    pub tk_rf_encoding: Option<String>,
    pub tk_valid: StoredValidity,
    pub supp_vcid: Option<u32>,
    pub supp_vcfc: Option<u32>,
    pub supp_mcfc: Option<u32>,
    pub supp_ert: StoredErt,
    pub frame_size_bits: Option<u32>,
}

impl FrameSampleRecord {
    /// Build a row from a sample. Fails if the sample has no usable ERT.
    pub fn from_sample(fs: &FrameSample) -> tlmcache_common::Result<Self> {
        let (ert_epoch_secs, ert_nanos) = fs.storage_key()?;
        Ok(Self {
            ert_epoch_secs,
            ert_nanos,
            ert_utc: fs.ert.utc_string()?,
            ert: StoredErt::from_ert(&fs.ert),
            sclk_coarse: fs.sclk_coarse,
            sclk_fine: fs.sclk_fine,
            scet: fs.scet.clone(),
            path_id: fs.path_id,
            vcid: fs.vcid,
            vcfc: fs.vcfc,
            mcfc: fs.mcfc,
            tk_sclk_coarse: fs.tk.sclk_coarse,
            tk_sclk_fine: fs.tk.sclk_fine,
            tk_vcid: fs.tk.vcid,
            tk_vcfc: fs.tk.vcfc,
            tk_data_rate_bps: fs.tk.data_rate_bps,
            tk_rf_encoding: fs.tk.rf_encoding.clone(),
            tk_valid: fs.tk.valid.into(),
            supp_vcid: fs.supp.vcid,
            supp_vcfc: fs.supp.vcfc,
            supp_mcfc: fs.supp.mcfc,
            supp_ert: StoredErt::from_ert(&fs.supp.ert),
            frame_size_bits: fs.frame_size_bits,
        })
    }

    /// Table key of this row
    #[must_use]
    pub const fn key(&self) -> (i64, u32) {
        (self.ert_epoch_secs, self.ert_nanos)
    }

    /// Rebuild the sample this row was created from
    pub fn to_sample(&self) -> tlmcache_common::Result<FrameSample> {
        Ok(FrameSample {
            sclk_coarse: self.sclk_coarse,
            sclk_fine: self.sclk_fine,
            ert: self.ert.to_ert()?,
            scet: self.scet.clone(),
            path_id: self.path_id,
            vcid: self.vcid,
            vcfc: self.vcfc,
            mcfc: self.mcfc,
            tk: TkFields {
                sclk_coarse: self.tk_sclk_coarse,
                sclk_fine: self.tk_sclk_fine,
                vcid: self.tk_vcid,
                vcfc: self.tk_vcfc,
                data_rate_bps: self.tk_data_rate_bps,
                rf_encoding: self.tk_rf_encoding.clone(),
                valid: self.tk_valid.into(),
            },
            supp: SupplementalFields {
                vcid: self.supp_vcid,
                vcfc: self.supp_vcfc,
                mcfc: self.supp_mcfc,
                ert: self.supp_ert.to_ert()?,
            },
            frame_size_bits: self.frame_size_bits,
        })
    }
}

/// One row of the covered range table: start and stop as whole seconds plus
/// a nanosecond remainder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalRecord {
    pub start_sec: i64,
    pub start_nanos: u32,
    pub stop_sec: i64,
    pub stop_nanos: u32,
}

impl IntervalRecord {
    #[must_use]
    pub fn from_interval(interval: &TimeInterval) -> Self {
        let (start, stop) = (interval.start(), interval.stop());
        Self {
            start_sec: start.timestamp(),
            start_nanos: start.nanosecond(),
            stop_sec: stop.timestamp(),
            stop_nanos: stop.nanosecond(),
        }
    }

    /// Build from a table key/value pair
    #[must_use]
    pub const fn from_row(start: (i64, u32), stop: (i64, u32)) -> Self {
        Self {
            start_sec: start.0,
            start_nanos: start.1,
            stop_sec: stop.0,
            stop_nanos: stop.1,
        }
    }

    #[must_use]
    pub const fn key(&self) -> (i64, u32) {
        (self.start_sec, self.start_nanos)
    }

    #[must_use]
    pub const fn value(&self) -> (i64, u32) {
        (self.stop_sec, self.stop_nanos)
    }

    pub fn to_interval(&self) -> tlmcache_common::Result<TimeInterval> {
        TimeInterval::new(
            time::from_epoch_parts(self.start_sec, self.start_nanos)?,
            time::from_epoch_parts(self.stop_sec, self.stop_nanos)?,
        )
    }
}
