//! Core value types for MPC observation filtering.
//!
//! Defines the decoded time and sky position of an observation, the
//! accepted observation returned to collectors, and the verdict produced by
//! the filter engine for each record.

use crate::constants::MJD_EPOCH;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modified Julian Date on the UTC timeline
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Mjd(f64);

impl Mjd {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw MJD value
    pub fn value(&self) -> f64 {
        self.0
    }

    /// MJD of a calendar date at UTC midnight, `None` if the date does not exist
    pub fn from_calendar_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self::from_naive_date(date))
    }

    pub fn from_naive_date(date: NaiveDate) -> Self {
        Self(date.signed_duration_since(mjd_epoch()).num_days() as f64)
    }

    pub fn from_naive_datetime(datetime: NaiveDateTime) -> Self {
        let midnight = Self::from_naive_date(datetime.date());
        let time = datetime.time();
        let seconds =
            time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1_000_000_000.0;
        Self(midnight.0 + seconds / 86_400.0)
    }

    /// Convert back to a UTC instant, millisecond precision
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let millis = (self.0 * 86_400_000.0).round();
        if !millis.is_finite() {
            return None;
        }
        let offset = TimeDelta::try_milliseconds(millis as i64)?;
        let epoch = mjd_epoch().and_hms_opt(0, 0, 0)?;
        epoch
            .checked_add_signed(offset)
            .map(|naive| naive.and_utc())
    }

    /// Shift by a fractional number of days
    pub fn add_days(self, days: f64) -> Self {
        Self(self.0 + days)
    }
}

impl fmt::Display for Mjd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.0)
    }
}

fn mjd_epoch() -> NaiveDate {
    let (year, month, day) = MJD_EPOCH;
    // Constant, always a valid calendar date
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Equatorial position of an observation
///
/// Right ascension is in hours, normalised to [0, 24). Declination is in
/// degrees within [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_hours: f64,
    pub dec_degrees: f64,
}

impl SkyPosition {
    pub fn new(ra_hours: f64, dec_degrees: f64) -> Self {
        Self {
            ra_hours,
            dec_degrees,
        }
    }
}

impl fmt::Display for SkyPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RA {:.6}h Dec {:+.6}°", self.ra_hours, self.dec_degrees)
    }
}

/// An observation that passed every configured filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: SkyPosition,
    pub time: Mjd,
}

/// Why a record was dropped by the filter engine
///
/// Variants are listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    OutsideTimeRange,
    CoordinateAbsent,
    OutsideSkyWindow,
    NameMismatch,
    ObscodeAbsent,
    ObscodeMismatch,
    MagnitudeAbsent,
    OutsideMagnitudeRange,
}

impl RejectReason {
    pub const ALL: [RejectReason; 8] = [
        RejectReason::OutsideTimeRange,
        RejectReason::CoordinateAbsent,
        RejectReason::OutsideSkyWindow,
        RejectReason::NameMismatch,
        RejectReason::ObscodeAbsent,
        RejectReason::ObscodeMismatch,
        RejectReason::MagnitudeAbsent,
        RejectReason::OutsideMagnitudeRange,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::OutsideTimeRange => "outside time range",
            RejectReason::CoordinateAbsent => "coordinate absent",
            RejectReason::OutsideSkyWindow => "outside sky window",
            RejectReason::NameMismatch => "name mismatch",
            RejectReason::ObscodeAbsent => "obscode absent",
            RejectReason::ObscodeMismatch => "obscode mismatch",
            RejectReason::MagnitudeAbsent => "magnitude absent",
            RejectReason::OutsideMagnitudeRange => "outside magnitude range",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of evaluating one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept { position: SkyPosition, time: Mjd },
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept { .. })
    }

    pub fn observation(&self) -> Option<Observation> {
        match *self {
            Verdict::Accept { position, time } => Some(Observation { position, time }),
            Verdict::Reject(_) => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match *self {
            Verdict::Accept { .. } => None,
            Verdict::Reject(reason) => Some(reason),
        }
    }
}
