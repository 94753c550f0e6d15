//! Record layout and processing defaults
//!
//! Byte offsets of the MPC 80-column observation format and the default
//! values used by the readers and the CLI.

use std::ops::Range;

// =============================================================================
// MPC 80-column Record Layout
// =============================================================================

/// Full width of an MPC observation record
pub const RECORD_WIDTH: usize = 80;

/// Column offsets (0-indexed, half-open) of the 80-column format
pub mod columns {
    use super::Range;

    /// Packed or provisional designation, columns 1-12
    pub const DESIGNATION: Range<usize> = 0..12;

    /// Observation year, columns 16-19
    pub const YEAR: Range<usize> = 15..19;

    /// Observation month, columns 21-22
    pub const MONTH: Range<usize> = 20..22;

    /// Integer day of month, columns 24-25
    pub const DAY: Range<usize> = 23..25;

    /// Decimal fraction of the day, columns 26-31
    pub const DAY_FRACTION: Range<usize> = 25..31;

    /// Right ascension as "HH MM SS.ss", columns 33-44
    pub const RIGHT_ASCENSION: Range<usize> = 32..44;

    /// Declination as "sDD MM SS.s", columns 45-56
    pub const DECLINATION: Range<usize> = 44..56;

    /// Observed magnitude, columns 66-70
    pub const MAGNITUDE: Range<usize> = 65..70;

    /// Observatory code, columns 78-80
    pub const OBSCODE: Range<usize> = 77..80;
}

/// Byte index that must hold a '.' for the magnitude field to be present (column 68)
pub const MAGNITUDE_SENTINEL_INDEX: usize = 67;

/// Length of an observatory code
pub const OBSCODE_WIDTH: usize = 3;

// =============================================================================
// Time and Coordinate Constants
// =============================================================================

/// Calendar date of MJD 0 (1858-11-17, UTC midnight)
pub const MJD_EPOCH: (i32, u32, u32) = (1858, 11, 17);

/// Hours in a full circle of right ascension
pub const HOURS_PER_CIRCLE: f64 = 24.0;

/// Largest absolute declination in degrees
pub const MAX_ABS_DECLINATION: f64 = 90.0;

/// Minutes or seconds per sexagesimal unit
pub const SEXAGESIMAL_BASE: f64 = 60.0;

// =============================================================================
// Processing Defaults
// =============================================================================

/// Lines evaluated per blocking task in the parallel filter
pub const DEFAULT_CHUNK_SIZE: usize = 16_384;

/// Default number of concurrent worker tasks
pub fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Default configuration file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mpc-filter.toml";
