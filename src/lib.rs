//! MPC Observation Filter Library
//!
//! A Rust library for selecting astrometric observations from Minor Planet
//! Center 80-column observation files.
//!
//! This library provides tools for:
//! - Extracting designation, time, sky position, magnitude and observatory
//!   code from fixed-width MPC records
//! - Evaluating records against independently optional filters on time,
//!   sky window, designation, observatory and magnitude
//! - Reading filtered observations or copying accepted lines verbatim,
//!   sequentially or on a pool of blocking workers
//! - Layered TOML and command-line configuration
//!
//! ```
//! use mpc_filter::{FilterConfig, FilterEngine};
//!
//! let line = "     She001  2C1995 09 14.79817 23 29 42.54 -02 59 15.9          15.5 V      121";
//! let config = FilterConfig::new().with_magnitude_range(14.0, 18.0).unwrap();
//! let verdict = FilterEngine::new(config).evaluate_line(line).unwrap();
//! assert!(verdict.is_accepted());
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod reader;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use error::{ConfigError, MpcError, ParseError, Result};
pub use extractor::{ExtractedFields, FieldSource, ObservationLine, extract};
pub use filter::{Bounds, FilterConfig, FilterEngine, SkyWindow};
pub use models::{Mjd, Observation, RejectReason, SkyPosition, Verdict};
pub use reader::{FilterStats, MpcFilteredReader, ParallelFilter, ReadOutcome};
