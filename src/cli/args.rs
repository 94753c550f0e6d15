//! Command-line argument definitions for the MPC filter
//!
//! Defines the CLI using the clap derive API. Filter flags are shared by the
//! `filter` and `read` subcommands and override any configuration file one
//! axis at a time.

use crate::config::{FilterSettings, TimeBound};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the MPC observation filter
///
/// Selects records from Minor Planet Center 80-column observation files by
/// designation, observatory code, time, sky position and magnitude.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mpc-filter",
    version,
    about = "Filter Minor Planet Center 80-column observation files",
    long_about = "Parses MPC 80-column observation records and keeps the ones that pass every \
                  configured filter. Accepted records can be copied verbatim to a new MPC file \
                  or printed as decoded positions and times for downstream astrometry."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Write the accepted records of an MPC file, copied byte-for-byte
    Filter(FilterArgs),
    /// Print the sky position and time of each accepted record
    Read(ReadArgs),
    /// Decode every field of each record without filtering
    Inspect(InspectArgs),
}

/// Filter axes shared by the filtering subcommands
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterOptions {
    /// Keep only records whose trimmed designation equals NAME
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Keep only records from this 3-character observatory code
    #[arg(long, value_name = "CODE")]
    pub obscode: Option<String>,

    /// Inclusive time window, as MJD numbers or YYYY-MM-DD[THH:MM:SS] dates
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub time: Option<Vec<TimeBound>>,

    /// Inclusive right ascension window in hours (requires --dec)
    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true,
        requires = "dec"
    )]
    pub ra: Option<Vec<f64>>,

    /// Inclusive declination window in degrees (requires --ra)
    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true,
        requires = "ra"
    )]
    pub dec: Option<Vec<f64>>,

    /// Inclusive magnitude window; records without a magnitude are dropped
    #[arg(
        long = "mag",
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true
    )]
    pub magnitude: Option<Vec<f64>>,

    /// Path to configuration file (TOML format)
    ///
    /// If not specified, mpc-filter.toml in the working directory is used
    /// when present.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Evaluate lines one at a time on the calling thread
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,
}

impl FilterOptions {
    /// Filter axes given on the command line
    pub fn to_settings(&self) -> FilterSettings {
        FilterSettings {
            name: self.name.clone(),
            obscode: self.obscode.clone(),
            time: pair(&self.time),
            ra: pair(&self.ra),
            dec: pair(&self.dec),
            magnitude: pair(&self.magnitude),
        }
    }
}

fn pair<T: Clone>(values: &Option<Vec<T>>) -> Option<[T; 2]> {
    match values.as_deref() {
        Some([first, second]) => Some([first.clone(), second.clone()]),
        _ => None,
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct FilterArgs {
    /// MPC observation file to filter
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file for accepted records (default: stdout)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub options: FilterOptions,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ReadArgs {
    /// MPC observation file to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output format for accepted observations
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub options: FilterOptions,
}

#[derive(Debug, Clone, clap::Args)]
pub struct InspectArgs {
    /// MPC observation file to inspect
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Maximum number of records to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned, colored columns
    Human,
    /// Tab-separated ra_hours, dec_degrees, mjd with a header row
    Tsv,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}
