//! Error handling for MPC observation filtering.
//!
//! Three failure classes are kept apart: hard parse errors on a single line,
//! configuration errors raised when a filter axis is set, and crate-level
//! errors raised by the file-level readers and writers.

use std::path::PathBuf;
use thiserror::Error;

/// A line whose mandatory fields cannot be decoded.
///
/// These abort a read. A record that merely fails a filter is never a
/// `ParseError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed timestamp '{text}': {reason}")]
    MalformedTimestamp { text: String, reason: String },

    #[error("Malformed magnitude '{text}'")]
    MalformedMagnitude { text: String },
}

impl ParseError {
    pub(crate) fn timestamp(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid bounds passed to a filter setter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {axis} range: minimum {min} exceeds maximum {max}")]
    InvertedRange {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Invalid {axis} range: bounds must be finite numbers, got [{min}, {max}]")]
    NonFiniteBound {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Invalid time bound '{value}': expected an MJD number or YYYY-MM-DD[THH:MM:SS]")]
    InvalidTimeBound { value: String },

    #[error("RA and Dec ranges must be configured together")]
    IncompleteSkyWindow,

    #[error("Invalid {name}: must be at least 1")]
    ZeroSetting { name: &'static str },
}

#[derive(Error, Debug)]
pub enum MpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line_number}: {source}")]
    Parse {
        line_number: usize,
        #[source]
        source: ParseError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration file: {path} - {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl MpcError {
    pub fn parse(line_number: usize, source: ParseError) -> Self {
        Self::Parse {
            line_number,
            source,
        }
    }

    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MpcError>;
