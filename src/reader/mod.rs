//! File-level readers built on the filter engine.
//!
//! Drives [`FilterEngine`] over a sequence of raw MPC records and hands each
//! accepted record to a consumer:
//!
//! - [`MpcFilteredReader::read_lines`] / [`MpcFilteredReader::read_file`]
//!   collect the accepted (position, time) pairs in memory
//! - [`MpcFilteredReader::filter_stream`] / [`MpcFilteredReader::filter_file`]
//!   copy accepted lines byte-for-byte to an output, terminators included
//! - [`parallel::ParallelFilter`] does the same on a pool of blocking tasks
//!
//! Lines are read as bytes, so Latin-1 content never aborts a read. A hard
//! parse error on any line aborts the whole pass and reports its 1-based line
//! number; filtered lines are silently dropped.

pub mod parallel;
pub mod stats;

#[cfg(test)]
pub mod tests;

pub use parallel::ParallelFilter;
pub use stats::{FilterStats, ReadOutcome};

use crate::error::{MpcError, Result};
use crate::filter::{FilterConfig, FilterEngine};
use crate::models::Observation;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sequential reader applying one fixed filter configuration
#[derive(Debug, Clone, Default)]
pub struct MpcFilteredReader {
    engine: FilterEngine,
    cancellation: CancellationToken,
}

impl MpcFilteredReader {
    pub fn new(config: FilterConfig) -> Self {
        Self::with_engine(FilterEngine::new(config))
    }

    pub fn with_engine(engine: FilterEngine) -> Self {
        Self {
            engine,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stop between lines once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    /// Evaluate every line of `input`, calling `on_accept` with the raw line
    /// bytes and the decoded observation of each accepted record
    pub fn for_each_accepted<R, F>(&self, mut input: R, mut on_accept: F) -> Result<FilterStats>
    where
        R: BufRead,
        F: FnMut(&[u8], Observation) -> Result<()>,
    {
        let start = Instant::now();
        let mut stats = FilterStats::new();
        let mut buffer = Vec::with_capacity(128);
        let mut line_number = 0;

        loop {
            if self.cancellation.is_cancelled() {
                warn!("Read cancelled after {} lines", line_number);
                return Err(MpcError::interrupted("Filtering cancelled"));
            }
            buffer.clear();
            if input.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let verdict = self.engine.evaluate_bytes(&buffer).map_err(|source| {
                warn!("Aborting read at line {}: {}", line_number, source);
                MpcError::parse(line_number, source)
            })?;
            stats.record(&verdict);

            if let Some(observation) = verdict.observation() {
                on_accept(&buffer, observation)?;
            }
        }

        stats.elapsed = start.elapsed();
        debug!("Rejections by reason: {:?}", stats.rejections);
        Ok(stats)
    }

    /// Collect accepted observations from a line source
    pub fn read_lines<R: BufRead>(&self, input: R) -> Result<ReadOutcome> {
        let mut observations = Vec::new();
        let stats = self.for_each_accepted(input, |_, observation| {
            observations.push(observation);
            Ok(())
        })?;
        Ok(ReadOutcome {
            observations,
            stats,
        })
    }

    /// Collect accepted observations from an MPC file
    pub fn read_file(&self, path: &Path) -> Result<ReadOutcome> {
        let input = open_input(path)?;
        let outcome = self.read_lines(input)?;
        info!("Read {}: {}", path.display(), outcome.stats.summary());
        Ok(outcome)
    }

    /// Copy accepted lines verbatim from `input` to `output`
    pub fn filter_stream<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<FilterStats> {
        let stats = self.for_each_accepted(input, |raw, _| {
            output.write_all(raw)?;
            Ok(())
        })?;
        output.flush()?;
        Ok(stats)
    }

    /// Write the accepted subset of `input_path` to `output_path`
    ///
    /// The output directory is created when missing. On a parse error the
    /// partially written output is left in place.
    ///
    /// # Arguments
    ///
    /// * `input_path` - MPC observation file to read
    /// * `output_path` - File receiving the accepted lines, byte-for-byte
    ///
    /// # Returns
    ///
    /// Per-reason counters of the pass, or the parse error that aborted it
    pub fn filter_file(&self, input_path: &Path, output_path: &Path) -> Result<FilterStats> {
        let input = open_input(input_path)?;
        let output = create_output(output_path)?;
        let stats = self.filter_stream(input, output)?;
        info!(
            "Filtered {} -> {}: {}",
            input_path.display(),
            output_path.display(),
            stats.summary()
        );
        Ok(stats)
    }
}

pub(crate) fn open_input(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(MpcError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(BufReader::new(File::open(path)?))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
