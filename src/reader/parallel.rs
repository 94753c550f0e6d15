//! Chunked parallel filtering on the tokio blocking pool.
//!
//! Input is read `chunk_size` lines at a time. Each chunk is evaluated on a
//! `spawn_blocking` task with at most `workers` chunks in flight, and
//! `try_buffered` hands finished chunks back in input order. Accepted lines
//! are written as soon as their chunk completes, so memory stays bounded by
//! `workers * chunk_size` lines whatever the input size. The output and the
//! first reported parse error match a sequential pass.

use super::stats::{FilterStats, ReadOutcome};
use crate::constants::{DEFAULT_CHUNK_SIZE, default_workers};
use crate::error::{MpcError, Result};
use crate::filter::FilterEngine;
use crate::models::Verdict;
use futures::stream::{self, Stream, TryStreamExt};
use std::ops::Range;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Parallel counterpart of [`super::MpcFilteredReader`]
#[derive(Debug, Clone)]
pub struct ParallelFilter {
    engine: Arc<FilterEngine>,
    workers: usize,
    chunk_size: usize,
    cancellation: CancellationToken,
}

/// Consecutive raw lines read from the input, terminators included
#[derive(Debug)]
struct Chunk {
    first_index: usize,
    data: Vec<u8>,
    spans: Vec<Range<usize>>,
}

#[derive(Debug)]
struct EvaluatedChunk {
    chunk: Chunk,
    verdicts: Vec<Verdict>,
}

impl EvaluatedChunk {
    fn stats(&self) -> FilterStats {
        let mut stats = FilterStats::new();
        for verdict in &self.verdicts {
            stats.record(verdict);
        }
        stats
    }

    fn accepted_lines(&self) -> impl Iterator<Item = &[u8]> {
        self.chunk
            .spans
            .iter()
            .zip(&self.verdicts)
            .filter(|(_, verdict)| verdict.is_accepted())
            .map(|(span, _)| &self.chunk.data[span.clone()])
    }
}

impl ParallelFilter {
    pub fn new(engine: FilterEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: default_workers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Stop between chunks once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Collect accepted observations from an async line source
    pub async fn read_stream<R>(&self, input: R) -> Result<ReadOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        let start = Instant::now();
        let mut chunks = pin!(self.evaluated_chunks(input));
        let mut outcome = ReadOutcome::default();

        while let Some(evaluated) = chunks.try_next().await? {
            self.check_cancelled()?;
            outcome
                .observations
                .extend(evaluated.verdicts.iter().filter_map(Verdict::observation));
            outcome.stats.merge(&evaluated.stats());
        }

        outcome.stats.elapsed = start.elapsed();
        Ok(outcome)
    }

    /// Copy accepted lines verbatim from `input` to `output`, chunk by chunk
    pub async fn filter_stream<R, W>(&self, input: R, mut output: W) -> Result<FilterStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let start = Instant::now();
        let mut chunks = pin!(self.evaluated_chunks(input));
        let mut stats = FilterStats::new();

        while let Some(evaluated) = chunks.try_next().await? {
            self.check_cancelled()?;
            for line in evaluated.accepted_lines() {
                output.write_all(line).await?;
            }
            stats.merge(&evaluated.stats());
        }

        output.flush().await?;
        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    pub async fn read_file(&self, path: &Path) -> Result<ReadOutcome> {
        let input = open_async_input(path).await?;
        let outcome = self.read_stream(input).await?;
        info!("Read {}: {}", path.display(), outcome.stats.summary());
        Ok(outcome)
    }

    /// Write the accepted subset of an MPC file to another file
    ///
    /// The output directory is created when missing. On a parse error the
    /// lines of the chunks already completed stay in the output.
    ///
    /// # Arguments
    ///
    /// * `input_path` - MPC observation file to read
    /// * `output_path` - File receiving the accepted lines, byte-for-byte
    ///
    /// # Returns
    ///
    /// Per-reason counters of the pass, or the first parse error in input order
    pub async fn filter_file(&self, input_path: &Path, output_path: &Path) -> Result<FilterStats> {
        let input = open_async_input(input_path).await?;

        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let output = BufWriter::new(File::create(output_path).await?);
        let stats = self.filter_stream(input, output).await?;

        info!(
            "Filtered {} -> {}: {}",
            input_path.display(),
            output_path.display(),
            stats.summary()
        );
        Ok(stats)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            warn!("Parallel filter cancelled");
            return Err(MpcError::interrupted("Filtering cancelled"));
        }
        Ok(())
    }

    /// Evaluated chunks of `input`, in input order
    fn evaluated_chunks<R>(&self, input: R) -> impl Stream<Item = Result<EvaluatedChunk>>
    where
        R: AsyncBufRead + Unpin,
    {
        let chunk_size = self.chunk_size;
        let engine = Arc::clone(&self.engine);
        debug!(
            "Evaluating chunks of {} lines on {} workers",
            chunk_size, self.workers
        );

        stream::try_unfold((input, 0usize), move |(input, next_index)| {
            next_chunk(input, chunk_size, next_index)
        })
        .map_ok(move |chunk| {
            let engine = Arc::clone(&engine);
            async move {
                let handle = task::spawn_blocking(move || -> Result<EvaluatedChunk> {
                    let verdicts = evaluate_chunk(&engine, &chunk)?;
                    Ok(EvaluatedChunk { chunk, verdicts })
                });
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(MpcError::interrupted(format!("Worker task failed: {e}"))),
                }
            }
        })
        .try_buffered(self.workers)
    }
}

/// Next chunk and the reader state after it, `None` at end of input
async fn next_chunk<R>(mut input: R, lines: usize, first_index: usize) -> Result<Option<(Chunk, (R, usize))>>
where
    R: AsyncBufRead + Unpin,
{
    let chunk = read_chunk(&mut input, lines, first_index).await?;
    if chunk.spans.is_empty() {
        return Ok(None);
    }
    let following = first_index + chunk.spans.len();
    Ok(Some((chunk, (input, following))))
}

async fn read_chunk<R>(input: &mut R, lines: usize, first_index: usize) -> Result<Chunk>
where
    R: AsyncBufRead + Unpin,
{
    let mut chunk = Chunk {
        first_index,
        data: Vec::new(),
        spans: Vec::with_capacity(lines),
    };
    while chunk.spans.len() < lines {
        let start = chunk.data.len();
        if input.read_until(b'\n', &mut chunk.data).await? == 0 {
            break;
        }
        chunk.spans.push(start..chunk.data.len());
    }
    Ok(chunk)
}

fn evaluate_chunk(engine: &FilterEngine, chunk: &Chunk) -> Result<Vec<Verdict>> {
    chunk
        .spans
        .iter()
        .enumerate()
        .map(|(offset, span)| {
            engine
                .evaluate_bytes(&chunk.data[span.clone()])
                .map_err(|source| MpcError::parse(chunk.first_index + offset + 1, source))
        })
        .collect()
}

/// Open an MPC file for chunked async reading
pub(crate) async fn open_async_input(path: &Path) -> Result<BufReader<File>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(MpcError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(BufReader::new(File::open(path).await?))
}
