//! Command implementations for the MPC filter CLI
//!
//! Each subcommand loads the layered configuration, builds one immutable
//! [`FilterEngine`] and drives it through a sequential or parallel reader.
//! Data goes to stdout or the output file; summaries and logs go to stderr.

use crate::cli::args::{Args, Commands, FilterArgs, FilterOptions, InspectArgs, OutputFormat, ReadArgs};
use crate::config::AppConfig;
use crate::extractor::ObservationLine;
use crate::filter::{FilterConfig, FilterEngine};
use crate::models::{Observation, RejectReason};
use crate::reader::parallel::open_async_input;
use crate::reader::{FilterStats, MpcFilteredReader, ParallelFilter, ReadOutcome, open_input};
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, BufRead, BufWriter, Write};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Main command runner
///
/// Long passes stop between lines or chunks once `cancellation_token` is
/// cancelled.
pub async fn run(args: Args, cancellation_token: CancellationToken) -> Result<()> {
    setup_logging(&args)?;

    match &args.command {
        Commands::Filter(filter_args) => run_filter(filter_args, args.quiet, cancellation_token).await,
        Commands::Read(read_args) => run_read(read_args, args.quiet, cancellation_token).await,
        Commands::Inspect(inspect_args) => run_inspect(inspect_args),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mpc_filter={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to install logging subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install logging subscriber")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> args)
fn load_configuration(options: &FilterOptions) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(options.config_file.as_deref())?
        .with_filter_overrides(options.to_settings());
    if let Some(workers) = options.workers {
        config = config.with_workers(workers);
    }
    config.validate()?;
    Ok(config)
}

fn build_engine(config: &AppConfig) -> Result<FilterEngine> {
    let filters = config.filter_config()?;
    describe_filters(&filters);
    Ok(FilterEngine::new(filters))
}

fn parallel_filter(engine: FilterEngine, config: &AppConfig, cancellation: CancellationToken) -> ParallelFilter {
    ParallelFilter::new(engine)
        .with_workers(config.processing.workers)
        .with_chunk_size(config.processing.chunk_size)
        .with_cancellation(cancellation)
}

/// Run a synchronous reader pass on the blocking pool so the runtime keeps
/// polling the Ctrl+C handler
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = task::spawn_blocking(job)
        .await
        .context("Sequential reader task failed")?;
    Ok(result?)
}

async fn run_filter(args: &FilterArgs, quiet: bool, cancellation: CancellationToken) -> Result<()> {
    let config = load_configuration(&args.options)?;
    let engine = build_engine(&config)?;
    let input = args.input.clone();

    let stats = if args.options.sequential {
        let reader = MpcFilteredReader::with_engine(engine).with_cancellation(cancellation);
        match args.output.clone() {
            Some(output) => run_blocking(move || reader.filter_file(&input, &output)).await,
            None => {
                run_blocking(move || {
                    let stdout = io::stdout();
                    reader.filter_stream(open_input(&input)?, BufWriter::new(stdout.lock()))
                })
                .await
            }
        }
    } else {
        let parallel = parallel_filter(engine, &config, cancellation);
        match &args.output {
            Some(output) => parallel.filter_file(&input, output).await.map_err(Into::into),
            None => {
                let output = tokio::io::BufWriter::new(tokio::io::stdout());
                parallel
                    .filter_stream(open_async_input(&input).await?, output)
                    .await
                    .map_err(Into::into)
            }
        }
    }
    .with_context(|| format!("Failed to filter {}", args.input.display()))?;

    if !quiet {
        print_summary(&stats);
    }
    Ok(())
}

async fn run_read(args: &ReadArgs, quiet: bool, cancellation: CancellationToken) -> Result<()> {
    let config = load_configuration(&args.options)?;
    let engine = build_engine(&config)?;
    let input = args.input.clone();

    let outcome: ReadOutcome = if args.options.sequential {
        let reader = MpcFilteredReader::with_engine(engine).with_cancellation(cancellation);
        run_blocking(move || reader.read_file(&input)).await
    } else {
        parallel_filter(engine, &config, cancellation)
            .read_file(&input)
            .await
            .map_err(Into::into)
    }
    .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_observations(&mut out, &outcome.observations, args.format)?;
    out.flush()?;

    if !quiet {
        print_summary(&outcome.stats);
    }
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let mut input = open_input(&args.input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut buffer = Vec::new();
    let mut line_number = 0;

    while line_number < args.limit {
        buffer.clear();
        if input.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;

        let line = ObservationLine::new(&buffer);
        match line.extract() {
            Ok(fields) => {
                let position = fields
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "coordinate absent".yellow().to_string());
                let magnitude = fields
                    .magnitude
                    .map(|m| format!("{m:.1}"))
                    .unwrap_or_else(|| "-".to_string());
                let utc = fields
                    .time
                    .to_datetime()
                    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{:>6}  {:<12} MJD {} ({})  {}  mag {:>5}  obs {}",
                    line_number,
                    fields.designation.bright_white().bold(),
                    fields.time,
                    utc,
                    position,
                    magnitude,
                    fields.obscode.as_deref().unwrap_or("---")
                )?;
            }
            Err(e) => {
                writeln!(out, "{:>6}  {}", line_number, e.to_string().bright_red())?;
            }
        }
    }

    out.flush()?;
    info!("Inspected {} records from {}", line_number, args.input.display());
    Ok(())
}

fn write_observations<W: Write>(out: &mut W, observations: &[Observation], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            for observation in observations {
                writeln!(
                    out,
                    "{:>12.6}h  {:>+11.6}°  {} {}",
                    observation.position.ra_hours,
                    observation.position.dec_degrees,
                    "MJD".bright_cyan(),
                    observation.time
                )?;
            }
        }
        OutputFormat::Tsv => {
            writeln!(out, "ra_hours\tdec_degrees\tmjd")?;
            for observation in observations {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    observation.position.ra_hours,
                    observation.position.dec_degrees,
                    observation.time.value()
                )?;
            }
        }
    }
    Ok(())
}

fn describe_filters(filters: &FilterConfig) {
    if filters.active_filters() == 0 {
        info!("No filters configured, every decodable record is accepted");
        return;
    }
    if let Some(range) = filters.time_range() {
        info!("Time filter: MJD [{}, {}]", range.min, range.max);
    }
    if let Some(window) = filters.sky_window() {
        info!(
            "Sky filter: RA [{}, {}]h, Dec [{}, {}]°",
            window.ra_hours.min, window.ra_hours.max, window.dec_degrees.min, window.dec_degrees.max
        );
    }
    if let Some(name) = filters.name() {
        info!("Name filter: {}", name);
    }
    if let Some(obscode) = filters.obscode() {
        info!("Obscode filter: {}", obscode);
    }
    if let Some(range) = filters.magnitude_range() {
        info!("Magnitude filter: [{}, {}]", range.min, range.max);
    }
}

fn print_summary(stats: &FilterStats) {
    eprintln!("\n{}", "Filter Summary".bright_green().bold());
    eprintln!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.elapsed.as_millis().to_string().bright_white()
    );
    eprintln!(
        "  {} {}",
        "Lines read:".bright_cyan(),
        stats.lines_read.to_string().bright_white()
    );
    eprintln!(
        "  {} {} ({:.1}%)",
        "Accepted:".bright_cyan(),
        stats.accepted.to_string().bright_white().bold(),
        stats.acceptance_rate() * 100.0
    );
    for reason in RejectReason::ALL {
        let count = stats.rejections_for(reason);
        if count > 0 {
            eprintln!(
                "  {} {}",
                format!("Rejected, {}:", reason).bright_yellow(),
                count.to_string().bright_white()
            );
        }
    }
}
