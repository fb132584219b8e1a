use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use sweeplib::config::{split_command, FailurePolicy, SweepConfig};
use sweeplib::io::{write_csv, write_json};
use sweeplib::{run_sweep, ProcessSimulator, SweepReport};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Json,
    Csv,
}

/// Flags left unset fall back to the config file, then to the built in defaults
#[derive(Parser, Debug)]
#[command(about = String::from("Sweeps cache simulator configurations and tabulates their hit rates"))]
struct Args {
    /// JSON sweep configuration
    #[arg(short, long, env = "SWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Command for the LRU simulator, split on whitespace
    #[arg(long, env = "SWEEP_LRU_CMD")]
    lru_cmd: Option<String>,

    /// Command for the FIFO simulator, split on whitespace
    #[arg(long, env = "SWEEP_FIFO_CMD")]
    fifo_cmd: Option<String>,

    #[arg(short, long, env = "SWEEP_TRACE")]
    trace: Option<String>,

    #[arg(long, env = "SWEEP_LINE_SIZE")]
    line_size: Option<u32>,

    /// Smallest cache size exponent, inclusive
    #[arg(long, env = "SWEEP_MIN_EXPONENT")]
    min_exponent: Option<u32>,

    /// Largest cache size exponent, exclusive
    #[arg(long, env = "SWEEP_MAX_EXPONENT")]
    max_exponent: Option<u32>,

    /// Implementation to sweep, repeat for several. Defaults to all nine standard ones
    #[arg(short, long = "implementation")]
    implementations: Vec<String>,

    /// Seconds to let each simulator run before killing it
    #[arg(long, env = "SWEEP_TIMEOUT")]
    timeout: Option<f64>,

    /// Simulators to run at once
    #[arg(short, long, env = "SWEEP_JOBS")]
    jobs: Option<usize>,

    /// Record failing points and carry on instead of stopping
    #[arg(short, long)]
    keep_going: bool,

    /// Where to write the table, stdout if not given
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

impl Args {
    /// Builds the sweep configuration, with flags taking priority over the config file
    fn into_config(self) -> Result<(SweepConfig, Option<PathBuf>, Format), String> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::from_json_file(path).map_err(|e| e.to_string())?,
            None => SweepConfig::default(),
        };
        if let Some(cmd) = &self.lru_cmd {
            config.lru_cmd = split_command(cmd);
        }
        if let Some(cmd) = &self.fifo_cmd {
            config.fifo_cmd = split_command(cmd);
        }
        if let Some(trace) = self.trace {
            config.trace_path = trace;
        }
        config.line_size = self.line_size.unwrap_or(config.line_size);
        config.min_exponent = self.min_exponent.unwrap_or(config.min_exponent);
        config.max_exponent = self.max_exponent.unwrap_or(config.max_exponent);
        if !self.implementations.is_empty() {
            config.implementations = self.implementations;
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        config.jobs = self.jobs.unwrap_or(config.jobs);
        if self.keep_going {
            config.failure_policy = FailurePolicy::KeepGoing;
        }
        Ok((config, self.output, self.format))
    }
}

fn write_table(report: &SweepReport, output: Option<&PathBuf>, format: Format) -> io::Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    match format {
        Format::Json => write_json(&report.table, &mut writer)?,
        Format::Csv => write_csv(&report.table, &mut writer)?,
    }
    writer.flush()
}

fn main() -> Result<(), String> {
    // Logs go to stderr, stdout is kept for the table
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let start = Instant::now();
    let (config, output, format) = Args::parse().into_config()?;
    tracing::debug!(?config, "parsed sweep configuration");
    let simulator = ProcessSimulator::from_config(&config);
    let report = run_sweep(&config, &simulator).map_err(|e| format!("Sweep failed: {e}"))?;
    write_table(&report, output.as_ref(), format).map_err(|e| format!("Couldn't write the result table: {e}"))?;
    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "done");

    if !report.failures.is_empty() {
        let formatted = report.failures
            .iter()
            .map(|f| format!("{} at 2^{}: {}", f.implementation_label, f.cache_size_exponent, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!("{} of the sweep's points failed: {formatted}", report.failures.len()));
    }
    Ok(())
}
