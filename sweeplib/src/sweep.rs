use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};
use crate::config::{FailurePolicy, Implementation, SweepConfig, SweepPoint};
use crate::error::{PointError, SweepError};
use crate::invoker::Simulator;
use crate::parser::parse_hit_rate;
use crate::protocol::encode;

/// The hit rate one implementation reached at one cache size. Serialised with the table's column
/// names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    #[serde(rename = "Hit Rate")]
    pub hit_rate: f64,
    #[serde(rename = "Cache Implementation")]
    pub implementation_label: String,
    #[serde(rename = "Cache Size")]
    pub cache_size_bytes: u64,
}

/// Rows in sweep order: grouped by implementation, cache sizes ascending within each group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<SimulationOutcome>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: SimulationOutcome) {
        self.rows.push(outcome);
    }

    pub fn rows(&self) -> &[SimulationOutcome] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationOutcome> {
        self.rows.iter()
    }
}

/// A point that produced no row, recorded when the sweep keeps going past failures
#[derive(Debug, Serialize)]
pub struct PointFailure {
    pub implementation_label: String,
    pub cache_size_exponent: u32,
    #[serde(serialize_with = "serialize_display")]
    pub error: PointError,
}

/// Everything a sweep produced
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub table: ResultTable,
    pub failures: Vec<PointFailure>,
}

fn serialize_display<S: Serializer>(error: &PointError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

type PointResult = Result<SimulationOutcome, PointError>;

/// Runs every configured implementation at every cache size and collects the hit rates
///
/// Points run in implementation-major, exponent-minor order, and that's the row order of the
/// table whatever the number of jobs. With more than one job, simulator runs overlap, but results
/// are put back in order before the table is built.
///
/// With [`FailurePolicy::Abort`] the first failing point ends the sweep and no table is produced.
/// With [`FailurePolicy::KeepGoing`] failures are recorded in the report instead, apart from
/// simulators that can't be started at all.
///
/// # Arguments
///
/// * `config`: The sweep to run, validated before anything starts
/// * `simulator`: What answers each point, usually a [`crate::invoker::ProcessSimulator`]
///
/// returns: Result<SweepReport, SweepError>
pub fn run_sweep<S: Simulator>(config: &SweepConfig, simulator: &S) -> Result<SweepReport, SweepError> {
    let implementations = config.validate()?;
    let points: Vec<(&'static Implementation, u32)> = implementations
        .iter()
        .flat_map(|&implementation| config.exponents().map(move |exponent| (implementation, exponent)))
        .collect();
    if config.exponents().is_empty() {
        warn!(low = config.min_exponent, high = config.max_exponent, "empty cache size range, nothing to run");
    }

    let start = Instant::now();
    info!(points = points.len(), implementations = implementations.len(), jobs = config.jobs, "starting sweep");
    let results = if config.jobs <= 1 || points.len() <= 1 {
        run_sequential(config, simulator, &points)
    } else {
        run_parallel(config, simulator, &points)
    };

    let mut report = SweepReport::default();
    for (&(implementation, exponent), result) in points.iter().zip(results) {
        // Points after an abort never ran
        let Some(result) = result else { continue };
        match result {
            Ok(outcome) => report.table.push(outcome),
            Err(source) if stops_sweep(config.failure_policy, &source) => {
                return Err(SweepError::Point {
                    label: implementation.label.to_string(),
                    exponent,
                    source,
                });
            }
            Err(error) => {
                warn!(label = implementation.label, exponent, %error, "point failed, continuing");
                report.failures.push(PointFailure {
                    implementation_label: implementation.label.to_string(),
                    cache_size_exponent: exponent,
                    error,
                });
            }
        }
    }
    info!(
        rows = report.table.len(),
        failures = report.failures.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sweep finished"
    );
    Ok(report)
}

/// Runs a single point: encode, run, parse
fn run_point<S: Simulator>(config: &SweepConfig, simulator: &S, implementation: &Implementation, exponent: u32) -> PointResult {
    let point = SweepPoint::new(config, implementation, exponent);
    let input = encode(&point);
    debug!(label = implementation.label, exponent, ?input, "running point");
    let output = simulator.run(point.policy, &input)?;
    let hit_rate = parse_hit_rate(&output)?;
    debug!(label = implementation.label, exponent, hit_rate, "point finished");
    Ok(SimulationOutcome {
        hit_rate,
        implementation_label: implementation.label.to_string(),
        cache_size_bytes: 1u64 << exponent,
    })
}

fn stops_sweep(policy: FailurePolicy, error: &PointError) -> bool {
    policy == FailurePolicy::Abort || error.is_fatal()
}

fn run_sequential<S: Simulator>(config: &SweepConfig, simulator: &S, points: &[(&'static Implementation, u32)]) -> Vec<Option<PointResult>> {
    let mut results = Vec::with_capacity(points.len());
    for &(implementation, exponent) in points {
        let result = run_point(config, simulator, implementation, exponent);
        let stop = matches!(&result, Err(error) if stops_sweep(config.failure_policy, error));
        results.push(Some(result));
        if stop {
            break;
        }
    }
    results.resize_with(points.len(), || None);
    results
}

/// Runs points on up to `config.jobs` threads, returning results in point order
///
/// Workers claim points in order from a shared counter. Once a point fails in a way that stops the
/// sweep no new points are claimed, so every point before the failing one still has a result.
fn run_parallel<S: Simulator>(config: &SweepConfig, simulator: &S, points: &[(&'static Implementation, u32)]) -> Vec<Option<PointResult>> {
    let workers = config.jobs.min(points.len());
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (snd, rec) = mpsc::channel::<(usize, PointResult)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let snd = snd.clone();
            let (next, stop) = (&next, &stop);
            scope.spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    let index = next.fetch_add(1, Ordering::AcqRel);
                    let Some(&(implementation, exponent)) = points.get(index) else { break };
                    let result = run_point(config, simulator, implementation, exponent);
                    if matches!(&result, Err(error) if stops_sweep(config.failure_policy, error)) {
                        stop.store(true, Ordering::Release);
                    }
                    if snd.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(snd);

    let mut results: Vec<Option<PointResult>> = Vec::new();
    results.resize_with(points.len(), || None);
    for (index, result) in rec {
        results[index] = Some(result);
    }
    results
}
