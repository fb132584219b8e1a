//! # SweepLib
//!
//! Sweeplib runs an external cache simulator over a range of configurations and collects the hit
//! rates it reports
//!
//! Each configuration is encoded into the answers the simulator expects on stdin, the simulator is
//! run as a child process, and the hit rate is read back out of what it prints. The results are
//! gathered into a table ordered by implementation, then cache size

/// Contains the sweep configuration, the implementation table, and the types describing a single
/// simulator run
pub mod config;

/// Contains the error types for configuration, process handling, and output parsing
pub mod error;

/// Contains the encoder for the simulator's stdin protocol
pub mod protocol;

/// Contains the process handling used to run the simulator, with a trait for other simulators
pub mod invoker;

/// Contains the hit rate parser for simulator output
pub mod parser;

/// Contains the sweep itself and the result table it produces
pub mod sweep;

/// Contains JSON and CSV writers for result tables
pub mod io;


/// Contains utilities for running tests and benchmarks.
pub mod util;

pub use config::SweepConfig;
pub use error::SweepError;
pub use invoker::{ProcessSimulator, Simulator};
pub use sweep::{run_sweep, ResultTable, SimulationOutcome, SweepReport};
