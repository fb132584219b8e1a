use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to get output out of a simulator process
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("the simulator command is empty")]
    EmptyCommand,

    #[error("couldn't start simulator `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("simulator `{program}` didn't finish within {timeout:?} and was killed")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while talking to simulator `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Failure to read a hit rate out of simulator output
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("simulator output has no `hit rate ` marker")]
    MissingMarker,

    #[error("couldn't read a hit rate from `{0}`")]
    Malformed(String),

    #[error("hit rate {0} is outside [0, 1], the simulator probably misread its input")]
    OutOfRange(f64),
}

/// Why a single sweep point didn't produce a row
#[derive(Debug, Error)]
pub enum PointError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PointError {
    /// Errors that would repeat for every other point, so the sweep can't usefully continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, PointError::Invoke(InvokeError::Spawn { .. } | InvokeError::EmptyCommand))
    }
}

/// Problems with the sweep configuration, found before anything runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the line size must be positive")]
    LineSize,

    #[error("cache size exponents {low}..{high} must be positive and below 65")]
    ExponentRange { low: u32, high: u32 },

    #[error("at least one job is required")]
    Jobs,

    #[error("timeout of {0}s is not a positive number of seconds")]
    Timeout(f64),

    #[error("unknown cache implementation `{0}`")]
    UnknownImplementation(String),

    #[error("couldn't open the config file at path {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't parse the config file at path {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top level sweep error
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{label} with cache size exponent {exponent}: {source}")]
    Point {
        label: String,
        exponent: u32,
        #[source]
        source: PointError,
    },
}
