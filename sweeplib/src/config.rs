use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;

/// The replacement policy, selects which simulator executable is run - lru or fifo
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplacementPolicy {
    #[serde(alias = "lru")]
    Lru,
    #[serde(alias = "fifo")]
    Fifo,
}

/// The way counts the simulator can be asked for when it isn't direct mapped or fully associative
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Ways {
    Two,
    Four,
    Eight,
    Sixteen,
}

impl Ways {
    /// The number of lines in each set
    pub fn count(self) -> u32 {
        match self {
            Ways::Two => 2,
            Ways::Four => 4,
            Ways::Eight => 8,
            Ways::Sixteen => 16,
        }
    }

    /// Gets the variant for a way count, if the simulator supports it
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            2 => Some(Ways::Two),
            4 => Some(Ways::Four),
            8 => Some(Ways::Eight),
            16 => Some(Ways::Sixteen),
            _ => None,
        }
    }
}

/// How many lines an address may map to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssociativityVariant {
    FullyAssociative,
    DirectMapped,
    NWay(Ways),
}

/// One entry of the implementation table, pairing the label used in the result table with the
/// simulator configuration it stands for
#[derive(Debug, PartialEq, Eq)]
pub struct Implementation {
    pub label: &'static str,
    pub policy: ReplacementPolicy,
    pub associativity: AssociativityVariant,
}

const fn implementation(label: &'static str, policy: ReplacementPolicy, associativity: AssociativityVariant) -> Implementation {
    Implementation { label, policy, associativity }
}

/// Every implementation the sweep knows about. The first [`DEFAULT_IMPLEMENTATION_COUNT`] entries
/// are the default sweep, in the order their rows appear in the table.
///
/// Direct mapped caches never make a replacement decision, so they always run the LRU binary
pub static IMPLEMENTATIONS: [Implementation; 11] = [
    implementation("Direct Mapped", ReplacementPolicy::Lru, AssociativityVariant::DirectMapped),
    implementation("Fully Associative (LRU)", ReplacementPolicy::Lru, AssociativityVariant::FullyAssociative),
    implementation("2-Way Set Associative (LRU)", ReplacementPolicy::Lru, AssociativityVariant::NWay(Ways::Two)),
    implementation("4-Way Set Associative (LRU)", ReplacementPolicy::Lru, AssociativityVariant::NWay(Ways::Four)),
    implementation("8-Way Set Associative (LRU)", ReplacementPolicy::Lru, AssociativityVariant::NWay(Ways::Eight)),
    implementation("Fully Associative (FIFO)", ReplacementPolicy::Fifo, AssociativityVariant::FullyAssociative),
    implementation("2-Way Set Associative (FIFO)", ReplacementPolicy::Fifo, AssociativityVariant::NWay(Ways::Two)),
    implementation("4-Way Set Associative (FIFO)", ReplacementPolicy::Fifo, AssociativityVariant::NWay(Ways::Four)),
    implementation("8-Way Set Associative (FIFO)", ReplacementPolicy::Fifo, AssociativityVariant::NWay(Ways::Eight)),
    implementation("16-Way Set Associative (LRU)", ReplacementPolicy::Lru, AssociativityVariant::NWay(Ways::Sixteen)),
    implementation("16-Way Set Associative (FIFO)", ReplacementPolicy::Fifo, AssociativityVariant::NWay(Ways::Sixteen)),
];

/// Number of leading [`IMPLEMENTATIONS`] swept when no list is configured
pub const DEFAULT_IMPLEMENTATION_COUNT: usize = 9;

impl Implementation {
    /// Looks up a label in the implementation table. Labels must match exactly
    pub fn from_label(label: &str) -> Option<&'static Implementation> {
        IMPLEMENTATIONS.iter().find(|imp| imp.label == label)
    }

    /// The implementations swept by default
    pub fn defaults() -> &'static [Implementation] {
        &IMPLEMENTATIONS[..DEFAULT_IMPLEMENTATION_COUNT]
    }
}

/// Everything needed for one simulator invocation. Built per point and thrown away afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPoint {
    pub cache_size_exponent: u32,
    pub line_size: u32,
    pub associativity: AssociativityVariant,
    pub policy: ReplacementPolicy,
    pub trace_path: String,
}

impl SweepPoint {
    /// Creates the point for an implementation at a given cache size exponent
    pub fn new(config: &SweepConfig, implementation: &Implementation, cache_size_exponent: u32) -> Self {
        Self {
            cache_size_exponent,
            line_size: config.line_size,
            associativity: implementation.associativity,
            policy: implementation.policy,
            trace_path: config.trace_path.clone(),
        }
    }
}

/// What the sweep does when a single point fails
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop at the first failure, producing no table
    #[default]
    #[serde(alias = "abort")]
    Abort,
    /// Record the failure and carry on with the remaining points. Failures to start the simulator
    /// still abort, as every other point would fail the same way
    #[serde(alias = "keep-going", alias = "keep_going")]
    KeepGoing,
}

/// The full, immutable configuration for a sweep. Can be read from JSON, where every field is
/// optional and falls back to [`SweepConfig::default`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Program and arguments for the LRU simulator
    pub lru_cmd: Vec<String>,
    /// Program and arguments for the FIFO simulator
    pub fifo_cmd: Vec<String>,
    pub trace_path: String,
    pub line_size: u32,
    /// Lowest cache size exponent, inclusive
    pub min_exponent: u32,
    /// Highest cache size exponent, exclusive
    pub max_exponent: u32,
    /// Implementation labels to sweep, in row order. Empty means the defaults
    pub implementations: Vec<String>,
    /// Seconds to wait for each simulator run, unbounded when unset
    pub timeout_secs: Option<f64>,
    /// Number of simulator processes allowed to run at once
    pub jobs: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lru_cmd: split_command("./cache_sim_LRU"),
            fifo_cmd: split_command("./cache_sim_FIFO"),
            trace_path: "trace_files/swim.trace".to_string(),
            line_size: 6,
            min_exponent: 10,
            max_exponent: 15,
            implementations: Vec::new(),
            timeout_secs: None,
            jobs: 1,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl SweepConfig {
    /// Reads a configuration from a JSON file
    ///
    /// # Arguments
    ///
    /// * `path`: Path to the JSON file
    ///
    /// returns: Result<SweepConfig, ConfigError>
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
    }

    /// The half-open range of cache size exponents
    pub fn exponents(&self) -> Range<u32> {
        self.min_exponent..self.max_exponent
    }

    /// The command used to run the simulator for a policy
    pub fn command_for(&self, policy: ReplacementPolicy) -> &[String] {
        match policy {
            ReplacementPolicy::Lru => &self.lru_cmd,
            ReplacementPolicy::Fifo => &self.fifo_cmd,
        }
    }

    /// The per-run deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    /// Checks the bounds the sweep relies on and resolves the implementation labels
    ///
    /// Validation happens before any simulator is started, so a bad label or range never leaves
    /// a half finished sweep behind
    ///
    /// returns: Result<Vec<&Implementation>, ConfigError>, the implementations in row order
    pub fn validate(&self) -> Result<Vec<&'static Implementation>, ConfigError> {
        if self.line_size == 0 {
            return Err(ConfigError::LineSize);
        }
        // 2^exponent must fit in the reported u64 byte count
        if self.min_exponent == 0 || self.max_exponent > u64::BITS {
            return Err(ConfigError::ExponentRange { low: self.min_exponent, high: self.max_exponent });
        }
        if self.jobs == 0 {
            return Err(ConfigError::Jobs);
        }
        if let Some(secs) = self.timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::Timeout(secs));
            }
        }
        if self.implementations.is_empty() {
            return Ok(Implementation::defaults().iter().collect());
        }
        self.implementations
            .iter()
            .map(|label| Implementation::from_label(label).ok_or_else(|| ConfigError::UnknownImplementation(label.clone())))
            .collect()
    }
}

/// Splits a command line on whitespace into a program and its arguments
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
