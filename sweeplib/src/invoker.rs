use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use crate::config::{ReplacementPolicy, SweepConfig};
use crate::error::InvokeError;

/// Something that can answer a simulator request. The sweep only talks to simulators through this,
/// so it can be driven by in-process stand-ins as well as real processes
///
/// Implementations must be shareable between threads, as sweeps with several jobs call `run`
/// concurrently
pub trait Simulator: Sync {
    /// Runs the simulator for a replacement policy with the given stdin contents
    ///
    /// # Arguments
    ///
    /// * `policy`: Which simulator variant to run
    /// * `input`: The encoded protocol, written to the simulator's stdin
    ///
    /// returns: Result<String, InvokeError>, everything the simulator printed
    fn run(&self, policy: ReplacementPolicy, input: &str) -> Result<String, InvokeError>;
}

impl<F> Simulator for F
where
    F: Fn(ReplacementPolicy, &str) -> Result<String, InvokeError> + Sync,
{
    fn run(&self, policy: ReplacementPolicy, input: &str) -> Result<String, InvokeError> {
        self(policy, input)
    }
}

/// Runs the external simulator binaries, one process per request
#[derive(Debug, Clone)]
pub struct ProcessSimulator {
    lru_cmd: Vec<String>,
    fifo_cmd: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessSimulator {
    pub fn new(lru_cmd: Vec<String>, fifo_cmd: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { lru_cmd, fifo_cmd, timeout }
    }

    /// Takes the commands and timeout out of a sweep configuration
    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.lru_cmd.clone(), config.fifo_cmd.clone(), config.timeout())
    }
}

impl Simulator for ProcessSimulator {
    fn run(&self, policy: ReplacementPolicy, input: &str) -> Result<String, InvokeError> {
        let command = match policy {
            ReplacementPolicy::Lru => &self.lru_cmd,
            ReplacementPolicy::Fifo => &self.fifo_cmd,
        };
        invoke(command, input, self.timeout)
    }
}

/// Owns a running child, and makes sure it's killed and reaped however we leave `invoke`
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    /// Reaps the child, killing it first if it's still running
    fn finish(&mut self, program: &str) -> io::Result<()> {
        if self.child.try_wait()?.is_none() {
            // Some simulators sit on another prompt after printing their result
            warn!(%program, pid = self.child.id(), "simulator closed its output but kept running, killing it");
            self.child.kill()?;
        }
        let status = self.child.wait()?;
        self.reaped = true;
        debug!(%program, %status, "simulator exited");
        Ok(())
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Runs a command once, feeding it `input` and capturing what it prints
///
/// Stdout and stderr share one pipe, so the captured text keeps the order the simulator wrote it
/// in. Stdin is closed after `input` is written. The call returns once the output is closed, after
/// which the process is killed if it hasn't exited on its own. A non-zero exit status is not an
/// error, only missing output is.
///
/// # Arguments
///
/// * `command`: Program followed by its arguments
/// * `input`: Written to stdin in full
/// * `timeout`: How long to wait for the output to close. The process is killed when it runs out
///
/// returns: Result<String, InvokeError>, the merged output, decoded lossily
pub fn invoke(command: &[String], input: &str, timeout: Option<Duration>) -> Result<String, InvokeError> {
    let (program, args) = command.split_first().ok_or(InvokeError::EmptyCommand)?;
    let io_error = |source: io::Error| InvokeError::Io { program: program.clone(), source };
    let deadline = timeout.map(|limit| Instant::now() + limit);

    let (mut output, writer) = io::pipe().map_err(io_error)?;
    let child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(writer.try_clone().map_err(io_error)?)
            .stderr(writer);
        // Dropping `cmd` at the end of this block closes our copies of the write end, otherwise
        // the read below would never see EOF
        cmd.spawn().map_err(|source| InvokeError::Spawn { program: program.clone(), source })?
    };
    let mut guard = ChildGuard { child, reaped: false };
    debug!(%program, pid = guard.child.id(), "started simulator");

    // Drain on another thread so a deadline can be enforced while waiting
    let (snd, rec) = mpsc::channel();
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let res = output.read_to_end(&mut buf).map(|_| buf);
        let _ = snd.send(res);
    });

    if let Some(mut stdin) = guard.child.stdin.take() {
        match stdin.write_all(input.as_bytes()) {
            Ok(()) => {}
            // The simulator quit without reading everything, its output decides what happened
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(%program, "simulator closed stdin early");
            }
            Err(e) => return Err(io_error(e)),
        }
        // stdin is dropped here, signalling end of input
    }

    let received = match deadline {
        Some(deadline) => match rec.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => {
                // The reader thread is left to finish on its own once the pipe closes
                return Err(InvokeError::Timeout {
                    program: program.clone(),
                    timeout: timeout.unwrap_or_default(),
                });
            }
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::other("output reader stopped unexpectedly")),
        },
        None => rec.recv().unwrap_or_else(|_| Err(io::Error::other("output reader stopped unexpectedly"))),
    };
    let bytes = received.map_err(io_error)?;
    let _ = reader.join();
    guard.finish(program).map_err(io_error)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn writes_input_and_captures_output() {
        let output = invoke(&sh("cat; echo 'hit rate 0.5'"), "10\n6\ny\nswim.trace\n", None).unwrap();
        assert_eq!(output, "10\n6\ny\nswim.trace\nhit rate 0.5\n");
    }

    #[test]
    fn stderr_is_merged() {
        let output = invoke(&sh("echo first; echo second 1>&2; echo third"), "", None).unwrap();
        assert_eq!(output, "first\nsecond\nthird\n");
    }

    #[test]
    fn non_zero_exit_is_not_an_error() {
        let output = invoke(&sh("echo 'hit rate 0.1'; exit 3"), "", None).unwrap();
        assert_eq!(output, "hit rate 0.1\n");
    }

    #[test]
    fn ignores_unread_input() {
        let output = invoke(&sh("echo done"), &"x\n".repeat(1000), None).unwrap();
        assert_eq!(output, "done\n");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let command = vec!["./definitely-not-a-cache-simulator".to_string()];
        let err = invoke(&command, "", None).unwrap_err();
        assert!(matches!(err, InvokeError::Spawn { ref program, .. } if program == "./definitely-not-a-cache-simulator"));
    }

    #[test]
    fn empty_command() {
        assert!(matches!(invoke(&[], "", None), Err(InvokeError::EmptyCommand)));
    }

    #[test]
    fn hung_simulator_times_out() {
        let start = Instant::now();
        let err = invoke(&sh("exec sleep 10"), "", Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, InvokeError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn lingering_simulator_is_killed() {
        // Prints a result, closes its output, then waits around
        let start = Instant::now();
        let output = invoke(&sh("echo 'hit rate 0.9'; exec sleep 10 >&- 2>&-"), "", None).unwrap();
        assert_eq!(output, "hit rate 0.9\n");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn process_simulator_picks_command_by_policy() {
        let simulator = ProcessSimulator::new(sh("echo lru"), sh("echo fifo"), None);
        assert_eq!(simulator.run(ReplacementPolicy::Lru, "").unwrap(), "lru\n");
        assert_eq!(simulator.run(ReplacementPolicy::Fifo, "").unwrap(), "fifo\n");
    }
}
