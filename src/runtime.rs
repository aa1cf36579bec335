use std::time::Duration;

use log::debug;

use crate::check::{Check, RunPhase};
use crate::error::CheckError;
use crate::output::Output;
use crate::severity::Severity;

/// Executes a check under the runtime guarantees of the plugin API:
/// a bounded wall-clock run, a well-formed status line on every path,
/// and the fixed severity-to-exit-code mapping.
///
/// Timeouts and unrecovered errors never crash the process; they are
/// converted into an Unknown outcome with a descriptive message, since
/// the invoking monitoring system must receive parseable output even
/// on failure.
#[derive(Debug, Default)]
pub struct Runtime {
    timeout: Option<Duration>,
    verbose: u8,
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            timeout: None,
            verbose: 0,
        }
    }

    /// Aborts check execution after the given number of seconds.
    /// Zero disables the timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Output verbosity between 0 and 3.
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose.min(3);
        self
    }

    /// Runs the check to completion and produces the process outcome.
    ///
    /// When the timeout elapses, the acquisition future is dropped at
    /// its next await point; scoped state such as an open cookie
    /// releases its lock on that path, and the last committed record
    /// stays intact.
    pub async fn execute(&self, check: &mut Check) -> Outcome {
        let run = if let Some(timeout) = self.timeout {
            let timed = tokio::time::timeout(timeout, check.run()).await;
            match timed {
                Ok(run) => run,
                Err(_) => {
                    check.set_phase(RunPhase::TimedOut);
                    return self.failed(check, &CheckError::Timeout(timeout.as_secs()));
                }
            }
        } else {
            check.run().await
        };
        match run {
            Ok(()) => {
                check.set_phase(RunPhase::Done);
                debug!("check {} finished with {}", check.name(), check.severity());
                let mut output = Output::new(self.verbose);
                output.set_status(&check.status_line());
                if self.verbose > 0 {
                    for line in check.verbose_lines() {
                        output.add_long_output(&line);
                    }
                }
                output.add_perfdata(check.perfdata());
                Outcome {
                    exit_code: check.exit_code(),
                    output: output.to_string(),
                }
            }
            Err(e) => {
                check.set_phase(RunPhase::Failed);
                self.failed(check, &e)
            }
        }
    }

    /// Maps an unrecovered error or timeout to an Unknown outcome with
    /// the error surfaced in the status line.
    fn failed(&self, check: &Check, error: &CheckError) -> Outcome {
        let prefix = if check.name().is_empty() {
            String::new()
        } else {
            format!("{} ", check.name().to_uppercase())
        };
        let mut output = Output::new(self.verbose);
        output.set_status(&format!("{}UNKNOWN: {}", prefix, error));
        Outcome {
            exit_code: Severity::Unknown.exit_code(),
            output: output.to_string(),
        }
    }
}

/// Final result of a check run: the text for stdout and the process
/// exit code.
#[derive(Debug)]
pub struct Outcome {
    exit_code: i32,
    output: String,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Prints the plugin output to stdout and exits the process with
    /// the severity-mapped code.
    pub fn print_and_exit(self) -> ! {
        print!("{}", self.output);
        std::process::exit(self.exit_code)
    }
}
