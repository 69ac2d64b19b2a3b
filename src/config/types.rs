/// Core types and error taxonomy for the runbox system
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Infrastructure/setup faults. These abort a request and are surfaced to the
/// caller as-is; they are orthogonal to [`ResultKind`], which describes the
/// behavior of a program that actually ran.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("execution guard unavailable: {0}")]
    GuardUnavailable(String),

    #[error("timed out waiting for remote sandbox")]
    SandboxTimeout,

    #[error("remote sandbox protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend does not support {0}")]
    CapabilityUnsupported(&'static str),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Resource limits applied to one execution phase.
///
/// Absent caller params fall back to these defaults, never to "no limit".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceParams {
    /// CPU time limit
    pub cpu_time_limit: Duration,
    /// Wall clock time limit
    pub wall_time_limit: Duration,
    /// Memory limit in bytes
    pub memory_limit: u64,
    /// Combined output (stdout + stderr) limit in bytes
    pub output_limit: u64,
}

impl Default for ResourceParams {
    fn default() -> Self {
        Self {
            cpu_time_limit: Duration::from_secs(10),
            wall_time_limit: Duration::from_secs(20),
            memory_limit: 128 * 1024 * 1024,
            output_limit: 8 * 1024 * 1024,
        }
    }
}

impl ResourceParams {
    /// Build params from the pass-through key contract
    /// (`cpu_time_limit_seconds`, `memory_limit_megabytes`, ...).
    /// Unrecognised keys are logged and ignored; missing keys keep defaults.
    pub fn from_key_values(params: &BTreeMap<String, f64>) -> Self {
        let mut out = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "cpu_time_limit_seconds" => {
                    out.cpu_time_limit = Duration::from_secs_f64(value.max(0.0));
                }
                "wall_time_limit_seconds" => {
                    out.wall_time_limit = Duration::from_secs_f64(value.max(0.0));
                }
                "memory_limit_megabytes" => {
                    out.memory_limit = (value.max(0.0) * 1024.0 * 1024.0) as u64;
                }
                "output_limit_megabytes" => {
                    out.output_limit = (value.max(0.0) * 1024.0 * 1024.0) as u64;
                }
                other => {
                    log::warn!("ignoring unrecognised resource parameter '{}'", other);
                }
            }
        }
        out
    }
}

/// One execution request. Immutable once submitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Source code to compile/run
    pub source_code: String,
    /// Logical language key, resolved through the registry
    pub language: String,
    /// Data fed to the program's stdin
    pub stdin: Option<String>,
    /// Auxiliary files materialized next to the source (backend-dependent)
    pub files: BTreeMap<String, String>,
    /// Resource limits; `None` means backend defaults
    pub params: Option<ResourceParams>,
}

impl ExecutionRequest {
    pub fn new(source_code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            language: language.into(),
            stdin: None,
            files: BTreeMap::new(),
            params: None,
        }
    }
}

/// Which phase produced a raw outcome.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Compile,
    Run,
}

/// Raw evidence from one guard invocation (one phase).
/// Transient; owned by the session only for the duration of classification.
#[derive(Clone, Debug, Default)]
pub struct RawOutcome {
    /// Exit code, if the child exited normally
    pub exit_code: Option<i32>,
    /// Terminating signal, if the child was signal-killed
    pub signal: Option<i32>,
    /// CPU time used in seconds (from guard metadata; 0.0 if unavailable)
    pub cpu_time: f64,
    /// Wall clock time in seconds
    pub wall_time: f64,
    /// Peak memory in bytes (from guard metadata; 0 if unavailable)
    pub memory_peak: u64,
    /// Captured stdout (lossy UTF-8)
    pub stdout: String,
    /// Captured stderr (lossy UTF-8)
    pub stderr: String,
    /// Stdout hit the collector limit and was hard-truncated
    pub stdout_truncated: bool,
    /// Stderr hit the collector limit and was hard-truncated
    pub stderr_truncated: bool,
}

/// Classification of a completed (non-faulted) execution attempt.
/// Closed taxonomy: every attempt maps to exactly one kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResultKind {
    /// Zero exit, no signal, no limit violated
    #[serde(rename = "OK")]
    Success,
    /// Compile phase failed; run never attempted
    #[serde(rename = "CE")]
    CompileError,
    /// Non-zero exit with no diagnostics
    #[serde(rename = "RE")]
    RuntimeError,
    /// Killed by a signal not attributable to a configured limit, or the
    /// interpreter/runtime aborted the program with diagnostics on stderr
    #[serde(rename = "AT")]
    AbnormalTermination,
    /// CPU or wall time at/over the configured limit
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    /// Peak memory at/over the configured limit
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    /// Output stream size at/over the configured limit
    #[serde(rename = "OLE")]
    OutputLimitExceeded,
    /// Evidence matched no rule; raw outcome is logged for diagnosis
    #[serde(rename = "UNK")]
    Unknown,
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultKind::Success => "success",
            ResultKind::CompileError => "compile_error",
            ResultKind::RuntimeError => "runtime_error",
            ResultKind::AbnormalTermination => "abnormal_termination",
            ResultKind::TimeLimitExceeded => "time_limit_exceeded",
            ResultKind::MemoryLimitExceeded => "memory_limit_exceeded",
            ResultKind::OutputLimitExceeded => "output_limit_exceeded",
            ResultKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The sole contract returned to callers for a request that did not fault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Verdict for the run (or compile, when it short-circuited)
    pub result: ResultKind,
    /// Program stdout
    pub stdout: String,
    /// Program stderr
    pub stderr: String,
    /// Terminating signal of the run phase, if any
    pub signal: Option<i32>,
    /// Compiler diagnostics (empty unless a compile stage produced output)
    pub compile_output: String,
    /// CPU time of the run phase in seconds
    pub cpu_time: f64,
    /// Wall clock time of the run phase in seconds
    pub wall_time: f64,
    /// Peak memory of the run phase in bytes
    pub memory_peak: u64,
}

impl ExecutionResult {
    /// Result for a request that never reached the run phase cleanly
    /// (compile error short-circuit).
    pub fn compile_error(compile_output: String) -> Self {
        Self {
            result: ResultKind::CompileError,
            stdout: String::new(),
            stderr: String::new(),
            signal: None,
            compile_output,
            cpu_time: 0.0,
            wall_time: 0.0,
            memory_peak: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_bounded() {
        let p = ResourceParams::default();
        assert!(p.cpu_time_limit > Duration::ZERO);
        assert!(p.wall_time_limit >= p.cpu_time_limit);
        assert!(p.memory_limit > 0);
        assert!(p.output_limit > 0);
    }

    #[test]
    fn params_from_key_values() {
        let mut kv = BTreeMap::new();
        kv.insert("cpu_time_limit_seconds".to_string(), 3.0);
        kv.insert("memory_limit_megabytes".to_string(), 64.0);
        kv.insert("bogus_key".to_string(), 1.0);

        let p = ResourceParams::from_key_values(&kv);
        assert_eq!(p.cpu_time_limit, Duration::from_secs(3));
        assert_eq!(p.memory_limit, 64 * 1024 * 1024);
        // untouched keys keep defaults
        assert_eq!(p.output_limit, ResourceParams::default().output_limit);
    }

    #[test]
    fn result_kind_serde_codes() {
        assert_eq!(
            serde_json::to_string(&ResultKind::TimeLimitExceeded).unwrap(),
            "\"TLE\""
        );
        assert_eq!(
            serde_json::from_str::<ResultKind>("\"OK\"").unwrap(),
            ResultKind::Success
        );
    }
}
