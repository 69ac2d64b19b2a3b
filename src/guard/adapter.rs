/// Execution guard adapter.
///
/// Drives the external constrained-execution primitive (the guard) that
/// actually enforces CPU, wall-clock, memory and output limits on the child.
/// This adapter does not implement isolation itself; it builds the guard
/// command line, spawns exactly one child per call, collects bounded output,
/// and interprets the raw termination evidence.
///
/// Guard contract assumed here:
/// - limits are passed as `--cpu-time S --wall-time S --memory-kb N
///   --stream-kb N --meta FILE --chdir DIR -- cmd args...`;
/// - a violated limit kills the payload with SIGKILL and the guard
///   terminates the same way (signal death is propagated);
/// - resource usage is written to the metadata file (`time`, `time-wall`,
///   `max-rss` key:value lines).
use crate::config::types::{RawOutcome, ResourceParams, Result, SandboxError};
use crate::guard::meta::GuardMeta;
use crate::guard::output::{spawn_collector, CollectedStream};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Extra wall time granted beyond the configured limit before the adapter's
/// backstop SIGKILL fires. The guard's own wall timer is expected to fire
/// first; the backstop guarantees the caller is never blocked indefinitely.
const GRACE_PERIOD: Duration = Duration::from_secs(2);

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct GuardAdapter {
    guard_path: PathBuf,
}

impl GuardAdapter {
    pub fn new(guard_path: impl Into<PathBuf>) -> Self {
        Self {
            guard_path: guard_path.into(),
        }
    }

    /// Guard binary from `RUNBOX_GUARD`, falling back to `runguard` on PATH.
    pub fn from_env() -> Self {
        let path = std::env::var_os("RUNBOX_GUARD")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("runguard"));
        Self::new(path)
    }

    pub fn guard_path(&self) -> &Path {
        &self.guard_path
    }

    /// Check that the guard binary can be invoked at all.
    pub fn probe(&self) -> Result<()> {
        match Command::new(&self.guard_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Ok(()),
            Err(e) => Err(map_spawn_error(&self.guard_path, e)),
        }
    }

    /// Run `command` under the guard with the given limits, blocking until
    /// the child terminates or the backstop deadline fires. Exactly one child
    /// process is spawned and it is always reaped before returning.
    pub fn run(
        &self,
        command: &[String],
        stdin_data: Option<&str>,
        workdir: &Path,
        limits: &ResourceParams,
    ) -> Result<RawOutcome> {
        if command.is_empty() {
            return Err(SandboxError::Config("empty guard command".to_string()));
        }

        let meta_path = meta_path_for(workdir);
        let args = self.build_args(command, workdir, limits, &meta_path);
        log::debug!("guard invocation: {} {}", self.guard_path.display(), args.join(" "));

        let mut child = Command::new(&self.guard_path)
            .args(&args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| map_spawn_error(&self.guard_path, e))?;

        // Collectors must be running before stdin is fed, otherwise a child
        // that floods its output pipes can deadlock against the writer.
        let stream_limit = limits.output_limit as usize;
        let stdout_handle = child.stdout.take().map(|s| spawn_collector(s, stream_limit));
        let stderr_handle = child.stderr.take().map(|s| spawn_collector(s, stream_limit));

        let stdin_handle = match (child.stdin.take(), stdin_data) {
            (Some(mut pipe), Some(data)) => {
                let bytes = data.as_bytes().to_vec();
                Some(thread::spawn(move || {
                    // BrokenPipe just means the child stopped reading.
                    if let Err(e) = pipe.write_all(&bytes) {
                        if e.kind() != ErrorKind::BrokenPipe {
                            log::debug!("stdin write failed: {}", e);
                        }
                    }
                }))
            }
            _ => None,
        };

        let start = Instant::now();
        let deadline = limits.wall_time_limit + GRACE_PERIOD;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if start.elapsed() >= deadline => {
                    log::warn!(
                        "guard exceeded wall deadline ({:?} + grace); sending backstop SIGKILL",
                        limits.wall_time_limit
                    );
                    if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
                        log::warn!("backstop kill failed: {}", e);
                    }
                    break child.wait()?;
                }
                None => thread::sleep(REAP_POLL_INTERVAL),
            }
        };
        let measured_wall = start.elapsed().as_secs_f64();

        if let Some(handle) = stdin_handle {
            let _ = handle.join();
        }
        let (stdout, stdout_truncated) = join_collector(stdout_handle);
        let (stderr, stderr_truncated) = join_collector(stderr_handle);

        let meta = GuardMeta::read(&meta_path);
        let _ = std::fs::remove_file(&meta_path);

        use std::os::unix::process::ExitStatusExt;
        Ok(RawOutcome {
            exit_code: status.code(),
            signal: status.signal(),
            cpu_time: meta.cpu_time.unwrap_or(0.0),
            wall_time: meta.wall_time.unwrap_or(measured_wall),
            memory_peak: meta.memory_peak_bytes().unwrap_or(0),
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        })
    }

    fn build_args(
        &self,
        command: &[String],
        workdir: &Path,
        limits: &ResourceParams,
        meta_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "--cpu-time".to_string(),
            format!("{}", limits.cpu_time_limit.as_secs_f64()),
            "--wall-time".to_string(),
            format!("{}", limits.wall_time_limit.as_secs_f64()),
            "--memory-kb".to_string(),
            format!("{}", limits.memory_limit / 1024),
            "--stream-kb".to_string(),
            format!("{}", limits.output_limit / 1024),
            "--meta".to_string(),
            meta_path.to_string_lossy().into_owned(),
            "--chdir".to_string(),
            workdir.to_string_lossy().into_owned(),
            "--".to_string(),
        ];
        args.extend(command.iter().cloned());
        args
    }
}

/// Metadata file location for one invocation. The payload runs chdir'd into
/// `workdir` and can write anything there, so the file the classifier trusts
/// for time/memory evidence must live outside it; a sibling under the
/// workspace base dir is out of the payload's reach.
fn meta_path_for(workdir: &Path) -> PathBuf {
    let parent = workdir.parent().unwrap_or(workdir);
    parent.join(format!(".guard-meta-{}", Uuid::new_v4()))
}

fn join_collector(
    handle: Option<thread::JoinHandle<CollectedStream>>,
) -> (String, bool) {
    match handle {
        Some(h) => match h.join() {
            Ok(collected) => collected.into_lossy_string(),
            Err(_) => {
                log::error!("output collector thread panicked");
                CollectedStream::empty().into_lossy_string()
            }
        },
        None => (String::new(), false),
    }
}

fn map_spawn_error(path: &Path, e: std::io::Error) -> SandboxError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => {
            SandboxError::GuardUnavailable(format!("{}: {}", path.display(), e))
        }
        _ => SandboxError::Io(e),
    }
}
