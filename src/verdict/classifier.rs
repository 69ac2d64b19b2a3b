/// Verdict classification over raw guard evidence.
///
/// Pure, deterministic function: verdict = f(raw outcome, phase, limits).
/// Never guesses beyond the rules; anything unmatched is `Unknown` with the
/// raw evidence logged so the case can be diagnosed in testing.
use crate::config::types::{Phase, RawOutcome, ResourceParams, ResultKind};

/// Signal the guard conventionally kills with when a limit fires.
pub const LIMIT_KILL_SIGNAL: i32 = libc::SIGKILL;

/// Stderr markers treated as secondary evidence of memory exhaustion.
/// Signal 9 alone cannot distinguish timeout from OOM; elapsed-time-vs-limit
/// is the primary tie-break and these markers the fallback.
const MEMORY_MARKERS: &[&str] = &[
    "MemoryError",
    "OverflowError",
    "bad_alloc",
    "OutOfMemoryError",
    "out of memory",
];

/// Classify one phase's raw outcome. First matching rule wins.
pub fn classify(raw: &RawOutcome, phase: Phase, limits: &ResourceParams) -> ResultKind {
    if phase == Phase::Compile {
        return classify_compile(raw);
    }

    let killed_by_guard = raw.signal == Some(LIMIT_KILL_SIGNAL);

    // Rule 2: kill signal with elapsed time at/over a configured limit.
    if killed_by_guard && time_limit_hit(raw, limits) {
        return ResultKind::TimeLimitExceeded;
    }

    // Rule 3: kill signal, time well under limit, memory evidence present.
    if killed_by_guard && memory_limit_hit(raw, limits) {
        return ResultKind::MemoryLimitExceeded;
    }

    // Rule 4: signal death not attributable to a limit. Without a signal,
    // diagnostics on stderr mean the interpreter or runtime aborted the
    // program (syntax errors, uncaught exceptions) and count as abnormal
    // termination; a bare non-zero exit is a runtime error.
    if raw.signal.is_some() {
        return ResultKind::AbnormalTermination;
    }
    match raw.exit_code {
        Some(0) => {}
        Some(_) => {
            return if raw.stderr.is_empty() {
                ResultKind::RuntimeError
            } else {
                ResultKind::AbnormalTermination
            };
        }
        None => {
            log::warn!(
                "unclassifiable outcome: no exit code and no signal ({:?})",
                raw
            );
            return ResultKind::Unknown;
        }
    }
    if !raw.stderr.is_empty() {
        return ResultKind::AbnormalTermination;
    }

    // Rule 5: hard-truncated or over-limit output.
    if output_limit_hit(raw, limits) {
        return ResultKind::OutputLimitExceeded;
    }

    // Rule 6: clean exit.
    ResultKind::Success
}

fn classify_compile(raw: &RawOutcome) -> ResultKind {
    let clean = raw.exit_code == Some(0) && raw.signal.is_none() && raw.stderr.is_empty();
    if clean {
        ResultKind::Success
    } else {
        ResultKind::CompileError
    }
}

fn time_limit_hit(raw: &RawOutcome, limits: &ResourceParams) -> bool {
    raw.cpu_time >= limits.cpu_time_limit.as_secs_f64()
        || raw.wall_time >= limits.wall_time_limit.as_secs_f64()
}

fn memory_limit_hit(raw: &RawOutcome, limits: &ResourceParams) -> bool {
    if raw.memory_peak >= limits.memory_limit {
        return true;
    }
    MEMORY_MARKERS.iter().any(|m| raw.stderr.contains(m))
}

fn output_limit_hit(raw: &RawOutcome, limits: &ResourceParams) -> bool {
    if raw.stdout_truncated || raw.stderr_truncated {
        return true;
    }
    (raw.stdout.len() + raw.stderr.len()) as u64 >= limits.output_limit
}
