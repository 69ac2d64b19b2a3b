//! End-to-end tests for the local backend.
//!
//! The external guard is replaced by a stub shell script that honors the
//! adapter's command-line contract (`--meta`, `--`, key/value flags) and
//! fabricates outcomes. This exercises the full session path - workspace
//! materialization, guard invocation, output collection, classification,
//! teardown - without requiring the real enforcement tool or any language
//! toolchain.

use runbox::{
    ExecutionRequest, GuardAdapter, LocalSandbox, ResourceParams, ResultKind, Sandbox,
    SandboxError,
};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// Shared stub preamble: consume limit flags, remember the meta path, stop at
/// the `--` separator leaving the payload command in `$@`.
const STUB_HEADER: &str = r#"#!/bin/sh
meta=""
while [ $# -gt 0 ]; do
  case "$1" in
    --meta) meta="$2"; shift 2 ;;
    --) shift; break ;;
    --*) shift 2 ;;
    *) shift ;;
  esac
done
"#;

struct Fixture {
    root: PathBuf,
    base: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("runbox-it-{}", Uuid::new_v4()));
        let base = root.join("workspaces");
        fs::create_dir_all(&base).unwrap();
        Self { root, base }
    }

    fn stub_guard(&self, body: &str) -> PathBuf {
        let path = self.root.join("guard.sh");
        fs::write(&path, format!("{}{}", STUB_HEADER, body)).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn sandbox(&self, stub_body: &str) -> LocalSandbox {
        let guard = self.stub_guard(stub_body);
        LocalSandbox::new(GuardAdapter::new(guard), self.base.clone())
    }

    fn assert_no_workspace_left(&self) {
        let leftover: Vec<_> = fs::read_dir(&self.base).unwrap().collect();
        assert!(leftover.is_empty(), "workspace leaked: {:?}", leftover);
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn successful_run_returns_stdout_byte_for_byte() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox(
        r#"printf 'Hello\n'
[ -n "$meta" ] && printf 'time:0.02\ntime-wall:0.03\nmax-rss:512\n' > "$meta"
exit 0
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new("print('Hello')", "python3"))
        .unwrap();

    assert_eq!(result.result, ResultKind::Success);
    assert_eq!(result.stdout, "Hello\n");
    assert_eq!(result.stderr, "");
    assert_eq!(result.signal, None);
    assert_eq!(result.compile_output, "");
    assert!((result.cpu_time - 0.02).abs() < 1e-9);
    assert_eq!(result.memory_peak, 512 * 1024);
    fx.assert_no_workspace_left();
}

#[test]
fn execute_is_idempotent_for_identical_inputs() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox("printf 'same\\n'\nexit 0\n");
    let request = ExecutionRequest::new("print('same')", "python3");

    let first = sandbox.execute(&request).unwrap();
    let second = sandbox.execute(&request).unwrap();

    assert_eq!(first.result, second.result);
    assert_eq!(first.stdout, second.stdout);
    assert_eq!(first.stderr, second.stderr);
    fx.assert_no_workspace_left();
}

#[test]
fn stdin_reaches_the_program_with_forced_newline() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox(
        r#"read line
printf '%s\n' "$line"
exit 0
"#,
    );

    let mut request = ExecutionRequest::new("print(input())", "python3");
    request.stdin = Some("ping".to_string()); // no trailing newline
    let result = sandbox.execute(&request).unwrap();

    assert_eq!(result.result, ResultKind::Success);
    assert_eq!(result.stdout, "ping\n");
    fx.assert_no_workspace_left();
}

#[test]
fn syntax_error_is_abnormal_termination() {
    // The interpreter rejects the program at startup: non-zero exit,
    // diagnostics on stderr, no signal.
    let fx = Fixture::new();
    let sandbox = fx.sandbox(
        r#"printf 'Traceback (most recent call last):\nSyntaxError: invalid syntax\n' >&2
exit 1
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new("print('x' +", "python3"))
        .unwrap();

    assert_eq!(result.result, ResultKind::AbnormalTermination);
    assert_eq!(result.signal, None);
    assert!(result.stderr.contains("SyntaxError"));
    fx.assert_no_workspace_left();
}

#[test]
fn bare_nonzero_exit_is_runtime_error() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox("exit 2\n");

    let result = sandbox
        .execute(&ExecutionRequest::new("import sys; sys.exit(2)", "python3"))
        .unwrap();

    assert_eq!(result.result, ResultKind::RuntimeError);
    assert_eq!(result.signal, None);
    fx.assert_no_workspace_left();
}

#[test]
fn signal_death_is_abnormal_termination() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox("kill -9 $$\n");

    let result = sandbox
        .execute(&ExecutionRequest::new("import os; os.abort()", "python3"))
        .unwrap();

    assert_eq!(result.result, ResultKind::AbnormalTermination);
    assert_eq!(result.signal, Some(9));
    fx.assert_no_workspace_left();
}

#[test]
fn kill_with_elapsed_time_at_limit_is_tle() {
    let fx = Fixture::new();
    // The guard reports cpu time at the limit, then dies by the kill signal.
    let sandbox = fx.sandbox(
        r#"[ -n "$meta" ] && printf 'time:10.5\ntime-wall:10.6\nmax-rss:1024\n' > "$meta"
kill -9 $$
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new("while True: pass", "python3"))
        .unwrap();

    assert_eq!(result.result, ResultKind::TimeLimitExceeded);
    assert_eq!(result.signal, Some(9));
    fx.assert_no_workspace_left();
}

#[test]
fn kill_with_peak_memory_at_limit_is_mle() {
    let fx = Fixture::new();
    // 256 MiB peak against the default 128 MiB limit, time well under.
    let sandbox = fx.sandbox(
        r#"[ -n "$meta" ] && printf 'time:0.4\ntime-wall:0.5\nmax-rss:262144\n' > "$meta"
kill -9 $$
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new(
            "data = list(range(10**12))",
            "python3",
        ))
        .unwrap();

    assert_eq!(result.result, ResultKind::MemoryLimitExceeded);
    fx.assert_no_workspace_left();
}

#[test]
fn truncated_output_is_ole() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox(
        r#"i=0
while [ $i -lt 200 ]; do
  printf '0123456789012345678901234567890123456789\n'
  i=$((i+1))
done
exit 0
"#,
    );

    let mut request = ExecutionRequest::new("while 1: print('blah')", "python3");
    request.params = Some(ResourceParams {
        output_limit: 1024,
        ..Default::default()
    });
    let result = sandbox.execute(&request).unwrap();

    assert_eq!(result.result, ResultKind::OutputLimitExceeded);
    fx.assert_no_workspace_left();
}

#[test]
fn compile_failure_short_circuits_before_run() {
    let fx = Fixture::new();
    // gcc invocation fails; the run stage would print, proving it was skipped.
    let sandbox = fx.sandbox(
        r#"case "$1" in
  */gcc) printf 'prog.c:1: error: expected declaration\n' >&2; exit 1 ;;
esac
printf 'ran anyway\n'
exit 0
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new("int main( {}", "c"))
        .unwrap();

    assert_eq!(result.result, ResultKind::CompileError);
    assert!(result.compile_output.contains("error"));
    assert_eq!(result.stdout, "");
    fx.assert_no_workspace_left();
}

#[test]
fn compile_then_run_uses_both_stages() {
    let fx = Fixture::new();
    let sandbox = fx.sandbox(
        r#"case "$1" in
  */gcc) exit 0 ;;
esac
printf 'compiled output\n'
exit 0
"#,
    );

    let result = sandbox
        .execute(&ExecutionRequest::new(
            "int main(void) { return 0; }",
            "c",
        ))
        .unwrap();

    assert_eq!(result.result, ResultKind::Success);
    assert_eq!(result.stdout, "compiled output\n");
    assert_eq!(result.compile_output, "");
    fx.assert_no_workspace_left();
}

#[test]
fn auxiliary_files_are_materialized_in_the_workspace() {
    let fx = Fixture::new();
    // Stubs never chdir themselves; find the workspace via the --chdir flag.
    let guard = fx.root.join("guard-aux.sh");
    fs::write(
        &guard,
        r#"#!/bin/sh
workdir=""
while [ $# -gt 0 ]; do
  case "$1" in
    --chdir) workdir="$2"; shift 2 ;;
    --) shift; break ;;
    --*) shift 2 ;;
    *) shift ;;
  esac
done
cat "$workdir/data.txt"
exit 0
"#,
    )
    .unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&guard, fs::Permissions::from_mode(0o755)).unwrap();
    }
    let sandbox = LocalSandbox::new(GuardAdapter::new(guard), fx.base.clone());

    let mut request = ExecutionRequest::new("print(open('data.txt').read())", "python3");
    request
        .files
        .insert("data.txt".to_string(), "payload\n".to_string());
    let result = sandbox.execute(&request).unwrap();

    assert_eq!(result.result, ResultKind::Success);
    assert_eq!(result.stdout, "payload\n");
    fx.assert_no_workspace_left();
}

#[test]
fn unsupported_language_spawns_nothing() {
    let fx = Fixture::new();
    // Stub that would leave a marker file if it ever ran.
    let marker = fx.root.join("ran");
    let sandbox = fx.sandbox(&format!("touch {}\nexit 0\n", marker.display()));

    let err = sandbox
        .execute(&ExecutionRequest::new("say hi", "cobol"))
        .unwrap_err();

    assert!(matches!(err, SandboxError::UnsupportedLanguage(_)));
    assert!(!marker.exists(), "guard was spawned for unsupported language");
    fx.assert_no_workspace_left();
}

#[test]
fn missing_guard_binary_is_guard_unavailable() {
    let fx = Fixture::new();
    let sandbox = LocalSandbox::new(
        GuardAdapter::new(fx.root.join("no-such-guard")),
        fx.base.clone(),
    );

    let err = sandbox
        .execute(&ExecutionRequest::new("print(1)", "python3"))
        .unwrap_err();

    assert!(matches!(err, SandboxError::GuardUnavailable(_)));
    fx.assert_no_workspace_left();
}

#[test]
fn close_is_idempotent() {
    let fx = Fixture::new();
    let mut sandbox = fx.sandbox("exit 0\n");
    sandbox.close();
    sandbox.close();
}
