/// Local sandbox session.
///
/// Orchestrates one execution request end-to-end: resolve toolchain, write
/// source and auxiliary files into a fresh workspace, run the optional
/// compile stage and the run stage under the guard, classify, tear down.
use crate::config::types::{
    ExecutionRequest, ExecutionResult, Phase, RawOutcome, ResourceParams, Result, ResultKind,
};
use crate::guard::GuardAdapter;
use crate::lang::{self, ToolchainSpec};
use crate::sandbox::{force_trailing_newline, Sandbox};
use crate::session::workspace::Workspace;
use crate::verdict;
use std::path::PathBuf;

pub struct LocalSandbox {
    guard: GuardAdapter,
    base_dir: PathBuf,
}

impl LocalSandbox {
    pub fn new(guard: GuardAdapter, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            guard,
            base_dir: base_dir.into(),
        }
    }

    /// Backend with the guard taken from the environment and workspaces under
    /// a per-uid temp root (root and non-root runs must not collide).
    pub fn from_env() -> Self {
        let euid = unsafe { libc::geteuid() };
        let base = std::env::temp_dir().join(format!("runbox-uid-{}", euid));
        Self::new(GuardAdapter::from_env(), base)
    }

    pub fn guard(&self) -> &GuardAdapter {
        &self.guard
    }

    fn execute_in_workspace(
        &self,
        workspace: &Workspace,
        spec: &ToolchainSpec,
        request: &ExecutionRequest,
        params: &ResourceParams,
    ) -> Result<ExecutionResult> {
        workspace.write_file(spec.source_filename, &request.source_code)?;
        for (name, content) in &request.files {
            workspace.write_file(name, content)?;
        }

        let mut compile_output = String::new();
        if let Some(compile_cmd) = spec.compile_command(workspace.dir()) {
            let raw = self
                .guard
                .run(&compile_cmd, None, workspace.dir(), params)?;
            compile_output = combine_diagnostics(&raw);
            if verdict::classify(&raw, Phase::Compile, params) != ResultKind::Success {
                log::info!(
                    "workspace {}: compile failed (exit {:?})",
                    workspace.run_id(),
                    raw.exit_code
                );
                return Ok(ExecutionResult::compile_error(compile_output));
            }
        }

        let stdin = request.stdin.as_deref().map(force_trailing_newline);
        let run_cmd = spec.run_command(workspace.dir());
        let raw = self
            .guard
            .run(&run_cmd, stdin.as_deref(), workspace.dir(), params)?;
        let result = verdict::classify(&raw, Phase::Run, params);

        log::info!(
            "workspace {}: {} classified as {} (exit {:?}, signal {:?}, cpu {:.3}s)",
            workspace.run_id(),
            spec.key,
            result,
            raw.exit_code,
            raw.signal,
            raw.cpu_time
        );

        Ok(ExecutionResult {
            result,
            stdout: raw.stdout,
            stderr: raw.stderr,
            signal: raw.signal,
            compile_output,
            cpu_time: raw.cpu_time,
            wall_time: raw.wall_time,
            memory_peak: raw.memory_peak,
        })
    }
}

impl Sandbox for LocalSandbox {
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        // Resolve before any filesystem work: an unsupported language must
        // not create a workspace or spawn anything.
        let spec = lang::resolve(&request.language)?;
        let params = request.params.clone().unwrap_or_default();

        let workspace = Workspace::create(&self.base_dir)?;
        let result = self.execute_in_workspace(&workspace, spec, request, &params);
        // Explicit teardown on both branches; Drop is the backstop.
        workspace.cleanup();
        result
    }

    fn supported_languages(&self) -> Vec<String> {
        lang::supported_languages()
    }

    fn close(&mut self) {
        // Local sessions hold no cross-request resources.
    }
}

fn combine_diagnostics(raw: &RawOutcome) -> String {
    if raw.stderr.is_empty() {
        raw.stdout.clone()
    } else if raw.stdout.is_empty() {
        raw.stderr.clone()
    } else {
        format!("{}{}", raw.stdout, raw.stderr)
    }
}
