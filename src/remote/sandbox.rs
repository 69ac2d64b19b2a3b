/// Remote sandbox backend.
///
/// Implements the same `Sandbox` contract as the local backend by submitting
/// code to a remote execution service and polling for completion with a
/// bounded budget. Does not support auxiliary files or custom resource
/// parameters; those fail explicitly instead of being silently ignored.
use crate::config::types::{
    ExecutionRequest, ExecutionResult, Result, ResultKind, SandboxError,
};
use crate::remote::transport::{
    ensure_ok, CreateSubmission, DetailsReply, SubmissionState, SubmissionTransport,
};
use crate::sandbox::{force_trailing_newline, Sandbox};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: u32 = 30;

/// Patterns mapping the remote service's display names onto local canonical
/// keys, so callers can keep using registry keys against either backend.
static LANGUAGE_ALIASES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)python *2", "python2"),
        (r"(?i)python *3", "python3"),
        (r"(?i)^c99", "c"),
        (r"(?i)^(g\+\+|c\+\+)", "cpp"),
        (r"(?i)^java", "java"),
    ]
    .into_iter()
    .map(|(pattern, key)| (Regex::new(pattern).expect("static alias pattern"), key))
    .collect()
});

pub struct RemoteSandbox {
    transport: Box<dyn SubmissionTransport>,
    /// Local key (lowercased) -> label the remote service expects
    langmap: BTreeMap<String, String>,
    poll_interval: Duration,
    max_polls: u32,
    closed: bool,
}

impl RemoteSandbox {
    /// Connect and reconcile the language list. Fails if the service is
    /// unreachable or reports a non-OK status.
    pub fn new(transport: Box<dyn SubmissionTransport>) -> Result<Self> {
        Self::with_polling(transport, DEFAULT_POLL_INTERVAL, DEFAULT_MAX_POLLS)
    }

    pub fn with_polling(
        transport: Box<dyn SubmissionTransport>,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<Self> {
        if max_polls == 0 {
            return Err(SandboxError::Config(
                "poll budget must be at least one attempt".to_string(),
            ));
        }

        let reply = transport.languages()?;
        ensure_ok(&reply.status, "get languages")?;

        let mut langmap = BTreeMap::new();
        for label in &reply.languages {
            // The remote's own labels are accepted verbatim (lowercased)...
            langmap
                .entry(label.to_lowercase())
                .or_insert_with(|| label.clone());
            // ...and pattern aliases map local canonical keys onto them.
            for (pattern, key) in LANGUAGE_ALIASES.iter() {
                if pattern.is_match(label) {
                    langmap
                        .entry((*key).to_string())
                        .or_insert_with(|| label.clone());
                }
            }
        }
        log::info!("remote sandbox offers {} language labels", langmap.len());

        Ok(Self {
            transport,
            langmap,
            poll_interval,
            max_polls,
            closed: false,
        })
    }

    fn poll_until_done(&self, link: &str) -> Result<()> {
        for attempt in 1..=self.max_polls {
            let reply = self.transport.status(link)?;
            ensure_ok(&reply.status, "get submission status")?;
            if reply.state == SubmissionState::Done {
                return Ok(());
            }
            log::debug!(
                "submission {} not done (attempt {}/{}, state {:?})",
                link,
                attempt,
                self.max_polls,
                reply.state
            );
            if attempt < self.max_polls {
                thread::sleep(self.poll_interval);
            }
        }
        log::warn!("poll budget exhausted for submission {}", link);
        Err(SandboxError::SandboxTimeout)
    }
}

impl Sandbox for RemoteSandbox {
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        if self.closed {
            return Err(SandboxError::Config("remote sandbox is closed".to_string()));
        }
        if !request.files.is_empty() {
            return Err(SandboxError::CapabilityUnsupported("auxiliary files"));
        }
        if request.params.is_some() {
            return Err(SandboxError::CapabilityUnsupported(
                "custom resource parameters",
            ));
        }

        let remote_label = self
            .langmap
            .get(&request.language.to_lowercase())
            .ok_or_else(|| SandboxError::UnsupportedLanguage(request.language.clone()))?;

        let submission = CreateSubmission {
            source_code: request.source_code.clone(),
            language: remote_label.clone(),
            stdin: request
                .stdin
                .as_deref()
                .map(force_trailing_newline)
                .unwrap_or_default(),
        };

        let created = self.transport.create(&submission)?;
        ensure_ok(&created.status, "create submission")?;
        log::debug!("created remote submission {}", created.link);

        // Handle is owned by this poll loop and discarded after the terminal
        // status or the exhausted budget.
        self.poll_until_done(&created.link)?;

        let details = self.transport.details(&created.link)?;
        ensure_ok(&details.status, "get submission details")?;
        Ok(map_details(details))
    }

    fn supported_languages(&self) -> Vec<String> {
        self.langmap.keys().cloned().collect()
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("closing remote sandbox");
            self.closed = true;
        }
    }
}

fn map_details(details: DetailsReply) -> ExecutionResult {
    let result = map_result_label(&details.result);
    ExecutionResult {
        result,
        stdout: details.output,
        stderr: details.stderr,
        signal: (details.signal != 0).then_some(details.signal),
        compile_output: details.cmpinfo,
        cpu_time: details.time,
        // The service reports a single elapsed figure.
        wall_time: details.time,
        memory_peak: details.memory_kb * 1024,
    }
}

fn map_result_label(label: &str) -> ResultKind {
    match label {
        "success" => ResultKind::Success,
        "compile_error" => ResultKind::CompileError,
        "runtime_error" => ResultKind::RuntimeError,
        "abnormal" => ResultKind::AbnormalTermination,
        "time_limit" => ResultKind::TimeLimitExceeded,
        "memory_limit" => ResultKind::MemoryLimitExceeded,
        "output_limit" => ResultKind::OutputLimitExceeded,
        other => {
            log::warn!("remote service reported unknown result label '{}'", other);
            ResultKind::Unknown
        }
    }
}
