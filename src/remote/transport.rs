/// Wire contract and transport for the remote execution service.
///
/// Three calls (create submission, poll status, fetch details) plus a
/// language listing. Every reply carries a `status` field that must equal the
/// documented OK sentinel; anything else is a protocol fault raised
/// immediately, never carried forward.
use crate::config::types::{Result, SandboxError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The service's "all good" sentinel.
pub const OK_STATUS: &str = "OK";

#[derive(Clone, Debug, Serialize)]
pub struct CreateSubmission {
    pub source_code: String,
    pub language: String,
    pub stdin: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateReply {
    pub status: String,
    /// Opaque correlation handle for the submission
    pub link: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum SubmissionState {
    #[serde(rename = "waiting")]
    Waiting,
    #[serde(rename = "compiling")]
    Compiling,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "done")]
    Done,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StatusReply {
    pub status: String,
    pub state: SubmissionState,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DetailsReply {
    pub status: String,
    /// Service-side verdict label (e.g. "success", "time_limit")
    pub result: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub stderr: String,
    /// 0 means no signal
    #[serde(default)]
    pub signal: i32,
    #[serde(default)]
    pub cmpinfo: String,
    /// CPU seconds, if reported
    #[serde(default)]
    pub time: f64,
    /// Peak memory in KiB, if reported
    #[serde(default)]
    pub memory_kb: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LanguagesReply {
    pub status: String,
    pub languages: Vec<String>,
}

/// Check a reply's status sentinel, raising on anything but OK.
pub fn ensure_ok(status: &str, operation: &str) -> Result<()> {
    if status == OK_STATUS {
        Ok(())
    } else {
        Err(SandboxError::Protocol(format!(
            "{} returned status '{}'",
            operation, status
        )))
    }
}

/// Network seam for the remote backend; mocked in tests.
pub trait SubmissionTransport {
    fn languages(&self) -> Result<LanguagesReply>;
    fn create(&self, submission: &CreateSubmission) -> Result<CreateReply>;
    fn status(&self, link: &str) -> Result<StatusReply>;
    fn details(&self, link: &str) -> Result<DetailsReply>;
}

/// Blocking HTTP implementation of the submission protocol.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SandboxError::Protocol(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        let response = request
            .send()
            .map_err(|e| SandboxError::Protocol(format!("GET {}: {}", url, e)))?;
        response
            .json()
            .map_err(|e| SandboxError::Protocol(format!("GET {}: bad reply: {}", url, e)))
    }

    fn post<B: Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {}", url);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        let response = request
            .send()
            .map_err(|e| SandboxError::Protocol(format!("POST {}: {}", url, e)))?;
        response
            .json()
            .map_err(|e| SandboxError::Protocol(format!("POST {}: bad reply: {}", url, e)))
    }
}

impl SubmissionTransport for HttpTransport {
    fn languages(&self) -> Result<LanguagesReply> {
        self.get("/languages")
    }

    fn create(&self, submission: &CreateSubmission) -> Result<CreateReply> {
        self.post("/submissions", submission)
    }

    fn status(&self, link: &str) -> Result<StatusReply> {
        self.get(&format!("/submissions/{}/status", link))
    }

    fn details(&self, link: &str) -> Result<DetailsReply> {
        self.get(&format!("/submissions/{}", link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_ok_accepts_sentinel() {
        assert!(ensure_ok("OK", "create submission").is_ok());
    }

    #[test]
    fn ensure_ok_rejects_everything_else() {
        for bad in ["ok", "ERROR", "AUTH_FAILED", ""] {
            let err = ensure_ok(bad, "get status").unwrap_err();
            assert!(matches!(err, SandboxError::Protocol(_)), "status: {:?}", bad);
        }
    }

    #[test]
    fn submission_state_deserializes_from_wire_labels() {
        let state: SubmissionState = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(state, SubmissionState::Done);
        let state: SubmissionState = serde_json::from_str("\"waiting\"").unwrap();
        assert_eq!(state, SubmissionState::Waiting);
    }

    #[test]
    fn details_reply_defaults_optional_fields() {
        let reply: DetailsReply =
            serde_json::from_str(r#"{"status":"OK","result":"success"}"#).unwrap();
        assert_eq!(reply.output, "");
        assert_eq!(reply.signal, 0);
        assert_eq!(reply.memory_kb, 0);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://sandbox.example/api/").unwrap();
        assert_eq!(transport.base_url, "http://sandbox.example/api");
    }
}
