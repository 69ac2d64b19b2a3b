//! Backend-polymorphic sandbox contract.
//!
//! Callers depend only on this trait; the local guard-driven backend and the
//! remote submission backend are interchangeable behind it.

use crate::config::types::{ExecutionRequest, ExecutionResult, Result};

pub trait Sandbox {
    /// Execute one request end-to-end and classify the outcome.
    ///
    /// Synchronous, single attempt: timeouts and crashes of the executed
    /// program are terminal classifications inside `Ok(..)`, never retried.
    /// `Err(..)` is reserved for sandbox infrastructure faults.
    fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult>;

    /// Language keys this backend accepts.
    fn supported_languages(&self) -> Vec<String>;

    /// Release backend-held resources. Idempotent.
    fn close(&mut self);
}

/// Programs read input line by line; a missing final newline would leave the
/// last line unreadable. Shared by both backends.
pub(crate) fn force_trailing_newline(input: &str) -> String {
    if input.is_empty() || input.ends_with('\n') {
        input.to_string()
    } else {
        format!("{}\n", input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_normalization() {
        assert_eq!(force_trailing_newline("a b"), "a b\n");
        assert_eq!(force_trailing_newline("a b\n"), "a b\n");
        assert_eq!(force_trailing_newline(""), "");
    }
}
