//! runbox: sandboxed execution of untrusted source code with a structured
//! failure taxonomy.
//!
//! # Architecture
//!
//! The crate is organized around one end-to-end flow: a caller hands an
//! [`config::types::ExecutionRequest`] to a backend implementing the
//! [`sandbox::Sandbox`] trait and gets back either an
//! [`config::types::ExecutionResult`] (how the program behaved) or a
//! [`config::types::SandboxError`] (the sandbox itself failed).
//!
//! ## Language Registry ([`lang`])
//! Immutable mapping of language keys to toolchain recipes; aliasing is
//! resolved here, never downstream.
//!
//! ## Execution Guard Adapter ([`guard`])
//! - [`guard::adapter`]: drives the external enforcement primitive, one
//!   child per call, bounded blocking, no zombies
//! - [`guard::output`]: bounded output collection with observable truncation
//! - [`guard::meta`]: resource-usage metadata parsing
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::classifier`]: pure classification of raw outcomes into the
//!   closed result taxonomy (OK/CE/RE/AT/TLE/MLE/OLE/UNK)
//!
//! ## Sessions ([`session`])
//! - [`session::workspace`]: ephemeral per-request file scope, removed on
//!   every exit path
//! - [`session::local`]: local guard-driven backend
//!
//! ## Remote backend ([`remote`])
//! - [`remote::transport`]: submission wire protocol (create/poll/details)
//! - [`remote::sandbox`]: bounded-poll adapter onto the same contract
//!
//! # Design principles
//!
//! 1. **Two orthogonal failure axes** - program behavior is data
//!    (`ResultKind`), sandbox trouble is an error (`SandboxError`); the two
//!    never mix
//! 2. **Evidence over guesswork** - verdicts derive only from recorded exit
//!    status, signals, timing and memory evidence
//! 3. **Prompt release** - workspaces, child processes and remote handles are
//!    released on every path out, including faults
//! 4. **Bounded blocking** - every call has a hard upper bound on how long it
//!    can hold the caller

// Shared configuration and types
pub mod config;

// Language registry
pub mod lang;

// Execution guard adapter
pub mod guard;

// Verdict classification
pub mod verdict;

// Sandbox sessions (workspace + local backend)
pub mod session;

// Remote submission backend
pub mod remote;

// Backend-polymorphic contract
pub mod sandbox;

// CLI entrypoint wiring shared by the runbox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::{
    ExecutionRequest, ExecutionResult, Phase, RawOutcome, ResourceParams, Result, ResultKind,
    SandboxError,
};
pub use guard::GuardAdapter;
pub use remote::{HttpTransport, RemoteSandbox};
pub use sandbox::Sandbox;
pub use session::LocalSandbox;
