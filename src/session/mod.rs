//! Sandbox sessions: per-request workspaces and the local execution backend.

pub mod local;
pub mod workspace;

pub use local::LocalSandbox;
pub use workspace::Workspace;
