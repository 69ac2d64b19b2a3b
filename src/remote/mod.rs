//! Remote sandbox backend: submission protocol transport and the polling
//! adapter that normalizes remote responses into the local result contract.

pub mod sandbox;
pub mod transport;

pub use sandbox::RemoteSandbox;
pub use transport::{HttpTransport, SubmissionTransport};
