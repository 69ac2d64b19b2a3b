//! Execution guard adapter: invocation of the external enforcement primitive
//! and collection of its raw outcome.

pub mod adapter;
pub mod meta;
pub mod output;

pub use adapter::GuardAdapter;
