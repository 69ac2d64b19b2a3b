//! Evidence-backed verdict classification.

pub mod classifier;

pub use classifier::{classify, LIMIT_KILL_SIGNAL};
