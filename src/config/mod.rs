//! Shared configuration and type definitions.

pub mod types;
