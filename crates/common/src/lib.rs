//! Shared types used across all grabbot crates.

pub mod types;

pub use types::{MediaKind, Trigger};
