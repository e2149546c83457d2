//! Background watchers feeding the metric registry.
//!
//! Each watcher owns its poll loop and runs until its cancellation token
//! fires. Chain-wide and node series are written by companion collectors
//! sharing the same registry object.

pub mod validators_api;

pub use validators_api::{PollError, ValidatorsApiWatcher};
