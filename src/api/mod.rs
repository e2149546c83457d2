//! Typed access to the blockchain explorer HTTP API.
//!
//! The explorer exposes read-only JSON endpoints for account balances,
//! validator state, and delegation counts. [`client::ApiClient`] wraps the
//! three GET endpoints the watcher needs; [`types`] holds the decoded
//! response shapes.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiError};
