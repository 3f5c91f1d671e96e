//! Common utilities for dockside
//!
//! This crate provides the shared error type used across all dockside adapters.

pub mod error;

pub use error::{DocksideError, Result};
