//! MongoDB adapter for dockside
//!
//! This crate translates an ORM-style data-access contract (create / find /
//! update / upsert / remove / count / all with filter objects) into calls
//! against the MongoDB driver.
//!
//! # Features
//! - Filter-to-query translation (equality, null sentinel, operator pass-through)
//! - Order-string and order-map normalization into native sort documents
//! - Pagination via limit / skip (with offset as a fallback skip)
//! - Concurrent nested includes joined onto a single result set
//! - Canonical `id` field mirrored from the store's native `_id` on reads
//! - Async/await support via tokio

pub mod adapter;
pub mod connection;
pub mod identifier;
pub mod query;
pub mod settings;

pub use adapter::{Adapter, ResultSet};
pub use connection::{Connection, PoolConfig};
pub use dockside_common::{DocksideError, Result};
pub use query::{Filter, Order};
pub use settings::Settings;
