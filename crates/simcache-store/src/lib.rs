//! # simcache-store: Filesystem Storage Engine
//!
//! Persists simulation results as immutable multi-file entries keyed by
//! [`Identifier`](simcache_core::Identifier). See [`store`] for the
//! on-disk layout and the atomicity guarantee.
//!
//! All operations are synchronous. Async callers run them on a blocking
//! thread pool.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{EntrySummary, FileEntry, StoreReceipt, StoredFile};
pub use error::StoreError;
pub use store::{CacheStore, StagedEntry, STAGING_DIR};
