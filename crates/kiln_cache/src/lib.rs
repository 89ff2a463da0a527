//! Persistent, content-addressed storage for compiled kernel binaries.
//!
//! Binaries are stored one file per [`Fingerprint`](kiln_common::Fingerprint)
//! under the configured cache directory. Writes are published atomically
//! (write to a temporary file, then rename), so concurrent readers in any
//! process never observe a partially written artifact. Reads are fail-safe:
//! anything unexpected on disk is a cache miss.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod store;
pub mod trace;

pub use artifact::{ArtifactHeader, ArtifactStore, CachedArtifact, EntryInfo};
pub use error::CacheError;
pub use store::{CacheStats, PersistentCache};
pub use trace::{TraceLog, TraceOutput, Tracer};
