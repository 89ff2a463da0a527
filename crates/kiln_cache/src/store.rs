//! The persistent cache store used by the bundle builder.
//!
//! `PersistentCache` ties configuration, the artifact directory, trace output,
//! and size-based eviction into the two operations the build pipeline needs:
//! [`lookup`](PersistentCache::lookup) and [`store`](PersistentCache::store).
//! A disabled cache misses every lookup and accepts every store silently.

use std::path::Path;

use kiln_common::Fingerprint;
use kiln_config::CacheConfig;

use crate::artifact::{ArtifactStore, CachedArtifact, STALE_TEMP_AGE};
use crate::error::CacheError;
use crate::trace::{TraceOutput, Tracer};

/// Subdirectory of the cache root holding kernel compiler binaries.
const KERNEL_COMPILER_SUBDIR: &str = "kernel_compiler";

/// kiln version recorded in every artifact header.
const KILN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Aggregate size of the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of published artifacts.
    pub entries: usize,
    /// Total size of published artifacts, in bytes.
    pub total_bytes: u64,
}

/// Fingerprint-keyed store of compiled binaries on durable storage.
pub struct PersistentCache {
    /// `None` when caching is disabled.
    store: Option<ArtifactStore>,
    tracer: Tracer,
    max_size: u64,
}

impl PersistentCache {
    /// Creates a cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self {
            store: None,
            tracer: Tracer::default(),
            max_size: 0,
        }
    }

    /// Opens the cache described by `config`.
    ///
    /// A disabled configuration yields a disabled cache without touching the
    /// filesystem. An enabled configuration creates the directory if needed
    /// and fails if it is missing or unusable; callers fall back to
    /// [`disabled`](Self::disabled) in that case.
    pub fn open(config: &CacheConfig, output: TraceOutput) -> Result<Self, CacheError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let tracer = Tracer::new(config.trace, output);
        let root = match config.dir {
            Some(ref dir) => dir.join(KERNEL_COMPILER_SUBDIR),
            None => {
                tracer.persistent(&format!("cache directory unusable: {}", CacheError::NoDirectory));
                return Err(CacheError::NoDirectory);
            }
        };

        let store = ArtifactStore::new(&root);
        if let Err(e) = store.probe_writable() {
            tracer.persistent(&format!("cache directory unusable: {e}"));
            return Err(e);
        }

        tracer.persistent("enabled");
        log::debug!("persistent cache at {}", root.display());
        Ok(Self {
            store: Some(store),
            tracer,
            max_size: config.max_size,
        })
    }

    /// Opens the configured directory for inspection and cleanup only.
    ///
    /// Ignores `enabled`, creates nothing, and emits no trace. A directory
    /// that does not exist yet reads as empty.
    pub fn open_existing(config: &CacheConfig) -> Result<Self, CacheError> {
        let dir = config.dir.as_ref().ok_or(CacheError::NoDirectory)?;
        Ok(Self {
            store: Some(ArtifactStore::new(&dir.join(KERNEL_COMPILER_SUBDIR))),
            tracer: Tracer::default(),
            max_size: 0,
        })
    }

    /// Returns `true` if lookups can hit and stores write.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the directory holding artifacts, when enabled.
    pub fn dir(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.root())
    }

    /// Looks up the binary stored under `fingerprint`.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<CachedArtifact> {
        let store = self.store.as_ref()?;
        let artifact = store.read_artifact(fingerprint)?;
        self.tracer.kernel_compiler("using cached binary");
        Some(artifact)
    }

    /// Stores `payload` under `fingerprint`.
    ///
    /// The trace line is emitted only after the artifact has been published.
    /// Eviction failures are logged, not returned: the artifact is already
    /// durable at that point.
    pub fn store(&self, fingerprint: &Fingerprint, payload: &[u8]) -> Result<(), CacheError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        store.write_artifact(fingerprint, payload, KILN_VERSION)?;
        self.tracer.kernel_compiler("binary has been cached");

        if self.max_size > 0 {
            if let Err(e) = self.evict(store, fingerprint) {
                log::warn!("cache eviction failed: {e}");
            }
        }
        Ok(())
    }

    /// Removes the entry for `fingerprint`, e.g. after the runtime rejected it.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> Result<(), CacheError> {
        if let Some(store) = self.store.as_ref() {
            if store.remove(fingerprint)? {
                self.tracer.persistent(&format!("removed {fingerprint}"));
            }
        }
        Ok(())
    }

    /// Removes every published artifact, returning how many were removed.
    ///
    /// Temporary files abandoned by crashed writers go too.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(0);
        };
        let abandoned = store.remove_stale_temps(STALE_TEMP_AGE)?;
        if abandoned > 0 {
            log::debug!("removed {abandoned} abandoned temporary files");
        }
        let mut removed = 0;
        for entry in store.entries()? {
            if store.remove(&entry.fingerprint)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Reports the number and total size of published artifacts.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(CacheStats::default());
        };
        let entries = store.entries()?;
        Ok(CacheStats {
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size).sum(),
        })
    }

    /// Deletes the oldest artifacts until the directory fits in `max_size`.
    ///
    /// The artifact just written is never evicted by its own store.
    fn evict(&self, store: &ArtifactStore, keep: &Fingerprint) -> Result<(), CacheError> {
        let mut entries = store.entries()?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        if total <= self.max_size {
            return Ok(());
        }

        entries.sort_by_key(|e| e.modified);
        for entry in entries {
            if total <= self.max_size {
                break;
            }
            if entry.fingerprint == *keep {
                continue;
            }
            if store.remove(&entry.fingerprint)? {
                total = total.saturating_sub(entry.size);
                self.tracer
                    .persistent(&format!("evicted {} ({} bytes)", entry.fingerprint, entry.size));
            }
        }
        Ok(())
    }
}
