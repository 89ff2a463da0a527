//! Error types for cache operations.

use std::path::PathBuf;

use kiln_common::Fingerprint;

/// Why the persistent cache could not open, read, or publish an artifact.
///
/// None of these fail a build. An artifact that cannot be read is a miss,
/// and a store that cannot be written is logged by the builder, which then
/// carries on uncached.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The filesystem refused an operation on a cache path.
    #[error("cannot use cache path {path}: {source}")]
    Io {
        /// Directory or artifact file involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Caching is enabled, but neither the configuration nor `HOME` names a directory.
    #[error("persistent cache enabled without a cache directory")]
    NoDirectory,

    /// The length prefix or bincode header of an artifact is unreadable.
    #[error("{path} is not a kiln artifact: {reason}")]
    InvalidHeader {
        /// Artifact file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The payload does not hash to the checksum recorded when it was stored.
    #[error("payload of {path} is corrupt: stored checksum {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Artifact file.
        path: PathBuf,
        /// Checksum from the header.
        expected: Fingerprint,
        /// Checksum of the payload on disk.
        actual: Fingerprint,
    },

    /// The artifact was written in another format version.
    #[error("{path} uses artifact format {actual}, this build reads format {expected}")]
    VersionMismatch {
        /// Artifact file.
        path: PathBuf,
        /// Format this build writes.
        expected: u32,
        /// Format recorded in the file.
        actual: u32,
    },

    /// The header could not be encoded.
    #[error("cannot encode artifact header: {reason}")]
    Serialization {
        /// Encoder message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{decode_artifact, ArtifactStore};
    use crate::store::PersistentCache;
    use crate::trace::TraceOutput;
    use kiln_config::{CacheConfig, TraceLevel};
    use std::path::Path;

    #[test]
    fn enabled_cache_without_directory() {
        let config = CacheConfig {
            enabled: true,
            dir: None,
            trace: TraceLevel::OFF,
            max_size: 0,
        };
        let err = PersistentCache::open(&config, TraceOutput::default()).err().unwrap();
        assert!(matches!(err, CacheError::NoDirectory));
        assert_eq!(err.to_string(), "persistent cache enabled without a cache directory");
    }

    #[test]
    fn store_under_a_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = ArtifactStore::new(&blocker.join("kernel_compiler"));

        let err = store
            .write_artifact(&Fingerprint::from_bytes(b"k"), b"payload", "0.1.0")
            .unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(err.to_string().starts_with("cannot use cache path "));
        assert!(err.to_string().contains("kernel_compiler"));
    }

    #[test]
    fn truncated_artifact_is_not_an_artifact() {
        let err = decode_artifact(Path::new("k.bin"), &[9, 0, 0, 0, 1]).unwrap_err();
        assert!(matches!(err, CacheError::InvalidHeader { .. }));
        assert_eq!(err.to_string(), "k.bin is not a kiln artifact: truncated header");
    }

    #[test]
    fn corrupt_payload_reports_both_checksums() {
        let expected = Fingerprint::from_bytes(b"spirv");
        let actual = Fingerprint::from_bytes(b"spirw");
        let err = CacheError::ChecksumMismatch {
            path: "k.bin".into(),
            expected,
            actual,
        };
        let msg = err.to_string();
        assert!(msg.contains(&expected.to_string()));
        assert!(msg.contains(&actual.to_string()));
    }

    #[test]
    fn format_version_message() {
        let err = CacheError::VersionMismatch {
            path: "old.bin".into(),
            expected: 1,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "old.bin uses artifact format 0, this build reads format 1"
        );
    }
}
