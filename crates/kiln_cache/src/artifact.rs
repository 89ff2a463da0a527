//! Content-addressed binary artifact files.
//!
//! Each compiled binary is stored at `<root>/<fingerprint>.bin` with a header
//! containing magic bytes, format version, the fingerprint it was stored
//! under, a creation timestamp, and a checksum of the payload.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use kiln_common::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a kiln cache artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"KILN";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File extension of published artifacts.
const ARTIFACT_EXT: &str = "bin";

/// Prefix of in-flight temporary files. Never matched by lookups or scans.
const TEMP_PREFIX: &str = ".tmp-";

/// A temporary file untouched for this long belongs to a writer that died.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(15 * 60);

/// Header prepended to every cached artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// kiln version that produced this artifact.
    pub kiln_version: String,

    /// The fingerprint the artifact was stored under.
    pub fingerprint: Fingerprint,

    /// Seconds since the Unix epoch at which the artifact was written.
    pub created_secs: u64,

    /// Fingerprint of the payload bytes (for integrity checks).
    pub checksum: Fingerprint,
}

/// A compiled binary loaded back from the cache.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    /// The key the artifact was stored under.
    pub fingerprint: Fingerprint,
    /// The binary payload.
    pub payload: Vec<u8>,
    /// When the artifact was written.
    pub created: SystemTime,
}

/// Size and age of one published artifact, used for eviction and statistics.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// The artifact's key.
    pub fingerprint: Fingerprint,
    /// Path of the artifact file.
    pub path: PathBuf,
    /// File size in bytes, header included.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Directory of fingerprint-named artifact files.
pub struct ArtifactStore {
    /// Directory holding the artifact files.
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a new artifact store rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Returns the directory holding the artifact files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the artifact directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Checks that the directory accepts new files by creating and removing a probe.
    pub fn probe_writable(&self) -> Result<(), CacheError> {
        self.ensure_dir()?;
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)
            .map(drop)
            .map_err(|e| CacheError::Io {
                path: self.root.clone(),
                source: e,
            })
    }

    /// Returns the file path for the artifact stored under `fingerprint`.
    pub fn artifact_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{fingerprint}.{ARTIFACT_EXT}"))
    }

    /// Writes an artifact and publishes it atomically.
    ///
    /// The bytes are written and synced to a temporary file in the same
    /// directory, which is then renamed over the final path. A concurrent
    /// writer of the same fingerprint may win the rename; either result is a
    /// complete artifact.
    pub fn write_artifact(
        &self,
        fingerprint: &Fingerprint,
        payload: &[u8],
        kiln_version: &str,
    ) -> Result<PathBuf, CacheError> {
        self.ensure_dir()?;

        let created_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            kiln_version: kiln_version.to_string(),
            fingerprint: *fingerprint,
            created_secs,
            checksum: Fingerprint::from_bytes(payload),
        };
        let output = encode_artifact(&header, payload)?;

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: std::io::Error| CacheError::Io { path, source: e }
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.root)
            .map_err(io_err(&self.root))?;
        tmp.write_all(&output).map_err(io_err(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_err(tmp.path()))?;

        let path = self.artifact_path(fingerprint);
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }

    /// Reads the artifact stored under `fingerprint`, validating its header.
    ///
    /// Returns `None` if the file doesn't exist or fails validation. This is
    /// fail-safe: corruption results in a cache miss.
    pub fn read_artifact(&self, fingerprint: &Fingerprint) -> Option<CachedArtifact> {
        let path = self.artifact_path(fingerprint);
        let raw = std::fs::read(&path).ok()?;
        match decode_artifact(&path, &raw) {
            Ok((header, payload)) if header.fingerprint == *fingerprint => Some(CachedArtifact {
                fingerprint: header.fingerprint,
                payload: payload.to_vec(),
                created: UNIX_EPOCH + Duration::from_secs(header.created_secs),
            }),
            Ok((header, _)) => {
                log::debug!(
                    "artifact {} was stored under {}, ignoring",
                    path.display(),
                    header.fingerprint
                );
                None
            }
            Err(e) => {
                log::debug!("discarding cached artifact: {e}");
                None
            }
        }
    }

    /// Removes the artifact stored under `fingerprint`, if present.
    pub fn remove(&self, fingerprint: &Fingerprint) -> Result<bool, CacheError> {
        let path = self.artifact_path(fingerprint);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }

    /// Deletes temporary files last modified more than `age` ago, returning
    /// how many were removed.
    pub fn remove_stale_temps(&self, age: Duration) -> Result<usize, CacheError> {
        if !self.root.exists() {
            return Ok(0);
        }
        let read_dir = std::fs::read_dir(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in read_dir.flatten() {
            if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| now.duration_since(modified).unwrap_or_default() >= age)
                .unwrap_or(false);
            if stale && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Lists published artifacts. Temporary files and foreign files are skipped.
    pub fn entries(&self) -> Result<Vec<EntryInfo>, CacheError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let read_dir = std::fs::read_dir(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            let Some(fingerprint) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Fingerprint>().ok())
            else {
                continue;
            };
            // Raced with a concurrent removal.
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            entries.push(EntryInfo {
                fingerprint,
                path,
                size: meta.len(),
                modified: meta.modified().unwrap_or(UNIX_EPOCH),
            });
        }
        Ok(entries)
    }
}

fn encode_artifact(header: &ArtifactHeader, payload: &[u8]) -> Result<Vec<u8>, CacheError> {
    let header_bytes = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    // 4-byte header length (little-endian) + header + payload
    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(payload);
    Ok(output)
}

pub(crate) fn decode_artifact<'a>(
    path: &Path,
    raw: &'a [u8],
) -> Result<(ArtifactHeader, &'a [u8]), CacheError> {
    let invalid = |reason: &str| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if raw.len() < 4 {
        return Err(invalid("file shorter than header length prefix"));
    }
    let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    if raw.len() < 4 + header_len {
        return Err(invalid("truncated header"));
    }

    let (header, _): (ArtifactHeader, usize) =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .map_err(|e| invalid(&e.to_string()))?;

    if header.magic != ARTIFACT_MAGIC {
        return Err(invalid("missing magic bytes"));
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: ARTIFACT_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = Fingerprint::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum,
            actual,
        });
    }

    Ok((header, payload))
}
