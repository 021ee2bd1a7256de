//! Schema mirror synthesis.
//!
//! After a dump completes, every `<name>.metadata.json` under the output root
//! is copied into the mirror root at the same relative path, and a sibling
//! `<name>.bson` holding a single empty BSON document is written next to it.
//! The mirror restores to the same collections, indexes and options as the
//! real dump, with no documents.
//!
//! Pairs are processed independently: a pair that cannot be written is
//! recorded in the [`MirrorReport`] and the walk moves on.

use std::fs::{self, DirEntry, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

use bson::Document;
use tracing::{debug, info, warn};

use crate::Result;
use crate::error::DumpMirrorError;
use crate::models::{MirrorFailure, MirrorReport, MirroredPair};

/// File name suffix of metadata sidecars.
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// Extension of data files.
pub const DATA_EXTENSION: &str = "bson";

/// Encoding of an empty BSON document, the content of every mirrored data file.
///
/// # Errors
/// Returns an I/O error if the encoder fails.
///
/// # Example
/// ```rust
/// let bytes = dumpmirror_core::mirror::empty_data_document()?;
/// assert_eq!(bytes, [0x05, 0x00, 0x00, 0x00, 0x00]);
/// # Ok::<(), dumpmirror_core::DumpMirrorError>(())
/// ```
pub fn empty_data_document() -> Result<Vec<u8>> {
    bson::to_vec(&Document::new())
        .map_err(|e| DumpMirrorError::io("Failed to encode empty BSON document", io::Error::other(e)))
}

/// Whether `path` names a metadata sidecar.
pub fn is_metadata_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(METADATA_SUFFIX))
        .is_some_and(|base| !base.is_empty())
}

/// Path of the data file paired with a metadata sidecar.
///
/// Returns `None` when `metadata_path` is not a metadata sidecar.
///
/// ```rust
/// use dumpmirror_core::mirror::data_path_for;
/// use std::path::Path;
///
/// assert_eq!(
///     data_path_for(Path::new("sales/orders.metadata.json")),
///     Some(Path::new("sales/orders.bson").to_path_buf())
/// );
/// ```
pub fn data_path_for(metadata_path: &Path) -> Option<PathBuf> {
    let name = metadata_path.file_name()?.to_str()?;
    let base = name.strip_suffix(METADATA_SUFFIX).filter(|b| !b.is_empty())?;
    Some(metadata_path.with_file_name(format!("{base}.{DATA_EXTENSION}")))
}

/// Builds the schema mirror of `output_root` inside `mirror_root`.
///
/// Only metadata sidecars are discovered; data files, logs and anything else
/// in the dump are never copied. Symlinks are not followed.
///
/// # Errors
/// Returns an I/O error only when `output_root` itself cannot be read. Every
/// other problem is recorded per pair in the returned report.
pub fn synthesize_mirror(output_root: &Path, mirror_root: &Path) -> Result<MirrorReport> {
    let empty_document = empty_data_document()?;
    let root_entries = sorted_entries(output_root).map_err(|e| {
        DumpMirrorError::io(
            format!("Failed to read dump tree {}", output_root.display()),
            e,
        )
    })?;

    let mut discovery = Discovery::new(output_root);
    discovery.visit_entries(root_entries);

    let mut report = MirrorReport {
        pairs: Vec::with_capacity(discovery.metadata_files.len()),
        failures: discovery.failures,
    };

    for metadata_path in &discovery.metadata_files {
        match mirror_pair(output_root, mirror_root, metadata_path, &empty_document) {
            Ok(pair) => {
                debug!("Mirrored {}", pair.metadata.display());
                report.pairs.push(pair);
            }
            Err(failure) => {
                warn!(
                    "Failed to mirror {}: {}",
                    failure.path.display(),
                    failure.reason
                );
                report.failures.push(failure);
            }
        }
    }

    info!(
        "Mirrored {} metadata file(s) into {} ({} failure(s))",
        report.pairs.len(),
        mirror_root.display(),
        report.failures.len()
    );

    Ok(report)
}

/// Recursive metadata discovery that records unreadable entries instead of
/// stopping.
struct Discovery<'a> {
    root: &'a Path,
    metadata_files: Vec<PathBuf>,
    failures: Vec<MirrorFailure>,
}

impl<'a> Discovery<'a> {
    const fn new(root: &'a Path) -> Self {
        Self {
            root,
            metadata_files: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn visit_dir(&mut self, dir: &Path) {
        match sorted_entries(dir) {
            Ok(entries) => self.visit_entries(entries),
            Err(e) => self.record(dir, &e),
        }
    }

    fn visit_entries(&mut self, entries: Vec<DirEntry>) {
        for entry in entries {
            let path = entry.path();
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => self.visit_dir(&path),
                Ok(file_type) if file_type.is_file() && is_metadata_file(&path) => {
                    self.metadata_files.push(path);
                }
                Ok(_) => {}
                Err(e) => self.record(&path, &e),
            }
        }
    }

    fn record(&mut self, path: &Path, error: &io::Error) {
        self.failures.push(MirrorFailure {
            path: relative_to(self.root, path),
            reason: error.to_string(),
        });
    }
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(DirEntry::file_name);
    Ok(entries)
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

fn mirror_pair(
    output_root: &Path,
    mirror_root: &Path,
    metadata_path: &Path,
    empty_document: &[u8],
) -> std::result::Result<MirroredPair, MirrorFailure> {
    let relative_metadata = relative_to(output_root, metadata_path);
    let failure = |step: &str, error: &io::Error| MirrorFailure {
        path: relative_metadata.clone(),
        reason: format!("{step}: {error}"),
    };

    let Some(relative_data) = data_path_for(&relative_metadata) else {
        return Err(MirrorFailure {
            path: relative_metadata.clone(),
            reason: "not a metadata sidecar".to_string(),
        });
    };

    let dest_metadata = mirror_root.join(&relative_metadata);
    let dest_data = mirror_root.join(&relative_data);

    if let Some(parent) = dest_metadata.parent() {
        fs::create_dir_all(parent).map_err(|e| failure("create directory", &e))?;
    }
    copy_preserving_attributes(metadata_path, &dest_metadata)
        .map_err(|e| failure("copy metadata", &e))?;
    fs::write(&dest_data, empty_document).map_err(|e| failure("write data file", &e))?;

    Ok(MirroredPair {
        metadata: relative_metadata.clone(),
        data: relative_data,
    })
}

/// Byte-exact copy that keeps permissions and access/modification times.
fn copy_preserving_attributes(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    fs::copy(source, destination)?;

    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    // Some filesystems do not track access times.
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    open_for_times(destination)?.set_times(times)
}

// Owners may set explicit timestamps through a read-only descriptor, which
// keeps read-only sidecars working after fs::copy applied their permissions.
#[cfg(unix)]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(not(unix))]
fn open_for_times(path: &Path) -> io::Result<File> {
    fs::OpenOptions::new().write(true).open(path)
}
